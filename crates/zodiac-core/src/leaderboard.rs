//! Cross-account ranking by points.
//!
//! Ranks are fixed when the board is built. [`Leaderboard::search`] only
//! narrows the view and keeps every entry's original rank.

use serde::Serialize;
use std::collections::HashMap;

use crate::accounts::Profile;
use crate::error::Result;
use crate::ledger::AccountLedger;
use crate::storage;
use crate::store::KeyValueStore;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub display_name: String,
    pub email: String,
    pub points: u64,
    pub streak: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Leaderboard {
    entries: Vec<LeaderboardEntry>,
}

/// Folds every profile's ledger into a ranked board. Accounts without points
/// are left out; display names that collide case-insensitively keep only the
/// higher-scoring account (the first one seen on a tie).
pub fn build<F>(profiles: &[Profile], mut ledger_of: F) -> Leaderboard
where
    F: FnMut(&Profile) -> AccountLedger,
{
    let mut slots: HashMap<String, usize> = HashMap::new();
    let mut entries: Vec<LeaderboardEntry> = Vec::new();

    for profile in profiles {
        let ledger = ledger_of(profile);
        if ledger.points == 0 {
            continue;
        }
        let candidate = LeaderboardEntry {
            rank: 0,
            display_name: profile.display_name().to_string(),
            email: profile.email.clone(),
            points: ledger.points,
            streak: ledger.streak,
        };
        match slots.get(&candidate.display_name.to_lowercase()) {
            Some(&idx) => {
                if candidate.points > entries[idx].points {
                    entries[idx] = candidate;
                }
            }
            None => {
                slots.insert(candidate.display_name.to_lowercase(), entries.len());
                entries.push(candidate);
            }
        }
    }

    entries.sort_by(|a, b| b.points.cmp(&a.points));
    for (idx, entry) in entries.iter_mut().enumerate() {
        entry.rank = idx + 1;
    }
    Leaderboard { entries }
}

/// Builds the board from every stored profile and ledger.
pub fn from_store<S: KeyValueStore + ?Sized>(store: &S) -> Result<Leaderboard> {
    let profiles = storage::load_profiles(store)?;
    let mut ledgers = HashMap::with_capacity(profiles.len());
    for profile in &profiles {
        ledgers.insert(profile.email.clone(), storage::load_ledger(store, &profile.email)?);
    }
    Ok(build(&profiles, |p| {
        ledgers.remove(&p.email).unwrap_or_default()
    }))
}

impl Leaderboard {
    pub fn entries(&self) -> &[LeaderboardEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn top(&self, n: usize) -> &[LeaderboardEntry] {
        &self.entries[..n.min(self.entries.len())]
    }

    /// Case-insensitive substring match on display names.
    pub fn search(&self, query: &str) -> Vec<&LeaderboardEntry> {
        let needle = query.trim().to_lowercase();
        self.entries
            .iter()
            .filter(|e| e.display_name.to_lowercase().contains(&needle))
            .collect()
    }

    pub fn rank_of(&self, email: &str) -> Option<usize> {
        self.entries.iter().find(|e| e.email == email).map(|e| e.rank)
    }
}
