//! Per-account points, streak and deed history.
//!
//! The rules are pure: each takes the current ledger and returns the next one,
//! leaving the input untouched on failure. [`DeedLedger`] wraps them with a
//! single load and a single write-back per call.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

use crate::clock::Clock;
use crate::error::{Result, ZodiacError};
use crate::settings::GameSettings;
use crate::storage;
use crate::store::KeyValueStore;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deed {
    pub date: NaiveDate,
    pub text: String,
    pub solve_points: u32,
    #[serde(default)]
    pub upload_points: u32,
    pub total_points: u32,
    pub streak_at_completion: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl Deed {
    pub fn has_image(&self) -> bool {
        self.image.as_deref().is_some_and(|img| !img.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountLedger {
    #[serde(default)]
    pub points: u64,
    #[serde(default)]
    pub streak: u32,
    #[serde(default)]
    pub last_deed_date: Option<NaiveDate>,
    /// Most recent first.
    #[serde(default)]
    pub past_deeds: Vec<Deed>,
}

impl AccountLedger {
    pub fn deed_on(&self, date: NaiveDate) -> Option<&Deed> {
        self.past_deeds.iter().find(|d| d.date == date)
    }

    fn deed_on_mut(&mut self, date: NaiveDate) -> Result<&mut Deed> {
        self.past_deeds
            .iter_mut()
            .find(|d| d.date == date)
            .ok_or_else(|| ZodiacError::NotFound(format!("no deed on {date}")))
    }
}

/// Turns an image file into the opaque reference stored on a deed.
pub trait ImageIngestor {
    fn to_data_reference(&self, path: &Path) -> anyhow::Result<String>;
}

pub fn has_completed_today(ledger: &AccountLedger, today: NaiveDate) -> bool {
    ledger.last_deed_date == Some(today) && ledger.deed_on(today).is_some()
}

pub fn next_streak(last_deed_date: Option<NaiveDate>, current_streak: u32, today: NaiveDate) -> u32 {
    match last_deed_date {
        Some(last) if today.pred_opt() == Some(last) => current_streak.saturating_add(1),
        _ => 1,
    }
}

// ── Rules ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerRules {
    pub base_points: u32,
    pub history_cap: usize,
}

impl Default for LedgerRules {
    fn default() -> Self {
        Self::from(&GameSettings::default())
    }
}

impl From<&GameSettings> for LedgerRules {
    fn from(settings: &GameSettings) -> Self {
        Self {
            base_points: settings.points.base,
            // A zero cap would drop today's deed and reopen the day lock.
            history_cap: settings.history_cap.max(1),
        }
    }
}

impl LedgerRules {
    pub fn solve_points(&self, streak: u32) -> u32 {
        self.base_points.saturating_add(streak)
    }

    pub fn upload_points(&self, streak: u32) -> u32 {
        self.base_points.saturating_add(streak)
    }

    pub fn record_solve(&self, ledger: &AccountLedger, text: &str, today: NaiveDate) -> Result<AccountLedger> {
        // A deed dated today blocks a second one even if last_deed_date drifted.
        if has_completed_today(ledger, today) || ledger.deed_on(today).is_some() {
            return Err(ZodiacError::AlreadyCompleted);
        }
        let text = text.trim();
        if text.is_empty() {
            return Err(ZodiacError::invalid("deed text cannot be empty"));
        }

        let streak = next_streak(ledger.last_deed_date, ledger.streak, today);
        let solve_points = self.solve_points(streak);
        let deed = Deed {
            date: today,
            text: text.to_string(),
            solve_points,
            upload_points: 0,
            total_points: solve_points,
            streak_at_completion: streak,
            image: None,
        };

        let mut next = ledger.clone();
        next.points = next.points.saturating_add(u64::from(solve_points));
        next.streak = streak;
        next.last_deed_date = Some(today);
        next.past_deeds.insert(0, deed);
        next.past_deeds.truncate(self.history_cap.max(1));
        Ok(next)
    }

    /// Awards upload points for the deed on `date`. Does not look for an
    /// earlier award; replacing a photo must go through [`Self::replace_photo`]
    /// or a preceding [`Self::retract_photo`].
    pub fn attach_photo(&self, ledger: &AccountLedger, date: NaiveDate, image: &str) -> Result<AccountLedger> {
        if image.is_empty() {
            return Err(ZodiacError::invalid("image reference cannot be empty"));
        }
        let mut next = ledger.clone();
        let deed = next.deed_on_mut(date)?;
        let award = self.upload_points(deed.streak_at_completion);
        deed.upload_points = award;
        deed.total_points = deed.solve_points.saturating_add(award);
        deed.image = Some(image.to_string());
        next.points = next.points.saturating_add(u64::from(award));
        Ok(next)
    }

    pub fn retract_photo(&self, ledger: &AccountLedger, date: NaiveDate) -> Result<AccountLedger> {
        let mut next = ledger.clone();
        let deed = next.deed_on_mut(date)?;
        let retracted = deed.upload_points;
        if retracted == 0 {
            return Ok(ledger.clone());
        }
        deed.upload_points = 0;
        deed.total_points = deed.solve_points;
        deed.image = None;
        next.points = next.points.saturating_sub(u64::from(retracted));
        Ok(next)
    }

    pub fn replace_photo(&self, ledger: &AccountLedger, date: NaiveDate, image: &str) -> Result<AccountLedger> {
        let retracted = self.retract_photo(ledger, date)?;
        self.attach_photo(&retracted, date, image)
    }
}

// ── Service ─────────────────────────────────────────────────────────────────

pub struct DeedLedger<S, C> {
    store: S,
    clock: C,
    rules: LedgerRules,
}

impl<S: KeyValueStore, C: Clock> DeedLedger<S, C> {
    pub fn new(store: S, clock: C, rules: LedgerRules) -> Self {
        Self { store, clock, rules }
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    pub fn ledger(&self, email: &str) -> Result<AccountLedger> {
        storage::load_ledger(&self.store, email)
    }

    pub fn has_completed_today(&self, email: &str) -> Result<bool> {
        Ok(has_completed_today(&self.ledger(email)?, self.today()))
    }

    pub fn record_solve(&self, email: &str, text: &str) -> Result<AccountLedger> {
        self.ensure_account(email)?;
        let today = self.today();
        let next = self.rules.record_solve(&self.ledger(email)?, text, today)?;
        storage::save_ledger(&self.store, email, &next)?;
        info!(email, streak = next.streak, points = next.points, "deed recorded");
        Ok(next)
    }

    pub fn attach_photo(&self, email: &str, date: NaiveDate, image: &str) -> Result<AccountLedger> {
        self.ensure_account(email)?;
        let next = self.rules.attach_photo(&self.ledger(email)?, date, image)?;
        storage::save_ledger(&self.store, email, &next)?;
        info!(email, %date, points = next.points, "photo attached");
        Ok(next)
    }

    pub fn retract_photo(&self, email: &str, date: NaiveDate) -> Result<AccountLedger> {
        self.ensure_account(email)?;
        let current = self.ledger(email)?;
        let next = self.rules.retract_photo(&current, date)?;
        if next != current {
            storage::save_ledger(&self.store, email, &next)?;
            info!(email, %date, points = next.points, "photo retracted");
        }
        Ok(next)
    }

    pub fn replace_photo(&self, email: &str, date: NaiveDate, image: &str) -> Result<AccountLedger> {
        self.ensure_account(email)?;
        let next = self.rules.replace_photo(&self.ledger(email)?, date, image)?;
        storage::save_ledger(&self.store, email, &next)?;
        info!(email, %date, points = next.points, "photo replaced");
        Ok(next)
    }

    fn ensure_account(&self, email: &str) -> Result<()> {
        let profiles = storage::load_profiles(&self.store)?;
        if profiles.iter().any(|p| p.email == email) {
            Ok(())
        } else {
            Err(ZodiacError::NotFound(format!("profile {email}")))
        }
    }
}
