use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use crate::error::Result;
use crate::storage;
use crate::store::KeyValueStore;

pub type LikeSet = BTreeSet<String>;

pub fn entry_id(email: &str, date: NaiveDate) -> String {
    format!("{email}_{date}")
}

/// Every entry's likers. Sets make repeated likes collapse, including
/// duplicates carried in from older stored data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Likes {
    entries: BTreeMap<String, LikeSet>,
}

impl Likes {
    /// Returns whether `account_id` likes the entry afterwards.
    pub fn toggle(&mut self, entry_id: &str, account_id: &str) -> bool {
        let likers = self.entries.entry(entry_id.to_string()).or_default();
        let liked = if likers.remove(account_id) {
            false
        } else {
            likers.insert(account_id.to_string());
            true
        };
        if likers.is_empty() {
            self.entries.remove(entry_id);
        }
        liked
    }

    pub fn count(&self, entry_id: &str) -> usize {
        self.entries.get(entry_id).map_or(0, BTreeSet::len)
    }

    pub fn has_liked(&self, entry_id: &str, account_id: &str) -> bool {
        self.entries
            .get(entry_id)
            .is_some_and(|likers| likers.contains(account_id))
    }

    pub fn likers(&self, entry_id: &str) -> LikeSet {
        self.entries.get(entry_id).cloned().unwrap_or_default()
    }
}

pub struct LikesRegistry<S> {
    store: S,
}

impl<S: KeyValueStore> LikesRegistry<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn snapshot(&self) -> Result<Likes> {
        storage::load_likes(&self.store)
    }

    pub fn toggle(&self, entry_id: &str, account_id: &str) -> Result<LikeSet> {
        let mut likes = self.snapshot()?;
        let liked = likes.toggle(entry_id, account_id);
        storage::save_likes(&self.store, &likes)?;
        debug!(entry_id, account_id, liked, "like toggled");
        Ok(likes.likers(entry_id))
    }

    pub fn count(&self, entry_id: &str) -> Result<usize> {
        Ok(self.snapshot()?.count(entry_id))
    }

    pub fn has_liked(&self, entry_id: &str, account_id: &str) -> Result<bool> {
        Ok(self.snapshot()?.has_liked(entry_id, account_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn entry_ids_join_email_and_date() {
        let date = NaiveDate::from_ymd_opt(2024, 2, 9).unwrap();
        assert_eq!(entry_id("a@b.com", date), "a@b.com_2024-02-09");
    }

    #[test]
    fn toggle_twice_restores_count() {
        let store = MemoryStore::new();
        let registry = LikesRegistry::new(&store);
        registry.toggle("e1", "other@b.com").unwrap();
        let before = registry.count("e1").unwrap();

        let liked = registry.toggle("e1", "u1").unwrap();
        assert!(liked.contains("u1"));
        assert_eq!(registry.count("e1").unwrap(), before + 1);
        assert!(registry.has_liked("e1", "u1").unwrap());

        let unliked = registry.toggle("e1", "u1").unwrap();
        assert!(!unliked.contains("u1"));
        assert_eq!(registry.count("e1").unwrap(), before);
        assert!(!registry.has_liked("e1", "u1").unwrap());
    }

    #[test]
    fn stored_duplicates_collapse() {
        let likes: Likes = serde_json::from_str(r#"{"e1": ["u1", "u1", "u2"]}"#).unwrap();
        assert_eq!(likes.count("e1"), 2);
        assert_eq!(likes.count("missing"), 0);
    }

    #[test]
    fn empty_entries_are_dropped() {
        let mut likes = Likes::default();
        assert!(likes.toggle("e1", "u1"));
        assert!(!likes.toggle("e1", "u1"));
        assert_eq!(likes, Likes::default());
        assert_eq!(serde_json::to_string(&likes).unwrap(), "{}");
    }
}
