//! zodiac-core: accounts, the daily deed ledger, likes and leaderboards for the
//! Zodiac Cipher puzzle game, kept in a flat key/value store.

pub mod accounts;
pub mod cipher;
pub mod clock;
pub mod error;
pub mod feed;
pub mod leaderboard;
pub mod ledger;
pub mod likes;
pub mod password;
pub mod paths;
pub mod puzzle;
pub mod settings;
pub mod storage;
pub mod store;

pub use accounts::{AccountStore, Profile, ProfileUpdate, Session, Theme};
pub use error::{Result, ZodiacError};
pub use ledger::{AccountLedger, Deed, DeedLedger, LedgerRules};
pub use likes::{Likes, LikesRegistry};
pub use store::{FileStore, KeyValueStore, MemoryStore};
