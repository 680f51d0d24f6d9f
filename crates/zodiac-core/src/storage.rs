//! Typed records over the key/value substrate.
//!
//! Reads never fail on malformed data: a record that does not parse is logged
//! and replaced by its empty default. Substrate I/O errors still propagate.

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use crate::accounts::{Profile, Session};
use crate::error::Result;
use crate::ledger::AccountLedger;
use crate::likes::Likes;
use crate::puzzle::Puzzle;
use crate::settings::GameSettings;
use crate::store::KeyValueStore;

pub const SESSION_KEY: &str = "zodiac.session";
pub const PROFILES_KEY: &str = "zodiac.profiles";
pub const LIKES_KEY: &str = "zodiac.likes";
pub const SETTINGS_KEY: &str = "zodiac.settings";
const LEDGER_PREFIX: &str = "zodiac.ledger.";
const PUZZLE_PREFIX: &str = "zodiac.puzzle.";

pub fn ledger_key(email: &str) -> String {
    format!("{LEDGER_PREFIX}{email}")
}

pub fn puzzle_key(email: &str) -> String {
    format!("{PUZZLE_PREFIX}{email}")
}

fn load_or_default<S, T>(store: &S, key: &str) -> Result<T>
where
    S: KeyValueStore + ?Sized,
    T: DeserializeOwned + Default,
{
    let Some(raw) = store.get(key)? else {
        return Ok(T::default());
    };
    match serde_json::from_str(&raw) {
        Ok(value) => Ok(value),
        Err(err) => {
            warn!(key, error = %err, "stored record is malformed; using default");
            Ok(T::default())
        }
    }
}

fn save<S, T>(store: &S, key: &str, value: &T) -> Result<()>
where
    S: KeyValueStore + ?Sized,
    T: Serialize,
{
    let data = serde_json::to_string(value).map_err(anyhow::Error::from)?;
    store.put(key, &data)?;
    Ok(())
}

pub fn load_profiles<S: KeyValueStore + ?Sized>(store: &S) -> Result<Vec<Profile>> {
    load_or_default(store, PROFILES_KEY)
}

pub fn save_profiles<S: KeyValueStore + ?Sized>(store: &S, profiles: &[Profile]) -> Result<()> {
    save(store, PROFILES_KEY, &profiles)
}

pub fn load_session<S: KeyValueStore + ?Sized>(store: &S) -> Result<Option<Session>> {
    load_or_default(store, SESSION_KEY)
}

pub fn save_session<S: KeyValueStore + ?Sized>(store: &S, session: &Session) -> Result<()> {
    save(store, SESSION_KEY, session)
}

pub fn clear_session<S: KeyValueStore + ?Sized>(store: &S) -> Result<()> {
    store.remove(SESSION_KEY)?;
    Ok(())
}

pub fn load_ledger<S: KeyValueStore + ?Sized>(store: &S, email: &str) -> Result<AccountLedger> {
    load_or_default(store, &ledger_key(email))
}

pub fn save_ledger<S: KeyValueStore + ?Sized>(
    store: &S,
    email: &str,
    ledger: &AccountLedger,
) -> Result<()> {
    save(store, &ledger_key(email), ledger)
}

pub fn remove_ledger<S: KeyValueStore + ?Sized>(store: &S, email: &str) -> Result<()> {
    store.remove(&ledger_key(email))?;
    Ok(())
}

pub fn load_likes<S: KeyValueStore + ?Sized>(store: &S) -> Result<Likes> {
    load_or_default(store, LIKES_KEY)
}

pub fn save_likes<S: KeyValueStore + ?Sized>(store: &S, likes: &Likes) -> Result<()> {
    save(store, LIKES_KEY, likes)
}

pub fn load_puzzle<S: KeyValueStore + ?Sized>(store: &S, email: &str) -> Result<Option<Puzzle>> {
    load_or_default(store, &puzzle_key(email))
}

pub fn save_puzzle<S: KeyValueStore + ?Sized>(store: &S, email: &str, puzzle: &Puzzle) -> Result<()> {
    save(store, &puzzle_key(email), puzzle)
}

pub fn remove_puzzle<S: KeyValueStore + ?Sized>(store: &S, email: &str) -> Result<()> {
    store.remove(&puzzle_key(email))?;
    Ok(())
}

pub fn load_settings<S: KeyValueStore + ?Sized>(store: &S) -> Result<GameSettings> {
    load_or_default(store, SETTINGS_KEY)
}

pub fn save_settings<S: KeyValueStore + ?Sized>(store: &S, settings: &GameSettings) -> Result<()> {
    save(store, SETTINGS_KEY, settings)
}
