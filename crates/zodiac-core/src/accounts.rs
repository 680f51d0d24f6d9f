//! Account profiles, credentials and the single active session.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{Result, ZodiacError};
use crate::password::{hash_password, verify_password};
use crate::settings::GameSettings;
use crate::storage;
use crate::store::KeyValueStore;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub email: String,
    pub password_hash: String,
    #[serde(default)]
    pub username: String,
    pub birthday: NaiveDate,
    #[serde(default)]
    pub theme: Theme,
}

impl Profile {
    /// Username, or the email local-part for profiles that never had one.
    pub fn display_name(&self) -> &str {
        if self.username.is_empty() {
            local_part(&self.email)
        } else {
            &self.username
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub email: String,
    pub session_id: Uuid,
    pub started_at: DateTime<Utc>,
}

impl Session {
    pub fn start(email: &str) -> Self {
        Self {
            email: email.to_string(),
            session_id: Uuid::new_v4(),
            started_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub username: Option<String>,
    pub theme: Option<Theme>,
    pub birthday: Option<NaiveDate>,
}

pub fn local_part(email: &str) -> &str {
    email.split('@').next().unwrap_or(email)
}

fn normalize(username: &str) -> String {
    username.to_lowercase()
}

// ── Directory ───────────────────────────────────────────────────────────────

/// The profile list with email and case-folded username indexes.
#[derive(Debug, Default)]
pub struct ProfileDirectory {
    profiles: Vec<Profile>,
    by_email: HashMap<String, usize>,
    by_username: HashMap<String, usize>,
}

impl ProfileDirectory {
    pub fn new(profiles: Vec<Profile>) -> Self {
        let mut by_email = HashMap::new();
        let mut by_username = HashMap::new();
        for (idx, profile) in profiles.iter().enumerate() {
            by_email.entry(profile.email.clone()).or_insert(idx);
            if !profile.username.is_empty() {
                by_username.entry(normalize(&profile.username)).or_insert(idx);
            }
        }
        Self {
            profiles,
            by_email,
            by_username,
        }
    }

    pub fn by_email(&self, email: &str) -> Option<&Profile> {
        self.by_email.get(email).map(|&idx| &self.profiles[idx])
    }

    pub fn by_username(&self, username: &str) -> Option<&Profile> {
        self.by_username
            .get(&normalize(username))
            .map(|&idx| &self.profiles[idx])
    }

    /// `base` if free, else `base1`, `base2`, ... whichever is free first.
    pub fn available_username(&self, base: &str) -> String {
        if self.by_username(base).is_none() {
            return base.to_string();
        }
        (1u64..)
            .map(|n| format!("{base}{n}"))
            .find(|candidate| self.by_username(candidate).is_none())
            .unwrap_or_else(|| base.to_string())
    }

    pub fn upsert(&mut self, profile: Profile) {
        match self.by_email.get(&profile.email) {
            Some(&idx) => self.profiles[idx] = profile,
            None => self.profiles.push(profile),
        }
        *self = Self::new(std::mem::take(&mut self.profiles));
    }

    pub fn remove(&mut self, email: &str) -> bool {
        let before = self.profiles.len();
        self.profiles.retain(|p| p.email != email);
        let removed = self.profiles.len() != before;
        if removed {
            *self = Self::new(std::mem::take(&mut self.profiles));
        }
        removed
    }

    pub fn profiles(&self) -> &[Profile] {
        &self.profiles
    }
}

// ── Store ───────────────────────────────────────────────────────────────────

pub struct AccountStore<S> {
    store: S,
    settings: GameSettings,
}

impl<S: KeyValueStore> AccountStore<S> {
    pub fn new(store: S, settings: GameSettings) -> Self {
        Self { store, settings }
    }

    fn directory(&self) -> Result<ProfileDirectory> {
        Ok(ProfileDirectory::new(storage::load_profiles(&self.store)?))
    }

    fn commit(&self, directory: &ProfileDirectory) -> Result<()> {
        storage::save_profiles(&self.store, directory.profiles())
    }

    pub fn register(
        &self,
        email: &str,
        password: &str,
        birthday: Option<NaiveDate>,
    ) -> Result<Profile> {
        if !email.contains('@') || local_part(email).trim().is_empty() {
            return Err(ZodiacError::invalid("please enter a valid email address"));
        }
        self.check_password_len(password)?;
        let birthday =
            birthday.ok_or_else(|| ZodiacError::invalid("please select a complete birthday"))?;

        let mut directory = self.directory()?;
        if directory.by_email(email).is_some() {
            return Err(ZodiacError::DuplicateEmail(email.to_string()));
        }

        let profile = Profile {
            email: email.to_string(),
            password_hash: hash_password(password, &self.settings.kdf)?,
            username: directory.available_username(local_part(email)),
            birthday,
            theme: Theme::Dark,
        };
        directory.upsert(profile.clone());
        // Each write is atomic on its own. The profile lands first so a failed
        // session write leaves a usable account that can sign in.
        self.commit(&directory)?;
        storage::save_session(&self.store, &Session::start(email))?;
        info!(email = %profile.email, username = %profile.username, "account registered");
        Ok(profile)
    }

    pub fn sign_in(&self, identifier: &str, password: &str) -> Result<Profile> {
        if identifier.is_empty() {
            return Err(ZodiacError::invalid("please enter your email or username"));
        }
        self.check_password_len(password)?;

        let directory = self.directory()?;
        let found = if identifier.contains('@') {
            directory.by_email(identifier)
        } else {
            directory.by_username(identifier)
        };
        let profile = found
            .cloned()
            .ok_or_else(|| ZodiacError::NotFound(format!("no account for {identifier}")))?;
        if !verify_password(password, &profile.password_hash) {
            return Err(ZodiacError::InvalidCredential);
        }
        storage::save_session(&self.store, &Session::start(&profile.email))?;
        info!(email = %profile.email, "signed in");
        Ok(profile)
    }

    pub fn sign_out(&self) -> Result<()> {
        storage::clear_session(&self.store)?;
        debug!("signed out");
        Ok(())
    }

    pub fn update_profile(&self, email: &str, update: ProfileUpdate) -> Result<Profile> {
        let mut directory = self.directory()?;
        let mut profile = directory
            .by_email(email)
            .cloned()
            .ok_or_else(|| ZodiacError::NotFound(format!("profile {email}")))?;

        if let Some(username) = update.username {
            let username = username.trim();
            if username.is_empty() {
                return Err(ZodiacError::invalid("username cannot be empty"));
            }
            if username.contains('@') {
                return Err(ZodiacError::invalid("username cannot contain '@'"));
            }
            if let Some(holder) = directory.by_username(username) {
                if holder.email != email {
                    return Err(ZodiacError::UsernameTaken(username.to_string()));
                }
            }
            profile.username = username.to_string();
        }
        if let Some(theme) = update.theme {
            profile.theme = theme;
        }
        if let Some(birthday) = update.birthday {
            profile.birthday = birthday;
        }

        directory.upsert(profile.clone());
        self.commit(&directory)?;
        info!(email, "profile updated");
        Ok(profile)
    }

    pub fn reset_password(
        &self,
        email: &str,
        current: &str,
        next: &str,
        confirm: &str,
    ) -> Result<Profile> {
        let min = self.settings.passwords.min_reset_len;
        if next.chars().count() < min {
            return Err(ZodiacError::invalid(format!(
                "new password must be at least {min} characters long"
            )));
        }
        if next != confirm {
            return Err(ZodiacError::invalid("new passwords do not match"));
        }

        let mut directory = self.directory()?;
        let mut profile = directory
            .by_email(email)
            .cloned()
            .ok_or_else(|| ZodiacError::NotFound(format!("profile {email}")))?;
        if !verify_password(current, &profile.password_hash) {
            return Err(ZodiacError::InvalidCredential);
        }
        if next == current {
            return Err(ZodiacError::invalid(
                "new password must be different from current password",
            ));
        }

        profile.password_hash = hash_password(next, &self.settings.kdf)?;
        directory.upsert(profile.clone());
        self.commit(&directory)?;
        info!(email, "password reset");
        Ok(profile)
    }

    /// Removes the profile, its ledger and issued puzzle. Likes it gave or
    /// received are left in place.
    pub fn delete_account(&self, email: &str) -> Result<()> {
        // Dropping the profile first hides the account from every aggregate.
        // A failure after that leaves stray records a repeat call cleans up.
        let mut directory = self.directory()?;
        if directory.remove(email) {
            self.commit(&directory)?;
        }
        storage::remove_ledger(&self.store, email)?;
        storage::remove_puzzle(&self.store, email)?;
        if let Some(session) = storage::load_session(&self.store)? {
            if session.email == email {
                storage::clear_session(&self.store)?;
            }
        }
        info!(email, "account deleted");
        Ok(())
    }

    pub fn profile(&self, email: &str) -> Result<Profile> {
        self.directory()?
            .by_email(email)
            .cloned()
            .ok_or_else(|| ZodiacError::NotFound(format!("profile {email}")))
    }

    pub fn profiles(&self) -> Result<Vec<Profile>> {
        storage::load_profiles(&self.store)
    }

    pub fn current_session(&self) -> Result<Option<Session>> {
        storage::load_session(&self.store)
    }

    /// Profile behind the active session, if the session still points at one.
    pub fn current_profile(&self) -> Result<Option<Profile>> {
        let Some(session) = self.current_session()? else {
            return Ok(None);
        };
        Ok(self.directory()?.by_email(&session.email).cloned())
    }

    fn check_password_len(&self, password: &str) -> Result<()> {
        let min = self.settings.passwords.min_len;
        if password.chars().count() < min {
            return Err(ZodiacError::invalid(format!(
                "password must be at least {min} characters"
            )));
        }
        Ok(())
    }
}
