use anyhow::anyhow;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use rand::RngCore;
use tracing::warn;

use crate::error::Result;
use crate::settings::KdfSettings;

pub const SALT_LEN: usize = 16;

fn argon(kdf: &KdfSettings) -> Result<Argon2<'static>> {
    let params = Params::new(kdf.memory_kib, kdf.time_cost, kdf.parallelism, None)
        .map_err(|e| anyhow!("argon2 params: {e}"))?;
    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}

fn generate_salt() -> Result<SaltString> {
    let mut salt = [0u8; SALT_LEN];
    rand::rngs::OsRng.fill_bytes(&mut salt);
    Ok(SaltString::encode_b64(&salt).map_err(|e| anyhow!("encode salt: {e}"))?)
}

/// Hashes `password` into a PHC string carrying its own salt and cost parameters.
pub fn hash_password(password: &str, kdf: &KdfSettings) -> Result<String> {
    let salt = generate_salt()?;
    let hash = argon(kdf)?
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow!("argon2 hash: {e}"))?;
    Ok(hash.to_string())
}

/// Checks `password` against a stored PHC string. An unparseable hash never matches.
pub fn verify_password(password: &str, stored: &str) -> bool {
    let parsed = match PasswordHash::new(stored) {
        Ok(parsed) => parsed,
        Err(err) => {
            warn!(error = %err, "stored password hash is malformed");
            return false;
        }
    };
    // Parameters come from the PHC string, not from the current settings.
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::fast_settings;

    #[test]
    fn hash_roundtrip() {
        let kdf = fast_settings().kdf;
        let stored = hash_password("pass", &kdf).unwrap();
        assert!(stored.starts_with("$argon2id$"));
        assert_ne!(stored, "pass");
        assert!(verify_password("pass", &stored));
        assert!(!verify_password("Pass", &stored));
    }

    #[test]
    fn same_password_gets_fresh_salt() {
        let kdf = fast_settings().kdf;
        let a = hash_password("hunter22", &kdf).unwrap();
        let b = hash_password("hunter22", &kdf).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn garbage_hash_never_matches() {
        assert!(!verify_password("pass", "pass"));
        assert!(!verify_password("", ""));
    }
}
