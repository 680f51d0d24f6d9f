use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointRules {
    /// Flat part of both the solve and the upload award; the streak is added on top.
    pub base: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordRules {
    pub min_len: usize,
    pub min_reset_len: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentenceRules {
    pub min_chars: usize,
    pub max_words: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfSettings {
    pub memory_kib: u32,
    pub time_cost: u32,
    pub parallelism: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSettings {
    pub points: PointRules,
    pub history_cap: usize,
    pub passwords: PasswordRules,
    pub sentences: SentenceRules,
    #[serde(default = "default_kdf")]
    pub kdf: KdfSettings,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            points: PointRules { base: 5 },
            history_cap: 100,
            passwords: PasswordRules {
                min_len: 4,
                min_reset_len: 8,
            },
            sentences: SentenceRules {
                min_chars: 10,
                max_words: 20,
            },
            kdf: default_kdf(),
        }
    }
}

fn default_kdf() -> KdfSettings {
    KdfSettings {
        memory_kib: 19 * 1024,
        time_cost: 2,
        parallelism: 1,
    }
}

#[cfg(test)]
pub(crate) fn fast_settings() -> GameSettings {
    GameSettings {
        kdf: KdfSettings {
            memory_kib: 64,
            time_cost: 1,
            parallelism: 1,
        },
        ..GameSettings::default()
    }
}
