//! Rotation configuration

use chrono::Duration;
use serde::Deserialize;
use std::path::PathBuf;

/// Name of the durable document inside the secrets directory
pub const SECRET_FILE_NAME: &str = "secret_keys.json";

/// Configuration for the rotation manager
///
/// The static fallbacks answer every query while rotation is disabled and
/// seed the initial signing key when the store starts out empty.
#[derive(Debug, Clone, Deserialize)]
pub struct RotationConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Days before a current record is considered expired
    #[serde(default = "default_key_lifetime_days")]
    pub key_lifetime_days: i64,

    /// Days an expired record stays valid for verification
    #[serde(default = "default_transition_period_days")]
    pub transition_period_days: i64,

    /// Directory holding the durable document (created if absent)
    #[serde(default = "default_secrets_dir")]
    pub secrets_dir: PathBuf,

    #[serde(default)]
    pub fallback_signing_key: String,

    #[serde(default)]
    pub fallback_db_username: String,

    #[serde(default)]
    pub fallback_db_password: String,
}

impl Default for RotationConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            key_lifetime_days: default_key_lifetime_days(),
            transition_period_days: default_transition_period_days(),
            secrets_dir: default_secrets_dir(),
            fallback_signing_key: String::new(),
            fallback_db_username: String::new(),
            fallback_db_password: String::new(),
        }
    }
}

fn default_enabled() -> bool {
    true
}

fn default_key_lifetime_days() -> i64 {
    30
}

fn default_transition_period_days() -> i64 {
    1
}

fn default_secrets_dir() -> PathBuf {
    PathBuf::from("secrets")
}

impl RotationConfig {
    /// Load configuration from file and environment
    pub fn load() -> anyhow::Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("keywheel").required(false))
            .add_source(config::Environment::with_prefix("KEYWHEEL"))
            .build()?;

        Ok(config.try_deserialize::<Self>()?)
    }

    pub fn key_lifetime(&self) -> Duration {
        Duration::days(self.key_lifetime_days)
    }

    pub fn transition_period(&self) -> Duration {
        Duration::days(self.transition_period_days)
    }

    /// Path of the durable document
    pub fn secret_file_path(&self) -> PathBuf {
        self.secrets_dir.join(SECRET_FILE_NAME)
    }
}
