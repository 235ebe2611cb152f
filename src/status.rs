//! Rotation status reporting

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::record::{DbCredentials, SecretRecord, SecretSource, SigningKey};

/// Coarse lifecycle label for a record
///
/// Deliberately a two-value set (`active`/`expired`): a record inside its
/// transition window still reports `expired` even though verification
/// accepts it. The disabled-mode report uses its own synthetic label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SecretState {
    #[serde(rename = "active")]
    Active,
    #[serde(rename = "expired")]
    Expired,
    #[serde(rename = "active (rotation disabled)")]
    RotationDisabled,
}

/// Status of one record in a rotating sequence
#[derive(Debug, Clone, Serialize)]
pub struct SecretStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,

    /// Only reported for credential records
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    pub is_current: bool,

    /// Whole days until expiry; negative once expired but not yet pruned
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days_until_expiration: Option<i64>,

    pub status: SecretState,

    /// Only reported for signing-key records
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<SecretSource>,
}

impl SecretStatus {
    fn from_record<M>(record: &SecretRecord<M>, is_current: bool, now: DateTime<Utc>) -> Self {
        Self {
            created_at: Some(record.created_at),
            expires_at: Some(record.expires_at),
            username: None,
            is_current,
            // Floored, not truncated: a record expired by hours reports -1.
            days_until_expiration: Some((record.expires_at - now).num_seconds().div_euclid(86_400)),
            status: if record.is_expired(now) {
                SecretState::Expired
            } else {
                SecretState::Active
            },
            source: None,
        }
    }

    pub(crate) fn signing_key(
        record: &SecretRecord<SigningKey>,
        is_current: bool,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            source: Some(record.source),
            ..Self::from_record(record, is_current, now)
        }
    }

    pub(crate) fn credentials(
        record: &SecretRecord<DbCredentials>,
        is_current: bool,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            username: Some(record.material.username.clone()),
            ..Self::from_record(record, is_current, now)
        }
    }

    fn disabled(username: Option<String>) -> Self {
        Self {
            created_at: None,
            expires_at: None,
            username,
            is_current: true,
            days_until_expiration: None,
            status: SecretState::RotationDisabled,
            source: None,
        }
    }
}

/// Status of every record in both sequences
#[derive(Debug, Clone, Serialize)]
pub struct RotationStatus {
    pub jwt_keys: Vec<SecretStatus>,
    pub db_credentials: Vec<SecretStatus>,
}

impl RotationStatus {
    /// Synthetic single-entry report used while rotation is disabled
    pub(crate) fn disabled(fallback_db_username: &str) -> Self {
        Self {
            jwt_keys: vec![SecretStatus::disabled(None)],
            db_credentials: vec![SecretStatus::disabled(Some(
                fallback_db_username.to_string(),
            ))],
        }
    }
}
