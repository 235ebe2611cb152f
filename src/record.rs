//! Secret records and key material generation

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Provenance of a secret record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SecretSource {
    /// Seeded from static configuration
    Config,
    /// Generated by the rotation algorithm
    Rotation,
    /// Persisted by an older writer that did not tag provenance
    #[default]
    Unknown,
}

/// Material that can be minted fresh by the rotation algorithm
pub trait SecretMaterial: Clone {
    fn generate() -> Self;
}

/// A JWT signing key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SigningKey {
    pub key: String,
}

impl SecretMaterial for SigningKey {
    /// 32 random bytes (256 bits), URL-safe base64 without padding
    fn generate() -> Self {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self {
            key: URL_SAFE_NO_PAD.encode(bytes),
        }
    }
}

/// A database credential pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DbCredentials {
    pub username: String,
    pub password: String,
}

impl SecretMaterial for DbCredentials {
    /// Username carries a uniqueness token; password is 16 random bytes
    /// (128 bits), URL-safe base64 without padding
    fn generate() -> Self {
        let mut bytes = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self {
            username: format!("db_user_{}", Uuid::new_v4().simple()),
            password: URL_SAFE_NO_PAD.encode(bytes),
        }
    }
}

/// A time-boxed secret with its validity window
///
/// The material is flattened into the record on disk, so a signing-key
/// record carries a `key` field and a credential record carries
/// `username`/`password`, alongside the shared lifecycle fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecretRecord<M> {
    /// Correlation id; documents written before ids existed get a fresh one
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,

    #[serde(flatten)]
    pub material: M,

    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,

    #[serde(default)]
    pub source: SecretSource,
}

impl<M> SecretRecord<M> {
    /// Create a record valid from `now` until `now + lifetime`
    pub fn new(material: M, now: DateTime<Utc>, lifetime: Duration, source: SecretSource) -> Self {
        Self {
            id: Uuid::new_v4(),
            material,
            created_at: now,
            expires_at: now + lifetime,
            source,
        }
    }

    /// Past nominal expiry; no longer eligible to be current
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Past expiry and past the transition grace window; eligible for removal
    pub fn is_prunable(&self, now: DateTime<Utc>, transition_period: Duration) -> bool {
        self.expires_at + transition_period <= now
    }
}
