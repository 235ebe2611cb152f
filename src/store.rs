//! Durable rotation store and the rotation-check pass

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{error, info};

use crate::error::RotationError;
use crate::record::{DbCredentials, SecretMaterial, SecretRecord, SecretSource, SigningKey};

/// The full persisted state: two rotating sequences, newest-first
///
/// Index 0 of each sequence is the current record. On disk this is a JSON
/// document with `jwt` and `db_credential` arrays.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct RotationStore {
    #[serde(rename = "jwt", default)]
    pub jwt_keys: Vec<SecretRecord<SigningKey>>,

    #[serde(rename = "db_credential", default)]
    pub db_credentials: Vec<SecretRecord<DbCredentials>>,
}

impl RotationStore {
    /// Load the store from `path`, degrading to an empty store on any
    /// read or parse failure
    pub(crate) fn load(path: &Path) -> Self {
        if !path.exists() {
            info!(path = %path.display(), "No secrets file found, initializing new store");
            return Self::default();
        }

        match fs::read_to_string(path).map_err(RotationError::from).and_then(|raw| {
            serde_json::from_str::<Self>(&raw).map_err(RotationError::from)
        }) {
            Ok(store) => {
                info!(path = %path.display(), "Loaded secrets");
                store
            }
            Err(err) => {
                error!(path = %path.display(), error = %err, "Error loading secrets, starting from an empty store");
                Self::default()
            }
        }
    }

    /// Write the store to `path` and clamp permissions to owner read/write
    pub(crate) fn save(&self, path: &Path) -> Result<(), RotationError> {
        let raw = serde_json::to_string_pretty(self)?;
        fs::write(path, raw)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
        }

        Ok(())
    }
}

/// One rotation-check pass over a sequence
///
/// Prunes records past their transition window, then replaces the current
/// record when it has expired (or the sequence drained). Returns whether
/// the sequence changed, so the caller persists only on mutation.
pub(crate) fn rotate_if_due<M: SecretMaterial>(
    records: &mut Vec<SecretRecord<M>>,
    now: DateTime<Utc>,
    lifetime: Duration,
    transition_period: Duration,
) -> bool {
    let current_expired = records.first().is_some_and(|r| r.is_expired(now));

    let before = records.len();
    records.retain(|record| {
        if record.is_prunable(now, transition_period) {
            info!(created_at = %record.created_at, "Removing secret record expired beyond the transition period");
            false
        } else {
            true
        }
    });
    let mut changed = records.len() != before;

    if current_expired || records.is_empty() {
        records.insert(
            0,
            SecretRecord::new(M::generate(), now, lifetime, SecretSource::Rotation),
        );
        changed = true;
    }

    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn key_record(key: &str, created_offset: Duration, expires_offset: Duration) -> SecretRecord<SigningKey> {
        let now = Utc::now();
        SecretRecord {
            id: uuid::Uuid::new_v4(),
            material: SigningKey {
                key: key.to_string(),
            },
            created_at: now + created_offset,
            expires_at: now + expires_offset,
            source: SecretSource::Rotation,
        }
    }

    // =========================================================================
    // ROTATION-CHECK
    // =========================================================================

    #[test]
    fn prunes_only_past_the_transition_window() {
        let now = Utc::now();
        // Newest-first: fresh, expired-within-grace, expired-beyond-grace.
        let mut records = vec![
            key_record("fresh", Duration::zero(), Duration::days(10)),
            key_record("in-grace", -Duration::days(1), -Duration::hours(12)),
            key_record("stale", -Duration::days(3), -Duration::days(2)),
        ];

        let changed = rotate_if_due(&mut records, now, Duration::days(30), Duration::days(1));

        assert!(changed);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].material.key, "fresh");
        assert_eq!(records[1].material.key, "in-grace");
    }

    #[test]
    fn replaces_expired_current_record() {
        let now = Utc::now();
        let mut records = vec![key_record("old", -Duration::days(1), -Duration::hours(1))];

        let changed = rotate_if_due(&mut records, now, Duration::days(30), Duration::days(1));

        assert!(changed);
        assert_eq!(records.len(), 2);
        assert_ne!(records[0].material.key, "old");
        assert_eq!(records[1].material.key, "old");
        // Newest-first ordering holds after insertion.
        assert!(records[0].created_at >= records[1].created_at);
    }

    #[test]
    fn refills_a_drained_sequence() {
        let now = Utc::now();
        let mut records = vec![key_record("stale", -Duration::days(5), -Duration::days(3))];

        let changed = rotate_if_due(&mut records, now, Duration::days(30), Duration::days(1));

        assert!(changed);
        assert_eq!(records.len(), 1);
        assert_ne!(records[0].material.key, "stale");
        assert_eq!(records[0].source, SecretSource::Rotation);
    }

    #[test]
    fn fills_an_empty_sequence() {
        let mut records: Vec<SecretRecord<SigningKey>> = Vec::new();

        let changed = rotate_if_due(&mut records, Utc::now(), Duration::days(30), Duration::days(1));

        assert!(changed);
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn second_pass_is_a_no_op() {
        let now = Utc::now();
        let mut records = vec![key_record("old", -Duration::days(1), -Duration::hours(1))];

        assert!(rotate_if_due(&mut records, now, Duration::days(30), Duration::days(1)));
        let snapshot: Vec<_> = records.iter().map(|r| r.id).collect();

        assert!(!rotate_if_due(&mut records, now, Duration::days(30), Duration::days(1)));
        let after: Vec<_> = records.iter().map(|r| r.id).collect();
        assert_eq!(snapshot, after);
    }

    // =========================================================================
    // PERSISTENCE
    // =========================================================================

    #[test]
    fn save_and_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("secret_keys.json");

        let store = RotationStore {
            jwt_keys: vec![key_record("k1", Duration::zero(), Duration::days(30))],
            db_credentials: vec![SecretRecord::new(
                DbCredentials::generate(),
                Utc::now(),
                Duration::days(30),
                SecretSource::Rotation,
            )],
        };
        store.save(&path).unwrap();

        let loaded = RotationStore::load(&path);
        assert_eq!(loaded.jwt_keys.len(), 1);
        assert_eq!(loaded.jwt_keys[0].material.key, "k1");
        assert_eq!(loaded.db_credentials.len(), 1);
        assert_eq!(
            loaded.db_credentials[0].material,
            store.db_credentials[0].material
        );
    }

    #[test]
    fn document_uses_named_arrays() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("secret_keys.json");

        let store = RotationStore {
            jwt_keys: vec![key_record("k1", Duration::zero(), Duration::days(30))],
            db_credentials: Vec::new(),
        };
        store.save(&path).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert!(value["jwt"].is_array());
        assert!(value["db_credential"].is_array());
    }

    #[cfg(unix)]
    #[test]
    fn saved_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("secret_keys.json");
        RotationStore::default().save(&path).unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn missing_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        let store = RotationStore::load(&dir.path().join("absent.json"));
        assert!(store.jwt_keys.is_empty());
        assert!(store.db_credentials.is_empty());
    }

    #[test]
    fn malformed_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("secret_keys.json");
        fs::write(&path, "{ not json").unwrap();

        let store = RotationStore::load(&path);
        assert!(store.jwt_keys.is_empty());
        assert!(store.db_credentials.is_empty());
    }
}
