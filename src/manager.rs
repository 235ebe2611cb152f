//! The secret rotation manager

use chrono::Utc;
use parking_lot::Mutex;
use std::fs;
use std::path::PathBuf;
use tracing::{error, info, warn};

use crate::config::RotationConfig;
use crate::error::RotationError;
use crate::record::{DbCredentials, SecretMaterial, SecretRecord, SecretSource, SigningKey};
use crate::status::{RotationStatus, SecretStatus};
use crate::store::{rotate_if_due, RotationStore};

/// Provides up-to-date signing-key and credential material with automatic,
/// grace-period-aware rotation, backed by a durable JSON document.
///
/// Rotation is lazy: every read runs a rotation-check over the sequence it
/// answers from, pruning records past their transition window and replacing
/// an expired current record, then persists if anything changed. There is
/// no background scheduler.
///
/// The whole read-rotate-persist cycle runs under one lock, so concurrent
/// callers observe either the pre- or post-rotation state, never a
/// partially pruned sequence. Construct one instance per process and inject
/// it into whatever consumes it; tests get isolated instances pointed at
/// isolated directories.
pub struct SecretRotationManager {
    config: RotationConfig,
    secret_file: PathBuf,
    store: Mutex<RotationStore>,
}

impl SecretRotationManager {
    /// Build a manager from configuration.
    ///
    /// Creates the secrets directory, loads the durable document (degrading
    /// to an empty store on any failure) and seeds the configured fallback
    /// signing key when the store starts out empty. With rotation disabled
    /// only the directory step runs; no file is ever read or written.
    ///
    /// Fails only when rotation is enabled and the secrets directory cannot
    /// be created.
    pub fn new(config: RotationConfig) -> Result<Self, RotationError> {
        if let Err(err) = fs::create_dir_all(&config.secrets_dir) {
            if config.enabled {
                return Err(RotationError::StorageUnavailable {
                    path: config.secrets_dir.clone(),
                    source: err,
                });
            }
            warn!(path = %config.secrets_dir.display(), error = %err, "Cannot create secrets directory while rotation is disabled");
        }

        let secret_file = config.secret_file_path();
        let manager = Self {
            store: Mutex::new(if config.enabled {
                RotationStore::load(&secret_file)
            } else {
                RotationStore::default()
            }),
            secret_file,
            config,
        };

        if manager.config.enabled {
            let mut store = manager.store.lock();
            if store.jwt_keys.is_empty() && !manager.config.fallback_signing_key.is_empty() {
                store.jwt_keys.insert(
                    0,
                    SecretRecord::new(
                        SigningKey {
                            key: manager.config.fallback_signing_key.clone(),
                        },
                        Utc::now(),
                        manager.config.key_lifetime(),
                        SecretSource::Config,
                    ),
                );
                info!("Added configured signing key as the initial JWT key");
                manager.persist(&store);
            }
        }

        Ok(manager)
    }

    /// The signing key new tokens should be signed with.
    ///
    /// Runs a rotation-check first, so the answer is never an expired key.
    pub fn current_signing_key(&self) -> String {
        if !self.config.enabled {
            return self.config.fallback_signing_key.clone();
        }

        let mut store = self.store.lock();
        let (material, changed) = Self::current_material(&mut store.jwt_keys, &self.config);
        if changed {
            self.persist(&store);
        }
        material.key
    }

    /// Every key a verifier should accept, newest first.
    ///
    /// Includes expired keys still inside their transition window, so tokens
    /// signed with the immediately-previous key keep verifying.
    pub fn valid_signing_keys(&self) -> Vec<String> {
        if !self.config.enabled {
            return vec![self.config.fallback_signing_key.clone()];
        }

        let mut store = self.store.lock();
        if Self::refresh(&mut store.jwt_keys, &self.config) {
            self.persist(&store);
        }
        store
            .jwt_keys
            .iter()
            .map(|record| record.material.key.clone())
            .collect()
    }

    /// The credential pair new connections should use
    pub fn current_db_credentials(&self) -> DbCredentials {
        if !self.config.enabled {
            return self.fallback_credentials();
        }

        let mut store = self.store.lock();
        let (material, changed) = Self::current_material(&mut store.db_credentials, &self.config);
        if changed {
            self.persist(&store);
        }
        material
    }

    /// Every credential pair still valid for connections, newest first
    pub fn valid_db_credentials(&self) -> Vec<DbCredentials> {
        if !self.config.enabled {
            return vec![self.fallback_credentials()];
        }

        let mut store = self.store.lock();
        if Self::refresh(&mut store.db_credentials, &self.config) {
            self.persist(&store);
        }
        store
            .db_credentials
            .iter()
            .map(|record| record.material.clone())
            .collect()
    }

    /// Insert a fresh signing key as current, regardless of expiry.
    ///
    /// The previous key is kept and ages out through the transition window
    /// like any other record.
    pub fn force_rotate_signing_key(&self) -> String {
        if !self.config.enabled {
            return self.config.fallback_signing_key.clone();
        }

        let mut store = self.store.lock();
        let record = SecretRecord::new(
            SigningKey::generate(),
            Utc::now(),
            self.config.key_lifetime(),
            SecretSource::Rotation,
        );
        let key = record.material.key.clone();
        store.jwt_keys.insert(0, record);
        info!("Generated new JWT signing key");
        self.persist(&store);
        key
    }

    /// Insert a fresh credential pair as current, regardless of expiry
    pub fn force_rotate_db_credentials(&self) -> DbCredentials {
        if !self.config.enabled {
            return self.fallback_credentials();
        }

        let mut store = self.store.lock();
        let record = SecretRecord::new(
            DbCredentials::generate(),
            Utc::now(),
            self.config.key_lifetime(),
            SecretSource::Rotation,
        );
        let credentials = record.material.clone();
        store.db_credentials.insert(0, record);
        info!(username = %credentials.username, "Generated new database credentials");
        self.persist(&store);
        credentials
    }

    /// Status of every record in both sequences.
    ///
    /// Reporting only; performs no rotation-check. While rotation is
    /// disabled, reports one synthetic entry per sequence without touching
    /// the store.
    pub fn status(&self) -> RotationStatus {
        if !self.config.enabled {
            return RotationStatus::disabled(&self.config.fallback_db_username);
        }

        let now = Utc::now();
        let store = self.store.lock();
        RotationStatus {
            jwt_keys: store
                .jwt_keys
                .iter()
                .enumerate()
                .map(|(i, record)| SecretStatus::signing_key(record, i == 0, now))
                .collect(),
            db_credentials: store
                .db_credentials
                .iter()
                .enumerate()
                .map(|(i, record)| SecretStatus::credentials(record, i == 0, now))
                .collect(),
        }
    }

    /// Rotation-check one sequence; returns whether it changed
    fn refresh<M: SecretMaterial>(
        records: &mut Vec<SecretRecord<M>>,
        config: &RotationConfig,
    ) -> bool {
        rotate_if_due(
            records,
            Utc::now(),
            config.key_lifetime(),
            config.transition_period(),
        )
    }

    /// Rotation-check one sequence and hand back its current material
    fn current_material<M: SecretMaterial>(
        records: &mut Vec<SecretRecord<M>>,
        config: &RotationConfig,
    ) -> (M, bool) {
        let mut changed = Self::refresh(records, config);

        // Guard: a sequence must never answer empty. rotate_if_due refills a
        // drained sequence, so this branch is not expected to run.
        if records.is_empty() {
            records.insert(
                0,
                SecretRecord::new(
                    M::generate(),
                    Utc::now(),
                    config.key_lifetime(),
                    SecretSource::Rotation,
                ),
            );
            changed = true;
        }

        (records[0].material.clone(), changed)
    }

    fn fallback_credentials(&self) -> DbCredentials {
        DbCredentials {
            username: self.config.fallback_db_username.clone(),
            password: self.config.fallback_db_password.clone(),
        }
    }

    /// Mirror the in-memory store to durable storage.
    ///
    /// A write failure is logged and swallowed: the in-memory state stays
    /// authoritative for the rest of the process lifetime, only durability
    /// of the latest mutation is at risk.
    fn persist(&self, store: &RotationStore) {
        match store.save(&self.secret_file) {
            Ok(()) => info!(path = %self.secret_file.display(), "Saved secrets"),
            Err(err) => {
                error!(path = %self.secret_file.display(), error = %err, "Error saving secrets");
            }
        }
    }
}
