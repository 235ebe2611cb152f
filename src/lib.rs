//! Grace-period-aware secret rotation
//!
//! Maintains two independently rotating collections of time-boxed secrets
//! with support for:
//! - JWT-style signing keys and database credential pairs
//! - Lazy, read-triggered rotation (no background scheduler)
//! - Overlapping validity windows so verifiers never see a hard cutover
//! - File-backed persistence with owner-only permissions

pub mod config;
pub mod error;
pub mod manager;
pub mod record;
pub mod status;
mod store;

pub use config::RotationConfig;
pub use error::RotationError;
pub use manager::SecretRotationManager;
pub use record::{DbCredentials, SecretRecord, SecretSource, SigningKey};
pub use status::{RotationStatus, SecretState, SecretStatus};
pub use store::RotationStore;
