//! Rotation error types

use std::path::PathBuf;
use thiserror::Error;

/// Errors from the rotation manager and its storage layer
///
/// Only `StorageUnavailable` ever reaches a caller (a manager cannot be
/// constructed without a writable location while rotation is enabled).
/// The I/O and parse variants are internal plumbing: load failures degrade
/// to an empty store, save failures are logged and the in-memory state
/// stays authoritative.
#[derive(Debug, Error)]
pub enum RotationError {
    #[error("Secrets directory unavailable: {path}")]
    StorageUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed secrets document: {0}")]
    Malformed(#[from] serde_json::Error),
}
