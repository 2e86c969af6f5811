use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors surfaced by store instances and the registry.
///
/// `set` never produces one of these; every other operation reports its
/// failure to the awaiting caller.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store `{0}` is already registered")]
    DuplicateName(String),
    #[error("store `{0}` not found")]
    InstanceNotFound(String),
    #[error("io error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("corrupt snapshot {}: {reason}", .path.display())]
    CorruptSnapshot { path: PathBuf, reason: String },
    #[error("snapshot encode error: {0}")]
    Encode(String),
}

impl StoreError {
    pub fn not_found(name: &str) -> Self { Self::InstanceNotFound(name.to_string()) }

    pub fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io { path: path.to_path_buf(), source }
    }

    pub fn corrupt(path: &Path, reason: impl Into<String>) -> Self {
        Self::CorruptSnapshot { path: path.to_path_buf(), reason: reason.into() }
    }

    /// Stable numeric code for external mapping/logging
    pub fn code(&self) -> u16 {
        match self {
            StoreError::DuplicateName(_) => 2001,
            StoreError::InstanceNotFound(_) => 2002,
            StoreError::Io { .. } => 2101,
            StoreError::CorruptSnapshot { .. } => 2102,
            StoreError::Encode(_) => 2103,
        }
    }
}
