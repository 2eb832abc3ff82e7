use thiserror::Error;

use crate::{ProfileId, Version};

/// Errors that can occur when interacting with the event log.
#[derive(Debug, Error)]
pub enum EventStoreError {
    /// An append targeted a version other than `current + 1`.
    ///
    /// Another writer got there first (or the caller computed a stale
    /// version). Re-read the current version and retry.
    #[error(
        "Version conflict for profile {profile_id}: attempted version {expected}, current version is {actual}"
    )]
    VersionConflict {
        profile_id: ProfileId,
        expected: Version,
        actual: Version,
    },

    /// The underlying durable store could not be reached or written.
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// An event payload could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl EventStoreError {
    /// Returns true if the operation can succeed after re-reading the
    /// current version and trying again.
    pub fn is_version_conflict(&self) -> bool {
        matches!(self, EventStoreError::VersionConflict { .. })
    }
}

/// Result type for event store operations.
pub type Result<T> = std::result::Result<T, EventStoreError>;
