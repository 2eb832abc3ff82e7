//! Domain error types.

use common::ProfileId;
use event_store::{EventStoreError, ProfileField, Version};
use thiserror::Error;

/// Errors that can occur while recording or replaying profile events.
#[derive(Debug, Error)]
pub enum DomainError {
    /// An error occurred in the event store.
    ///
    /// Passed through unchanged so callers can tell a version conflict
    /// (retryable) from an unavailable store.
    #[error("Event store error: {0}")]
    EventStore(#[from] EventStoreError),

    /// A stored snapshot could not be turned back into profile state.
    #[error("Corrupt snapshot for profile {profile_id} at version {version}: {source}")]
    CorruptSnapshot {
        profile_id: ProfileId,
        version: Version,
        #[source]
        source: serde_json::Error,
    },

    /// A stored event carries a value the fold cannot interpret.
    #[error("Corrupt event for profile {profile_id} at version {version}: {reason}")]
    CorruptEvent {
        profile_id: ProfileId,
        version: Version,
        reason: String,
    },

    /// A change was recorded for a profile whose log has no `Created` event.
    #[error("Profile {profile_id} has no events; record or backfill its creation first")]
    NotCreated { profile_id: ProfileId },

    /// A field value was rejected before it reached the log.
    #[error("Invalid value {value:?} for field {field}")]
    InvalidFieldValue {
        field: ProfileField,
        value: Option<String>,
    },

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DomainError {
    /// Returns true if re-reading the current version and retrying may
    /// succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DomainError::EventStore(e) if e.is_version_conflict())
    }
}
