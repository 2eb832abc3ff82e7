use std::sync::Arc;

use async_trait::async_trait;

use crate::{EventEnvelope, EventStoreError, ProfileId, Result, Version};

/// Core trait for profile event log implementations.
///
/// The log is append-only and ordered per profile. All implementations must
/// be thread-safe (Send + Sync); reads are fresh queries, never live cursors.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Appends one event to its profile's log.
    ///
    /// Fails with `VersionConflict` unless `event.version` is exactly the
    /// current version plus one. The check and the write happen atomically.
    /// The store never retries.
    ///
    /// Returns the version that was written.
    async fn append_event(&self, event: EventEnvelope) -> Result<Version>;

    /// Returns the highest stored version, or `Version::initial()` if the
    /// profile has no events.
    async fn current_version(&self, profile_id: ProfileId) -> Result<Version>;

    /// Returns true if the profile has at least one event of any kind.
    async fn has_events(&self, profile_id: ProfileId) -> Result<bool> {
        Ok(self.current_version(profile_id).await? > Version::initial())
    }

    /// Retrieves all events with a version strictly greater than
    /// `from_version`, oldest first.
    async fn events_from_version(
        &self,
        profile_id: ProfileId,
        from_version: Version,
    ) -> Result<Vec<EventEnvelope>>;

    /// Retrieves every event for a profile, oldest first.
    async fn events(&self, profile_id: ProfileId) -> Result<Vec<EventEnvelope>> {
        self.events_from_version(profile_id, Version::initial())
            .await
    }

    /// Retrieves the most recently appended snapshot event.
    ///
    /// Returns None if the profile has never been snapshotted.
    async fn latest_snapshot(&self, profile_id: ProfileId) -> Result<Option<EventEnvelope>>;
}

#[async_trait]
impl<T: EventStore + ?Sized> EventStore for Arc<T> {
    async fn append_event(&self, event: EventEnvelope) -> Result<Version> {
        (**self).append_event(event).await
    }

    async fn current_version(&self, profile_id: ProfileId) -> Result<Version> {
        (**self).current_version(profile_id).await
    }

    async fn has_events(&self, profile_id: ProfileId) -> Result<bool> {
        (**self).has_events(profile_id).await
    }

    async fn events_from_version(
        &self,
        profile_id: ProfileId,
        from_version: Version,
    ) -> Result<Vec<EventEnvelope>> {
        (**self).events_from_version(profile_id, from_version).await
    }

    async fn events(&self, profile_id: ProfileId) -> Result<Vec<EventEnvelope>> {
        (**self).events(profile_id).await
    }

    async fn latest_snapshot(&self, profile_id: ProfileId) -> Result<Option<EventEnvelope>> {
        (**self).latest_snapshot(profile_id).await
    }
}

/// Extension trait providing convenience methods for event stores.
#[async_trait]
pub trait EventStoreExt: EventStore {
    /// Loads the latest snapshot and every event appended after it.
    ///
    /// Without a snapshot the full log is returned. The snapshot event itself
    /// is never part of the returned tail.
    async fn load_from_latest_snapshot(
        &self,
        profile_id: ProfileId,
    ) -> Result<(Option<EventEnvelope>, Vec<EventEnvelope>)> {
        match self.latest_snapshot(profile_id).await? {
            Some(snapshot) => {
                let tail = self
                    .events_from_version(profile_id, snapshot.version)
                    .await?;
                Ok((Some(snapshot), tail))
            }
            None => Ok((None, self.events(profile_id).await?)),
        }
    }

    /// Returns the version the next appended event must carry.
    async fn next_version(&self, profile_id: ProfileId) -> Result<Version> {
        Ok(self.current_version(profile_id).await?.next())
    }
}

// Blanket implementation for all EventStore implementations
impl<T: EventStore + ?Sized> EventStoreExt for T {}

/// Checks that `attempted` is the successor of `current`.
///
/// Shared by the store implementations so they agree on what counts as a
/// conflict.
pub fn ensure_next_version(
    profile_id: ProfileId,
    current: Version,
    attempted: Version,
) -> Result<()> {
    if attempted != current.next() {
        return Err(EventStoreError::VersionConflict {
            profile_id,
            expected: attempted,
            actual: current,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_version_is_accepted() {
        let id = ProfileId::new();
        assert!(ensure_next_version(id, Version::initial(), Version::first()).is_ok());
        assert!(ensure_next_version(id, Version::new(49), Version::new(50)).is_ok());
    }

    #[test]
    fn duplicate_or_gapped_version_is_a_conflict() {
        let id = ProfileId::new();

        let duplicate = ensure_next_version(id, Version::new(3), Version::new(3));
        assert!(matches!(
            duplicate,
            Err(EventStoreError::VersionConflict { expected, actual, .. })
                if expected == Version::new(3) && actual == Version::new(3)
        ));

        let gap = ensure_next_version(id, Version::new(3), Version::new(5));
        assert!(gap.unwrap_err().is_version_conflict());
    }
}
