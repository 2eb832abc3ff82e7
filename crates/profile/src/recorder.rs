//! Write side of the profile log.

use common::{ActorId, ProfileId};
use event_store::{EventEnvelope, EventStore, ProfileEvent, ProfileField, Version};

use crate::aggregate::{Profile, validate_field_value};
use crate::config::SnapshotPolicy;
use crate::error::DomainError;
use crate::replay::ReplayService;

/// Turns profile changes into correctly versioned log entries.
///
/// Version conflicts are returned to the caller untouched; the recorder
/// never retries or reorders.
pub struct EventRecorder<S: EventStore> {
    replay: ReplayService<S>,
}

impl<S: EventStore> EventRecorder<S> {
    /// Creates a recorder with the default snapshot policy.
    pub fn new(store: S) -> Self {
        Self {
            replay: ReplayService::new(store),
        }
    }

    /// Creates a recorder with a custom snapshot policy.
    pub fn with_policy(store: S, policy: SnapshotPolicy) -> Self {
        Self {
            replay: ReplayService::with_policy(store, policy),
        }
    }

    /// Returns the replay service used for snapshot maintenance.
    pub fn replay(&self) -> &ReplayService<S> {
        &self.replay
    }

    /// Returns a reference to the underlying event store.
    pub fn store(&self) -> &S {
        self.replay.store()
    }

    /// Records the creation of a new profile at version 1.
    #[tracing::instrument(skip(self, profile), fields(profile_id = %profile.id()))]
    pub async fn record_created(
        &self,
        profile: &Profile,
        actor: ActorId,
    ) -> Result<Version, DomainError> {
        self.append_created(profile, actor).await
    }

    /// Records a change to one field, then runs snapshot maintenance.
    ///
    /// Fails with `NotCreated` on an empty log; call
    /// [`ensure_events_exist`](Self::ensure_events_exist) first. Snapshot
    /// maintenance is best-effort: once the field update is stored, a
    /// maintenance failure is logged and this call still succeeds.
    #[tracing::instrument(skip(self, old_value, new_value))]
    pub async fn record_field_update(
        &self,
        profile_id: ProfileId,
        actor: ActorId,
        field_name: ProfileField,
        old_value: Option<String>,
        new_value: Option<String>,
    ) -> Result<Version, DomainError> {
        validate_field_value(field_name, new_value.as_deref())?;

        let current = self.store().current_version(profile_id).await?;
        if current == Version::initial() {
            return Err(DomainError::NotCreated { profile_id });
        }
        let envelope = EventEnvelope::new(
            profile_id,
            current.next(),
            actor,
            ProfileEvent::FieldUpdated {
                field_name,
                old_value,
                new_value,
            },
        );
        let version = self.append(envelope).await?;

        if let Err(error) = self
            .replay
            .create_snapshot_if_needed(profile_id, actor)
            .await
        {
            metrics::counter!("profile_snapshot_failures_total").increment(1);
            tracing::warn!(%profile_id, %version, %error, "snapshot maintenance failed");
        }

        Ok(version)
    }

    /// Backfills a `Created` event for a profile that predates the log.
    ///
    /// Uses the profile's current values and the current time, since the true
    /// creation values are unknown. Does nothing if any event exists. Returns
    /// whether an event was written.
    #[tracing::instrument(skip(self, profile), fields(profile_id = %profile.id()))]
    pub async fn ensure_events_exist(
        &self,
        profile: &Profile,
        actor: ActorId,
    ) -> Result<bool, DomainError> {
        if self.store().has_events(profile.id()).await? {
            return Ok(false);
        }

        self.append_created(profile, actor).await?;
        tracing::info!(profile_id = %profile.id(), "backfilled synthetic created event");
        Ok(true)
    }

    async fn append_created(&self, profile: &Profile, actor: ActorId) -> Result<Version, DomainError> {
        let envelope = EventEnvelope::new(
            profile.id(),
            Version::first(),
            actor,
            ProfileEvent::Created {
                display_name: profile.display_name().to_string(),
                birthday: profile.field_value(ProfileField::Birthday),
            },
        );
        self.append(envelope).await
    }

    async fn append(&self, envelope: EventEnvelope) -> Result<Version, DomainError> {
        let event_type = envelope.event_type();
        let version = self.store().append_event(envelope).await?;
        metrics::counter!("profile_events_recorded_total", "event_type" => event_type).increment(1);
        tracing::debug!(%version, event_type, "recorded event");
        Ok(version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use event_store::{EventStoreError, InMemoryEventStore};

    #[tokio::test]
    async fn record_created_writes_version_one() {
        let store = InMemoryEventStore::new();
        let recorder = EventRecorder::new(store.clone());
        let profile = Profile::new("John Doe");
        let actor = ActorId::new();

        let version = recorder.record_created(&profile, actor).await.unwrap();
        assert_eq!(version, Version::first());

        let events = store.events(profile.id()).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].changed_by, actor);
        assert_eq!(
            events[0].event,
            ProfileEvent::Created {
                display_name: "John Doe".to_string(),
                birthday: None,
            }
        );
    }

    #[tokio::test]
    async fn record_created_twice_is_a_conflict() {
        let recorder = EventRecorder::new(InMemoryEventStore::new());
        let profile = Profile::new("John Doe");
        recorder.record_created(&profile, ActorId::new()).await.unwrap();

        let result = recorder.record_created(&profile, ActorId::new()).await;
        assert!(matches!(
            result,
            Err(DomainError::EventStore(EventStoreError::VersionConflict { .. }))
        ));
    }

    #[tokio::test]
    async fn field_update_appends_next_version() {
        let store = InMemoryEventStore::new();
        let recorder = EventRecorder::new(store.clone());
        let profile = Profile::new("John Doe");
        recorder.record_created(&profile, ActorId::new()).await.unwrap();

        let version = recorder
            .record_field_update(
                profile.id(),
                ActorId::new(),
                ProfileField::DisplayName,
                Some("John Doe".to_string()),
                Some("Jane Doe".to_string()),
            )
            .await
            .unwrap();

        assert_eq!(version, Version::new(2));
        let state = recorder.replay().replay_events(profile.id()).await.unwrap().unwrap();
        assert_eq!(state.display_name(), "Jane Doe");
        assert_eq!(state.version(), Version::new(2));
    }

    #[tokio::test]
    async fn invalid_value_is_rejected_before_append() {
        let store = InMemoryEventStore::new();
        let recorder = EventRecorder::new(store.clone());
        let profile = Profile::new("John Doe");
        recorder.record_created(&profile, ActorId::new()).await.unwrap();

        let result = recorder
            .record_field_update(
                profile.id(),
                ActorId::new(),
                ProfileField::Birthday,
                None,
                Some("not a date".to_string()),
            )
            .await;

        assert!(matches!(result, Err(DomainError::InvalidFieldValue { .. })));
        assert_eq!(store.event_count().await, 1);
    }

    #[tokio::test]
    async fn field_update_on_empty_log_is_rejected() {
        let store = InMemoryEventStore::new();
        let recorder = EventRecorder::new(store.clone());
        let profile = Profile::new("Legacy User");

        let result = recorder
            .record_field_update(
                profile.id(),
                ActorId::new(),
                ProfileField::DisplayName,
                None,
                Some("X".to_string()),
            )
            .await;
        assert!(matches!(
            result,
            Err(DomainError::NotCreated { profile_id }) if profile_id == profile.id()
        ));
        assert_eq!(store.event_count().await, 0);

        // The log stays empty, so a backfill still writes the creation first.
        assert!(recorder.ensure_events_exist(&profile, ActorId::system()).await.unwrap());
        let events = store.events(profile.id()).await.unwrap();
        assert!(matches!(
            &events[0].event,
            ProfileEvent::Created { display_name, .. } if display_name == "Legacy User"
        ));
    }

    #[tokio::test]
    async fn ensure_events_exist_is_idempotent() {
        let store = InMemoryEventStore::new();
        let recorder = EventRecorder::new(store.clone());
        let profile = Profile::new("Legacy User");

        assert!(recorder.ensure_events_exist(&profile, ActorId::system()).await.unwrap());
        assert!(!recorder.ensure_events_exist(&profile, ActorId::system()).await.unwrap());

        let events = store.events(profile.id()).await.unwrap();
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0].event, ProfileEvent::Created { .. }));
    }

    #[tokio::test]
    async fn snapshot_taken_when_threshold_reached() {
        let store = InMemoryEventStore::new();
        let recorder = EventRecorder::with_policy(store.clone(), SnapshotPolicy::every(3));
        let profile = Profile::new("John Doe");
        recorder.record_created(&profile, ActorId::new()).await.unwrap();

        for name in ["A", "B"] {
            recorder
                .record_field_update(
                    profile.id(),
                    ActorId::new(),
                    ProfileField::DisplayName,
                    None,
                    Some(name.to_string()),
                )
                .await
                .unwrap();
        }

        let snapshot = store.latest_snapshot(profile.id()).await.unwrap().unwrap();
        assert_eq!(snapshot.version, Version::new(4));
        assert_eq!(store.current_version(profile.id()).await.unwrap(), Version::new(4));
    }
}
