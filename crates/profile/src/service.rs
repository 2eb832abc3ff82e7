//! Profile service providing the workflow the application calls into.

use chrono::{DateTime, NaiveDate, Utc};
use common::{ActorId, ProfileId};
use event_store::{EventEnvelope, EventStore, ProfileField, Version};

use crate::aggregate::{Profile, canonical_birthday};
use crate::config::{EngineConfig, RetryPolicy};
use crate::error::DomainError;
use crate::recorder::EventRecorder;
use crate::state::ProfileState;

/// Outcome of a field change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldChange {
    /// A `FieldUpdated` event was recorded at this version.
    Recorded(Version),
    /// The new value equals the current one; nothing was written.
    Unchanged,
}

/// Service for mutating and reading profiles through the event log.
///
/// Mirrors what the profile-mutation workflow does: validate, make sure
/// legacy profiles have a log, record the change, then update the in-memory
/// aggregate. Version conflicts are retried here, in the caller, according to
/// the [`RetryPolicy`].
pub struct ProfileService<S: EventStore> {
    recorder: EventRecorder<S>,
    retry: RetryPolicy,
}

impl<S: EventStore> ProfileService<S> {
    /// Creates a new profile service with default tunables.
    pub fn new(store: S) -> Self {
        Self::with_config(store, EngineConfig::default())
    }

    /// Creates a new profile service with explicit tunables.
    pub fn with_config(store: S, config: EngineConfig) -> Self {
        Self {
            recorder: EventRecorder::with_policy(store, config.snapshot),
            retry: config.retry,
        }
    }

    /// Returns a reference to the underlying recorder.
    pub fn recorder(&self) -> &EventRecorder<S> {
        &self.recorder
    }

    /// Records a brand-new profile.
    #[tracing::instrument(skip(self, profile), fields(profile_id = %profile.id()))]
    pub async fn create_profile(
        &self,
        profile: &Profile,
        actor: ActorId,
    ) -> Result<Version, DomainError> {
        self.recorder.record_created(profile, actor).await
    }

    /// Changes the display name.
    pub async fn update_display_name(
        &self,
        profile: &mut Profile,
        actor: ActorId,
        display_name: impl Into<String>,
    ) -> Result<FieldChange, DomainError> {
        let value = display_name.into();
        self.update_field(profile, actor, ProfileField::DisplayName, Some(value))
            .await
    }

    /// Changes (or clears) the birthday.
    pub async fn update_birthday(
        &self,
        profile: &mut Profile,
        actor: ActorId,
        birthday: Option<NaiveDate>,
    ) -> Result<FieldChange, DomainError> {
        self.update_field(
            profile,
            actor,
            ProfileField::Birthday,
            birthday.map(canonical_birthday),
        )
        .await
    }

    /// Records a change to any field and applies it to `profile`.
    ///
    /// Backfills a synthetic `Created` event first if the profile predates
    /// the log.
    #[tracing::instrument(skip(self, profile, new_value), fields(profile_id = %profile.id()))]
    pub async fn update_field(
        &self,
        profile: &mut Profile,
        actor: ActorId,
        field: ProfileField,
        new_value: Option<String>,
    ) -> Result<FieldChange, DomainError> {
        // The caller's profile only changes once the event is stored.
        let mut updated = profile.clone();
        updated.set_field(field, new_value.as_deref())?;

        if let Err(e) = self.recorder.ensure_events_exist(profile, actor).await {
            // A conflict here means another writer backfilled first.
            if !e.is_retryable() || !self.recorder.store().has_events(profile.id()).await? {
                return Err(e);
            }
            tracing::debug!(error = %e, "concurrent backfill, continuing");
        }

        let mut old_value = profile.field_value(field);
        if old_value == new_value {
            return Ok(FieldChange::Unchanged);
        }

        let mut attempt = 1;
        let version = loop {
            let result = self
                .recorder
                .record_field_update(profile.id(), actor, field, old_value.clone(), new_value.clone())
                .await;

            match result {
                Ok(version) => break version,
                Err(e) if e.is_retryable() && attempt < self.retry.max_attempts() => {
                    tracing::debug!(attempt, error = %e, "version conflict, retrying");
                    attempt += 1;
                    // Someone else wrote first; diff against what they left.
                    old_value = self
                        .recorder
                        .replay()
                        .replay_events(profile.id())
                        .await?
                        .and_then(|state| state.field_value(field));
                    if old_value == new_value {
                        *profile = updated;
                        return Ok(FieldChange::Unchanged);
                    }
                }
                Err(e) => return Err(e),
            }
        };

        *profile = updated;
        Ok(FieldChange::Recorded(version))
    }

    /// Returns the current state of a profile, or None if it has no log.
    pub async fn get_profile(
        &self,
        profile_id: ProfileId,
    ) -> Result<Option<ProfileState>, DomainError> {
        self.recorder.replay().replay_events(profile_id).await
    }

    /// Returns the state of a profile as it was at `as_of`.
    pub async fn get_profile_at(
        &self,
        profile_id: ProfileId,
        as_of: DateTime<Utc>,
    ) -> Result<Option<ProfileState>, DomainError> {
        self.recorder
            .replay()
            .replay_events_at_time(profile_id, as_of)
            .await
    }

    /// Returns the domain events of a profile, oldest first, without
    /// snapshots.
    pub async fn history(&self, profile_id: ProfileId) -> Result<Vec<EventEnvelope>, DomainError> {
        let events = self.recorder.store().events(profile_id).await?;
        Ok(events.into_iter().filter(|e| !e.is_snapshot()).collect())
    }
}
