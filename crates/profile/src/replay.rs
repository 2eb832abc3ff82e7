//! Reconstruction of profile state from the event log.

use chrono::{DateTime, Utc};
use common::{ActorId, ProfileId};
use event_store::{EventEnvelope, EventStore, EventStoreExt, Version};

use crate::config::SnapshotPolicy;
use crate::error::DomainError;
use crate::state::ProfileState;

/// Read side of the profile log.
///
/// Rebuilds current state from the latest snapshot plus the events after it,
/// rebuilds historical state from the full log, and decides when a new
/// snapshot is due. Holds no state of its own beyond the store handle.
pub struct ReplayService<S: EventStore> {
    store: S,
    policy: SnapshotPolicy,
}

impl<S: EventStore> ReplayService<S> {
    /// Creates a replay service with the default snapshot policy.
    pub fn new(store: S) -> Self {
        Self::with_policy(store, SnapshotPolicy::default())
    }

    /// Creates a replay service with a custom snapshot policy.
    pub fn with_policy(store: S, policy: SnapshotPolicy) -> Self {
        Self { store, policy }
    }

    /// Returns a reference to the underlying event store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Reconstructs the current state of a profile.
    ///
    /// Cost is bounded by the number of events since the latest snapshot.
    /// Returns None if the profile has neither a snapshot nor any events.
    #[tracing::instrument(skip(self))]
    pub async fn replay_events(
        &self,
        profile_id: ProfileId,
    ) -> Result<Option<ProfileState>, DomainError> {
        let (snapshot, tail) = self.store.load_from_latest_snapshot(profile_id).await?;

        let baseline = snapshot
            .as_ref()
            .map(ProfileState::from_snapshot)
            .transpose()?;

        let state = fold(profile_id, baseline, &tail)?;
        tracing::debug!(
            from_snapshot = snapshot.is_some(),
            events_applied = tail.len(),
            version = ?state.as_ref().map(ProfileState::version),
            "replayed profile"
        );
        Ok(state)
    }

    /// Reconstructs the state of a profile as it was at `as_of`.
    ///
    /// Scans the full log; snapshots are not time-indexed. Returns None if no
    /// event had been recorded by then.
    #[tracing::instrument(skip(self))]
    pub async fn replay_events_at_time(
        &self,
        profile_id: ProfileId,
        as_of: DateTime<Utc>,
    ) -> Result<Option<ProfileState>, DomainError> {
        let events = self.store.events(profile_id).await?;
        let visible: Vec<&EventEnvelope> =
            events.iter().filter(|e| e.occurred_at <= as_of).collect();

        fold(profile_id, None, visible)
    }

    /// Reconstructs current state from version 1, ignoring every snapshot.
    ///
    /// Must always agree with [`replay_events`](Self::replay_events); used to
    /// audit snapshots.
    #[tracing::instrument(skip(self))]
    pub async fn replay_without_snapshots(
        &self,
        profile_id: ProfileId,
    ) -> Result<Option<ProfileState>, DomainError> {
        let events = self.store.events(profile_id).await?;
        let domain_events = events.iter().filter(|e| !e.is_snapshot());

        fold(profile_id, None, domain_events)
    }

    /// Appends a snapshot once the log has grown far enough past the last one.
    ///
    /// Returns whether a snapshot was written. Never rewrites or removes an
    /// existing snapshot.
    #[tracing::instrument(skip(self))]
    pub async fn create_snapshot_if_needed(
        &self,
        profile_id: ProfileId,
        actor: ActorId,
    ) -> Result<bool, DomainError> {
        let current = self.store.current_version(profile_id).await?;
        let latest = self.store.latest_snapshot(profile_id).await?;

        if latest.as_ref().is_some_and(|s| s.version == current) {
            // Nothing has happened since the last snapshot.
            return Ok(false);
        }

        let snapshot_version = match &latest {
            Some(snapshot) => ProfileState::from_snapshot(snapshot)?.version(),
            None => Version::initial(),
        };
        if !self.policy.is_due(current, snapshot_version) {
            return Ok(false);
        }

        let Some(state) = self.replay_events(profile_id).await? else {
            return Ok(false);
        };

        let version = state.version().next();
        let envelope = EventEnvelope::new(profile_id, version, actor, state.to_snapshot_event()?);
        self.store.append_event(envelope).await?;

        metrics::counter!("profile_snapshots_created_total").increment(1);
        tracing::info!(
            %profile_id,
            %version,
            summarized_version = %state.version(),
            "created snapshot"
        );
        Ok(true)
    }
}

/// Folds `events` over `baseline`, starting empty when there is none.
fn fold<'a>(
    profile_id: ProfileId,
    baseline: Option<ProfileState>,
    events: impl IntoIterator<Item = &'a EventEnvelope>,
) -> Result<Option<ProfileState>, DomainError> {
    let mut state = baseline;
    let mut applied: u64 = 0;
    for envelope in events {
        state
            .get_or_insert_with(|| ProfileState::empty(profile_id))
            .apply(envelope)?;
        applied += 1;
    }
    metrics::counter!("profile_replay_events_applied_total").increment(applied);
    Ok(state)
}
