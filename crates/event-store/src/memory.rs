use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    EventEnvelope, ProfileId, Result, Version,
    store::{EventStore, ensure_next_version},
};

/// One profile's log. Index `i` holds version `i + 1`.
type Stream = Arc<RwLock<Vec<EventEnvelope>>>;

/// In-memory event store implementation.
///
/// Each profile owns its own stream lock, so appends to different profiles
/// never wait on each other. The outer index is only write-locked for the
/// moment it takes to register a profile's first stream.
#[derive(Clone, Default)]
pub struct InMemoryEventStore {
    streams: Arc<RwLock<HashMap<ProfileId, Stream>>>,
}

impl InMemoryEventStore {
    /// Creates a new empty in-memory event store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of events stored across all profiles.
    pub async fn event_count(&self) -> usize {
        let streams: Vec<Stream> = self.streams.read().await.values().cloned().collect();
        let mut count = 0;
        for stream in streams {
            count += stream.read().await.len();
        }
        count
    }

    /// Clears all streams.
    pub async fn clear(&self) {
        self.streams.write().await.clear();
    }

    async fn stream(&self, profile_id: ProfileId) -> Option<Stream> {
        self.streams.read().await.get(&profile_id).cloned()
    }

    async fn stream_or_create(&self, profile_id: ProfileId) -> Stream {
        if let Some(stream) = self.stream(profile_id).await {
            return stream;
        }
        self.streams
            .write()
            .await
            .entry(profile_id)
            .or_default()
            .clone()
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn append_event(&self, event: EventEnvelope) -> Result<Version> {
        let stream = self.stream_or_create(event.profile_id).await;

        // Held across check and push: this is the per-profile write guard.
        let mut events = stream.write().await;
        let current = Version::new(events.len() as i64);
        ensure_next_version(event.profile_id, current, event.version)?;

        let version = event.version;
        tracing::trace!(
            profile_id = %event.profile_id,
            %version,
            event_type = event.event_type(),
            "appended event"
        );
        events.push(event);
        Ok(version)
    }

    async fn current_version(&self, profile_id: ProfileId) -> Result<Version> {
        Ok(match self.stream(profile_id).await {
            Some(stream) => Version::new(stream.read().await.len() as i64),
            None => Version::initial(),
        })
    }

    async fn events_from_version(
        &self,
        profile_id: ProfileId,
        from_version: Version,
    ) -> Result<Vec<EventEnvelope>> {
        let Some(stream) = self.stream(profile_id).await else {
            return Ok(Vec::new());
        };
        let events = stream.read().await;
        let skip = from_version.as_i64().clamp(0, events.len() as i64) as usize;
        Ok(events[skip..].to_vec())
    }

    async fn latest_snapshot(&self, profile_id: ProfileId) -> Result<Option<EventEnvelope>> {
        let Some(stream) = self.stream(profile_id).await else {
            return Ok(None);
        };
        let events = stream.read().await;
        Ok(events.iter().rev().find(|e| e.is_snapshot()).cloned())
    }
}
