use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{ActorId, ProfileId};

/// Unique identifier for an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(Uuid);

impl EventId {
    /// Creates a new random event ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an event ID from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Position of an event in a profile's log.
///
/// Versions start at 1 for the first event and increase by exactly 1 for
/// each subsequent event, snapshots included. `Version::initial()` (0)
/// denotes an empty log.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Version(i64);

impl Version {
    /// Creates a new version from a raw value.
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// The version of an empty log.
    pub fn initial() -> Self {
        Self(0)
    }

    /// The version of the first event.
    pub fn first() -> Self {
        Self(1)
    }

    /// Returns the next version.
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    /// Number of versions between `earlier` and `self`.
    pub fn distance_from(&self, earlier: Version) -> i64 {
        self.0 - earlier.0
    }

    /// Returns the raw version value.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for Version {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<Version> for i64 {
    fn from(version: Version) -> Self {
        version.0
    }
}

/// Mutable attributes of a profile that can be the subject of a
/// `FieldUpdated` event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProfileField {
    DisplayName,
    /// Stored in canonical `YYYY-MM-DD` form.
    Birthday,
}

impl ProfileField {
    /// Returns the field name as stored in the log.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProfileField::DisplayName => "DisplayName",
            ProfileField::Birthday => "Birthday",
        }
    }
}

impl std::fmt::Display for ProfileField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ProfileField {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "DisplayName" | "display_name" | "display-name" => Ok(ProfileField::DisplayName),
            "Birthday" | "birthday" => Ok(ProfileField::Birthday),
            other => Err(format!("unknown profile field: {other}")),
        }
    }
}

/// Facts recorded in a profile's log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ProfileEvent {
    /// The profile came into existence (or was backfilled for legacy data).
    Created {
        display_name: String,
        #[serde(default)]
        birthday: Option<String>,
    },

    /// A single attribute changed value.
    FieldUpdated {
        field_name: ProfileField,
        old_value: Option<String>,
        new_value: Option<String>,
    },

    /// Materialized profile state as of the preceding version.
    Snapshot { serialized_state: serde_json::Value },
}

impl ProfileEvent {
    /// Returns the event type name used as the storage discriminator.
    pub fn event_type(&self) -> &'static str {
        match self {
            ProfileEvent::Created { .. } => "ProfileCreated",
            ProfileEvent::FieldUpdated { .. } => "ProfileFieldUpdated",
            ProfileEvent::Snapshot { .. } => "ProfileSnapshot",
        }
    }

    /// Returns true for snapshot events.
    pub fn is_snapshot(&self) -> bool {
        matches!(self, ProfileEvent::Snapshot { .. })
    }
}

/// A profile event together with its log metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Unique identifier for this event.
    pub event_id: EventId,

    /// The profile this event belongs to.
    pub profile_id: ProfileId,

    /// Position of this event in the profile's log.
    pub version: Version,

    /// When the event was recorded.
    pub occurred_at: DateTime<Utc>,

    /// Who made the change.
    pub changed_by: ActorId,

    /// The event itself.
    pub event: ProfileEvent,
}

impl EventEnvelope {
    /// Creates an envelope stamped with a fresh ID and the current time.
    pub fn new(
        profile_id: ProfileId,
        version: Version,
        changed_by: ActorId,
        event: ProfileEvent,
    ) -> Self {
        Self {
            event_id: EventId::new(),
            profile_id,
            version,
            occurred_at: Utc::now(),
            changed_by,
            event,
        }
    }

    /// Overrides the recording time.
    pub fn with_occurred_at(mut self, occurred_at: DateTime<Utc>) -> Self {
        self.occurred_at = occurred_at;
        self
    }

    /// Returns the event type name.
    pub fn event_type(&self) -> &'static str {
        self.event.event_type()
    }

    /// Returns true if this envelope carries a snapshot.
    pub fn is_snapshot(&self) -> bool {
        self.event.is_snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_ordering() {
        let v1 = Version::new(1);
        let v2 = Version::new(2);
        assert!(v1 < v2);
        assert_eq!(v1.next(), v2);
        assert!(Version::initial() < Version::first());
        assert_eq!(Version::new(51).distance_from(Version::new(1)), 50);
    }

    #[test]
    fn version_initial_and_first() {
        assert_eq!(Version::initial().as_i64(), 0);
        assert_eq!(Version::first().as_i64(), 1);
        assert_eq!(Version::initial().next(), Version::first());
    }

    #[test]
    fn event_type_names() {
        let created = ProfileEvent::Created {
            display_name: "John Doe".to_string(),
            birthday: None,
        };
        let updated = ProfileEvent::FieldUpdated {
            field_name: ProfileField::DisplayName,
            old_value: Some("John Doe".to_string()),
            new_value: Some("Jane Doe".to_string()),
        };
        let snapshot = ProfileEvent::Snapshot {
            serialized_state: serde_json::json!({}),
        };

        assert_eq!(created.event_type(), "ProfileCreated");
        assert_eq!(updated.event_type(), "ProfileFieldUpdated");
        assert_eq!(snapshot.event_type(), "ProfileSnapshot");
        assert!(snapshot.is_snapshot());
        assert!(!created.is_snapshot());
    }

    #[test]
    fn created_without_birthday_still_deserializes() {
        let json = serde_json::json!({
            "type": "Created",
            "data": { "display_name": "John Doe" }
        });
        let event: ProfileEvent = serde_json::from_value(json).unwrap();
        assert_eq!(
            event,
            ProfileEvent::Created {
                display_name: "John Doe".to_string(),
                birthday: None,
            }
        );
    }

    #[test]
    fn field_update_payload_shape() {
        let event = ProfileEvent::FieldUpdated {
            field_name: ProfileField::Birthday,
            old_value: None,
            new_value: Some("1990-04-01".to_string()),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "FieldUpdated");
        assert_eq!(json["data"]["field_name"], "Birthday");
        assert!(json["data"]["old_value"].is_null());
    }

    #[test]
    fn profile_field_parses_common_spellings() {
        assert_eq!(
            "display_name".parse::<ProfileField>(),
            Ok(ProfileField::DisplayName)
        );
        assert_eq!("Birthday".parse::<ProfileField>(), Ok(ProfileField::Birthday));
        assert!("email".parse::<ProfileField>().is_err());
    }

    #[test]
    fn envelope_with_occurred_at_overrides_time() {
        let profile_id = ProfileId::new();
        let at = DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);

        let envelope = EventEnvelope::new(
            profile_id,
            Version::first(),
            ActorId::system(),
            ProfileEvent::Created {
                display_name: "John Doe".to_string(),
                birthday: None,
            },
        )
        .with_occurred_at(at);

        assert_eq!(envelope.profile_id, profile_id);
        assert_eq!(envelope.occurred_at, at);
        assert_eq!(envelope.event_type(), "ProfileCreated");
    }
}
