//! Profile state reconstructed from the event log.

use chrono::NaiveDate;
use common::ProfileId;
use event_store::{EventEnvelope, ProfileEvent, ProfileField, Version};
use serde::{Deserialize, Serialize};

use crate::aggregate::{canonical_birthday, parse_birthday};
use crate::error::DomainError;

/// The result of folding a profile's events.
///
/// This is also the snapshot payload. New fields must carry
/// `#[serde(default)]` so snapshots written before they existed still load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileState {
    profile_id: ProfileId,

    #[serde(default)]
    display_name: String,

    #[serde(default)]
    birthday: Option<NaiveDate>,

    /// Version of the last event folded into this state.
    version: Version,
}

impl ProfileState {
    /// An empty state for a profile with no events applied yet.
    pub fn empty(profile_id: ProfileId) -> Self {
        Self {
            profile_id,
            display_name: String::new(),
            birthday: None,
            version: Version::initial(),
        }
    }

    /// Restores state from a snapshot event.
    ///
    /// Fails with `CorruptSnapshot` rather than returning a partial state.
    pub fn from_snapshot(envelope: &EventEnvelope) -> Result<Self, DomainError> {
        let corrupt = |source| DomainError::CorruptSnapshot {
            profile_id: envelope.profile_id,
            version: envelope.version,
            source,
        };

        let ProfileEvent::Snapshot { serialized_state } = &envelope.event else {
            return Err(corrupt(serde::de::Error::custom(format!(
                "expected a snapshot, found {}",
                envelope.event_type()
            ))));
        };

        let state: Self = serde_json::from_value(serialized_state.clone()).map_err(corrupt)?;

        if state.profile_id != envelope.profile_id {
            return Err(corrupt(serde::de::Error::custom(format!(
                "snapshot belongs to profile {}",
                state.profile_id
            ))));
        }
        if state.version >= envelope.version {
            return Err(corrupt(serde::de::Error::custom(format!(
                "embedded version {} is not before snapshot version {}",
                state.version, envelope.version
            ))));
        }

        Ok(state)
    }

    /// Serializes this state into a snapshot event payload.
    pub fn to_snapshot_event(&self) -> Result<ProfileEvent, DomainError> {
        Ok(ProfileEvent::Snapshot {
            serialized_state: serde_json::to_value(self)?,
        })
    }

    /// Folds one event into the state.
    pub fn apply(&mut self, envelope: &EventEnvelope) -> Result<(), DomainError> {
        match &envelope.event {
            ProfileEvent::Created {
                display_name,
                birthday,
            } => {
                self.display_name = display_name.clone();
                self.birthday = self.parse_date(envelope, birthday.as_deref())?;
            }
            ProfileEvent::FieldUpdated {
                field_name,
                new_value,
                ..
            } => match field_name {
                ProfileField::DisplayName => {
                    self.display_name = new_value.clone().unwrap_or_default();
                }
                ProfileField::Birthday => {
                    self.birthday = self.parse_date(envelope, new_value.as_deref())?;
                }
            },
            ProfileEvent::Snapshot { .. } => {
                // Full overwrite; the snapshot carries its own version.
                *self = Self::from_snapshot(envelope)?;
                return Ok(());
            }
        }
        self.version = envelope.version;
        Ok(())
    }

    fn parse_date(
        &self,
        envelope: &EventEnvelope,
        value: Option<&str>,
    ) -> Result<Option<NaiveDate>, DomainError> {
        parse_birthday(value).map_err(|e| DomainError::CorruptEvent {
            profile_id: envelope.profile_id,
            version: envelope.version,
            reason: format!("unparseable birthday {value:?}: {e}"),
        })
    }

    pub fn profile_id(&self) -> ProfileId {
        self.profile_id
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn birthday(&self) -> Option<NaiveDate> {
        self.birthday
    }

    pub fn version(&self) -> Version {
        self.version
    }

    /// Returns the canonical string form of a field's value.
    pub fn field_value(&self, field: ProfileField) -> Option<String> {
        match field {
            ProfileField::DisplayName => Some(self.display_name.clone()),
            ProfileField::Birthday => self.birthday.map(canonical_birthday),
        }
    }
}
