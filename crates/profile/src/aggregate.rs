//! The profile aggregate as the surrounding application holds it.

use chrono::NaiveDate;
use common::ProfileId;
use event_store::ProfileField;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Canonical storage format for dates in the log.
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Formats a birthday the way it is stored in events.
pub fn canonical_birthday(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Parses an optional canonical birthday string.
pub fn parse_birthday(value: Option<&str>) -> Result<Option<NaiveDate>, chrono::ParseError> {
    value
        .map(|s| NaiveDate::parse_from_str(s, DATE_FORMAT))
        .transpose()
}

/// Checks that `value` is acceptable for `field` before it is recorded.
pub fn validate_field_value(field: ProfileField, value: Option<&str>) -> Result<(), DomainError> {
    let valid = match field {
        ProfileField::DisplayName => value.is_some_and(|v| !v.trim().is_empty()),
        ProfileField::Birthday => parse_birthday(value).is_ok(),
    };
    if valid {
        Ok(())
    } else {
        Err(DomainError::InvalidFieldValue {
            field,
            value: value.map(str::to_string),
        })
    }
}

/// A family member's profile.
///
/// The application owns this object and mutates it in memory; the event log
/// is what makes those changes durable and replayable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    id: ProfileId,
    display_name: String,
    birthday: Option<NaiveDate>,
}

impl Profile {
    /// Creates a new profile with a fresh ID.
    pub fn new(display_name: impl Into<String>) -> Self {
        Self::from_parts(ProfileId::new(), display_name, None)
    }

    /// Rebuilds a profile from already-known values (e.g. an ORM row).
    pub fn from_parts(
        id: ProfileId,
        display_name: impl Into<String>,
        birthday: Option<NaiveDate>,
    ) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            birthday,
        }
    }

    /// Sets the birthday.
    pub fn with_birthday(mut self, birthday: NaiveDate) -> Self {
        self.birthday = Some(birthday);
        self
    }

    pub fn id(&self) -> ProfileId {
        self.id
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn birthday(&self) -> Option<NaiveDate> {
        self.birthday
    }

    /// Returns the canonical string form of a field's current value.
    pub fn field_value(&self, field: ProfileField) -> Option<String> {
        match field {
            ProfileField::DisplayName => Some(self.display_name.clone()),
            ProfileField::Birthday => self.birthday.map(canonical_birthday),
        }
    }

    /// Assigns a field from its canonical string form.
    pub fn set_field(&mut self, field: ProfileField, value: Option<&str>) -> Result<(), DomainError> {
        validate_field_value(field, value)?;
        match field {
            ProfileField::DisplayName => {
                self.display_name = value.unwrap_or_default().to_string();
            }
            ProfileField::Birthday => {
                self.birthday = parse_birthday(value).map_err(|_| DomainError::InvalidFieldValue {
                    field,
                    value: value.map(str::to_string),
                })?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_birthday_canonical_form() {
        assert_eq!(canonical_birthday(date(1990, 4, 1)), "1990-04-01");
        assert_eq!(parse_birthday(Some("1990-04-01")).unwrap(), Some(date(1990, 4, 1)));
        assert_eq!(parse_birthday(None).unwrap(), None);
        assert!(parse_birthday(Some("01/04/1990")).is_err());
    }

    #[test]
    fn test_validate_display_name() {
        assert!(validate_field_value(ProfileField::DisplayName, Some("Jane")).is_ok());
        assert!(validate_field_value(ProfileField::DisplayName, Some("   ")).is_err());
        assert!(validate_field_value(ProfileField::DisplayName, None).is_err());
    }

    #[test]
    fn test_validate_birthday() {
        assert!(validate_field_value(ProfileField::Birthday, None).is_ok());
        assert!(validate_field_value(ProfileField::Birthday, Some("2001-02-03")).is_ok());
        assert!(matches!(
            validate_field_value(ProfileField::Birthday, Some("2001-02-30")),
            Err(DomainError::InvalidFieldValue { field: ProfileField::Birthday, .. })
        ));
    }

    #[test]
    fn test_field_values_round_trip_through_strings() {
        let mut profile = Profile::new("John Doe").with_birthday(date(1990, 4, 1));
        assert_eq!(
            profile.field_value(ProfileField::Birthday).as_deref(),
            Some("1990-04-01")
        );

        profile.set_field(ProfileField::DisplayName, Some("Jane Doe")).unwrap();
        profile.set_field(ProfileField::Birthday, None).unwrap();

        assert_eq!(profile.display_name(), "Jane Doe");
        assert_eq!(profile.birthday(), None);
    }

    #[test]
    fn test_set_field_rejects_invalid_value() {
        let mut profile = Profile::new("John Doe");
        assert!(profile.set_field(ProfileField::Birthday, Some("yesterday")).is_err());
        assert_eq!(profile.birthday(), None);
    }
}
