//! Record identifiers.
//!
//! Identifiers are opaque strings. Freshly generated identifiers are the number of
//! milliseconds since the Unix epoch, rendered in decimal (for example `1718000000123`),
//! which keeps them sortable by creation time and compatible with bundles exported by
//! earlier releases of the lab application.

use crate::IdError;
use chrono::Utc;
use std::{fmt, str::FromStr};

/// Identifier for patients, test groups, subgroups and parameters.
///
/// Once constructed the identifier is guaranteed to be non-empty, trimmed and free of
/// control characters.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecordId(String);

impl RecordId {
    /// Validates an externally supplied identifier.
    ///
    /// # Errors
    ///
    /// Returns [`IdError::Empty`] for blank input and [`IdError::ControlCharacters`] if the
    /// identifier contains control characters.
    pub fn parse(input: impl AsRef<str>) -> Result<Self, IdError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(IdError::Empty);
        }
        if trimmed.chars().any(char::is_control) {
            return Err(IdError::ControlCharacters(trimmed.to_owned()));
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Generates a new millisecond-timestamp identifier.
    ///
    /// If `last` is a timestamp identifier that is not older than the current clock, the new
    /// identifier is `last + 1`, so identifiers generated in a tight loop stay unique and
    /// strictly increasing.
    pub fn generate(last: Option<&RecordId>) -> Self {
        let now = Utc::now().timestamp_millis();
        let next = match last.and_then(|id| id.0.parse::<i64>().ok()) {
            Some(prev) if now <= prev => prev + 1,
            _ => now,
        };
        Self(next.to_string())
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for RecordId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RecordId::parse(s)
    }
}

impl AsRef<str> for RecordId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl serde::Serialize for RecordId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for RecordId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct IdVisitor;

        impl serde::de::Visitor<'_> for IdVisitor {
            type Value = RecordId;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a non-empty string or integer record id")
            }

            fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<RecordId, E> {
                RecordId::parse(v).map_err(E::custom)
            }

            fn visit_u64<E: serde::de::Error>(self, v: u64) -> Result<RecordId, E> {
                Ok(RecordId(v.to_string()))
            }

            fn visit_i64<E: serde::de::Error>(self, v: i64) -> Result<RecordId, E> {
                Ok(RecordId(v.to_string()))
            }
        }

        deserializer.deserialize_any(IdVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_trims_and_accepts_plain_ids() {
        let id = RecordId::parse(" 1718000000123 ").unwrap();
        assert_eq!(id.as_str(), "1718000000123");
    }

    #[test]
    fn parse_rejects_blank_and_control_characters() {
        assert_eq!(RecordId::parse("  "), Err(IdError::Empty));
        assert!(matches!(
            RecordId::parse("ab\ncd"),
            Err(IdError::ControlCharacters(_))
        ));
    }

    #[test]
    fn generate_is_strictly_increasing_without_sleeping() {
        let first = RecordId::generate(None);
        let second = RecordId::generate(Some(&first));
        let a: i64 = first.as_str().parse().unwrap();
        let b: i64 = second.as_str().parse().unwrap();
        assert!(b > a);
    }

    #[test]
    fn generate_jumps_ahead_of_future_ids() {
        let future = RecordId::parse("99999999999999").unwrap();
        let next = RecordId::generate(Some(&future));
        assert_eq!(next.as_str(), "100000000000000");
    }

    #[test]
    fn generate_ignores_non_numeric_previous_ids() {
        let last = RecordId::parse("hb").unwrap();
        let next = RecordId::generate(Some(&last));
        assert!(next.as_str().parse::<i64>().is_ok());
    }

    #[test]
    fn deserializes_from_string_or_number() {
        let from_str: RecordId = serde_json::from_str("\"p-1\"").unwrap();
        let from_num: RecordId = serde_json::from_str("1718000000123").unwrap();
        assert_eq!(from_str.as_str(), "p-1");
        assert_eq!(from_num.as_str(), "1718000000123");
    }

    #[test]
    fn works_as_json_map_key() {
        let map: std::collections::BTreeMap<RecordId, String> =
            serde_json::from_str(r#"{"hb":"10","wbc":"7000"}"#).unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map[&RecordId::parse("hb").unwrap()], "10");
    }
}
