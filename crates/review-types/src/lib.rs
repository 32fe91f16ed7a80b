//! Validated primitives shared by the coding review crates.
//!
//! - [`PatientId`]: a trimmed, non-empty patient identifier
//! - [`CodeSet`]: a deduplicated set of billing codes from one coding source
//! - [`MatchCategory`]: chart-level agreement between baseline and AI coding

mod category;
mod codes;

pub use category::MatchCategory;
pub use codes::CodeSet;

/// Errors that can occur when creating validated review types.
#[derive(Debug, thiserror::Error)]
pub enum TextError {
    /// The input text was empty or contained only whitespace
    #[error("Text cannot be empty")]
    Empty,

    /// The input did not name a known chart match category
    #[error("Unknown match category: '{0}'")]
    UnknownMatchCategory(String),
}

/// A patient identifier that guarantees non-empty content.
///
/// Identifiers arrive from two places: the input dataset, and LLM responses that echo the
/// identifier back. The latter frequently render numeric identifiers as JSON numbers, so
/// deserialisation accepts both strings and integers and stores the textual form.
///
/// The input is trimmed of leading and trailing whitespace during construction, which keeps
/// `"123"`, `" 123 "` and `123` equal for lookup purposes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PatientId(String);

impl PatientId {
    /// Creates a new `PatientId` from the given input.
    ///
    /// # Errors
    ///
    /// Returns `Err(TextError::Empty)` if the trimmed input is empty.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TextError::Empty);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PatientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for PatientId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::str::FromStr for PatientId {
    type Err = TextError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl serde::Serialize for PatientId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for PatientId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct PatientIdVisitor;

        impl serde::de::Visitor<'_> for PatientIdVisitor {
            type Value = PatientId;

            fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str("a non-empty patient identifier string or integer")
            }

            fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<PatientId, E> {
                PatientId::new(v).map_err(E::custom)
            }

            fn visit_u64<E: serde::de::Error>(self, v: u64) -> Result<PatientId, E> {
                PatientId::new(v.to_string()).map_err(E::custom)
            }

            fn visit_i64<E: serde::de::Error>(self, v: i64) -> Result<PatientId, E> {
                PatientId::new(v.to_string()).map_err(E::custom)
            }
        }

        deserializer.deserialize_any(PatientIdVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patient_id_trims_input() {
        let id = PatientId::new("  1042 ").unwrap();
        assert_eq!(id.as_str(), "1042");
    }

    #[test]
    fn patient_id_rejects_blank_input() {
        assert!(matches!(PatientId::new("   "), Err(TextError::Empty)));
    }

    #[test]
    fn patient_id_deserialises_from_string_and_number() {
        let from_str: PatientId = serde_json::from_str("\"77\"").unwrap();
        let from_num: PatientId = serde_json::from_str("77").unwrap();
        assert_eq!(from_str, from_num);
    }

    #[test]
    fn patient_id_rejects_empty_json_string() {
        let err = serde_json::from_str::<PatientId>("\"\"").expect_err("should reject");
        assert!(err.to_string().contains("cannot be empty"));
    }
}
