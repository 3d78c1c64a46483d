//! Identifier newtypes for the salon domain.
//!
//! Identity is held as an opaque string: the collaborator emits numeric ids
//! on some endpoints and string ids on others, so each newtype deserializes
//! from either JSON representation and always serializes back as a string.

use serde::{Deserialize, Deserializer, Serialize};

/// Accepts a JSON string or number and canonicalizes it to a string.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Number(u64),
}

impl From<RawId> for String {
    fn from(raw: RawId) -> Self {
        match raw {
            RawId::Text(text) => text,
            RawId::Number(number) => number.to_string(),
        }
    }
}

fn lenient_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    RawId::deserialize(deserializer).map(String::from)
}

/// Unique identifier of an appointment record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AppointmentId(#[serde(deserialize_with = "lenient_id")] String);

/// Identifier of a bookable resource (a staff member or chair).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceId(#[serde(deserialize_with = "lenient_id")] String);

/// Identifier of the salon an engine instance serves.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SalonId(#[serde(deserialize_with = "lenient_id")] String);

/// Identifier of a branch within a salon.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BranchId(#[serde(deserialize_with = "lenient_id")] String);

macro_rules! string_id_impls {
    ($($name:ident),+ $(,)?) => {
        $(
            impl $name {
                /// Creates an identifier from any string-like value.
                pub fn new(value: impl Into<String>) -> Self {
                    Self(value.into())
                }

                /// Returns the identifier as a string slice.
                #[must_use]
                pub fn as_str(&self) -> &str {
                    &self.0
                }
            }

            impl std::fmt::Display for $name {
                fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                    write!(f, "{}", self.0)
                }
            }

            impl From<&str> for $name {
                fn from(value: &str) -> Self {
                    Self(value.to_string())
                }
            }

            impl From<String> for $name {
                fn from(value: String) -> Self {
                    Self(value)
                }
            }
        )+
    };
}

string_id_impls!(AppointmentId, ResourceId, SalonId, BranchId);
