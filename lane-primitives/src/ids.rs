//! Identifier types carried through the lane.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

const MAX_TOOL_ID_LEN: usize = 64;

/// Identifier under which a tool is registered and invoked.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ToolId(String);

impl ToolId {
    /// Creates a new tool identifier after validating its format.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidToolId`] if the supplied identifier is empty,
    /// too long, or contains unsupported characters.
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        validate_tool_id(&id)?;
        Ok(Self(id))
    }

    /// Returns the tool identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ToolId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ToolId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<ToolId> for String {
    fn from(value: ToolId) -> Self {
        value.0
    }
}

impl FromStr for ToolId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

fn validate_tool_id(id: &str) -> Result<()> {
    if id.is_empty() {
        return Err(Error::InvalidToolId {
            id: String::new(),
            reason: "identifier cannot be empty".into(),
        });
    }

    if id.len() > MAX_TOOL_ID_LEN {
        return Err(Error::InvalidToolId {
            id: id.into(),
            reason: format!("identifier length must be <= {MAX_TOOL_ID_LEN}"),
        });
    }

    if !id
        .chars()
        .all(|c| matches!(c, 'a'..='z' | '0'..='9' | '-' | '_' | '.'))
    {
        return Err(Error::InvalidToolId {
            id: id.into(),
            reason: "identifier must contain lowercase alphanumeric, dash, underscore, or dot"
                .into(),
        });
    }

    Ok(())
}

macro_rules! opaque_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wraps the caller-supplied identifier without validation.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Returns the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

opaque_id!(
    /// Caller-supplied identifier for a single tool invocation request.
    RequestId
);

opaque_id!(
    /// Caller-supplied identifier for the run a request belongs to.
    RunId
);

/// Unique identifier for an emitted run event.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(Uuid);

impl EventId {
    /// Generates a random event identifier.
    #[must_use]
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(self) -> Uuid {
        self.0
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::random()
    }
}

impl Display for EventId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "evt_{}", self.0.simple())
    }
}

impl FromStr for EventId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let raw = s.strip_prefix("evt_").unwrap_or(s);
        let uuid = Uuid::parse_str(raw).map_err(Error::from)?;
        Ok(Self(uuid))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_event_id() {
        let id = EventId::random();
        let rendered = id.to_string();
        assert!(rendered.starts_with("evt_"));
        let parsed = rendered.parse::<EventId>().expect("parse");
        assert_eq!(id, parsed);
    }

    #[test]
    fn tool_id_accepts_reference_names() {
        let id = ToolId::new("fetch_object_storage").expect("valid id");
        assert_eq!(id.as_str(), "fetch_object_storage");
    }

    #[test]
    fn tool_id_rejects_bad_input() {
        assert!(matches!(
            ToolId::new(""),
            Err(Error::InvalidToolId { .. })
        ));
        assert!(matches!(
            ToolId::new("Fetch Object"),
            Err(Error::InvalidToolId { .. })
        ));
        assert!(ToolId::new("x".repeat(MAX_TOOL_ID_LEN + 1)).is_err());
    }

    #[test]
    fn tool_id_deserialization_validates() {
        let ok: ToolId = serde_json::from_str("\"record_run_summary\"").expect("valid");
        assert_eq!(ok.to_string(), "record_run_summary");
        assert!(serde_json::from_str::<ToolId>("\"BAD ID\"").is_err());
    }

    #[test]
    fn opaque_ids_are_transparent() {
        let request = RequestId::from("r1");
        assert_eq!(serde_json::to_string(&request).unwrap(), "\"r1\"");
        let run: RunId = serde_json::from_str("\"g1\"").unwrap();
        assert_eq!(run.as_str(), "g1");
    }
}
