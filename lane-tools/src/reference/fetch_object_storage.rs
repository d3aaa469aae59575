//! Reference tool that resolves an object storage asset to a URI.
//!
//! No storage is contacted; the URI is formatted from the request payload.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Identifier the tool is registered under.
pub const TOOL_ID: &str = "fetch_object_storage";

/// Content type reported for every fetched object.
pub const CONTENT_TYPE: &str = "application/octet-stream";

const DEFAULT_BUCKET: &str = "unknown";

/// Location of the requested object.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectLocation {
    /// `s3://{bucket}/{key}` URI of the object.
    pub uri: String,
    /// MIME type of the object payload.
    pub content_type: String,
}

/// Formats the object URI from the optional `bucket` and `key` fields.
///
/// Non-string values are rendered as JSON text; a request that is not a JSON
/// object is treated as empty.
#[must_use]
pub fn run(request: &Value) -> ObjectLocation {
    let bucket = field_text(request, "bucket").unwrap_or_else(|| DEFAULT_BUCKET.to_owned());
    let key = field_text(request, "key").unwrap_or_default();
    ObjectLocation {
        uri: format!("s3://{bucket}/{key}"),
        content_type: CONTENT_TYPE.to_owned(),
    }
}

/// Schema accepted by the governed lane: optional string `bucket` and `key`.
#[must_use]
pub fn request_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "bucket": {"type": "string"},
            "key": {"type": "string"},
        },
    })
}

/// Schema every [`ObjectLocation`] satisfies.
#[must_use]
pub fn response_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "uri": {"type": "string", "pattern": "^s3://"},
            "content_type": {"type": "string"},
        },
        "required": ["uri", "content_type"],
    })
}

fn field_text(request: &Value, field: &str) -> Option<String> {
    match request.get(field)? {
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}
