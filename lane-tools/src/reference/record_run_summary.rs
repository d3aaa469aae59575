//! Reference tool that acknowledges a run summary.
//!
//! Nothing is persisted: the summary is echoed back with `recorded` set.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

/// Identifier the tool is registered under.
pub const TOOL_ID: &str = "record_run_summary";

/// Acknowledgement returned for a summary.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SummaryReceipt {
    /// Always `true`.
    pub recorded: bool,
    /// The summary exactly as supplied.
    pub summary: Value,
}

/// Echoes the optional `summary` field, defaulting to an empty object.
#[must_use]
pub fn run(request: &Value) -> SummaryReceipt {
    let summary = request
        .get("summary")
        .cloned()
        .unwrap_or_else(|| Value::Object(Map::new()));
    SummaryReceipt {
        recorded: true,
        summary,
    }
}

/// Schema accepted by the governed lane: an optional object `summary`.
#[must_use]
pub fn request_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "summary": {"type": "object"},
        },
    })
}

/// Schema every [`SummaryReceipt`] satisfies.
#[must_use]
pub fn response_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "recorded": {"const": true},
            "summary": {},
        },
        "required": ["recorded", "summary"],
    })
}
