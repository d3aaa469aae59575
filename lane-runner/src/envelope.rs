//! Request and response envelopes exchanged with lane callers.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use lane_primitives::{RequestId, RunId};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::clock::serde_timestamp;

fn empty_object() -> Value {
    Value::Object(Map::new())
}

/// Tool invocation request submitted to the lane.
///
/// Every field is optional on the wire; absent payloads default to `{}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunnerRequest {
    /// Caller-supplied request identifier.
    #[serde(default)]
    pub request_id: Option<RequestId>,
    /// Run the request belongs to.
    #[serde(default)]
    pub run_id: Option<RunId>,
    /// Tool to invoke.
    #[serde(default)]
    pub tool_id: Option<String>,
    /// Tool version the caller expects.
    #[serde(default)]
    pub tool_version: Option<String>,
    /// Tool argument payload.
    #[serde(default = "empty_object")]
    pub input: Value,
    /// Correlation metadata passed through untouched.
    #[serde(default = "empty_object")]
    pub trace: Value,
}

impl Default for RunnerRequest {
    fn default() -> Self {
        Self {
            request_id: None,
            run_id: None,
            tool_id: None,
            tool_version: None,
            input: empty_object(),
            trace: empty_object(),
        }
    }
}

impl RunnerRequest {
    /// Creates a request targeting `tool_id` with an empty input.
    #[must_use]
    pub fn new(tool_id: impl Into<String>) -> Self {
        Self {
            tool_id: Some(tool_id.into()),
            ..Self::default()
        }
    }

    /// Sets the request identifier.
    #[must_use]
    pub fn with_request_id(mut self, id: impl Into<RequestId>) -> Self {
        self.request_id = Some(id.into());
        self
    }

    /// Sets the run identifier.
    #[must_use]
    pub fn with_run_id(mut self, id: impl Into<RunId>) -> Self {
        self.run_id = Some(id.into());
        self
    }

    /// Pins the expected tool version.
    #[must_use]
    pub fn with_tool_version(mut self, version: impl Into<String>) -> Self {
        self.tool_version = Some(version.into());
        self
    }

    /// Sets the tool input payload.
    #[must_use]
    pub fn with_input(mut self, input: Value) -> Self {
        self.input = input;
        self
    }

    /// Sets the trace metadata.
    #[must_use]
    pub fn with_trace(mut self, trace: Value) -> Self {
        self.trace = trace;
        self
    }

    /// Best-effort extraction of a request from a document that failed to
    /// deserialise: string identifiers and the trace value are kept,
    /// everything else defaults.
    #[must_use]
    pub fn salvage(raw: &Value) -> Self {
        let text = |field: &str| raw.get(field).and_then(Value::as_str).map(str::to_owned);
        Self {
            request_id: text("request_id").map(RequestId::from),
            run_id: text("run_id").map(RunId::from),
            tool_id: text("tool_id"),
            tool_version: text("tool_version"),
            input: empty_object(),
            trace: raw.get("trace").cloned().unwrap_or_else(empty_object),
        }
    }
}

/// Terminal status of an invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunnerStatus {
    /// The tool produced output.
    Success,
    /// The invocation failed; see [`RunnerResponse::error`].
    Error,
}

impl RunnerStatus {
    /// Returns the wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for RunnerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure categories reported in [`RunnerError::kind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The request is missing data or is malformed.
    InvalidRequest,
    /// No tool is registered under the requested identifier.
    ToolNotFound,
    /// The tool was invoked and reported a failure.
    ToolExecutionFailed,
}

impl ErrorKind {
    /// Returns the wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidRequest => "invalid_request",
            Self::ToolNotFound => "tool_not_found",
            Self::ToolExecutionFailed => "tool_execution_failed",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error payload attached to failed responses.
///
/// Serialises as a flat string-to-string mapping: `kind`, `message`, and any
/// detail fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{kind}: {message}")]
pub struct RunnerError {
    kind: ErrorKind,
    message: String,
    #[serde(flatten)]
    details: BTreeMap<String, String>,
}

impl RunnerError {
    /// Creates an error of the given kind.
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            details: BTreeMap::new(),
        }
    }

    /// Shorthand for [`ErrorKind::InvalidRequest`].
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidRequest, message)
    }

    /// Shorthand for [`ErrorKind::ToolNotFound`].
    #[must_use]
    pub fn tool_not_found(tool_id: &str) -> Self {
        Self::new(
            ErrorKind::ToolNotFound,
            format!("tool `{tool_id}` is not registered"),
        )
        .with_detail("tool_id", tool_id)
    }

    /// Shorthand for [`ErrorKind::ToolExecutionFailed`].
    #[must_use]
    pub fn tool_execution_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ToolExecutionFailed, message)
    }

    /// Adds a detail field. `kind` and `message` are reserved and ignored.
    #[must_use]
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        if key != "kind" && key != "message" {
            self.details.insert(key, value.into());
        }
        self
    }

    /// Returns the failure category.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the human-readable message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the additional detail fields.
    #[must_use]
    pub fn details(&self) -> &BTreeMap<String, String> {
        &self.details
    }
}

/// Outcome of the tool-execution step, folded into a [`RunnerResponse`].
#[derive(Debug, Clone, PartialEq)]
pub struct RunnerResult {
    status: RunnerStatus,
    output: Value,
    error: Option<RunnerError>,
}

impl RunnerResult {
    /// Successful result carrying `output`.
    #[must_use]
    pub fn success(output: Value) -> Self {
        Self {
            status: RunnerStatus::Success,
            output,
            error: None,
        }
    }

    /// Failed result with an empty output.
    #[must_use]
    pub fn failure(error: RunnerError) -> Self {
        Self {
            status: RunnerStatus::Error,
            output: empty_object(),
            error: Some(error),
        }
    }

    /// Returns the status.
    #[must_use]
    pub fn status(&self) -> RunnerStatus {
        self.status
    }

    /// Returns the output payload.
    #[must_use]
    pub fn output(&self) -> &Value {
        &self.output
    }

    /// Returns the error, if any.
    #[must_use]
    pub fn error(&self) -> Option<&RunnerError> {
        self.error.as_ref()
    }
}

/// Response envelope returned for every request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunnerResponse {
    /// Copied from the request.
    pub request_id: Option<RequestId>,
    /// Copied from the request.
    pub run_id: Option<RunId>,
    /// Copied from the request.
    pub tool_id: Option<String>,
    /// Copied from the request.
    pub tool_version: Option<String>,
    /// Terminal status.
    pub status: RunnerStatus,
    /// Instant the tool-execution step began.
    #[serde(with = "serde_timestamp")]
    pub started_at: DateTime<Utc>,
    /// Instant the tool-execution step ended; never before `started_at`.
    #[serde(with = "serde_timestamp")]
    pub finished_at: DateTime<Utc>,
    /// Tool output, `{}` on failure.
    pub output: Value,
    /// Copied from the request.
    pub trace: Value,
    /// Present only when `status` is [`RunnerStatus::Error`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RunnerError>,
}

impl RunnerResponse {
    /// Combines a request, its result, and the recorded timings.
    ///
    /// `finished_at` is clamped so it never precedes `started_at`, even if
    /// the wall clock stepped backwards in between.
    #[must_use]
    pub fn assemble(
        request: &RunnerRequest,
        result: RunnerResult,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
    ) -> Self {
        let RunnerResult {
            status,
            output,
            error,
        } = result;
        Self {
            request_id: request.request_id.clone(),
            run_id: request.run_id.clone(),
            tool_id: request.tool_id.clone(),
            tool_version: request.tool_version.clone(),
            status,
            started_at,
            finished_at: finished_at.max(started_at),
            output,
            trace: request.trace.clone(),
            error,
        }
    }

    /// Returns `true` when the invocation succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == RunnerStatus::Success
    }
}
