//! Governed lane that dispatches requests to registered tools.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use lane_config::{DispatchMode, LaneConfig};
use lane_primitives::EventId;
use lane_tools::registry::{ToolError, ToolRegistry};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::builder::{UNKNOWN_TOOL_ID, execute_tool};
use crate::clock::{Clock, SystemClock};
use crate::envelope::{RunnerError, RunnerRequest, RunnerResponse, RunnerResult};
use crate::events::{RunEvent, RunEventKind, RunEventSink};

/// Version reported in event metadata when neither the request nor the
/// registry supplies one.
const UNKNOWN_TOOL_VERSION: &str = "unknown";

/// Runs requests against a [`ToolRegistry`], always returning a response.
///
/// Failures never escape: invalid requests, unknown tools, and tool errors
/// are reported through [`RunnerResponse::error`].
#[derive(Clone)]
pub struct GovernedRunner {
    tools: Arc<ToolRegistry>,
    clock: Arc<dyn Clock>,
    sink: Option<Arc<dyn RunEventSink>>,
    config: LaneConfig,
}

impl fmt::Debug for GovernedRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GovernedRunner")
            .field("tools", &self.tools)
            .field("dispatch", &self.config.dispatch)
            .field("sink_configured", &self.sink.is_some())
            .finish_non_exhaustive()
    }
}

/// Outcome of the dispatch step plus the version of the tool that handled it.
struct Dispatched {
    result: RunnerResult,
    resolved_version: Option<String>,
}

impl Dispatched {
    fn failed(error: RunnerError) -> Self {
        Self {
            result: RunnerResult::failure(error),
            resolved_version: None,
        }
    }
}

impl GovernedRunner {
    /// Creates a runner over `tools` with the system clock and default config.
    #[must_use]
    pub fn new(tools: Arc<ToolRegistry>) -> Self {
        Self {
            tools,
            clock: Arc::new(SystemClock),
            sink: None,
            config: LaneConfig::default(),
        }
    }

    /// Replaces the clock used for response and event timestamps.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Installs a sink that receives run events.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn RunEventSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Applies the supplied configuration.
    #[must_use]
    pub fn with_config(mut self, config: LaneConfig) -> Self {
        self.config = config;
        self
    }

    /// Returns the active configuration.
    #[must_use]
    pub fn config(&self) -> &LaneConfig {
        &self.config
    }

    /// Returns the registry requests are dispatched to.
    #[must_use]
    pub fn tools(&self) -> &Arc<ToolRegistry> {
        &self.tools
    }

    /// Executes a typed request.
    pub async fn run(&self, request: &RunnerRequest) -> RunnerResponse {
        let started_at = self.clock.now();
        self.begin(request, started_at);

        let dispatched = match self.config.dispatch {
            DispatchMode::Echo => Dispatched {
                result: execute_tool(request),
                resolved_version: None,
            },
            DispatchMode::Registry => self.dispatch(request).await,
        };

        self.complete(request, dispatched, started_at)
    }

    /// Executes a loosely typed JSON request.
    ///
    /// A non-object document, or one that does not match [`RunnerRequest`],
    /// yields an `invalid_request` response carrying whatever identifiers
    /// could be read.
    pub async fn run_json(&self, raw: Value) -> RunnerResponse {
        if !raw.is_object() {
            return self.reject(&raw, "request must be a JSON object".to_owned());
        }
        match serde_json::from_value::<RunnerRequest>(raw.clone()) {
            Ok(request) => self.run(&request).await,
            Err(err) => self.reject(&raw, format!("malformed request: {err}")),
        }
    }

    fn reject(&self, raw: &Value, message: String) -> RunnerResponse {
        let request = RunnerRequest::salvage(raw);
        let started_at = self.clock.now();
        self.begin(&request, started_at);
        let error = RunnerError::invalid_request(message);
        self.complete(&request, Dispatched::failed(error), started_at)
    }

    async fn dispatch(&self, request: &RunnerRequest) -> Dispatched {
        let Some(tool_id) = request
            .tool_id
            .as_deref()
            .filter(|id| !id.trim().is_empty())
        else {
            return Dispatched::failed(RunnerError::invalid_request("tool_id is required"));
        };

        if !request.input.is_object() {
            return Dispatched::failed(
                RunnerError::invalid_request("input must be a JSON object")
                    .with_detail("tool_id", tool_id),
            );
        }

        let Some(handle) = self.tools.get(tool_id) else {
            return Dispatched::failed(RunnerError::tool_not_found(tool_id));
        };

        let registered = handle.metadata().version().to_owned();
        if let Some(requested) = request.tool_version.as_deref() {
            if requested != registered {
                return Dispatched::failed(
                    RunnerError::invalid_request(format!(
                        "tool `{tool_id}` version `{requested}` is not available"
                    ))
                    .with_detail("requested_version", requested)
                    .with_detail("registered_version", registered.as_str()),
                );
            }
        }

        let issues = handle.check_request(&request.input);
        if !issues.is_empty() {
            return Dispatched {
                result: RunnerResult::failure(
                    RunnerError::invalid_request("input does not match the tool request schema")
                        .with_detail("tool_id", tool_id)
                        .with_detail("issues", issues.join("; ")),
                ),
                resolved_version: Some(registered),
            };
        }

        self.emit(
            request,
            RunEventKind::Step,
            "tool resolved",
            self.clock.now(),
            metadata([("tool_id", tool_id), ("tool_version", registered.as_str())]),
        );

        let result = match handle.invoke(request.input.clone()).await {
            Ok(output) => {
                let issues = handle.check_response(&output);
                if issues.is_empty() {
                    RunnerResult::success(output)
                } else {
                    RunnerResult::failure(
                        RunnerError::tool_execution_failed(
                            "output does not match the tool response schema",
                        )
                        .with_detail("tool_id", tool_id)
                        .with_detail("issues", issues.join("; ")),
                    )
                }
            }
            Err(err) => RunnerResult::failure(map_tool_error(tool_id, &err)),
        };

        Dispatched {
            result,
            resolved_version: Some(registered),
        }
    }

    fn begin(&self, request: &RunnerRequest, started_at: DateTime<Utc>) {
        debug!(
            request_id = ?request.request_id,
            run_id = ?request.run_id,
            tool_id = ?request.tool_id,
            dispatch = ?self.config.dispatch,
            "tool invocation started"
        );
        self.emit(
            request,
            RunEventKind::Start,
            "tool invocation started",
            started_at,
            request_metadata(request, request.tool_version.as_deref(), "pending"),
        );
    }

    fn complete(
        &self,
        request: &RunnerRequest,
        dispatched: Dispatched,
        started_at: DateTime<Utc>,
    ) -> RunnerResponse {
        let finished_at = self.clock.now();
        let mut response =
            RunnerResponse::assemble(request, dispatched.result, started_at, finished_at);
        if response.tool_version.is_none() {
            response.tool_version = dispatched.resolved_version;
        }

        let elapsed_us = (response.finished_at - response.started_at)
            .num_microseconds()
            .unwrap_or(i64::MAX);
        let mut meta = request_metadata(
            request,
            response.tool_version.as_deref(),
            response.status.as_str(),
        );

        if let Some(error) = &response.error {
            warn!(
                request_id = ?response.request_id,
                tool_id = ?response.tool_id,
                kind = %error.kind(),
                reason = error.message(),
                elapsed_us,
                "tool invocation failed"
            );
            meta.insert("error_kind".to_owned(), error.kind().as_str().to_owned());
            self.emit(
                request,
                RunEventKind::Failure,
                "tool invocation failed",
                response.finished_at,
                meta,
            );
        } else {
            info!(
                request_id = ?response.request_id,
                tool_id = ?response.tool_id,
                elapsed_us,
                "tool invocation finished"
            );
            self.emit(
                request,
                RunEventKind::Finish,
                "tool invocation finished",
                response.finished_at,
                meta,
            );
        }

        response
    }

    fn emit(
        &self,
        request: &RunnerRequest,
        kind: RunEventKind,
        message: &str,
        timestamp: DateTime<Utc>,
        metadata: BTreeMap<String, String>,
    ) {
        if !self.config.emit_events {
            return;
        }
        if let Some(sink) = &self.sink {
            sink.record(RunEvent {
                event_id: EventId::random(),
                run_id: request.run_id.clone(),
                timestamp,
                kind,
                message: message.to_owned(),
                metadata,
            });
        }
    }
}

fn map_tool_error(tool_id: &str, err: &ToolError) -> RunnerError {
    match err {
        ToolError::UnknownTool { .. } => RunnerError::tool_not_found(tool_id),
        ToolError::Execution { reason } => {
            RunnerError::tool_execution_failed(reason.clone()).with_detail("tool_id", tool_id)
        }
        other => RunnerError::tool_execution_failed(other.to_string()).with_detail("tool_id", tool_id),
    }
}

fn metadata<'a, I>(pairs: I) -> BTreeMap<String, String>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    pairs
        .into_iter()
        .map(|(key, value)| (key.to_owned(), value.to_owned()))
        .collect()
}

fn request_metadata(
    request: &RunnerRequest,
    tool_version: Option<&str>,
    status: &str,
) -> BTreeMap<String, String> {
    let mut meta = metadata([
        ("status", status),
        ("tool_id", request.tool_id.as_deref().unwrap_or(UNKNOWN_TOOL_ID)),
        ("tool_version", tool_version.unwrap_or(UNKNOWN_TOOL_VERSION)),
    ]);
    if let Some(request_id) = &request.request_id {
        meta.insert("request_id".to_owned(), request_id.to_string());
    }
    meta
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::{Duration, TimeZone};
    use lane_tools::reference::register_reference_tools;
    use lane_tools::registry::ToolMetadata;
    use serde_json::json;

    use crate::clock::ManualClock;
    use crate::envelope::{ErrorKind, RunnerStatus};
    use crate::events::CollectingEventSink;

    fn registry() -> Arc<ToolRegistry> {
        let tools = Arc::new(ToolRegistry::new());
        register_reference_tools(&tools).unwrap();
        tools
            .register_tool(
                ToolMetadata::new("always_fails", "0.1.0").unwrap(),
                |_input: Value| async move { Err::<Value, _>(ToolError::execution("disk full")) },
            )
            .unwrap();
        tools
            .register_tool(
                ToolMetadata::new("wrong_shape", "0.1.0")
                    .unwrap()
                    .with_response_schema(json!({
                        "type": "object",
                        "required": ["uri"],
                    })),
                |_input: Value| async move { Ok(json!({"path": "/tmp/x"})) },
            )
            .unwrap();
        tools
    }

    /// Clock that steps backwards on every read.
    struct RewindingClock(ManualClock);

    impl Clock for RewindingClock {
        fn now(&self) -> DateTime<Utc> {
            let now = self.0.now();
            self.0.advance(Duration::seconds(-1));
            now
        }
    }

    #[tokio::test]
    async fn dispatches_to_reference_tool() {
        let runner = GovernedRunner::new(registry());
        let request = RunnerRequest::new("fetch_object_storage")
            .with_request_id("r1")
            .with_run_id("g1")
            .with_input(json!({"bucket": "b", "key": "k"}));

        let response = runner.run(&request).await;
        assert_eq!(response.status, RunnerStatus::Success);
        assert_eq!(
            response.output,
            json!({"uri": "s3://b/k", "content_type": "application/octet-stream"})
        );
        assert_eq!(response.tool_version.as_deref(), Some("1.0.0"));
        assert!(response.error.is_none());
    }

    #[tokio::test]
    async fn echo_mode_keeps_echo_output() {
        let runner = GovernedRunner::new(registry()).with_config(LaneConfig::echo());
        let request = RunnerRequest::new("fetch_object_storage").with_input(json!({"bucket": "b"}));
        let response = runner.run(&request).await;
        assert_eq!(
            response.output,
            json!({"tool_id": "fetch_object_storage", "echo": {"bucket": "b"}})
        );
        assert!(response.tool_version.is_none());
    }

    #[tokio::test]
    async fn missing_tool_id_is_invalid() {
        let runner = GovernedRunner::new(registry());
        let response = runner.run(&RunnerRequest::default()).await;
        let error = response.error.unwrap();
        assert_eq!(error.kind(), ErrorKind::InvalidRequest);
        assert_eq!(response.status, RunnerStatus::Error);
    }

    #[tokio::test]
    async fn non_object_input_is_invalid() {
        let runner = GovernedRunner::new(registry());
        let request = RunnerRequest::new("record_run_summary").with_input(json!([1, 2]));
        let response = runner.run(&request).await;
        assert_eq!(response.error.unwrap().kind(), ErrorKind::InvalidRequest);
    }

    #[tokio::test]
    async fn input_violating_request_schema_is_invalid() {
        let sink = CollectingEventSink::new();
        let runner = GovernedRunner::new(registry()).with_event_sink(sink.clone());
        let request = RunnerRequest::new("fetch_object_storage")
            .with_input(json!({"bucket": 42, "key": "k"}));

        let response = runner.run(&request).await;
        assert_eq!(response.status, RunnerStatus::Error);
        assert_eq!(response.output, json!({}));
        let error = response.error.unwrap();
        assert_eq!(error.kind(), ErrorKind::InvalidRequest);
        let issues = error.details().get("issues").unwrap();
        assert!(issues.contains("42"), "{issues}");

        let kinds: Vec<_> = sink.drain().into_iter().map(|e| e.kind).collect();
        assert_eq!(kinds, [RunEventKind::Start, RunEventKind::Failure]);
    }

    #[tokio::test]
    async fn output_violating_response_schema_fails() {
        let runner = GovernedRunner::new(registry());
        let response = runner.run(&RunnerRequest::new("wrong_shape")).await;
        assert_eq!(response.status, RunnerStatus::Error);
        assert_eq!(response.output, json!({}));
        let error = response.error.unwrap();
        assert_eq!(error.kind(), ErrorKind::ToolExecutionFailed);
        assert_eq!(error.details().get("tool_id").map(String::as_str), Some("wrong_shape"));
        assert!(error.details().get("issues").unwrap().contains("uri"));
    }

    #[tokio::test]
    async fn unknown_tool_reported() {
        let runner = GovernedRunner::new(registry());
        let response = runner.run(&RunnerRequest::new("missing")).await;
        let error = response.error.unwrap();
        assert_eq!(error.kind(), ErrorKind::ToolNotFound);
        assert_eq!(error.details().get("tool_id").map(String::as_str), Some("missing"));
    }

    #[tokio::test]
    async fn tool_failure_translated() {
        let runner = GovernedRunner::new(registry());
        let response = runner.run(&RunnerRequest::new("always_fails")).await;
        assert_eq!(response.output, json!({}));
        assert_eq!(response.tool_version.as_deref(), Some("0.1.0"));
        let error = response.error.unwrap();
        assert_eq!(error.kind(), ErrorKind::ToolExecutionFailed);
        assert_eq!(error.message(), "disk full");
    }

    #[tokio::test]
    async fn version_mismatch_rejected() {
        let runner = GovernedRunner::new(registry());
        let request = RunnerRequest::new("record_run_summary").with_tool_version("2.0.0");
        let response = runner.run(&request).await;
        assert_eq!(response.tool_version.as_deref(), Some("2.0.0"));
        let error = response.error.unwrap();
        assert_eq!(error.kind(), ErrorKind::InvalidRequest);
        assert_eq!(
            error.details().get("registered_version").map(String::as_str),
            Some("1.0.0")
        );
        assert_eq!(
            error.details().get("requested_version").map(String::as_str),
            Some("2.0.0")
        );
    }

    #[tokio::test]
    async fn events_bracket_each_run() {
        let sink = CollectingEventSink::new();
        let runner = GovernedRunner::new(registry()).with_event_sink(sink.clone());

        runner
            .run(&RunnerRequest::new("record_run_summary").with_run_id("g1"))
            .await;
        let kinds: Vec<_> = sink.drain().into_iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            [RunEventKind::Start, RunEventKind::Step, RunEventKind::Finish]
        );

        runner.run(&RunnerRequest::new("missing")).await;
        let events = sink.drain();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].kind, RunEventKind::Failure);
        assert_eq!(
            events[1].metadata.get("error_kind").map(String::as_str),
            Some("tool_not_found")
        );
    }

    #[tokio::test]
    async fn events_carry_tool_version() {
        let sink = CollectingEventSink::new();
        let runner = GovernedRunner::new(registry()).with_event_sink(sink.clone());

        runner
            .run(&RunnerRequest::new("record_run_summary").with_tool_version("1.0.0"))
            .await;
        let events = sink.drain();
        assert!(events.iter().all(|e| {
            e.metadata.get("tool_version").map(String::as_str) == Some("1.0.0")
        }));

        runner.run(&RunnerRequest::new("always_fails")).await;
        let events = sink.drain();
        let start = events.first().unwrap();
        let failure = events.last().unwrap();
        assert_eq!(start.metadata.get("tool_version").map(String::as_str), Some("unknown"));
        assert_eq!(failure.kind, RunEventKind::Failure);
        assert_eq!(failure.metadata.get("tool_version").map(String::as_str), Some("0.1.0"));
        assert_eq!(failure.metadata.get("tool_id").map(String::as_str), Some("always_fails"));
    }

    #[tokio::test]
    async fn events_can_be_disabled() {
        let sink = CollectingEventSink::new();
        let config = LaneConfig {
            emit_events: false,
            ..LaneConfig::default()
        };
        let runner = GovernedRunner::new(registry())
            .with_event_sink(sink.clone())
            .with_config(config);
        runner.run(&RunnerRequest::new("record_run_summary")).await;
        assert!(sink.drain().is_empty());
    }

    #[tokio::test]
    async fn finished_never_precedes_started() {
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let runner = GovernedRunner::new(registry())
            .with_clock(Arc::new(RewindingClock(ManualClock::new(start))));
        let response = runner.run(&RunnerRequest::new("record_run_summary")).await;
        assert_eq!(response.started_at, start);
        assert!(response.finished_at >= response.started_at);
    }

    #[tokio::test]
    async fn malformed_json_salvages_ids() {
        let runner = GovernedRunner::new(registry());
        let response = runner
            .run_json(json!({"request_id": "r9", "tool_id": 12, "trace": {"trace_id": "t"}}))
            .await;
        assert_eq!(response.request_id.as_ref().map(|id| id.as_str()), Some("r9"));
        assert!(response.tool_id.is_none());
        assert_eq!(response.trace, json!({"trace_id": "t"}));
        let error = response.error.unwrap();
        assert_eq!(error.kind(), ErrorKind::InvalidRequest);
        assert!(error.message().starts_with("malformed request"));
    }

    #[tokio::test]
    async fn non_object_json_is_rejected_in_every_mode() {
        for config in [LaneConfig::default(), LaneConfig::echo()] {
            let runner = GovernedRunner::new(registry()).with_config(config);
            for raw in [json!([]), json!(null), json!("fetch_object_storage")] {
                let response = runner.run_json(raw.clone()).await;
                assert_eq!(response.status, RunnerStatus::Error, "{raw}");
                assert_eq!(response.output, json!({}));
                assert!(response.request_id.is_none());
                assert_eq!(response.trace, json!({}));
                let error = response.error.unwrap();
                assert_eq!(error.kind(), ErrorKind::InvalidRequest);
                assert_eq!(error.message(), "request must be a JSON object");
            }
        }
    }

    #[tokio::test]
    async fn well_formed_json_dispatches() {
        let runner = GovernedRunner::new(registry());
        let response = runner
            .run_json(json!({"tool_id": "record_run_summary", "input": {"summary": {"n": 1}}}))
            .await;
        assert_eq!(response.output, json!({"recorded": true, "summary": {"n": 1}}));
    }
}
