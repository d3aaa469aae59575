//! Envelope builder: turns a request into a timed response.
//!
//! The tool-execution step here is an echo. It never dispatches, never fails,
//! and does no I/O beyond reading the clock. See [`crate::GovernedRunner`]
//! for the dispatching lane.

use serde_json::json;

use crate::clock::{Clock, SystemClock};
use crate::envelope::{RunnerRequest, RunnerResponse, RunnerResult};

/// Tool identifier reported when the request does not name one.
pub const UNKNOWN_TOOL_ID: &str = "unknown";

/// Runs `request` through the echo step using the system clock.
#[must_use]
pub fn run_request(request: &RunnerRequest) -> RunnerResponse {
    run_request_with_clock(request, &SystemClock)
}

/// Runs `request` through the echo step, reading time from `clock`.
#[must_use]
pub fn run_request_with_clock(request: &RunnerRequest, clock: &dyn Clock) -> RunnerResponse {
    let started_at = clock.now();
    let result = execute_tool(request);
    let finished_at = clock.now();
    RunnerResponse::assemble(request, result, started_at, finished_at)
}

/// Echo step: reports the tool identifier and the untouched input.
#[must_use]
pub fn execute_tool(request: &RunnerRequest) -> RunnerResult {
    let tool_id = request.tool_id.as_deref().unwrap_or(UNKNOWN_TOOL_ID);
    RunnerResult::success(json!({
        "tool_id": tool_id,
        "echo": request.input,
    }))
}
