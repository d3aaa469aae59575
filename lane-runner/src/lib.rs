//! Request/response envelope and execution lane for tool invocations.
//!
//! [`run_request`] is the envelope builder: it times an echo of the request
//! and wraps it in a [`RunnerResponse`]. [`GovernedRunner`] is the lane
//! proper, routing requests to tools in a
//! [`ToolRegistry`](lane_tools::registry::ToolRegistry) and translating every
//! failure into an error-carrying response.

#![warn(missing_docs, clippy::pedantic)]

mod builder;
mod clock;
mod envelope;
mod events;
mod governed;

pub use builder::{UNKNOWN_TOOL_ID, execute_tool, run_request, run_request_with_clock};
pub use clock::{Clock, ManualClock, SystemClock, format_timestamp};
pub use envelope::{
    ErrorKind, RunnerError, RunnerRequest, RunnerResponse, RunnerResult, RunnerStatus,
};
pub use events::{CollectingEventSink, RunEvent, RunEventKind, RunEventSink, TracingEventSink};
pub use governed::GovernedRunner;
