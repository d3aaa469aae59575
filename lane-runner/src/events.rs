//! Run events emitted while a request moves through the lane.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use lane_primitives::{EventId, RunId};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::clock::serde_timestamp;

/// Stage of the invocation an event describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunEventKind {
    /// Request accepted.
    Start,
    /// Intermediate progress, e.g. tool resolved.
    Step,
    /// Request completed successfully.
    Finish,
    /// Request completed with an error.
    Failure,
}

impl fmt::Display for RunEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Start => "start",
            Self::Step => "step",
            Self::Finish => "finish",
            Self::Failure => "failure",
        };
        f.write_str(label)
    }
}

/// Structured event describing one stage of an invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunEvent {
    /// Unique event identifier.
    pub event_id: EventId,
    /// Run the request belongs to, when supplied.
    pub run_id: Option<RunId>,
    /// When the event occurred.
    #[serde(with = "serde_timestamp")]
    pub timestamp: DateTime<Utc>,
    /// Stage described by the event.
    #[serde(rename = "type")]
    pub kind: RunEventKind,
    /// Human-readable summary.
    pub message: String,
    /// String metadata such as `tool_id` and `status`.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

/// Receives run events produced by the lane.
pub trait RunEventSink: Send + Sync {
    /// Records the supplied event.
    fn record(&self, event: RunEvent);
}

/// Sink that writes events to the tracing system.
#[derive(Debug, Default)]
pub struct TracingEventSink;

impl RunEventSink for TracingEventSink {
    fn record(&self, event: RunEvent) {
        let run_id = event.run_id.as_ref().map(RunId::as_str).unwrap_or_default();
        match event.kind {
            RunEventKind::Failure => warn!(
                event_id = %event.event_id,
                run_id,
                kind = %event.kind,
                metadata = ?event.metadata,
                "{}",
                event.message
            ),
            _ => info!(
                event_id = %event.event_id,
                run_id,
                kind = %event.kind,
                metadata = ?event.metadata,
                "{}",
                event.message
            ),
        }
    }
}

/// Sink used during testing to capture events.
#[derive(Debug, Default)]
pub struct CollectingEventSink {
    events: Mutex<Vec<RunEvent>>,
}

impl CollectingEventSink {
    /// Creates a new collecting sink.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Returns and clears the collected events.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex has been poisoned by a previous panic.
    #[must_use]
    pub fn drain(&self) -> Vec<RunEvent> {
        let mut lock = self.events.lock().expect("collecting sink poisoned");
        lock.drain(..).collect()
    }
}

impl RunEventSink for CollectingEventSink {
    fn record(&self, event: RunEvent) {
        self.events
            .lock()
            .expect("collecting sink poisoned")
            .push(event);
    }
}
