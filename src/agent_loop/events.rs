//! Run event stream types.
//!
//! Every producer inside a run (the provider adapter, the tool executor, the
//! driver itself) writes onto one emitter; the multiplexer relays the events
//! to the consumer in emission order.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::Display;

use crate::error::PalaverError;
use crate::types::ModelMessage;

use super::types::RunId;

/// Events exposed to the consumer of a run, in exact temporal order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Incremental assistant text.
    TokenDelta { text: String },
    /// The model started requesting a tool invocation.
    ToolCallStarted { id: String, name: String },
    /// Arguments for an in-flight tool call, possibly partial.
    ToolCallArguments {
        id: String,
        partial_arguments: serde_json::Value,
    },
    /// A tool invocation finished.
    ToolCallResult {
        id: String,
        result: serde_json::Value,
        is_error: bool,
    },
    /// A transcript entry was committed.
    StepBoundary { entry: ModelMessage },
    /// The run hit a terminating error; always the last event when emitted
    /// with a terminating kind. `Checkpoint` is the one non-terminal kind: a
    /// failed save is reported without aborting the in-memory run.
    RunError { kind: RunErrorKind, message: String },
    /// The run reached END.
    RunComplete,
}

/// Machine-readable classification for `RunError`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RunErrorKind {
    UnknownTool,
    Provider,
    RunExhausted,
    Checkpoint,
    Canceled,
}

impl RunErrorKind {
    pub fn of(error: &PalaverError) -> Self {
        match error {
            PalaverError::UnknownTool(_) => Self::UnknownTool,
            PalaverError::RunExhausted { .. } => Self::RunExhausted,
            PalaverError::Checkpoint(_) => Self::Checkpoint,
            _ => Self::Provider,
        }
    }
}

/// Envelope for streamed run events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunEvent {
    pub run_id: RunId,
    pub seq: u64,
    pub timestamp: DateTime<Utc>,
    pub payload: StreamEvent,
}

/// Callback used for streaming run events.
pub type RunEventSink = Arc<dyn Fn(RunEvent) + Send + Sync>;

pub(crate) struct RunEventEmitter {
    run_id: RunId,
    seq: AtomicU64,
    sink: Option<RunEventSink>,
}

impl RunEventEmitter {
    pub(crate) fn new(run_id: RunId, sink: Option<RunEventSink>) -> Self {
        Self {
            run_id,
            seq: AtomicU64::new(1),
            sink,
        }
    }

    pub(crate) fn emit(&self, payload: StreamEvent) {
        let Some(sink) = &self.sink else {
            return;
        };
        let seq = self.seq.fetch_add(1, Ordering::SeqCst);
        (sink)(RunEvent {
            run_id: self.run_id,
            seq,
            timestamp: Utc::now(),
            payload,
        });
    }
}
