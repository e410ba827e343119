//! The agent loop: execution graph, runner, and event stream.

pub mod events;
pub mod limits;
pub mod multiplexer;
pub mod runner;
pub mod state;
pub mod types;

mod engine;

pub use events::{RunErrorKind, RunEvent, RunEventSink, StreamEvent};
pub use multiplexer::RunStream;
pub use runner::{LoopRunner, RunHandle, RunRequest, Runner};
pub use state::{next_node, GraphNode, GraphState};
pub use types::{RunId, RunResult, RunStatus};
