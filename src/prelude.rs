//! Convenience re-exports for common use.

pub use crate::agent_loop::{
    GraphNode, GraphState, LoopRunner, RunErrorKind, RunEvent, RunHandle, RunId, RunRequest,
    RunResult, RunStatus, RunStream, Runner, StreamEvent,
};
pub use crate::checkpoint::{CheckpointStore, FileCheckpointStore, MemoryCheckpointStore};
pub use crate::config::PalaverConfig;
pub use crate::error::{PalaverError, Result};
pub use crate::provider::{ModelProvider, ProviderEventStream, ProviderRequest, ToolDefinition};
pub use crate::session::AgentSession;
pub use crate::tools::{AgentTool, AgentToolParameters, Tool, ToolArguments, ToolRegistry};
pub use crate::types::{
    AgentToolCall, AgentToolResult, CacheHint, ContentPart, FinishReason, GenerationSettings,
    ModelMessage, Role, StreamEventType, TextStreamDelta,
};
