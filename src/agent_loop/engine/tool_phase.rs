//! Execute every tool call pending on the trailing assistant entry.
//!
//! Calls run concurrently; result entries are appended in call order. An
//! unregistered tool name terminates the run. A resolved tool's failure is
//! folded into the transcript as an error payload so the model can react.

use std::sync::Arc;

use futures::future;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use crate::error::PalaverError;
use crate::tools::tool::{Tool, ToolExecutionContext};
use crate::tools::{validation, ToolArguments, ToolRegistry};
use crate::types::{AgentToolCall, AgentToolResult, ModelMessage};

use super::super::events::{RunEventEmitter, StreamEvent};
use super::super::state::GraphState;

pub(super) enum ToolPhaseOutcome {
    Completed,
    Canceled,
    Failed(PalaverError),
}

pub(super) async fn run(
    tools: &ToolRegistry,
    state: &mut GraphState,
    emitter: &RunEventEmitter,
    abort_rx: &mut oneshot::Receiver<()>,
    cancel_token: &CancellationToken,
) -> ToolPhaseOutcome {
    let calls: Vec<AgentToolCall> = state
        .pending_tool_calls()
        .into_iter()
        .cloned()
        .collect();
    if calls.is_empty() {
        return ToolPhaseOutcome::Completed;
    }

    // resolve every name before executing anything; an unregistered tool
    // terminates the run rather than being skipped
    let mut resolved: Vec<(AgentToolCall, Arc<dyn Tool>)> = Vec::with_capacity(calls.len());
    for call in calls {
        match tools.get(&call.name) {
            Some(tool) => resolved.push((call, tool.clone())),
            None => {
                return ToolPhaseOutcome::Failed(PalaverError::UnknownTool(call.name));
            }
        }
    }

    let pending = resolved
        .into_iter()
        .map(|(call, tool)| execute_call(call, tool))
        .collect::<Vec<_>>();
    let results = tokio::select! {
        _ = &mut *abort_rx => {
            cancel_token.cancel();
            return ToolPhaseOutcome::Canceled;
        }
        _ = cancel_token.cancelled() => {
            return ToolPhaseOutcome::Canceled;
        }
        results = future::join_all(pending) => results,
    };

    for result in results {
        emitter.emit(StreamEvent::ToolCallResult {
            id: result.tool_call_id.clone(),
            result: result.result.clone(),
            is_error: result.is_error,
        });
        let entry = ModelMessage::tool_result(result.tool_call_id, result.result, result.is_error);
        emitter.emit(StreamEvent::StepBoundary {
            entry: entry.clone(),
        });
        state.push(entry);
    }

    ToolPhaseOutcome::Completed
}

async fn execute_call(call: AgentToolCall, tool: Arc<dyn Tool>) -> AgentToolResult {
    if let Err(message) = validation::validate_arguments(&call.arguments, &tool.parameters().schema)
    {
        return AgentToolResult {
            tool_call_id: call.id,
            result: serde_json::json!({
                "error": format!("argument validation failed: {message}")
            }),
            is_error: true,
        };
    }

    let args = ToolArguments::new(call.arguments.clone());
    let ctx = ToolExecutionContext {
        metadata: serde_json::Value::Null,
        tool_call_id: Some(call.id.clone()),
        tool_name: Some(call.name.clone()),
    };
    match tool.execute(&args, &ctx).await {
        Ok(value) => AgentToolResult {
            tool_call_id: call.id,
            result: value,
            is_error: false,
        },
        Err(error) => AgentToolResult {
            tool_call_id: call.id,
            result: serde_json::json!({ "error": error.to_string() }),
            is_error: true,
        },
    }
}
