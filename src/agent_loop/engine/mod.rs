//! The execution-graph driver.
//!
//! Walks `START → Agent → {Tools → Agent | END}` via the pure transition
//! function, committing one transcript entry batch and one checkpoint write
//! per transition. Cancellation and the iteration cap are enforced here,
//! between phases, and inside each phase at its suspension points.

use std::sync::Arc;

use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use crate::checkpoint::CheckpointStore;
use crate::error::PalaverError;
use crate::provider::ModelProvider;
use crate::tools::ToolRegistry;

use super::events::{RunErrorKind, RunEventEmitter, StreamEvent};
use super::limits::RunnerLimits;
use super::runner::{debug_enabled, RunRequest};
use super::state::{self, GraphNode, GraphState};
use super::types::RunResult;

mod agent_phase;
mod tool_phase;

use agent_phase::AgentPhaseOutcome;
use tool_phase::ToolPhaseOutcome;

#[allow(clippy::too_many_arguments)]
pub(super) async fn drive(
    request: RunRequest,
    provider: Arc<dyn ModelProvider>,
    tools: Arc<ToolRegistry>,
    checkpoints: Arc<dyn CheckpointStore>,
    mut abort_rx: oneshot::Receiver<()>,
    cancel_token: CancellationToken,
    result_tx: oneshot::Sender<RunResult>,
) {
    let emitter = RunEventEmitter::new(request.run_id, request.event_sink.clone());
    let limits = RunnerLimits::from_request(&request);
    let tool_defs = tools.definitions();
    let mut state = request.state.clone();
    let mut node = GraphNode::Start;
    let mut steps_this_run = 0usize;

    if debug_enabled() {
        tracing::debug!(
            run_id = %request.run_id,
            conversation_id = %request.conversation_id,
            provider = provider.provider_name(),
            max_steps = limits.max_steps,
            transcript_len = state.transcript.len(),
            "palaver run start"
        );
    }

    loop {
        node = match node {
            GraphNode::Start => state::next_node(GraphNode::Start, &state),

            GraphNode::Agent => {
                steps_this_run += 1;
                if steps_this_run > limits.max_steps {
                    let error = PalaverError::RunExhausted {
                        iterations: limits.max_steps,
                    };
                    let _ = result_tx.send(failed_result(&emitter, error, state));
                    return;
                }

                match agent_phase::run(
                    &request,
                    provider.as_ref(),
                    &tool_defs,
                    &state,
                    &emitter,
                    &mut abort_rx,
                    &cancel_token,
                )
                .await
                {
                    AgentPhaseOutcome::Ready { text, tool_calls } => {
                        let entry = agent_phase::assistant_entry(text, tool_calls);
                        state.push(entry.clone());
                        state.step_count += 1;
                        emitter.emit(StreamEvent::StepBoundary { entry });
                        save_checkpoint(checkpoints.as_ref(), &request, &state, &emitter);
                        state::next_node(GraphNode::Agent, &state)
                    }
                    AgentPhaseOutcome::Canceled => {
                        let _ = result_tx.send(canceled_result(&emitter, &request, state));
                        return;
                    }
                    AgentPhaseOutcome::Failed(error) => {
                        let _ = result_tx.send(failed_result(&emitter, error, state));
                        return;
                    }
                }
            }

            GraphNode::Tools => {
                match tool_phase::run(
                    &tools,
                    &mut state,
                    &emitter,
                    &mut abort_rx,
                    &cancel_token,
                )
                .await
                {
                    ToolPhaseOutcome::Completed => {
                        save_checkpoint(checkpoints.as_ref(), &request, &state, &emitter);
                        state::next_node(GraphNode::Tools, &state)
                    }
                    ToolPhaseOutcome::Canceled => {
                        let _ = result_tx.send(canceled_result(&emitter, &request, state));
                        return;
                    }
                    ToolPhaseOutcome::Failed(error) => {
                        let _ = result_tx.send(failed_result(&emitter, error, state));
                        return;
                    }
                }
            }

            GraphNode::End => {
                // state is unchanged since the save after the final agent
                // transition, so END itself writes nothing
                emitter.emit(StreamEvent::RunComplete);
                if debug_enabled() {
                    tracing::debug!(
                        run_id = %request.run_id,
                        steps = steps_this_run,
                        transcript_len = state.transcript.len(),
                        "palaver run completed"
                    );
                }
                let _ = result_tx.send(RunResult::completed(state));
                return;
            }
        };
    }
}

fn failed_result(
    emitter: &RunEventEmitter,
    error: PalaverError,
    state: GraphState,
) -> RunResult {
    emitter.emit(StreamEvent::RunError {
        kind: RunErrorKind::of(&error),
        message: error.to_string(),
    });
    if debug_enabled() {
        tracing::debug!(error = %error, "palaver run failed");
    }
    RunResult::failed(error.to_string(), state)
}

fn canceled_result(
    emitter: &RunEventEmitter,
    request: &RunRequest,
    state: GraphState,
) -> RunResult {
    emitter.emit(StreamEvent::RunError {
        kind: RunErrorKind::Canceled,
        message: "run canceled".to_string(),
    });
    if debug_enabled() {
        tracing::debug!(run_id = %request.run_id, "palaver run canceled");
    }
    RunResult::canceled(state)
}

/// A failed save is reported, not swallowed, and does not abort the run.
fn save_checkpoint(
    store: &dyn CheckpointStore,
    request: &RunRequest,
    state: &GraphState,
    emitter: &RunEventEmitter,
) {
    if let Err(error) = store.save(&request.conversation_id, state) {
        tracing::warn!(
            conversation_id = %request.conversation_id,
            error = %error,
            "checkpoint save failed"
        );
        emitter.emit(StreamEvent::RunError {
            kind: RunErrorKind::Checkpoint,
            message: error.to_string(),
        });
    }
}
