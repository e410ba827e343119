//! One model invocation: build the effective prompt, stream the provider's
//! turn, accumulate the fragments into a single assistant entry.

use futures::StreamExt;
use tokio::sync::oneshot;
use tokio::time::{self, Duration};
use tokio_util::sync::CancellationToken;

use crate::context;
use crate::error::PalaverError;
use crate::provider::{ModelProvider, ProviderRequest, ToolDefinition};
use crate::types::{
    AgentToolCall, ContentPart, ModelMessage, Role, StreamEventType, TextStreamDelta,
};

use super::super::events::{RunEventEmitter, StreamEvent};
use super::super::limits::DEFAULT_STREAM_IDLE_TIMEOUT_MS;
use super::super::runner::{debug_enabled, RunRequest};
use super::super::state::GraphState;

pub(super) enum AgentPhaseOutcome {
    Ready {
        text: String,
        tool_calls: Vec<AgentToolCall>,
    },
    Canceled,
    Failed(PalaverError),
}

pub(super) async fn run(
    request: &RunRequest,
    provider: &dyn ModelProvider,
    tool_defs: &Option<Vec<ToolDefinition>>,
    state: &GraphState,
    emitter: &RunEventEmitter,
    abort_rx: &mut oneshot::Receiver<()>,
    cancel_token: &CancellationToken,
) -> AgentPhaseOutcome {
    // effective prompt: standing instruction + trimmed, cache-annotated transcript
    let mut effective: Vec<ModelMessage> = Vec::new();
    if let Some(instruction) = &request.system_instruction {
        effective.push(ModelMessage::system(instruction.clone()).with_cache_hint());
    }
    effective.extend(context::annotate(&context::trim(
        &state.transcript,
        request.trim_budget,
    )));

    let provider_request = ProviderRequest {
        messages: effective,
        settings: request.settings.clone(),
        tools: tool_defs.clone(),
    };

    let mut stream = match provider.stream_text(&provider_request).await {
        Ok(stream) => stream,
        Err(error) => return AgentPhaseOutcome::Failed(error),
    };

    let mut text = String::new();
    let mut tool_calls: Vec<AgentToolCall> = Vec::new();
    let mut stream_done = false;
    let idle_timeout_ms = request
        .settings
        .stream_idle_timeout_ms
        .unwrap_or(DEFAULT_STREAM_IDLE_TIMEOUT_MS);
    let mut idle_sleep = (idle_timeout_ms > 0)
        .then(|| Box::pin(time::sleep(Duration::from_millis(idle_timeout_ms))));

    loop {
        let next = if let Some(sleep) = idle_sleep.as_mut() {
            tokio::select! {
                _ = &mut *abort_rx => {
                    cancel_token.cancel();
                    return AgentPhaseOutcome::Canceled;
                }
                _ = cancel_token.cancelled() => {
                    return AgentPhaseOutcome::Canceled;
                }
                _ = sleep.as_mut() => {
                    return AgentPhaseOutcome::Failed(PalaverError::Provider(
                        "stream idle timeout".to_string(),
                    ));
                }
                delta = stream.next() => delta,
            }
        } else {
            tokio::select! {
                _ = &mut *abort_rx => {
                    cancel_token.cancel();
                    return AgentPhaseOutcome::Canceled;
                }
                _ = cancel_token.cancelled() => {
                    return AgentPhaseOutcome::Canceled;
                }
                delta = stream.next() => delta,
            }
        };

        // a stream that ends without a Done marker is treated as complete
        let Some(delta) = next else { break };
        let delta = match delta {
            Ok(delta) => delta,
            Err(error) => return AgentPhaseOutcome::Failed(error),
        };
        if let Some(sleep) = idle_sleep.as_mut() {
            sleep
                .as_mut()
                .reset(time::Instant::now() + Duration::from_millis(idle_timeout_ms));
        }
        if let Some(error) = process_delta(delta, emitter, &mut text, &mut tool_calls, &mut stream_done)
        {
            return AgentPhaseOutcome::Failed(error);
        }
        if stream_done {
            break;
        }
    }

    if debug_enabled() {
        tracing::debug!(
            run_id = %request.run_id,
            stream_done,
            tool_calls = tool_calls.len(),
            text_len = text.len(),
            "palaver agent step complete"
        );
    }

    AgentPhaseOutcome::Ready { text, tool_calls }
}

fn process_delta(
    delta: TextStreamDelta,
    emitter: &RunEventEmitter,
    text: &mut String,
    tool_calls: &mut Vec<AgentToolCall>,
    stream_done: &mut bool,
) -> Option<PalaverError> {
    match delta.event_type {
        StreamEventType::TextDelta => {
            if !delta.text.is_empty() {
                text.push_str(&delta.text);
                emitter.emit(StreamEvent::TokenDelta { text: delta.text });
            }
        }
        StreamEventType::ToolCallDelta => {
            if let Some(call) = delta.tool_call {
                // arrival order of ids fixes the execution order later
                match tool_calls.iter().position(|c| c.id == call.id) {
                    Some(index) => {
                        tool_calls[index].arguments = call.arguments.clone();
                        emitter.emit(StreamEvent::ToolCallArguments {
                            id: call.id,
                            partial_arguments: call.arguments,
                        });
                    }
                    None => {
                        emitter.emit(StreamEvent::ToolCallStarted {
                            id: call.id.clone(),
                            name: call.name.clone(),
                        });
                        tool_calls.push(call);
                    }
                }
            }
        }
        StreamEventType::Start => {}
        StreamEventType::Done => *stream_done = true,
        StreamEventType::Error => {
            let message = if delta.text.is_empty() {
                "stream error".to_string()
            } else {
                delta.text
            };
            return Some(PalaverError::Provider(message));
        }
    }
    None
}

/// Fold the accumulated fragments into one assistant transcript entry.
pub(super) fn assistant_entry(text: String, tool_calls: Vec<AgentToolCall>) -> ModelMessage {
    let mut content: Vec<ContentPart> = Vec::new();
    if !text.is_empty() {
        content.push(ContentPart::Text { text });
    }
    for call in tool_calls {
        content.push(ContentPart::ToolCall(call));
    }
    ModelMessage {
        role: Role::Assistant,
        content,
        cache: None,
        timestamp: Some(chrono::Utc::now()),
    }
}
