//! Inbound surface: a session owns the provider, tool registry, checkpoint
//! store, and the per-conversation concurrency guard.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use crate::agent_loop::multiplexer::{channel_sink, RunStream};
use crate::agent_loop::runner::{LoopRunner, RunRequest, Runner};
use crate::agent_loop::state::GraphState;
use crate::checkpoint::CheckpointStore;
use crate::config::PalaverConfig;
use crate::error::{PalaverError, Result};
use crate::provider::ModelProvider;
use crate::tools::ToolRegistry;
use crate::types::{message, ModelMessage};

/// Drives conversations against one provider and one fixed tool set.
pub struct AgentSession {
    config: PalaverConfig,
    runner: LoopRunner,
    checkpoints: Arc<dyn CheckpointStore>,
    active: Arc<Mutex<HashSet<String>>>,
}

impl AgentSession {
    pub fn new(
        config: PalaverConfig,
        provider: Arc<dyn ModelProvider>,
        tools: ToolRegistry,
        checkpoints: Arc<dyn CheckpointStore>,
    ) -> Self {
        Self {
            config,
            runner: LoopRunner::new(provider, Arc::new(tools), checkpoints.clone()),
            checkpoints,
            active: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Start one run for a conversation and return its event stream.
    ///
    /// At most one run per conversation id may be active; a second request
    /// while one is running fails fast with `ConversationBusy`. An existing
    /// checkpoint is the authoritative resume state; `transcript_so_far`
    /// seeds brand-new conversations only. The new user message is appended
    /// before the run starts.
    pub async fn run_conversation(
        &self,
        conversation_id: &str,
        transcript_so_far: Vec<ModelMessage>,
        new_user_message: impl Into<String>,
    ) -> Result<RunStream> {
        message::validate_transcript(&transcript_so_far)?;

        let guard = ActiveGuard::acquire(&self.active, conversation_id)?;

        let mut state = match self.checkpoints.load(conversation_id) {
            Ok(Some(state)) => state,
            Ok(None) => GraphState::with_transcript(transcript_so_far),
            Err(error) => {
                tracing::warn!(
                    conversation_id,
                    error = %error,
                    "checkpoint load failed; starting from the caller's transcript"
                );
                GraphState::with_transcript(transcript_so_far)
            }
        };
        state.push(ModelMessage::user(new_user_message));

        let (sink, rx) = channel_sink();
        let mut request = RunRequest::new(conversation_id, state)
            .with_settings(self.config.settings.clone())
            .with_trim_budget(self.config.trim_budget)
            .with_event_sink(sink);
        if let Some(instruction) = &self.config.system_instruction {
            request = request.with_system_instruction(instruction.clone());
        }
        for (key, value) in &self.config.metadata {
            request = request.with_metadata_entry(key.clone(), value.clone());
        }

        let run_id = request.run_id;
        let handle = self.runner.start(request).await?;
        let cancel_token = handle.cancellation_token();

        // release the busy guard only once the run task has fully finished
        tokio::spawn(async move {
            let _ = handle.wait().await;
            drop(guard);
        });

        Ok(RunStream::new(run_id, rx, cancel_token))
    }

    /// Whether a run is currently active for the conversation.
    pub fn is_busy(&self, conversation_id: &str) -> bool {
        self.active
            .lock()
            .map(|set| set.contains(conversation_id))
            .unwrap_or(false)
    }
}

struct ActiveGuard {
    active: Arc<Mutex<HashSet<String>>>,
    conversation_id: String,
}

impl ActiveGuard {
    fn acquire(active: &Arc<Mutex<HashSet<String>>>, conversation_id: &str) -> Result<Self> {
        let mut set = active
            .lock()
            .map_err(|_| PalaverError::InvalidState("active-run lock poisoned".to_string()))?;
        if !set.insert(conversation_id.to_string()) {
            return Err(PalaverError::ConversationBusy(conversation_id.to_string()));
        }
        Ok(Self {
            active: active.clone(),
            conversation_id: conversation_id.to_string(),
        })
    }
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        if let Ok(mut set) = self.active.lock() {
            set.remove(&self.conversation_id);
        }
    }
}
