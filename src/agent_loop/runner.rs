//! Runner interfaces for the agent loop.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::checkpoint::CheckpointStore;
use crate::context;
use crate::error::PalaverError;
use crate::provider::ModelProvider;
use crate::tools::ToolRegistry;
use crate::types::GenerationSettings;

use super::engine;
use super::events::RunEventSink;
use super::state::GraphState;
use super::types::{RunId, RunResult};

/// Request payload to start a run.
#[derive(Clone)]
pub struct RunRequest {
    pub run_id: RunId,
    pub conversation_id: String,
    /// Execution state at run start (resumed or freshly seeded).
    pub state: GraphState,
    pub system_instruction: Option<String>,
    pub settings: GenerationSettings,
    /// Trimming budget, counted in transcript entries.
    pub trim_budget: usize,
    pub metadata: HashMap<String, String>,
    pub event_sink: Option<RunEventSink>,
}

impl RunRequest {
    pub fn new(conversation_id: impl Into<String>, state: GraphState) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            conversation_id: conversation_id.into(),
            state,
            system_instruction: None,
            settings: GenerationSettings::default(),
            trim_budget: context::DEFAULT_TRIM_BUDGET,
            metadata: HashMap::new(),
            event_sink: None,
        }
    }

    pub fn with_system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = Some(instruction.into());
        self
    }

    pub fn with_settings(mut self, settings: GenerationSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_trim_budget(mut self, budget: usize) -> Self {
        self.trim_budget = budget;
        self
    }

    pub fn with_metadata_entry(
        mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn with_event_sink(mut self, sink: RunEventSink) -> Self {
        self.event_sink = Some(sink);
        self
    }
}

/// Handle for an in-flight run.
#[derive(Debug)]
pub struct RunHandle {
    run_id: RunId,
    abort_tx: Option<oneshot::Sender<()>>,
    result_rx: oneshot::Receiver<RunResult>,
    cancel_token: CancellationToken,
}

impl RunHandle {
    /// Create a new run handle and expose internal channels to a runner
    /// implementation.
    pub fn new(
        run_id: RunId,
    ) -> (
        Self,
        oneshot::Receiver<()>,
        oneshot::Sender<RunResult>,
        CancellationToken,
    ) {
        let (abort_tx, abort_rx) = oneshot::channel();
        let (result_tx, result_rx) = oneshot::channel();
        let cancel_token = CancellationToken::new();
        (
            Self {
                run_id,
                abort_tx: Some(abort_tx),
                result_rx,
                cancel_token: cancel_token.clone(),
            },
            abort_rx,
            result_tx,
            cancel_token,
        )
    }

    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    /// Token that cancels the run cooperatively at its next suspension point.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    /// Request cooperative cancellation.
    pub fn abort(&mut self) -> bool {
        if let Some(tx) = self.abort_tx.take() {
            return tx.send(()).is_ok();
        }
        false
    }

    /// Wait for the run to finish.
    pub async fn wait(self) -> RunResult {
        self.result_rx
            .await
            .unwrap_or_else(|_| RunResult::canceled(GraphState::new()))
    }
}

/// Runner trait for executing agent loop requests.
#[async_trait]
pub trait Runner: Send + Sync {
    async fn start(&self, request: RunRequest) -> Result<RunHandle, PalaverError>;
}

/// Default agent-loop runner: drives the execution graph as a spawned task.
pub struct LoopRunner {
    provider: Arc<dyn ModelProvider>,
    tools: Arc<ToolRegistry>,
    checkpoints: Arc<dyn CheckpointStore>,
}

impl LoopRunner {
    pub fn new(
        provider: Arc<dyn ModelProvider>,
        tools: Arc<ToolRegistry>,
        checkpoints: Arc<dyn CheckpointStore>,
    ) -> Self {
        Self {
            provider,
            tools,
            checkpoints,
        }
    }
}

#[async_trait]
impl Runner for LoopRunner {
    async fn start(&self, request: RunRequest) -> Result<RunHandle, PalaverError> {
        let (handle, abort_rx, result_tx, cancel_token) = RunHandle::new(request.run_id);
        let provider = self.provider.clone();
        let tools = self.tools.clone();
        let checkpoints = self.checkpoints.clone();

        tokio::spawn(async move {
            engine::drive(
                request,
                provider,
                tools,
                checkpoints,
                abort_rx,
                cancel_token,
                result_tx,
            )
            .await;
        });

        Ok(handle)
    }
}

pub(crate) fn debug_enabled() -> bool {
    matches!(std::env::var("PALAVER_DEBUG").as_deref(), Ok("1"))
}
