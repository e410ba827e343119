//! Shared test support: scenario-driven stub provider and helper tools.
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::{stream, StreamExt};
use palaver::agent_loop::RunEventSink;
use palaver::prelude::*;
use serde_json::json;

/// Provider behavior, indexed by how many times the provider has been called
/// within the run.
#[derive(Clone, Copy)]
pub enum ProviderScenario {
    /// "hel" + "lo" then done.
    PlainText,
    /// Tool call `lookup({"q":"x"})` on call 0, then "the answer is 42".
    SingleToolCallThenText,
    /// Two tool calls (ids "a", "b") on call 0, then "done".
    TwoToolCallsThenText,
    /// Tool call for an unregistered name on call 0.
    UnknownToolCall,
    /// A fresh tool call on every provider call, forever.
    NeverStopsCallingTools,
    /// Text then a mid-stream provider error.
    StreamError,
    /// Text only, stream ends without a done marker.
    StreamEndsWithoutDone,
    /// One delta, then silence long enough to outlive any test.
    SlowText,
}

pub struct StubProvider {
    scenario: ProviderScenario,
    calls: AtomicUsize,
    pub requests: Arc<Mutex<Vec<ProviderRequest>>>,
}

impl StubProvider {
    pub fn new(scenario: ProviderScenario) -> Self {
        Self {
            scenario,
            calls: AtomicUsize::new(0),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

fn tool_call(id: &str, name: &str, arguments: serde_json::Value) -> AgentToolCall {
    AgentToolCall {
        id: id.to_string(),
        name: name.to_string(),
        arguments,
    }
}

fn events_for(
    scenario: ProviderScenario,
    call_index: usize,
) -> Vec<Result<TextStreamDelta>> {
    match scenario {
        ProviderScenario::PlainText => vec![
            Ok(TextStreamDelta::text_delta("hel")),
            Ok(TextStreamDelta::text_delta("lo")),
            Ok(TextStreamDelta::done(FinishReason::Stop)),
        ],
        ProviderScenario::SingleToolCallThenText => {
            if call_index == 0 {
                vec![
                    Ok(TextStreamDelta::tool_call_delta(tool_call(
                        "1",
                        "lookup",
                        json!({"q": "x"}),
                    ))),
                    Ok(TextStreamDelta::done(FinishReason::ToolCalls)),
                ]
            } else {
                vec![
                    Ok(TextStreamDelta::text_delta("the answer is 42")),
                    Ok(TextStreamDelta::done(FinishReason::Stop)),
                ]
            }
        }
        ProviderScenario::TwoToolCallsThenText => {
            if call_index == 0 {
                vec![
                    Ok(TextStreamDelta::tool_call_delta(tool_call(
                        "a",
                        "lookup",
                        json!({"q": "first"}),
                    ))),
                    Ok(TextStreamDelta::tool_call_delta(tool_call(
                        "b",
                        "lookup",
                        json!({"q": "second"}),
                    ))),
                    Ok(TextStreamDelta::done(FinishReason::ToolCalls)),
                ]
            } else {
                vec![
                    Ok(TextStreamDelta::text_delta("done")),
                    Ok(TextStreamDelta::done(FinishReason::Stop)),
                ]
            }
        }
        ProviderScenario::UnknownToolCall => {
            if call_index == 0 {
                vec![
                    Ok(TextStreamDelta::tool_call_delta(tool_call(
                        "1",
                        "nonexistent",
                        json!({}),
                    ))),
                    Ok(TextStreamDelta::done(FinishReason::ToolCalls)),
                ]
            } else {
                vec![
                    Ok(TextStreamDelta::text_delta("unreachable")),
                    Ok(TextStreamDelta::done(FinishReason::Stop)),
                ]
            }
        }
        ProviderScenario::NeverStopsCallingTools => vec![
            Ok(TextStreamDelta::tool_call_delta(tool_call(
                &format!("c{call_index}"),
                "lookup",
                json!({"q": "again"}),
            ))),
            Ok(TextStreamDelta::done(FinishReason::ToolCalls)),
        ],
        ProviderScenario::StreamError => vec![
            Ok(TextStreamDelta::text_delta("par")),
            Err(PalaverError::Provider("connection reset".to_string())),
        ],
        ProviderScenario::StreamEndsWithoutDone => {
            vec![Ok(TextStreamDelta::text_delta("done"))]
        }
        ProviderScenario::SlowText => unreachable!("SlowText is built in stream_text"),
    }
}

#[async_trait]
impl ModelProvider for StubProvider {
    fn provider_name(&self) -> &str {
        "stub"
    }

    async fn stream_text(&self, request: &ProviderRequest) -> Result<ProviderEventStream> {
        self.requests
            .lock()
            .expect("request lock")
            .push(request.clone());
        let call_index = self.calls.fetch_add(1, Ordering::SeqCst);
        if matches!(self.scenario, ProviderScenario::SlowText) {
            let slow = async_stream::stream! {
                yield Ok(TextStreamDelta::text_delta("slow"));
                tokio::time::sleep(std::time::Duration::from_secs(600)).await;
                yield Ok(TextStreamDelta::done(FinishReason::Stop));
            };
            return Ok(Box::pin(slow));
        }
        Ok(Box::pin(stream::iter(events_for(self.scenario, call_index))))
    }
}

/// A `lookup` tool returning `{"v": 42}`.
pub fn lookup_tool() -> Arc<dyn Tool> {
    Arc::new(AgentTool::new(
        "lookup",
        "Look up a value",
        AgentToolParameters::object()
            .string("q", "query", true)
            .build(),
        |_args, _ctx| async { Ok(json!({"v": 42})) },
    ))
}

/// A `lookup` tool echoing its query, for order assertions.
pub fn echo_tool() -> Arc<dyn Tool> {
    Arc::new(AgentTool::new(
        "lookup",
        "Echo the query back",
        AgentToolParameters::object()
            .string("q", "query", true)
            .build(),
        |args, _ctx| async move {
            let q = args.get_str("q")?.to_string();
            Ok(json!({"echo": q}))
        },
    ))
}

/// A `lookup` tool that always fails.
pub fn failing_tool() -> Arc<dyn Tool> {
    Arc::new(AgentTool::new(
        "lookup",
        "Always fails",
        AgentToolParameters::object()
            .string("q", "query", true)
            .build(),
        |_args, _ctx| async {
            Err(PalaverError::ToolExecution {
                tool_name: "lookup".to_string(),
                message: "backend unavailable".to_string(),
            })
        },
    ))
}

/// A `lookup` tool that counts invocations.
pub fn counting_tool(counter: Arc<AtomicUsize>) -> Arc<dyn Tool> {
    Arc::new(AgentTool::new(
        "lookup",
        "Counts invocations",
        AgentToolParameters::object()
            .string("q", "query", true)
            .build(),
        move |_args, _ctx| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(json!({"v": 42}))
            }
        },
    ))
}

pub struct TestHarness {
    pub runner: LoopRunner,
    pub requests: Arc<Mutex<Vec<ProviderRequest>>>,
    pub store: Arc<MemoryCheckpointStore>,
}

/// Runner wired to a stub provider, the given tools, and a memory store.
pub fn test_runner(scenario: ProviderScenario, tools: Vec<Arc<dyn Tool>>) -> TestHarness {
    let provider = StubProvider::new(scenario);
    let requests = provider.requests.clone();
    let store = Arc::new(MemoryCheckpointStore::default());
    let runner = LoopRunner::new(
        Arc::new(provider),
        Arc::new(ToolRegistry::new(tools).expect("registry")),
        store.clone(),
    );
    TestHarness {
        runner,
        requests,
        store,
    }
}

pub struct SessionHarness {
    pub session: AgentSession,
    pub requests: Arc<Mutex<Vec<ProviderRequest>>>,
    pub store: Arc<MemoryCheckpointStore>,
}

/// Session wired to a stub provider, the given tools, and a memory store.
pub fn test_session(
    config: PalaverConfig,
    scenario: ProviderScenario,
    tools: Vec<Arc<dyn Tool>>,
) -> SessionHarness {
    let provider = StubProvider::new(scenario);
    let requests = provider.requests.clone();
    let store = Arc::new(MemoryCheckpointStore::default());
    let session = AgentSession::new(
        config,
        Arc::new(provider),
        ToolRegistry::new(tools).expect("registry"),
        store.clone(),
    );
    SessionHarness {
        session,
        requests,
        store,
    }
}

pub fn capture_events() -> (RunEventSink, Arc<Mutex<Vec<RunEvent>>>) {
    let events = Arc::new(Mutex::new(Vec::<RunEvent>::new()));
    let sink_events = events.clone();
    let sink: RunEventSink = Arc::new(move |event| {
        if let Ok(mut guard) = sink_events.lock() {
            guard.push(event);
        }
    });
    (sink, events)
}

/// Drain a run stream to completion, returning payloads in order.
pub async fn collect_events(stream: RunStream) -> Vec<StreamEvent> {
    stream.map(|event| event.payload).collect().await
}
