//! Execution graph and runner behavior.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use common::*;
use palaver::prelude::*;
use pretty_assertions::assert_eq;
use tokio::time::{timeout, Duration};

async fn finished(handle: RunHandle) -> RunResult {
    timeout(Duration::from_secs(2), handle.wait())
        .await
        .expect("run wait timeout")
}

#[tokio::test]
async fn plain_text_run_streams_deltas_then_boundary_then_completion() {
    let harness = test_runner(ProviderScenario::PlainText, vec![]);
    let (sink, events) = capture_events();
    let state = GraphState::with_transcript(vec![
        ModelMessage::system("S"),
        ModelMessage::user("hi"),
    ]);
    let request = RunRequest::new("chat-1", state).with_event_sink(sink);

    let handle = harness.runner.start(request).await.expect("start run");
    let result = finished(handle).await;

    assert_eq!(result.status, RunStatus::Completed);
    assert_eq!(result.state.transcript.len(), 3);
    assert_eq!(result.state.final_answer().expect("final answer").text(), "hello");

    let events = events.lock().expect("event lock");
    let payloads: Vec<&StreamEvent> = events.iter().map(|e| &e.payload).collect();
    assert_eq!(payloads.len(), 4);
    assert!(matches!(payloads[0], StreamEvent::TokenDelta { text } if text == "hel"));
    assert!(matches!(payloads[1], StreamEvent::TokenDelta { text } if text == "lo"));
    assert!(matches!(
        payloads[2],
        StreamEvent::StepBoundary { entry }
            if entry.role == Role::Assistant && entry.text() == "hello"
    ));
    assert!(matches!(payloads[3], StreamEvent::RunComplete));

    let seqs: Vec<u64> = events.iter().map(|e| e.seq).collect();
    assert!(seqs.windows(2).all(|w| w[0] < w[1]), "seq must be monotonic");
}

#[tokio::test]
async fn run_without_tool_calls_never_invokes_the_executor() {
    let counter = Arc::new(AtomicUsize::new(0));
    let harness = test_runner(
        ProviderScenario::PlainText,
        vec![counting_tool(counter.clone())],
    );
    let state = GraphState::with_transcript(vec![ModelMessage::user("hi")]);

    let handle = harness
        .runner
        .start(RunRequest::new("chat-1", state))
        .await
        .expect("start run");
    let result = finished(handle).await;

    assert_eq!(result.status, RunStatus::Completed);
    assert_eq!(counter.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn tool_call_round_trip_produces_four_entry_transcript() {
    let harness = test_runner(ProviderScenario::SingleToolCallThenText, vec![lookup_tool()]);
    let (sink, events) = capture_events();
    let state = GraphState::with_transcript(vec![ModelMessage::user("hi")]);
    let request = RunRequest::new("chat-1", state).with_event_sink(sink);

    let handle = harness.runner.start(request).await.expect("start run");
    let result = finished(handle).await;

    assert_eq!(result.status, RunStatus::Completed);
    let transcript = &result.state.transcript;
    assert_eq!(transcript.len(), 4);
    assert_eq!(transcript[0].role, Role::User);
    assert_eq!(transcript[1].role, Role::Assistant);
    assert!(transcript[1].has_tool_calls());
    assert_eq!(transcript[2].role, Role::Tool);
    assert_eq!(transcript[3].role, Role::Assistant);
    assert_eq!(transcript[3].text(), "the answer is 42");
    assert_eq!(result.state.step_count, 2);

    let events = events.lock().expect("event lock");
    let started = events.iter().position(|e| {
        matches!(&e.payload, StreamEvent::ToolCallStarted { id, name } if id == "1" && name == "lookup")
    });
    let resulted = events.iter().position(|e| {
        matches!(
            &e.payload,
            StreamEvent::ToolCallResult { id, result, is_error }
                if id == "1" && result == &serde_json::json!({"v": 42}) && !is_error
        )
    });
    let completed = events.iter().position(|e| matches!(e.payload, StreamEvent::RunComplete));
    let started = started.expect("expected ToolCallStarted");
    let resulted = resulted.expect("expected ToolCallResult");
    let completed = completed.expect("expected RunComplete");
    assert!(started < resulted);
    assert!(resulted < completed);
    assert_eq!(completed, events.len() - 1);
}

#[tokio::test]
async fn multiple_tool_results_are_appended_in_call_order() {
    let harness = test_runner(ProviderScenario::TwoToolCallsThenText, vec![echo_tool()]);
    let state = GraphState::with_transcript(vec![ModelMessage::user("hi")]);

    let handle = harness
        .runner
        .start(RunRequest::new("chat-1", state))
        .await
        .expect("start run");
    let result = finished(handle).await;

    assert_eq!(result.status, RunStatus::Completed);
    let tool_entries: Vec<_> = result
        .state
        .transcript
        .iter()
        .filter(|m| m.role == Role::Tool)
        .collect();
    assert_eq!(tool_entries.len(), 2);
    let first = tool_entries[0].tool_results()[0];
    let second = tool_entries[1].tool_results()[0];
    assert_eq!(first.tool_call_id, "a");
    assert_eq!(first.result, serde_json::json!({"echo": "first"}));
    assert_eq!(second.tool_call_id, "b");
    assert_eq!(second.result, serde_json::json!({"echo": "second"}));
}

#[tokio::test]
async fn unknown_tool_terminates_run_with_error_as_final_event() {
    let harness = test_runner(ProviderScenario::UnknownToolCall, vec![lookup_tool()]);
    let (sink, events) = capture_events();
    let state = GraphState::with_transcript(vec![ModelMessage::user("hi")]);
    let request = RunRequest::new("chat-1", state).with_event_sink(sink);

    let handle = harness.runner.start(request).await.expect("start run");
    let result = finished(handle).await;

    assert_eq!(result.status, RunStatus::Failed);
    let events = events.lock().expect("event lock");
    let last = events.last().expect("at least one event");
    assert!(matches!(
        &last.payload,
        StreamEvent::RunError { kind: RunErrorKind::UnknownTool, message }
            if message.contains("nonexistent")
    ));

    // the checkpoint stops at the failing step: the assistant request is
    // committed, no tool result ever is
    let saved = harness.store.load("chat-1").expect("load").expect("saved state");
    assert_eq!(saved.transcript.last().expect("entry").role, Role::Assistant);
    assert!(saved.transcript.iter().all(|m| m.role != Role::Tool));
}

#[tokio::test]
async fn runaway_tool_loop_fails_with_run_exhausted() {
    let harness = test_runner(ProviderScenario::NeverStopsCallingTools, vec![lookup_tool()]);
    let (sink, events) = capture_events();
    let state = GraphState::with_transcript(vec![ModelMessage::user("hi")]);
    let request = RunRequest::new("chat-1", state)
        .with_metadata_entry("runner.max_steps", "3")
        .with_event_sink(sink);

    let handle = harness.runner.start(request).await.expect("start run");
    let result = finished(handle).await;

    assert_eq!(result.status, RunStatus::Failed);
    let assistant_steps = result
        .state
        .transcript
        .iter()
        .filter(|m| m.role == Role::Assistant)
        .count();
    assert_eq!(assistant_steps, 3);

    let events = events.lock().expect("event lock");
    assert!(matches!(
        &events.last().expect("event").payload,
        StreamEvent::RunError { kind: RunErrorKind::RunExhausted, .. }
    ));
}

#[tokio::test]
async fn provider_stream_error_terminates_without_committing_an_entry() {
    let harness = test_runner(ProviderScenario::StreamError, vec![]);
    let (sink, events) = capture_events();
    let state = GraphState::with_transcript(vec![ModelMessage::user("hi")]);
    let request = RunRequest::new("chat-1", state).with_event_sink(sink);

    let handle = harness.runner.start(request).await.expect("start run");
    let result = finished(handle).await;

    assert_eq!(result.status, RunStatus::Failed);
    assert_eq!(result.state.transcript.len(), 1, "no assistant entry committed");
    assert!(harness.store.load("chat-1").expect("load").is_none());

    let events = events.lock().expect("event lock");
    assert!(matches!(
        &events.last().expect("event").payload,
        StreamEvent::RunError { kind: RunErrorKind::Provider, message }
            if message.contains("connection reset")
    ));
}

#[tokio::test]
async fn stream_ending_without_done_marker_still_completes() {
    let harness = test_runner(ProviderScenario::StreamEndsWithoutDone, vec![]);
    let state = GraphState::with_transcript(vec![ModelMessage::user("hi")]);

    let handle = harness
        .runner
        .start(RunRequest::new("chat-1", state))
        .await
        .expect("start run");
    let result = finished(handle).await;

    assert_eq!(result.status, RunStatus::Completed);
    assert_eq!(result.state.final_answer().expect("answer").text(), "done");
}

#[tokio::test]
async fn tool_failure_is_folded_into_transcript_and_run_continues() {
    let harness = test_runner(ProviderScenario::SingleToolCallThenText, vec![failing_tool()]);
    let (sink, events) = capture_events();
    let state = GraphState::with_transcript(vec![ModelMessage::user("hi")]);
    let request = RunRequest::new("chat-1", state).with_event_sink(sink);

    let handle = harness.runner.start(request).await.expect("start run");
    let result = finished(handle).await;

    assert_eq!(result.status, RunStatus::Completed, "tool failure must not abort");
    let tool_entry = result
        .state
        .transcript
        .iter()
        .find(|m| m.role == Role::Tool)
        .expect("tool entry");
    let tool_result = tool_entry.tool_results()[0];
    assert!(tool_result.is_error);
    assert!(tool_result.result["error"]
        .as_str()
        .expect("error payload")
        .contains("backend unavailable"));

    let events = events.lock().expect("event lock");
    assert!(events.iter().any(|e| matches!(
        &e.payload,
        StreamEvent::ToolCallResult { is_error: true, .. }
    )));
    assert!(matches!(
        events.last().expect("event").payload,
        StreamEvent::RunComplete
    ));
}

#[tokio::test]
async fn schema_invalid_arguments_become_an_error_result_not_an_abort() {
    let provider = StubProvider::new(ProviderScenario::SingleToolCallThenText);
    let store = Arc::new(MemoryCheckpointStore::default());
    let strict = Arc::new(AgentTool::new(
        "lookup",
        "Strict schema",
        AgentToolParameters::object()
            .number("q", "numeric query", true)
            .build(),
        |_args, _ctx| async { Ok(serde_json::json!({"v": 42})) },
    ));
    let runner = LoopRunner::new(
        Arc::new(provider),
        Arc::new(ToolRegistry::new(vec![strict]).expect("registry")),
        store,
    );
    let state = GraphState::with_transcript(vec![ModelMessage::user("hi")]);

    let handle = runner
        .start(RunRequest::new("chat-1", state))
        .await
        .expect("start run");
    let result = finished(handle).await;

    // arguments were {"q": "x"}: a string where a number is declared
    assert_eq!(result.status, RunStatus::Completed);
    let tool_entry = result
        .state
        .transcript
        .iter()
        .find(|m| m.role == Role::Tool)
        .expect("tool entry");
    let tool_result = tool_entry.tool_results()[0];
    assert!(tool_result.is_error);
    assert!(tool_result.result["error"]
        .as_str()
        .expect("error payload")
        .contains("argument validation failed"));
}

#[tokio::test]
async fn abort_cancels_the_run_without_writing_a_checkpoint() {
    let harness = test_runner(ProviderScenario::SlowText, vec![]);
    let state = GraphState::with_transcript(vec![ModelMessage::user("hi")]);

    let mut handle = harness
        .runner
        .start(RunRequest::new("chat-1", state))
        .await
        .expect("start run");
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(handle.abort());
    let result = finished(handle).await;

    assert_eq!(result.status, RunStatus::Canceled);
    assert!(harness.store.load("chat-1").expect("load").is_none());
}
