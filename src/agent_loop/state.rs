//! The execution graph: an explicit finite-state machine over run state.
//!
//! `START → Agent → {Tools → Agent | END}`. The transition function is pure
//! so the iteration cap and cancellation points live in the driver, not in
//! recursion.

use serde::{Deserialize, Serialize};
use strum::Display;

use crate::types::{AgentToolCall, ModelMessage, Role};

/// Node of the execution graph.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum GraphNode {
    Start,
    Agent,
    Tools,
    End,
}

/// Execution state owned by exactly one run at a time.
///
/// `step_count` is cumulative across resumed runs of the same conversation;
/// the per-run iteration cap is tracked separately by the driver.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphState {
    pub transcript: Vec<ModelMessage>,
    #[serde(default)]
    pub step_count: usize,
}

impl GraphState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_transcript(transcript: Vec<ModelMessage>) -> Self {
        Self {
            transcript,
            step_count: 0,
        }
    }

    pub fn push(&mut self, message: ModelMessage) {
        self.transcript.push(message);
    }

    pub fn last(&self) -> Option<&ModelMessage> {
        self.transcript.last()
    }

    pub fn is_empty(&self) -> bool {
        self.transcript.is_empty()
    }

    /// Tool calls requested by the trailing assistant entry, if any.
    pub fn pending_tool_calls(&self) -> Vec<&AgentToolCall> {
        match self.transcript.last() {
            Some(message) if message.role == Role::Assistant => message.tool_calls(),
            _ => Vec::new(),
        }
    }

    /// The run's final observable result: the trailing assistant entry with
    /// no tool calls.
    pub fn final_answer(&self) -> Option<&ModelMessage> {
        self.transcript
            .last()
            .filter(|m| m.role == Role::Assistant && !m.has_tool_calls())
    }
}

/// The routing decision evaluated after every node.
pub fn next_node(current: GraphNode, state: &GraphState) -> GraphNode {
    match current {
        GraphNode::Start => GraphNode::Agent,
        GraphNode::Agent => {
            if state.pending_tool_calls().is_empty() {
                GraphNode::End
            } else {
                GraphNode::Tools
            }
        }
        GraphNode::Tools => GraphNode::Agent,
        GraphNode::End => GraphNode::End,
    }
}
