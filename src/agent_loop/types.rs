//! Core run types for the agent loop.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::state::GraphState;

/// Unique run identifier.
pub type RunId = Uuid;

/// Run lifecycle status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Completed,
    Failed,
    Canceled,
}

/// Result of a run, carrying the state as of the last committed transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    pub status: RunStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub state: GraphState,
    #[serde(default)]
    pub finished_at: DateTime<Utc>,
}

impl RunResult {
    pub fn completed(state: GraphState) -> Self {
        Self {
            status: RunStatus::Completed,
            error: None,
            state,
            finished_at: Utc::now(),
        }
    }

    pub fn canceled(state: GraphState) -> Self {
        Self {
            status: RunStatus::Canceled,
            error: None,
            state,
            finished_at: Utc::now(),
        }
    }

    pub fn failed(error: impl Into<String>, state: GraphState) -> Self {
        Self {
            status: RunStatus::Failed,
            error: Some(error.into()),
            state,
            finished_at: Utc::now(),
        }
    }
}
