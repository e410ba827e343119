//! Checkpoint persistence: one execution-state record per conversation id.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::agent_loop::state::GraphState;
use crate::error::{PalaverError, Result};

/// Storage abstraction for persisted execution state.
///
/// One live record per conversation id, overwritten on each completed step
/// boundary. `load` for an unknown id returns `None`, never an error.
pub trait CheckpointStore: Send + Sync {
    fn load(&self, conversation_id: &str) -> Result<Option<GraphState>>;
    fn save(&self, conversation_id: &str, state: &GraphState) -> Result<()>;
    fn clear(&self, conversation_id: &str) -> Result<()>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CheckpointFile {
    version: u32,
    conversation_id: String,
    state: GraphState,
    saved_at: DateTime<Utc>,
}

/// File-backed checkpoint store: one JSON blob per conversation id.
///
/// JSON rather than a schema-bound format because tool-call arguments and
/// tool results are arbitrary JSON and must round-trip exactly.
#[derive(Debug, Clone)]
pub struct FileCheckpointStore {
    base_dir: PathBuf,
}

impl FileCheckpointStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn new_default() -> Self {
        Self {
            base_dir: default_checkpoint_dir(),
        }
    }

    fn checkpoint_path(&self, conversation_id: &str) -> PathBuf {
        let name = normalize_label(conversation_id);
        self.base_dir.join(format!("{name}.json"))
    }

    fn ensure_parent(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|err| PalaverError::Checkpoint(err.to_string()))?;
        }
        Ok(())
    }
}

impl CheckpointStore for FileCheckpointStore {
    fn load(&self, conversation_id: &str) -> Result<Option<GraphState>> {
        let path = self.checkpoint_path(conversation_id);
        let raw = match fs::read_to_string(&path) {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(PalaverError::Checkpoint(err.to_string())),
        };
        let file: CheckpointFile = serde_json::from_str(&raw)
            .map_err(|err| PalaverError::Checkpoint(err.to_string()))?;
        Ok(Some(file.state))
    }

    fn save(&self, conversation_id: &str, state: &GraphState) -> Result<()> {
        let path = self.checkpoint_path(conversation_id);
        Self::ensure_parent(&path)?;
        let file = CheckpointFile {
            version: 1,
            conversation_id: conversation_id.to_string(),
            state: state.clone(),
            saved_at: Utc::now(),
        };
        let serialized = serde_json::to_string(&file)
            .map_err(|err| PalaverError::Checkpoint(err.to_string()))?;
        fs::write(&path, serialized).map_err(|err| PalaverError::Checkpoint(err.to_string()))?;
        Ok(())
    }

    fn clear(&self, conversation_id: &str) -> Result<()> {
        let path = self.checkpoint_path(conversation_id);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(PalaverError::Checkpoint(err.to_string())),
        }
    }
}

/// In-memory checkpoint store for tests and single-process callers.
#[derive(Debug, Default)]
pub struct MemoryCheckpointStore {
    states: Mutex<HashMap<String, GraphState>>,
}

impl CheckpointStore for MemoryCheckpointStore {
    fn load(&self, conversation_id: &str) -> Result<Option<GraphState>> {
        let states = self
            .states
            .lock()
            .map_err(|_| PalaverError::Checkpoint("store lock poisoned".to_string()))?;
        Ok(states.get(conversation_id).cloned())
    }

    fn save(&self, conversation_id: &str, state: &GraphState) -> Result<()> {
        let mut states = self
            .states
            .lock()
            .map_err(|_| PalaverError::Checkpoint("store lock poisoned".to_string()))?;
        states.insert(conversation_id.to_string(), state.clone());
        Ok(())
    }

    fn clear(&self, conversation_id: &str) -> Result<()> {
        let mut states = self
            .states
            .lock()
            .map_err(|_| PalaverError::Checkpoint("store lock poisoned".to_string()))?;
        states.remove(conversation_id);
        Ok(())
    }
}

fn default_checkpoint_dir() -> PathBuf {
    directories::UserDirs::new()
        .map(|dirs| dirs.home_dir().join(".palaver").join("checkpoints"))
        .unwrap_or_else(|| PathBuf::from(".palaver/checkpoints"))
}

fn normalize_label(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return "default".to_string();
    }
    let mut out = String::with_capacity(trimmed.len());
    for ch in trimmed.chars() {
        let lower = ch.to_ascii_lowercase();
        if lower.is_ascii_alphanumeric() || lower == '-' {
            out.push(lower);
        } else {
            out.push('-');
        }
    }
    if out.trim_matches('-').is_empty() {
        "default".to_string()
    } else {
        out
    }
}
