//! Per-process configuration, constructed explicitly and passed into a
//! session. No process-wide singletons; tests build their own.

use std::collections::HashMap;

use crate::context;
use crate::types::GenerationSettings;

/// Configuration for an agent session.
#[derive(Debug, Clone)]
pub struct PalaverConfig {
    /// Standing instruction prepended to every model invocation.
    pub system_instruction: Option<String>,
    pub settings: GenerationSettings,
    /// Trimming budget, counted in transcript entries (not tokens).
    pub trim_budget: usize,
    /// Free-form overrides consulted by the runner (e.g. `runner.max_steps`).
    pub metadata: HashMap<String, String>,
}

impl Default for PalaverConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl PalaverConfig {
    pub fn new() -> Self {
        Self {
            system_instruction: None,
            settings: GenerationSettings::default(),
            trim_budget: context::DEFAULT_TRIM_BUDGET,
            metadata: HashMap::new(),
        }
    }

    /// Load overrides from environment variables (PALAVER_SYSTEM_INSTRUCTION,
    /// PALAVER_TRIM_BUDGET), reading a `.env` file if present.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv(); // load .env if present, ignore error
        let mut config = Self::new();

        if let Ok(value) = std::env::var("PALAVER_SYSTEM_INSTRUCTION") {
            if !value.trim().is_empty() {
                config.system_instruction = Some(value);
            }
        }
        if let Ok(value) = std::env::var("PALAVER_TRIM_BUDGET") {
            if let Ok(parsed) = value.trim().parse::<usize>() {
                config.trim_budget = parsed;
            }
        }

        config
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
}
