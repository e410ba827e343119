//! Runner limits, resolved request metadata > env > default.

use std::collections::HashMap;

use super::runner::RunRequest;

const DEFAULT_MAX_STEPS: usize = 25;
pub(crate) const DEFAULT_STREAM_IDLE_TIMEOUT_MS: u64 = 120_000;

const RUNNER_MAX_STEPS_ENV: &str = "PALAVER_RUNNER_MAX_STEPS";
const RUNNER_MAX_STEPS_KEYS: [&str; 2] = ["runner.max_steps", "max_steps"];

/// Bounds guarding a single run.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RunnerLimits {
    /// Agent steps allowed before the run fails as exhausted.
    pub(crate) max_steps: usize,
}

impl RunnerLimits {
    pub(crate) fn from_request(request: &RunRequest) -> Self {
        Self {
            max_steps: parse_runner_limit(
                &request.metadata,
                &RUNNER_MAX_STEPS_KEYS,
                RUNNER_MAX_STEPS_ENV,
                DEFAULT_MAX_STEPS,
            ),
        }
    }
}

fn parse_runner_limit(
    metadata: &HashMap<String, String>,
    keys: &[&str],
    env_key: &str,
    default: usize,
) -> usize {
    for key in keys {
        if let Some(value) = metadata.get(*key) {
            if let Some(parsed) = parse_positive_usize(value) {
                return parsed;
            }
        }
    }
    if let Ok(value) = std::env::var(env_key) {
        if let Some(parsed) = parse_positive_usize(&value) {
            return parsed;
        }
    }
    default
}

fn parse_positive_usize(value: &str) -> Option<usize> {
    let parsed = value.trim().parse::<usize>().ok()?;
    if parsed == 0 {
        None
    } else {
        Some(parsed)
    }
}
