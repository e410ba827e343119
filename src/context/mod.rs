//! Transcript preparation before each model invocation: trimming to a bounded
//! working set and cache-hint annotation.

use crate::types::{CacheHint, ModelMessage, Role};

/// Default trimming budget, counted in transcript entries.
pub const DEFAULT_TRIM_BUDGET: usize = 10;

/// Reduce a transcript to at most `budget` recent entries.
///
/// The leading system entry is kept unconditionally (even when the budget is
/// exceeded by doing so) and the cut only lands on a user-role boundary, so
/// the result never opens with an assistant or tool entry stripped of the
/// user turn that produced it.
pub fn trim(messages: &[ModelMessage], budget: usize) -> Vec<ModelMessage> {
    if messages.len() <= budget {
        return messages.to_vec();
    }

    let system = messages.first().filter(|m| m.role == Role::System);

    let mut start = messages.len() - budget;
    while start < messages.len() && messages[start].role != Role::User {
        start += 1;
    }

    let mut trimmed = Vec::with_capacity(messages.len() - start + 1);
    if let Some(system) = system {
        trimmed.push(system.clone());
    }
    trimmed.extend(messages[start..].iter().cloned());
    trimmed
}

/// Attach cache hints to at most two entries: the last entry, and the second
/// most-recent user entry scanning from the end.
///
/// Returns a new transcript; the input is not mutated. Any hints already
/// present are discarded first, so annotating twice marks the same entries.
pub fn annotate(messages: &[ModelMessage]) -> Vec<ModelMessage> {
    let mut annotated: Vec<ModelMessage> = messages
        .iter()
        .cloned()
        .map(|mut message| {
            message.cache = None;
            message
        })
        .collect();

    let Some(last) = annotated.last_mut() else {
        return annotated;
    };
    last.cache = Some(CacheHint::Ephemeral);

    let mut user_count = 0usize;
    for message in annotated.iter_mut().rev() {
        if message.role == Role::User {
            user_count += 1;
            if user_count == 2 {
                message.cache = Some(CacheHint::Ephemeral);
                break;
            }
        }
    }

    annotated
}
