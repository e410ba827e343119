//! Closed tool registry, fixed at startup.

use std::sync::Arc;

use crate::error::{PalaverError, Result};
use crate::provider::ToolDefinition;

use super::tool::Tool;

/// The fixed set of tools available to a session.
///
/// Constructed once and immutable for the process lifetime; lookups are by
/// unique tool name.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// Build a registry from a set of tools. Duplicate names are a
    /// configuration error.
    pub fn new(tools: Vec<Arc<dyn Tool>>) -> Result<Self> {
        for (idx, tool) in tools.iter().enumerate() {
            if tools[..idx].iter().any(|t| t.name() == tool.name()) {
                return Err(PalaverError::Configuration(format!(
                    "duplicate tool name '{}'",
                    tool.name()
                )));
            }
        }
        Ok(Self { tools })
    }

    /// Registry with no tools.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Look up a tool by name.
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.iter().find(|t| t.name() == name)
    }

    /// Tool definitions advertised to the provider, `None` when empty.
    pub fn definitions(&self) -> Option<Vec<ToolDefinition>> {
        if self.tools.is_empty() {
            return None;
        }
        Some(
            self.tools
                .iter()
                .map(|t| ToolDefinition {
                    name: t.name().to_string(),
                    description: t.description().to_string(),
                    parameters: t.parameters().schema.clone(),
                })
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.tools.iter().map(|t| t.name()).collect();
        f.debug_struct("ToolRegistry").field("tools", &names).finish()
    }
}
