//! Model provider boundary.
//!
//! The core never speaks HTTP itself; a [`ModelProvider`] implementation is
//! handed in at session construction and streams one model turn at a time.

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

use crate::error::PalaverError;
use crate::types::{GenerationSettings, ModelMessage, TextStreamDelta};

/// A request sent to a model provider.
#[derive(Debug, Clone)]
pub struct ProviderRequest {
    /// Effective prompt: standing instruction plus trimmed, annotated transcript.
    pub messages: Vec<ModelMessage>,
    pub settings: GenerationSettings,
    pub tools: Option<Vec<ToolDefinition>>,
}

/// Tool definition advertised to the provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// A provider's streaming response: text and tool-call fragments terminated
/// by a `Done` marker.
pub type ProviderEventStream = BoxStream<'static, Result<TextStreamDelta, PalaverError>>;

/// Core trait implemented by model providers.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Provider name (e.g., "anthropic"), used for logging.
    fn provider_name(&self) -> &str;

    /// Stream one model turn for the given request.
    async fn stream_text(
        &self,
        request: &ProviderRequest,
    ) -> Result<ProviderEventStream, PalaverError>;
}
