//! Palaver: streaming conversational agent runner.
//!
//! Given a growing transcript of user/assistant/tool messages, Palaver drives
//! a language-model provider through a bounded tool-use loop, streams
//! incremental output back to the caller, and checkpoints per-conversation
//! execution state so multi-turn exchanges resume deterministically.
//!
//! # Quick Start
//!
//! ```no_run
//! use palaver::prelude::*;
//! use futures::StreamExt;
//! use std::sync::Arc;
//!
//! # async fn example(provider: Arc<dyn ModelProvider>) -> palaver::error::Result<()> {
//! let config = PalaverConfig::new().with_system_instruction("You are a helpful assistant.");
//! let session = AgentSession::new(
//!     config,
//!     provider,
//!     ToolRegistry::empty(),
//!     Arc::new(MemoryCheckpointStore::default()),
//! );
//!
//! let mut stream = session.run_conversation("chat-1", vec![], "hello").await?;
//! while let Some(event) = stream.next().await {
//!     println!("{:?}", event.payload);
//! }
//! # Ok(())
//! # }
//! ```

pub mod agent_loop;
pub mod checkpoint;
pub mod config;
pub mod context;
pub mod error;
pub mod prelude;
pub mod provider;
pub mod session;
pub mod tools;
pub mod types;
