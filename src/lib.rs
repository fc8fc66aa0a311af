// colloquy/src/lib.rs

#![doc = include_str!("../README.md")]

pub mod agent;
pub mod application;
pub mod config;
pub mod errors;
pub mod memory;
pub mod models;
pub mod parser;
pub mod prompt;
pub mod providers;
pub mod retry;
pub mod storage;
pub mod sync_bridge;
pub mod task;
pub mod tools;


pub use agent::{ConversationLoop, ConversationOutcome, DEFAULT_MAX_STEPS};
pub use application::{TaskReport, TaskRunner};
pub use config::{ModelConfig, ProviderKind, ProviderSettings};
pub use errors::{AgentError, ProviderError};
pub use memory::ShortTermMemory;
pub use models::chat::{Message, Role};
pub use models::tools::{ToolCallIntent, ToolDescriptor};
pub use parser::{parse_reply, ParsedReply, FINAL_MARKER};
pub use providers::{provider_for, Provider};
pub use retry::RetryPolicy;
pub use storage::JsonlRunLogger;
pub use task::{Agent, Task};
pub use tools::{Tool, ToolRegistry};

pub use async_trait::async_trait;
