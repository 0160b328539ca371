pub mod config;
pub mod error;
pub mod openai;
pub mod traits;
pub mod types;

pub use config::{ClientFactory, OpenAIConfig, ProviderConfig};
pub use error::{LlmError, Result};
pub use openai::{OpenAIClient, OpenAIClientBuilder};
pub use traits::{ChatClient, ChatOptions, ChatRequest, ChatResponse, TokenUsage};
pub use types::Message;
