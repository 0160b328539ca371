//! Builds the bounded prompt sent to the provider for a room analysis.

mod default;
mod error;
mod strategy;
mod templates;

pub use default::{ContextConfig, DefaultContextStrategy};
pub use error::{ContextError, Result};
pub use strategy::{ContextStrategy, ContextWindow};
pub use templates::{instructions, DEFAULT_SYSTEM_PROMPT_TEMPLATE};
