pub mod client;

pub use client::{OpenAIClient, OpenAIClientBuilder, OPENAI_API_BASE};
