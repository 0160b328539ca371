use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum ContextError {
    #[error("Tokenizer error: {0}")]
    Tokenizer(String),
}

pub type Result<T> = std::result::Result<T, ContextError>;
