use thiserror::Error;

use chatlens_parser::ParseError;
use chatlens_persist::StoreError;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Invalid upload: {0}")]
    InvalidInput(String),

    #[error("Upload of {size} bytes exceeds the {limit} byte limit")]
    TooLarge { size: usize, limit: usize },

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, IngestError>;
