use thiserror::Error;

use chatlens_persist::StoreError;
use chatlens_types::AnalysisType;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Room not found: {0}")]
    NotFound(String),

    #[error("Analysis request not found: {0}")]
    RequestNotFound(String),

    #[error("A {analysis_type} analysis is already running for room {room_id}")]
    Conflict {
        room_id: String,
        analysis_type: AnalysisType,
        /// The request already in flight
        request_id: String,
    },

    #[error("Storage error: {0}")]
    Storage(#[source] StoreError),
}

impl From<StoreError> for AnalysisError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(id) => AnalysisError::NotFound(id),
            other => AnalysisError::Storage(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
