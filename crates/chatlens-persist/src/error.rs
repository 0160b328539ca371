use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Room not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Storage fault: {0}")]
    StorageFault(String),

    #[cfg(feature = "mongodb")]
    #[error("Database error: {0}")]
    Database(#[from] mongodb::error::Error),

    #[cfg(feature = "mongodb")]
    #[error("BSON serialization error: {0}")]
    BsonSerialization(#[from] bson::ser::Error),

    #[cfg(feature = "mongodb")]
    #[error("BSON deserialization error: {0}")]
    BsonDeserialization(#[from] bson::de::Error),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }

    /// Backend failures, as opposed to caller mistakes or absent rooms
    pub fn is_storage_fault(&self) -> bool {
        !matches!(self, StoreError::NotFound(_) | StoreError::InvalidInput(_))
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
