use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    /// A unit of work lost an optimistic race. Retryable.
    #[error("Concurrent write conflict on {table}/{key}")]
    ConcurrencyConflict { table: &'static str, key: String },
    #[error("Failed to generate ID for prefix {prefix}: {source}")]
    IdGenerationFailed {
        prefix: String,
        #[source]
        source: Box<StoreError>,
    },
    #[error("Cart for user {0} is empty")]
    EmptyCart(String),
    #[error("Failed to create order for user {user_id}: {source}")]
    OrderCreationFailed {
        user_id: String,
        #[source]
        source: Box<StoreError>,
    },
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },
    #[error("Insufficient stock for variant {variant_id}: requested {requested}, available {available}")]
    InsufficientStock {
        variant_id: String,
        requested: u32,
        available: u32,
    },
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),
    #[error("Storage error: {0}")]
    StorageError(String),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[cfg(feature = "storage-rocksdb")]
    #[error("RocksDB error: {0}")]
    RocksDbError(#[from] rocksdb::Error),
}

impl StoreError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::ConcurrencyConflict { .. })
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
