pub mod clock;
pub mod repository;

pub use clock::{Clock, SystemClock};
pub use repository::{PriceRecordRepository, StoredCatalog};

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Storage failure: {0}")]
    StorageError(String),
    #[error("Serialization failed: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[error("I/O failure: {0}")]
    IoError(#[from] std::io::Error),
}

pub type CoreResult<T> = Result<T, CoreError>;
