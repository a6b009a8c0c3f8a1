use agora_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LmdbError {
    #[error("LMDB error: {0}")]
    Heed(String),

    #[error("cannot prepare data directory: {0}")]
    Io(#[from] std::io::Error),

    #[error("already recorded: {0}")]
    Duplicate(String),

    #[error("malformed stored data: {0}")]
    Malformed(String),

    #[error("database is corrupted: {0}")]
    Corruption(String),

    #[error("unsupported schema: {0}")]
    Schema(String),
}

impl From<heed::Error> for LmdbError {
    fn from(e: heed::Error) -> Self {
        LmdbError::Heed(e.to_string())
    }
}

impl From<LmdbError> for StoreError {
    fn from(e: LmdbError) -> Self {
        match e {
            LmdbError::Duplicate(what) => StoreError::Duplicate(what),
            LmdbError::Malformed(msg) => StoreError::Malformed(msg),
            LmdbError::Corruption(msg) | LmdbError::Schema(msg) => StoreError::Corruption(msg),
            LmdbError::Heed(msg) => StoreError::Backend(msg),
            LmdbError::Io(e) => StoreError::Backend(e.to_string()),
        }
    }
}

impl From<StoreError> for LmdbError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Duplicate(what) => LmdbError::Duplicate(what),
            StoreError::Malformed(msg) => LmdbError::Malformed(msg),
            StoreError::Corruption(msg) => LmdbError::Corruption(msg),
            StoreError::Backend(msg) => LmdbError::Heed(msg),
        }
    }
}
