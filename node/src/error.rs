use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("governance error: {0}")]
    Governance(#[from] agora_governance::GovernanceError),

    #[error("store error: {0}")]
    Store(#[from] agora_store::StoreError),

    #[error("LMDB error: {0}")]
    Lmdb(#[from] agora_store_lmdb::LmdbError),

    #[error("config error: {0}")]
    Config(String),

    #[error("integrity check failed: {0}")]
    Integrity(String),

    #[error("metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("shutdown timeout")]
    ShutdownTimeout,
}
