//! Agora governance node: wires storage, balances and the governance engine
//! together and drives the engine from a background scheduler.
//!
//! The node:
//! - Opens storage (LMDB or in-memory) and checks it before use
//! - Builds the balance provider with a per-query deadline
//! - Ticks the governance engine on a fixed interval
//! - Exports Prometheus metrics
//! - Shuts down gracefully on SIGINT/SIGTERM

pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod node;
pub mod provider;
pub mod scheduler;
pub mod shutdown;
pub mod tracing_spans;

pub use config::{
    HolderConfig, NodeConfig, ParamsConfig, ParamsPreset, StorageBackend, METRICS_FILE,
};
pub use error::NodeError;
pub use logging::{init_logging, LogFormat};
pub use metrics::GovernanceMetrics;
pub use node::AgoraNode;
pub use provider::StaticBalanceProvider;
pub use scheduler::Scheduler;
pub use shutdown::{ShutdownController, ShutdownReason};
