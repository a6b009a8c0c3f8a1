//! LMDB storage backend for the Agora governance engine.
//!
//! Implements all storage traits from `agora-store` using the `heed` LMDB bindings.
//! Each logical store maps to one or more LMDB databases within a single environment,
//! and [`LmdbGovernanceStore`] implements every trait over those handles.

pub mod environment;
pub mod error;
pub mod integrity;
pub mod meta;
pub mod migration;
pub mod proposal;
pub mod snapshot;
pub mod store;
pub mod treasury;
pub mod vote;

pub use environment::LmdbEnvironment;
pub use error::LmdbError;
pub use integrity::{check_data_dir, check_integrity, IntegrityReport};
pub use migration::{Migrator, SchemaStatus, CURRENT_SCHEMA_VERSION};
pub use store::LmdbGovernanceStore;
