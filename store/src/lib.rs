//! Abstract storage traits for the Agora governance engine.
//!
//! Every storage backend (LMDB, in-memory for testing) implements these
//! traits. The governance engine depends only on the traits and stores its
//! records as opaque encoded bytes; the store is responsible for keys,
//! uniqueness constraints and atomicity of each single call.

pub mod error;
pub mod meta;
pub mod proposal;
pub mod snapshot;
pub mod treasury;
pub mod vote;

pub use error::StoreError;
pub use meta::MetaStore;
pub use proposal::ProposalStore;
pub use snapshot::SnapshotStore;
pub use treasury::{TreasuryRecord, TreasuryStore};
pub use vote::VoteStore;

/// Everything the governance engine needs from persistence.
///
/// Implemented automatically for any type that implements all the
/// individual stores and can be shared across threads.
pub trait GovernanceStore:
    ProposalStore + VoteStore + SnapshotStore + TreasuryStore + MetaStore + Send + Sync
{
}

impl<T> GovernanceStore for T where
    T: ProposalStore + VoteStore + SnapshotStore + TreasuryStore + MetaStore + Send + Sync
{
}
