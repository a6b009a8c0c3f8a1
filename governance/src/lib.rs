//! DAO governance for the Agora engine.
//!
//! Lifecycle: Draft → Active → {Succeeded, Defeated}; Succeeded → Queued → Executed.
//! Draft and Active proposals may be cancelled by their proposer.
//!
//! Key principles:
//! - Vote weight is token-weighted and frozen in a per-proposal balance snapshot.
//! - One vote per (proposal, voter), enforced atomically per proposal.
//! - Time-driven transitions happen only in [`GovernanceEngine::tick`]; reads never mutate.
//! - Treasury balances are a cache over an append-only entry history.

mod codec;

pub mod balance;
pub mod engine;
pub mod error;
pub mod locks;
pub mod outcome;
pub mod proposal;
pub mod snapshot;
pub mod stats;
pub mod treasury;
pub mod vote;

pub use balance::{BalanceProvider, DeadlineBalanceProvider, ProviderError};
pub use engine::{GovernanceEngine, TickReport};
pub use error::GovernanceError;
pub use outcome::{evaluate, Outcome};
pub use proposal::{Action, Proposal, ProposalData, ProposalState, ProposalType, StateTransition};
pub use snapshot::VoteSnapshot;
pub use stats::{rank_holders, GovernanceStats, VotingPower};
pub use treasury::{
    Direction, PendingEntry, ReconciliationReport, TreasuryBalance, TreasuryEntry, TreasuryLedger,
};
pub use vote::{Vote, VoteOption, VoteTally};
