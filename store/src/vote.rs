//! Vote ledger storage trait.

use crate::StoreError;
use agora_types::{Address, ProposalId};

/// Append-only vote ledger keyed by `(proposal, voter)`.
pub trait VoteStore {
    /// Insert a vote.
    ///
    /// Fails with [`StoreError::Duplicate`] if a vote for `(proposal, voter)`
    /// already exists; the existence check and the insert are one atomic step.
    fn insert_vote(
        &self,
        proposal: ProposalId,
        voter: &Address,
        data: &[u8],
    ) -> Result<(), StoreError>;

    /// Get a specific voter's vote on a proposal.
    fn get_vote(&self, proposal: ProposalId, voter: &Address)
        -> Result<Option<Vec<u8>>, StoreError>;

    /// Get all votes for a proposal.
    fn get_votes(&self, proposal: ProposalId) -> Result<Vec<Vec<u8>>, StoreError>;

    /// Every vote in the ledger.
    fn iter_votes(&self) -> Result<Vec<Vec<u8>>, StoreError>;

    fn vote_count(&self) -> Result<u64, StoreError>;
}
