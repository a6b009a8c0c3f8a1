//! Proposal storage trait.

use crate::StoreError;
use agora_types::ProposalId;

/// Trait for storing encoded proposal records.
pub trait ProposalStore {
    /// Insert or overwrite a proposal.
    fn put_proposal(&self, id: ProposalId, data: &[u8]) -> Result<(), StoreError>;

    /// Get a proposal by id.
    fn get_proposal(&self, id: ProposalId) -> Result<Option<Vec<u8>>, StoreError>;

    /// All proposals in ascending id order.
    fn iter_proposals(&self) -> Result<Vec<Vec<u8>>, StoreError>;

    fn proposal_count(&self) -> Result<u64, StoreError>;
}
