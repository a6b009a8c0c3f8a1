//! Vote-weight snapshot storage trait.

use crate::StoreError;
use agora_types::ProposalId;

/// Write-once storage of one balance snapshot per proposal.
pub trait SnapshotStore {
    /// Store `data` as the snapshot for `proposal` unless one already exists.
    ///
    /// Returns the bytes that are stored after the call: `data` if this call
    /// created the snapshot, the existing snapshot otherwise. Never overwrites.
    fn put_snapshot_if_absent(
        &self,
        proposal: ProposalId,
        data: &[u8],
    ) -> Result<Vec<u8>, StoreError>;

    fn get_snapshot(&self, proposal: ProposalId) -> Result<Option<Vec<u8>>, StoreError>;

    fn snapshot_count(&self) -> Result<u64, StoreError>;
}
