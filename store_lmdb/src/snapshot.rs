//! LMDB implementation of SnapshotStore.

use agora_store::{SnapshotStore, StoreError};
use agora_types::ProposalId;

use crate::store::LmdbGovernanceStore;
use crate::LmdbError;

impl SnapshotStore for LmdbGovernanceStore {
    fn put_snapshot_if_absent(
        &self,
        proposal: ProposalId,
        data: &[u8],
    ) -> Result<Vec<u8>, StoreError> {
        let key = proposal.to_key();
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        if let Some(existing) = self
            .snapshots_db
            .get(&wtxn, &key)
            .map_err(LmdbError::from)?
        {
            let existing = existing.to_vec();
            tracing::debug!(proposal = %proposal, "snapshot already stored");
            return Ok(existing);
        }
        self.snapshots_db
            .put(&mut wtxn, &key, data)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(data.to_vec())
    }

    fn get_snapshot(&self, proposal: ProposalId) -> Result<Option<Vec<u8>>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let val = self
            .snapshots_db
            .get(&rtxn, &proposal.to_key())
            .map_err(LmdbError::from)?;
        Ok(val.map(<[u8]>::to_vec))
    }

    fn snapshot_count(&self) -> Result<u64, StoreError> {
        Ok(self.count(self.snapshots_db)?)
    }
}
