//! LMDB implementation of ProposalStore.

use agora_store::{ProposalStore, StoreError};
use agora_types::ProposalId;

use crate::store::LmdbGovernanceStore;
use crate::LmdbError;

impl ProposalStore for LmdbGovernanceStore {
    fn put_proposal(&self, id: ProposalId, data: &[u8]) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        self.proposals_db
            .put(&mut wtxn, &id.to_key(), data)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn get_proposal(&self, id: ProposalId) -> Result<Option<Vec<u8>>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let val = self
            .proposals_db
            .get(&rtxn, &id.to_key())
            .map_err(LmdbError::from)?;
        Ok(val.map(<[u8]>::to_vec))
    }

    fn iter_proposals(&self) -> Result<Vec<Vec<u8>>, StoreError> {
        Ok(self.scan_all(self.proposals_db)?)
    }

    fn proposal_count(&self) -> Result<u64, StoreError> {
        Ok(self.count(self.proposals_db)?)
    }
}
