//! LMDB implementation of VoteStore.
//!
//! Key format: `proposal_id (u64 BE) ++ voter.as_bytes()`. A prefix scan on
//! the proposal id yields that proposal's whole ledger.

use agora_store::{StoreError, VoteStore};
use agora_types::{Address, ProposalId};

use crate::store::{vote_key, LmdbGovernanceStore};
use crate::LmdbError;

impl VoteStore for LmdbGovernanceStore {
    fn insert_vote(
        &self,
        proposal: ProposalId,
        voter: &Address,
        data: &[u8],
    ) -> Result<(), StoreError> {
        let key = vote_key(proposal, voter);
        // LMDB allows one write transaction at a time, so check-then-put
        // inside it cannot race another insert.
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        if self
            .votes_db
            .get(&wtxn, &key)
            .map_err(LmdbError::from)?
            .is_some()
        {
            return Err(LmdbError::Duplicate(format!("vote {proposal}/{voter}")).into());
        }
        self.votes_db
            .put(&mut wtxn, &key, data)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn get_vote(
        &self,
        proposal: ProposalId,
        voter: &Address,
    ) -> Result<Option<Vec<u8>>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let val = self
            .votes_db
            .get(&rtxn, &vote_key(proposal, voter))
            .map_err(LmdbError::from)?;
        Ok(val.map(<[u8]>::to_vec))
    }

    fn get_votes(&self, proposal: ProposalId) -> Result<Vec<Vec<u8>>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let rows = self.scan_prefix(&rtxn, self.votes_db, &proposal.to_key())?;
        Ok(rows.into_iter().map(|(_, val)| val).collect())
    }

    fn iter_votes(&self) -> Result<Vec<Vec<u8>>, StoreError> {
        Ok(self.scan_all(self.votes_db)?)
    }

    fn vote_count(&self) -> Result<u64, StoreError> {
        Ok(self.count(self.votes_db)?)
    }
}
