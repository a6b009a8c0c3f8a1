//! LMDB implementation of TreasuryStore.
//!
//! An append writes the entries, their proposal index rows, the new balances
//! and the `treasury_last_updated` marker in one write transaction.

use agora_store::{StoreError, TreasuryRecord, TreasuryStore};
use agora_types::{ProposalId, Timestamp, Token, TokenAmount};

use crate::store::{decode_amount, decode_u64, proposal_entry_key, LmdbGovernanceStore};
use crate::LmdbError;

const LAST_UPDATED_KEY: &[u8] = b"treasury_last_updated";

impl TreasuryStore for LmdbGovernanceStore {
    fn append_entries(
        &self,
        records: &[TreasuryRecord],
        balances: &[(Token, TokenAmount)],
        updated_at: Timestamp,
    ) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        for record in records {
            let key = record.id.to_key();
            if self
                .treasury_entries_db
                .get(&wtxn, &key)
                .map_err(LmdbError::from)?
                .is_some()
            {
                // Dropping the transaction aborts every put made so far.
                return Err(LmdbError::Duplicate(format!("treasury entry {}", record.id)).into());
            }
            self.treasury_entries_db
                .put(&mut wtxn, &key, &record.data)
                .map_err(LmdbError::from)?;
            if let Some(proposal) = record.proposal {
                self.treasury_by_proposal_db
                    .put(&mut wtxn, &proposal_entry_key(proposal, &key), b"")
                    .map_err(LmdbError::from)?;
            }
        }
        for (token, amount) in balances {
            self.treasury_balances_db
                .put(
                    &mut wtxn,
                    token.as_str().as_bytes(),
                    &amount.raw().to_be_bytes(),
                )
                .map_err(LmdbError::from)?;
        }
        self.meta_db
            .put(&mut wtxn, LAST_UPDATED_KEY, &updated_at.as_secs().to_be_bytes())
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn get_entries(&self) -> Result<Vec<Vec<u8>>, StoreError> {
        Ok(self.scan_all(self.treasury_entries_db)?)
    }

    fn get_entries_for_proposal(&self, proposal: ProposalId) -> Result<Vec<Vec<u8>>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let index = self.scan_prefix(&rtxn, self.treasury_by_proposal_db, &proposal.to_key())?;
        let mut entries = Vec::with_capacity(index.len());
        for (key, _) in index {
            let entry_key = &key[8..];
            let data = self
                .treasury_entries_db
                .get(&rtxn, entry_key)
                .map_err(LmdbError::from)?
                .ok_or_else(|| {
                    LmdbError::Corruption(format!(
                        "treasury index for {proposal} points at a missing entry"
                    ))
                })?;
            entries.push(data.to_vec());
        }
        Ok(entries)
    }

    fn get_balance(&self, token: &Token) -> Result<TokenAmount, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        match self
            .treasury_balances_db
            .get(&rtxn, token.as_str().as_bytes())
            .map_err(LmdbError::from)?
        {
            Some(bytes) => Ok(decode_amount(bytes)?),
            None => Ok(TokenAmount::ZERO),
        }
    }

    fn get_balances(&self) -> Result<Vec<(Token, TokenAmount)>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let mut balances = Vec::new();
        for item in self
            .treasury_balances_db
            .iter(&rtxn)
            .map_err(LmdbError::from)?
        {
            let (key, val) = item.map_err(LmdbError::from)?;
            let symbol =
                std::str::from_utf8(key).map_err(|e| LmdbError::Malformed(e.to_string()))?;
            balances.push((Token::new(symbol), decode_amount(val)?));
        }
        Ok(balances)
    }

    fn last_updated(&self) -> Result<Option<Timestamp>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        match self
            .meta_db
            .get(&rtxn, LAST_UPDATED_KEY)
            .map_err(LmdbError::from)?
        {
            Some(bytes) => Ok(Some(Timestamp::new(decode_u64(
                bytes,
                "treasury_last_updated",
            )?))),
            None => Ok(None),
        }
    }

    fn entry_count(&self) -> Result<u64, StoreError> {
        Ok(self.count(self.treasury_entries_db)?)
    }
}
