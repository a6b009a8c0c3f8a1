//! The LMDB-backed governance store and its key layout.
//!
//! | database               | key                                   | value            |
//! |------------------------|---------------------------------------|------------------|
//! | `proposals`            | proposal id (u64 BE)                  | encoded proposal |
//! | `votes`                | proposal id (u64 BE) ++ voter bytes   | encoded vote     |
//! | `snapshots`            | proposal id (u64 BE)                  | encoded snapshot |
//! | `treasury_entries`     | entry id (u64 BE)                     | encoded entry    |
//! | `treasury_by_proposal` | proposal id (u64 BE) ++ entry id      | empty            |
//! | `treasury_balances`    | token symbol                          | amount (u128 BE) |
//! | `meta`                 | utf-8 name                            | raw bytes        |
//!
//! Big-endian ids keep LMDB's byte order equal to id order.

use std::ops::Bound;
use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env, RoTxn};

use agora_types::{Address, ProposalId, TokenAmount};

use crate::LmdbError;

/// Implements every `agora-store` trait over one LMDB environment.
pub struct LmdbGovernanceStore {
    pub(crate) env: Arc<Env>,
    pub(crate) proposals_db: Database<Bytes, Bytes>,
    pub(crate) votes_db: Database<Bytes, Bytes>,
    pub(crate) snapshots_db: Database<Bytes, Bytes>,
    pub(crate) treasury_entries_db: Database<Bytes, Bytes>,
    pub(crate) treasury_by_proposal_db: Database<Bytes, Bytes>,
    pub(crate) treasury_balances_db: Database<Bytes, Bytes>,
    pub(crate) meta_db: Database<Bytes, Bytes>,
}

impl LmdbGovernanceStore {
    /// Values of every key in `db` starting with `prefix`, in key order.
    pub(crate) fn scan_prefix(
        &self,
        rtxn: &RoTxn,
        db: Database<Bytes, Bytes>,
        prefix: &[u8],
    ) -> Result<Vec<(Vec<u8>, Vec<u8>)>, LmdbError> {
        let mut upper = prefix.to_vec();
        let bounded = increment_prefix(&mut upper);
        let bounds = if bounded {
            (Bound::Included(prefix), Bound::Excluded(upper.as_slice()))
        } else {
            (Bound::Included(prefix), Bound::Unbounded)
        };
        let mut results = Vec::new();
        for item in db.range(rtxn, &bounds)? {
            let (key, val) = item?;
            results.push((key.to_vec(), val.to_vec()));
        }
        Ok(results)
    }

    /// Values of every key in `db`, in key order.
    pub(crate) fn scan_all(
        &self,
        db: Database<Bytes, Bytes>,
    ) -> Result<Vec<Vec<u8>>, LmdbError> {
        let rtxn = self.env.read_txn()?;
        let mut values = Vec::new();
        for item in db.iter(&rtxn)? {
            let (_key, val) = item?;
            values.push(val.to_vec());
        }
        Ok(values)
    }

    pub(crate) fn count(&self, db: Database<Bytes, Bytes>) -> Result<u64, LmdbError> {
        let rtxn = self.env.read_txn()?;
        Ok(db.len(&rtxn)?)
    }
}

/// Composite key `proposal ++ voter`.
pub(crate) fn vote_key(proposal: ProposalId, voter: &Address) -> Vec<u8> {
    let voter = voter.as_str().as_bytes();
    let mut key = Vec::with_capacity(8 + voter.len());
    key.extend_from_slice(&proposal.to_key());
    key.extend_from_slice(voter);
    key
}

/// Composite key `proposal ++ entry`.
pub(crate) fn proposal_entry_key(proposal: ProposalId, entry: &[u8; 8]) -> [u8; 16] {
    let mut key = [0u8; 16];
    key[..8].copy_from_slice(&proposal.to_key());
    key[8..].copy_from_slice(entry);
    key
}

pub(crate) fn decode_amount(bytes: &[u8]) -> Result<TokenAmount, LmdbError> {
    let arr: [u8; 16] = bytes
        .try_into()
        .map_err(|_| LmdbError::Malformed("invalid treasury balance length".into()))?;
    Ok(TokenAmount::new(u128::from_be_bytes(arr)))
}

pub(crate) fn decode_u64(bytes: &[u8], what: &str) -> Result<u64, LmdbError> {
    let arr: [u8; 8] = bytes
        .try_into()
        .map_err(|_| LmdbError::Malformed(format!("{what} has unexpected byte length")))?;
    Ok(u64::from_be_bytes(arr))
}

/// Turn `prefix` into the smallest key greater than every key it prefixes.
///
/// Returns false when no such key exists (the prefix is all `0xFF`).
pub(crate) fn increment_prefix(prefix: &mut Vec<u8>) -> bool {
    while let Some(last) = prefix.pop() {
        if last < u8::MAX {
            prefix.push(last + 1);
            return true;
        }
    }
    false
}
