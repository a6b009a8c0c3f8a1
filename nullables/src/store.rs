//! Nullable store: thread-safe in-memory governance storage for testing.

use std::collections::{BTreeMap, HashMap};

use agora_store::{
    MetaStore, ProposalStore, SnapshotStore, StoreError, TreasuryRecord, TreasuryStore, VoteStore,
};
use agora_types::{Address, EntryId, ProposalId, Timestamp, Token, TokenAmount};
use parking_lot::Mutex;

#[derive(Default)]
struct Treasury {
    entries: BTreeMap<EntryId, TreasuryRecord>,
    balances: BTreeMap<Token, TokenAmount>,
    last_updated: Option<Timestamp>,
}

/// An in-memory implementation of every governance store trait.
///
/// Each trait method takes one lock, so each call is atomic just like a
/// single LMDB write transaction.
#[derive(Default)]
pub struct NullGovernanceStore {
    proposals: Mutex<BTreeMap<ProposalId, Vec<u8>>>,
    votes: Mutex<BTreeMap<ProposalId, BTreeMap<Address, Vec<u8>>>>,
    snapshots: Mutex<HashMap<ProposalId, Vec<u8>>>,
    treasury: Mutex<Treasury>,
    meta: Mutex<HashMap<String, Vec<u8>>>,
    sequences: Mutex<HashMap<String, u64>>,
    fail_writes: Mutex<bool>,
}

impl NullGovernanceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail with a backend error while set.
    pub fn set_fail_writes(&self, fail: bool) {
        *self.fail_writes.lock() = fail;
    }

    /// Overwrite a cached treasury balance without touching the history.
    pub fn corrupt_balance(&self, token: Token, amount: TokenAmount) {
        self.treasury.lock().balances.insert(token, amount);
    }

    fn check_writable(&self) -> Result<(), StoreError> {
        if *self.fail_writes.lock() {
            Err(StoreError::Backend("null store writes disabled".into()))
        } else {
            Ok(())
        }
    }
}

impl MetaStore for NullGovernanceStore {
    fn put_meta(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        self.check_writable()?;
        self.meta.lock().insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn get_meta(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.meta.lock().get(key).cloned())
    }

    fn next_sequence(&self, name: &str) -> Result<u64, StoreError> {
        self.check_writable()?;
        let mut sequences = self.sequences.lock();
        let value = sequences.entry(name.to_string()).or_insert(0);
        *value += 1;
        Ok(*value)
    }

    fn get_schema_version(&self) -> Result<u32, StoreError> {
        match self.get_meta("schema_version")? {
            Some(bytes) => {
                let raw: [u8; 4] = bytes
                    .as_slice()
                    .try_into()
                    .map_err(|_| StoreError::Corruption("schema version".into()))?;
                Ok(u32::from_be_bytes(raw))
            }
            None => Ok(0),
        }
    }

    fn set_schema_version(&self, version: u32) -> Result<(), StoreError> {
        self.put_meta("schema_version", &version.to_be_bytes())
    }
}

impl ProposalStore for NullGovernanceStore {
    fn put_proposal(&self, id: ProposalId, data: &[u8]) -> Result<(), StoreError> {
        self.check_writable()?;
        self.proposals.lock().insert(id, data.to_vec());
        Ok(())
    }

    fn get_proposal(&self, id: ProposalId) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.proposals.lock().get(&id).cloned())
    }

    fn iter_proposals(&self) -> Result<Vec<Vec<u8>>, StoreError> {
        Ok(self.proposals.lock().values().cloned().collect())
    }

    fn proposal_count(&self) -> Result<u64, StoreError> {
        Ok(self.proposals.lock().len() as u64)
    }
}

impl VoteStore for NullGovernanceStore {
    fn insert_vote(
        &self,
        proposal: ProposalId,
        voter: &Address,
        data: &[u8],
    ) -> Result<(), StoreError> {
        self.check_writable()?;
        let mut votes = self.votes.lock();
        let ledger = votes.entry(proposal).or_default();
        if ledger.contains_key(voter) {
            return Err(StoreError::Duplicate(format!("{proposal}/{voter}")));
        }
        ledger.insert(voter.clone(), data.to_vec());
        Ok(())
    }

    fn get_vote(
        &self,
        proposal: ProposalId,
        voter: &Address,
    ) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self
            .votes
            .lock()
            .get(&proposal)
            .and_then(|ledger| ledger.get(voter).cloned()))
    }

    fn get_votes(&self, proposal: ProposalId) -> Result<Vec<Vec<u8>>, StoreError> {
        Ok(self
            .votes
            .lock()
            .get(&proposal)
            .map(|ledger| ledger.values().cloned().collect())
            .unwrap_or_default())
    }

    fn iter_votes(&self) -> Result<Vec<Vec<u8>>, StoreError> {
        Ok(self
            .votes
            .lock()
            .values()
            .flat_map(|ledger| ledger.values().cloned())
            .collect())
    }

    fn vote_count(&self) -> Result<u64, StoreError> {
        Ok(self.votes.lock().values().map(|l| l.len() as u64).sum())
    }
}

impl SnapshotStore for NullGovernanceStore {
    fn put_snapshot_if_absent(
        &self,
        proposal: ProposalId,
        data: &[u8],
    ) -> Result<Vec<u8>, StoreError> {
        self.check_writable()?;
        Ok(self
            .snapshots
            .lock()
            .entry(proposal)
            .or_insert_with(|| data.to_vec())
            .clone())
    }

    fn get_snapshot(&self, proposal: ProposalId) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.snapshots.lock().get(&proposal).cloned())
    }

    fn snapshot_count(&self) -> Result<u64, StoreError> {
        Ok(self.snapshots.lock().len() as u64)
    }
}

impl TreasuryStore for NullGovernanceStore {
    fn append_entries(
        &self,
        records: &[TreasuryRecord],
        balances: &[(Token, TokenAmount)],
        updated_at: Timestamp,
    ) -> Result<(), StoreError> {
        self.check_writable()?;
        let mut treasury = self.treasury.lock();
        if let Some(dup) = records.iter().find(|r| treasury.entries.contains_key(&r.id)) {
            return Err(StoreError::Duplicate(dup.id.to_string()));
        }
        for record in records {
            treasury.entries.insert(record.id, record.clone());
        }
        for (token, amount) in balances {
            treasury.balances.insert(token.clone(), *amount);
        }
        treasury.last_updated = Some(updated_at);
        Ok(())
    }

    fn get_entries(&self) -> Result<Vec<Vec<u8>>, StoreError> {
        Ok(self
            .treasury
            .lock()
            .entries
            .values()
            .map(|r| r.data.clone())
            .collect())
    }

    fn get_entries_for_proposal(&self, proposal: ProposalId) -> Result<Vec<Vec<u8>>, StoreError> {
        Ok(self
            .treasury
            .lock()
            .entries
            .values()
            .filter(|r| r.proposal == Some(proposal))
            .map(|r| r.data.clone())
            .collect())
    }

    fn get_balance(&self, token: &Token) -> Result<TokenAmount, StoreError> {
        Ok(self
            .treasury
            .lock()
            .balances
            .get(token)
            .copied()
            .unwrap_or(TokenAmount::ZERO))
    }

    fn get_balances(&self) -> Result<Vec<(Token, TokenAmount)>, StoreError> {
        Ok(self
            .treasury
            .lock()
            .balances
            .iter()
            .map(|(t, a)| (t.clone(), *a))
            .collect())
    }

    fn last_updated(&self) -> Result<Option<Timestamp>, StoreError> {
        Ok(self.treasury.lock().last_updated)
    }

    fn entry_count(&self) -> Result<u64, StoreError> {
        Ok(self.treasury.lock().entries.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_vote_is_rejected() {
        let store = NullGovernanceStore::new();
        let id = ProposalId::new(1);
        let voter = Address::new("0xv");
        store.insert_vote(id, &voter, b"a").unwrap();
        assert!(matches!(
            store.insert_vote(id, &voter, b"b"),
            Err(StoreError::Duplicate(_))
        ));
        assert_eq!(store.get_vote(id, &voter).unwrap().unwrap(), b"a".to_vec());
    }

    #[test]
    fn snapshot_is_write_once() {
        let store = NullGovernanceStore::new();
        let id = ProposalId::new(7);
        assert_eq!(store.put_snapshot_if_absent(id, b"first").unwrap(), b"first");
        assert_eq!(store.put_snapshot_if_absent(id, b"second").unwrap(), b"first");
    }

    #[test]
    fn sequences_start_at_one_and_are_independent() {
        let store = NullGovernanceStore::new();
        assert_eq!(store.next_sequence("a").unwrap(), 1);
        assert_eq!(store.next_sequence("a").unwrap(), 2);
        assert_eq!(store.next_sequence("b").unwrap(), 1);
    }

    #[test]
    fn append_with_existing_id_writes_nothing() {
        let store = NullGovernanceStore::new();
        let eth = Token::new("ETH");
        let record = |id| TreasuryRecord {
            id: EntryId::new(id),
            proposal: None,
            data: vec![id as u8],
        };
        store
            .append_entries(&[record(1)], &[(eth.clone(), TokenAmount::new(5))], Timestamp::new(1))
            .unwrap();
        let result = store.append_entries(
            &[record(2), record(1)],
            &[(eth.clone(), TokenAmount::new(9))],
            Timestamp::new(2),
        );
        assert!(matches!(result, Err(StoreError::Duplicate(_))));
        assert_eq!(store.entry_count().unwrap(), 1);
        assert_eq!(store.get_balance(&eth).unwrap(), TokenAmount::new(5));
    }
}
