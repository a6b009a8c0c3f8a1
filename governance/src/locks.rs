//! Per-proposal mutual exclusion.

use std::collections::HashMap;
use std::sync::Arc;

use agora_types::ProposalId;
use parking_lot::Mutex;

/// Lock table handing out one mutex per proposal.
///
/// Every mutation of a proposal (vote, tick transition, execution,
/// cancellation) runs while holding that proposal's mutex, so the
/// read-check-write sequences of different callers never interleave.
#[derive(Default)]
pub struct ProposalLocks {
    table: Mutex<HashMap<ProposalId, Arc<Mutex<()>>>>,
}

impl ProposalLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// The mutex guarding `id`, created on first use.
    pub fn get(&self, id: ProposalId) -> Arc<Mutex<()>> {
        Arc::clone(self.table.lock().entry(id).or_default())
    }

    /// Drop the table entry of a proposal that reached a terminal state.
    ///
    /// Only valid once the terminal state is persisted: from then on every
    /// operation on the proposal is a read or a no-op, so a caller still
    /// holding the old mutex cannot conflict with one using a fresh mutex.
    pub fn forget(&self, id: ProposalId) {
        self.table.lock().remove(&id);
    }

    pub fn len(&self) -> usize {
        self.table.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_id_shares_mutex() {
        let locks = ProposalLocks::new();
        let a = locks.get(ProposalId::new(1));
        let b = locks.get(ProposalId::new(1));
        assert!(Arc::ptr_eq(&a, &b));
        let c = locks.get(ProposalId::new(2));
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(locks.len(), 2);
    }

    #[test]
    fn forget_removes_entry() {
        let locks = ProposalLocks::new();
        let _ = locks.get(ProposalId::new(7));
        locks.forget(ProposalId::new(7));
        assert!(locks.is_empty());
    }

    #[test]
    fn held_lock_blocks_second_try() {
        let locks = ProposalLocks::new();
        let lock = locks.get(ProposalId::new(1));
        let _guard = lock.lock();
        assert!(locks.get(ProposalId::new(1)).try_lock().is_none());
    }
}
