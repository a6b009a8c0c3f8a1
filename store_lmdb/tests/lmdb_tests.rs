//! Round-trip and durability tests for the LMDB governance store.

use agora_store::{
    MetaStore, ProposalStore, SnapshotStore, StoreError, TreasuryRecord, TreasuryStore, VoteStore,
};
use agora_store_lmdb::{
    check_integrity, LmdbEnvironment, LmdbError, Migrator, SchemaStatus, CURRENT_SCHEMA_VERSION,
};
use agora_types::{Address, EntryId, ProposalId, Timestamp, Token, TokenAmount};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn temp_env() -> (tempfile::TempDir, LmdbEnvironment) {
    let dir = tempfile::tempdir().expect("temp dir");
    let env = LmdbEnvironment::open(dir.path(), 8, 16 * 1024 * 1024).expect("open env");
    (dir, env)
}

fn record(id: u64, proposal: Option<u64>) -> TreasuryRecord {
    TreasuryRecord {
        id: EntryId::new(id),
        proposal: proposal.map(ProposalId::new),
        data: format!("entry-{id}").into_bytes(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
fn proposals_iterate_in_id_order() {
    let (_dir, env) = temp_env();
    let store = env.governance_store();
    for id in [300u64, 2, 17] {
        store
            .put_proposal(ProposalId::new(id), id.to_string().as_bytes())
            .unwrap();
    }
    store.put_proposal(ProposalId::new(2), b"2-updated").unwrap();

    let all = store.iter_proposals().unwrap();
    assert_eq!(all, vec![b"2-updated".to_vec(), b"17".to_vec(), b"300".to_vec()]);
    assert_eq!(store.proposal_count().unwrap(), 3);
    assert!(store.get_proposal(ProposalId::new(4)).unwrap().is_none());
}

#[test]
fn votes_are_unique_per_voter_and_scoped_per_proposal() {
    let (_dir, env) = temp_env();
    let store = env.governance_store();
    let p1 = ProposalId::new(1);
    let p2 = ProposalId::new(2);
    let alice = Address::new("0xalice");
    let bob = Address::new("0xbob");

    store.insert_vote(p1, &alice, b"a1").unwrap();
    store.insert_vote(p1, &bob, b"b1").unwrap();
    store.insert_vote(p2, &alice, b"a2").unwrap();

    assert!(matches!(
        store.insert_vote(p1, &alice, b"again"),
        Err(StoreError::Duplicate(_))
    ));
    assert_eq!(store.get_vote(p1, &alice).unwrap().unwrap(), b"a1".to_vec());
    assert_eq!(store.get_votes(p1).unwrap().len(), 2);
    assert_eq!(store.get_votes(p2).unwrap(), vec![b"a2".to_vec()]);
    assert!(store.get_votes(ProposalId::new(3)).unwrap().is_empty());
    assert_eq!(store.vote_count().unwrap(), 3);
}

#[test]
fn snapshot_first_write_wins() {
    let (_dir, env) = temp_env();
    let store = env.governance_store();
    let id = ProposalId::new(5);
    assert_eq!(store.put_snapshot_if_absent(id, b"one").unwrap(), b"one".to_vec());
    assert_eq!(store.put_snapshot_if_absent(id, b"two").unwrap(), b"one".to_vec());
    assert_eq!(store.get_snapshot(id).unwrap().unwrap(), b"one".to_vec());
    assert_eq!(store.snapshot_count().unwrap(), 1);
}

#[test]
fn treasury_append_is_atomic() {
    let (_dir, env) = temp_env();
    let store = env.governance_store();
    let eth = Token::new("ETH");
    let usdc = Token::new("USDC");

    store
        .append_entries(
            &[record(1, None), record(2, Some(9))],
            &[(eth.clone(), TokenAmount::new(500)), (usdc.clone(), TokenAmount::new(7))],
            Timestamp::new(100),
        )
        .unwrap();

    // Entry 2 already exists, so nothing of this batch may land.
    let err = store
        .append_entries(
            &[record(3, Some(9)), record(2, None)],
            &[(eth.clone(), TokenAmount::new(1))],
            Timestamp::new(200),
        )
        .unwrap_err();
    assert!(matches!(err, StoreError::Duplicate(_)));

    assert_eq!(store.entry_count().unwrap(), 2);
    assert_eq!(store.get_balance(&eth).unwrap(), TokenAmount::new(500));
    assert_eq!(store.get_balance(&Token::new("DAO")).unwrap(), TokenAmount::ZERO);
    assert_eq!(store.last_updated().unwrap(), Some(Timestamp::new(100)));
    assert_eq!(
        store.get_entries_for_proposal(ProposalId::new(9)).unwrap(),
        vec![b"entry-2".to_vec()]
    );
    assert_eq!(
        store.get_balances().unwrap(),
        vec![(eth, TokenAmount::new(500)), (usdc, TokenAmount::new(7))]
    );
}

#[test]
fn data_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    {
        let env = LmdbEnvironment::open_default(dir.path()).unwrap();
        let store = env.governance_store();
        assert_eq!(store.next_sequence("proposal").unwrap(), 1);
        assert_eq!(store.next_sequence("proposal").unwrap(), 2);
        store.put_proposal(ProposalId::new(1), b"p1").unwrap();
        store
            .append_entries(
                &[record(1, None)],
                &[(Token::new("ETH"), TokenAmount::new(42))],
                Timestamp::new(9),
            )
            .unwrap();
        env.sync().unwrap();
    }

    let env = LmdbEnvironment::open_default(dir.path()).unwrap();
    let store = env.governance_store();
    assert_eq!(store.next_sequence("proposal").unwrap(), 3);
    assert_eq!(store.next_sequence("vote").unwrap(), 1);
    assert_eq!(store.get_proposal(ProposalId::new(1)).unwrap().unwrap(), b"p1".to_vec());
    assert_eq!(
        store.get_balance(&Token::new("ETH")).unwrap(),
        TokenAmount::new(42)
    );
}

#[test]
fn migrator_stamps_fresh_database() {
    let (_dir, env) = temp_env();
    let store = env.governance_store();
    assert_eq!(store.get_schema_version().unwrap(), 0);
    assert_eq!(Migrator::run(&store).unwrap(), SchemaStatus::Initialised);
    assert_eq!(store.get_schema_version().unwrap(), CURRENT_SCHEMA_VERSION);
    assert_eq!(Migrator::run(&store).unwrap(), SchemaStatus::Current);
}

#[test]
fn migrator_refuses_newer_schema() {
    let (_dir, env) = temp_env();
    let store = env.governance_store();
    store.set_schema_version(CURRENT_SCHEMA_VERSION + 1).unwrap();
    assert!(matches!(Migrator::run(&store), Err(LmdbError::Schema(_))));
}

#[test]
fn integrity_check_passes_on_consistent_data() {
    let (_dir, env) = temp_env();
    let store = env.governance_store();
    store.put_proposal(ProposalId::new(1), b"p").unwrap();
    store
        .insert_vote(ProposalId::new(1), &Address::new("0xv"), b"v")
        .unwrap();
    store
        .append_entries(
            &[record(1, Some(1))],
            &[(Token::new("ETH"), TokenAmount::new(1))],
            Timestamp::new(1),
        )
        .unwrap();

    let report = check_integrity(&env).unwrap();
    assert!(report.is_healthy(), "{:?}", report.errors);
    assert_eq!(report.databases_checked, 7);
}

#[test]
fn integrity_check_flags_orphan_votes() {
    let (_dir, env) = temp_env();
    let store = env.governance_store();
    store
        .insert_vote(ProposalId::new(77), &Address::new("0xv"), b"v")
        .unwrap();
    let report = check_integrity(&env).unwrap();
    assert!(!report.is_healthy());
}
