//! LMDB environment setup.

use std::path::Path;
use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};

use crate::store::LmdbGovernanceStore;
use crate::LmdbError;

/// Default map size: 1 GiB.
pub const DEFAULT_MAP_SIZE: usize = 1 << 30;

/// Number of named databases the governance schema uses.
pub const GOVERNANCE_DATABASES: u32 = 7;

/// Wraps the LMDB environment and all database handles.
pub struct LmdbEnvironment {
    env: Arc<Env>,
    pub(crate) proposals_db: Database<Bytes, Bytes>,
    pub(crate) votes_db: Database<Bytes, Bytes>,
    pub(crate) snapshots_db: Database<Bytes, Bytes>,
    pub(crate) treasury_entries_db: Database<Bytes, Bytes>,
    pub(crate) treasury_by_proposal_db: Database<Bytes, Bytes>,
    pub(crate) treasury_balances_db: Database<Bytes, Bytes>,
    pub(crate) meta_db: Database<Bytes, Bytes>,
}

impl LmdbEnvironment {
    /// Open or create an LMDB environment at the given path.
    ///
    /// The directory is created if missing; every database the schema needs
    /// is created inside one write transaction.
    pub fn open(path: &Path, max_dbs: u32, map_size: usize) -> Result<Self, LmdbError> {
        std::fs::create_dir_all(path)?;

        // SAFETY: the environment is opened once per path by this process and
        // the memory map is never accessed outside heed.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(map_size)
                .max_dbs(max_dbs.max(GOVERNANCE_DATABASES))
                .open(path)?
        };

        let mut wtxn = env.write_txn()?;
        let proposals_db = env.create_database(&mut wtxn, Some("proposals"))?;
        let votes_db = env.create_database(&mut wtxn, Some("votes"))?;
        let snapshots_db = env.create_database(&mut wtxn, Some("snapshots"))?;
        let treasury_entries_db = env.create_database(&mut wtxn, Some("treasury_entries"))?;
        let treasury_by_proposal_db =
            env.create_database(&mut wtxn, Some("treasury_by_proposal"))?;
        let treasury_balances_db = env.create_database(&mut wtxn, Some("treasury_balances"))?;
        let meta_db = env.create_database(&mut wtxn, Some("meta"))?;
        wtxn.commit()?;

        tracing::info!(path = %path.display(), map_size, "LMDB environment opened");

        Ok(Self {
            env: Arc::new(env),
            proposals_db,
            votes_db,
            snapshots_db,
            treasury_entries_db,
            treasury_by_proposal_db,
            treasury_balances_db,
            meta_db,
        })
    }

    /// Open with the default sizing.
    pub fn open_default(path: &Path) -> Result<Self, LmdbError> {
        Self::open(path, GOVERNANCE_DATABASES, DEFAULT_MAP_SIZE)
    }

    pub fn env(&self) -> &Arc<Env> {
        &self.env
    }

    /// A store implementing every governance storage trait over this environment.
    pub fn governance_store(&self) -> LmdbGovernanceStore {
        LmdbGovernanceStore {
            env: Arc::clone(&self.env),
            proposals_db: self.proposals_db,
            votes_db: self.votes_db,
            snapshots_db: self.snapshots_db,
            treasury_entries_db: self.treasury_entries_db,
            treasury_by_proposal_db: self.treasury_by_proposal_db,
            treasury_balances_db: self.treasury_balances_db,
            meta_db: self.meta_db,
        }
    }

    /// Flush the memory map to disk.
    pub fn sync(&self) -> Result<(), LmdbError> {
        self.env.force_sync()?;
        Ok(())
    }
}
