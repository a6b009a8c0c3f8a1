//! Schema versioning for the governance databases.
//!
//! The version lives in the `meta` database. Every upgrade step moves the
//! schema forward by exactly one version; a database stamped by a newer
//! release is refused rather than guessed at.

use std::cmp::Ordering;

use agora_store::MetaStore;

use crate::LmdbError;

/// Schema version written by this release.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

/// What [`Migrator::run`] found and did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaStatus {
    /// Empty environment, stamped with the current version.
    Initialised,
    /// Already at the current version; nothing written.
    Current,
    /// Upgraded step by step from an older version.
    Upgraded { from: u32 },
}

pub struct Migrator;

impl Migrator {
    /// Bring the stored schema to [`CURRENT_SCHEMA_VERSION`].
    pub fn run(meta: &impl MetaStore) -> Result<SchemaStatus, LmdbError> {
        let stored = meta.get_schema_version()?;
        match stored.cmp(&CURRENT_SCHEMA_VERSION) {
            Ordering::Equal => {
                tracing::debug!(version = stored, "governance schema is current");
                Ok(SchemaStatus::Current)
            }
            Ordering::Greater => Err(LmdbError::Schema(format!(
                "data written by schema v{stored}, this release understands up to v{CURRENT_SCHEMA_VERSION}"
            ))),
            Ordering::Less => {
                for version in stored..CURRENT_SCHEMA_VERSION {
                    upgrade_from(version)?;
                    tracing::info!(from = version, to = version + 1, "governance schema upgraded");
                }
                meta.set_schema_version(CURRENT_SCHEMA_VERSION)?;
                Ok(if stored == 0 {
                    SchemaStatus::Initialised
                } else {
                    SchemaStatus::Upgraded { from: stored }
                })
            }
        }
    }
}

/// One step `version → version + 1`.
fn upgrade_from(version: u32) -> Result<(), LmdbError> {
    match version {
        // v1 databases are created by `LmdbEnvironment::open`.
        0 => Ok(()),
        other => Err(LmdbError::Schema(format!("no upgrade path from v{other}"))),
    }
}
