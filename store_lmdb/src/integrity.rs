//! LMDB database integrity checks.
//!
//! Run on startup to detect corruption early, before the node begins
//! ticking proposals. Only structural checks live here; the governance
//! layer separately reconciles treasury balances against their history.

use std::path::Path;

use heed::types::Bytes;

use crate::environment::LmdbEnvironment;
use crate::store::decode_amount;
use crate::LmdbError;

/// Summary of an integrity check run.
#[derive(Debug)]
pub struct IntegrityReport {
    pub databases_checked: u32,
    pub total_entries: u64,
    pub errors: Vec<String>,
}

impl IntegrityReport {
    /// Returns `true` if no errors were detected.
    pub fn is_healthy(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Database names that we expect to exist in a valid Agora LMDB environment.
const EXPECTED_DATABASES: &[&str] = &[
    "proposals",
    "votes",
    "snapshots",
    "treasury_entries",
    "treasury_by_proposal",
    "treasury_balances",
    "meta",
];

/// Check LMDB database integrity on startup.
///
/// Counts every expected database, then verifies key and value shapes and
/// that every treasury index row points at an existing entry. Problems are
/// recorded in the report rather than causing a hard error.
pub fn check_integrity(env: &LmdbEnvironment) -> Result<IntegrityReport, LmdbError> {
    let mut report = IntegrityReport {
        databases_checked: 0,
        total_entries: 0,
        errors: Vec::new(),
    };

    let rtxn = env.env().read_txn()?;

    for &db_name in EXPECTED_DATABASES {
        match env.env().open_database::<Bytes, Bytes>(&rtxn, Some(db_name)) {
            Ok(Some(db)) => {
                report.databases_checked += 1;
                match db.len(&rtxn) {
                    Ok(count) => report.total_entries += count,
                    Err(e) => report
                        .errors
                        .push(format!("failed to read database '{}': {}", db_name, e)),
                }
            }
            Ok(None) => report
                .errors
                .push(format!("database '{}' is missing", db_name)),
            Err(e) => report
                .errors
                .push(format!("failed to open database '{}': {}", db_name, e)),
        }
    }

    for item in env.proposals_db.iter(&rtxn)? {
        let (key, _) = item?;
        if key.len() != 8 {
            report
                .errors
                .push(format!("proposal key of {} bytes", key.len()));
        }
    }

    for item in env.votes_db.iter(&rtxn)? {
        let (key, _) = item?;
        if key.len() <= 8 {
            report.errors.push(format!("vote key of {} bytes", key.len()));
        } else if env.proposals_db.get(&rtxn, &key[..8])?.is_none() {
            report
                .errors
                .push("vote recorded for a missing proposal".to_string());
        }
    }

    for item in env.treasury_by_proposal_db.iter(&rtxn)? {
        let (key, _) = item?;
        if key.len() != 16 {
            report
                .errors
                .push(format!("treasury index key of {} bytes", key.len()));
        } else if env.treasury_entries_db.get(&rtxn, &key[8..])?.is_none() {
            report
                .errors
                .push("treasury index points at a missing entry".to_string());
        }
    }

    for item in env.treasury_balances_db.iter(&rtxn)? {
        let (key, val) = item?;
        if let Err(e) = decode_amount(val) {
            report
                .errors
                .push(format!("balance of {}: {e}", String::from_utf8_lossy(key)));
        }
    }

    if !report.is_healthy() {
        tracing::error!(errors = ?report.errors, "LMDB integrity check failed");
    }
    Ok(report)
}

/// Check if the LMDB data directory looks valid before opening.
///
/// Returns `Ok(())` for a fresh (nonexistent) directory. Returns an error
/// if the directory exists but `data.mdb` is missing, which suggests
/// corruption or misconfiguration.
pub fn check_data_dir(path: &Path) -> Result<(), String> {
    if !path.exists() {
        return Ok(()); // Fresh start
    }
    let is_empty = path
        .read_dir()
        .map(|mut entries| entries.next().is_none())
        .unwrap_or(false);
    if is_empty {
        return Ok(());
    }
    let data_file = path.join("data.mdb");
    if !data_file.exists() {
        return Err(format!(
            "LMDB directory exists but data.mdb is missing at {}",
            path.display()
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_data_dir_fresh_path() {
        let result = check_data_dir(Path::new("/tmp/agora_test_nonexistent_12345"));
        assert!(result.is_ok());
    }

    #[test]
    fn check_data_dir_without_data_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("stray"), b"x").unwrap();
        assert!(check_data_dir(dir.path()).is_err());
    }

    #[test]
    fn healthy_report() {
        let report = IntegrityReport {
            databases_checked: 7,
            total_entries: 100,
            errors: Vec::new(),
        };
        assert!(report.is_healthy());
    }

    #[test]
    fn unhealthy_report() {
        let report = IntegrityReport {
            databases_checked: 7,
            total_entries: 100,
            errors: vec!["corruption detected".to_string()],
        };
        assert!(!report.is_healthy());
    }
}
