//! Treasury ledger: per-token balances over an append-only entry history.
//!
//! [`TreasuryLedger::apply_batch`] is the only mutator. Entries and the
//! resulting balances are handed to the store in a single atomic write, so
//! `Σ inflows − Σ outflows == balance` holds for every token at all times.

use std::collections::BTreeMap;
use std::sync::Arc;

use agora_store::{GovernanceStore, StoreError, TreasuryRecord};
use agora_types::{EntryId, ProposalId, Timestamp, Token, TokenAmount};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::codec::{decode_all, encode};
use crate::GovernanceError;

const ENTRY_SEQUENCE: &str = "treasury_entry";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Inflow,
    Outflow,
}

/// An immutable ledger row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreasuryEntry {
    pub id: EntryId,
    pub direction: Direction,
    pub amount: TokenAmount,
    pub token: Token,
    pub description: String,
    pub proposal_id: Option<ProposalId>,
    pub timestamp: Timestamp,
}

/// An entry before it is assigned an id and appended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingEntry {
    pub direction: Direction,
    pub amount: TokenAmount,
    pub token: Token,
    pub description: String,
    pub proposal_id: Option<ProposalId>,
}

impl PendingEntry {
    pub fn inflow(amount: TokenAmount, token: Token, description: impl Into<String>) -> Self {
        Self {
            direction: Direction::Inflow,
            amount,
            token,
            description: description.into(),
            proposal_id: None,
        }
    }

    pub fn outflow(
        amount: TokenAmount,
        token: Token,
        description: impl Into<String>,
        proposal_id: ProposalId,
    ) -> Self {
        Self {
            direction: Direction::Outflow,
            amount,
            token,
            description: description.into(),
            proposal_id: Some(proposal_id),
        }
    }
}

/// Current holdings of the treasury.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreasuryBalance {
    pub balances: BTreeMap<Token, TokenAmount>,
    pub last_updated: Option<Timestamp>,
}

impl TreasuryBalance {
    pub fn get(&self, token: &Token) -> TokenAmount {
        self.balances.get(token).copied().unwrap_or(TokenAmount::ZERO)
    }
}

/// Result of recomputing balances from the full history.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReconciliationReport {
    pub entries_checked: u64,
    /// `(token, cached balance, recomputed balance)` for every disagreement.
    pub mismatches: Vec<(Token, TokenAmount, TokenAmount)>,
}

impl ReconciliationReport {
    pub fn is_consistent(&self) -> bool {
        self.mismatches.is_empty()
    }
}

/// Serialising front-end to the treasury part of a [`GovernanceStore`].
pub struct TreasuryLedger {
    store: Arc<dyn GovernanceStore>,
    supported: Vec<Token>,
    /// Serialises appends so balance computation and write are linearizable.
    write_lock: Mutex<()>,
}

impl TreasuryLedger {
    pub fn new(store: Arc<dyn GovernanceStore>, supported: Vec<Token>) -> Self {
        Self {
            store,
            supported,
            write_lock: Mutex::new(()),
        }
    }

    /// Append one entry.
    pub fn apply_entry(
        &self,
        entry: PendingEntry,
        now: Timestamp,
    ) -> Result<TreasuryEntry, GovernanceError> {
        let mut applied = self.apply_batch(vec![entry], now)?;
        applied.pop().ok_or_else(|| {
            GovernanceError::InvalidTreasuryEntry("empty batch".to_string())
        })
    }

    /// Append all entries or none.
    ///
    /// Every entry is validated against the running balances (so two
    /// outflows of the same token must be covered together) before anything
    /// is written.
    pub fn apply_batch(
        &self,
        entries: Vec<PendingEntry>,
        now: Timestamp,
    ) -> Result<Vec<TreasuryEntry>, GovernanceError> {
        if entries.is_empty() {
            return Ok(Vec::new());
        }
        let _guard = self.write_lock.lock();

        let mut running: BTreeMap<Token, TokenAmount> = BTreeMap::new();
        for entry in &entries {
            if !self.supported.contains(&entry.token) {
                return Err(GovernanceError::UnsupportedToken(entry.token.clone()));
            }
            if entry.amount.is_zero() {
                return Err(GovernanceError::InvalidTreasuryEntry(
                    "amount must be positive".to_string(),
                ));
            }
            let current = match running.get(&entry.token) {
                Some(balance) => *balance,
                None => self.store.get_balance(&entry.token)?,
            };
            let next = match entry.direction {
                Direction::Inflow => current.checked_add(entry.amount).ok_or_else(|| {
                    GovernanceError::InvalidTreasuryEntry(format!(
                        "{} balance would overflow",
                        entry.token
                    ))
                })?,
                Direction::Outflow => current.checked_sub(entry.amount).ok_or_else(|| {
                    GovernanceError::InsufficientTreasury {
                        token: entry.token.clone(),
                        needed: entry.amount,
                        available: current,
                    }
                })?,
            };
            running.insert(entry.token.clone(), next);
        }

        let mut applied = Vec::with_capacity(entries.len());
        let mut records = Vec::with_capacity(entries.len());
        for entry in entries {
            let id = EntryId::new(self.store.next_sequence(ENTRY_SEQUENCE)?);
            let row = TreasuryEntry {
                id,
                direction: entry.direction,
                amount: entry.amount,
                token: entry.token,
                description: entry.description,
                proposal_id: entry.proposal_id,
                timestamp: now,
            };
            records.push(TreasuryRecord {
                id,
                proposal: row.proposal_id,
                data: encode(&row)?,
            });
            applied.push(row);
        }
        let balances: Vec<(Token, TokenAmount)> = running.into_iter().collect();
        self.store.append_entries(&records, &balances, now)?;

        for row in &applied {
            tracing::info!(
                entry = %row.id,
                direction = ?row.direction,
                amount = %row.amount,
                token = %row.token,
                proposal = ?row.proposal_id,
                "treasury entry appended"
            );
        }
        Ok(applied)
    }

    pub fn balance(&self) -> Result<TreasuryBalance, GovernanceError> {
        Ok(TreasuryBalance {
            balances: self.store.get_balances()?.into_iter().collect(),
            last_updated: self.store.last_updated()?,
        })
    }

    pub fn history(&self) -> Result<Vec<TreasuryEntry>, GovernanceError> {
        decode_all(self.store.get_entries()?)
    }

    pub fn entries_for_proposal(
        &self,
        id: ProposalId,
    ) -> Result<Vec<TreasuryEntry>, GovernanceError> {
        decode_all(self.store.get_entries_for_proposal(id)?)
    }

    /// Recompute every balance from the history and compare with the cache.
    pub fn reconcile(&self) -> Result<ReconciliationReport, GovernanceError> {
        let _guard = self.write_lock.lock();
        let history = self.history()?;

        let mut inflows: BTreeMap<Token, u128> = BTreeMap::new();
        let mut outflows: BTreeMap<Token, u128> = BTreeMap::new();
        for entry in &history {
            let sums = match entry.direction {
                Direction::Inflow => &mut inflows,
                Direction::Outflow => &mut outflows,
            };
            let sum = sums.entry(entry.token.clone()).or_default();
            *sum = sum.saturating_add(entry.amount.raw());
        }

        let cached: BTreeMap<Token, TokenAmount> = self.store.get_balances()?.into_iter().collect();
        let mut tokens: Vec<&Token> = inflows
            .keys()
            .chain(outflows.keys())
            .chain(cached.keys())
            .collect();
        tokens.sort();
        tokens.dedup();

        let mut report = ReconciliationReport {
            entries_checked: history.len() as u64,
            mismatches: Vec::new(),
        };
        for token in tokens {
            let inflow = inflows.get(token).copied().unwrap_or(0);
            let outflow = outflows.get(token).copied().unwrap_or(0);
            let cached_balance = cached.get(token).copied().unwrap_or(TokenAmount::ZERO);
            let recomputed = match inflow.checked_sub(outflow) {
                Some(v) => TokenAmount::new(v),
                None => {
                    return Err(StoreError::Corruption(format!(
                        "{token} outflows exceed inflows in treasury history"
                    ))
                    .into())
                }
            };
            if recomputed != cached_balance {
                report
                    .mismatches
                    .push((token.clone(), cached_balance, recomputed));
            }
        }
        if !report.is_consistent() {
            tracing::error!(mismatches = ?report.mismatches, "treasury balances disagree with history");
        }
        Ok(report)
    }
}
