//! Treasury ledger storage trait.

use crate::StoreError;
use agora_types::{EntryId, ProposalId, Timestamp, Token, TokenAmount};

/// One encoded ledger entry plus the keys the store indexes it by.
#[derive(Clone, Debug)]
pub struct TreasuryRecord {
    pub id: EntryId,
    /// Originating proposal, indexed so execution can be made idempotent.
    pub proposal: Option<ProposalId>,
    pub data: Vec<u8>,
}

/// Append-only treasury history plus the cached per-token balances.
pub trait TreasuryStore {
    /// Append `records` and overwrite the listed balances in a single atomic write.
    ///
    /// Fails with [`StoreError::Duplicate`] (and writes nothing) if any entry id
    /// already exists.
    fn append_entries(
        &self,
        records: &[TreasuryRecord],
        balances: &[(Token, TokenAmount)],
        updated_at: Timestamp,
    ) -> Result<(), StoreError>;

    /// All entries in ascending id order.
    fn get_entries(&self) -> Result<Vec<Vec<u8>>, StoreError>;

    /// Entries tagged with the given proposal, in ascending id order.
    fn get_entries_for_proposal(&self, proposal: ProposalId) -> Result<Vec<Vec<u8>>, StoreError>;

    /// Cached balance of one token (zero if the token never moved).
    fn get_balance(&self, token: &Token) -> Result<TokenAmount, StoreError>;

    /// Every cached balance, ordered by token.
    fn get_balances(&self) -> Result<Vec<(Token, TokenAmount)>, StoreError>;

    /// Time of the last successful append.
    fn last_updated(&self) -> Result<Option<Timestamp>, StoreError>;

    fn entry_count(&self) -> Result<u64, StoreError>;
}
