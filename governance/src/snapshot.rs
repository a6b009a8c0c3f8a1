//! Point-in-time voting-weight snapshots.

use std::collections::BTreeMap;

use agora_types::{Address, ProposalId, Timestamp, TokenAmount};
use serde::{Deserialize, Serialize};

use crate::balance::{BalanceProvider, ProviderError};

/// Frozen governance-token balances for one proposal.
///
/// Written once per proposal and never replaced; every vote weight and the
/// quorum denominator come from here.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteSnapshot {
    pub proposal_id: ProposalId,
    /// Point in time the balances describe (the proposal's `start_time`).
    pub as_of: Timestamp,
    /// Clock time at which the snapshot was materialised.
    pub taken_at: Timestamp,
    pub total_supply: TokenAmount,
    pub balances: BTreeMap<Address, TokenAmount>,
}

impl VoteSnapshot {
    /// Query the provider for every holder as of `as_of`.
    pub fn capture(
        proposal_id: ProposalId,
        as_of: Timestamp,
        taken_at: Timestamp,
        provider: &dyn BalanceProvider,
    ) -> Result<Self, ProviderError> {
        let holders = provider.holders(Some(as_of))?;
        let reported_supply = provider.total_supply(Some(as_of))?;

        let balances: BTreeMap<Address, TokenAmount> = holders
            .into_iter()
            .filter(|(_, balance)| !balance.is_zero())
            .collect();
        let held: TokenAmount = balances.values().copied().sum();

        Ok(Self {
            proposal_id,
            as_of,
            taken_at,
            // Participation can never exceed 100% of the denominator.
            total_supply: reported_supply.max(held),
            balances,
        })
    }

    pub fn balance_of(&self, address: &Address) -> TokenAmount {
        self.balances.get(address).copied().unwrap_or(TokenAmount::ZERO)
    }

    pub fn holder_count(&self) -> usize {
        self.balances.len()
    }
}
