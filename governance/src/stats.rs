//! Read-only governance statistics.

use agora_types::{Address, TokenAmount};
use serde::{Deserialize, Serialize};

use crate::treasury::TreasuryBalance;

/// Aggregate view over proposals, votes and the treasury. Never stored.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GovernanceStats {
    pub total_proposals: u64,
    pub active_proposals: u64,
    pub queued_proposals: u64,
    pub executed_proposals: u64,
    pub defeated_proposals: u64,
    pub cancelled_proposals: u64,
    pub total_votes: u64,
    pub unique_voters: u64,
    /// Current governance-token supply, as reported by the provider now.
    pub total_staked: TokenAmount,
    /// `Σ weight cast / (proposals × total_staked) × 100`.
    ///
    /// The denominator is today's supply, not each proposal's snapshot
    /// supply, so this drifts from per-proposal turnout when supply changes.
    pub average_participation_pct: f64,
    pub treasury: TreasuryBalance,
}

/// Governance weight of one address relative to all holders.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VotingPower {
    pub address: Address,
    pub balance: TokenAmount,
    pub percentage: f64,
    /// 1-based position among holders; `None` without a balance.
    pub rank: Option<u32>,
    pub holders: u32,
}

/// Order holders by balance descending, ties broken by address ascending.
///
/// Zero balances are dropped.
pub fn rank_holders(mut holders: Vec<(Address, TokenAmount)>) -> Vec<(Address, TokenAmount)> {
    holders.retain(|(_, balance)| !balance.is_zero());
    holders.sort_by(|(a_addr, a_bal), (b_addr, b_bal)| {
        b_bal.cmp(a_bal).then_with(|| a_addr.cmp(b_addr))
    });
    holders
}

pub(crate) fn percentage(part: TokenAmount, whole: TokenAmount) -> f64 {
    if whole.is_zero() {
        return 0.0;
    }
    part.raw() as f64 / whole.raw() as f64 * 100.0
}

pub(crate) fn average_participation(
    weight_cast: TokenAmount,
    proposals: u64,
    supply: TokenAmount,
) -> f64 {
    if proposals == 0 || supply.is_zero() {
        return 0.0;
    }
    weight_cast.raw() as f64 / (proposals as f64 * supply.raw() as f64) * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn holder(addr: &str, bal: u128) -> (Address, TokenAmount) {
        (Address::new(addr), TokenAmount::new(bal))
    }

    #[test]
    fn rank_is_deterministic_with_ties() {
        let ranked = rank_holders(vec![
            holder("0xc", 50),
            holder("0xa", 50),
            holder("0xb", 90),
            holder("0xd", 0),
        ]);
        let order: Vec<&str> = ranked.iter().map(|(a, _)| a.as_str()).collect();
        assert_eq!(order, vec!["0xb", "0xa", "0xc"]);
    }

    #[test]
    fn rank_ignores_input_order() {
        let a = rank_holders(vec![holder("0x1", 5), holder("0x2", 5), holder("0x3", 7)]);
        let b = rank_holders(vec![holder("0x3", 7), holder("0x2", 5), holder("0x1", 5)]);
        assert_eq!(a, b);
    }

    #[test]
    fn participation_handles_empty_inputs() {
        assert_eq!(average_participation(TokenAmount::new(10), 0, TokenAmount::new(100)), 0.0);
        assert_eq!(average_participation(TokenAmount::new(10), 3, TokenAmount::ZERO), 0.0);
    }

    #[test]
    fn participation_averages_over_proposals() {
        // Two proposals, 18k + 2k cast against a 100k supply → 10%.
        let pct = average_participation(TokenAmount::new(20_000), 2, TokenAmount::new(100_000));
        assert!((pct - 10.0).abs() < 1e-9);
    }

    #[test]
    fn percentage_of_zero_supply_is_zero() {
        assert_eq!(percentage(TokenAmount::new(5), TokenAmount::ZERO), 0.0);
        assert!((percentage(TokenAmount::new(25), TokenAmount::new(100)) - 25.0).abs() < 1e-9);
    }
}
