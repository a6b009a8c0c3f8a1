//! Quorum and threshold evaluation.
//!
//! Pure functions of the final tally and the snapshot supply. All comparisons
//! are exact integer cross-multiplications:
//!
//! - quorum:    `total * 100 >= quorum_pct * supply`
//! - threshold: `for > against && for * 100 > threshold_pct * (for + against)`

use std::cmp::Ordering;

use agora_types::TokenAmount;

use crate::vote::VoteTally;

/// Result of evaluating a closed vote.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Outcome {
    pub quorum_reached: bool,
    pub threshold_reached: bool,
}

impl Outcome {
    pub fn passed(&self) -> bool {
        self.quorum_reached && self.threshold_reached
    }
}

pub fn evaluate(
    tally: &VoteTally,
    total_supply: TokenAmount,
    quorum_pct: u32,
    threshold_pct: u32,
) -> Outcome {
    let supply = total_supply.raw();
    let quorum_reached = supply > 0
        && cmp_scaled(tally.total().raw(), 100, supply, u128::from(quorum_pct))
            != Ordering::Less;

    let for_votes = tally.for_votes.raw();
    let threshold_reached = for_votes > tally.against_votes.raw()
        && cmp_scaled(
            for_votes,
            100,
            tally.decisive().raw(),
            u128::from(threshold_pct),
        ) == Ordering::Greater;

    Outcome {
        quorum_reached,
        threshold_reached,
    }
}

/// Compare `a * a_mul` with `b * b_mul` without overflowing.
///
/// Exact whenever both products fit in u128; otherwise both sides are scaled
/// down together until they do.
fn cmp_scaled(a: u128, a_mul: u128, b: u128, b_mul: u128) -> Ordering {
    match (a.checked_mul(a_mul), b.checked_mul(b_mul)) {
        (Some(lhs), Some(rhs)) => lhs.cmp(&rhs),
        _ => cmp_scaled(a >> 8, a_mul, b >> 8, b_mul),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tally(for_votes: u128, against: u128, abstain: u128) -> VoteTally {
        VoteTally {
            for_votes: TokenAmount::new(for_votes),
            against_votes: TokenAmount::new(against),
            abstain_votes: TokenAmount::new(abstain),
        }
    }

    fn supply(raw: u128) -> TokenAmount {
        TokenAmount::new(raw)
    }

    #[test]
    fn reference_scenario_passes() {
        // 18% participation, 83.3% in favour.
        let outcome = evaluate(&tally(15_000, 3_000, 0), supply(100_000), 10, 50);
        assert!(outcome.quorum_reached);
        assert!(outcome.threshold_reached);
        assert!(outcome.passed());
    }

    #[test]
    fn low_participation_fails_quorum_regardless_of_ratio() {
        let outcome = evaluate(&tally(5_000, 0, 0), supply(100_000), 10, 50);
        assert!(!outcome.quorum_reached);
        assert!(outcome.threshold_reached);
        assert!(!outcome.passed());
    }

    #[test]
    fn quorum_boundary_is_inclusive() {
        assert!(evaluate(&tally(10_000, 0, 0), supply(100_000), 10, 50).quorum_reached);
        assert!(!evaluate(&tally(9_999, 0, 0), supply(100_000), 10, 50).quorum_reached);
    }

    #[test]
    fn abstentions_count_toward_quorum_only() {
        let outcome = evaluate(&tally(1_000, 0, 9_000), supply(100_000), 10, 50);
        assert!(outcome.quorum_reached);
        assert!(outcome.threshold_reached);

        let outcome = evaluate(&tally(0, 0, 50_000), supply(100_000), 10, 50);
        assert!(outcome.quorum_reached);
        assert!(!outcome.threshold_reached);
    }

    #[test]
    fn threshold_boundary_is_strict() {
        // Exactly 60% in favour does not exceed a 60% threshold.
        assert!(!evaluate(&tally(6_000, 4_000, 0), supply(20_000), 10, 60).threshold_reached);
        // One more vote in favour tips it over.
        assert!(evaluate(&tally(6_001, 4_000, 0), supply(20_000), 10, 60).threshold_reached);
        // One vote fewer stays below.
        assert!(!evaluate(&tally(5_999, 4_000, 0), supply(20_000), 10, 60).threshold_reached);
    }

    #[test]
    fn tie_never_passes_even_with_zero_threshold() {
        let outcome = evaluate(&tally(5_000, 5_000, 0), supply(10_000), 10, 0);
        assert!(!outcome.threshold_reached);
    }

    #[test]
    fn zero_supply_never_reaches_quorum() {
        assert!(!evaluate(&tally(0, 0, 0), supply(0), 1, 50).quorum_reached);
    }

    #[test]
    fn huge_amounts_do_not_overflow() {
        let big = u128::MAX / 2;
        let outcome = evaluate(&tally(big, 0, 0), supply(u128::MAX), 10, 50);
        assert!(outcome.quorum_reached);
        assert!(outcome.threshold_reached);
    }
}
