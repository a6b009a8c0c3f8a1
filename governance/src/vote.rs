//! Cast votes and their weighted tally.

use agora_types::{Address, ProposalId, Timestamp, TokenAmount, VoteId};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VoteOption {
    For,
    Against,
    Abstain,
}

impl fmt::Display for VoteOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::For => "for",
            Self::Against => "against",
            Self::Abstain => "abstain",
        })
    }
}

/// A vote in the ledger. `weight` is copied from the snapshot at cast time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub id: VoteId,
    pub proposal_id: ProposalId,
    pub voter: Address,
    pub option: VoteOption,
    pub weight: TokenAmount,
    pub timestamp: Timestamp,
}

/// Weighted sums per option.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct VoteTally {
    pub for_votes: TokenAmount,
    pub against_votes: TokenAmount,
    pub abstain_votes: TokenAmount,
}

impl VoteTally {
    /// Full recount over a set of votes.
    pub fn from_votes<'a>(votes: impl IntoIterator<Item = &'a Vote>) -> Self {
        let mut tally = Self::default();
        for vote in votes {
            let bucket = match vote.option {
                VoteOption::For => &mut tally.for_votes,
                VoteOption::Against => &mut tally.against_votes,
                VoteOption::Abstain => &mut tally.abstain_votes,
            };
            *bucket = bucket.saturating_add(vote.weight);
        }
        tally
    }

    /// All participation, abstentions included (quorum numerator).
    pub fn total(&self) -> TokenAmount {
        self.for_votes
            .saturating_add(self.against_votes)
            .saturating_add(self.abstain_votes)
    }

    /// For + against (threshold denominator).
    pub fn decisive(&self) -> TokenAmount {
        self.for_votes.saturating_add(self.against_votes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vote(n: u64, option: VoteOption, weight: u128) -> Vote {
        Vote {
            id: VoteId::new(n),
            proposal_id: ProposalId::new(1),
            voter: Address::new(format!("0xvoter{n}")),
            option,
            weight: TokenAmount::new(weight),
            timestamp: Timestamp::new(n),
        }
    }

    #[test]
    fn tally_sums_per_option() {
        let votes = vec![
            vote(1, VoteOption::For, 10),
            vote(2, VoteOption::For, 5),
            vote(3, VoteOption::Against, 7),
            vote(4, VoteOption::Abstain, 3),
        ];
        let tally = VoteTally::from_votes(&votes);
        assert_eq!(tally.for_votes.raw(), 15);
        assert_eq!(tally.against_votes.raw(), 7);
        assert_eq!(tally.abstain_votes.raw(), 3);
        assert_eq!(tally.total().raw(), 25);
        assert_eq!(tally.decisive().raw(), 22);
    }

    #[test]
    fn empty_tally_is_zero() {
        let tally = VoteTally::from_votes(&[]);
        assert_eq!(tally, VoteTally::default());
        assert!(tally.total().is_zero());
    }
}
