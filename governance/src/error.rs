use agora_store::StoreError;
use agora_types::{Address, ProposalId, Token, TokenAmount, TypesError};
use thiserror::Error;

use crate::proposal::ProposalState;

#[derive(Debug, Error)]
pub enum GovernanceError {
    #[error("invalid proposal data: {0}")]
    InvalidProposalData(String),

    #[error("insufficient stake: have {have}, need {need}")]
    InsufficientStake { have: TokenAmount, need: TokenAmount },

    #[error("proposal {0} not found")]
    ProposalNotFound(ProposalId),

    #[error("proposal {id} is not active (state: {state})")]
    ProposalNotActive { id: ProposalId, state: ProposalState },

    #[error("{voter} has already voted on proposal {proposal}")]
    AlreadyVoted { proposal: ProposalId, voter: Address },

    #[error("{0} has no voting power in this proposal's snapshot")]
    NoVotingPower(Address),

    #[error("proposal not ready: {0}")]
    ProposalNotReady(String),

    #[error("balance provider unavailable: {0}")]
    BalanceProviderUnavailable(String),

    #[error("only the proposer can cancel proposal {0}")]
    NotProposer(ProposalId),

    #[error("unsupported treasury token: {0}")]
    UnsupportedToken(Token),

    #[error("insufficient treasury {token} balance: need {needed}, have {available}")]
    InsufficientTreasury {
        token: Token,
        needed: TokenAmount,
        available: TokenAmount,
    },

    #[error("invalid treasury entry: {0}")]
    InvalidTreasuryEntry(String),

    #[error("invalid governance parameters: {0}")]
    Params(#[from] TypesError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("codec error: {0}")]
    Codec(String),
}

impl GovernanceError {
    /// Whether the same call may succeed later without any caller-side change.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::BalanceProviderUnavailable(_) | Self::ProposalNotReady(_)
        )
    }
}
