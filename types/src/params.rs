//! Governance parameters: every tunable of the proposal lifecycle.

use serde::{Deserialize, Serialize};

use crate::{Token, TokenAmount, TypesError};

/// Parameters applied to every proposal created by the engine.
///
/// Percentages are whole percent (`10` = 10%). Durations are seconds.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GovernanceParams {
    // ── Admission ────────────────────────────────────────────────────────
    /// Governance-token balance a proposer must hold to create a proposal.
    pub min_stake: TokenAmount,

    /// Deposit recorded against the proposer, refunded on execution.
    pub proposal_deposit: TokenAmount,

    // ── Timeline ─────────────────────────────────────────────────────────
    /// Delay between creation and the start of voting.
    pub voting_delay_secs: u64,

    /// Length of the voting window.
    pub voting_period_secs: u64,

    /// Mandatory wait between queueing and execution.
    pub timelock_secs: u64,

    // ── Outcome ──────────────────────────────────────────────────────────
    /// Default share of total supply that must participate.
    pub quorum_pct: u32,

    /// Default share of for+against votes that must be in favour (strictly greater).
    pub threshold_pct: u32,

    // ── Treasury ─────────────────────────────────────────────────────────
    /// Assets the treasury accepts and proposals may transfer.
    pub supported_tokens: Vec<Token>,

    // ── Limits ───────────────────────────────────────────────────────────
    pub max_title_len: usize,
    pub max_description_len: usize,
    pub max_actions: usize,
}

impl GovernanceParams {
    /// Production defaults: 1 day delay, 3 day vote, 2 day timelock.
    pub fn mainnet_defaults() -> Self {
        Self {
            min_stake: TokenAmount::new(1_000),
            proposal_deposit: TokenAmount::new(100),
            voting_delay_secs: 24 * 3600,
            voting_period_secs: 3 * 24 * 3600,
            timelock_secs: 2 * 24 * 3600,
            quorum_pct: 10,
            threshold_pct: 50,
            supported_tokens: vec![Token::new("ETH"), Token::new("USDC"), Token::new("DAO")],
            max_title_len: 200,
            max_description_len: 10_000,
            max_actions: 10,
        }
    }

    /// Compressed timeline for local development: minutes instead of days.
    pub fn devnet_defaults() -> Self {
        Self {
            voting_delay_secs: 60,
            voting_period_secs: 5 * 60,
            timelock_secs: 2 * 60,
            ..Self::mainnet_defaults()
        }
    }

    pub fn supports(&self, token: &Token) -> bool {
        self.supported_tokens.contains(token)
    }

    /// Check internal consistency.
    pub fn validate(&self) -> Result<(), TypesError> {
        if self.quorum_pct == 0 || self.quorum_pct > 100 {
            return Err(TypesError::InvalidPercentage {
                value: self.quorum_pct,
                min: 1,
                max: 100,
            });
        }
        if self.threshold_pct > 99 {
            return Err(TypesError::InvalidPercentage {
                value: self.threshold_pct,
                min: 0,
                max: 99,
            });
        }
        if self.voting_period_secs == 0 {
            return Err(TypesError::InvalidParams(
                "voting_period_secs must be positive".to_string(),
            ));
        }
        if self.supported_tokens.is_empty() {
            return Err(TypesError::InvalidParams(
                "at least one treasury token must be supported".to_string(),
            ));
        }
        Ok(())
    }
}

/// Default is the production configuration.
impl Default for GovernanceParams {
    fn default() -> Self {
        Self::mainnet_defaults()
    }
}
