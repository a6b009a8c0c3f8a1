//! Governance proposals and their lifecycle.

use agora_types::{Address, GovernanceParams, ProposalId, Timestamp, Token, TokenAmount};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::GovernanceError;

/// What kind of change a proposal asks for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProposalType {
    TreasuryWithdrawal,
    ParameterChange,
    ProtocolUpgrade,
    General,
}

/// Lifecycle state of a proposal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProposalState {
    /// Created, waiting for `start_time`.
    Draft,
    /// Voting open.
    Active,
    /// Quorum and threshold met at `end_time`. Transient: queued in the same tick.
    Succeeded,
    /// Quorum or threshold missed. Terminal.
    Defeated,
    /// Waiting for the timelock to elapse.
    Queued,
    /// Actions applied. Terminal.
    Executed,
    /// Withdrawn by the proposer. Terminal.
    Cancelled,
}

impl ProposalState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Executed | Self::Defeated | Self::Cancelled)
    }

    /// Position along `Draft < Active < {Succeeded, Defeated} < Queued < Executed`.
    ///
    /// Cancelled sits after every state it can be reached from.
    pub fn stage(&self) -> u8 {
        match self {
            Self::Draft => 0,
            Self::Active => 1,
            Self::Succeeded | Self::Defeated => 2,
            Self::Queued => 3,
            Self::Executed => 4,
            Self::Cancelled => 5,
        }
    }

    /// Whether `next` is a legal successor of this state.
    pub fn can_transition_to(&self, next: ProposalState) -> bool {
        use ProposalState::*;
        matches!(
            (self, next),
            (Draft, Active)
                | (Active, Succeeded)
                | (Active, Defeated)
                | (Succeeded, Queued)
                | (Queued, Executed)
                | (Draft, Cancelled)
                | (Active, Cancelled)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Active => "active",
            Self::Succeeded => "succeeded",
            Self::Defeated => "defeated",
            Self::Queued => "queued",
            Self::Executed => "executed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ProposalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An executable step attached to a proposal. Immutable once attached.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    /// Move `amount` of `token` from the treasury to `target`.
    Transfer {
        target: Address,
        amount: TokenAmount,
        token: Token,
    },
    /// Off-engine parameter change, recorded for the audit trail.
    ParameterChange { description: String },
    /// Off-engine contract call, recorded for the audit trail.
    ContractCall { description: String },
}

impl Action {
    fn validate(&self, params: &GovernanceParams) -> Result<(), GovernanceError> {
        match self {
            Action::Transfer {
                target,
                amount,
                token,
            } => {
                if !target.is_valid() {
                    return Err(GovernanceError::InvalidProposalData(format!(
                        "transfer target {target:?} is not a valid address"
                    )));
                }
                if amount.is_zero() {
                    return Err(GovernanceError::InvalidProposalData(
                        "transfer amount must be positive".to_string(),
                    ));
                }
                if !params.supports(token) {
                    return Err(GovernanceError::InvalidProposalData(format!(
                        "transfer token {token} is not held by the treasury"
                    )));
                }
                Ok(())
            }
            Action::ParameterChange { description } | Action::ContractCall { description } => {
                if description.trim().is_empty() {
                    return Err(GovernanceError::InvalidProposalData(
                        "action description must not be empty".to_string(),
                    ));
                }
                Ok(())
            }
        }
    }
}

/// Caller-supplied content of a new proposal.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProposalData {
    pub title: String,
    pub description: String,
    pub proposal_type: ProposalType,
    pub actions: Vec<Action>,
    /// Overrides `GovernanceParams::quorum_pct` for this proposal.
    pub quorum_pct: Option<u32>,
    /// Overrides `GovernanceParams::threshold_pct` for this proposal.
    pub threshold_pct: Option<u32>,
}

impl ProposalData {
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        proposal_type: ProposalType,
    ) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            proposal_type,
            actions: Vec::new(),
            quorum_pct: None,
            threshold_pct: None,
        }
    }

    pub fn with_action(mut self, action: Action) -> Self {
        self.actions.push(action);
        self
    }

    pub fn with_quorum(mut self, pct: u32) -> Self {
        self.quorum_pct = Some(pct);
        self
    }

    pub fn with_threshold(mut self, pct: u32) -> Self {
        self.threshold_pct = Some(pct);
        self
    }

    /// Check the content against the governance limits.
    pub fn validate(&self, params: &GovernanceParams) -> Result<(), GovernanceError> {
        let invalid =
            |msg: String| -> Result<(), GovernanceError> { Err(GovernanceError::InvalidProposalData(msg)) };

        if self.title.trim().is_empty() {
            return invalid("title must not be empty".to_string());
        }
        if self.description.trim().is_empty() {
            return invalid("description must not be empty".to_string());
        }
        if self.title.len() > params.max_title_len {
            return invalid(format!(
                "title exceeds {} bytes",
                params.max_title_len
            ));
        }
        if self.description.len() > params.max_description_len {
            return invalid(format!(
                "description exceeds {} bytes",
                params.max_description_len
            ));
        }
        if self.actions.len() > params.max_actions {
            return invalid(format!("at most {} actions allowed", params.max_actions));
        }
        if let Some(q) = self.quorum_pct {
            if q == 0 || q > 100 {
                return invalid(format!("quorum {q}% outside 1..=100"));
            }
        }
        if let Some(t) = self.threshold_pct {
            if t > 99 {
                return invalid(format!("threshold {t}% outside 0..=99"));
            }
        }
        if self.proposal_type == ProposalType::TreasuryWithdrawal
            && !self
                .actions
                .iter()
                .any(|a| matches!(a, Action::Transfer { .. }))
        {
            return invalid("treasury withdrawal needs at least one transfer".to_string());
        }
        for action in &self.actions {
            action.validate(params)?;
        }
        Ok(())
    }
}

/// One entry of a proposal's state history.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateTransition {
    pub state: ProposalState,
    pub at: Timestamp,
}

/// A governance proposal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    pub id: ProposalId,
    pub title: String,
    pub description: String,
    pub proposal_type: ProposalType,
    pub proposer: Address,
    pub state: ProposalState,
    pub created_at: Timestamp,
    /// Voting opens; also the `as_of` point of the balance snapshot.
    pub start_time: Timestamp,
    /// Voting closes (exclusive).
    pub end_time: Timestamp,
    pub queued_at: Option<Timestamp>,
    pub executed_at: Option<Timestamp>,
    pub cancelled_at: Option<Timestamp>,
    /// Weighted tallies, recomputed from the vote ledger on every cast.
    pub for_votes: TokenAmount,
    pub against_votes: TokenAmount,
    pub abstain_votes: TokenAmount,
    /// Percent of snapshot supply that must participate.
    pub quorum_required: u32,
    /// Percent of for+against that must be in favour (strictly greater).
    pub threshold_required: u32,
    pub deposit: TokenAmount,
    pub refunded: bool,
    pub actions: Vec<Action>,
    /// Every state entered, oldest first.
    pub transitions: Vec<StateTransition>,
}

impl Proposal {
    /// Build a fresh Draft proposal.
    pub fn draft(
        id: ProposalId,
        data: ProposalData,
        proposer: Address,
        params: &GovernanceParams,
        now: Timestamp,
    ) -> Self {
        let start_time = now.plus_secs(params.voting_delay_secs);
        let end_time = start_time.plus_secs(params.voting_period_secs);
        Self {
            id,
            title: data.title.trim().to_string(),
            description: data.description.trim().to_string(),
            proposal_type: data.proposal_type,
            proposer,
            state: ProposalState::Draft,
            created_at: now,
            start_time,
            end_time,
            queued_at: None,
            executed_at: None,
            cancelled_at: None,
            for_votes: TokenAmount::ZERO,
            against_votes: TokenAmount::ZERO,
            abstain_votes: TokenAmount::ZERO,
            quorum_required: data.quorum_pct.unwrap_or(params.quorum_pct),
            threshold_required: data.threshold_pct.unwrap_or(params.threshold_pct),
            deposit: params.proposal_deposit,
            refunded: false,
            actions: data.actions,
            transitions: vec![StateTransition {
                state: ProposalState::Draft,
                at: now,
            }],
        }
    }

    /// Move to `next`, recording it in the history.
    pub fn transition(&mut self, next: ProposalState, at: Timestamp) -> Result<(), GovernanceError> {
        if !self.state.can_transition_to(next) {
            return Err(GovernanceError::ProposalNotReady(format!(
                "proposal {} cannot move from {} to {}",
                self.id, self.state, next
            )));
        }
        self.state = next;
        self.transitions.push(StateTransition { state: next, at });
        Ok(())
    }

    /// Whether votes are accepted at `now`.
    pub fn is_voting_open(&self, now: Timestamp) -> bool {
        self.state == ProposalState::Active && now < self.end_time
    }

    pub fn total_votes(&self) -> TokenAmount {
        self.for_votes
            .saturating_add(self.against_votes)
            .saturating_add(self.abstain_votes)
    }

    /// Transfer actions in declaration order.
    pub fn transfers(&self) -> impl Iterator<Item = (&Address, TokenAmount, &Token)> {
        self.actions.iter().filter_map(|a| match a {
            Action::Transfer {
                target,
                amount,
                token,
            } => Some((target, *amount, token)),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> GovernanceParams {
        GovernanceParams::mainnet_defaults()
    }

    fn transfer(amount: u128, token: &str) -> Action {
        Action::Transfer {
            target: Address::new("0xgrantee"),
            amount: TokenAmount::new(amount),
            token: Token::new(token),
        }
    }

    #[test]
    fn legal_transitions() {
        use ProposalState::*;
        assert!(Draft.can_transition_to(Active));
        assert!(Active.can_transition_to(Defeated));
        assert!(Succeeded.can_transition_to(Queued));
        assert!(Queued.can_transition_to(Executed));
        assert!(Active.can_transition_to(Cancelled));
        assert!(!Queued.can_transition_to(Cancelled));
        assert!(!Active.can_transition_to(Queued));
        assert!(!Executed.can_transition_to(Active));
        assert!(!Defeated.can_transition_to(Succeeded));
    }

    #[test]
    fn terminal_states_have_no_successor() {
        use ProposalState::*;
        let all = [Draft, Active, Succeeded, Defeated, Queued, Executed, Cancelled];
        for from in [Executed, Defeated, Cancelled] {
            assert!(from.is_terminal());
            for to in all {
                assert!(!from.can_transition_to(to), "{from} -> {to}");
            }
        }
    }

    #[test]
    fn every_legal_transition_increases_stage() {
        use ProposalState::*;
        let all = [Draft, Active, Succeeded, Defeated, Queued, Executed, Cancelled];
        for from in all {
            for to in all {
                if from.can_transition_to(to) {
                    assert!(to.stage() > from.stage(), "{from} -> {to}");
                }
            }
        }
    }

    #[test]
    fn draft_schedules_voting_window() {
        let p = params();
        let proposal = Proposal::draft(
            ProposalId::new(1),
            ProposalData::new("Title", "Body", ProposalType::General),
            Address::new("0xalice"),
            &p,
            Timestamp::new(1_000),
        );
        assert_eq!(proposal.state, ProposalState::Draft);
        assert_eq!(proposal.start_time.as_secs(), 1_000 + p.voting_delay_secs);
        assert_eq!(
            proposal.end_time.as_secs(),
            1_000 + p.voting_delay_secs + p.voting_period_secs
        );
        assert_eq!(proposal.quorum_required, p.quorum_pct);
        assert_eq!(proposal.deposit, p.proposal_deposit);
        assert_eq!(proposal.transitions.len(), 1);
    }

    #[test]
    fn illegal_transition_is_rejected_and_not_recorded() {
        let mut proposal = Proposal::draft(
            ProposalId::new(1),
            ProposalData::new("T", "D", ProposalType::General),
            Address::new("0xalice"),
            &params(),
            Timestamp::new(0),
        );
        assert!(proposal
            .transition(ProposalState::Executed, Timestamp::new(5))
            .is_err());
        assert_eq!(proposal.state, ProposalState::Draft);
        assert_eq!(proposal.transitions.len(), 1);
    }

    #[test]
    fn empty_title_or_description_rejected() {
        let p = params();
        assert!(ProposalData::new("  ", "body", ProposalType::General)
            .validate(&p)
            .is_err());
        assert!(ProposalData::new("title", "", ProposalType::General)
            .validate(&p)
            .is_err());
    }

    #[test]
    fn malformed_actions_rejected() {
        let p = params();
        let zero = ProposalData::new("t", "d", ProposalType::General).with_action(transfer(0, "ETH"));
        assert!(matches!(
            zero.validate(&p),
            Err(GovernanceError::InvalidProposalData(_))
        ));

        let unknown = ProposalData::new("t", "d", ProposalType::General).with_action(transfer(5, "DOGE"));
        assert!(unknown.validate(&p).is_err());

        let blank = ProposalData::new("t", "d", ProposalType::ParameterChange).with_action(
            Action::ParameterChange {
                description: " ".to_string(),
            },
        );
        assert!(blank.validate(&p).is_err());
    }

    #[test]
    fn withdrawal_requires_transfer() {
        let p = params();
        let data = ProposalData::new("t", "d", ProposalType::TreasuryWithdrawal);
        assert!(data.validate(&p).is_err());
        let data = data.with_action(transfer(10, "usdc"));
        assert!(data.validate(&p).is_ok());
    }

    #[test]
    fn override_percentages_are_bounded() {
        let p = params();
        let base = ProposalData::new("t", "d", ProposalType::General);
        assert!(base.clone().with_quorum(0).validate(&p).is_err());
        assert!(base.clone().with_quorum(101).validate(&p).is_err());
        assert!(base.clone().with_threshold(100).validate(&p).is_err());
        assert!(base.with_quorum(100).with_threshold(0).validate(&p).is_ok());
    }

    #[test]
    fn too_many_actions_rejected() {
        let p = GovernanceParams {
            max_actions: 1,
            ..params()
        };
        let data = ProposalData::new("t", "d", ProposalType::General)
            .with_action(transfer(1, "ETH"))
            .with_action(transfer(2, "ETH"));
        assert!(data.validate(&p).is_err());
    }
}
