//! Core governance engine: proposal creation, voting, timelocked execution
//! and the tick that drives time-based transitions.
//!
//! Every mutation of a proposal runs under that proposal's mutex from
//! [`ProposalLocks`]; the treasury has its own serialising lock inside
//! [`TreasuryLedger`]. Queries take no proposal lock and never mutate.

use std::collections::HashSet;
use std::sync::Arc;

use agora_store::GovernanceStore;
use agora_types::{
    Address, Clock, GovernanceParams, ProposalId, Timestamp, Token, TokenAmount, VoteId,
};

use crate::balance::BalanceProvider;
use crate::codec::{decode, decode_all, encode};
use crate::error::GovernanceError;
use crate::locks::ProposalLocks;
use crate::outcome::evaluate;
use crate::proposal::{Proposal, ProposalData, ProposalState};
use crate::snapshot::VoteSnapshot;
use crate::stats::{average_participation, percentage, rank_holders, GovernanceStats, VotingPower};
use crate::treasury::{
    PendingEntry, ReconciliationReport, TreasuryBalance, TreasuryEntry, TreasuryLedger,
};
use crate::vote::{Vote, VoteOption, VoteTally};

const PROPOSAL_SEQUENCE: &str = "proposal";
const VOTE_SEQUENCE: &str = "vote";

/// What one tick did.
#[derive(Debug)]
pub struct TickReport {
    /// Clock reading every transition of the tick was judged against.
    pub now: Timestamp,
    /// Proposals looked at (non-terminal at the start of the tick).
    pub examined: usize,
    /// Every state entered during the tick, in order.
    pub transitions: Vec<(ProposalId, ProposalState)>,
    /// Per-proposal failures; other proposals were still ticked.
    pub failures: Vec<(ProposalId, GovernanceError)>,
    /// The stop predicate ended the tick before every proposal was examined.
    pub interrupted: bool,
}

impl TickReport {
    pub fn new(now: Timestamp) -> Self {
        Self {
            now,
            examined: 0,
            transitions: Vec::new(),
            failures: Vec::new(),
            interrupted: false,
        }
    }

    pub fn executed(&self) -> impl Iterator<Item = ProposalId> + '_ {
        self.transitions
            .iter()
            .filter(|(_, s)| *s == ProposalState::Executed)
            .map(|(id, _)| *id)
    }
}

/// Orchestrates proposals, votes, snapshots and the treasury.
pub struct GovernanceEngine {
    params: GovernanceParams,
    store: Arc<dyn GovernanceStore>,
    provider: Arc<dyn BalanceProvider>,
    clock: Arc<dyn Clock>,
    treasury: TreasuryLedger,
    locks: ProposalLocks,
}

impl GovernanceEngine {
    pub fn new(
        params: GovernanceParams,
        store: Arc<dyn GovernanceStore>,
        provider: Arc<dyn BalanceProvider>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, GovernanceError> {
        params.validate()?;
        let treasury = TreasuryLedger::new(Arc::clone(&store), params.supported_tokens.clone());
        Ok(Self {
            params,
            store,
            provider,
            clock,
            treasury,
            locks: ProposalLocks::new(),
        })
    }

    pub fn params(&self) -> &GovernanceParams {
        &self.params
    }

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    // ── Commands ────────────────────────────────────────────────────────

    /// Submit a new proposal. It starts in Draft; no snapshot is taken yet.
    pub fn create_proposal(
        &self,
        data: ProposalData,
        proposer: &Address,
    ) -> Result<ProposalId, GovernanceError> {
        data.validate(&self.params)?;

        let stake = self.provider.balance(proposer, None)?;
        if stake < self.params.min_stake {
            return Err(GovernanceError::InsufficientStake {
                have: stake,
                need: self.params.min_stake,
            });
        }

        let now = self.clock.now();
        let id = ProposalId::new(self.store.next_sequence(PROPOSAL_SEQUENCE)?);
        let proposal = Proposal::draft(id, data, proposer.clone(), &self.params, now);
        self.save(&proposal)?;

        tracing::info!(
            proposal = %id,
            proposer = %proposer,
            kind = ?proposal.proposal_type,
            start = %proposal.start_time,
            end = %proposal.end_time,
            "proposal created"
        );
        Ok(id)
    }

    /// Cast a vote with the voter's snapshot weight.
    pub fn cast_vote(
        &self,
        id: ProposalId,
        voter: &Address,
        option: VoteOption,
    ) -> Result<Vote, GovernanceError> {
        let _span = tracing::debug_span!("cast_vote", proposal = %id, voter = %voter).entered();
        let lock = self.locks.get(id);
        let _guard = lock.lock();

        let now = self.clock.now();
        let mut proposal = self.load(id)?;
        if !proposal.is_voting_open(now) {
            return Err(GovernanceError::ProposalNotActive {
                id,
                state: proposal.state,
            });
        }
        if self.store.get_vote(id, voter)?.is_some() {
            return Err(GovernanceError::AlreadyVoted {
                proposal: id,
                voter: voter.clone(),
            });
        }

        let snapshot = self.ensure_snapshot(&proposal, now)?;
        let weight = snapshot.balance_of(voter);
        if weight.is_zero() {
            return Err(GovernanceError::NoVotingPower(voter.clone()));
        }

        let vote = Vote {
            id: VoteId::new(self.store.next_sequence(VOTE_SEQUENCE)?),
            proposal_id: id,
            voter: voter.clone(),
            option,
            weight,
            timestamp: now,
        };
        match self.store.insert_vote(id, voter, &encode(&vote)?) {
            Ok(()) => {}
            Err(e) if e.is_duplicate() => {
                return Err(GovernanceError::AlreadyVoted {
                    proposal: id,
                    voter: voter.clone(),
                })
            }
            Err(e) => return Err(e.into()),
        }

        // Recount from the ledger rather than adding to the cached tallies.
        let tally = self.tally(id)?;
        apply_tally(&mut proposal, &tally);
        self.save(&proposal)?;

        tracing::info!(
            proposal = %id,
            voter = %voter,
            option = %option,
            weight = %weight,
            "vote cast"
        );
        Ok(vote)
    }

    /// Execute a queued proposal whose timelock has elapsed.
    ///
    /// Succeeds without side effects if the proposal is already executed.
    pub fn execute_proposal(&self, id: ProposalId) -> Result<Proposal, GovernanceError> {
        let lock = self.locks.get(id);
        let _guard = lock.lock();

        let mut proposal = self.load(id)?;
        if proposal.state == ProposalState::Executed {
            tracing::debug!(proposal = %id, "already executed");
            return Ok(proposal);
        }
        let now = self.clock.now();
        self.execute_locked(&mut proposal, now)?;
        self.locks.forget(id);
        Ok(proposal)
    }

    /// Withdraw a Draft or Active proposal. Only the proposer may cancel.
    ///
    /// A Draft cancellation refunds the deposit; once voting has started the
    /// deposit is forfeited. An Active proposal whose voting period has ended
    /// can no longer be cancelled, even before a tick has closed it.
    pub fn cancel_proposal(
        &self,
        id: ProposalId,
        caller: &Address,
    ) -> Result<Proposal, GovernanceError> {
        let lock = self.locks.get(id);
        let _guard = lock.lock();

        let mut proposal = self.load(id)?;
        if &proposal.proposer != caller {
            return Err(GovernanceError::NotProposer(id));
        }
        let now = self.clock.now();
        let voting_over = proposal.state == ProposalState::Active && now >= proposal.end_time;
        if voting_over || !proposal.state.can_transition_to(ProposalState::Cancelled) {
            return Err(GovernanceError::ProposalNotActive {
                id,
                state: proposal.state,
            });
        }

        proposal.refunded = proposal.state == ProposalState::Draft;
        proposal.transition(ProposalState::Cancelled, now)?;
        proposal.cancelled_at = Some(now);
        self.save(&proposal)?;
        self.locks.forget(id);

        tracing::info!(proposal = %id, refunded = proposal.refunded, "proposal cancelled");
        Ok(proposal)
    }

    /// Record an external inflow into the treasury.
    pub fn deposit_to_treasury(
        &self,
        amount: TokenAmount,
        token: Token,
        description: impl Into<String>,
    ) -> Result<TreasuryEntry, GovernanceError> {
        let now = self.clock.now();
        self.treasury
            .apply_entry(PendingEntry::inflow(amount, token, description), now)
    }

    // ── Scheduler entry points ──────────────────────────────────────────

    /// Advance every non-terminal proposal as far as the clock allows.
    pub fn tick(&self) -> TickReport {
        self.tick_until(|| false)
    }

    /// Like [`tick`](Self::tick) but checks `stop` before each proposal and
    /// returns early once it reports true.
    pub fn tick_until(&self, stop: impl Fn() -> bool) -> TickReport {
        let now = self.clock.now();
        let mut report = TickReport::new(now);

        let pending = match self.pending_proposal_ids() {
            Ok(ids) => ids,
            Err(e) => {
                tracing::error!(error = %e, "cannot list proposals for tick");
                return report;
            }
        };

        for id in pending {
            if stop() {
                report.interrupted = true;
                tracing::info!(proposal = %id, "tick interrupted");
                break;
            }
            report.examined += 1;
            if let Err(e) = self.advance_proposal(id, now, &mut report.transitions) {
                tracing::warn!(proposal = %id, error = %e, "failed to advance proposal");
                report.failures.push((id, e));
            }
        }
        report
    }

    /// Apply every transition that is due at `now` to one proposal.
    ///
    /// Each step is persisted before the next is attempted, so a failure
    /// leaves the proposal in the last state it legitimately reached.
    pub fn advance_proposal(
        &self,
        id: ProposalId,
        now: Timestamp,
        transitions: &mut Vec<(ProposalId, ProposalState)>,
    ) -> Result<(), GovernanceError> {
        let _span = tracing::debug_span!("advance_proposal", proposal = %id).entered();
        let lock = self.locks.get(id);
        let _guard = lock.lock();

        let mut proposal = self.load(id)?;
        loop {
            match proposal.state {
                ProposalState::Draft if now >= proposal.start_time => {
                    proposal.transition(ProposalState::Active, now)?;
                    self.save(&proposal)?;
                    transitions.push((id, ProposalState::Active));
                    tracing::info!(proposal = %id, "voting opened");

                    if let Err(e) = self.ensure_snapshot(&proposal, now) {
                        tracing::warn!(
                            proposal = %id,
                            error = %e,
                            "snapshot deferred; first voter or next tick will retry"
                        );
                    }
                }
                ProposalState::Active if now >= proposal.end_time => {
                    let snapshot = self.ensure_snapshot(&proposal, now)?;
                    let tally = self.tally(id)?;
                    apply_tally(&mut proposal, &tally);

                    let outcome = evaluate(
                        &tally,
                        snapshot.total_supply,
                        proposal.quorum_required,
                        proposal.threshold_required,
                    );
                    if outcome.passed() {
                        proposal.transition(ProposalState::Succeeded, now)?;
                        proposal.transition(ProposalState::Queued, now)?;
                        proposal.queued_at = Some(now);
                        self.save(&proposal)?;
                        transitions.push((id, ProposalState::Succeeded));
                        transitions.push((id, ProposalState::Queued));
                    } else {
                        proposal.transition(ProposalState::Defeated, now)?;
                        self.save(&proposal)?;
                        transitions.push((id, ProposalState::Defeated));
                        self.locks.forget(id);
                    }
                    tracing::info!(
                        proposal = %id,
                        state = %proposal.state,
                        for_votes = %tally.for_votes,
                        against_votes = %tally.against_votes,
                        abstain_votes = %tally.abstain_votes,
                        supply = %snapshot.total_supply,
                        quorum_reached = outcome.quorum_reached,
                        threshold_reached = outcome.threshold_reached,
                        "voting closed"
                    );
                }
                ProposalState::Queued if self.timelock_elapsed(&proposal, now) => {
                    self.execute_locked(&mut proposal, now)?;
                    transitions.push((id, ProposalState::Executed));
                    self.locks.forget(id);
                }
                _ => break,
            }
        }
        Ok(())
    }

    // ── Queries ─────────────────────────────────────────────────────────

    pub fn get_proposal(&self, id: ProposalId) -> Result<Proposal, GovernanceError> {
        self.load(id)
    }

    /// All proposals in id order, optionally restricted to one state.
    pub fn list_proposals(
        &self,
        state: Option<ProposalState>,
    ) -> Result<Vec<Proposal>, GovernanceError> {
        let mut proposals: Vec<Proposal> = decode_all(self.store.iter_proposals()?)?;
        if let Some(state) = state {
            proposals.retain(|p| p.state == state);
        }
        Ok(proposals)
    }

    /// Votes on a proposal in casting order. Unknown proposals have no votes.
    pub fn get_votes(&self, id: ProposalId) -> Result<Vec<Vote>, GovernanceError> {
        let mut votes: Vec<Vote> = decode_all(self.store.get_votes(id)?)?;
        votes.sort_by_key(|v| v.id);
        Ok(votes)
    }

    pub fn get_vote(
        &self,
        id: ProposalId,
        voter: &Address,
    ) -> Result<Option<Vote>, GovernanceError> {
        self.store
            .get_vote(id, voter)?
            .map(|bytes| decode(&bytes))
            .transpose()
    }

    pub fn get_snapshot(&self, id: ProposalId) -> Result<Option<VoteSnapshot>, GovernanceError> {
        self.store
            .get_snapshot(id)?
            .map(|bytes| decode(&bytes))
            .transpose()
    }

    pub fn get_treasury_balance(&self) -> Result<TreasuryBalance, GovernanceError> {
        self.treasury.balance()
    }

    pub fn get_treasury_history(&self) -> Result<Vec<TreasuryEntry>, GovernanceError> {
        self.treasury.history()
    }

    pub fn reconcile_treasury(&self) -> Result<ReconciliationReport, GovernanceError> {
        self.treasury.reconcile()
    }

    pub fn get_stats(&self) -> Result<GovernanceStats, GovernanceError> {
        let proposals = self.list_proposals(None)?;
        let votes: Vec<Vote> = decode_all(self.store.iter_votes()?)?;
        let total_staked = self.provider.total_supply(None)?;

        let count = |state: ProposalState| proposals.iter().filter(|p| p.state == state).count() as u64;
        let unique_voters: HashSet<&Address> = votes.iter().map(|v| &v.voter).collect();
        let weight_cast: TokenAmount = votes.iter().map(|v| v.weight).sum();

        Ok(GovernanceStats {
            total_proposals: proposals.len() as u64,
            active_proposals: count(ProposalState::Active),
            queued_proposals: count(ProposalState::Queued),
            executed_proposals: count(ProposalState::Executed),
            defeated_proposals: count(ProposalState::Defeated),
            cancelled_proposals: count(ProposalState::Cancelled),
            total_votes: votes.len() as u64,
            unique_voters: unique_voters.len() as u64,
            total_staked,
            average_participation_pct: average_participation(
                weight_cast,
                proposals.len() as u64,
                total_staked,
            ),
            treasury: self.treasury.balance()?,
        })
    }

    /// Current governance weight and rank of `address`.
    pub fn voting_power(&self, address: &Address) -> Result<VotingPower, GovernanceError> {
        let ranked = rank_holders(self.provider.holders(None)?);
        let supply = self.provider.total_supply(None)?;

        let position = ranked.iter().position(|(a, _)| a == address);
        let balance = position
            .map(|i| ranked[i].1)
            .unwrap_or(TokenAmount::ZERO);

        Ok(VotingPower {
            address: address.clone(),
            balance,
            percentage: percentage(balance, supply),
            rank: position.map(|i| i as u32 + 1),
            holders: ranked.len() as u32,
        })
    }

    // ── Internals ───────────────────────────────────────────────────────

    fn load(&self, id: ProposalId) -> Result<Proposal, GovernanceError> {
        match self.store.get_proposal(id)? {
            Some(bytes) => decode(&bytes),
            None => Err(GovernanceError::ProposalNotFound(id)),
        }
    }

    fn save(&self, proposal: &Proposal) -> Result<(), GovernanceError> {
        self.store.put_proposal(proposal.id, &encode(proposal)?)?;
        Ok(())
    }

    fn pending_proposal_ids(&self) -> Result<Vec<ProposalId>, GovernanceError> {
        Ok(self
            .list_proposals(None)?
            .into_iter()
            .filter(|p| !p.state.is_terminal())
            .map(|p| p.id)
            .collect())
    }

    fn tally(&self, id: ProposalId) -> Result<VoteTally, GovernanceError> {
        let votes: Vec<Vote> = decode_all(self.store.get_votes(id)?)?;
        Ok(VoteTally::from_votes(&votes))
    }

    /// Return the proposal's snapshot, capturing it first if absent.
    ///
    /// Balances are taken as of `start_time` whichever path creates the
    /// snapshot. The store keeps the first snapshot written.
    fn ensure_snapshot(
        &self,
        proposal: &Proposal,
        now: Timestamp,
    ) -> Result<VoteSnapshot, GovernanceError> {
        if let Some(bytes) = self.store.get_snapshot(proposal.id)? {
            return decode(&bytes);
        }
        let captured = VoteSnapshot::capture(
            proposal.id,
            proposal.start_time,
            now,
            self.provider.as_ref(),
        )?;
        let stored = self
            .store
            .put_snapshot_if_absent(proposal.id, &encode(&captured)?)?;
        let snapshot: VoteSnapshot = decode(&stored)?;
        tracing::info!(
            proposal = %proposal.id,
            holders = snapshot.holder_count(),
            supply = %snapshot.total_supply,
            "vote snapshot taken"
        );
        Ok(snapshot)
    }

    fn timelock_elapsed(&self, proposal: &Proposal, now: Timestamp) -> bool {
        proposal
            .queued_at
            .is_some_and(|q| q.has_expired(self.params.timelock_secs, now))
    }

    /// Queued → Executed. Caller holds the proposal lock.
    fn execute_locked(
        &self,
        proposal: &mut Proposal,
        now: Timestamp,
    ) -> Result<(), GovernanceError> {
        let id = proposal.id;
        if proposal.state != ProposalState::Queued {
            return Err(GovernanceError::ProposalNotReady(format!(
                "proposal {id} is {}, not queued",
                proposal.state
            )));
        }
        if !self.timelock_elapsed(proposal, now) {
            let ready_at = proposal
                .queued_at
                .map(|q| q.plus_secs(self.params.timelock_secs))
                .unwrap_or(now);
            return Err(GovernanceError::ProposalNotReady(format!(
                "timelock of proposal {id} ends at {ready_at}"
            )));
        }

        if self.treasury.entries_for_proposal(id)?.is_empty() {
            let outflows: Vec<PendingEntry> = proposal
                .transfers()
                .map(|(target, amount, token)| {
                    PendingEntry::outflow(
                        amount,
                        token.clone(),
                        format!("proposal {id}: {} → {target}", proposal.title),
                        id,
                    )
                })
                .collect();
            self.treasury
                .apply_batch(outflows, now)
                .map_err(|e| match e {
                    GovernanceError::InsufficientTreasury { .. }
                    | GovernanceError::UnsupportedToken(_)
                    | GovernanceError::InvalidTreasuryEntry(_) => {
                        GovernanceError::ProposalNotReady(e.to_string())
                    }
                    other => other,
                })?;
        } else {
            tracing::warn!(
                proposal = %id,
                "treasury outflows already recorded, completing execution without reapplying"
            );
        }

        proposal.transition(ProposalState::Executed, now)?;
        proposal.executed_at = Some(now);
        proposal.refunded = true;
        self.save(proposal)?;

        tracing::info!(proposal = %id, deposit = %proposal.deposit, "proposal executed, deposit refunded");
        Ok(())
    }
}

fn apply_tally(proposal: &mut Proposal, tally: &VoteTally) {
    proposal.for_votes = tally.for_votes;
    proposal.against_votes = tally.against_votes;
    proposal.abstain_votes = tally.abstain_votes;
}
