//! Vote counting
//!
//! Pure functions of a committee, its votes and current stake. Weighted
//! tallies look the stake up at the time of counting, so votes cast before a
//! stake change count with the new weight.

use comgov_core::account::AccountId;
use comgov_core::committee::{AbstainPolicy, Committee, CommitteeKind, WeightedParams};
use comgov_core::proposal::{ProposalOutcome, ResolutionReason, VoteOption};
use comgov_module::stake::StakeProvider;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TallyVerdict {
    Passed,
    Rejected,
    Vetoed,
    NoQuorum,
}

impl TallyVerdict {
    pub fn outcome(self) -> ProposalOutcome {
        match self {
            TallyVerdict::Passed => ProposalOutcome::Passed,
            TallyVerdict::Rejected | TallyVerdict::Vetoed => ProposalOutcome::Failed,
            TallyVerdict::NoQuorum => ProposalOutcome::Undecided,
        }
    }

    /// Reason for a proposal resolved with this verdict, if it did not pass
    pub fn failure_reason(self) -> Option<ResolutionReason> {
        match self {
            TallyVerdict::Passed => None,
            TallyVerdict::Rejected => Some(ResolutionReason::Rejected),
            TallyVerdict::Vetoed => Some(ResolutionReason::Vetoed),
            TallyVerdict::NoQuorum => Some(ResolutionReason::NoQuorum),
        }
    }
}

/// Counted votes, in votes (fixed) or stake (weighted)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteCounts {
    pub yes: u128,
    pub no: u128,
    pub abstain: u128,
    pub no_with_veto: u128,
    /// Number of members, or total bonded stake
    pub eligible: u128,
}

impl VoteCounts {
    pub fn participation(&self) -> u128 {
        self.yes + self.no + self.abstain + self.no_with_veto
    }

    fn add(&mut self, option: VoteOption, weight: u128) {
        match option {
            VoteOption::Yes => self.yes += weight,
            VoteOption::No => self.no += weight,
            VoteOption::Abstain => self.abstain += weight,
            VoteOption::NoWithVeto => self.no_with_veto += weight,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TallyResult {
    pub verdict: TallyVerdict,
    pub counts: VoteCounts,
}

impl TallyResult {
    pub fn outcome(&self) -> ProposalOutcome {
        self.verdict.outcome()
    }

    pub fn is_passed(&self) -> bool {
        self.verdict == TallyVerdict::Passed
    }
}

pub fn tally<'v>(
    committee: &Committee,
    votes: impl IntoIterator<Item = (&'v AccountId, &'v VoteOption)>,
    stake: &dyn StakeProvider,
) -> TallyResult {
    match &committee.kind {
        CommitteeKind::Fixed => tally_fixed(committee, votes),
        CommitteeKind::Weighted(params) => tally_weighted(committee, params, votes, stake),
    }
}

/// One vote per current member; `yes / members >= threshold` passes
fn tally_fixed<'v>(
    committee: &Committee,
    votes: impl IntoIterator<Item = (&'v AccountId, &'v VoteOption)>,
) -> TallyResult {
    let mut counts = VoteCounts {
        eligible: committee.members.len() as u128,
        ..VoteCounts::default()
    };

    for (voter, option) in votes {
        // Members that left the committee since voting don't count
        if committee.is_member(voter) {
            counts.add(*option, 1);
        }
    }

    let verdict = if committee
        .vote_threshold
        .is_reached_by(counts.yes, counts.eligible)
    {
        TallyVerdict::Passed
    } else {
        TallyVerdict::Rejected
    };

    TallyResult { verdict, counts }
}

fn tally_weighted<'v>(
    committee: &Committee,
    params: &WeightedParams,
    votes: impl IntoIterator<Item = (&'v AccountId, &'v VoteOption)>,
    stake: &dyn StakeProvider,
) -> TallyResult {
    let mut counts = VoteCounts {
        eligible: stake.total_bonded_stake(),
        ..VoteCounts::default()
    };

    for (voter, option) in votes {
        counts.add(*option, u128::from(stake.bonded_stake_of(voter)));
    }

    let participation = counts.participation();

    let verdict = if !params.quorum.is_reached_by(participation, counts.eligible) {
        // Also when there's no stake at all
        TallyVerdict::NoQuorum
    } else if params
        .veto_threshold
        .is_exceeded_by(counts.no_with_veto, participation)
    {
        TallyVerdict::Vetoed
    } else {
        let denominator = match params.abstain_policy {
            AbstainPolicy::ExcludeFromThreshold => counts.yes + counts.no + counts.no_with_veto,
            AbstainPolicy::IncludeInThreshold => participation,
        };

        if committee.vote_threshold.is_exceeded_by(counts.yes, denominator) {
            TallyVerdict::Passed
        } else {
            TallyVerdict::Rejected
        }
    };

    TallyResult { verdict, counts }
}
