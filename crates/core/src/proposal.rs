use std::fmt;

use bincode::{Decode, Encode};
use comgov_util_array_type::{array_type_fixed_size_define, array_type_fixed_size_impl_serde};
use serde::{Deserialize, Serialize};

use crate::account::AccountId;
use crate::block::BlockHeight;
use crate::committee::CommitteeId;
use crate::content::ProposalContent;

array_type_fixed_size_define! {
    /// Proposal identifier, assigned sequentially starting at one
    #[derive(Encode, Decode, Clone, Copy, Hash)]
    pub struct ProposalId(u64);
}
array_type_fixed_size_impl_serde!(ProposalId);

impl ProposalId {
    pub const FIRST: Self = Self::new(1);
}

#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode, Serialize, Deserialize)]
pub struct Proposal {
    pub id: ProposalId,
    pub committee_id: CommitteeId,
    pub content: ProposalContent,
    pub submitter: AccountId,
    /// First height at which voting is closed and the proposal resolves
    pub deadline: BlockHeight,
}

impl Proposal {
    pub fn is_voting_open(&self, height: BlockHeight) -> bool {
        height < self.deadline
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Encode, Decode, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum VoteOption {
    Yes,
    No,
    Abstain,
    NoWithVeto,
}

impl fmt::Display for VoteOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            VoteOption::Yes => "yes",
            VoteOption::No => "no",
            VoteOption::Abstain => "abstain",
            VoteOption::NoWithVeto => "no_with_veto",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Encode, Decode, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalOutcome {
    Passed,
    Failed,
    /// Not decisive, e.g. quorum was not reached; resolves as failed
    Undecided,
}

impl fmt::Display for ProposalOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ProposalOutcome::Passed => "passed",
            ProposalOutcome::Failed => "failed",
            ProposalOutcome::Undecided => "undecided",
        })
    }
}

/// Why a proposal resolved the way it did
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResolutionReason {
    /// Passed and executed
    Enacted,
    /// Not enough approval
    Rejected,
    NoQuorum,
    Vetoed,
    /// The owning committee no longer exists
    CommitteeDeleted,
    /// Passed, but the committee no longer has the permission for it
    PermissionInvalidated,
    /// Passed, but execution failed; nothing was applied
    ExecutionFailed { error: String },
}

impl fmt::Display for ResolutionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolutionReason::Enacted => f.write_str("enacted"),
            ResolutionReason::Rejected => f.write_str("rejected"),
            ResolutionReason::NoQuorum => f.write_str("no quorum"),
            ResolutionReason::Vetoed => f.write_str("vetoed"),
            ResolutionReason::CommitteeDeleted => f.write_str("committee deleted"),
            ResolutionReason::PermissionInvalidated => f.write_str("permission invalidated"),
            ResolutionReason::ExecutionFailed { error } => {
                f.write_fmt(format_args!("execution failed: {error}"))
            }
        }
    }
}
