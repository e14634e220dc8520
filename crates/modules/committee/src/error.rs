use comgov_core::account::AccountId;
use comgov_core::block::{BlockDuration, BlockHeight};
use comgov_core::committee::CommitteeId;
use comgov_core::content::{ContentError, ContentKind};
use comgov_core::proposal::{ProposalId, VoteOption};
use comgov_util_error::Whatever;
use snafu::{FromString as _, Snafu};

/// Rejection of a proposal submission or a vote
///
/// These never leave partial state behind: the citem's transaction is
/// rolled back.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum GovernanceError {
    #[snafu(display("Committee {committee_id} does not exist"))]
    InvalidCommittee { committee_id: CommitteeId },
    #[snafu(display("Account {account} is not a member of committee {committee_id}"))]
    Unauthorized {
        account: AccountId,
        committee_id: CommitteeId,
    },
    #[snafu(display("Committee {committee_id} has no permission for this {kind} content"))]
    PermissionDenied {
        committee_id: CommitteeId,
        kind: ContentKind,
    },
    #[snafu(display("Duration {requested} exceeds committee maximum of {max}"))]
    DurationExceeded {
        requested: BlockDuration,
        max: BlockDuration,
    },
    #[snafu(display("Invalid duration {requested} at height {height}"))]
    InvalidDuration {
        requested: BlockDuration,
        height: BlockHeight,
    },
    #[snafu(display("Proposal {proposal_id} not found or closed for voting"))]
    ProposalNotFound { proposal_id: ProposalId },
    #[snafu(display("Vote option {option} not valid in committee {committee_id}"))]
    InvalidVoteOption {
        option: VoteOption,
        committee_id: CommitteeId,
    },
    #[snafu(display("No proposal ids left to allocate"))]
    ProposalIdsExhausted,
    #[snafu(display("Invalid proposal content"))]
    InvalidContent { source: ContentError },
}

pub type GovernanceResult<T> = Result<T, GovernanceError>;

impl From<GovernanceError> for Whatever {
    fn from(err: GovernanceError) -> Self {
        Whatever::with_source(Box::new(err), "Citem rejected".into())
    }
}
