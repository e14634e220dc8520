use std::collections::BTreeSet;

use bincode::{Decode, Encode};
use comgov_util_array_type::{array_type_fixed_size_define, array_type_fixed_size_impl_serde};
use serde::{Deserialize, Serialize};
use snafu::{Snafu, ensure};

use crate::account::AccountId;
use crate::block::BlockDuration;
use crate::content::{ProposalContent, is_valid_param_name};
use crate::permission::{Permission, PermissionSet};
use crate::proposal::VoteOption;
use crate::ratio::Ratio;

pub const MAX_COMMITTEE_DESCRIPTION_LEN: usize = 512;

array_type_fixed_size_define! {
    #[derive(Encode, Decode, Clone, Copy, Hash)]
    pub struct CommitteeId(u64);
}
array_type_fixed_size_impl_serde!(CommitteeId);

/// When a committee's proposals get resolved
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Encode, Decode, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TallyOption {
    /// Only once the deadline is reached
    #[default]
    Deadline,
    /// As soon as the proposal would pass, or at the deadline
    FirstPastThePost,
}

/// How `Abstain` votes count in a weighted tally
///
/// Abstentions always count as participation (for quorum) and towards the
/// veto denominator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Encode, Decode, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbstainPolicy {
    /// Pass ratio is `yes / (yes + no + veto)`
    #[default]
    ExcludeFromThreshold,
    /// Pass ratio is `yes / (yes + no + veto + abstain)`
    IncludeInThreshold,
}

#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode, Serialize, Deserialize)]
pub struct WeightedParams {
    /// Minimum fraction of the total bonded stake that has to vote
    pub quorum: Ratio,
    /// Fraction of participating stake voting `NoWithVeto` that rejects the
    /// proposal regardless of other votes (compared strictly)
    #[serde(default = "WeightedParams::default_veto_threshold")]
    pub veto_threshold: Ratio,
    #[serde(default)]
    pub abstain_policy: AbstainPolicy,
}

impl WeightedParams {
    pub fn new(quorum: Ratio) -> Self {
        Self {
            quorum,
            veto_threshold: Self::default_veto_threshold(),
            abstain_policy: AbstainPolicy::default(),
        }
    }

    pub fn default_veto_threshold() -> Ratio {
        Ratio::new(1, 3).expect("Can't fail")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Encode, Decode, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CommitteeKind {
    /// One vote per member, members listed explicitly
    #[default]
    Fixed,
    /// Votes weighted by the voter's bonded stake at tally time
    Weighted(WeightedParams),
}

impl CommitteeKind {
    pub fn is_fixed(&self) -> bool {
        matches!(self, CommitteeKind::Fixed)
    }
}

/// A group allowed to enact a restricted set of changes
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode, Serialize, Deserialize)]
pub struct Committee {
    pub id: CommitteeId,
    #[serde(default)]
    pub description: String,
    /// Voters of a `Fixed` committee; for `Weighted` ones an allowlist of
    /// submitters, where empty means anyone
    #[serde(default)]
    pub members: BTreeSet<AccountId>,
    pub permissions: PermissionSet,
    pub vote_threshold: Ratio,
    pub max_proposal_duration: BlockDuration,
    #[serde(default)]
    pub tally_option: TallyOption,
    #[serde(default)]
    pub kind: CommitteeKind,
}

#[derive(Debug, Snafu, PartialEq, Eq)]
pub enum CommitteeError {
    #[snafu(display("Description too long: {len} bytes"))]
    DescriptionTooLong { len: usize },
    #[snafu(display("Fixed committee must have members"))]
    NoMembers,
    #[snafu(display("Vote threshold must be greater than zero"))]
    ZeroThreshold,
    #[snafu(display("Max proposal duration must be greater than zero"))]
    ZeroMaxDuration,
    #[snafu(display("Invalid allowlist entry: {module}.{key}"))]
    InvalidAllowlistEntry { module: String, key: String },
    #[snafu(display("Duplicate allowlist entry: {module}.{key}"))]
    DuplicateAllowlistEntry { module: String, key: String },
}

pub type CommitteeResult<T> = Result<T, CommitteeError>;

#[bon::bon]
impl Committee {
    #[builder]
    pub fn new(
        id: CommitteeId,
        #[builder(default)] description: String,
        #[builder(default)] members: BTreeSet<AccountId>,
        #[builder(default)] permissions: PermissionSet,
        vote_threshold: Ratio,
        max_proposal_duration: BlockDuration,
        #[builder(default)] tally_option: TallyOption,
        #[builder(default)] kind: CommitteeKind,
    ) -> Self {
        Self {
            id,
            description,
            members,
            permissions,
            vote_threshold,
            max_proposal_duration,
            tally_option,
            kind,
        }
    }
}

impl Committee {
    pub fn validate(&self) -> CommitteeResult<()> {
        ensure!(
            self.description.len() <= MAX_COMMITTEE_DESCRIPTION_LEN,
            DescriptionTooLongSnafu {
                len: self.description.len()
            }
        );
        if self.kind.is_fixed() {
            ensure!(!self.members.is_empty(), NoMembersSnafu);
        }
        // `Ratio` can't exceed one, and neither can quorum or veto
        ensure!(!self.vote_threshold.is_zero(), ZeroThresholdSnafu);
        ensure!(!self.max_proposal_duration.is_zero(), ZeroMaxDurationSnafu);

        for permission in self.permissions.iter() {
            let Permission::ParamChangeAllowlist { allowed } = permission else {
                continue;
            };
            let mut seen = BTreeSet::new();
            for entry in allowed {
                ensure!(
                    is_valid_param_name(&entry.module) && is_valid_param_name(&entry.key),
                    InvalidAllowlistEntrySnafu {
                        module: &entry.module,
                        key: &entry.key,
                    }
                );
                ensure!(
                    seen.insert((entry.module.as_str(), entry.key.as_str())),
                    DuplicateAllowlistEntrySnafu {
                        module: &entry.module,
                        key: &entry.key,
                    }
                );
            }
        }

        Ok(())
    }

    pub fn is_member(&self, account: &AccountId) -> bool {
        self.members.contains(account)
    }

    pub fn allows_submitter(&self, account: &AccountId) -> bool {
        match self.kind {
            CommitteeKind::Fixed => self.is_member(account),
            CommitteeKind::Weighted(_) => self.members.is_empty() || self.is_member(account),
        }
    }

    /// Weighted committees accept votes from anyone; weight comes from stake
    pub fn allows_voter(&self, account: &AccountId) -> bool {
        match self.kind {
            CommitteeKind::Fixed => self.is_member(account),
            CommitteeKind::Weighted(_) => true,
        }
    }

    pub fn permits(&self, content: &ProposalContent) -> bool {
        self.permissions.allows(content)
    }

    pub fn is_valid_vote_option(&self, option: VoteOption) -> bool {
        match self.kind {
            CommitteeKind::Fixed => matches!(option, VoteOption::Yes | VoteOption::No),
            CommitteeKind::Weighted(_) => true,
        }
    }
}
