//! Proposal content
//!
//! The engine routes content by its [`ContentKind`] and otherwise treats it
//! as opaque, except for the checks needed to evaluate permissions.

use std::collections::BTreeSet;
use std::fmt;

use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};
use snafu::{ResultExt as _, Snafu, ensure};

use crate::committee::{Committee, CommitteeError, CommitteeId};
use crate::ratio::Ratio;

pub const MAX_TITLE_LEN: usize = 140;
pub const MAX_DESCRIPTION_LEN: usize = 5000;
pub const MAX_PARAM_NAME_LEN: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Ratio(Ratio),
    Text(String),
}

impl ParamValue {
    pub fn kind(&self) -> ParamValueKind {
        match self {
            ParamValue::Bool(_) => ParamValueKind::Bool,
            ParamValue::Int(_) => ParamValueKind::Int,
            ParamValue::Ratio(_) => ParamValueKind::Ratio,
            ParamValue::Text(_) => ParamValueKind::Text,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Bool(v) => fmt::Display::fmt(v, f),
            ParamValue::Int(v) => fmt::Display::fmt(v, f),
            ParamValue::Ratio(v) => fmt::Display::fmt(v, f),
            ParamValue::Text(v) => f.write_fmt(format_args!("{v:?}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum ParamValueKind {
    Bool,
    Int,
    Ratio,
    Text,
}

/// A single parameter update: `module.key = value`
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode, Serialize, Deserialize)]
pub struct ParamChange {
    pub module: String,
    pub key: String,
    pub value: ParamValue,
}

/// Content type tag, used to look up the execution handler
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Encode,
    Decode,
    Serialize,
    Deserialize,
    derive_more::Display,
)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Text,
    ParamChange,
    CommitteeChange,
    CommitteeDelete,
}

#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProposalContent {
    /// Informational only, changes no state
    Text { title: String, description: String },
    ParamChange {
        title: String,
        description: String,
        changes: Vec<ParamChange>,
    },
    /// Insert a committee, or replace the one with the same id
    CommitteeChange {
        title: String,
        description: String,
        committee: Committee,
    },
    CommitteeDelete {
        title: String,
        description: String,
        committee_id: CommitteeId,
    },
}

#[derive(Debug, Snafu)]
pub enum ContentError {
    #[snafu(display("Title must not be empty"))]
    EmptyTitle,
    #[snafu(display("Title too long: {len} bytes"))]
    TitleTooLong { len: usize },
    #[snafu(display("Description too long: {len} bytes"))]
    DescriptionTooLong { len: usize },
    #[snafu(display("Parameter change list is empty"))]
    NoChanges,
    #[snafu(display("Invalid parameter name: {module}.{key}"))]
    InvalidParamName { module: String, key: String },
    #[snafu(display("Parameter changed more than once: {module}.{key}"))]
    DuplicateParam { module: String, key: String },
    #[snafu(display("Invalid committee"))]
    InvalidCommittee { source: CommitteeError },
}

pub type ContentResult<T> = Result<T, ContentError>;

impl ProposalContent {
    pub fn kind(&self) -> ContentKind {
        match self {
            ProposalContent::Text { .. } => ContentKind::Text,
            ProposalContent::ParamChange { .. } => ContentKind::ParamChange,
            ProposalContent::CommitteeChange { .. } => ContentKind::CommitteeChange,
            ProposalContent::CommitteeDelete { .. } => ContentKind::CommitteeDelete,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            ProposalContent::Text { title, .. }
            | ProposalContent::ParamChange { title, .. }
            | ProposalContent::CommitteeChange { title, .. }
            | ProposalContent::CommitteeDelete { title, .. } => title,
        }
    }

    pub fn description(&self) -> &str {
        match self {
            ProposalContent::Text { description, .. }
            | ProposalContent::ParamChange { description, .. }
            | ProposalContent::CommitteeChange { description, .. }
            | ProposalContent::CommitteeDelete { description, .. } => description,
        }
    }

    /// Stateless well-formedness checks
    pub fn validate(&self) -> ContentResult<()> {
        let title = self.title();
        ensure!(!title.trim().is_empty(), EmptyTitleSnafu);
        ensure!(
            title.len() <= MAX_TITLE_LEN,
            TitleTooLongSnafu { len: title.len() }
        );
        let description = self.description();
        ensure!(
            description.len() <= MAX_DESCRIPTION_LEN,
            DescriptionTooLongSnafu {
                len: description.len()
            }
        );

        match self {
            ProposalContent::Text { .. } | ProposalContent::CommitteeDelete { .. } => {}
            ProposalContent::ParamChange { changes, .. } => {
                ensure!(!changes.is_empty(), NoChangesSnafu);

                let mut seen = BTreeSet::new();
                for change in changes {
                    ensure!(
                        is_valid_param_name(&change.module) && is_valid_param_name(&change.key),
                        InvalidParamNameSnafu {
                            module: &change.module,
                            key: &change.key,
                        }
                    );
                    ensure!(
                        seen.insert((change.module.as_str(), change.key.as_str())),
                        DuplicateParamSnafu {
                            module: &change.module,
                            key: &change.key,
                        }
                    );
                }
            }
            ProposalContent::CommitteeChange { committee, .. } => {
                committee.validate().context(InvalidCommitteeSnafu)?;
            }
        }

        Ok(())
    }
}

pub fn is_valid_param_name(s: &str) -> bool {
    !s.is_empty()
        && s.len() <= MAX_PARAM_NAME_LEN
        && s.bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}
