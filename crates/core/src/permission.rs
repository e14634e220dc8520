//! Committee permissions
//!
//! A closed set of capabilities. Each [`Permission`] is a predicate over
//! [`ProposalContent`]; a [`PermissionSet`] allows content if any of its
//! permissions does. Both submission and resolution go through
//! [`PermissionSet::allows`].

use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use crate::content::{ParamChange, ParamValue, ProposalContent};
use crate::ratio::Ratio;

/// Predicate over the new value of an allowlisted parameter
#[derive(Debug, Clone, Default, PartialEq, Eq, Encode, Decode, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ValueRule {
    #[default]
    Any,
    /// Inclusive bounds; a missing bound is unbounded
    IntRange {
        #[serde(default)]
        min: Option<i64>,
        #[serde(default)]
        max: Option<i64>,
    },
    RatioRange {
        #[serde(default)]
        min: Option<Ratio>,
        #[serde(default)]
        max: Option<Ratio>,
    },
    OneOf { values: Vec<ParamValue> },
}

impl ValueRule {
    pub fn allows(&self, value: &ParamValue) -> bool {
        match (self, value) {
            (ValueRule::Any, _) => true,
            (ValueRule::IntRange { min, max }, ParamValue::Int(v)) => {
                min.is_none_or(|min| min <= *v) && max.is_none_or(|max| *v <= max)
            }
            (ValueRule::RatioRange { min, max }, ParamValue::Ratio(v)) => {
                min.is_none_or(|min| min <= *v) && max.is_none_or(|max| *v <= max)
            }
            (ValueRule::OneOf { values }, v) => values.contains(v),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode, Serialize, Deserialize)]
pub struct AllowedParamChange {
    pub module: String,
    pub key: String,
    #[serde(default)]
    pub rule: ValueRule,
}

impl AllowedParamChange {
    pub fn any(module: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            key: key.into(),
            rule: ValueRule::Any,
        }
    }

    pub fn with_rule(module: impl Into<String>, key: impl Into<String>, rule: ValueRule) -> Self {
        Self {
            module: module.into(),
            key: key.into(),
            rule,
        }
    }

    fn allows(&self, change: &ParamChange) -> bool {
        self.module == change.module && self.key == change.key && self.rule.allows(&change.value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Permission {
    /// Anything, including changes to committees themselves
    Unrestricted,
    /// Only informational content
    TextOnly,
    /// Parameter changes where every single change is allowlisted
    ParamChangeAllowlist { allowed: Vec<AllowedParamChange> },
}

impl Permission {
    pub fn allows(&self, content: &ProposalContent) -> bool {
        match self {
            Permission::Unrestricted => true,
            Permission::TextOnly => matches!(content, ProposalContent::Text { .. }),
            Permission::ParamChangeAllowlist { allowed } => match content {
                ProposalContent::ParamChange { changes, .. } => {
                    !changes.is_empty()
                        && changes
                            .iter()
                            .all(|change| allowed.iter().any(|a| a.allows(change)))
                }
                _ => false,
            },
        }
    }
}

/// Permissions granted to a committee
#[derive(Debug, Clone, Default, PartialEq, Eq, Encode, Decode, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionSet(Vec<Permission>);

impl PermissionSet {
    pub fn new(permissions: Vec<Permission>) -> Self {
        Self(permissions)
    }

    pub fn unrestricted() -> Self {
        Self(vec![Permission::Unrestricted])
    }

    pub fn allows(&self, content: &ProposalContent) -> bool {
        self.0.iter().any(|p| p.allows(content))
    }

    pub fn push(&mut self, permission: Permission) {
        self.0.push(permission);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Permission> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<Permission>> for PermissionSet {
    fn from(value: Vec<Permission>) -> Self {
        Self(value)
    }
}

impl FromIterator<Permission> for PermissionSet {
    fn from_iter<T: IntoIterator<Item = Permission>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}
