use bincode::{Decode, Encode};
use derive_more::{Display, From};
use serde::{Deserialize, Serialize};

/// Instance id of a module within the state machine
#[derive(
    Copy,
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Encode,
    Decode,
    Debug,
    Display,
    From,
    Serialize,
    Deserialize,
)]
#[serde(transparent)]
pub struct ModuleId(u32);

impl ModuleId {
    pub const fn new(id: u32) -> Self {
        Self(id)
    }
}

/// Kind (implementation) of a module
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Encode, Decode, Debug, Display, From)]
pub struct ModuleKind(u32);

impl ModuleKind {
    pub const fn new(kind: u32) -> Self {
        Self(kind)
    }
}
