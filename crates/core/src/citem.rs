use std::sync::Arc;

use bincode::{Decode, Encode};
use derive_more::Deref;

use crate::module::ModuleId;

/// Consensus item in its encoded form
///
/// Each module defines its own citem type; the host only routes the raw
/// bytes to the module they are addressed to.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode, Deref)]
pub struct CItemRaw(pub Arc<[u8]>);

impl From<Vec<u8>> for CItemRaw {
    fn from(value: Vec<u8>) -> Self {
        Self(value.into())
    }
}

/// A citem addressed to a module instance
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct ModuleCItem {
    pub module_id: ModuleId,
    pub inner: CItemRaw,
}
