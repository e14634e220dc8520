use std::sync::Arc;

use bincode::{Decode, Encode};
use comgov_core::bincode::{decode_whole, encode_to_vec};
use comgov_core::module::ModuleKind;
use comgov_util_error::WhateverResult;
use derive_more::Deref;
use snafu::{ResultExt as _, ensure_whatever};

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Encode, Decode)]
pub struct EffectId(u32);

impl EffectId {
    pub const fn new(id: u32) -> Self {
        Self(id)
    }
}

/// An observable outcome of processing a citem or a block
///
/// Effects are the event stream of the state machine: they are returned to
/// the host (and anything else interested) after the state transition that
/// produced them committed.
pub trait EffectKind: Encode + Decode<()> {
    const MODULE_KIND: ModuleKind;
    const EFFECT_ID: EffectId;
}

pub trait EffectKindExt: EffectKind + Sized {
    fn encode(&self) -> CItemEffect {
        CItemEffect {
            effect_id: Self::EFFECT_ID,
            raw: encode_to_vec(self).into(),
        }
    }

    fn decode(effect: &CItemEffect) -> WhateverResult<Self> {
        ensure_whatever!(
            effect.effect_id == Self::EFFECT_ID,
            "Effect id mismatch: {:?} != {:?}",
            effect.effect_id,
            Self::EFFECT_ID
        );
        decode_whole(&effect.raw).whatever_context("Failed to decode effect")
    }
}

impl<T> EffectKindExt for T where T: EffectKind {}

#[derive(Debug, Clone, Deref, Encode, Decode)]
pub struct CItemEffect {
    pub effect_id: EffectId,
    #[deref]
    pub raw: Arc<[u8]>,
}

/// [`CItemEffect`] tagged with the kind of module that produced it
#[derive(Debug, Clone, Encode, Decode)]
pub struct ModuleCItemEffect {
    module_kind: ModuleKind,
    inner: CItemEffect,
}

impl ModuleCItemEffect {
    pub fn new(module_kind: ModuleKind, inner: CItemEffect) -> Self {
        Self { module_kind, inner }
    }

    pub fn module_kind(&self) -> ModuleKind {
        self.module_kind
    }

    pub fn inner(&self) -> &CItemEffect {
        &self.inner
    }

    /// Decode as `K`, or `None` if it's an effect of a different kind
    pub fn decode<K>(&self) -> Option<WhateverResult<K>>
    where
        K: EffectKind,
    {
        if self.module_kind != K::MODULE_KIND || self.inner.effect_id != K::EFFECT_ID {
            return None;
        }
        Some(<K as EffectKindExt>::decode(&self.inner))
    }
}
