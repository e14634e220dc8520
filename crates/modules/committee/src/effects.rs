use bincode::{Decode, Encode};
use comgov_core::account::AccountId;
use comgov_core::block::BlockHeight;
use comgov_core::committee::CommitteeId;
use comgov_core::module::ModuleKind;
use comgov_core::proposal::{ProposalId, ProposalOutcome, ResolutionReason, VoteOption};
use comgov_module::effect::{EffectId, EffectKind};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode, Serialize, Deserialize)]
pub struct ProposalSubmittedEffect {
    pub proposal_id: ProposalId,
    pub committee_id: CommitteeId,
    pub submitter: AccountId,
    pub deadline: BlockHeight,
}

impl EffectKind for ProposalSubmittedEffect {
    const MODULE_KIND: ModuleKind = crate::KIND;
    const EFFECT_ID: EffectId = EffectId::new(0);
}

#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode, Serialize, Deserialize)]
pub struct VoteCastEffect {
    pub proposal_id: ProposalId,
    pub voter: AccountId,
    pub option: VoteOption,
}

impl EffectKind for VoteCastEffect {
    const MODULE_KIND: ModuleKind = crate::KIND;
    const EFFECT_ID: EffectId = EffectId::new(1);
}

#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode, Serialize, Deserialize)]
pub struct ProposalResolvedEffect {
    pub proposal_id: ProposalId,
    pub committee_id: CommitteeId,
    pub height: BlockHeight,
    pub outcome: ProposalOutcome,
    pub reason: ResolutionReason,
}

impl EffectKind for ProposalResolvedEffect {
    const MODULE_KIND: ModuleKind = crate::KIND;
    const EFFECT_ID: EffectId = EffectId::new(2);
}
