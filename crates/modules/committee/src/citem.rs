use bincode::{Decode, Encode};
use comgov_core::bincode::{decode_whole, encode_to_vec};
use comgov_core::block::BlockDuration;
use comgov_core::citem::CItemRaw;
use comgov_core::committee::CommitteeId;
use comgov_core::content::ProposalContent;
use comgov_core::proposal::{ProposalId, VoteOption};
use comgov_util_error::WhateverResult;
use serde::{Deserialize, Serialize};
use snafu::ResultExt as _;

#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitteeCitem {
    /// Submit a proposal, voting on it until `duration` blocks from now
    SubmitProposal {
        committee_id: CommitteeId,
        content: ProposalContent,
        duration: BlockDuration,
    },
    /// Cast or replace the sender's vote
    Vote {
        proposal_id: ProposalId,
        option: VoteOption,
    },
}

impl CommitteeCitem {
    pub fn encode_to_raw(&self) -> CItemRaw {
        CItemRaw::from(encode_to_vec(self))
    }

    pub fn decode_from_raw(citem_raw: &CItemRaw) -> WhateverResult<Self> {
        decode_whole(citem_raw).whatever_context("Failed to decode CommitteeCitem")
    }
}
