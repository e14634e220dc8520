//! JSON formats of the replay command

use comgov_app::COMMITTEE_MODULE_ID;
use comgov_app::block::{Block, BlockReport, StakeUpdate};
use comgov_core::account::AccountId;
use comgov_core::block::BlockHeight;
use comgov_module_committee::citem::CommitteeCitem;
use comgov_module_committee::effects::{
    ProposalResolvedEffect, ProposalSubmittedEffect, VoteCastEffect,
};
use comgov_util_error::WhateverResult;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TxScript {
    pub sender: AccountId,
    pub call: CommitteeCitem,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockScript {
    pub height: BlockHeight,
    #[serde(default)]
    pub stake_updates: Vec<StakeUpdate>,
    #[serde(default)]
    pub txs: Vec<TxScript>,
}

impl BlockScript {
    pub fn to_block(&self) -> Block {
        let block = Block {
            height: self.height,
            stake_updates: self.stake_updates.clone(),
            txs: vec![],
        };
        self.txs.iter().fold(block, |block, tx| {
            block.with_tx(tx.sender, COMMITTEE_MODULE_ID, tx.call.encode_to_raw())
        })
    }
}

/// One line of replay output
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ReplayEvent {
    Submitted {
        height: BlockHeight,
        #[serde(flatten)]
        effect: ProposalSubmittedEffect,
    },
    Voted {
        height: BlockHeight,
        #[serde(flatten)]
        effect: VoteCastEffect,
    },
    Resolved {
        #[serde(flatten)]
        effect: ProposalResolvedEffect,
    },
    Rejected {
        height: BlockHeight,
        idx: usize,
        error: String,
    },
}

impl ReplayEvent {
    pub fn from_report(height: BlockHeight, report: &BlockReport) -> WhateverResult<Vec<Self>> {
        let mut events = vec![];
        for effect in &report.effects {
            if let Some(effect) = effect.decode::<ProposalSubmittedEffect>() {
                events.push(Self::Submitted {
                    height,
                    effect: effect?,
                });
            } else if let Some(effect) = effect.decode::<VoteCastEffect>() {
                events.push(Self::Voted {
                    height,
                    effect: effect?,
                });
            } else if let Some(effect) = effect.decode::<ProposalResolvedEffect>() {
                events.push(Self::Resolved { effect: effect? });
            }
        }
        events.extend(report.rejected.iter().map(|rejected| Self::Rejected {
            height,
            idx: rejected.idx,
            error: rejected.error.clone(),
        }));
        Ok(events)
    }
}
