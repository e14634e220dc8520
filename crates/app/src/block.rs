use comgov_core::Weight;
use comgov_core::account::AccountId;
use comgov_core::block::BlockHeight;
use comgov_core::citem::CItemRaw;
use comgov_core::module::ModuleId;
use comgov_module::effect::ModuleCItemEffect;
use serde::{Deserialize, Serialize};

/// New bonded stake of an account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakeUpdate {
    pub account: AccountId,
    pub stake: Weight,
}

/// Authenticated citem, addressed to a module
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tx {
    pub sender: AccountId,
    pub module_id: ModuleId,
    pub citem: CItemRaw,
}

/// Finalized block, as handed over by the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub height: BlockHeight,
    /// Applied before any of the `txs`
    pub stake_updates: Vec<StakeUpdate>,
    pub txs: Vec<Tx>,
}

impl Block {
    pub fn new(height: BlockHeight) -> Self {
        Self {
            height,
            stake_updates: vec![],
            txs: vec![],
        }
    }

    pub fn with_tx(mut self, sender: AccountId, module_id: ModuleId, citem: CItemRaw) -> Self {
        self.txs.push(Tx {
            sender,
            module_id,
            citem,
        });
        self
    }

    pub fn with_stake(mut self, account: AccountId, stake: Weight) -> Self {
        self.stake_updates.push(StakeUpdate { account, stake });
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedTx {
    /// Position of the tx in the block
    pub idx: usize,
    pub module_id: ModuleId,
    pub error: String,
}

/// What processing a block did
#[derive(Debug, Clone, Default)]
pub struct BlockReport {
    /// Effects of accepted txs in order, followed by end-of-block effects
    pub effects: Vec<ModuleCItemEffect>,
    pub rejected: Vec<RejectedTx>,
}
