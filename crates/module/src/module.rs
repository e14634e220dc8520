pub mod db;

use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;
use comgov_core::account::AccountId;
use comgov_core::block::BlockHeight;
use comgov_core::citem::CItemRaw;
use comgov_core::module::ModuleKind;
use comgov_util_error::Whatever;
use db::{DbTxResult, ModuleWriteTransactionCtx};

use crate::effect::CItemEffect;

pub type DynModule = Arc<dyn IModule + Send + Sync>;

#[async_trait]
pub trait IModule: Any {
    fn kind(&self) -> ModuleKind;

    fn display_name(&self) -> &'static str;

    /// Apply a citem sent by `sender` in the block at `height`
    ///
    /// Runs inside the write transaction of the citem; returning
    /// [`DbTxError::TxError`](comgov_db::error::DbTxError::TxError) rejects
    /// the citem and rolls back all its changes.
    fn process_citem(
        &self,
        dbtx: &ModuleWriteTransactionCtx,
        height: BlockHeight,
        sender: AccountId,
        citem: &CItemRaw,
    ) -> DbTxResult<Vec<CItemEffect>, Whatever>;

    /// Called once per block, after all citems of the block were processed
    ///
    /// The module manages its own transactions here.
    async fn end_block(&self, _height: BlockHeight) -> Vec<CItemEffect> {
        vec![]
    }
}
