use comgov_core::block::BlockHeight;
use comgov_core::module::ModuleId;
use comgov_db::error::TxSnafu;
use comgov_module::effect::ModuleCItemEffect;
use comgov_module::module::db::ModuleWriteTransactionCtx;
use comgov_util_error::Whatever;
use comgov_util_error::fmt::FmtCompact as _;
use snafu::{OptionExt as _, ResultExt as _, Snafu};
use tracing::{debug, info};

use crate::block::{Block, BlockReport, RejectedTx, Tx};
use crate::{GovApp, LOG_TARGET};

#[derive(Debug, Snafu)]
pub enum ProcessBlockError {
    #[snafu(display("Block {height} does not follow the last processed block {last}"))]
    HeightNotIncreasing {
        height: BlockHeight,
        last: BlockHeight,
    },
    #[snafu(display("Processing of block {height} was interrupted; state holds a partial block"))]
    Interrupted { height: BlockHeight },
}

pub type ProcessBlockResult<T> = Result<T, ProcessBlockError>;

#[derive(Debug, Snafu)]
pub enum ProcessTxError {
    #[snafu(display("Unknown module {module_id}"))]
    UnknownModuleId { module_id: ModuleId },
    #[snafu(display("Module {module_id} rejected the citem"))]
    ProcessingCItemFailed {
        source: Whatever,
        module_id: ModuleId,
    },
}

impl GovApp {
    /// Apply a finalized block
    ///
    /// Rejected txs are reported, not fatal. A block that does not advance
    /// the height is refused before anything is applied.
    ///
    /// Stake updates, each tx, and the end-of-block hooks commit separately.
    /// If the process dies half way, every later call fails with
    /// [`ProcessBlockError::Interrupted`] instead of applying the rest of the
    /// block, or the whole block a second time, on top of a partial one.
    pub async fn process_block(&self, block: &Block) -> ProcessBlockResult<BlockReport> {
        let height = block.height;
        debug!(
            target: LOG_TARGET,
            %height,
            txs = block.txs.len(),
            stake_updates = block.stake_updates.len(),
            "Processing block..."
        );

        self.db
            .write_with_expect_falliable(|dbtx| {
                if let Some(interrupted) = Self::get_block_in_progress_tx(dbtx)? {
                    return InterruptedSnafu {
                        height: interrupted,
                    }
                    .fail()
                    .context(TxSnafu);
                }
                if let Some(last) = Self::get_last_height_tx(dbtx)? {
                    if height <= last {
                        return HeightNotIncreasingSnafu { height, last }
                            .fail()
                            .context(TxSnafu);
                    }
                }
                Self::start_block_tx(dbtx, height)?;
                self.apply_stake_updates_tx(dbtx, &block.stake_updates)?;
                Ok(())
            })
            .await?;

        let mut report = BlockReport::default();

        for (idx, tx) in block.txs.iter().enumerate() {
            match self.process_tx(height, tx).await {
                Ok(effects) => report.effects.extend(effects),
                Err(err) => {
                    debug!(
                        target: LOG_TARGET,
                        %height,
                        idx,
                        sender = %tx.sender.to_short(),
                        err = %err.fmt_compact(),
                        "Tx rejected"
                    );
                    report.rejected.push(RejectedTx {
                        idx,
                        module_id: tx.module_id,
                        error: err.fmt_compact().to_string(),
                    });
                }
            }
        }

        for module in self.modules.values() {
            let module_kind = module.kind();
            report.effects.extend(
                module
                    .end_block(height)
                    .await
                    .into_iter()
                    .map(|effect| ModuleCItemEffect::new(module_kind, effect)),
            );
        }

        self.db
            .write_with_expect(|dbtx| Self::finish_block_tx(dbtx, height))
            .await;

        info!(
            target: LOG_TARGET,
            %height,
            effects = report.effects.len(),
            rejected = report.rejected.len(),
            "Block processed"
        );
        Ok(report)
    }

    async fn process_tx(
        &self,
        height: BlockHeight,
        tx: &Tx,
    ) -> Result<Vec<ModuleCItemEffect>, ProcessTxError> {
        let module_id = tx.module_id;
        let module = self
            .modules
            .get(&module_id)
            .context(UnknownModuleIdSnafu { module_id })?;
        let module_kind = module.kind();

        self.db
            .write_with_expect_falliable(|dbtx| {
                let module_dbtx = ModuleWriteTransactionCtx::new(module_id, dbtx);

                Ok(module
                    .process_citem(&module_dbtx, height, tx.sender, &tx.citem)
                    .map_err(|err| {
                        err.map(|source| ProcessTxError::ProcessingCItemFailed { source, module_id })
                    })?
                    .into_iter()
                    .map(|effect| ModuleCItemEffect::new(module_kind, effect))
                    .collect())
            })
            .await
    }
}
