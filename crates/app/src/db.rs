use comgov_core::block::BlockHeight;
use comgov_db::Database;
use comgov_db::ctx::WriteTransactionCtx;
use comgov_db::error::DbResult;
use comgov_module::stake::StakeTable;
use comgov_util_db::redb_bincode::ReadableTable as _;

use crate::block::StakeUpdate;
use crate::{GovApp, tables};

impl GovApp {
    pub async fn get_last_height(&self) -> Option<BlockHeight> {
        self.db
            .read_with_expect(|dbtx| {
                let tbl = dbtx.open_table(&tables::app_last_height::TABLE)?;
                Ok(tbl.get(&())?.map(|v| v.value()))
            })
            .await
    }

    pub(crate) fn get_last_height_tx(dbtx: &WriteTransactionCtx) -> DbResult<Option<BlockHeight>> {
        let tbl = dbtx.open_table(&tables::app_last_height::TABLE)?;
        Ok(tbl.get(&())?.map(|v| v.value()))
    }

    pub(crate) fn save_last_height_tx(
        dbtx: &WriteTransactionCtx,
        height: BlockHeight,
    ) -> DbResult<()> {
        let mut tbl = dbtx.open_table(&tables::app_last_height::TABLE)?;

        let _ = tbl.insert(&(), &height)?;
        Ok(())
    }

    pub(crate) fn get_block_in_progress_tx(
        dbtx: &WriteTransactionCtx,
    ) -> DbResult<Option<BlockHeight>> {
        let tbl = dbtx.open_table(&tables::app_block_in_progress::TABLE)?;
        Ok(tbl.get(&())?.map(|v| v.value()))
    }

    pub(crate) fn start_block_tx(dbtx: &WriteTransactionCtx, height: BlockHeight) -> DbResult<()> {
        dbtx.open_table(&tables::app_block_in_progress::TABLE)?
            .insert(&(), &height)?;
        Ok(())
    }

    /// Clear the in-progress marker and record `height` as done
    pub(crate) fn finish_block_tx(dbtx: &WriteTransactionCtx, height: BlockHeight) -> DbResult<()> {
        dbtx.open_table(&tables::app_block_in_progress::TABLE)?
            .remove(&())?;
        Self::save_last_height_tx(dbtx, height)
    }

    pub(crate) async fn load_stake(db: &Database) -> StakeTable {
        db.read_with_expect(|dbtx| {
            let tbl = dbtx.open_table(&tables::app_stake::TABLE)?;
            tbl.range(..)?
                .map(|kv| {
                    let (k, v) = kv?;
                    Ok((k.value(), v.value()))
                })
                .collect()
        })
        .await
    }

    /// Persist stake updates; the in-memory table follows on commit
    pub(crate) fn apply_stake_updates_tx(
        &self,
        dbtx: &WriteTransactionCtx,
        updates: &[StakeUpdate],
    ) -> DbResult<()> {
        if updates.is_empty() {
            return Ok(());
        }

        let mut tbl = dbtx.open_table(&tables::app_stake::TABLE)?;
        for update in updates {
            if update.stake == 0 {
                tbl.remove(&update.account)?;
            } else {
                tbl.insert(&update.account, &update.stake)?;
            }
        }

        let stake = self.stake.clone();
        let updates = updates.to_vec();
        dbtx.on_commit(move || {
            let mut stake = stake.write().expect("Locking failed");
            for update in updates {
                stake.set(update.account, update.stake);
            }
        });
        Ok(())
    }
}
