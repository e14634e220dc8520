use comgov_db::ctx::WriteTransactionCtx;
use comgov_db::error::DbResult;

use crate::{GovApp, tables};

impl GovApp {
    pub(super) fn init_tables_tx(dbtx: &WriteTransactionCtx) -> DbResult<()> {
        dbtx.open_table(&tables::app_last_height::TABLE)?;
        dbtx.open_table(&tables::app_block_in_progress::TABLE)?;
        dbtx.open_table(&tables::app_stake::TABLE)?;
        Ok(())
    }
}
