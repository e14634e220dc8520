use std::collections::BTreeMap;

use async_trait::async_trait;
use comgov_core::account::AccountId;
use comgov_core::block::BlockHeight;
use comgov_core::citem::CItemRaw;
use comgov_core::content::ParamValue;
use comgov_core::module::ModuleKind;
use comgov_db::error::TxSnafu;
use comgov_module::effect::CItemEffect;
use comgov_module::module::IModule;
use comgov_module::module::db::{
    DbResult, DbTxResult, ModuleDatabase, ModuleReadableTransaction, ModuleWriteTransactionCtx,
};
use comgov_util_db::redb_bincode::ReadableTable as _;
use comgov_util_error::Whatever;
use snafu::{OptionExt as _, ResultExt as _};
use tracing::debug;

use crate::handler::ParamChangeHandler;
use crate::{LOG_TARGET, tables};

pub type ParamKey = (String, String);

pub struct ParamsModule {
    pub(crate) db: ModuleDatabase,
}

impl ParamsModule {
    pub async fn new(db: ModuleDatabase) -> Self {
        db.write_with_expect(Self::init_db_tx).await;
        Self { db }
    }

    pub(crate) fn init_db_tx(dbtx: &ModuleWriteTransactionCtx) -> DbResult<()> {
        dbtx.open_table(&tables::params::TABLE)?;
        Ok(())
    }

    pub fn module_db(&self) -> &ModuleDatabase {
        &self.db
    }

    /// Execution handler for `ParamChange` content, writing to this module
    pub fn handler(&self) -> ParamChangeHandler {
        ParamChangeHandler::new(self.db.module_id())
    }

    pub async fn get_param(&self, module: &str, key: &str) -> Option<ParamValue> {
        self.db
            .read_with_expect(|dbtx| Self::get_param_tx(dbtx, module, key))
            .await
    }

    pub async fn get_params(&self) -> BTreeMap<ParamKey, ParamValue> {
        self.db
            .read_with_expect(|dbtx| Self::get_params_tx(dbtx))
            .await
    }

    pub fn get_param_tx<'dbtx>(
        dbtx: &impl ModuleReadableTransaction<'dbtx>,
        module: &str,
        key: &str,
    ) -> DbResult<Option<ParamValue>> {
        let tbl = dbtx.open_table(&tables::params::TABLE)?;
        Ok(tbl
            .get(&(module.to_owned(), key.to_owned()))?
            .map(|v| v.value()))
    }

    pub fn get_params_tx<'dbtx>(
        dbtx: &impl ModuleReadableTransaction<'dbtx>,
    ) -> DbResult<BTreeMap<ParamKey, ParamValue>> {
        let tbl = dbtx.open_table(&tables::params::TABLE)?;
        tbl.range(..)?
            .map(|kv| {
                let (k, v) = kv?;
                Ok((k.value(), v.value()))
            })
            .collect()
    }
}

#[async_trait]
impl IModule for ParamsModule {
    fn kind(&self) -> ModuleKind {
        crate::KIND
    }

    fn display_name(&self) -> &'static str {
        "Params"
    }

    fn process_citem(
        &self,
        _dbtx: &ModuleWriteTransactionCtx,
        height: BlockHeight,
        sender: AccountId,
        _citem: &CItemRaw,
    ) -> DbTxResult<Vec<CItemEffect>, Whatever> {
        debug!(
            target: LOG_TARGET,
            %height,
            sender = %sender.to_short(),
            "Rejecting citem"
        );
        None.whatever_context("Parameters can only be changed by proposals")
            .context(TxSnafu)
    }
}
