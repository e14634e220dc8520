use std::collections::BTreeSet;

use comgov_core::content::{ParamValue, is_valid_param_name};
use comgov_db::error::TxSnafu;
use comgov_module::module::db::{
    DbResult, DbTxResult, ModuleReadableTransaction, ModuleWriteTransactionCtx,
};
use comgov_util_db::redb_bincode::ReadableTable as _;
use serde::{Deserialize, Serialize};
use snafu::{ResultExt as _, Snafu, ensure};
use tracing::info;

use crate::{LOG_TARGET, ParamsModule, tables};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamEntry {
    pub module: String,
    pub key: String,
    pub value: ParamValue,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamsGenesis {
    #[serde(default)]
    pub params: Vec<ParamEntry>,
}

#[derive(Debug, Snafu)]
pub enum ParamsGenesisError {
    #[snafu(display("Invalid parameter name {module}.{key}"))]
    InvalidName { module: String, key: String },
    #[snafu(display("Duplicate parameter {module}.{key}"))]
    Duplicate { module: String, key: String },
    #[snafu(display("Parameters already initialized"))]
    AlreadyInitialized,
}

impl ParamsGenesis {
    pub fn validate(&self) -> Result<(), ParamsGenesisError> {
        let mut seen = BTreeSet::new();
        for ParamEntry { module, key, .. } in &self.params {
            ensure!(
                is_valid_param_name(module) && is_valid_param_name(key),
                InvalidNameSnafu { module, key }
            );
            ensure!(
                seen.insert((module, key)),
                DuplicateSnafu { module, key }
            );
        }
        Ok(())
    }
}

impl ParamsModule {
    pub fn import_genesis_tx(
        dbtx: &ModuleWriteTransactionCtx,
        genesis: &ParamsGenesis,
    ) -> DbTxResult<(), ParamsGenesisError> {
        genesis.validate().context(TxSnafu)?;

        let mut tbl = dbtx.open_table(&tables::params::TABLE)?;
        if tbl.range(..)?.next().is_some() {
            return AlreadyInitializedSnafu.fail().context(TxSnafu);
        }
        for entry in &genesis.params {
            tbl.insert(&(entry.module.clone(), entry.key.clone()), &entry.value)?;
        }

        info!(
            target: LOG_TARGET,
            params = genesis.params.len(),
            "Params genesis imported"
        );
        Ok(())
    }

    pub fn export_genesis_tx<'dbtx>(
        dbtx: &impl ModuleReadableTransaction<'dbtx>,
    ) -> DbResult<ParamsGenesis> {
        Ok(ParamsGenesis {
            params: Self::get_params_tx(dbtx)?
                .into_iter()
                .map(|((module, key), value)| ParamEntry { module, key, value })
                .collect(),
        })
    }

    pub async fn export_genesis(&self) -> ParamsGenesis {
        self.db
            .read_with_expect(|dbtx| Self::export_genesis_tx(dbtx))
            .await
    }
}
