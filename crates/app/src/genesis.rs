//! Initial state of the whole app
//!
//! Export produces the same format, so a running state can be carried
//! over into a fresh database.

use std::collections::BTreeSet;

use comgov_core::account::AccountId;
use comgov_core::block::BlockHeight;
use comgov_db::error::{DbError, TxSnafu};
use comgov_module::module::db::{ModuleReadTransaction, ModuleWriteTransactionCtx};
use comgov_module_committee::CommitteeModule;
use comgov_module_committee::genesis::{CommitteeGenesis, GenesisError};
use comgov_module_params::ParamsModule;
use comgov_module_params::genesis::{ParamsGenesis, ParamsGenesisError};
use comgov_util_db::redb_bincode::ReadableTable as _;
use serde::{Deserialize, Serialize};
use snafu::{ResultExt as _, Snafu};
use tracing::info;

use crate::block::StakeUpdate;
use crate::{COMMITTEE_MODULE_ID, GovApp, LOG_TARGET, PARAMS_MODULE_ID, tables};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppGenesis {
    /// Height of the last processed block, if continuing an exported state
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_height: Option<BlockHeight>,
    #[serde(default)]
    pub stake: Vec<StakeUpdate>,
    #[serde(default)]
    pub params: ParamsGenesis,
    #[serde(default)]
    pub committee: CommitteeGenesis,
}

#[derive(Debug, Snafu)]
pub enum AppGenesisError {
    #[snafu(display("Duplicate stake entry for {account}"))]
    DuplicateStake { account: AccountId },
    #[snafu(display("App state already initialized"))]
    AlreadyInitialized,
    #[snafu(display("Invalid committee genesis"))]
    Committee { source: GenesisError },
    #[snafu(display("Invalid params genesis"))]
    Params { source: ParamsGenesisError },
}

impl GovApp {
    /// Import `genesis` into an empty state, atomically
    pub async fn import_genesis(&self, genesis: &AppGenesis) -> Result<(), AppGenesisError> {
        let mut accounts = BTreeSet::new();
        for update in &genesis.stake {
            if !accounts.insert(update.account) {
                return DuplicateStakeSnafu {
                    account: update.account,
                }
                .fail();
            }
        }

        self.db
            .write_with_expect_falliable(|dbtx| {
                if Self::get_last_height_tx(dbtx)?.is_some() {
                    return AlreadyInitializedSnafu.fail().context(TxSnafu);
                }

                ParamsModule::import_genesis_tx(
                    &ModuleWriteTransactionCtx::new(PARAMS_MODULE_ID, dbtx),
                    &genesis.params,
                )
                .map_err(|err| err.map(|source| AppGenesisError::Params { source }))?;

                CommitteeModule::import_genesis_tx(
                    &ModuleWriteTransactionCtx::new(COMMITTEE_MODULE_ID, dbtx),
                    &genesis.committee,
                )
                .map_err(|err| err.map(|source| AppGenesisError::Committee { source }))?;

                self.apply_stake_updates_tx(dbtx, &genesis.stake)?;

                if let Some(last_height) = genesis.last_height {
                    Self::save_last_height_tx(dbtx, last_height)?;
                }
                Ok(())
            })
            .await?;

        info!(
            target: LOG_TARGET,
            stake_entries = genesis.stake.len(),
            last_height = ?genesis.last_height,
            "Genesis imported"
        );
        Ok(())
    }

    pub async fn export_genesis(&self) -> AppGenesis {
        self.db
            .read_with_expect(|dbtx| {
                let stake = {
                    let tbl = dbtx.open_table(&tables::app_stake::TABLE)?;
                    tbl.range(..)?
                        .map(|kv| {
                            let (k, v) = kv?;
                            Ok(StakeUpdate {
                                account: k.value(),
                                stake: v.value(),
                            })
                        })
                        .collect::<Result<Vec<_>, DbError>>()?
                };
                let last_height = dbtx
                    .open_table(&tables::app_last_height::TABLE)?
                    .get(&())?
                    .map(|v| v.value());

                Ok(AppGenesis {
                    last_height,
                    stake,
                    params: ParamsModule::export_genesis_tx(&ModuleReadTransaction::new(
                        PARAMS_MODULE_ID,
                        dbtx,
                    ))?,
                    committee: CommitteeModule::export_genesis_tx(&ModuleReadTransaction::new(
                        COMMITTEE_MODULE_ID,
                        dbtx,
                    ))?,
                })
            })
            .await
    }
}
