// SPDX-License-Identifier: MIT

//! Application layer of the governance engine
//!
//! Takes finalized blocks from the host and applies them to the modules:
//! stake updates first, then every tx in its own transaction, then the
//! end-of-block hook of each module (which is where proposals get
//! resolved).
pub mod block;
pub mod genesis;

mod db;
mod init;
mod process_block;
mod tables;

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use comgov_core::content::ContentKind;
use comgov_core::module::ModuleId;
use comgov_db::Database;
use comgov_module::module::DynModule;
use comgov_module::module::db::ModuleDatabase;
use comgov_module::router::{NoopHandler, ProposalRouter};
use comgov_module::stake::StakeTable;
use comgov_module_committee::CommitteeModule;
use comgov_module_params::ParamsModule;
use tracing::info;

pub use self::process_block::{ProcessBlockError, ProcessBlockResult};

/// Committee module is always there at a fixed id
pub const COMMITTEE_MODULE_ID: ModuleId = ModuleId::new(0);
/// Params module is always there at a fixed id
pub const PARAMS_MODULE_ID: ModuleId = ModuleId::new(1);

const LOG_TARGET: &str = "comgov::app";

/// The governance state machine
pub struct GovApp {
    /// Database storing tables of this and all modules
    db: Arc<Database>,

    /// Bonded stake, mirrored from the `app_stake` table
    stake: Arc<RwLock<StakeTable>>,

    committee: Arc<CommitteeModule>,
    params: Arc<ParamsModule>,

    /// All modules by id, for routing txs
    modules: BTreeMap<ModuleId, DynModule>,
}

#[bon::bon]
impl GovApp {
    /// Set up the app over `db`, loading any state it already has
    ///
    /// `router` can carry execution handlers for content kinds beyond the
    /// built-in ones.
    #[builder]
    pub async fn new(db: Arc<Database>, #[builder(default)] router: ProposalRouter) -> Self {
        db.write_with_expect(Self::init_tables_tx).await;

        let stake = Arc::new(RwLock::new(Self::load_stake(&db).await));

        let params = Arc::new(
            ParamsModule::new(ModuleDatabase::new(PARAMS_MODULE_ID, db.clone())).await,
        );

        let router = router
            .with_handler(ContentKind::Text, Arc::new(NoopHandler))
            .with_handler(ContentKind::ParamChange, Arc::new(params.handler()));

        let committee = Arc::new(
            CommitteeModule::builder()
                .db(ModuleDatabase::new(COMMITTEE_MODULE_ID, db.clone()))
                .router(router)
                .stake(stake.clone())
                .build()
                .await,
        );

        let modules = BTreeMap::from([
            (COMMITTEE_MODULE_ID, committee.clone() as DynModule),
            (PARAMS_MODULE_ID, params.clone() as DynModule),
        ]);

        info!(
            target: LOG_TARGET,
            ephemeral = db.is_ephemeral(),
            modules = modules.len(),
            "Governance app ready"
        );

        Self {
            db,
            stake,
            committee,
            params,
            modules,
        }
    }
}

impl GovApp {
    pub fn committee(&self) -> &CommitteeModule {
        &self.committee
    }

    pub fn params(&self) -> &ParamsModule {
        &self.params
    }

    pub fn stake(&self) -> StakeTable {
        self.stake.read().expect("Locking failed").clone()
    }

    pub fn db(&self) -> &Arc<Database> {
        &self.db
    }
}
