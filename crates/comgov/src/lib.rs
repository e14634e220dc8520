// SPDX-License-Identifier: MIT

mod logging;
mod opts;
pub mod script;

use std::mem;
use std::path::Path;
use std::sync::Arc;

use clap::Parser as _;
use comgov_app::GovApp;
use comgov_app::genesis::AppGenesis;
use comgov_core::content::ContentKind;
use comgov_db::Database;
use comgov_module::router::{DynProposalHandler, ProposalRouter};
use comgov_util_error::{Whatever, WhateverResult};
use opts::{Commands, Opts};
use script::{BlockScript, ReplayEvent};
use serde::de::DeserializeOwned;
use snafu::ResultExt as _;
use tracing::info;

const LOG_TARGET: &str = "comgov::cli";

pub struct Comgov;

#[bon::bon]
impl Comgov {
    #[builder(finish_fn = run, start_fn = builder)]
    pub async fn build(#[builder(field)] router: ProposalRouter) -> WhateverResult<()> {
        let opts = Opts::parse();

        logging::init_logging(opts.verbose)?;

        let db = if let Some(data_dir) = opts.data_dir {
            Database::open(data_dir.join("comgov.redb"))
                .await
                .whatever_context::<_, Whatever>("Failed to open database")?
        } else {
            info!(target: LOG_TARGET, "No data dir set, state will not be persisted");
            Database::new_in_memory()
                .await
                .whatever_context::<_, Whatever>("Failed to open database")?
        };

        let app = GovApp::builder()
            .db(Arc::new(db))
            .router(router)
            .build()
            .await;

        match opts.command {
            Commands::Init { genesis } => {
                import_genesis(&app, &genesis).await?;
            }
            Commands::Export => {
                let genesis = app.export_genesis().await;
                println!(
                    "{}",
                    serde_json::to_string_pretty(&genesis)
                        .whatever_context::<_, Whatever>("Failed to serialize genesis")?
                );
            }
            Commands::Replay { blocks, genesis } => {
                if let Some(genesis) = genesis {
                    import_genesis(&app, &genesis).await?;
                }
                let blocks: Vec<BlockScript> = read_json(&blocks).await?;
                for block in &blocks {
                    let report = app
                        .process_block(&block.to_block())
                        .await
                        .whatever_context::<_, Whatever>("Failed to process block")?;
                    for event in ReplayEvent::from_report(block.height, &report)? {
                        println!(
                            "{}",
                            serde_json::to_string(&event)
                                .whatever_context::<_, Whatever>("Failed to serialize event")?
                        );
                    }
                }
            }
        }

        Ok(())
    }
}

impl<BS: comgov_build_builder::State> ComgovBuildBuilder<BS> {
    /// Register an execution handler for proposals of `kind`
    pub fn with_handler(mut self, kind: ContentKind, handler: DynProposalHandler) -> Self {
        if self.router.has_handler(kind) {
            panic!("Multiple handlers of the same content kind {kind}")
        }
        self.router = mem::take(&mut self.router).with_handler(kind, handler);
        self
    }
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> WhateverResult<T> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_whatever_context::<_, _, Whatever>(|_| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content)
        .with_whatever_context::<_, _, Whatever>(|_| format!("Failed to parse {}", path.display()))
}

async fn import_genesis(app: &GovApp, path: &Path) -> WhateverResult<()> {
    let genesis: AppGenesis = read_json(path).await?;
    app.import_genesis(&genesis)
        .await
        .whatever_context::<_, Whatever>("Failed to import genesis")
}
