use comgov_core::content::{ParamChange, ParamValue, ProposalContent};
use comgov_core::module::ModuleId;
use comgov_db::ctx::WriteTransactionCtx;
use comgov_db::error::{DbTxResult, TxSnafu};
use comgov_module::module::db::ModuleWriteTransactionCtx;
use comgov_module::router::ProposalHandler;
use comgov_util_error::{Whatever, WhateverResult};
use snafu::{OptionExt as _, ResultExt as _, ensure_whatever};
use tracing::info;

use crate::{LOG_TARGET, ParamsModule, tables};

/// Applies `ParamChange` proposals
///
/// Only existing parameters can be changed, and only to a value of the same
/// type. A single bad change fails the whole proposal.
pub struct ParamChangeHandler {
    module_id: ModuleId,
}

impl ParamChangeHandler {
    pub fn new(module_id: ModuleId) -> Self {
        Self { module_id }
    }
}

fn check_change(change: &ParamChange, current: Option<&ParamValue>) -> WhateverResult<()> {
    let current = current.with_whatever_context(|| {
        format!("Unknown parameter {}.{}", change.module, change.key)
    })?;
    ensure_whatever!(
        current.kind() == change.value.kind(),
        "Parameter {}.{} is {}, not {}",
        change.module,
        change.key,
        current.kind(),
        change.value.kind()
    );
    Ok(())
}

impl ProposalHandler for ParamChangeHandler {
    fn execute(
        &self,
        dbtx: &WriteTransactionCtx,
        content: &ProposalContent,
    ) -> DbTxResult<(), Whatever> {
        let ProposalContent::ParamChange { changes, .. } = content else {
            return None
                .whatever_context("Not a param change")
                .context(TxSnafu);
        };

        let dbtx = ModuleWriteTransactionCtx::new(self.module_id, dbtx);
        for change in changes {
            let current = ParamsModule::get_param_tx(&dbtx, &change.module, &change.key)?;
            check_change(change, current.as_ref()).context(TxSnafu)?;

            dbtx.open_table(&tables::params::TABLE)?.insert(
                &(change.module.clone(), change.key.clone()),
                &change.value,
            )?;

            info!(
                target: LOG_TARGET,
                module = %change.module,
                key = %change.key,
                value = %change.value,
                "Parameter changed"
            );
        }
        Ok(())
    }
}
