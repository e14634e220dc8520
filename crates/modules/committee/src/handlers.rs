//! Execution of committee content
//!
//! Committees can manage committees (including themselves), given an
//! `Unrestricted` permission.

use std::sync::Arc;

use comgov_core::content::{ContentKind, ProposalContent};
use comgov_core::module::ModuleId;
use comgov_db::ctx::WriteTransactionCtx;
use comgov_db::error::{DbTxResult, TxSnafu};
use comgov_module::module::db::ModuleWriteTransactionCtx;
use comgov_module::router::{ProposalHandler, ProposalRouter};
use comgov_util_error::Whatever;
use snafu::{OptionExt as _, ResultExt as _};
use tracing::info;

use crate::{LOG_TARGET, tables};

/// Add handlers of the committee content kinds to `router`
pub fn with_builtin_handlers(router: ProposalRouter, module_id: ModuleId) -> ProposalRouter {
    router
        .with_handler(
            ContentKind::CommitteeChange,
            Arc::new(CommitteeChangeHandler { module_id }),
        )
        .with_handler(
            ContentKind::CommitteeDelete,
            Arc::new(CommitteeDeleteHandler { module_id }),
        )
}

/// Inserts a new committee or replaces an existing one
pub struct CommitteeChangeHandler {
    module_id: ModuleId,
}

impl ProposalHandler for CommitteeChangeHandler {
    fn execute(
        &self,
        dbtx: &WriteTransactionCtx,
        content: &ProposalContent,
    ) -> DbTxResult<(), Whatever> {
        let ProposalContent::CommitteeChange { committee, .. } = content else {
            return None
                .whatever_context("Not a committee change")
                .context(TxSnafu);
        };
        committee
            .validate()
            .whatever_context("Invalid committee")
            .context(TxSnafu)?;

        let dbtx = ModuleWriteTransactionCtx::new(self.module_id, dbtx);
        let replaced = dbtx
            .open_table(&tables::committees::TABLE)?
            .insert(&committee.id, committee)?
            .is_some();

        info!(
            target: LOG_TARGET,
            committee_id = %committee.id,
            replaced,
            "Committee updated"
        );
        Ok(())
    }
}

/// Deletes a committee; its pending proposals stay and fail at resolution
pub struct CommitteeDeleteHandler {
    module_id: ModuleId,
}

impl ProposalHandler for CommitteeDeleteHandler {
    fn execute(
        &self,
        dbtx: &WriteTransactionCtx,
        content: &ProposalContent,
    ) -> DbTxResult<(), Whatever> {
        let ProposalContent::CommitteeDelete { committee_id, .. } = content else {
            return None
                .whatever_context("Not a committee deletion")
                .context(TxSnafu);
        };

        let dbtx = ModuleWriteTransactionCtx::new(self.module_id, dbtx);
        dbtx.open_table(&tables::committees::TABLE)?
            .remove(committee_id)?
            .whatever_context("Committee does not exist")
            .context(TxSnafu)?;

        info!(target: LOG_TARGET, %committee_id, "Committee deleted");
        Ok(())
    }
}
