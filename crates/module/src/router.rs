//! Proposal execution dispatch
//!
//! Which content kinds can be enacted, and how, is decided when the host
//! assembles the [`ProposalRouter`] at startup. The governance engine itself
//! never interprets proposal content beyond routing it.

use std::collections::BTreeMap;
use std::sync::Arc;

use comgov_core::content::{ContentKind, ProposalContent};
use comgov_db::ctx::WriteTransactionCtx;
use comgov_db::error::{DbTxResult, TxSnafu};
use comgov_util_error::Whatever;
use snafu::{OptionExt as _, ResultExt as _, Snafu};
use tracing::debug;

const LOG_TARGET: &str = "comgov::router";

/// Executes passed proposals of one content kind
///
/// Runs inside the write transaction resolving the proposal. A
/// `TxError` makes the proposal fail and rolls back everything the handler
/// did.
pub trait ProposalHandler {
    fn execute(&self, dbtx: &WriteTransactionCtx, content: &ProposalContent)
    -> DbTxResult<(), Whatever>;
}

pub type DynProposalHandler = Arc<dyn ProposalHandler + Send + Sync>;

#[derive(Debug, Snafu)]
pub enum ExecutionError {
    #[snafu(display("No handler registered for {kind} content"))]
    NoHandler { kind: ContentKind },
    #[snafu(display("Handler for {kind} content failed"))]
    HandlerFailed { kind: ContentKind, source: Whatever },
}

#[derive(Default, Clone)]
pub struct ProposalRouter {
    handlers: BTreeMap<ContentKind, DynProposalHandler>,
}

impl ProposalRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `kind`, replacing any previous one
    pub fn with_handler(mut self, kind: ContentKind, handler: DynProposalHandler) -> Self {
        self.handlers.insert(kind, handler);
        self
    }

    pub fn has_handler(&self, kind: ContentKind) -> bool {
        self.handlers.contains_key(&kind)
    }

    pub fn kinds(&self) -> impl Iterator<Item = ContentKind> + '_ {
        self.handlers.keys().copied()
    }

    pub fn execute(
        &self,
        dbtx: &WriteTransactionCtx,
        content: &ProposalContent,
    ) -> DbTxResult<(), ExecutionError> {
        let kind = content.kind();
        let handler = self
            .handlers
            .get(&kind)
            .context(NoHandlerSnafu { kind })
            .context(TxSnafu)?;

        debug!(target: LOG_TARGET, %kind, "Executing proposal content");
        handler
            .execute(dbtx, content)
            .map_err(|err| err.map(|source| ExecutionError::HandlerFailed { kind, source }))
    }
}

impl std::fmt::Debug for ProposalRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.handlers.keys()).finish()
    }
}

/// Handler for content without any state effects
pub struct NoopHandler;

impl ProposalHandler for NoopHandler {
    fn execute(
        &self,
        _dbtx: &WriteTransactionCtx,
        _content: &ProposalContent,
    ) -> DbTxResult<(), Whatever> {
        Ok(())
    }
}
