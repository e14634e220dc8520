//! Per-block resolution of proposals
//!
//! Each resolved proposal gets its own write transaction, so a failing
//! execution handler rolls back only its own changes. The proposal is
//! deleted in the same transaction that executes it, which makes the sweep
//! resumable: whatever was not committed will be picked up again.

use std::collections::BTreeSet;

use comgov_core::account::AccountId;
use comgov_core::block::BlockHeight;
use comgov_core::committee::TallyOption;
use comgov_core::proposal::{Proposal, ProposalId, ProposalOutcome, ResolutionReason};
use comgov_module::effect::{CItemEffect, EffectKindExt as _};
use comgov_module::module::db::{
    DbResult, DbTxResult, ModuleReadableTransaction as _, ModuleWriteTransactionCtx,
};
use comgov_module::router::ExecutionError;
use comgov_util_db::{keys_in_range, remove_range};
use comgov_util_error::fmt::FmtCompact as _;
use tracing::{debug, info, warn};

use crate::effects::ProposalResolvedEffect;
use crate::tally::tally;
use crate::{CommitteeModule, LOG_TARGET, tables};

impl CommitteeModule {
    /// Resolve all proposals due at `height`, in ascending id order
    ///
    /// These are proposals whose deadline is at or before `height`, and
    /// proposals of first-past-the-post committees that already pass.
    pub(crate) async fn resolve_proposals(&self, height: BlockHeight) -> Vec<CItemEffect> {
        let candidates = self
            .db
            .read_with_expect(|dbtx| {
                let mut candidates = BTreeSet::new();

                let by_deadline = dbtx.open_table(&tables::proposals_by_deadline::TABLE)?;
                for (_, proposal_id) in
                    keys_in_range(&by_deadline, ..=(height, ProposalId::MAX))?
                {
                    candidates.insert(proposal_id);
                }

                // Whether these actually pass is checked in their turn, as
                // resolving earlier ones can change the outcome
                for proposal in Self::get_proposals_tx(dbtx)? {
                    if let Some(committee) = Self::get_committee_tx(dbtx, proposal.committee_id)? {
                        if committee.tally_option == TallyOption::FirstPastThePost {
                            candidates.insert(proposal.id);
                        }
                    }
                }
                Ok(candidates)
            })
            .await;

        let mut effects = vec![];
        for proposal_id in candidates {
            if let Some(effect) = self.resolve_proposal(height, proposal_id).await {
                effects.push(effect.encode());
            }
        }
        effects
    }

    async fn resolve_proposal(
        &self,
        height: BlockHeight,
        proposal_id: ProposalId,
    ) -> Option<ProposalResolvedEffect> {
        let res = self
            .db
            .write_with_expect_falliable(|dbtx| self.resolve_proposal_tx(dbtx, height, proposal_id))
            .await;

        match res {
            Ok(effect) => effect,
            Err(err) => {
                // Everything the handler did is rolled back; record the
                // failure and drop the proposal in a fresh transaction
                let error = err.fmt_compact().to_string();
                warn!(
                    target: LOG_TARGET,
                    %proposal_id,
                    err = %error,
                    "Proposal execution failed"
                );
                self.db
                    .write_with_expect(|dbtx| {
                        let Some(proposal) = Self::get_proposal_tx(dbtx, proposal_id)? else {
                            return Ok(None);
                        };
                        Ok(Some(self.finish_proposal_tx(
                            dbtx,
                            height,
                            &proposal,
                            ProposalOutcome::Failed,
                            ResolutionReason::ExecutionFailed { error },
                        )?))
                    })
                    .await
            }
        }
    }

    /// Resolve one proposal, if it's due
    ///
    /// Returns `TxError` only if the execution failed, in which case nothing
    /// in the transaction may be committed.
    pub(crate) fn resolve_proposal_tx(
        &self,
        dbtx: &ModuleWriteTransactionCtx,
        height: BlockHeight,
        proposal_id: ProposalId,
    ) -> DbTxResult<Option<ProposalResolvedEffect>, ExecutionError> {
        let Some(proposal) = Self::get_proposal_tx(dbtx, proposal_id)? else {
            return Ok(None);
        };
        let expired = proposal.deadline <= height;
        let committee = Self::get_committee_tx(dbtx, proposal.committee_id)?;

        let Some(committee) = committee else {
            if !expired {
                return Ok(None);
            }
            info!(
                target: LOG_TARGET,
                %proposal_id,
                committee_id = %proposal.committee_id,
                "Committee of the proposal no longer exists"
            );
            return Ok(Some(self.finish_proposal_tx(
                dbtx,
                height,
                &proposal,
                ProposalOutcome::Failed,
                ResolutionReason::CommitteeDeleted,
            )?));
        };

        let votes = Self::get_votes_tx(dbtx, proposal_id)?;
        let result = tally(&committee, &votes, self.stake.as_ref());

        let passed_early =
            committee.tally_option == TallyOption::FirstPastThePost && result.is_passed();
        if !expired && !passed_early {
            return Ok(None);
        }

        debug!(
            target: LOG_TARGET,
            %proposal_id,
            verdict = ?result.verdict,
            counts = ?result.counts,
            "Proposal tallied"
        );

        if let Some(reason) = result.verdict.failure_reason() {
            return Ok(Some(self.finish_proposal_tx(
                dbtx,
                height,
                &proposal,
                result.outcome(),
                reason,
            )?));
        }

        // Committee might have lost the permission during voting
        if !committee.permits(&proposal.content) {
            warn!(
                target: LOG_TARGET,
                %proposal_id,
                committee_id = %committee.id,
                "Passed proposal no longer permitted"
            );
            return Ok(Some(self.finish_proposal_tx(
                dbtx,
                height,
                &proposal,
                ProposalOutcome::Failed,
                ResolutionReason::PermissionInvalidated,
            )?));
        }

        self.router.execute(dbtx.raw(), &proposal.content)?;

        Ok(Some(self.finish_proposal_tx(
            dbtx,
            height,
            &proposal,
            ProposalOutcome::Passed,
            ResolutionReason::Enacted,
        )?))
    }

    /// Delete the proposal with its votes, producing the resolution effect
    fn finish_proposal_tx(
        &self,
        dbtx: &ModuleWriteTransactionCtx,
        height: BlockHeight,
        proposal: &Proposal,
        outcome: ProposalOutcome,
        reason: ResolutionReason,
    ) -> DbResult<ProposalResolvedEffect> {
        let proposal_id = proposal.id;

        dbtx.open_table(&tables::proposals::TABLE)?
            .remove(&proposal_id)?;
        dbtx.open_table(&tables::proposals_by_deadline::TABLE)?
            .remove(&(proposal.deadline, proposal_id))?;
        remove_range(
            &mut dbtx.open_table(&tables::votes::TABLE)?,
            (proposal_id, AccountId::MIN)..=(proposal_id, AccountId::MAX),
        )?;

        info!(
            target: LOG_TARGET,
            %proposal_id,
            committee_id = %proposal.committee_id,
            %outcome,
            %reason,
            "Proposal resolved"
        );

        let effect = ProposalResolvedEffect {
            proposal_id,
            committee_id: proposal.committee_id,
            height,
            outcome,
            reason,
        };

        let resolved_tx = self.resolved_tx.clone();
        let sent = effect.clone();
        dbtx.on_commit(move || {
            // No subscribers is fine
            let _ = resolved_tx.send(sent);
        });

        Ok(effect)
    }
}
