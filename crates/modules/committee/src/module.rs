use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use comgov_core::account::AccountId;
use comgov_core::block::{BlockDuration, BlockHeight};
use comgov_core::citem::CItemRaw;
use comgov_core::committee::{Committee, CommitteeId};
use comgov_core::content::ProposalContent;
use comgov_core::module::ModuleKind;
use comgov_core::proposal::{Proposal, ProposalId, VoteOption};
use comgov_db::error::TxSnafu;
use comgov_module::effect::{CItemEffect, EffectKindExt as _};
use comgov_module::module::IModule;
use comgov_module::module::db::{
    DbResult, DbTxResult, ModuleDatabase, ModuleReadableTransaction, ModuleWriteTransactionCtx,
};
use comgov_module::router::ProposalRouter;
use comgov_module::stake::DynStakeProvider;
use comgov_util_db::redb_bincode::ReadableTable as _;
use comgov_util_error::Whatever;
use snafu::{OptionExt as _, ResultExt as _, ensure};
use tokio::sync::broadcast;
use tracing::debug;

use crate::citem::CommitteeCitem;
use crate::effects::{ProposalResolvedEffect, ProposalSubmittedEffect, VoteCastEffect};
use crate::error::{
    DurationExceededSnafu, GovernanceError, GovernanceResult, InvalidCommitteeSnafu, InvalidContentSnafu,
    InvalidDurationSnafu, InvalidVoteOptionSnafu, PermissionDeniedSnafu, ProposalIdsExhaustedSnafu,
    ProposalNotFoundSnafu, UnauthorizedSnafu,
};
use crate::tally::{TallyResult, tally};
use crate::{LOG_TARGET, handlers, tables};

const RESOLVED_CHANNEL_CAPACITY: usize = 1024;

pub struct CommitteeModule {
    pub(crate) db: ModuleDatabase,
    pub(crate) router: ProposalRouter,
    pub(crate) stake: DynStakeProvider,
    pub(crate) resolved_tx: broadcast::Sender<ProposalResolvedEffect>,
}

#[bon::bon]
impl CommitteeModule {
    /// Create the module, with its tables
    ///
    /// `router` gets the handlers for committee content added; everything
    /// else passed proposals can do has to be registered in it already.
    #[builder]
    pub async fn new(
        db: ModuleDatabase,
        #[builder(default)] router: ProposalRouter,
        stake: DynStakeProvider,
    ) -> Self {
        db.write_with_expect(Self::init_db_tx).await;

        let router = handlers::with_builtin_handlers(router, db.module_id());
        let (resolved_tx, _) = broadcast::channel(RESOLVED_CHANNEL_CAPACITY);

        Self {
            db,
            router,
            stake,
            resolved_tx,
        }
    }
}

impl CommitteeModule {
    pub(crate) fn init_db_tx(dbtx: &ModuleWriteTransactionCtx) -> DbResult<()> {
        dbtx.open_table(&tables::committees::TABLE)?;
        dbtx.open_table(&tables::proposals::TABLE)?;
        dbtx.open_table(&tables::proposals_by_deadline::TABLE)?;
        dbtx.open_table(&tables::votes::TABLE)?;

        let mut tbl = dbtx.open_table(&tables::next_proposal_id::TABLE)?;
        if tbl.get(&())?.is_none() {
            tbl.insert(&(), &ProposalId::FIRST)?;
        }
        Ok(())
    }

    pub fn module_db(&self) -> &ModuleDatabase {
        &self.db
    }

    pub fn router(&self) -> &ProposalRouter {
        &self.router
    }

    /// Resolutions, sent after they are committed
    pub fn subscribe_resolved(&self) -> broadcast::Receiver<ProposalResolvedEffect> {
        self.resolved_tx.subscribe()
    }

    pub async fn get_committees(&self) -> Vec<Committee> {
        self.db
            .read_with_expect(|dbtx| Self::get_committees_tx(dbtx))
            .await
    }

    pub async fn get_committee(&self, committee_id: CommitteeId) -> Option<Committee> {
        self.db
            .read_with_expect(|dbtx| Self::get_committee_tx(dbtx, committee_id))
            .await
    }

    pub async fn get_proposals(&self) -> Vec<Proposal> {
        self.db
            .read_with_expect(|dbtx| Self::get_proposals_tx(dbtx))
            .await
    }

    pub async fn get_proposal(&self, proposal_id: ProposalId) -> Option<Proposal> {
        self.db
            .read_with_expect(|dbtx| Self::get_proposal_tx(dbtx, proposal_id))
            .await
    }

    pub async fn get_votes(&self, proposal_id: ProposalId) -> BTreeMap<AccountId, VoteOption> {
        self.db
            .read_with_expect(|dbtx| Self::get_votes_tx(dbtx, proposal_id))
            .await
    }

    pub async fn get_next_proposal_id(&self) -> ProposalId {
        self.db
            .read_with_expect(|dbtx| Self::get_next_proposal_id_tx(dbtx))
            .await
    }

    /// Current tally of a pending proposal
    ///
    /// `None` if the proposal or its committee doesn't exist.
    pub async fn get_tally(&self, proposal_id: ProposalId) -> Option<TallyResult> {
        self.db
            .read_with_expect(|dbtx| self.get_tally_tx(dbtx, proposal_id))
            .await
    }

    pub(crate) fn get_committees_tx<'dbtx>(
        dbtx: &impl ModuleReadableTransaction<'dbtx>,
    ) -> DbResult<Vec<Committee>> {
        let tbl = dbtx.open_table(&tables::committees::TABLE)?;
        tbl.range(..)?
            .map(|kv| {
                let (_, v) = kv?;
                Ok(v.value())
            })
            .collect()
    }

    pub(crate) fn get_committee_tx<'dbtx>(
        dbtx: &impl ModuleReadableTransaction<'dbtx>,
        committee_id: CommitteeId,
    ) -> DbResult<Option<Committee>> {
        let tbl = dbtx.open_table(&tables::committees::TABLE)?;
        Ok(tbl.get(&committee_id)?.map(|v| v.value()))
    }

    pub(crate) fn get_proposals_tx<'dbtx>(
        dbtx: &impl ModuleReadableTransaction<'dbtx>,
    ) -> DbResult<Vec<Proposal>> {
        let tbl = dbtx.open_table(&tables::proposals::TABLE)?;
        tbl.range(..)?
            .map(|kv| {
                let (_, v) = kv?;
                Ok(v.value())
            })
            .collect()
    }

    pub(crate) fn get_proposal_tx<'dbtx>(
        dbtx: &impl ModuleReadableTransaction<'dbtx>,
        proposal_id: ProposalId,
    ) -> DbResult<Option<Proposal>> {
        let tbl = dbtx.open_table(&tables::proposals::TABLE)?;
        Ok(tbl.get(&proposal_id)?.map(|v| v.value()))
    }

    pub(crate) fn get_votes_tx<'dbtx>(
        dbtx: &impl ModuleReadableTransaction<'dbtx>,
        proposal_id: ProposalId,
    ) -> DbResult<BTreeMap<AccountId, VoteOption>> {
        let tbl = dbtx.open_table(&tables::votes::TABLE)?;
        tbl.range((proposal_id, AccountId::MIN)..=(proposal_id, AccountId::MAX))?
            .map(|kv| {
                let (k, v) = kv?;
                let (_, voter) = k.value();
                Ok((voter, v.value()))
            })
            .collect()
    }

    pub(crate) fn get_next_proposal_id_tx<'dbtx>(
        dbtx: &impl ModuleReadableTransaction<'dbtx>,
    ) -> DbResult<ProposalId> {
        let tbl = dbtx.open_table(&tables::next_proposal_id::TABLE)?;
        Ok(tbl
            .get(&())?
            .map(|v| v.value())
            .unwrap_or(ProposalId::FIRST))
    }

    pub(crate) fn get_tally_tx<'dbtx>(
        &self,
        dbtx: &impl ModuleReadableTransaction<'dbtx>,
        proposal_id: ProposalId,
    ) -> DbResult<Option<TallyResult>> {
        let Some(proposal) = Self::get_proposal_tx(dbtx, proposal_id)? else {
            return Ok(None);
        };
        let Some(committee) = Self::get_committee_tx(dbtx, proposal.committee_id)? else {
            return Ok(None);
        };
        let votes = Self::get_votes_tx(dbtx, proposal_id)?;

        Ok(Some(tally(&committee, &votes, self.stake.as_ref())))
    }

    /// Validate and store a new proposal
    pub fn submit_proposal_tx(
        &self,
        dbtx: &ModuleWriteTransactionCtx,
        height: BlockHeight,
        submitter: AccountId,
        committee_id: CommitteeId,
        content: ProposalContent,
        duration: BlockDuration,
    ) -> DbTxResult<(ProposalId, Vec<CItemEffect>), GovernanceError> {
        let committee = Self::get_committee_tx(dbtx, committee_id)?;
        let deadline = validate_submission(
            committee_id,
            committee.as_ref(),
            submitter,
            &content,
            height,
            duration,
        )
        .context(TxSnafu)?;

        let proposal_id = {
            let mut tbl = dbtx.open_table(&tables::next_proposal_id::TABLE)?;
            let id = tbl
                .get(&())?
                .map(|v| v.value())
                .unwrap_or(ProposalId::FIRST);
            let next = id
                .next()
                .context(ProposalIdsExhaustedSnafu)
                .context(TxSnafu)?;
            tbl.insert(&(), &next)?;
            id
        };

        dbtx.open_table(&tables::proposals::TABLE)?.insert(
            &proposal_id,
            &Proposal {
                id: proposal_id,
                committee_id,
                content,
                submitter,
                deadline,
            },
        )?;
        dbtx.open_table(&tables::proposals_by_deadline::TABLE)?
            .insert(&(deadline, proposal_id), &())?;

        debug!(
            target: LOG_TARGET,
            %proposal_id,
            %committee_id,
            submitter = %submitter.to_short(),
            %deadline,
            "Proposal submitted"
        );

        Ok((
            proposal_id,
            vec![
                ProposalSubmittedEffect {
                    proposal_id,
                    committee_id,
                    submitter,
                    deadline,
                }
                .encode(),
            ],
        ))
    }

    /// Record (or replace) a vote on an open proposal
    pub fn vote_tx(
        &self,
        dbtx: &ModuleWriteTransactionCtx,
        height: BlockHeight,
        voter: AccountId,
        proposal_id: ProposalId,
        option: VoteOption,
    ) -> DbTxResult<Vec<CItemEffect>, GovernanceError> {
        let proposal = Self::get_proposal_tx(dbtx, proposal_id)?
            .filter(|proposal| proposal.is_voting_open(height))
            .context(ProposalNotFoundSnafu { proposal_id })
            .context(TxSnafu)?;
        let committee = Self::get_committee_tx(dbtx, proposal.committee_id)?;
        validate_vote(proposal.committee_id, committee.as_ref(), voter, option).context(TxSnafu)?;

        dbtx.open_table(&tables::votes::TABLE)?
            .insert(&(proposal_id, voter), &option)?;

        debug!(
            target: LOG_TARGET,
            %proposal_id,
            voter = %voter.to_short(),
            %option,
            "Vote cast"
        );

        Ok(vec![
            VoteCastEffect {
                proposal_id,
                voter,
                option,
            }
            .encode(),
        ])
    }
}

/// Checks a submission against its target committee, returning the deadline
fn validate_submission(
    committee_id: CommitteeId,
    committee: Option<&Committee>,
    submitter: AccountId,
    content: &ProposalContent,
    height: BlockHeight,
    duration: BlockDuration,
) -> GovernanceResult<BlockHeight> {
    let committee = committee.context(InvalidCommitteeSnafu { committee_id })?;

    ensure!(
        committee.allows_submitter(&submitter),
        UnauthorizedSnafu {
            account: submitter,
            committee_id,
        }
    );
    content.validate().context(InvalidContentSnafu)?;
    ensure!(
        committee.permits(content),
        PermissionDeniedSnafu {
            committee_id,
            kind: content.kind(),
        }
    );
    ensure!(
        !duration.is_zero(),
        InvalidDurationSnafu {
            requested: duration,
            height,
        }
    );
    ensure!(
        duration <= committee.max_proposal_duration,
        DurationExceededSnafu {
            requested: duration,
            max: committee.max_proposal_duration,
        }
    );

    height
        .checked_add_duration(duration)
        .context(InvalidDurationSnafu {
            requested: duration,
            height,
        })
}

fn validate_vote(
    committee_id: CommitteeId,
    committee: Option<&Committee>,
    voter: AccountId,
    option: VoteOption,
) -> GovernanceResult<()> {
    let committee = committee.context(InvalidCommitteeSnafu { committee_id })?;

    ensure!(
        committee.allows_voter(&voter),
        UnauthorizedSnafu {
            account: voter,
            committee_id,
        }
    );
    ensure!(
        committee.is_valid_vote_option(option),
        InvalidVoteOptionSnafu {
            option,
            committee_id,
        }
    );
    Ok(())
}

#[async_trait]
impl IModule for CommitteeModule {
    fn kind(&self) -> ModuleKind {
        crate::KIND
    }

    fn display_name(&self) -> &'static str {
        "Committee"
    }

    fn process_citem(
        &self,
        dbtx: &ModuleWriteTransactionCtx,
        height: BlockHeight,
        sender: AccountId,
        citem: &CItemRaw,
    ) -> DbTxResult<Vec<CItemEffect>, Whatever> {
        let citem = CommitteeCitem::decode_from_raw(citem).context(TxSnafu)?;

        let res = match citem {
            CommitteeCitem::SubmitProposal {
                committee_id,
                content,
                duration,
            } => self
                .submit_proposal_tx(dbtx, height, sender, committee_id, content, duration)
                .map(|(_, effects)| effects),
            CommitteeCitem::Vote {
                proposal_id,
                option,
            } => self.vote_tx(dbtx, height, sender, proposal_id, option),
        };

        res.map_err(|err| err.tx_into())
    }

    async fn end_block(&self, height: BlockHeight) -> Vec<CItemEffect> {
        self.resolve_proposals(height).await
    }
}
