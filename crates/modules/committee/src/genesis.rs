//! Initial state of the committee module
//!
//! Genesis can carry pending proposals and votes, so that exporting the
//! state and importing it again gives back the same state machine.

use std::collections::{BTreeMap, BTreeSet};

use comgov_core::account::AccountId;
use comgov_core::committee::{Committee, CommitteeError, CommitteeId};
use comgov_core::content::ContentError;
use comgov_core::proposal::{Proposal, ProposalId, VoteOption};
use comgov_db::error::TxSnafu;
use comgov_module::module::db::{
    DbResult, DbTxResult, ModuleReadableTransaction, ModuleWriteTransactionCtx,
};
use comgov_util_db::redb_bincode::ReadableTable as _;
use serde::{Deserialize, Serialize};
use snafu::{OptionExt as _, ResultExt as _, Snafu, ensure};
use tracing::info;

use crate::{CommitteeModule, LOG_TARGET, tables};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisVote {
    pub proposal_id: ProposalId,
    pub voter: AccountId,
    pub option: VoteOption,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitteeGenesis {
    #[serde(default = "default_next_proposal_id")]
    pub next_proposal_id: ProposalId,
    #[serde(default)]
    pub committees: Vec<Committee>,
    #[serde(default)]
    pub proposals: Vec<Proposal>,
    #[serde(default)]
    pub votes: Vec<GenesisVote>,
}

fn default_next_proposal_id() -> ProposalId {
    ProposalId::FIRST
}

impl Default for CommitteeGenesis {
    fn default() -> Self {
        Self {
            next_proposal_id: ProposalId::FIRST,
            committees: vec![],
            proposals: vec![],
            votes: vec![],
        }
    }
}

#[derive(Debug, Snafu)]
pub enum GenesisError {
    #[snafu(display("Next proposal id must be at least 1 and below the maximum"))]
    InvalidNextProposalId,
    #[snafu(display("Duplicate committee {committee_id}"))]
    DuplicateCommittee { committee_id: CommitteeId },
    #[snafu(display("Invalid committee {committee_id}"))]
    InvalidCommittee {
        committee_id: CommitteeId,
        source: CommitteeError,
    },
    #[snafu(display("Duplicate proposal {proposal_id}"))]
    DuplicateProposal { proposal_id: ProposalId },
    #[snafu(display("Proposal id {proposal_id} out of range"))]
    ProposalIdOutOfRange { proposal_id: ProposalId },
    #[snafu(display("Proposal {proposal_id} references unknown committee {committee_id}"))]
    UnknownCommittee {
        proposal_id: ProposalId,
        committee_id: CommitteeId,
    },
    #[snafu(display("Proposal {proposal_id} has invalid content"))]
    InvalidContent {
        proposal_id: ProposalId,
        source: ContentError,
    },
    #[snafu(display("Vote of {voter} references unknown proposal {proposal_id}"))]
    UnknownProposal {
        proposal_id: ProposalId,
        voter: AccountId,
    },
    #[snafu(display("Duplicate vote of {voter} on proposal {proposal_id}"))]
    DuplicateVote {
        proposal_id: ProposalId,
        voter: AccountId,
    },
    #[snafu(display("Vote of {voter} on proposal {proposal_id} is not valid in its committee"))]
    InvalidVote {
        proposal_id: ProposalId,
        voter: AccountId,
    },
    #[snafu(display("Committee state already initialized"))]
    AlreadyInitialized,
}

pub type GenesisResult<T> = Result<T, GenesisError>;

impl CommitteeGenesis {
    pub fn validate(&self) -> GenesisResult<()> {
        ensure!(
            ProposalId::FIRST <= self.next_proposal_id && self.next_proposal_id < ProposalId::MAX,
            InvalidNextProposalIdSnafu
        );

        let mut committees = BTreeMap::new();
        for committee in &self.committees {
            let committee_id = committee.id;
            committee
                .validate()
                .context(InvalidCommitteeSnafu { committee_id })?;
            ensure!(
                committees.insert(committee_id, committee).is_none(),
                DuplicateCommitteeSnafu { committee_id }
            );
        }

        let mut proposals = BTreeMap::new();
        for proposal in &self.proposals {
            let proposal_id = proposal.id;
            ensure!(
                ProposalId::FIRST <= proposal_id && proposal_id < self.next_proposal_id,
                ProposalIdOutOfRangeSnafu { proposal_id }
            );
            ensure!(
                committees.contains_key(&proposal.committee_id),
                UnknownCommitteeSnafu {
                    proposal_id,
                    committee_id: proposal.committee_id,
                }
            );
            proposal
                .content
                .validate()
                .context(InvalidContentSnafu { proposal_id })?;
            ensure!(
                proposals.insert(proposal_id, proposal).is_none(),
                DuplicateProposalSnafu { proposal_id }
            );
        }

        let mut votes = BTreeSet::new();
        for vote in &self.votes {
            let (proposal_id, voter) = (vote.proposal_id, vote.voter);
            let committee = proposals
                .get(&proposal_id)
                .and_then(|proposal| committees.get(&proposal.committee_id))
                .context(UnknownProposalSnafu { proposal_id, voter })?;
            ensure!(
                committee.is_valid_vote_option(vote.option),
                InvalidVoteSnafu { proposal_id, voter }
            );
            ensure!(
                votes.insert((proposal_id, voter)),
                DuplicateVoteSnafu { proposal_id, voter }
            );
        }

        Ok(())
    }
}

impl CommitteeModule {
    /// Write a validated genesis into an empty module state
    pub fn import_genesis_tx(
        dbtx: &ModuleWriteTransactionCtx,
        genesis: &CommitteeGenesis,
    ) -> DbTxResult<(), GenesisError> {
        genesis.validate().context(TxSnafu)?;
        if Self::is_initialized_tx(dbtx)? {
            return AlreadyInitializedSnafu.fail().context(TxSnafu);
        }

        {
            let mut tbl = dbtx.open_table(&tables::committees::TABLE)?;
            for committee in &genesis.committees {
                tbl.insert(&committee.id, committee)?;
            }
        }
        {
            let mut proposals_tbl = dbtx.open_table(&tables::proposals::TABLE)?;
            let mut by_deadline_tbl = dbtx.open_table(&tables::proposals_by_deadline::TABLE)?;
            for proposal in &genesis.proposals {
                proposals_tbl.insert(&proposal.id, proposal)?;
                by_deadline_tbl.insert(&(proposal.deadline, proposal.id), &())?;
            }
        }
        {
            let mut tbl = dbtx.open_table(&tables::votes::TABLE)?;
            for vote in &genesis.votes {
                tbl.insert(&(vote.proposal_id, vote.voter), &vote.option)?;
            }
        }
        dbtx.open_table(&tables::next_proposal_id::TABLE)?
            .insert(&(), &genesis.next_proposal_id)?;

        info!(
            target: LOG_TARGET,
            committees = genesis.committees.len(),
            proposals = genesis.proposals.len(),
            votes = genesis.votes.len(),
            "Committee genesis imported"
        );
        Ok(())
    }

    fn is_initialized_tx<'dbtx>(dbtx: &impl ModuleReadableTransaction<'dbtx>) -> DbResult<bool> {
        let committees_tbl = dbtx.open_table(&tables::committees::TABLE)?;
        let proposals_tbl = dbtx.open_table(&tables::proposals::TABLE)?;

        Ok(committees_tbl.range(..)?.next().is_some()
            || proposals_tbl.range(..)?.next().is_some()
            || Self::get_next_proposal_id_tx(dbtx)? != ProposalId::FIRST)
    }

    pub fn export_genesis_tx<'dbtx>(
        dbtx: &impl ModuleReadableTransaction<'dbtx>,
    ) -> DbResult<CommitteeGenesis> {
        let proposals = Self::get_proposals_tx(dbtx)?;
        let mut votes = vec![];
        for proposal in &proposals {
            for (voter, option) in Self::get_votes_tx(dbtx, proposal.id)? {
                votes.push(GenesisVote {
                    proposal_id: proposal.id,
                    voter,
                    option,
                });
            }
        }

        Ok(CommitteeGenesis {
            next_proposal_id: Self::get_next_proposal_id_tx(dbtx)?,
            committees: Self::get_committees_tx(dbtx)?,
            proposals,
            votes,
        })
    }

    pub async fn export_genesis(&self) -> CommitteeGenesis {
        self.db
            .read_with_expect(|dbtx| Self::export_genesis_tx(dbtx))
            .await
    }
}
