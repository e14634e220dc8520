use comgov_core::account::AccountId;
use comgov_core::block::BlockHeight;
use comgov_core::committee::{Committee, CommitteeId};
use comgov_core::proposal::{Proposal, ProposalId, VoteOption};
use comgov_util_db::def_table;

def_table! {
    committees: CommitteeId => Committee
}

def_table! {
    /// Pending proposals; resolved ones are deleted
    proposals: ProposalId => Proposal
}

def_table! {
    /// Index of pending proposals by their deadline
    proposals_by_deadline: (BlockHeight, ProposalId) => ()
}

def_table! {
    /// Current vote of each voter, for each pending proposal
    votes: (ProposalId, AccountId) => VoteOption
}

def_table! {
    /// Id the next submitted proposal will get
    next_proposal_id: () => ProposalId
}
