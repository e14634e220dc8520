use std::sync::{Arc, RwLock};

use comgov_core::account::AccountId;
use comgov_core::block::{BlockDuration, BlockHeight};
use comgov_core::committee::{
    Committee, CommitteeId, CommitteeKind, TallyOption, WeightedParams,
};
use comgov_core::content::{ContentKind, ParamChange, ParamValue, ProposalContent};
use comgov_core::module::ModuleId;
use comgov_core::permission::{AllowedParamChange, Permission, PermissionSet, ValueRule};
use comgov_core::proposal::{ProposalId, ProposalOutcome, ResolutionReason, VoteOption};
use comgov_core::ratio::Ratio;
use comgov_db::Database;
use comgov_db::ctx::WriteTransactionCtx;
use comgov_db::error::{DbTxResult, TxSnafu};
use comgov_module::effect::EffectKindExt;
use comgov_module::module::IModule;
use comgov_module::module::db::ModuleDatabase;
use comgov_module::router::{NoopHandler, ProposalHandler, ProposalRouter};
use comgov_module::stake::StakeTable;
use comgov_util_db::def_table;
use comgov_util_db::redb_bincode::ReadableTable as _;
use comgov_util_error::{BoxedErrorResult, Whatever};
use snafu::{ResultExt as _, whatever};

use crate::CommitteeModule;
use crate::citem::CommitteeCitem;
use crate::effects::{ProposalResolvedEffect, ProposalSubmittedEffect, VoteCastEffect};
use crate::error::GovernanceError;
use crate::genesis::{CommitteeGenesis, GenesisError};

def_table! {
    /// Parameters set by the test handler
    test_params: (String, String) => ParamValue
}

/// Applies param changes to a test table, failing on a `fail` key after
/// having written everything before it
struct TestParamHandler;

impl TestParamHandler {
    fn apply(dbtx: &WriteTransactionCtx, content: &ProposalContent) -> Result<(), Whatever> {
        let ProposalContent::ParamChange { changes, .. } = content else {
            whatever!("Not a param change");
        };
        let mut tbl = dbtx
            .open_table(&test_params::TABLE)
            .whatever_context::<_, Whatever>("Failed to open table")?;
        for change in changes {
            if change.key == "fail" {
                whatever!("Refusing to set {}", change.key);
            }
            tbl.insert(&(change.module.clone(), change.key.clone()), &change.value)
                .whatever_context::<_, Whatever>("Failed to insert")?;
        }
        Ok(())
    }
}

impl ProposalHandler for TestParamHandler {
    fn execute(
        &self,
        dbtx: &WriteTransactionCtx,
        content: &ProposalContent,
    ) -> DbTxResult<(), Whatever> {
        Self::apply(dbtx, content).context(TxSnafu)
    }
}

struct TestSetup {
    db: Arc<Database>,
    module: Arc<CommitteeModule>,
    stake: Arc<RwLock<StakeTable>>,
}

impl TestSetup {
    async fn new() -> BoxedErrorResult<Self> {
        let db = Arc::new(Database::new_in_memory().await?);
        let stake = Arc::new(RwLock::new(StakeTable::new()));

        let router = ProposalRouter::new()
            .with_handler(ContentKind::Text, Arc::new(NoopHandler))
            .with_handler(ContentKind::ParamChange, Arc::new(TestParamHandler));

        let module = CommitteeModule::builder()
            .db(ModuleDatabase::new(ModuleId::new(0), db.clone()))
            .router(router)
            .stake(stake.clone())
            .build()
            .await;

        db.write_with_expect(|dbtx| {
            dbtx.open_table(&test_params::TABLE)?;
            Ok(())
        })
        .await;

        Ok(Self {
            db,
            module: Arc::new(module),
            stake,
        })
    }

    async fn with_committees(committees: Vec<Committee>) -> BoxedErrorResult<Self> {
        Self::with_genesis(CommitteeGenesis {
            committees,
            ..CommitteeGenesis::default()
        })
        .await
    }

    async fn with_genesis(genesis: CommitteeGenesis) -> BoxedErrorResult<Self> {
        let setup = Self::new().await?;
        setup
            .module
            .module_db()
            .write_with_expect_falliable(|dbtx| {
                CommitteeModule::import_genesis_tx(dbtx, &genesis)
            })
            .await?;
        Ok(setup)
    }

    fn set_stake(&self, account: AccountId, stake: u64) {
        self.stake.write().expect("Locking failed").set(account, stake);
    }

    async fn submit(
        &self,
        height: u64,
        submitter: AccountId,
        committee_id: CommitteeId,
        content: ProposalContent,
        duration: u64,
    ) -> Result<ProposalId, GovernanceError> {
        self.module
            .module_db()
            .write_with_expect_falliable(|dbtx| {
                self.module.submit_proposal_tx(
                    dbtx,
                    BlockHeight::new(height),
                    submitter,
                    committee_id,
                    content,
                    BlockDuration::new(duration),
                )
            })
            .await
            .map(|(proposal_id, _)| proposal_id)
    }

    async fn vote(
        &self,
        height: u64,
        voter: AccountId,
        proposal_id: ProposalId,
        option: VoteOption,
    ) -> Result<(), GovernanceError> {
        self.module
            .module_db()
            .write_with_expect_falliable(|dbtx| {
                self.module
                    .vote_tx(dbtx, BlockHeight::new(height), voter, proposal_id, option)
            })
            .await
            .map(|_| ())
    }

    async fn end_block(&self, height: u64) -> Vec<ProposalResolvedEffect> {
        self.module
            .end_block(BlockHeight::new(height))
            .await
            .iter()
            .map(|effect| EffectKindExt::decode(effect).expect("Resolution effect"))
            .collect()
    }

    async fn get_param(&self, module: &str, key: &str) -> Option<ParamValue> {
        self.db
            .read_with_expect(|dbtx| {
                let tbl = dbtx.open_table(&test_params::TABLE)?;
                Ok(tbl
                    .get(&(module.to_owned(), key.to_owned()))?
                    .map(|v| v.value()))
            })
            .await
    }
}

fn ratio(s: &str) -> Ratio {
    s.parse().expect("valid ratio")
}

fn accounts(n: usize) -> Vec<AccountId> {
    (0..n).map(|_| AccountId::generate()).collect()
}

fn fixed_committee(id: u64, members: &[AccountId], permissions: PermissionSet) -> Committee {
    Committee::builder()
        .id(CommitteeId::new(id))
        .description(format!("Committee {id}"))
        .members(members.iter().copied().collect())
        .permissions(permissions)
        .vote_threshold(ratio("0.5"))
        .max_proposal_duration(BlockDuration::new(100))
        .build()
}

fn weighted_committee(id: u64, params: WeightedParams) -> Committee {
    Committee::builder()
        .id(CommitteeId::new(id))
        .permissions(PermissionSet::unrestricted())
        .vote_threshold(ratio("0.5"))
        .max_proposal_duration(BlockDuration::new(100))
        .kind(CommitteeKind::Weighted(params))
        .build()
}

fn fees_allowlist() -> PermissionSet {
    PermissionSet::new(vec![Permission::ParamChangeAllowlist {
        allowed: vec![
            AllowedParamChange::with_rule(
                "fees",
                "base",
                ValueRule::IntRange {
                    min: Some(0),
                    max: Some(1000),
                },
            ),
            AllowedParamChange::any("fees", "fail"),
        ],
    }])
}

fn text(title: &str) -> ProposalContent {
    ProposalContent::Text {
        title: title.into(),
        description: String::new(),
    }
}

fn set_param(key: &str, value: i64) -> ProposalContent {
    ProposalContent::ParamChange {
        title: format!("Set {key}"),
        description: String::new(),
        changes: vec![ParamChange {
            module: "fees".into(),
            key: key.into(),
            value: ParamValue::Int(value),
        }],
    }
}

fn delete_committee(committee_id: u64) -> ProposalContent {
    ProposalContent::CommitteeDelete {
        title: format!("Delete {committee_id}"),
        description: String::new(),
        committee_id: CommitteeId::new(committee_id),
    }
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
async fn submission_is_validated() -> BoxedErrorResult<()> {
    let members = accounts(2);
    let outsider = AccountId::generate();
    let setup =
        TestSetup::with_committees(vec![fixed_committee(1, &members, fees_allowlist())]).await?;
    let committee_id = CommitteeId::new(1);

    let err = setup
        .submit(1, members[0], CommitteeId::new(9), set_param("base", 1), 10)
        .await
        .expect_err("unknown committee");
    assert!(matches!(err, GovernanceError::InvalidCommittee { .. }));

    let err = setup
        .submit(1, outsider, committee_id, set_param("base", 1), 10)
        .await
        .expect_err("not a member");
    assert!(matches!(err, GovernanceError::Unauthorized { .. }));

    let err = setup
        .submit(1, members[0], committee_id, text("Hi"), 10)
        .await
        .expect_err("text not permitted");
    assert!(matches!(err, GovernanceError::PermissionDenied { .. }));

    let err = setup
        .submit(1, members[0], committee_id, set_param("base", 1001), 10)
        .await
        .expect_err("value out of range");
    assert!(matches!(err, GovernanceError::PermissionDenied { .. }));

    let err = setup
        .submit(1, members[0], committee_id, set_param("base", 1), 101)
        .await
        .expect_err("too long");
    assert!(matches!(err, GovernanceError::DurationExceeded { .. }));

    let err = setup
        .submit(1, members[0], committee_id, set_param("base", 1), 0)
        .await
        .expect_err("zero duration");
    assert!(matches!(err, GovernanceError::InvalidDuration { .. }));

    let err = setup
        .submit(u64::MAX - 5, members[0], committee_id, set_param("base", 1), 10)
        .await
        .expect_err("overflowing deadline");
    assert!(matches!(err, GovernanceError::InvalidDuration { .. }));

    let err = setup
        .submit(
            1,
            members[0],
            committee_id,
            ProposalContent::ParamChange {
                title: String::new(),
                description: String::new(),
                changes: vec![],
            },
            10,
        )
        .await
        .expect_err("invalid content");
    assert!(matches!(err, GovernanceError::InvalidContent { .. }));

    // Nothing was allocated or stored by the rejected submissions
    assert_eq!(setup.module.get_next_proposal_id().await, ProposalId::FIRST);
    assert!(setup.module.get_proposals().await.is_empty());

    let proposal_id = setup
        .submit(1, members[0], committee_id, set_param("base", 1), 100)
        .await?;
    assert_eq!(proposal_id, ProposalId::FIRST);
    let proposal = setup
        .module
        .get_proposal(proposal_id)
        .await
        .expect("stored");
    assert_eq!(proposal.deadline, BlockHeight::new(101));
    assert_eq!(proposal.submitter, members[0]);

    Ok(())
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
async fn citems_produce_effects() -> BoxedErrorResult<()> {
    let members = accounts(1);
    let setup = TestSetup::with_committees(vec![fixed_committee(
        1,
        &members,
        PermissionSet::unrestricted(),
    )])
    .await?;

    let submit = CommitteeCitem::SubmitProposal {
        committee_id: CommitteeId::new(1),
        content: text("Hello"),
        duration: BlockDuration::new(5),
    }
    .encode_to_raw();

    let effects = setup
        .module
        .module_db()
        .write_with_expect_falliable(|dbtx| {
            setup
                .module
                .process_citem(dbtx, BlockHeight::new(3), members[0], &submit)
        })
        .await?;
    assert_eq!(effects.len(), 1);
    let submitted: ProposalSubmittedEffect = EffectKindExt::decode(&effects[0])?;
    assert_eq!(submitted.proposal_id, ProposalId::new(1));
    assert_eq!(submitted.deadline, BlockHeight::new(8));

    let vote = CommitteeCitem::Vote {
        proposal_id: submitted.proposal_id,
        option: VoteOption::Yes,
    }
    .encode_to_raw();
    let effects = setup
        .module
        .module_db()
        .write_with_expect_falliable(|dbtx| {
            setup
                .module
                .process_citem(dbtx, BlockHeight::new(4), members[0], &vote)
        })
        .await?;
    let cast: VoteCastEffect = EffectKindExt::decode(&effects[0])?;
    assert_eq!(cast.voter, members[0]);
    assert_eq!(cast.option, VoteOption::Yes);

    // Garbage is rejected
    let res = setup
        .module
        .module_db()
        .write_with_expect_falliable(|dbtx| {
            setup.module.process_citem(
                dbtx,
                BlockHeight::new(4),
                members[0],
                &vec![0xff, 0xff, 0xff].into(),
            )
        })
        .await;
    assert!(res.is_err());

    // Rejection of a valid citem surfaces as an error too
    let res = setup
        .module
        .module_db()
        .write_with_expect_falliable(|dbtx| {
            setup
                .module
                .process_citem(dbtx, BlockHeight::new(4), AccountId::generate(), &vote)
        })
        .await;
    assert!(res.is_err());

    Ok(())
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
async fn votes_close_at_deadline() -> BoxedErrorResult<()> {
    let members = accounts(3);
    let outsider = AccountId::generate();
    let setup = TestSetup::with_committees(vec![fixed_committee(
        1,
        &members,
        PermissionSet::unrestricted(),
    )])
    .await?;

    let proposal_id = setup
        .submit(10, members[0], CommitteeId::new(1), text("Hi"), 5)
        .await?;

    // deadline - 1
    setup.vote(14, members[1], proposal_id, VoteOption::Yes).await?;

    let err = setup
        .vote(15, members[2], proposal_id, VoteOption::Yes)
        .await
        .expect_err("closed");
    assert!(matches!(err, GovernanceError::ProposalNotFound { .. }));

    let err = setup
        .vote(11, outsider, proposal_id, VoteOption::Yes)
        .await
        .expect_err("not a member");
    assert!(matches!(err, GovernanceError::Unauthorized { .. }));

    let err = setup
        .vote(11, members[2], proposal_id, VoteOption::Abstain)
        .await
        .expect_err("fixed committees only vote yes or no");
    assert!(matches!(err, GovernanceError::InvalidVoteOption { .. }));

    let err = setup
        .vote(11, members[2], ProposalId::new(42), VoteOption::Yes)
        .await
        .expect_err("no such proposal");
    assert!(matches!(err, GovernanceError::ProposalNotFound { .. }));

    assert_eq!(setup.module.get_votes(proposal_id).await.len(), 1);

    Ok(())
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
async fn revote_overwrites() -> BoxedErrorResult<()> {
    let members = accounts(3);
    let setup = TestSetup::with_committees(vec![fixed_committee(
        1,
        &members,
        PermissionSet::unrestricted(),
    )])
    .await?;
    let proposal_id = setup
        .submit(1, members[0], CommitteeId::new(1), text("Hi"), 5)
        .await?;

    setup.vote(1, members[1], proposal_id, VoteOption::Yes).await?;
    setup.vote(2, members[1], proposal_id, VoteOption::No).await?;
    setup.vote(3, members[1], proposal_id, VoteOption::Yes).await?;
    setup.vote(4, members[1], proposal_id, VoteOption::No).await?;

    let votes = setup.module.get_votes(proposal_id).await;
    assert_eq!(votes.len(), 1);
    assert_eq!(votes.get(&members[1]), Some(&VoteOption::No));

    Ok(())
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
async fn fixed_committee_passes_and_fails() -> BoxedErrorResult<()> {
    let members = accounts(3);
    let setup =
        TestSetup::with_committees(vec![fixed_committee(1, &members, fees_allowlist())]).await?;
    let committee_id = CommitteeId::new(1);

    let passing = setup
        .submit(1, members[0], committee_id, set_param("base", 7), 5)
        .await?;
    let failing = setup
        .submit(1, members[0], committee_id, set_param("base", 9), 5)
        .await?;

    setup.vote(2, members[0], passing, VoteOption::Yes).await?;
    setup.vote(2, members[1], passing, VoteOption::Yes).await?;
    setup.vote(2, members[0], failing, VoteOption::Yes).await?;
    setup.vote(2, members[1], failing, VoteOption::No).await?;

    // Nothing is due before the deadline
    assert!(setup.end_block(5).await.is_empty());

    let resolved = setup.end_block(6).await;
    assert_eq!(resolved.len(), 2);

    assert_eq!(resolved[0].proposal_id, passing);
    assert_eq!(resolved[0].outcome, ProposalOutcome::Passed);
    assert_eq!(resolved[0].reason, ResolutionReason::Enacted);

    assert_eq!(resolved[1].proposal_id, failing);
    assert_eq!(resolved[1].outcome, ProposalOutcome::Failed);
    assert_eq!(resolved[1].reason, ResolutionReason::Rejected);

    assert_eq!(setup.get_param("fees", "base").await, Some(ParamValue::Int(7)));

    // Resolved proposals and their votes are gone, and never resolve again
    assert!(setup.module.get_proposals().await.is_empty());
    assert!(setup.module.get_votes(passing).await.is_empty());
    assert!(setup.end_block(7).await.is_empty());

    Ok(())
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
async fn weighted_committee_quorum_and_veto() -> BoxedErrorResult<()> {
    let voters = accounts(4);
    let mut params = WeightedParams::new(ratio("0.4"));
    params.veto_threshold = ratio("0.33");
    let setup = TestSetup::with_committees(vec![weighted_committee(1, params)]).await?;
    for (voter, stake) in voters.iter().zip([200, 100, 400, 300]) {
        setup.set_stake(*voter, stake);
    }
    let committee_id = CommitteeId::new(1);
    let outsider = AccountId::generate();

    // Anyone may submit to and vote in a weighted committee without members
    let no_quorum = setup
        .submit(1, outsider, committee_id, text("Quorum"), 5)
        .await?;
    let vetoed = setup
        .submit(1, voters[0], committee_id, text("Veto"), 5)
        .await?;

    // 300 of 1000 participate
    setup.vote(2, voters[0], no_quorum, VoteOption::Yes).await?;
    setup.vote(2, voters[1], no_quorum, VoteOption::Yes).await?;

    // 400 of 1000 veto, the rest approves
    setup.vote(2, voters[0], vetoed, VoteOption::Yes).await?;
    setup.vote(2, voters[1], vetoed, VoteOption::Yes).await?;
    setup.vote(2, voters[3], vetoed, VoteOption::Yes).await?;
    setup.vote(2, voters[2], vetoed, VoteOption::NoWithVeto).await?;
    setup.vote(2, outsider, vetoed, VoteOption::Abstain).await?;

    let tally = setup.module.get_tally(no_quorum).await.expect("exists");
    assert_eq!(tally.counts.participation(), 300);
    assert_eq!(tally.outcome(), ProposalOutcome::Undecided);

    let resolved = setup.end_block(6).await;
    assert_eq!(resolved.len(), 2);
    assert_eq!(resolved[0].outcome, ProposalOutcome::Undecided);
    assert_eq!(resolved[0].reason, ResolutionReason::NoQuorum);
    assert_eq!(resolved[1].outcome, ProposalOutcome::Failed);
    assert_eq!(resolved[1].reason, ResolutionReason::Vetoed);

    Ok(())
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
async fn weighted_committee_counts_stake_at_tally_time() -> BoxedErrorResult<()> {
    let voters = accounts(2);
    let setup =
        TestSetup::with_committees(vec![weighted_committee(1, WeightedParams::new(ratio("0.5")))])
            .await?;
    setup.set_stake(voters[0], 100);
    setup.set_stake(voters[1], 100);

    let proposal_id = setup
        .submit(1, voters[0], CommitteeId::new(1), set_param("base", 1), 3)
        .await?;
    setup.vote(1, voters[0], proposal_id, VoteOption::Yes).await?;
    setup.vote(1, voters[1], proposal_id, VoteOption::No).await?;

    // Bonding more after voting still counts
    setup.set_stake(voters[0], 300);

    let resolved = setup.end_block(4).await;
    assert_eq!(resolved[0].reason, ResolutionReason::Enacted);

    Ok(())
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
async fn deleted_committee_fails_its_proposals() -> BoxedErrorResult<()> {
    let members = accounts(2);
    let setup = TestSetup::with_genesis(CommitteeGenesis {
        next_proposal_id: ProposalId::new(5),
        committees: vec![
            fixed_committee(1, &members, PermissionSet::unrestricted()),
            fixed_committee(2, &members, PermissionSet::unrestricted()),
        ],
        ..CommitteeGenesis::default()
    })
    .await?;

    let delete = setup
        .submit(1, members[0], CommitteeId::new(1), delete_committee(2), 5)
        .await?;
    let unrelated = setup
        .submit(1, members[0], CommitteeId::new(1), text("Later"), 50)
        .await?;
    let doomed = setup
        .submit(1, members[0], CommitteeId::new(2), text("Doomed"), 5)
        .await?;
    let survivor = setup
        .submit(1, members[0], CommitteeId::new(2), text("Survivor"), 10)
        .await?;
    assert_eq!(
        (delete, unrelated, doomed),
        (ProposalId::new(5), ProposalId::new(6), ProposalId::new(7))
    );

    for proposal_id in [delete, doomed, survivor] {
        for member in &members {
            setup.vote(2, *member, proposal_id, VoteOption::Yes).await?;
        }
    }

    // 5 and 7 expire together; executing 5 first removes 7's committee
    let resolved = setup.end_block(6).await;
    assert_eq!(resolved.len(), 2);
    assert_eq!(resolved[0].proposal_id, delete);
    assert_eq!(resolved[0].reason, ResolutionReason::Enacted);
    assert_eq!(resolved[1].proposal_id, doomed);
    assert_eq!(resolved[1].outcome, ProposalOutcome::Failed);
    assert_eq!(resolved[1].reason, ResolutionReason::CommitteeDeleted);

    assert!(setup.module.get_committee(CommitteeId::new(2)).await.is_none());

    // Deleting the committee left its other proposal in place
    assert!(setup.module.get_proposal(survivor).await.is_some());
    let err = setup
        .vote(7, members[0], survivor, VoteOption::No)
        .await
        .expect_err("committee is gone");
    assert!(matches!(err, GovernanceError::InvalidCommittee { .. }));

    let resolved = setup.end_block(11).await;
    assert_eq!(resolved.len(), 1);
    assert_eq!(resolved[0].proposal_id, survivor);
    assert_eq!(resolved[0].reason, ResolutionReason::CommitteeDeleted);

    Ok(())
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
async fn lost_permission_invalidates_passed_proposal() -> BoxedErrorResult<()> {
    let members = accounts(2);
    let setup = TestSetup::with_committees(vec![
        fixed_committee(1, &members, PermissionSet::unrestricted()),
        fixed_committee(2, &members, fees_allowlist()),
    ])
    .await?;

    let restrict = setup
        .submit(
            1,
            members[0],
            CommitteeId::new(1),
            ProposalContent::CommitteeChange {
                title: "Text only".into(),
                description: String::new(),
                committee: fixed_committee(
                    2,
                    &members,
                    PermissionSet::new(vec![Permission::TextOnly]),
                ),
            },
            5,
        )
        .await?;
    let fees = setup
        .submit(1, members[0], CommitteeId::new(2), set_param("base", 3), 5)
        .await?;

    for proposal_id in [restrict, fees] {
        for member in &members {
            setup.vote(2, *member, proposal_id, VoteOption::Yes).await?;
        }
    }

    let resolved = setup.end_block(6).await;
    assert_eq!(resolved[0].reason, ResolutionReason::Enacted);
    assert_eq!(resolved[1].proposal_id, fees);
    assert_eq!(resolved[1].outcome, ProposalOutcome::Failed);
    assert_eq!(resolved[1].reason, ResolutionReason::PermissionInvalidated);
    assert_eq!(setup.get_param("fees", "base").await, None);

    let committee = setup
        .module
        .get_committee(CommitteeId::new(2))
        .await
        .expect("still exists");
    assert_eq!(
        committee.permissions,
        PermissionSet::new(vec![Permission::TextOnly])
    );

    Ok(())
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
async fn removed_member_loses_vote_immediately() -> BoxedErrorResult<()> {
    let admins = accounts(2);
    let members = accounts(4);
    let setup = TestSetup::with_committees(vec![
        fixed_committee(1, &admins, PermissionSet::unrestricted()),
        fixed_committee(2, &members, PermissionSet::unrestricted()),
    ])
    .await?;

    let pending = setup
        .submit(1, members[0], CommitteeId::new(2), text("Pending"), 20)
        .await?;
    setup.vote(2, members[0], pending, VoteOption::Yes).await?;
    setup.vote(2, members[1], pending, VoteOption::Yes).await?;
    assert!(
        setup
            .module
            .get_tally(pending)
            .await
            .expect("exists")
            .is_passed()
    );

    let remaining = [members[0], members[2], members[3]];
    let remove = setup
        .submit(
            1,
            admins[0],
            CommitteeId::new(1),
            ProposalContent::CommitteeChange {
                title: "Remove a member".into(),
                description: String::new(),
                committee: fixed_committee(2, &remaining, PermissionSet::unrestricted()),
            },
            5,
        )
        .await?;
    for admin in &admins {
        setup.vote(2, *admin, remove, VoteOption::Yes).await?;
    }

    let resolved = setup.end_block(6).await;
    assert_eq!(resolved.len(), 1);
    assert_eq!(resolved[0].reason, ResolutionReason::Enacted);

    let err = setup
        .vote(7, members[1], pending, VoteOption::No)
        .await
        .expect_err("no longer a member");
    assert!(matches!(err, GovernanceError::Unauthorized { .. }));

    // The earlier Yes is still stored, but only current members count
    assert_eq!(
        setup.module.get_votes(pending).await.get(&members[1]),
        Some(&VoteOption::Yes)
    );
    assert!(setup.end_block(20).await.is_empty());

    let resolved = setup.end_block(21).await;
    assert_eq!(resolved.len(), 1);
    assert_eq!(resolved[0].proposal_id, pending);
    assert_eq!(resolved[0].outcome, ProposalOutcome::Failed);
    assert_eq!(resolved[0].reason, ResolutionReason::Rejected);

    Ok(())
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
async fn running_out_of_proposal_ids_is_rejected() -> BoxedErrorResult<()> {
    let members = accounts(1);
    let last = ProposalId::new(u64::MAX - 1);
    let setup = TestSetup::with_genesis(CommitteeGenesis {
        next_proposal_id: last,
        committees: vec![fixed_committee(1, &members, PermissionSet::unrestricted())],
        ..CommitteeGenesis::default()
    })
    .await?;

    let proposal_id = setup
        .submit(1, members[0], CommitteeId::new(1), text("Last"), 5)
        .await?;
    assert_eq!(proposal_id, last);

    let err = setup
        .submit(1, members[0], CommitteeId::new(1), text("One too many"), 5)
        .await
        .expect_err("ids exhausted");
    assert!(matches!(err, GovernanceError::ProposalIdsExhausted));
    assert_eq!(setup.module.get_proposals().await.len(), 1);
    assert_eq!(setup.module.get_next_proposal_id().await, ProposalId::MAX);

    // Voting and resolution keep working
    setup.vote(2, members[0], proposal_id, VoteOption::Yes).await?;
    let resolved = setup.end_block(6).await;
    assert_eq!(resolved.len(), 1);
    assert_eq!(resolved[0].reason, ResolutionReason::Enacted);

    Ok(())
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
async fn execution_failure_is_isolated() -> BoxedErrorResult<()> {
    let members = accounts(1);
    let setup =
        TestSetup::with_committees(vec![fixed_committee(1, &members, fees_allowlist())]).await?;
    let committee_id = CommitteeId::new(1);

    let broken = setup
        .submit(
            1,
            members[0],
            committee_id,
            ProposalContent::ParamChange {
                title: "Partially applied".into(),
                description: String::new(),
                changes: vec![
                    ParamChange {
                        module: "fees".into(),
                        key: "base".into(),
                        value: ParamValue::Int(100),
                    },
                    ParamChange {
                        module: "fees".into(),
                        key: "fail".into(),
                        value: ParamValue::Int(1),
                    },
                ],
            },
            5,
        )
        .await?;
    let fine = setup
        .submit(1, members[0], committee_id, set_param("base", 5), 5)
        .await?;
    setup.vote(2, members[0], broken, VoteOption::Yes).await?;
    setup.vote(2, members[0], fine, VoteOption::Yes).await?;

    let mut resolved_rx = setup.module.subscribe_resolved();

    let resolved = setup.end_block(6).await;
    assert_eq!(resolved.len(), 2);
    assert_eq!(resolved[0].proposal_id, broken);
    assert_eq!(resolved[0].outcome, ProposalOutcome::Failed);
    let ResolutionReason::ExecutionFailed { error } = &resolved[0].reason else {
        panic!("Unexpected reason: {:?}", resolved[0].reason);
    };
    assert!(error.contains("Refusing to set fail"), "{error}");
    assert_eq!(resolved[1].proposal_id, fine);
    assert_eq!(resolved[1].reason, ResolutionReason::Enacted);

    // The failed proposal's first change was rolled back
    assert_eq!(setup.get_param("fees", "base").await, Some(ParamValue::Int(5)));
    assert!(setup.module.get_proposal(broken).await.is_none());

    assert_eq!(resolved_rx.recv().await?, resolved[0]);
    assert_eq!(resolved_rx.recv().await?, resolved[1]);

    Ok(())
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
async fn first_past_the_post_resolves_early() -> BoxedErrorResult<()> {
    let members = accounts(3);
    let mut fptp = fixed_committee(1, &members, PermissionSet::unrestricted());
    fptp.tally_option = TallyOption::FirstPastThePost;
    let deadline_only = fixed_committee(2, &members, PermissionSet::unrestricted());
    let setup = TestSetup::with_committees(vec![fptp, deadline_only]).await?;

    let early = setup
        .submit(1, members[0], CommitteeId::new(1), text("Early"), 50)
        .await?;
    let late = setup
        .submit(1, members[0], CommitteeId::new(2), text("Late"), 50)
        .await?;

    setup.vote(2, members[0], early, VoteOption::Yes).await?;
    setup.vote(2, members[0], late, VoteOption::Yes).await?;

    // 1 of 3 is not enough yet
    assert!(setup.end_block(2).await.is_empty());

    setup.vote(3, members[1], early, VoteOption::Yes).await?;
    setup.vote(3, members[1], late, VoteOption::Yes).await?;

    let resolved = setup.end_block(3).await;
    assert_eq!(resolved.len(), 1);
    assert_eq!(resolved[0].proposal_id, early);
    assert_eq!(resolved[0].reason, ResolutionReason::Enacted);
    assert_eq!(resolved[0].height, BlockHeight::new(3));

    let resolved = setup.end_block(51).await;
    assert_eq!(resolved.len(), 1);
    assert_eq!(resolved[0].proposal_id, late);

    Ok(())
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
async fn genesis_roundtrip() -> BoxedErrorResult<()> {
    let members = accounts(2);
    let setup = TestSetup::with_committees(vec![fixed_committee(
        1,
        &members,
        PermissionSet::unrestricted(),
    )])
    .await?;
    let proposal_id = setup
        .submit(1, members[0], CommitteeId::new(1), text("Pending"), 5)
        .await?;
    setup.vote(1, members[1], proposal_id, VoteOption::No).await?;

    let exported = setup.module.export_genesis().await;
    assert_eq!(exported.next_proposal_id, ProposalId::new(2));
    assert_eq!(exported.committees.len(), 1);
    assert_eq!(exported.proposals.len(), 1);
    assert_eq!(exported.votes.len(), 1);

    let json = serde_json::to_string(&exported)?;
    let parsed: CommitteeGenesis = serde_json::from_str(&json)?;
    assert_eq!(parsed, exported);

    let restored = TestSetup::with_genesis(parsed.clone()).await?;
    assert_eq!(restored.module.export_genesis().await, exported);

    let err = restored
        .module
        .module_db()
        .write_with_expect_falliable(|dbtx| CommitteeModule::import_genesis_tx(dbtx, &parsed))
        .await
        .expect_err("already initialized");
    assert!(matches!(err, GenesisError::AlreadyInitialized));

    Ok(())
}
