// LedgerGit - Git objects on a remote ledger
// Copyright (C) 2025 LedgerGit Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published
// by the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.

//! Protected branches, proposals and voting

mod common;

use common::{fast_config, harness, harness_with, REPO, START, VOTE_DELAY, VOTE_DURATION};
use ledgergit_client::{
    BranchUpdate, ClientError, CommitOutcome, ErrorKind, PreconditionError, ProposalState,
    ProposalStateMachine, Session, ValidationError,
};
use ledgergit_ledger::{methods, Address, Clock, FakeLedger, OutcomeRule, ProposalRecord};
use std::sync::Arc;

fn proposal_of(outcome: &CommitOutcome) -> Address {
    match &outcome.update {
        BranchUpdate::Proposed { proposal } => proposal.clone(),
        other => panic!("expected a proposal, got {:?}", other),
    }
}

#[tokio::test]
async fn test_governed_commit_goes_through_vote() {
    let h = harness().await;

    let outcome = h.write("main", "README.md", "hello").await.unwrap();
    let proposal = proposal_of(&outcome);

    // Branch is untouched until the proposal passes.
    let main = h.ledger.branch(REPO, "main").await.unwrap();
    assert!(main.is_empty());
    assert_eq!(h.ledger.write_count(methods::SET_COMMIT).await, 0);
    assert!(h.ledger.locker(&h.wallet).await.unwrap().is_busy);

    let record = h.ledger.proposal(&proposal).await.unwrap();
    assert_eq!(record.commit, outcome.commit);
    assert_eq!(record.branch, "main");
    assert_eq!(record.start, START + VOTE_DELAY);
    assert_eq!(ProposalState::of(&record, START), ProposalState::Created);

    let (_, member) = h.member("0xb0b", 30).await;
    h.clock.advance(VOTE_DELAY);
    let voted = ProposalStateMachine::new(&member)
        .vote(&proposal, true, 25)
        .await
        .unwrap();
    assert_eq!(voted.votes_yes, 25);
    assert_eq!(
        ProposalState::of(&voted, h.clock.unix()),
        ProposalState::Open
    );

    // Still open: resolving changes nothing.
    let proposals = ProposalStateMachine::new(&h.session);
    let status = proposals.try_resolve(&proposal).await.unwrap();
    assert!(!status.completed);

    h.clock.advance(VOTE_DURATION);
    let status = proposals.try_resolve(&proposal).await.unwrap();
    assert!(status.completed);
    assert!(status.accepted);

    let main = h.ledger.branch(REPO, "main").await.unwrap();
    assert_eq!(main.commit, outcome.commit);
    assert!(!h.ledger.locker(&h.wallet).await.unwrap().is_busy);
}

#[tokio::test]
async fn test_busy_locker_blocks_commit_and_vote() {
    let h = harness().await;
    let first = h.write("main", "a.txt", "a").await.unwrap();
    let proposal = proposal_of(&first);
    h.clock.advance(VOTE_DELAY);
    let writes = h.writes().await;

    let err = h.write("main", "b.txt", "b").await.unwrap_err();
    assert!(matches!(
        err,
        ClientError::Validation(ValidationError::LockerBusy)
    ));

    let err = ProposalStateMachine::new(&h.session)
        .vote(&proposal, true, 1)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ClientError::Validation(ValidationError::LockerBusy)
    ));
    assert_eq!(h.writes().await, writes);

    // Unprotected branches are unaffected.
    h.write("feature", "b.txt", "b").await.unwrap();
}

#[tokio::test]
async fn test_try_resolve_is_idempotent() {
    let h = harness().await;
    let proposal = proposal_of(&h.write("main", "a.txt", "a").await.unwrap());
    let (_, member) = h.member("0xb0b", 30).await;
    h.clock.advance(VOTE_DELAY);
    ProposalStateMachine::new(&member)
        .vote(&proposal, true, 10)
        .await
        .unwrap();
    h.clock.advance(VOTE_DURATION);

    let proposals = ProposalStateMachine::new(&h.session);
    let first = proposals.try_resolve(&proposal).await.unwrap();
    let calls = h.ledger.write_count(methods::TRY_PROPOSAL_RESULT).await;
    assert_eq!(calls, 1);

    let second = proposals.try_resolve(&proposal).await.unwrap();
    let third = ProposalStateMachine::new(&member)
        .try_resolve(&proposal)
        .await
        .unwrap();
    assert_eq!(first, second);
    assert_eq!(first, third);
    assert_eq!(h.ledger.write_count(methods::TRY_PROPOSAL_RESULT).await, calls);
    assert_eq!(
        proposals.wait_resolved(&proposal).await.unwrap(),
        first
    );
}

#[tokio::test]
async fn test_vote_outside_window() {
    let h = harness().await;
    let proposal = proposal_of(&h.write("main", "a.txt", "a").await.unwrap());
    let (_, member) = h.member("0xb0b", 30).await;
    let voter = ProposalStateMachine::new(&member);
    let writes = h.writes().await;

    let err = voter.vote(&proposal, true, 5).await.unwrap_err();
    match err {
        ClientError::Validation(ValidationError::NoStartYet { start, now }) => {
            assert_eq!(start, START + VOTE_DELAY);
            assert_eq!(now, START);
        }
        other => panic!("unexpected error {:?}", other),
    }

    h.clock.advance(VOTE_DELAY + VOTE_DURATION);
    let err = voter.vote(&proposal, true, 5).await.unwrap_err();
    assert!(matches!(
        err,
        ClientError::Validation(ValidationError::VotingClosed)
    ));
    assert_eq!(h.writes().await, writes);
}

#[tokio::test]
async fn test_vote_needs_free_tokens() {
    let h = harness().await;
    let proposal = proposal_of(&h.write("main", "a.txt", "a").await.unwrap());
    let (_, member) = h.member("0xb0b", 10).await;
    h.clock.advance(VOTE_DELAY);
    let voter = ProposalStateMachine::new(&member);

    voter.vote(&proposal, false, 6).await.unwrap();
    let err = voter.vote(&proposal, false, 6).await.unwrap_err();
    assert!(matches!(
        err,
        ClientError::Validation(ValidationError::InsufficientBalance {
            requested: 6,
            available: 4
        })
    ));
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_rejected_proposal_leaves_branch() {
    let h = harness().await;
    let proposal = proposal_of(&h.write("main", "a.txt", "a").await.unwrap());
    let (_, yes) = h.member("0xb0b", 10).await;
    let (_, no) = h.member("0xca401", 20).await;
    h.clock.advance(VOTE_DELAY);
    ProposalStateMachine::new(&yes)
        .vote(&proposal, true, 10)
        .await
        .unwrap();
    ProposalStateMachine::new(&no)
        .vote(&proposal, false, 20)
        .await
        .unwrap();
    h.clock.advance(VOTE_DURATION);

    let status = ProposalStateMachine::new(&h.session)
        .try_resolve(&proposal)
        .await
        .unwrap();
    assert!(status.completed);
    assert!(!status.accepted);
    assert!(h.ledger.branch(REPO, "main").await.unwrap().is_empty());
    assert!(!h.ledger.locker(&h.wallet).await.unwrap().is_busy);
}

#[tokio::test]
async fn test_quorum_is_decided_by_the_ledger() {
    // Accept only with at least 40 yes votes.
    let rule: OutcomeRule = Arc::new(|p: &ProposalRecord| p.votes_yes >= 40);
    let h = harness_with(FakeLedger::new().with_outcome_rule(rule), fast_config(), 50).await;
    let proposal = proposal_of(&h.write("main", "a.txt", "a").await.unwrap());
    let (_, member) = h.member("0xb0b", 30).await;
    h.clock.advance(VOTE_DELAY);
    ProposalStateMachine::new(&member)
        .vote(&proposal, true, 30)
        .await
        .unwrap();
    h.clock.advance(VOTE_DURATION);

    let status = ProposalStateMachine::new(&h.session)
        .try_resolve(&proposal)
        .await
        .unwrap();
    assert!(status.completed);
    assert!(!status.accepted);
}

#[tokio::test]
async fn test_release_after_completion() {
    let h = harness().await;
    let proposal = proposal_of(&h.write("main", "a.txt", "a").await.unwrap());
    let (wallet, member) = h.member("0xb0b", 30).await;
    let voter = ProposalStateMachine::new(&member);
    h.clock.advance(VOTE_DELAY);
    voter.vote(&proposal, true, 12).await.unwrap();

    let err = voter.release(&proposal).await.unwrap_err();
    assert!(matches!(
        err,
        ClientError::Validation(ValidationError::ProposalOpen)
    ));

    h.clock.advance(VOTE_DURATION);
    voter.try_resolve(&proposal).await.unwrap();
    assert_eq!(voter.release(&proposal).await.unwrap(), 12);
    assert_eq!(h.ledger.locker(&wallet).await.unwrap().votes_locked, 0);

    let releases = h.ledger.write_count(methods::RELEASE_LOCKED).await;
    assert_eq!(voter.release(&proposal).await.unwrap(), 0);
    assert_eq!(h.ledger.write_count(methods::RELEASE_LOCKED).await, releases);

    // The proposer never voted.
    assert_eq!(
        ProposalStateMachine::new(&h.session)
            .release(&proposal)
            .await
            .unwrap(),
        0
    );
}

#[tokio::test]
async fn test_low_balance_blocks_governed_commit() {
    let h = harness_with(FakeLedger::new(), fast_config(), 5).await;

    let err = h.write("main", "a.txt", "a").await.unwrap_err();
    assert!(matches!(
        err,
        ClientError::Validation(ValidationError::InsufficientBalance {
            requested: 20,
            available: 5
        })
    ));
    assert_eq!(h.writes().await, 0);
}

#[tokio::test]
async fn test_governed_commit_needs_dao() {
    let h = harness().await;
    let no_dao = Session::builder(Arc::new(h.ledger.clone()))
        .root(h.ledger.root())
        .repo(REPO)
        .wallet(h.session.wallet().unwrap().clone())
        .config(fast_config())
        .build();

    let err = ledgergit_client::CommitPipeline::new(&no_dao)
        .create_commit(
            &ledgergit_client::CommitRequest::new("main", "x")
                .with_blob(ledgergit_client::ChangedBlob::write("a.txt", "a")),
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ClientError::Precondition(PreconditionError::NoDao)
    ));
    assert_eq!(h.writes().await, 0);
}

#[tokio::test]
async fn test_unknown_proposal() {
    let h = harness().await;
    let missing = Address::new("0:missing");

    let err = ProposalStateMachine::new(&h.session)
        .try_resolve(&missing)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ClientError::Precondition(PreconditionError::NoProposal(_))
    ));
}

#[tokio::test]
async fn test_lock_and_unlock_voting_tokens() {
    let h = harness().await;
    h.ledger.fund_wallet(&h.wallet, 40).await;
    let proposals = ProposalStateMachine::new(&h.session);

    let locker = proposals.lock_voting(30).await.unwrap();
    assert_eq!(locker.votes_total, 80);
    assert_eq!(h.ledger.wallet_balance(&h.wallet).await, Some(10));

    let locker = proposals.unlock_voting(70).await.unwrap();
    assert_eq!(locker.votes_total, 10);
    assert_eq!(h.ledger.wallet_balance(&h.wallet).await, Some(80));

    let writes = h.writes().await;
    let err = proposals.unlock_voting(11).await.unwrap_err();
    assert!(matches!(
        err,
        ClientError::Validation(ValidationError::InsufficientBalance { .. })
    ));
    assert_eq!(h.writes().await, writes);

    // Overdrawing the wallet is left to the ledger.
    let err = proposals.lock_voting(1_000).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Remote);
    assert!(!err.is_retryable());
}
