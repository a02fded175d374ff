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

//! Shared fixtures for client integration tests.
//!
//! Every fixture runs against an in-memory ledger, an in-memory content
//! store and a fixed clock, with poll and pacing intervals small enough
//! to keep the suites fast.

#![allow(dead_code)]

use ledgergit_client::{
    ChangedBlob, ClientResult, CommitOutcome, CommitPipeline, CommitRequest, Session, Wallet,
};
use ledgergit_config::Config;
use ledgergit_ledger::{Address, FakeLedger, FixedClock};
use ledgergit_storage::{ContentStore, MemoryContentStore};
use ledgergit_versioning::Oid;
use std::sync::Arc;

pub const REPO: &str = "repo";
pub const PUBKEY: &str = "0xa11ce";
pub const START: i64 = 1_000;
pub const VOTE_DELAY: i64 = 10;
pub const VOTE_DURATION: i64 = 100;

pub struct Harness {
    pub ledger: FakeLedger,
    pub clock: FixedClock,
    pub store: Arc<MemoryContentStore>,
    pub dao: Address,
    pub wallet: Address,
    pub session: Session,
}

impl Harness {
    pub async fn commit(&self, request: &CommitRequest) -> ClientResult<CommitOutcome> {
        CommitPipeline::new(&self.session).create_commit(request).await
    }

    pub async fn write(
        &self,
        branch: &str,
        path: &str,
        content: &str,
    ) -> ClientResult<CommitOutcome> {
        let request = CommitRequest::new(branch, format!("Update {}", path))
            .with_blob(ChangedBlob::write(path, content));
        self.commit(&request).await
    }

    /// Session for another member wallet holding `tokens`
    pub async fn member(&self, pubkey: &str, tokens: u64) -> (Address, Session) {
        let (address, signer) = self.ledger.create_wallet(&self.dao, pubkey, tokens).await;
        let session = self.session.with_wallet(Wallet::new(address.clone(), signer));
        (address, session)
    }

    pub async fn writes(&self) -> usize {
        self.ledger.calls().await.iter().filter(|c| c.write).count()
    }
}

pub fn fast_config() -> Config {
    let mut config = Config::default();
    config.writer.pacing_interval_ms = 0;
    config.consistency.poll_interval_ms = 5;
    config.consistency.max_interval_ms = 5;
    config.consistency.timeout_ms = 500;
    config
}

pub async fn harness() -> Harness {
    harness_with(FakeLedger::new(), fast_config(), 50).await
}

/// Build a harness; `ledger` gets the harness clock and vote window
pub async fn harness_with(ledger: FakeLedger, config: Config, tokens: u64) -> Harness {
    let clock = FixedClock::at_unix(START);
    let ledger = ledger
        .with_clock(Arc::new(clock.clone()))
        .with_vote_window(VOTE_DELAY, VOTE_DURATION);
    let dao = ledger.create_dao("dao").await;
    ledger.create_repo(&dao, REPO).await;
    ledger.create_branch(REPO, "feature", Oid::ZERO).await;
    let (wallet, signer) = ledger.create_wallet(&dao, PUBKEY, tokens).await;

    let store = Arc::new(MemoryContentStore::new());
    let shared: Arc<dyn ContentStore> = Arc::<MemoryContentStore>::clone(&store);
    let session = Session::builder(Arc::new(ledger.clone()))
        .root(ledger.root())
        .dao(dao.clone())
        .repo(REPO)
        .wallet(Wallet::new(wallet.clone(), signer))
        .content_store(shared)
        .clock(Arc::new(clock.clone()))
        .config(config)
        .build();

    Harness {
        ledger,
        clock,
        store,
        dao,
        wallet,
        session,
    }
}
