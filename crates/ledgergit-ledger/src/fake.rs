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

//! In-memory ledger
//!
//! [`FakeLedger`] implements [`RemoteLedgerAdapter`] over a map of accounts
//! guarded by an `Arc<RwLock<..>>`. It enforces the ledger-side rules the
//! client relies on (write-once objects, protected branches, locker
//! exclusion, vote windows, proposal resolution) and can simulate the
//! awkward parts of a real ledger:
//!
//! - visibility lag: writes are acknowledged immediately but applied only
//!   after a number of subsequent reads
//! - dropped writes: acknowledged and never applied
//! - injected transport failures per method
//!
//! Every call is recorded so tests can assert on what was sent.
//!
//! # Examples
//!
//! ```rust
//! use ledgergit_ledger::{methods, FakeLedger, RemoteLedgerAdapter};
//! use serde_json::json;
//!
//! # tokio_test::block_on(async {
//! let ledger = FakeLedger::new();
//! let dao = ledger.create_dao("dao").await;
//! let repo = ledger.create_repo(&dao, "repo").await;
//!
//! let main = ledger
//!     .run_local(&repo, methods::GET_BRANCH, json!({ "name": "main" }))
//!     .await
//!     .unwrap();
//! assert_eq!(main["name"], "main");
//! # });
//! ```

use crate::clock::{Clock, SystemClock};
use crate::methods::{self, from_args};
use crate::records::{
    client_key, proposal_key, Branch, ClientRecord, EntityKind, LockerRecord, ProposalRecord,
};
use crate::records::{BlobRecord, CommitRecord, TreeRecord};
use crate::{AccountStatus, Ack, Address, LedgerError, LedgerResult, RemoteLedgerAdapter, Signer};
use async_trait::async_trait;
use ledgergit_versioning::Oid;
use serde::Serialize;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

const EXIT_BAD_TARGET: i32 = 50;
const EXIT_UNKNOWN_METHOD: i32 = 60;
const EXIT_NOT_OWNER: i32 = 102;
const EXIT_PROTECTED: i32 = 110;
const EXIT_MISSING: i32 = 120;
const EXIT_LOCKER_BUSY: i32 = 130;
const EXIT_BALANCE: i32 = 131;
const EXIT_WINDOW: i32 = 140;
const EXIT_NOT_COMPLETED: i32 = 141;
const EXIT_EXISTS: i32 = 150;

/// Decides whether a proposal whose voting window has closed is accepted
pub type OutcomeRule = Arc<dyn Fn(&ProposalRecord) -> bool + Send + Sync>;

/// Deterministic address of an entity
///
/// Matches what the fake ledger answers for `getAddress`.
pub fn derive_address(kind: &str, scope: &str, name: &str) -> Address {
    let mut hasher = Sha256::new();
    hasher.update(kind.as_bytes());
    hasher.update(b":");
    hasher.update(scope.as_bytes());
    hasher.update(b":");
    hasher.update(name.as_bytes());
    Address::new(format!("0:{}", hex::encode(hasher.finalize())))
}

fn entity_address(kind: EntityKind, scope: &str, name: &str) -> Address {
    derive_address(kind.as_str(), scope, name)
}

/// One call made against the fake ledger
#[derive(Debug, Clone, PartialEq)]
pub struct CallRecord {
    /// Method name
    pub method: String,
    /// Target account
    pub target: Address,
    /// Call arguments
    pub args: Value,
    /// Whether this was a state-changing call
    pub write: bool,
}

#[derive(Debug, Clone)]
struct RepoAccount {
    dao: Address,
    branches: BTreeMap<String, Branch>,
    protected: HashSet<String>,
}

#[derive(Debug, Clone)]
struct WalletAccount {
    pubkey: String,
    dao: Address,
    balance: u64,
    locker: LockerRecord,
}

#[derive(Debug, Clone)]
enum Account {
    Root,
    Dao,
    Repository(RepoAccount),
    Wallet(WalletAccount),
    Commit(CommitRecord),
    Tree(TreeRecord),
    Blob(BlobRecord),
    Proposal(ProposalRecord),
    Client(ClientRecord),
}

#[derive(Debug, Clone)]
struct WriteCall {
    wallet: Address,
    method: String,
    args: Value,
}

#[derive(Debug)]
struct Pending {
    reads_left: u32,
    call: WriteCall,
}

#[derive(Debug, Default)]
struct State {
    accounts: HashMap<Address, Account>,
    pending: Vec<Pending>,
    calls: Vec<CallRecord>,
    bounced: Vec<(String, LedgerError)>,
    failures: HashMap<String, usize>,
    dropped: HashSet<String>,
    transactions: u64,
}

impl State {
    fn check_failure(&mut self, method: &str) -> LedgerResult<()> {
        if let Some(successes) = self.failures.get_mut(method) {
            if *successes == 0 {
                return Err(LedgerError::transport(method, "injected failure"));
            }
            *successes -= 1;
        }
        Ok(())
    }

    fn wallet(&self, address: &Address, method: &str) -> LedgerResult<WalletAccount> {
        match self.accounts.get(address) {
            Some(Account::Wallet(wallet)) => Ok(wallet.clone()),
            Some(_) => Err(LedgerError::rejected(method, EXIT_BAD_TARGET, "not a wallet")),
            None => Err(LedgerError::AccountNotFound(address.to_string())),
        }
    }

    fn repo(&self, name: &str, method: &str) -> LedgerResult<(Address, RepoAccount)> {
        let address = entity_address(EntityKind::Repository, "", name);
        match self.accounts.get(&address) {
            Some(Account::Repository(repo)) => Ok((address, repo.clone())),
            _ => Err(LedgerError::rejected(
                method,
                EXIT_MISSING,
                format!("no repository {}", name),
            )),
        }
    }

    fn proposal(&self, address: &Address, method: &str) -> LedgerResult<ProposalRecord> {
        match self.accounts.get(address) {
            Some(Account::Proposal(proposal)) => Ok(proposal.clone()),
            _ => Err(LedgerError::rejected(
                method,
                EXIT_MISSING,
                format!("no proposal at {}", address),
            )),
        }
    }

    fn has_commit(&self, repo: &str, sha: &Oid) -> bool {
        matches!(
            self.accounts
                .get(&entity_address(EntityKind::Commit, repo, &sha.to_hex())),
            Some(Account::Commit(_))
        )
    }

    fn insert_once(&mut self, address: Address, account: Account) {
        self.accounts.entry(address).or_insert(account);
    }
}

/// In-memory [`RemoteLedgerAdapter`]
///
/// Clones share state.
#[derive(Clone)]
pub struct FakeLedger {
    state: Arc<RwLock<State>>,
    clock: Arc<dyn Clock>,
    outcome: OutcomeRule,
    visibility_lag: u32,
    vote_delay: i64,
    vote_duration: i64,
}

impl fmt::Debug for FakeLedger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FakeLedger")
            .field("clock", &self.clock)
            .field("visibility_lag", &self.visibility_lag)
            .field("vote_delay", &self.vote_delay)
            .field("vote_duration", &self.vote_duration)
            .finish_non_exhaustive()
    }
}

impl Default for FakeLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeLedger {
    /// Create an empty ledger holding only the root account
    pub fn new() -> Self {
        let mut state = State::default();
        state.accounts.insert(Self::root_address(), Account::Root);
        Self {
            state: Arc::new(RwLock::new(state)),
            clock: Arc::new(SystemClock),
            outcome: Arc::new(|p: &ProposalRecord| p.votes_yes > p.votes_no),
            visibility_lag: 0,
            vote_delay: 0,
            vote_duration: 3600,
        }
    }

    /// Use `clock` for vote windows
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Apply writes only after `reads` further reads
    pub fn with_visibility_lag(mut self, reads: u32) -> Self {
        self.visibility_lag = reads;
        self
    }

    /// Open voting `delay` seconds after a proposal starts, for `duration` seconds
    pub fn with_vote_window(mut self, delay: i64, duration: i64) -> Self {
        self.vote_delay = delay;
        self.vote_duration = duration;
        self
    }

    /// Replace the acceptance rule (default: more yes than no)
    pub fn with_outcome_rule(mut self, rule: OutcomeRule) -> Self {
        self.outcome = rule;
        self
    }

    fn root_address() -> Address {
        derive_address("root", "", "")
    }

    /// Address of the root account
    pub fn root(&self) -> Address {
        Self::root_address()
    }

    /// Create a DAO account
    pub async fn create_dao(&self, name: &str) -> Address {
        let address = derive_address("dao", "", name);
        self.state.write().await.insert_once(address.clone(), Account::Dao);
        address
    }

    /// Create a repository with an empty, protected `main` branch
    pub async fn create_repo(&self, dao: &Address, name: &str) -> Address {
        let address = entity_address(EntityKind::Repository, "", name);
        let mut branches = BTreeMap::new();
        branches.insert(
            "main".to_string(),
            Branch {
                name: "main".to_string(),
                commit: Oid::ZERO,
                commit_address: None,
            },
        );
        let repo = RepoAccount {
            dao: dao.clone(),
            branches,
            protected: HashSet::from(["main".to_string()]),
        };
        self.state
            .write()
            .await
            .insert_once(address.clone(), Account::Repository(repo));
        address
    }

    /// Create or reset a branch pointing at `commit`
    pub async fn create_branch(&self, repo: &str, name: &str, commit: Oid) {
        let address = entity_address(EntityKind::Repository, "", repo);
        let mut state = self.state.write().await;
        let commit_address =
            (!commit.is_zero()).then(|| entity_address(EntityKind::Commit, repo, &commit.to_hex()));
        if let Some(Account::Repository(account)) = state.accounts.get_mut(&address) {
            account.branches.insert(
                name.to_string(),
                Branch {
                    name: name.to_string(),
                    commit,
                    commit_address,
                },
            );
        }
    }

    /// Mark a branch as protected so `setCommit` is refused for it
    pub async fn protect_branch(&self, repo: &str, name: &str) {
        let address = entity_address(EntityKind::Repository, "", repo);
        if let Some(Account::Repository(account)) =
            self.state.write().await.accounts.get_mut(&address)
        {
            account.protected.insert(name.to_string());
        }
    }

    /// Create a member wallet whose locker holds `tokens`
    pub async fn create_wallet(
        &self,
        dao: &Address,
        pubkey: &str,
        tokens: u64,
    ) -> (Address, Signer) {
        let address = derive_address("wallet", dao.as_str(), pubkey);
        let wallet = WalletAccount {
            pubkey: pubkey.to_string(),
            dao: dao.clone(),
            balance: 0,
            locker: LockerRecord {
                votes_total: tokens,
                votes_locked: 0,
                is_busy: false,
            },
        };
        self.state
            .write()
            .await
            .insert_once(address.clone(), Account::Wallet(wallet));
        let signer = Signer::new(pubkey, format!("secret-{}", pubkey));
        (address, signer)
    }

    /// Credit tokens to a wallet outside its locker
    pub async fn fund_wallet(&self, wallet: &Address, amount: u64) {
        if let Some(Account::Wallet(account)) = self.state.write().await.accounts.get_mut(wallet) {
            account.balance += amount;
        }
    }

    /// Wallet tokens held outside the locker
    pub async fn wallet_balance(&self, wallet: &Address) -> Option<u64> {
        match self.state.read().await.accounts.get(wallet) {
            Some(Account::Wallet(account)) => Some(account.balance),
            _ => None,
        }
    }

    /// Make every call of `method` fail with a transport error
    pub async fn fail_method(&self, method: &str) {
        self.fail_method_after(method, 0).await;
    }

    /// Let `successes` calls of `method` through, then fail the rest
    pub async fn fail_method_after(&self, method: &str, successes: usize) {
        self.state
            .write()
            .await
            .failures
            .insert(method.to_string(), successes);
    }

    /// Acknowledge `method` writes without ever applying them
    pub async fn drop_writes(&self, method: &str) {
        self.state.write().await.dropped.insert(method.to_string());
    }

    /// Remove injected failures and dropped methods
    pub async fn heal(&self) {
        let mut state = self.state.write().await;
        state.failures.clear();
        state.dropped.clear();
    }

    /// Apply every pending write now
    pub async fn settle(&self) {
        let mut state = self.state.write().await;
        let pending: Vec<_> = state.pending.drain(..).map(|p| p.call).collect();
        for call in pending {
            self.apply(&mut state, call);
        }
    }

    /// All calls made so far
    pub async fn calls(&self) -> Vec<CallRecord> {
        self.state.read().await.calls.clone()
    }

    /// Number of write calls made for `method`
    pub async fn write_count(&self, method: &str) -> usize {
        self.state
            .read()
            .await
            .calls
            .iter()
            .filter(|c| c.write && c.method == method)
            .count()
    }

    /// Forget recorded calls
    pub async fn clear_calls(&self) {
        self.state.write().await.calls.clear();
    }

    /// Lagged writes the ledger refused when it finally applied them
    pub async fn bounced(&self) -> Vec<(String, LedgerError)> {
        self.state.read().await.bounced.clone()
    }

    /// Applied state of a branch, ignoring read lag
    pub async fn branch(&self, repo: &str, name: &str) -> Option<Branch> {
        let address = entity_address(EntityKind::Repository, "", repo);
        match self.state.read().await.accounts.get(&address) {
            Some(Account::Repository(account)) => account.branches.get(name).cloned(),
            _ => None,
        }
    }

    /// Applied state of a wallet's locker
    pub async fn locker(&self, wallet: &Address) -> Option<LockerRecord> {
        match self.state.read().await.accounts.get(wallet) {
            Some(Account::Wallet(account)) => Some(account.locker),
            _ => None,
        }
    }

    /// Applied state of a proposal
    pub async fn proposal(&self, address: &Address) -> Option<ProposalRecord> {
        match self.state.read().await.accounts.get(address) {
            Some(Account::Proposal(proposal)) => Some(proposal.clone()),
            _ => None,
        }
    }

    /// Every proposal on the ledger
    pub async fn proposals(&self) -> Vec<(Address, ProposalRecord)> {
        self.state
            .read()
            .await
            .accounts
            .iter()
            .filter_map(|(address, account)| match account {
                Account::Proposal(p) => Some((address.clone(), p.clone())),
                _ => None,
            })
            .collect()
    }

    /// Applied commit record
    pub async fn commit(&self, repo: &str, sha: &Oid) -> Option<CommitRecord> {
        let address = entity_address(EntityKind::Commit, repo, &sha.to_hex());
        match self.state.read().await.accounts.get(&address) {
            Some(Account::Commit(commit)) => Some(commit.clone()),
            _ => None,
        }
    }

    /// Applied tree record
    pub async fn tree(&self, repo: &str, sha: &Oid) -> Option<TreeRecord> {
        let address = entity_address(EntityKind::Tree, repo, &sha.to_hex());
        match self.state.read().await.accounts.get(&address) {
            Some(Account::Tree(tree)) => Some(tree.clone()),
            _ => None,
        }
    }

    /// Applied blob record
    pub async fn blob(&self, repo: &str, sha: &Oid) -> Option<BlobRecord> {
        let address = entity_address(EntityKind::Blob, repo, &sha.to_hex());
        match self.state.read().await.accounts.get(&address) {
            Some(Account::Blob(blob)) => Some(blob.clone()),
            _ => None,
        }
    }

    /// Number of applied accounts of `kind`
    pub async fn count(&self, kind: EntityKind) -> usize {
        self.state
            .read()
            .await
            .accounts
            .values()
            .filter(|account| {
                matches!(
                    (kind, account),
                    (EntityKind::Repository, Account::Repository(_))
                        | (EntityKind::Commit, Account::Commit(_))
                        | (EntityKind::Tree, Account::Tree(_))
                        | (EntityKind::Blob, Account::Blob(_))
                        | (EntityKind::Proposal, Account::Proposal(_))
                        | (EntityKind::Client, Account::Client(_))
                )
            })
            .count()
    }

    fn tick(&self, state: &mut State) {
        let mut ready = Vec::new();
        state.pending.retain_mut(|pending| {
            pending.reads_left = pending.reads_left.saturating_sub(1);
            if pending.reads_left == 0 {
                ready.push(pending.call.clone());
                false
            } else {
                true
            }
        });
        for call in ready {
            self.apply(state, call);
        }
    }

    fn apply(&self, state: &mut State, call: WriteCall) {
        let method = call.method.clone();
        if let Err(err) = self.execute(state, call) {
            warn!(method = %method, error = %err, "Lagged write bounced");
            state.bounced.push((method, err));
        }
    }

    fn read(
        &self,
        state: &State,
        target: &Address,
        method: &str,
        args: Value,
    ) -> LedgerResult<Value> {
        let account = state
            .accounts
            .get(target)
            .ok_or_else(|| LedgerError::AccountNotFound(target.to_string()))?;

        match (method, account) {
            (methods::GET_ADDRESS, Account::Root) => {
                let args: methods::GetAddress = from_args(method, args)?;
                let address = entity_address(args.kind, &args.scope, &args.name);
                Ok(json!({ "address": address }))
            }
            (methods::GET_BRANCH, Account::Repository(repo)) => {
                let args: methods::GetBranch = from_args(method, args)?;
                encode(method, &repo.branches.get(&args.name))
            }
            (methods::GET_BRANCHES, Account::Repository(repo)) => {
                encode(method, &repo.branches.values().collect::<Vec<_>>())
            }
            (methods::GET_LOCKER, Account::Wallet(wallet)) => encode(method, &wallet.locker),
            (methods::GET_DETAILS, Account::Commit(record)) => encode(method, record),
            (methods::GET_DETAILS, Account::Tree(record)) => encode(method, record),
            (methods::GET_DETAILS, Account::Blob(record)) => encode(method, record),
            (methods::GET_DETAILS, Account::Proposal(record)) => encode(method, record),
            (methods::GET_DETAILS, Account::Client(record)) => encode(method, record),
            (methods::GET_DETAILS, Account::Wallet(wallet)) => Ok(json!({
                "pubkey": wallet.pubkey,
                "dao": wallet.dao,
                "balance": wallet.balance,
            })),
            (methods::GET_DETAILS, Account::Repository(repo)) => Ok(json!({ "dao": repo.dao })),
            _ => Err(LedgerError::rejected(
                method,
                EXIT_UNKNOWN_METHOD,
                format!("{} is not callable on {}", method, target),
            )),
        }
    }

    fn execute(&self, state: &mut State, call: WriteCall) -> LedgerResult<()> {
        let WriteCall {
            wallet,
            method,
            args,
        } = call;
        let method = method.as_str();
        let now = self.clock.unix();

        match method {
            methods::DEPLOY_COMMIT => {
                let args: methods::DeployCommit = from_args(method, args)?;
                state.repo(&args.repo, method)?;
                let address =
                    entity_address(EntityKind::Commit, &args.repo, &args.commit.name.to_hex());
                state.insert_once(address, Account::Commit(args.commit));
            }
            methods::DEPLOY_TREE => {
                let args: methods::DeployTree = from_args(method, args)?;
                state.repo(&args.repo, method)?;
                let address = entity_address(EntityKind::Tree, &args.repo, &args.tree.sha.to_hex());
                state.insert_once(address, Account::Tree(args.tree));
            }
            methods::DEPLOY_BLOB => {
                let args: methods::DeployBlob = from_args(method, args)?;
                state.repo(&args.repo, method)?;
                let address = entity_address(EntityKind::Blob, &args.repo, &args.blob.sha.to_hex());
                state.insert_once(address, Account::Blob(args.blob));
            }
            methods::SET_COMMIT_OBJECTS => {
                let args: methods::SetCommitObjects = from_args(method, args)?;
                let address = entity_address(EntityKind::Commit, &args.repo, &args.commit.to_hex());
                match state.accounts.get_mut(&address) {
                    Some(Account::Commit(record)) => record.objects = args.objects,
                    _ => {
                        return Err(LedgerError::rejected(method, EXIT_MISSING, "unknown commit"));
                    }
                }
            }
            methods::SET_COMMIT => {
                let args: methods::SetCommit = from_args(method, args)?;
                let (address, mut repo) = state.repo(&args.repo, method)?;
                if repo.protected.contains(&args.branch) {
                    return Err(LedgerError::rejected(
                        method,
                        EXIT_PROTECTED,
                        "branch is protected",
                    ));
                }
                if !state.has_commit(&args.repo, &args.commit) {
                    return Err(LedgerError::rejected(method, EXIT_MISSING, "unknown commit"));
                }
                let branch = repo.branches.get_mut(&args.branch).ok_or_else(|| {
                    let reason = format!("no branch {}", args.branch);
                    LedgerError::rejected(method, EXIT_MISSING, reason)
                })?;
                branch.commit = args.commit;
                branch.commit_address = Some(entity_address(
                    EntityKind::Commit,
                    &args.repo,
                    &args.commit.to_hex(),
                ));
                state.accounts.insert(address, Account::Repository(repo));
            }
            methods::DEPLOY_BRANCH => {
                let args: methods::DeployBranch = from_args(method, args)?;
                let (address, mut repo) = state.repo(&args.repo, method)?;
                if repo.branches.contains_key(&args.name) {
                    return Err(LedgerError::rejected(
                        method,
                        EXIT_EXISTS,
                        format!("branch {} exists", args.name),
                    ));
                }
                let source = repo.branches.get(&args.from).cloned().ok_or_else(|| {
                    LedgerError::rejected(method, EXIT_MISSING, format!("no branch {}", args.from))
                })?;
                repo.branches.insert(
                    args.name.clone(),
                    Branch {
                        name: args.name,
                        ..source
                    },
                );
                state.accounts.insert(address, Account::Repository(repo));
            }
            methods::DELETE_BRANCH => {
                let args: methods::DeleteBranch = from_args(method, args)?;
                let (address, mut repo) = state.repo(&args.repo, method)?;
                if repo.protected.contains(&args.name) {
                    return Err(LedgerError::rejected(
                        method,
                        EXIT_PROTECTED,
                        "branch is protected",
                    ));
                }
                if repo.branches.remove(&args.name).is_none() {
                    return Err(LedgerError::rejected(
                        method,
                        EXIT_MISSING,
                        format!("no branch {}", args.name),
                    ));
                }
                state.accounts.insert(address, Account::Repository(repo));
            }
            methods::START_PROPOSAL => {
                let args: methods::SetCommit = from_args(method, args)?;
                let mut owner = state.wallet(&wallet, method)?;
                if owner.locker.is_busy {
                    return Err(LedgerError::rejected(method, EXIT_LOCKER_BUSY, "locker is busy"));
                }
                let (_, repo) = state.repo(&args.repo, method)?;
                if !repo.branches.contains_key(&args.branch) {
                    return Err(LedgerError::rejected(
                        method,
                        EXIT_MISSING,
                        format!("no branch {}", args.branch),
                    ));
                }
                if !state.has_commit(&args.repo, &args.commit) {
                    return Err(LedgerError::rejected(method, EXIT_MISSING, "unknown commit"));
                }
                let key = proposal_key(&args.repo, &args.branch, &args.commit);
                let address = entity_address(EntityKind::Proposal, &args.repo, &key);
                if state.accounts.contains_key(&address) {
                    return Err(LedgerError::rejected(method, EXIT_EXISTS, "proposal exists"));
                }
                let start = now + self.vote_delay;
                let proposal = ProposalRecord {
                    id: key,
                    repo: args.repo,
                    branch: args.branch,
                    commit: args.commit,
                    prev_commit: args.prev_commit,
                    proposer: wallet.clone(),
                    votes_yes: 0,
                    votes_no: 0,
                    start,
                    finish: start + self.vote_duration,
                    is_completed: None,
                };
                state.accounts.insert(address, Account::Proposal(proposal));
                owner.locker.is_busy = true;
                state.accounts.insert(wallet, Account::Wallet(owner));
            }
            methods::VOTE => {
                let args: methods::VoteFor = from_args(method, args)?;
                let mut voter = state.wallet(&wallet, method)?;
                let mut proposal = state.proposal(&args.proposal, method)?;
                if proposal.is_completed.is_some() || now >= proposal.finish {
                    return Err(LedgerError::rejected(method, EXIT_WINDOW, "voting is closed"));
                }
                if now < proposal.start {
                    return Err(LedgerError::rejected(
                        method,
                        EXIT_WINDOW,
                        "voting has not started",
                    ));
                }
                if voter.locker.is_busy {
                    return Err(LedgerError::rejected(method, EXIT_LOCKER_BUSY, "locker is busy"));
                }
                if args.amount > voter.locker.available() {
                    return Err(LedgerError::rejected(method, EXIT_BALANCE, "insufficient balance"));
                }

                if args.choice {
                    proposal.votes_yes += args.amount;
                } else {
                    proposal.votes_no += args.amount;
                }
                voter.locker.votes_locked += args.amount;

                let key = client_key(&args.proposal, &wallet);
                let client_address = derive_address(EntityKind::Client.as_str(), "", &key);
                let mut client = match state.accounts.get(&client_address) {
                    Some(Account::Client(client)) => client.clone(),
                    _ => ClientRecord {
                        proposal: args.proposal.clone(),
                        voter: wallet.clone(),
                        locked_amount: 0,
                    },
                };
                client.locked_amount += args.amount;

                state.accounts.insert(client_address, Account::Client(client));
                state.accounts.insert(args.proposal, Account::Proposal(proposal));
                state.accounts.insert(wallet, Account::Wallet(voter));
            }
            methods::TRY_PROPOSAL_RESULT => {
                let args: methods::ProposalRef = from_args(method, args)?;
                let mut proposal = state.proposal(&args.proposal, method)?;
                if proposal.is_completed.is_some() || now < proposal.finish {
                    return Ok(());
                }
                let accepted = (self.outcome)(&proposal);
                proposal.is_completed = Some(accepted);
                debug!(id = %proposal.id, accepted, "Proposal resolved");

                if let Ok(mut proposer) = state.wallet(&proposal.proposer, method) {
                    proposer.locker.is_busy = false;
                    state
                        .accounts
                        .insert(proposal.proposer.clone(), Account::Wallet(proposer));
                }
                if accepted {
                    let (address, mut repo) = state.repo(&proposal.repo, method)?;
                    let commit_hex = proposal.commit.to_hex();
                    let commit_address =
                        entity_address(EntityKind::Commit, &proposal.repo, &commit_hex);
                    match repo.branches.get_mut(&proposal.branch) {
                        Some(branch) if branch.commit == proposal.prev_commit => {
                            branch.commit = proposal.commit;
                            branch.commit_address = Some(commit_address);
                        }
                        _ => {
                            warn!(id = %proposal.id, "Branch moved since proposal, not repointing")
                        }
                    }
                    state.accounts.insert(address, Account::Repository(repo));
                }
                state.accounts.insert(args.proposal, Account::Proposal(proposal));
            }
            methods::RELEASE_LOCKED => {
                let args: methods::ProposalRef = from_args(method, args)?;
                let proposal = state.proposal(&args.proposal, method)?;
                if proposal.is_completed.is_none() {
                    return Err(LedgerError::rejected(
                        method,
                        EXIT_NOT_COMPLETED,
                        "proposal is not completed",
                    ));
                }
                let key = client_key(&args.proposal, &wallet);
                let client_address = derive_address(EntityKind::Client.as_str(), "", &key);
                let stored = state.accounts.get(&client_address).cloned();
                if let Some(Account::Client(client)) = stored {
                    let mut owner = state.wallet(&wallet, method)?;
                    owner.locker.votes_locked =
                        owner.locker.votes_locked.saturating_sub(client.locked_amount);
                    state.accounts.insert(wallet, Account::Wallet(owner));
                    state.accounts.insert(
                        client_address,
                        Account::Client(ClientRecord {
                            locked_amount: 0,
                            ..client
                        }),
                    );
                }
            }
            methods::LOCK_VOTING => {
                let args: methods::Amount = from_args(method, args)?;
                let mut owner = state.wallet(&wallet, method)?;
                if args.amount > owner.balance {
                    return Err(LedgerError::rejected(method, EXIT_BALANCE, "insufficient balance"));
                }
                owner.balance -= args.amount;
                owner.locker.votes_total += args.amount;
                state.accounts.insert(wallet, Account::Wallet(owner));
            }
            methods::UNLOCK_VOTING => {
                let args: methods::Amount = from_args(method, args)?;
                let mut owner = state.wallet(&wallet, method)?;
                if args.amount > owner.locker.available() {
                    return Err(LedgerError::rejected(method, EXIT_BALANCE, "insufficient balance"));
                }
                owner.locker.votes_total -= args.amount;
                owner.balance += args.amount;
                state.accounts.insert(wallet, Account::Wallet(owner));
            }
            _ => {
                return Err(LedgerError::rejected(
                    method,
                    EXIT_UNKNOWN_METHOD,
                    format!("unknown method {}", method),
                ));
            }
        }
        Ok(())
    }
}

fn encode<T: Serialize + ?Sized>(method: &str, value: &T) -> LedgerResult<Value> {
    serde_json::to_value(value).map_err(|e| LedgerError::transport(method, e.to_string()))
}

#[async_trait]
impl RemoteLedgerAdapter for FakeLedger {
    async fn run_local(&self, target: &Address, method: &str, args: Value) -> LedgerResult<Value> {
        let mut state = self.state.write().await;
        state.calls.push(CallRecord {
            method: method.to_string(),
            target: target.clone(),
            args: args.clone(),
            write: false,
        });
        self.tick(&mut state);
        state.check_failure(method)?;
        self.read(&state, target, method, args)
    }

    async fn run(
        &self,
        target: &Address,
        method: &str,
        args: Value,
        signer: &Signer,
    ) -> LedgerResult<Ack> {
        let mut state = self.state.write().await;
        state.calls.push(CallRecord {
            method: method.to_string(),
            target: target.clone(),
            args: args.clone(),
            write: true,
        });
        state.check_failure(method)?;

        let owner = state.wallet(target, method)?;
        if owner.pubkey != signer.public {
            return Err(LedgerError::rejected(
                method,
                EXIT_NOT_OWNER,
                "signer does not own wallet",
            ));
        }

        state.transactions += 1;
        let ack = Ack {
            transaction: format!("tx-{}", state.transactions),
        };

        if state.dropped.contains(method) {
            debug!(method, "Dropping write");
            return Ok(ack);
        }

        let call = WriteCall {
            wallet: target.clone(),
            method: method.to_string(),
            args,
        };
        if self.visibility_lag == 0 {
            self.execute(&mut state, call)?;
        } else {
            state.pending.push(Pending {
                reads_left: self.visibility_lag,
                call,
            });
        }
        Ok(ack)
    }

    async fn account_status(&self, address: &Address) -> LedgerResult<AccountStatus> {
        let mut state = self.state.write().await;
        self.tick(&mut state);
        Ok(if state.accounts.contains_key(address) {
            AccountStatus::Active
        } else {
            AccountStatus::NonExist
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::decode;
    use crate::methods::{to_args, Amount, ProposalRef, SetCommit, VoteFor};

    async fn setup(clock: FixedClock) -> (FakeLedger, Address, Address, Signer) {
        let ledger = FakeLedger::new()
            .with_clock(Arc::new(clock))
            .with_vote_window(10, 100);
        let dao = ledger.create_dao("dao").await;
        ledger.create_repo(&dao, "repo").await;
        let (wallet, signer) = ledger.create_wallet(&dao, "alice", 50).await;
        (ledger, dao, wallet, signer)
    }

    async fn deploy_commit(ledger: &FakeLedger, wallet: &Address, signer: &Signer, sha: Oid) {
        let commit = CommitRecord {
            name: sha,
            branch: "main".into(),
            tree: Oid::ZERO,
            parents: vec![],
            content: String::new(),
            objects: vec![],
        };
        let args = to_args(
            methods::DEPLOY_COMMIT,
            &methods::DeployCommit {
                repo: "repo".into(),
                commit,
            },
        )
        .unwrap();
        ledger
            .run(wallet, methods::DEPLOY_COMMIT, args, signer)
            .await
            .unwrap();
    }

    fn set_commit(branch: &str, commit: Oid) -> SetCommit {
        SetCommit {
            repo: "repo".into(),
            branch: branch.into(),
            commit,
            prev_commit: Oid::ZERO,
            num_blobs: 0,
        }
    }

    #[tokio::test]
    async fn test_get_address_matches_derivation() {
        let ledger = FakeLedger::new();
        let args = json!({ "kind": "commit", "scope": "repo", "name": "abc" });
        let out = ledger
            .run_local(&ledger.root(), methods::GET_ADDRESS, args)
            .await
            .unwrap();
        assert_eq!(
            decode::address(out).unwrap(),
            derive_address("commit", "repo", "abc")
        );
    }

    #[tokio::test]
    async fn test_signer_must_own_wallet() {
        let (ledger, _, wallet, _) = setup(FixedClock::at_unix(0)).await;
        let err = ledger
            .run(
                &wallet,
                methods::LOCK_VOTING,
                json!({ "amount": 1 }),
                &Signer::new("mallory", "x"),
            )
            .await
            .unwrap_err();
        assert!(err.is_rejected());
    }

    #[tokio::test]
    async fn test_protected_branch_refuses_set_commit() {
        let (ledger, _, wallet, signer) = setup(FixedClock::at_unix(0)).await;
        let sha = Oid::hash(b"c1");
        deploy_commit(&ledger, &wallet, &signer, sha).await;

        let args = to_args(methods::SET_COMMIT, &set_commit("main", sha)).unwrap();
        let err = ledger
            .run(&wallet, methods::SET_COMMIT, args, &signer)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Rejected { code: EXIT_PROTECTED, .. }));

        ledger.create_branch("repo", "dev", Oid::ZERO).await;
        let args = to_args(methods::SET_COMMIT, &set_commit("dev", sha)).unwrap();
        ledger
            .run(&wallet, methods::SET_COMMIT, args, &signer)
            .await
            .unwrap();
        assert_eq!(ledger.branch("repo", "dev").await.unwrap().commit, sha);
    }

    #[tokio::test]
    async fn test_branch_deploy_and_delete() {
        let (ledger, _, wallet, signer) = setup(FixedClock::at_unix(0)).await;
        let sha = Oid::hash(b"c1");
        ledger.create_branch("repo", "dev", sha).await;

        let deploy = |name: &str, from: &str| {
            to_args(
                methods::DEPLOY_BRANCH,
                &methods::DeployBranch {
                    repo: "repo".into(),
                    name: name.into(),
                    from: from.into(),
                },
            )
            .unwrap()
        };
        ledger
            .run(&wallet, methods::DEPLOY_BRANCH, deploy("topic", "dev"), &signer)
            .await
            .unwrap();
        assert_eq!(ledger.branch("repo", "topic").await.unwrap().commit, sha);

        let err = ledger
            .run(&wallet, methods::DEPLOY_BRANCH, deploy("topic", "dev"), &signer)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Rejected { code: EXIT_EXISTS, .. }));
        let err = ledger
            .run(&wallet, methods::DEPLOY_BRANCH, deploy("x", "nope"), &signer)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Rejected { code: EXIT_MISSING, .. }));

        let delete = |name: &str| {
            to_args(
                methods::DELETE_BRANCH,
                &methods::DeleteBranch {
                    repo: "repo".into(),
                    name: name.into(),
                },
            )
            .unwrap()
        };
        let err = ledger
            .run(&wallet, methods::DELETE_BRANCH, delete("main"), &signer)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Rejected { code: EXIT_PROTECTED, .. }));
        ledger
            .run(&wallet, methods::DELETE_BRANCH, delete("topic"), &signer)
            .await
            .unwrap();
        assert!(ledger.branch("repo", "topic").await.is_none());
    }

    #[tokio::test]
    async fn test_visibility_lag() {
        let ledger = FakeLedger::new().with_visibility_lag(2);
        let dao = ledger.create_dao("dao").await;
        let (wallet, signer) = ledger.create_wallet(&dao, "alice", 0).await;
        ledger.fund_wallet(&wallet, 10).await;

        ledger
            .run(&wallet, methods::LOCK_VOTING, json!({ "amount": 4 }), &signer)
            .await
            .unwrap();
        assert_eq!(ledger.locker(&wallet).await.unwrap().votes_total, 0);

        let _ = ledger.account_status(&wallet).await.unwrap();
        assert_eq!(ledger.locker(&wallet).await.unwrap().votes_total, 0);
        let _ = ledger.account_status(&wallet).await.unwrap();
        assert_eq!(ledger.locker(&wallet).await.unwrap().votes_total, 4);
        assert_eq!(ledger.wallet_balance(&wallet).await, Some(6));
    }

    #[tokio::test]
    async fn test_dropped_and_failed_writes() {
        let (ledger, _, wallet, signer) = setup(FixedClock::at_unix(0)).await;
        ledger.fund_wallet(&wallet, 10).await;

        ledger.drop_writes(methods::LOCK_VOTING).await;
        ledger
            .run(&wallet, methods::LOCK_VOTING, json!({ "amount": 4 }), &signer)
            .await
            .unwrap();
        assert_eq!(ledger.wallet_balance(&wallet).await, Some(10));

        ledger.fail_method_after(methods::UNLOCK_VOTING, 1).await;
        let args = to_args(methods::UNLOCK_VOTING, &Amount { amount: 1 }).unwrap();
        assert!(ledger
            .run(&wallet, methods::UNLOCK_VOTING, args.clone(), &signer)
            .await
            .is_ok());
        let err = ledger
            .run(&wallet, methods::UNLOCK_VOTING, args, &signer)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Transport { .. }));
        assert_eq!(ledger.write_count(methods::UNLOCK_VOTING).await, 2);
    }

    #[tokio::test]
    async fn test_proposal_lifecycle() {
        let clock = FixedClock::at_unix(1_000);
        let (ledger, dao, alice, alice_signer) = setup(clock.clone()).await;
        let (bob, bob_signer) = ledger.create_wallet(&dao, "bob", 30).await;
        let sha = Oid::hash(b"c1");
        deploy_commit(&ledger, &alice, &alice_signer, sha).await;

        let args = to_args(methods::START_PROPOSAL, &set_commit("main", sha)).unwrap();
        ledger
            .run(&alice, methods::START_PROPOSAL, args.clone(), &alice_signer)
            .await
            .unwrap();
        assert!(ledger.locker(&alice).await.unwrap().is_busy);
        let err = ledger
            .run(&alice, methods::START_PROPOSAL, args, &alice_signer)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Rejected { code: EXIT_LOCKER_BUSY, .. }));

        let (proposal, record) = ledger.proposals().await.remove(0);
        assert_eq!(record.start, 1_010);
        let vote = to_args(
            methods::VOTE,
            &VoteFor {
                proposal: proposal.clone(),
                choice: true,
                amount: 20,
            },
        )
        .unwrap();

        let err = ledger
            .run(&bob, methods::VOTE, vote.clone(), &bob_signer)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Rejected { code: EXIT_WINDOW, .. }));

        clock.advance(10);
        ledger
            .run(&bob, methods::VOTE, vote, &bob_signer)
            .await
            .unwrap();
        assert_eq!(ledger.locker(&bob).await.unwrap().votes_locked, 20);

        let proposal_ref = ProposalRef { proposal: proposal.clone() };
        let resolve = to_args(methods::TRY_PROPOSAL_RESULT, &proposal_ref).unwrap();
        ledger
            .run(&bob, methods::TRY_PROPOSAL_RESULT, resolve.clone(), &bob_signer)
            .await
            .unwrap();
        assert_eq!(ledger.proposal(&proposal).await.unwrap().is_completed, None);

        clock.advance(100);
        ledger
            .run(&bob, methods::TRY_PROPOSAL_RESULT, resolve, &bob_signer)
            .await
            .unwrap();
        assert_eq!(ledger.proposal(&proposal).await.unwrap().is_completed, Some(true));
        assert_eq!(ledger.branch("repo", "main").await.unwrap().commit, sha);
        assert!(!ledger.locker(&alice).await.unwrap().is_busy);

        let release = to_args(methods::RELEASE_LOCKED, &ProposalRef { proposal }).unwrap();
        for _ in 0..2 {
            ledger
                .run(&bob, methods::RELEASE_LOCKED, release.clone(), &bob_signer)
                .await
                .unwrap();
        }
        assert_eq!(ledger.locker(&bob).await.unwrap().votes_locked, 0);
    }

    #[tokio::test]
    async fn test_deploy_is_write_once() {
        let (ledger, _, wallet, signer) = setup(FixedClock::at_unix(0)).await;
        let sha = Oid::hash(b"c1");
        deploy_commit(&ledger, &wallet, &signer, sha).await;
        deploy_commit(&ledger, &wallet, &signer, sha).await;
        assert_eq!(ledger.count(EntityKind::Commit).await, 1);
    }
}
