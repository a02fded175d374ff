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

//! Explicit per-caller context
//!
//! A [`Session`] carries everything an operation needs: the ledger adapter,
//! content collaborators, clock, configuration and the caller's identity.
//! Nothing is held in globals; two sessions over the same ledger are fully
//! independent.
//!
//! # Examples
//!
//! ```rust
//! use ledgergit_client::{Session, Wallet};
//! use ledgergit_ledger::FakeLedger;
//! use std::sync::Arc;
//!
//! # tokio_test::block_on(async {
//! let ledger = FakeLedger::new();
//! let dao = ledger.create_dao("dao").await;
//! ledger.create_repo(&dao, "repo").await;
//! let (address, signer) = ledger.create_wallet(&dao, "0xabc", 50).await;
//!
//! let session = Session::builder(Arc::new(ledger.clone()))
//!     .root(ledger.root())
//!     .dao(dao)
//!     .repo("repo")
//!     .wallet(Wallet::new(address, signer))
//!     .build();
//!
//! let main = session.branch("main").await.unwrap();
//! assert!(main.is_empty());
//! # });
//! ```

use crate::error::{ClientResult, PreconditionError};
use ledgergit_compression::{Compressor, ZstdCompressor};
use ledgergit_config::{Config, StorageConfig};
use ledgergit_ledger::methods::{self, GetAddress, GetBranch};
use ledgergit_ledger::{
    decode, wait_until, Ack, Address, Branch, Clock, EntityKind, LedgerError, PollPolicy,
    RemoteLedgerAdapter, Signer, SystemClock,
};
use ledgergit_storage::{ContentStore, LocalContentStore, MemoryContentStore};
use ledgergit_versioning::Oid;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;

/// Wallet that signs state-changing calls
#[derive(Debug, Clone)]
pub struct Wallet {
    /// Wallet account address
    pub address: Address,
    /// Key pair owning the wallet
    pub signer: Signer,
}

impl Wallet {
    /// Create a wallet identity
    pub fn new(address: Address, signer: Signer) -> Self {
        Self { address, signer }
    }

    /// Public key, used as the commit author name
    pub fn pubkey(&self) -> &str {
        &self.signer.public
    }
}

/// Per-caller context threaded through every operation
#[derive(Debug, Clone)]
pub struct Session {
    ledger: Arc<dyn RemoteLedgerAdapter>,
    content_store: Arc<dyn ContentStore>,
    compressor: Arc<dyn Compressor>,
    clock: Arc<dyn Clock>,
    config: Config,
    root: Option<Address>,
    dao: Option<Address>,
    repo: Option<String>,
    wallet: Option<Wallet>,
}

impl Session {
    /// Start building a session over `ledger`
    pub fn builder(ledger: Arc<dyn RemoteLedgerAdapter>) -> SessionBuilder {
        SessionBuilder::new(ledger)
    }

    /// Ledger adapter
    pub fn ledger(&self) -> &dyn RemoteLedgerAdapter {
        self.ledger.as_ref()
    }

    /// External content store
    pub fn content_store(&self) -> &dyn ContentStore {
        self.content_store.as_ref()
    }

    /// Compression collaborator
    pub fn compressor(&self) -> &dyn Compressor {
        self.compressor.as_ref()
    }

    /// Clock for commit timestamps and vote windows
    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// Client configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Root account address
    pub fn root(&self) -> ClientResult<&Address> {
        Ok(self.root.as_ref().ok_or(PreconditionError::NoRoot)?)
    }

    /// DAO address
    pub fn dao(&self) -> ClientResult<&Address> {
        Ok(self.dao.as_ref().ok_or(PreconditionError::NoDao)?)
    }

    /// Repository name
    pub fn repo(&self) -> ClientResult<&str> {
        Ok(self.repo.as_deref().ok_or(PreconditionError::NoRepo)?)
    }

    /// Signing wallet
    pub fn wallet(&self) -> ClientResult<&Wallet> {
        Ok(self.wallet.as_ref().ok_or(PreconditionError::NoWallet)?)
    }

    /// Same session, another repository
    pub fn with_repo(&self, repo: impl Into<String>) -> Session {
        Session {
            repo: Some(repo.into()),
            ..self.clone()
        }
    }

    /// Same session, another wallet
    pub fn with_wallet(&self, wallet: Wallet) -> Session {
        Session {
            wallet: Some(wallet),
            ..self.clone()
        }
    }

    /// Poll policy derived from the consistency settings
    pub fn poll_policy(&self) -> PollPolicy {
        let consistency = &self.config.consistency;
        PollPolicy {
            interval: consistency.poll_interval(),
            max_interval: consistency.max_interval(),
            backoff: consistency.backoff_factor,
            timeout: consistency.timeout(),
        }
    }

    /// Read-only call
    pub async fn query(&self, target: &Address, method: &str, args: Value) -> ClientResult<Value> {
        debug!(method, target = %target, "Ledger read");
        Ok(self.ledger.run_local(target, method, args).await?)
    }

    /// State-changing call signed by the session wallet
    pub async fn submit<A: Serialize>(&self, method: &str, args: &A) -> ClientResult<Ack> {
        let wallet = self.wallet()?;
        let args = methods::to_args(method, args)?;
        let ack = self
            .ledger
            .run(&wallet.address, method, args, &wallet.signer)
            .await?;
        debug!(method, tx = %ack.transaction, "Ledger write acknowledged");
        Ok(ack)
    }

    /// Resolve the address of an entity through the root account
    pub async fn address_of(
        &self,
        kind: EntityKind,
        scope: &str,
        name: &str,
    ) -> ClientResult<Address> {
        let args = methods::to_args(
            methods::GET_ADDRESS,
            &GetAddress {
                kind,
                scope: scope.to_string(),
                name: name.to_string(),
            },
        )?;
        let value = self.query(self.root()?, methods::GET_ADDRESS, args).await?;
        Ok(decode::address(value)?)
    }

    /// Address of a git object in the session repository
    pub async fn object_address(&self, kind: EntityKind, sha: &Oid) -> ClientResult<Address> {
        self.address_of(kind, self.repo()?, &sha.to_hex()).await
    }

    /// Address of the session repository, which must exist
    pub async fn repo_address(&self) -> ClientResult<Address> {
        let address = self
            .address_of(EntityKind::Repository, "", self.repo()?)
            .await?;
        if !self.account_active(&address).await? {
            return Err(PreconditionError::NoRepo.into());
        }
        Ok(address)
    }

    /// Whether `address` holds an active account
    pub async fn account_active(&self, address: &Address) -> ClientResult<bool> {
        Ok(self.ledger.account_status(address).await?.is_active())
    }

    /// Look up a branch, `None` if it does not exist
    pub async fn find_branch(&self, name: &str) -> ClientResult<Option<Branch>> {
        let repo = self.repo_address().await?;
        let args = methods::to_args(
            methods::GET_BRANCH,
            &GetBranch {
                name: name.to_string(),
            },
        )?;
        let value = self.query(&repo, methods::GET_BRANCH, args).await?;
        Ok(decode::branch(value)?)
    }

    /// Look up a branch that must exist
    pub async fn branch(&self, name: &str) -> ClientResult<Branch> {
        self.find_branch(name)
            .await?
            .ok_or_else(|| PreconditionError::NoBranch(name.to_string()).into())
    }

    /// All branches of the session repository
    pub async fn branches(&self) -> ClientResult<Vec<Branch>> {
        let repo = self.repo_address().await?;
        let value = self.query(&repo, methods::GET_BRANCHES, json!({})).await?;
        Ok(decode::branches(value)?)
    }

    /// Poll until `address` holds an active account
    pub async fn wait_for_account_active(&self, address: &Address) -> ClientResult<()> {
        let ledger = self.ledger.as_ref();
        let what = format!("account {}", address);
        wait_until(&what, &self.poll_policy(), || async move {
            let status = ledger.account_status(address).await?;
            Ok::<_, LedgerError>(status.is_active().then_some(()))
        })
        .await?;
        Ok(())
    }

    /// Poll until every address in `addresses` is active
    pub async fn wait_for_accounts_active(&self, addresses: &[Address]) -> ClientResult<()> {
        let ledger = self.ledger.as_ref();
        let what = format!("{} accounts", addresses.len());
        wait_until(&what, &self.poll_policy(), || async move {
            for address in addresses {
                if !ledger.account_status(address).await?.is_active() {
                    return Ok(None);
                }
            }
            Ok::<_, LedgerError>(Some(()))
        })
        .await?;
        Ok(())
    }

    /// Poll a read-only call until `accept` yields a value
    ///
    /// `accept` returns `Ok(None)` for "not yet"; a decode error aborts.
    pub async fn poll_query<T, D>(
        &self,
        what: &str,
        target: &Address,
        method: &str,
        args: Value,
        accept: D,
    ) -> ClientResult<T>
    where
        D: Fn(Value) -> Result<Option<T>, LedgerError>,
    {
        let ledger = self.ledger.as_ref();
        let accept = &accept;
        let args = &args;
        let value = wait_until(what, &self.poll_policy(), || async move {
            let value = ledger.run_local(target, method, args.clone()).await?;
            accept(value)
        })
        .await?;
        Ok(value)
    }
}

/// Builder for [`Session`]
///
/// Identity fields left unset surface as [`PreconditionError`]s when an
/// operation needs them, never at build time.
#[derive(Debug)]
pub struct SessionBuilder {
    ledger: Arc<dyn RemoteLedgerAdapter>,
    content_store: Option<Arc<dyn ContentStore>>,
    compressor: Option<Arc<dyn Compressor>>,
    clock: Option<Arc<dyn Clock>>,
    config: Config,
    root: Option<Address>,
    dao: Option<Address>,
    repo: Option<String>,
    wallet: Option<Wallet>,
}

impl SessionBuilder {
    fn new(ledger: Arc<dyn RemoteLedgerAdapter>) -> Self {
        Self {
            ledger,
            content_store: None,
            compressor: None,
            clock: None,
            config: Config::default(),
            root: None,
            dao: None,
            repo: None,
            wallet: None,
        }
    }

    /// External content store (default: in-memory)
    pub fn content_store(mut self, store: Arc<dyn ContentStore>) -> Self {
        self.content_store = Some(store);
        self
    }

    /// Compression collaborator (default: zstd)
    pub fn compressor(mut self, compressor: Arc<dyn Compressor>) -> Self {
        self.compressor = Some(compressor);
        self
    }

    /// Clock (default: system time)
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Client configuration
    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Root account address
    pub fn root(mut self, root: Address) -> Self {
        self.root = Some(root);
        self
    }

    /// DAO address
    pub fn dao(mut self, dao: Address) -> Self {
        self.dao = Some(dao);
        self
    }

    /// Repository name
    pub fn repo(mut self, repo: impl Into<String>) -> Self {
        self.repo = Some(repo.into());
        self
    }

    /// Signing wallet
    pub fn wallet(mut self, wallet: Wallet) -> Self {
        self.wallet = Some(wallet);
        self
    }

    /// Finish the session
    pub fn build(self) -> Session {
        Session {
            ledger: self.ledger,
            content_store: self
                .content_store
                .unwrap_or_else(|| Arc::new(MemoryContentStore::new())),
            compressor: self
                .compressor
                .unwrap_or_else(|| Arc::new(ZstdCompressor::default_level())),
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            config: self.config,
            root: self.root,
            dao: self.dao,
            repo: self.repo,
            wallet: self.wallet,
        }
    }
}

/// Open the content store selected by `storage.backend`
pub async fn open_content_store(config: &StorageConfig) -> ClientResult<Arc<dyn ContentStore>> {
    let store: Arc<dyn ContentStore> = match config {
        StorageConfig::Memory => Arc::new(MemoryContentStore::new()),
        StorageConfig::Local(local) => {
            debug!(path = %local.base_path, "Opening local content store");
            Arc::new(LocalContentStore::new(&local.base_path).await?)
        }
    };
    Ok(store)
}
