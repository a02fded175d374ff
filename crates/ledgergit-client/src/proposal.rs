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

//! Proposal lifecycle on a governed branch
//!
//! ```text
//! Created --start--> Open --finish--> Closing --tryResolve--> Completed(accepted)
//! ```
//!
//! Opening a proposal marks the proposer's locker busy until the proposal
//! completes. Whether a closed proposal is accepted is decided entirely by
//! the ledger; this module only reads the outcome back.

use crate::error::{ClientResult, PreconditionError, ValidationError};
use crate::session::Session;
use ledgergit_ledger::methods::{self, Amount, ProposalRef, SetCommit, VoteFor};
use ledgergit_ledger::records::{client_key, proposal_key};
use ledgergit_ledger::{decode, Address, EntityKind, LockerRecord, ProposalRecord};
use ledgergit_versioning::Oid;
use serde_json::json;
use tracing::{debug, info};

/// Lifecycle state of a proposal at a given time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProposalState {
    /// Voting has not opened yet
    Created,
    /// Voting is open
    Open,
    /// Voting closed, waiting for resolution
    Closing,
    /// Resolved; terminal
    Completed {
        /// Outcome reported by the ledger
        accepted: bool,
    },
}

impl ProposalState {
    /// Derive the state of `proposal` at unix time `now`
    pub fn of(proposal: &ProposalRecord, now: i64) -> Self {
        match proposal.is_completed {
            Some(accepted) => ProposalState::Completed { accepted },
            None if now < proposal.start => ProposalState::Created,
            None if now < proposal.finish => ProposalState::Open,
            None => ProposalState::Closing,
        }
    }
}

/// Resolution status as reported by the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProposalStatus {
    /// Whether the proposal is resolved
    pub completed: bool,
    /// Whether it was accepted; false while open
    pub accepted: bool,
}

impl From<&ProposalRecord> for ProposalStatus {
    fn from(proposal: &ProposalRecord) -> Self {
        Self {
            completed: proposal.is_completed.is_some(),
            accepted: proposal.is_completed.unwrap_or(false),
        }
    }
}

/// A proposal that was just opened
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenedProposal {
    /// Proposal account address
    pub address: Address,
    /// Proposal as first observed
    pub record: ProposalRecord,
}

/// Check that a wallet may open a proposal
pub fn check_open(locker: &LockerRecord, min_balance: u64) -> Result<(), ValidationError> {
    if locker.is_busy {
        return Err(ValidationError::LockerBusy);
    }
    if locker.votes_total < min_balance {
        return Err(ValidationError::InsufficientBalance {
            requested: min_balance,
            available: locker.votes_total,
        });
    }
    Ok(())
}

/// Check that a wallet may vote `amount` on `proposal` at unix time `now`
pub fn check_vote(
    proposal: &ProposalRecord,
    locker: &LockerRecord,
    amount: u64,
    now: i64,
) -> Result<(), ValidationError> {
    if locker.is_busy {
        return Err(ValidationError::LockerBusy);
    }
    match ProposalState::of(proposal, now) {
        ProposalState::Created => {
            return Err(ValidationError::NoStartYet {
                start: proposal.start,
                now,
            })
        }
        ProposalState::Open => {}
        ProposalState::Closing | ProposalState::Completed { .. } => {
            return Err(ValidationError::VotingClosed)
        }
    }
    if amount > locker.available() {
        return Err(ValidationError::InsufficientBalance {
            requested: amount,
            available: locker.available(),
        });
    }
    Ok(())
}

/// Drives proposals for the session wallet
#[derive(Debug, Clone, Copy)]
pub struct ProposalStateMachine<'a> {
    session: &'a Session,
}

impl<'a> ProposalStateMachine<'a> {
    /// Create a state machine bound to `session`
    pub fn new(session: &'a Session) -> Self {
        Self { session }
    }

    /// Current locker of the session wallet
    pub async fn locker(&self) -> ClientResult<LockerRecord> {
        let wallet = self.session.wallet()?;
        let value = self
            .session
            .query(&wallet.address, methods::GET_LOCKER, json!({}))
            .await?;
        Ok(decode::locker(value)?)
    }

    /// Address of the proposal for `commit` on `branch`
    pub async fn proposal_address(&self, branch: &str, commit: &Oid) -> ClientResult<Address> {
        let repo = self.session.repo()?;
        self.session
            .address_of(EntityKind::Proposal, repo, &proposal_key(repo, branch, commit))
            .await
    }

    /// Read a proposal that must exist
    pub async fn proposal(&self, address: &Address) -> ClientResult<ProposalRecord> {
        if !self.session.account_active(address).await? {
            return Err(PreconditionError::NoProposal(address.to_string()).into());
        }
        let value = self
            .session
            .query(address, methods::GET_DETAILS, json!({}))
            .await?;
        Ok(decode::proposal(value)?)
    }

    /// Resolution status of a proposal
    pub async fn proposal_status(&self, address: &Address) -> ClientResult<ProposalStatus> {
        Ok(ProposalStatus::from(&self.proposal(address).await?))
    }

    /// Verify the session wallet may open a proposal, without writing
    pub async fn ensure_can_open(&self) -> ClientResult<LockerRecord> {
        self.session.dao()?;
        let locker = self.locker().await?;
        check_open(&locker, self.session.config().governance.min_proposal_balance)?;
        Ok(locker)
    }

    /// Open a proposal to repoint a governed branch
    ///
    /// Waits until the proposal is visible on the ledger.
    pub async fn open(&self, change: &SetCommit) -> ClientResult<OpenedProposal> {
        self.ensure_can_open().await?;
        let address = self.proposal_address(&change.branch, &change.commit).await?;

        self.session.submit(methods::START_PROPOSAL, change).await?;
        self.session.wait_for_account_active(&address).await?;
        let record = self.proposal(&address).await?;

        info!(
            proposal = %address,
            branch = %change.branch,
            commit = %change.commit,
            start = record.start,
            finish = record.finish,
            "Opened proposal"
        );
        Ok(OpenedProposal { address, record })
    }

    /// Vote `amount` tokens for or against a proposal
    ///
    /// Returns the proposal once the vote is visible.
    pub async fn vote(
        &self,
        proposal: &Address,
        choice: bool,
        amount: u64,
    ) -> ClientResult<ProposalRecord> {
        let wallet = self.session.wallet()?;
        let record = self.proposal(proposal).await?;
        let locker = self.locker().await?;
        check_vote(&record, &locker, amount, self.session.clock().unix())?;

        let args = VoteFor {
            proposal: proposal.clone(),
            choice,
            amount,
        };
        self.session.submit(methods::VOTE, &args).await?;

        let expected = locker.votes_locked + amount;
        self.session
            .poll_query(
                &format!("vote on {}", proposal),
                &wallet.address,
                methods::GET_LOCKER,
                json!({}),
                |value| Ok((decode::locker(value)?.votes_locked >= expected).then_some(())),
            )
            .await?;

        info!(proposal = %proposal, choice, amount, "Vote recorded");
        self.proposal(proposal).await
    }

    /// Ask the ledger to resolve a proposal
    ///
    /// A completed proposal is left alone and no call is made. Otherwise the
    /// ledger decides whether it can resolve now; call again later if it
    /// could not, or use [`ProposalStateMachine::wait_resolved`].
    pub async fn try_resolve(&self, proposal: &Address) -> ClientResult<ProposalStatus> {
        let record = self.proposal(proposal).await?;
        if record.is_completed.is_some() {
            debug!(proposal = %proposal, "Proposal already resolved");
            return Ok(ProposalStatus::from(&record));
        }

        let args = ProposalRef {
            proposal: proposal.clone(),
        };
        self.session.submit(methods::TRY_PROPOSAL_RESULT, &args).await?;
        let status = self.proposal_status(proposal).await?;
        debug!(proposal = %proposal, completed = status.completed, "Requested proposal result");
        Ok(status)
    }

    /// Poll until a proposal is resolved
    pub async fn wait_resolved(&self, proposal: &Address) -> ClientResult<ProposalStatus> {
        self.session
            .poll_query(
                &format!("resolution of {}", proposal),
                proposal,
                methods::GET_DETAILS,
                json!({}),
                |value| {
                    let record = decode::proposal(value)?;
                    Ok(record
                        .is_completed
                        .is_some()
                        .then(|| ProposalStatus::from(&record)))
                },
            )
            .await
    }

    /// Return tokens the session wallet locked on a completed proposal
    ///
    /// Returns the amount released; releasing twice releases nothing the
    /// second time.
    pub async fn release(&self, proposal: &Address) -> ClientResult<u64> {
        let wallet = self.session.wallet()?;
        let record = self.proposal(proposal).await?;
        if record.is_completed.is_none() {
            return Err(ValidationError::ProposalOpen.into());
        }

        let client_address = self
            .session
            .address_of(EntityKind::Client, "", &client_key(proposal, &wallet.address))
            .await?;
        if !self.session.account_active(&client_address).await? {
            debug!(proposal = %proposal, "No stake to release");
            return Ok(0);
        }
        let value = self
            .session
            .query(&client_address, methods::GET_DETAILS, json!({}))
            .await?;
        let locked = decode::client(value)?.locked_amount;
        if locked == 0 {
            debug!(proposal = %proposal, "Stake already released");
            return Ok(0);
        }

        let args = ProposalRef {
            proposal: proposal.clone(),
        };
        self.session.submit(methods::RELEASE_LOCKED, &args).await?;
        self.session
            .poll_query(
                &format!("release on {}", proposal),
                &client_address,
                methods::GET_DETAILS,
                json!({}),
                |value| Ok((decode::client(value)?.locked_amount == 0).then_some(())),
            )
            .await?;

        info!(proposal = %proposal, amount = locked, "Released locked tokens");
        Ok(locked)
    }

    /// Move `amount` tokens from the wallet into its locker
    pub async fn lock_voting(&self, amount: u64) -> ClientResult<LockerRecord> {
        let wallet = self.session.wallet()?;
        let before = self.locker().await?;
        self.session
            .submit(methods::LOCK_VOTING, &Amount { amount })
            .await?;

        let expected = before.votes_total + amount;
        self.session
            .poll_query(
                "locked voting tokens",
                &wallet.address,
                methods::GET_LOCKER,
                json!({}),
                |value| {
                    let locker = decode::locker(value)?;
                    Ok((locker.votes_total >= expected).then_some(locker))
                },
            )
            .await
    }

    /// Move `amount` free tokens from the locker back to the wallet
    pub async fn unlock_voting(&self, amount: u64) -> ClientResult<LockerRecord> {
        let wallet = self.session.wallet()?;
        let before = self.locker().await?;
        if amount > before.available() {
            return Err(ValidationError::InsufficientBalance {
                requested: amount,
                available: before.available(),
            }
            .into());
        }
        self.session
            .submit(methods::UNLOCK_VOTING, &Amount { amount })
            .await?;

        let expected = before.votes_total - amount;
        self.session
            .poll_query(
                "unlocked voting tokens",
                &wallet.address,
                methods::GET_LOCKER,
                json!({}),
                |value| {
                    let locker = decode::locker(value)?;
                    Ok((locker.votes_total <= expected).then_some(locker))
                },
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn proposal(start: i64, finish: i64, completed: Option<bool>) -> ProposalRecord {
        ProposalRecord {
            id: "repo/main/x".to_string(),
            repo: "repo".to_string(),
            branch: "main".to_string(),
            commit: Oid::hash(b"new"),
            prev_commit: Oid::ZERO,
            proposer: Address::new("0:1"),
            votes_yes: 0,
            votes_no: 0,
            start,
            finish,
            is_completed: completed,
        }
    }

    fn locker(total: u64, locked: u64, busy: bool) -> LockerRecord {
        LockerRecord {
            votes_total: total,
            votes_locked: locked,
            is_busy: busy,
        }
    }

    #[test]
    fn test_state_derivation() {
        let p = proposal(100, 200, None);
        assert_eq!(ProposalState::of(&p, 99), ProposalState::Created);
        assert_eq!(ProposalState::of(&p, 100), ProposalState::Open);
        assert_eq!(ProposalState::of(&p, 199), ProposalState::Open);
        assert_eq!(ProposalState::of(&p, 200), ProposalState::Closing);

        let done = proposal(100, 200, Some(false));
        assert_eq!(
            ProposalState::of(&done, 150),
            ProposalState::Completed { accepted: false }
        );
    }

    #[test]
    fn test_check_open() {
        assert!(check_open(&locker(20, 0, false), 20).is_ok());
        assert_eq!(
            check_open(&locker(20, 0, true), 20),
            Err(ValidationError::LockerBusy)
        );
        assert_eq!(
            check_open(&locker(5, 0, false), 20),
            Err(ValidationError::InsufficientBalance {
                requested: 20,
                available: 5
            })
        );
    }

    #[test]
    fn test_check_vote_window() {
        let p = proposal(100, 200, None);
        let l = locker(50, 0, false);
        assert_eq!(
            check_vote(&p, &l, 10, 50),
            Err(ValidationError::NoStartYet { start: 100, now: 50 })
        );
        assert!(check_vote(&p, &l, 10, 150).is_ok());
        assert_eq!(check_vote(&p, &l, 10, 200), Err(ValidationError::VotingClosed));
    }

    #[test]
    fn test_check_vote_uses_unlocked_tokens() {
        let p = proposal(0, 100, None);
        assert!(check_vote(&p, &locker(50, 40, false), 10, 10).is_ok());
        assert_eq!(
            check_vote(&p, &locker(50, 45, false), 10, 10),
            Err(ValidationError::InsufficientBalance {
                requested: 10,
                available: 5
            })
        );
    }

    #[test]
    fn test_busy_locker_blocks_vote_first() {
        let p = proposal(100, 200, None);
        assert_eq!(
            check_vote(&p, &locker(50, 0, true), 10, 0),
            Err(ValidationError::LockerBusy)
        );
    }

    #[test]
    fn test_status_from_record() {
        let open = ProposalStatus::from(&proposal(0, 1, None));
        assert!(!open.completed && !open.accepted);
        let accepted = ProposalStatus::from(&proposal(0, 1, Some(true)));
        assert!(accepted.completed && accepted.accepted);
    }
}
