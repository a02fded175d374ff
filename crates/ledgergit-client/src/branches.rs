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

//! Branch management: create a branch from another branch's tip, delete
//! an unprotected branch
//!
//! Both operations check everything they can before the write and then
//! poll until the repository shows the change.

use crate::error::{ClientResult, PreconditionError, ValidationError};
use crate::governor::{BranchGovernor, BranchPolicy};
use crate::session::Session;
use ledgergit_ledger::methods::{self, DeleteBranch, DeployBranch, GetBranch};
use ledgergit_ledger::{decode, Branch};
use tracing::info;

/// Creates and deletes branches of the session repository
#[derive(Debug, Clone, Copy)]
pub struct BranchManager<'a> {
    session: &'a Session,
}

impl<'a> BranchManager<'a> {
    /// Create a manager bound to `session`
    pub fn new(session: &'a Session) -> Self {
        Self { session }
    }

    /// Create `name` at the current tip of `from`
    ///
    /// Returns the new branch once the ledger shows it.
    pub async fn create(&self, name: &str, from: &str) -> ClientResult<Branch> {
        self.session.wallet()?;
        check_branch_name(name)?;
        let source = self.session.branch(from).await?;
        if self.session.find_branch(name).await?.is_some() {
            return Err(ValidationError::BranchExists(name.to_string()).into());
        }

        let args = DeployBranch {
            repo: self.session.repo()?.to_string(),
            name: name.to_string(),
            from: from.to_string(),
        };
        self.session.submit(methods::DEPLOY_BRANCH, &args).await?;

        let commit = source.commit;
        let branch = self
            .wait_for_branch(name, move |branch| branch.filter(|b| b.commit == commit))
            .await?;
        info!(branch = %name, from = %from, commit = %commit, "Branch created");
        Ok(branch)
    }

    /// Delete `name`; the protected branch cannot be deleted
    pub async fn delete(&self, name: &str) -> ClientResult<()> {
        self.session.wallet()?;
        let governor = BranchGovernor::from_config(self.session.config())?;
        if governor.classify(name) == BranchPolicy::Governed {
            return Err(ValidationError::ProtectedBranch(name.to_string()).into());
        }
        if self.session.find_branch(name).await?.is_none() {
            return Err(PreconditionError::NoBranch(name.to_string()).into());
        }

        let args = DeleteBranch {
            repo: self.session.repo()?.to_string(),
            name: name.to_string(),
        };
        self.session.submit(methods::DELETE_BRANCH, &args).await?;

        self.wait_for_branch(name, |branch| branch.is_none().then_some(()))
            .await?;
        info!(branch = %name, "Branch deleted");
        Ok(())
    }

    async fn wait_for_branch<T, F>(&self, name: &str, accept: F) -> ClientResult<T>
    where
        F: Fn(Option<Branch>) -> Option<T>,
    {
        let repo = self.session.repo_address().await?;
        let args = methods::to_args(
            methods::GET_BRANCH,
            &GetBranch {
                name: name.to_string(),
            },
        )?;
        self.session
            .poll_query(
                &format!("branch {}", name),
                &repo,
                methods::GET_BRANCH,
                args,
                |value| Ok(accept(decode::branch(value)?)),
            )
            .await
    }
}

/// Check that `name` can be used as a branch name
pub fn check_branch_name(name: &str) -> Result<(), ValidationError> {
    let invalid = name.is_empty()
        || name.contains(|c: char| c.is_whitespace() || c.is_control())
        || name.starts_with('/')
        || name.ends_with('/')
        || name.contains("//")
        || name.contains("..");
    if invalid {
        return Err(ValidationError::InvalidBranchName(name.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_branch_names() {
        for name in ["dev", "feature/login", "release-1.2", "v2"] {
            assert!(check_branch_name(name).is_ok(), "{}", name);
        }
        for name in ["", "with space", "/lead", "trail/", "a//b", "a..b", "tab\tbed"] {
            assert!(
                matches!(
                    check_branch_name(name),
                    Err(ValidationError::InvalidBranchName(ref n)) if n == name
                ),
                "{:?}",
                name
            );
        }
    }
}
