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

//! Branch policy: which branches need a proposal to move

use crate::error::ValidationError;
use ledgergit_config::Config;

/// How a branch may be repointed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchPolicy {
    /// The committer repoints the branch directly
    Direct,
    /// The branch moves only through an accepted proposal
    Governed,
}

/// Classifies branches by comparing against the single protected name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchGovernor {
    protected: String,
}

impl BranchGovernor {
    /// Govern `protected`; every other branch is direct
    pub fn new(protected: impl Into<String>) -> Result<Self, ValidationError> {
        let protected = protected.into();
        if protected.trim().is_empty() {
            return Err(ValidationError::InvalidBranchPolicy(
                "protected branch name is empty".to_string(),
            ));
        }
        if protected.contains(char::is_whitespace) {
            return Err(ValidationError::InvalidBranchPolicy(format!(
                "protected branch name '{}' contains whitespace",
                protected
            )));
        }
        Ok(Self { protected })
    }

    /// Governor for the configured protected branch
    pub fn from_config(config: &Config) -> Result<Self, ValidationError> {
        Self::new(config.governance.protected_branch.as_str())
    }

    /// Name of the governed branch
    pub fn protected_branch(&self) -> &str {
        &self.protected
    }

    /// Policy for `branch`
    pub fn classify(&self, branch: &str) -> BranchPolicy {
        if branch == self.protected {
            BranchPolicy::Governed
        } else {
            BranchPolicy::Direct
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_protected_branch_is_governed() {
        let governor = BranchGovernor::new("main").unwrap();
        assert_eq!(governor.classify("main"), BranchPolicy::Governed);
        assert_eq!(governor.classify("feature"), BranchPolicy::Direct);
        assert_eq!(governor.classify("main2"), BranchPolicy::Direct);
        assert_eq!(governor.classify("Main"), BranchPolicy::Direct);
    }

    #[test]
    fn test_from_config() {
        let mut config = Config::default();
        config.governance.protected_branch = "release".to_string();
        let governor = BranchGovernor::from_config(&config).unwrap();
        assert_eq!(governor.protected_branch(), "release");
        assert_eq!(governor.classify("main"), BranchPolicy::Direct);
    }

    #[test]
    fn test_invalid_policy() {
        assert!(matches!(
            BranchGovernor::new(" "),
            Err(ValidationError::InvalidBranchPolicy(_))
        ));
        assert!(BranchGovernor::new("my branch").is_err());
    }
}
