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

//! Commit objects and their git text serialization
//!
//! The serialized form is what gets hashed, so field order, spacing and the
//! timezone rendering must match git exactly.

use crate::{hash_commit, Oid};
use chrono::{DateTime, FixedOffset, TimeZone};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Author or committer identity with a timezone-aware timestamp
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    /// Public key (or user name) of the signer
    pub name: String,

    /// Email address, `<name>@<domain>` for ledger identities
    pub email: String,

    /// When the action occurred, in the signer's local offset
    pub timestamp: DateTime<FixedOffset>,
}

impl Signature {
    /// Create a new signature
    pub fn new(name: String, email: String, timestamp: DateTime<FixedOffset>) -> Self {
        Self {
            name,
            email,
            timestamp,
        }
    }

    /// Signature for a ledger identity: email is `<pubkey>@<domain>`
    ///
    /// # Examples
    ///
    /// ```
    /// use chrono::{FixedOffset, TimeZone};
    /// use ledgergit_versioning::Signature;
    ///
    /// let tz = FixedOffset::east_opt(3 * 3600).unwrap();
    /// let at = tz.timestamp_opt(1_700_000_000, 0).unwrap();
    /// let sig = Signature::for_pubkey("0xabc", "gosh.sh", at);
    /// assert_eq!(sig.to_string(), "0xabc <0xabc@gosh.sh> 1700000000 +0300");
    /// ```
    pub fn for_pubkey(pubkey: &str, domain: &str, timestamp: DateTime<FixedOffset>) -> Self {
        Self {
            name: pubkey.to_string(),
            email: format!("{}@{}", pubkey.replace('@', ""), domain),
            timestamp,
        }
    }

    /// Render the offset as `±HHMM`
    pub fn tz_string(&self) -> String {
        let seconds = self.timestamp.offset().local_minus_utc();
        let sign = if seconds >= 0 { '+' } else { '-' };
        let minutes = seconds.abs() / 60;
        format!("{}{:02}{:02}", sign, minutes / 60, minutes % 60)
    }

    /// Parse `name <email> unixtime ±HHMM`
    pub fn parse(s: &str) -> anyhow::Result<Self> {
        let open = s
            .find('<')
            .ok_or_else(|| anyhow::anyhow!("Signature is missing '<': {}", s))?;
        let close = s
            .rfind('>')
            .ok_or_else(|| anyhow::anyhow!("Signature is missing '>': {}", s))?;
        if close < open {
            anyhow::bail!("Malformed signature: {}", s);
        }

        let name = s[..open].trim_end().to_string();
        let email = s[open + 1..close].to_string();
        let mut rest = s[close + 1..].split_whitespace();
        let seconds: i64 = rest
            .next()
            .ok_or_else(|| anyhow::anyhow!("Signature is missing a timestamp: {}", s))?
            .parse()?;
        let tz = rest
            .next()
            .ok_or_else(|| anyhow::anyhow!("Signature is missing a timezone: {}", s))?;

        let offset = parse_tz(tz)?;
        let timestamp = offset
            .timestamp_opt(seconds, 0)
            .single()
            .ok_or_else(|| anyhow::anyhow!("Timestamp out of range: {}", seconds))?;
        Ok(Self {
            name,
            email,
            timestamp,
        })
    }
}

fn parse_tz(tz: &str) -> anyhow::Result<FixedOffset> {
    if tz.len() != 5 || !tz.is_ascii() {
        anyhow::bail!("Timezone must look like +HHMM, got {}", tz);
    }
    let sign = match tz.as_bytes()[0] {
        b'+' => 1,
        b'-' => -1,
        _ => anyhow::bail!("Timezone must start with + or -, got {}", tz),
    };
    let hours: i32 = tz[1..3].parse()?;
    let minutes: i32 = tz[3..5].parse()?;
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
        .ok_or_else(|| anyhow::anyhow!("Timezone out of range: {}", tz))
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} <{}> {} {}",
            self.name,
            self.email,
            self.timestamp.timestamp(),
            self.tz_string()
        )
    }
}

/// Build an ordered parent list from branch tips
///
/// The target branch tip always comes first and the merge source second.
/// Zero ids mean "no commit yet" and are skipped.
pub fn parents_from_tips(target_tip: Oid, source_tip: Option<Oid>) -> Vec<Oid> {
    [Some(target_tip), source_tip]
        .into_iter()
        .flatten()
        .filter(|oid| !oid.is_zero())
        .collect()
}

/// Join a title and an optional body into a commit message
pub fn compose_message(title: &str, body: Option<&str>) -> String {
    match body.map(str::trim).filter(|b| !b.is_empty()) {
        Some(body) => format!("{}\n\n{}", title.trim(), body),
        None => title.trim().to_string(),
    }
}

/// Commit object
///
/// # Examples
///
/// ```
/// use chrono::{FixedOffset, TimeZone};
/// use ledgergit_versioning::{hash_tree, Commit, Signature};
///
/// let at = FixedOffset::east_opt(0).unwrap().timestamp_opt(0, 0).unwrap();
/// let sig = Signature::for_pubkey("pub", "gosh.sh", at);
/// let commit = Commit::new(hash_tree(&[]), sig.clone(), sig, "init".to_string());
///
/// assert!(commit.data().starts_with("tree 4b825dc642cb6eb9a060e54bf8d69288fbee4904\n"));
/// assert!(!commit.data().contains("parent"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    /// OID of the tree this commit points to
    pub tree: Oid,

    /// Parent commits, target tip first
    pub parents: Vec<Oid>,

    /// Author information
    pub author: Signature,

    /// Committer information
    pub committer: Signature,

    /// Commit message (title, optionally followed by a blank line and body)
    pub message: String,
}

impl Commit {
    /// Create a root commit
    pub fn new(tree: Oid, author: Signature, committer: Signature, message: String) -> Self {
        Self {
            tree,
            parents: Vec::new(),
            author,
            committer,
            message,
        }
    }

    /// Create a commit with parents
    ///
    /// # Errors
    ///
    /// Fails when more than two parents are given.
    pub fn with_parents(
        tree: Oid,
        parents: Vec<Oid>,
        author: Signature,
        committer: Signature,
        message: String,
    ) -> anyhow::Result<Self> {
        if parents.len() > 2 {
            anyhow::bail!("A commit has at most 2 parents, got {}", parents.len());
        }
        Ok(Self {
            tree,
            parents,
            author,
            committer,
            message,
        })
    }

    /// Newline-joined commit text without the trailing newline
    pub fn data(&self) -> String {
        let mut lines = Vec::with_capacity(6 + self.parents.len());
        lines.push(format!("tree {}", self.tree));
        for parent in &self.parents {
            lines.push(format!("parent {}", parent));
        }
        lines.push(format!("author {}", self.author));
        lines.push(format!("committer {}", self.committer));
        lines.push(String::new());
        lines.push(self.message.clone());
        lines.join("\n")
    }

    /// Git commit hash
    pub fn hash(&self) -> Oid {
        hash_commit(&self.data())
    }

    /// Parse commit text as produced by [`Commit::data`]
    pub fn parse(data: &str) -> anyhow::Result<Self> {
        let (headers, message) = data
            .split_once("\n\n")
            .ok_or_else(|| anyhow::anyhow!("Commit text has no message separator"))?;

        let mut tree = None;
        let mut parents = Vec::new();
        let mut author = None;
        let mut committer = None;
        for line in headers.lines() {
            let (key, value) = line
                .split_once(' ')
                .ok_or_else(|| anyhow::anyhow!("Malformed commit header: {}", line))?;
            match key {
                "tree" => tree = Some(Oid::from_hex(value)?),
                "parent" => parents.push(Oid::from_hex(value)?),
                "author" => author = Some(Signature::parse(value)?),
                "committer" => committer = Some(Signature::parse(value)?),
                other => anyhow::bail!("Unknown commit header: {}", other),
            }
        }

        Self::with_parents(
            tree.ok_or_else(|| anyhow::anyhow!("Commit has no tree"))?,
            parents,
            author.ok_or_else(|| anyhow::anyhow!("Commit has no author"))?,
            committer.ok_or_else(|| anyhow::anyhow!("Commit has no committer"))?,
            message.to_string(),
        )
    }

    /// First line of the message
    pub fn title(&self) -> &str {
        self.message.lines().next().unwrap_or("")
    }

    /// Check if this is a root commit
    pub fn is_initial(&self) -> bool {
        self.parents.is_empty()
    }

    /// Check if this is a merge commit
    pub fn is_merge(&self) -> bool {
        self.parents.len() > 1
    }
}
