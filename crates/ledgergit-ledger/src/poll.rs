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

//! Bounded polling for eventually consistent reads
//!
//! A write accepted by the ledger becomes visible some time later. Every
//! wait for that visibility goes through [`wait_until`], which retries a
//! check on an interval (optionally backing off) and gives up with
//! [`PollError::Timeout`] once the policy's deadline passes.

use crate::{LedgerResult, PollError};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Interval, backoff and deadline of a poll loop
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PollPolicy {
    /// Delay before the second check
    pub interval: Duration,
    /// Upper bound on the delay between checks
    pub max_interval: Duration,
    /// Multiplier applied to the delay after every miss, at least 1.0
    pub backoff: f64,
    /// Total time allowed before giving up
    pub timeout: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(1500),
            max_interval: Duration::from_millis(6000),
            backoff: 1.0,
            timeout: Duration::from_secs(120),
        }
    }
}

impl PollPolicy {
    /// Fixed-interval policy
    pub fn fixed(interval: Duration, timeout: Duration) -> Self {
        Self {
            interval,
            max_interval: interval,
            backoff: 1.0,
            timeout,
        }
    }

    /// Delay to use after `current`
    pub fn next_interval(&self, current: Duration) -> Duration {
        let scaled = current.as_secs_f64() * self.backoff.max(1.0);
        Duration::from_secs_f64(scaled).min(self.max_interval.max(self.interval))
    }
}

/// Poll `check` until it yields a value or the policy times out
///
/// The check runs at least once. A check error aborts the poll immediately;
/// only "not yet" (`Ok(None)`) is retried.
pub async fn wait_until<T, F, Fut>(
    what: &str,
    policy: &PollPolicy,
    mut check: F,
) -> Result<T, PollError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = LedgerResult<Option<T>>>,
{
    let started = Instant::now();
    let deadline = started + policy.timeout;
    let mut interval = policy.interval;
    let mut attempt: u32 = 0;

    loop {
        attempt += 1;
        if let Some(value) = check().await? {
            debug!(what, attempt, elapsed = ?started.elapsed(), "Condition observed");
            return Ok(value);
        }

        let now = Instant::now();
        if now >= deadline {
            let waited = now - started;
            warn!(what, attempt, ?waited, "Gave up waiting for ledger state");
            return Err(PollError::Timeout {
                what: what.to_string(),
                waited,
            });
        }

        tokio::time::sleep(interval.min(deadline - now)).await;
        interval = policy.next_interval(interval);
    }
}
