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

//! Wall clock abstraction
//!
//! Commit timestamps and vote windows both read the time through [`Clock`],
//! so tests can pin it with [`FixedClock`].

use chrono::{DateTime, FixedOffset, Local, Offset, Utc};
use std::fmt::Debug;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

/// Source of the current time
pub trait Clock: Send + Sync + Debug {
    /// Current time with its UTC offset
    fn now(&self) -> DateTime<FixedOffset>;

    /// Current unix time in seconds
    fn unix(&self) -> i64 {
        self.now().timestamp()
    }
}

/// The system clock in the local timezone
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Local::now().fixed_offset()
    }
}

/// A manually driven clock
///
/// Clones share the same time, so one handle can be given to a session and
/// another kept by the test to advance it.
#[derive(Debug, Clone)]
pub struct FixedClock {
    seconds: Arc<AtomicI64>,
    offset: FixedOffset,
}

impl FixedClock {
    /// Start at `time`, keeping its offset
    pub fn new(time: DateTime<FixedOffset>) -> Self {
        Self {
            seconds: Arc::new(AtomicI64::new(time.timestamp())),
            offset: *time.offset(),
        }
    }

    /// Start at a unix time in UTC
    pub fn at_unix(seconds: i64) -> Self {
        Self {
            seconds: Arc::new(AtomicI64::new(seconds)),
            offset: Utc.fix(),
        }
    }

    /// Move the clock forward
    pub fn advance(&self, seconds: i64) {
        self.seconds.fetch_add(seconds, Ordering::SeqCst);
    }

    /// Jump to a unix time
    pub fn set(&self, seconds: i64) {
        self.seconds.store(seconds, Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<FixedOffset> {
        DateTime::from_timestamp(self.seconds.load(Ordering::SeqCst), 0)
            .unwrap_or_default()
            .with_timezone(&self.offset)
    }
}
