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

//! Remote ledger plumbing
//!
//! The client talks to the ledger through a single generic seam,
//! [`RemoteLedgerAdapter`], with three calls: a local read, a signed write,
//! and an account status query. Everything else in this crate is pure:
//!
//! - [`methods`]: method names and serde argument shapes
//! - [`records`]: typed entity records (branches, objects, governance)
//! - [`decode`]: raw call output to records
//! - [`poll`]: bounded waits for writes to become visible
//! - [`clock`]: the time source shared with vote windows
//!
//! [`FakeLedger`] is a complete in-memory adapter used by the tests of
//! every crate above this one.
//!
//! # Architecture
//!
//! ```text
//! caller ──► methods::to_args ──► RemoteLedgerAdapter::run / run_local
//!                                          │
//!                      decode::* ◄─────────┘
//!                          │
//!                          ▼
//!                      records::*
//! ```

pub mod adapter;
pub mod clock;
pub mod decode;
pub mod error;
pub mod fake;
pub mod methods;
pub mod poll;
pub mod records;

pub use adapter::{AccountStatus, Ack, Address, RemoteLedgerAdapter, Signer};
pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{LedgerError, LedgerResult, PollError};
pub use fake::{derive_address, CallRecord, FakeLedger, OutcomeRule};
pub use poll::{wait_until, PollPolicy};
pub use records::{
    BlobFlags, BlobRecord, Branch, ClientRecord, CommitRecord, EntityKind, LockerRecord,
    ProposalRecord, TreeEntry, TreeRecord,
};
