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

//! Pure decoders from raw ledger output to typed records
//!
//! Each function takes the JSON value returned by
//! [`RemoteLedgerAdapter::run_local`](crate::RemoteLedgerAdapter::run_local)
//! and either returns a record or a [`LedgerError::Decode`]. None of them
//! perform I/O.

use crate::records::{
    Branch, BlobRecord, ClientRecord, CommitRecord, LockerRecord, ProposalRecord, TreeRecord,
};
use crate::{Address, LedgerError, LedgerResult};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

fn entity<T: DeserializeOwned>(name: &'static str, value: Value) -> LedgerResult<T> {
    serde_json::from_value(value).map_err(|e| LedgerError::decode(name, e))
}

/// Decode a `getAddress` result
pub fn address(value: Value) -> LedgerResult<Address> {
    #[derive(Deserialize)]
    struct Output {
        address: Address,
    }
    entity::<Output>("address", value).map(|out| out.address)
}

/// Decode a `getBranch` result, `null` meaning no such branch
pub fn branch(value: Value) -> LedgerResult<Option<Branch>> {
    entity("branch", value)
}

/// Decode a `getAllAddress` result
pub fn branches(value: Value) -> LedgerResult<Vec<Branch>> {
    entity("branches", value)
}

/// Decode a commit record
pub fn commit(value: Value) -> LedgerResult<CommitRecord> {
    entity("commit", value)
}

/// Decode a tree record
pub fn tree(value: Value) -> LedgerResult<TreeRecord> {
    entity("tree", value)
}

/// Decode a blob record
///
/// Rejects records that carry both or neither of inline data and an
/// external content id.
pub fn blob(value: Value) -> LedgerResult<BlobRecord> {
    let record: BlobRecord = entity("blob", value)?;
    match (&record.data, &record.content_id) {
        (Some(_), None) | (None, Some(_)) => Ok(record),
        (Some(_), Some(_)) => Err(LedgerError::decode(
            "blob",
            "both inline data and content id present",
        )),
        (None, None) => Err(LedgerError::decode(
            "blob",
            "neither inline data nor content id present",
        )),
    }
}

/// Decode a `getLocker` result
pub fn locker(value: Value) -> LedgerResult<LockerRecord> {
    entity("locker", value)
}

/// Decode a proposal record
pub fn proposal(value: Value) -> LedgerResult<ProposalRecord> {
    let record: ProposalRecord = entity("proposal", value)?;
    if record.finish < record.start {
        return Err(LedgerError::decode("proposal", "finish precedes start"));
    }
    Ok(record)
}

/// Decode a voter's client record
pub fn client(value: Value) -> LedgerResult<ClientRecord> {
    entity("client", value)
}
