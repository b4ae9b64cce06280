//! Transaction protocol vocabulary.
//!
//! This module defines the small value types exchanged over the transaction socket:
//! 1. **Command:** Whether a transaction reads or writes.
//! 2. **Phase:** The four steps of the two-phase handshake.
//! 3. **Status:** Synchronous return codes and the response status stored in a record.

use std::fmt;

use serde::Deserialize;

/// Direction of a memory transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Command {
    /// Data read; the record's buffer receives the stored bytes.
    Read,
    /// Data write; the record's buffer is committed to the target.
    Write,
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read => write!(f, "read"),
            Self::Write => write!(f, "write"),
        }
    }
}

/// Handshake phase carried with every socket call.
///
/// The legal order for one transaction is `BeginReq`, `EndReq`, `BeginResp`, `EndResp`.
/// `BeginReq` and `EndResp` travel forward (requester to target); `EndReq` and
/// `BeginResp` travel backward.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Requester presents a transaction.
    BeginReq,
    /// Target accepted the request; the requester must not resend it.
    EndReq,
    /// Target delivers the response; read data is valid, writes are committed.
    BeginResp,
    /// Requester acknowledges the response; the record may be retired.
    EndResp,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::BeginReq => "BEGIN_REQ",
            Self::EndReq => "END_REQ",
            Self::BeginResp => "BEGIN_RESP",
            Self::EndResp => "END_RESP",
        };
        f.write_str(name)
    }
}

/// Synchronous result of a socket call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncStatus {
    /// The call was taken; the transaction continues through later phases.
    Accepted,
    /// The transaction finished within this call; no further phases follow.
    Completed,
}

/// Response status recorded in a transaction once the target answers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ResponseStatus {
    /// No response yet.
    #[default]
    Incomplete,
    /// The access succeeded.
    Ok,
    /// The target could not service the address.
    AddressError,
}
