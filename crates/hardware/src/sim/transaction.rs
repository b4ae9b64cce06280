//! Transaction records and their arena.
//!
//! A requester allocates a [`Transaction`] in the [`TransactionArena`] and refers to it by a
//! [`TxHandle`] for the rest of its life. Queues and scheduled events carry handles, never
//! references, and every handle carries the generation of the slot it was issued for, so a
//! handle kept past retirement is caught as stale instead of silently aliasing a newer
//! record.

use std::fmt;

use crate::common::data::{Command, ResponseStatus};
use crate::common::error::ArenaError;
use crate::common::time::SimTime;

/// Generation-checked reference to a record in a [`TransactionArena`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TxHandle {
    index: u32,
    generation: u32,
}

impl TxHandle {
    /// Returns the arena slot index.
    pub const fn index(&self) -> u32 {
        self.index
    }

    /// Returns the slot generation this handle was issued for.
    pub const fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Display for TxHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tx#{}.{}", self.index, self.generation)
    }
}

/// Position of a transaction in the two-phase handshake.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum TxState {
    /// Allocated, or rejected by backpressure; may be presented with `BeginReq`.
    #[default]
    Idle,
    /// `BeginReq` received by the target.
    Requested,
    /// `EndReq` sent; waiting for the data phase and response.
    RequestAcked,
    /// `BeginResp` delivered; waiting for the requester's `EndResp`.
    ResponseSent,
    /// `EndResp` received; the record may be retired.
    Completed,
}

impl fmt::Display for TxState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "IDLE",
            Self::Requested => "REQUESTED",
            Self::RequestAcked => "REQUEST_ACKED",
            Self::ResponseSent => "RESPONSE_SENT",
            Self::Completed => "COMPLETED",
        };
        f.write_str(name)
    }
}

/// Opaque requester tag attached to a transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct TxExtension {
    /// Hart that issued the access.
    pub core_id: usize,
}

/// One memory access and its protocol state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transaction {
    address: u64,
    data: Vec<u8>,
    command: Command,
    byte_enable: Option<Vec<u8>>,
    extension: Option<TxExtension>,
    response: ResponseStatus,
    state: TxState,
    issued_at: Option<SimTime>,
}

impl Transaction {
    /// Creates a read of `len` bytes at `address`; the buffer starts zeroed.
    pub fn read(address: u64, len: usize) -> Self {
        Self::new(address, vec![0; len], Command::Read)
    }

    /// Creates a write of `data` at `address`.
    pub fn write(address: u64, data: impl Into<Vec<u8>>) -> Self {
        Self::new(address, data.into(), Command::Write)
    }

    fn new(address: u64, data: Vec<u8>, command: Command) -> Self {
        Self {
            address,
            data,
            command,
            byte_enable: None,
            extension: None,
            response: ResponseStatus::Incomplete,
            state: TxState::Idle,
            issued_at: None,
        }
    }

    /// Attaches a byte-enable mask, applied cyclically over the data.
    #[must_use]
    pub fn with_byte_enable(mut self, mask: impl Into<Vec<u8>>) -> Self {
        self.byte_enable = Some(mask.into());
        self
    }

    /// Attaches a requester tag.
    #[must_use]
    pub const fn with_extension(mut self, extension: TxExtension) -> Self {
        self.extension = Some(extension);
        self
    }

    /// Returns the target address.
    pub const fn address(&self) -> u64 {
        self.address
    }

    /// Returns the data buffer.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Returns the data buffer for in-place filling by a target.
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Consumes the record and returns its data buffer.
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    /// Returns the access length in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` for a zero-length access.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns the command.
    pub const fn command(&self) -> Command {
        self.command
    }

    /// Returns `true` if this is a read.
    pub fn is_read(&self) -> bool {
        self.command == Command::Read
    }

    /// Returns the byte-enable mask, if any.
    pub fn byte_enable(&self) -> Option<&[u8]> {
        self.byte_enable.as_deref()
    }

    /// Returns the requester tag, if any.
    pub const fn extension(&self) -> Option<TxExtension> {
        self.extension
    }

    /// Returns the response status.
    pub const fn response(&self) -> ResponseStatus {
        self.response
    }

    /// Returns the protocol state.
    pub const fn state(&self) -> TxState {
        self.state
    }

    /// Returns when the request was accepted, if it has been.
    pub const fn issued_at(&self) -> Option<SimTime> {
        self.issued_at
    }

    pub(crate) const fn set_response(&mut self, response: ResponseStatus) {
        self.response = response;
    }

    pub(crate) const fn set_state(&mut self, state: TxState) {
        self.state = state;
    }

    pub(crate) const fn set_issued_at(&mut self, at: SimTime) {
        self.issued_at = Some(at);
    }

    /// Splits the record into the parts a target needs for a write without cloning.
    pub(crate) fn write_parts(&self) -> (u64, &[u8], Option<&[u8]>) {
        (self.address, &self.data, self.byte_enable.as_deref())
    }
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    record: Option<Transaction>,
}

/// Slot storage for in-flight transactions.
#[derive(Debug, Default)]
pub struct TransactionArena {
    slots: Vec<Slot>,
    free: Vec<u32>,
    live: usize,
}

impl TransactionArena {
    /// Creates an empty arena.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a record and returns its handle, reusing a retired slot when one is free.
    pub fn alloc(&mut self, tx: Transaction) -> TxHandle {
        self.live += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.record = Some(tx);
            return TxHandle {
                index,
                generation: slot.generation,
            };
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            record: Some(tx),
        });
        TxHandle {
            index,
            generation: 0,
        }
    }

    /// Returns the record named by `handle`.
    pub fn get(&self, handle: TxHandle) -> Result<&Transaction, ArenaError> {
        self.slots
            .get(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.record.as_ref())
            .ok_or(ArenaError::StaleHandle(handle))
    }

    /// Returns the record named by `handle` for mutation.
    pub fn get_mut(&mut self, handle: TxHandle) -> Result<&mut Transaction, ArenaError> {
        self.slots
            .get_mut(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.record.as_mut())
            .ok_or(ArenaError::StaleHandle(handle))
    }

    /// Retires a record and returns it; the handle and any copies of it become stale.
    pub fn release(&mut self, handle: TxHandle) -> Result<Transaction, ArenaError> {
        let slot = self
            .slots
            .get_mut(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .ok_or(ArenaError::StaleHandle(handle))?;
        let record = slot.record.take().ok_or(ArenaError::StaleHandle(handle))?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(handle.index);
        self.live -= 1;
        Ok(record)
    }

    /// Returns the number of live records.
    pub const fn len(&self) -> usize {
        self.live
    }

    /// Returns `true` if no record is live.
    pub const fn is_empty(&self) -> bool {
        self.live == 0
    }
}
