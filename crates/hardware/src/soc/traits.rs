//! Device and socket traits.
//!
//! This module defines the two seams of the transaction subsystem:
//! 1. **Device:** Zero-latency targets reached through the bus (`read`/`write` at a
//!    device-relative offset, with the shared store and session passed in).
//! 2. **BackwardTransport:** The requester side of the socket, through which a target
//!    delivers `EndReq` and `BeginResp`.

use crate::common::data::{Phase, SyncStatus};
use crate::common::error::MemError;
use crate::common::log::ComponentLog;
use crate::common::time::SimTime;
use crate::sim::session::Session;
use crate::sim::transaction::TxHandle;
use crate::soc::memory::SparseMemory;

/// Shared state a device may touch while servicing an access.
#[derive(Debug)]
pub struct DeviceContext<'a> {
    /// The paged store shared by every target.
    pub store: &'a mut SparseMemory,
    /// Run-scoped finish and console state.
    pub session: &'a mut Session,
}

/// A bus-attached target serviced synchronously.
pub trait Device {
    /// Returns a short name for this device (e.g., `"SCR"`, `"CACHE"`).
    fn name(&self) -> &str;

    /// Fills `buf` with the bytes at the device-relative `offset`.
    fn read(
        &mut self,
        offset: u64,
        buf: &mut [u8],
        ctx: &mut DeviceContext<'_>,
    ) -> Result<(), MemError>;

    /// Stores `data` at the device-relative `offset`.
    ///
    /// With a non-empty `byte_enable` mask, byte `i` is stored only when
    /// `byte_enable[i % mask_len]` is `0xFF`.
    fn write(
        &mut self,
        offset: u64,
        data: &[u8],
        byte_enable: Option<&[u8]>,
        ctx: &mut DeviceContext<'_>,
    ) -> Result<(), MemError>;

    /// Returns the device's debug switch, if it has one.
    fn log_mut(&mut self) -> Option<&mut ComponentLog> {
        None
    }
}

/// Requester side of the transaction socket.
///
/// Targets call this to deliver backward-path phases (`EndReq`, `BeginResp`). Returning
/// [`SyncStatus::Completed`] for `BeginResp` tells the target the requester has consumed
/// the response in-line, standing in for a separate `EndResp`.
pub trait BackwardTransport {
    /// Delivers `phase` for `handle` at simulated time `now`.
    fn nb_transport_bw(&mut self, handle: TxHandle, phase: Phase, now: SimTime) -> SyncStatus;
}
