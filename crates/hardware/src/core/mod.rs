//! Requester side of the memory system.
//!
//! The instruction-set model is an external collaborator; all it needs from this crate is
//! a blocking load/store interface. This module provides:
//! 1. **MemoryInterface:** The seam a core model drives (implemented by the simulator).
//! 2. **TraceCore:** A core stand-in that replays recorded per-hart memory traces.

/// Trace replay core.
pub mod trace;

pub use trace::{MemOp, Mismatch, Trace, TraceCore, TraceReport};

use crate::common::error::SimError;
use crate::sim::simulator::Simulator;

/// Blocking memory access for a core model.
pub trait MemoryInterface {
    /// Reads `len` bytes at `addr` on behalf of hart `core_id`.
    fn load(&mut self, core_id: usize, addr: u64, len: usize) -> Result<Vec<u8>, SimError>;

    /// Writes `data` at `addr` on behalf of hart `core_id`, honouring an optional byte-enable
    /// mask.
    fn store(
        &mut self,
        core_id: usize,
        addr: u64,
        data: &[u8],
        byte_enable: Option<&[u8]>,
    ) -> Result<(), SimError>;
}

impl MemoryInterface for Simulator {
    fn load(&mut self, core_id: usize, addr: u64, len: usize) -> Result<Vec<u8>, SimError> {
        Self::load(self, core_id, addr, len)
    }

    fn store(
        &mut self,
        core_id: usize,
        addr: u64,
        data: &[u8],
        byte_enable: Option<&[u8]>,
    ) -> Result<(), SimError> {
        Self::store(self, core_id, addr, data, byte_enable)
    }
}
