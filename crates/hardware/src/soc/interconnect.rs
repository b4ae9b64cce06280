//! System interconnect (bus) for address-range routing.
//!
//! This module implements the router between requesters and targets. It provides:
//! 1. **Device registration:** Non-overlapping `(base, size)` ranges, kept in registration
//!    order.
//! 2. **Lookup:** First registered range containing an address, with a last-hit hint.
//! 3. **Dispatch:** Matched devices are serviced synchronously; unmatched accesses go to
//!    the configured fallback.
//!
//! The bus holds no transaction state.

use crate::common::error::BusError;
use crate::config::Fallback;
use crate::soc::devices::{BusDevice, Device, DeviceContext};

/// Outcome of routing one access.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Dispatch {
    /// A device (or the store fallback) serviced the access with zero latency.
    Completed,
    /// No device claims the address; the caller hands it to the timed memory.
    Forward,
}

/// One entry of the device map, as reported by [`Bus::list`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Base address.
    pub base: u64,
    /// Size in bytes.
    pub size: u64,
    /// Device name.
    pub name: String,
}

#[derive(Debug)]
struct Entry {
    base: u64,
    size: u64,
    device: BusDevice,
}

impl Entry {
    const fn contains(&self, addr: u64) -> bool {
        addr >= self.base && addr - self.base < self.size
    }

    const fn last(&self) -> u64 {
        self.base + (self.size - 1)
    }
}

/// Address-range router.
#[derive(Debug)]
pub struct Bus {
    entries: Vec<Entry>,
    fallback: Fallback,
    last_device_idx: usize,
}

impl Bus {
    /// Creates an empty bus routing unmatched accesses to `fallback`.
    pub const fn new(fallback: Fallback) -> Self {
        Self {
            entries: Vec::new(),
            fallback,
            last_device_idx: 0,
        }
    }

    /// Returns the fallback target.
    pub const fn fallback(&self) -> Fallback {
        self.fallback
    }

    /// Replaces the fallback target.
    pub const fn set_fallback(&mut self, fallback: Fallback) {
        self.fallback = fallback;
    }

    /// Registers `device` at `[base, base + size)`.
    ///
    /// Empty ranges, ranges running past the top of the address space, and ranges that
    /// intersect an existing registration are rejected.
    pub fn register(
        &mut self,
        base: u64,
        size: u64,
        device: impl Into<BusDevice>,
    ) -> Result<(), BusError> {
        if size == 0 || base.checked_add(size - 1).is_none() {
            return Err(BusError::InvalidRange { base, size });
        }
        let last = base + (size - 1);
        if let Some(other) = self
            .entries
            .iter()
            .find(|e| base <= e.last() && e.base <= last)
        {
            return Err(BusError::Overlap {
                base,
                size,
                existing: other.device.name().to_owned(),
            });
        }
        let device = device.into();
        tracing::info!(
            name = device.name(),
            base = format_args!("{base:#x}"),
            size = format_args!("{size:#x}"),
            "device registered"
        );
        self.entries.push(Entry { base, size, device });
        Ok(())
    }

    /// Returns the device whose range contains `addr`.
    pub fn find(&self, addr: u64) -> Option<&BusDevice> {
        self.entries
            .iter()
            .find(|e| e.contains(addr))
            .map(|e| &e.device)
    }

    /// Returns the device map in registration order.
    pub fn list(&self) -> Vec<DeviceInfo> {
        self.entries
            .iter()
            .map(|e| DeviceInfo {
                base: e.base,
                size: e.size,
                name: e.device.name().to_owned(),
            })
            .collect()
    }

    /// Returns the number of registered devices.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no device is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Turns the debug trace of every registered device on or off.
    pub fn set_debug(&mut self, enabled: bool) {
        for entry in &mut self.entries {
            if let Some(log) = entry.device.log_mut() {
                log.set_enabled(enabled);
            }
        }
    }

    /// Routes a read of `buf.len()` bytes at `addr`.
    pub fn route_read(
        &mut self,
        addr: u64,
        buf: &mut [u8],
        ctx: &mut DeviceContext<'_>,
    ) -> Result<Dispatch, BusError> {
        if let Some(idx) = self.lookup(addr) {
            let entry = &mut self.entries[idx];
            entry.device.read(addr - entry.base, buf, ctx)?;
            return Ok(Dispatch::Completed);
        }
        match self.fallback {
            Fallback::TimedMemory => Ok(Dispatch::Forward),
            Fallback::Store => {
                ctx.store.read(addr, buf)?;
                Ok(Dispatch::Completed)
            }
            Fallback::None => Err(BusError::Unmapped { addr }),
        }
    }

    /// Routes a write of `data` at `addr`.
    pub fn route_write(
        &mut self,
        addr: u64,
        data: &[u8],
        byte_enable: Option<&[u8]>,
        ctx: &mut DeviceContext<'_>,
    ) -> Result<Dispatch, BusError> {
        if let Some(idx) = self.lookup(addr) {
            let entry = &mut self.entries[idx];
            entry.device.write(addr - entry.base, data, byte_enable, ctx)?;
            return Ok(Dispatch::Completed);
        }
        match self.fallback {
            Fallback::TimedMemory => Ok(Dispatch::Forward),
            Fallback::Store => {
                ctx.store.write(addr, data, byte_enable)?;
                Ok(Dispatch::Completed)
            }
            Fallback::None => Err(BusError::Unmapped { addr }),
        }
    }

    fn lookup(&mut self, addr: u64) -> Option<usize> {
        if self
            .entries
            .get(self.last_device_idx)
            .is_some_and(|e| e.contains(addr))
        {
            return Some(self.last_device_idx);
        }
        let idx = self.entries.iter().position(|e| e.contains(addr))?;
        self.last_device_idx = idx;
        Some(idx)
    }
}
