//! Bus-attached devices.
//!
//! This module contains the zero-latency targets the bus can route to: plain memory
//! windows onto the shared store, the SoC control/status registers, and the cache stub.
//! [`BusDevice`] is the closed set of device kinds the bus holds.

/// Direct-mapped cache stub.
pub mod cache;

/// Plain memory windows onto the shared store.
pub mod ram;

/// SoC control/status registers.
pub mod scr;

pub use cache::CacheStub;
pub use ram::MemoryWindow;
pub use scr::ControlStatus;

pub use crate::soc::traits::{Device, DeviceContext};

use crate::common::error::MemError;
use crate::common::log::ComponentLog;

/// A device registered on the bus.
#[derive(Debug)]
pub enum BusDevice {
    /// Zero-latency RAM window.
    Memory(MemoryWindow),
    /// Control/status register block.
    ControlStatus(ControlStatus),
    /// Cache stub.
    Cache(CacheStub),
}

impl BusDevice {
    /// Returns the cache stub if this device is one.
    pub const fn as_cache(&self) -> Option<&CacheStub> {
        match self {
            Self::Cache(cache) => Some(cache),
            _ => None,
        }
    }

    /// Returns the memory window if this device is one.
    pub const fn as_memory(&self) -> Option<&MemoryWindow> {
        match self {
            Self::Memory(mem) => Some(mem),
            _ => None,
        }
    }

    fn inner(&mut self) -> &mut dyn Device {
        match self {
            Self::Memory(dev) => dev,
            Self::ControlStatus(dev) => dev,
            Self::Cache(dev) => dev,
        }
    }
}

impl Device for BusDevice {
    fn name(&self) -> &str {
        match self {
            Self::Memory(dev) => dev.name(),
            Self::ControlStatus(dev) => dev.name(),
            Self::Cache(dev) => dev.name(),
        }
    }

    fn read(
        &mut self,
        offset: u64,
        buf: &mut [u8],
        ctx: &mut DeviceContext<'_>,
    ) -> Result<(), MemError> {
        self.inner().read(offset, buf, ctx)
    }

    fn write(
        &mut self,
        offset: u64,
        data: &[u8],
        byte_enable: Option<&[u8]>,
        ctx: &mut DeviceContext<'_>,
    ) -> Result<(), MemError> {
        self.inner().write(offset, data, byte_enable, ctx)
    }

    fn log_mut(&mut self) -> Option<&mut ComponentLog> {
        self.inner().log_mut()
    }
}

impl From<MemoryWindow> for BusDevice {
    fn from(dev: MemoryWindow) -> Self {
        Self::Memory(dev)
    }
}

impl From<ControlStatus> for BusDevice {
    fn from(dev: ControlStatus) -> Self {
        Self::ControlStatus(dev)
    }
}

impl From<CacheStub> for BusDevice {
    fn from(dev: CacheStub) -> Self {
        Self::Cache(dev)
    }
}
