//! Zero-latency memory window.
//!
//! Maps a bus range directly onto the shared paged store at the same physical addresses.
//! Accesses bypass the timed controller.

use crate::common::error::MemError;
use crate::common::log::ComponentLog;
use crate::soc::traits::{Device, DeviceContext};

/// A plain RAM region backed by the shared store.
#[derive(Debug)]
pub struct MemoryWindow {
    name: String,
    base: u64,
    log: ComponentLog,
}

impl MemoryWindow {
    /// Creates a window named `name` whose offset 0 is store address `base`.
    pub fn new(name: impl Into<String>, base: u64) -> Self {
        let name = name.into();
        Self {
            log: ComponentLog::new(name.clone()),
            name,
            base,
        }
    }

    /// Returns the store address of offset 0.
    pub const fn base(&self) -> u64 {
        self.base
    }
}

impl Device for MemoryWindow {
    fn name(&self) -> &str {
        &self.name
    }

    fn read(
        &mut self,
        offset: u64,
        buf: &mut [u8],
        ctx: &mut DeviceContext<'_>,
    ) -> Result<(), MemError> {
        let addr = self.base.wrapping_add(offset);
        if self.log.enabled() {
            tracing::debug!(
                component = self.log.name(),
                addr = format_args!("{addr:#x}"),
                len = buf.len(),
                "read"
            );
        }
        ctx.store.read(addr, buf)
    }

    fn write(
        &mut self,
        offset: u64,
        data: &[u8],
        byte_enable: Option<&[u8]>,
        ctx: &mut DeviceContext<'_>,
    ) -> Result<(), MemError> {
        let addr = self.base.wrapping_add(offset);
        if self.log.enabled() {
            tracing::debug!(
                component = self.log.name(),
                addr = format_args!("{addr:#x}"),
                len = data.len(),
                "write"
            );
        }
        ctx.store.write(addr, data, byte_enable)
    }

    fn log_mut(&mut self) -> Option<&mut ComponentLog> {
        Some(&mut self.log)
    }
}
