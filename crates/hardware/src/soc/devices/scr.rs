//! SoC control/status registers (SCR).
//!
//! A small register block used by test programs to report their result and to emit
//! characters.
//!
//! # Registers
//!
//! * `0x00`: Version ID (read only)
//! * `0x08`: Test status (write: finish code, `0x5555` = pass; read: latched code)
//! * `0x40`: Print (write: low byte is one output character)
//!
//! Other offsets read as zero and ignore writes.

use crate::common::constants::{
    SCR_FINISH_OFFSET, SCR_PRINT_OFFSET, SCR_VERSION_ID, SCR_VERSION_OFFSET,
};
use crate::common::error::MemError;
use crate::common::log::ComponentLog;
use crate::soc::traits::{Device, DeviceContext};

/// Control/status register block.
#[derive(Debug)]
pub struct ControlStatus {
    log: ComponentLog,
}

impl ControlStatus {
    /// Creates the register block.
    pub fn new() -> Self {
        Self {
            log: ComponentLog::new("SCR"),
        }
    }

    /// Returns the 64-bit register at an 8-byte aligned offset.
    fn register(offset: u64, ctx: &DeviceContext<'_>) -> u64 {
        match offset {
            SCR_VERSION_OFFSET => u64::from(SCR_VERSION_ID),
            SCR_FINISH_OFFSET => ctx
                .session
                .exit_status()
                .map_or(0, |status| u64::from(status.code())),
            _ => 0,
        }
    }
}

impl Default for ControlStatus {
    fn default() -> Self {
        Self::new()
    }
}

impl Device for ControlStatus {
    fn name(&self) -> &str {
        "SCR"
    }

    fn read(
        &mut self,
        offset: u64,
        buf: &mut [u8],
        ctx: &mut DeviceContext<'_>,
    ) -> Result<(), MemError> {
        for (i, byte) in buf.iter_mut().enumerate() {
            let at = offset + i as u64;
            let word = Self::register(at & !7, ctx);
            *byte = word.to_le_bytes()[(at & 7) as usize];
        }
        if self.log.enabled() {
            tracing::debug!(
                component = self.log.name(),
                offset = format_args!("{offset:#x}"),
                len = buf.len(),
                "register read"
            );
        }
        Ok(())
    }

    fn write(
        &mut self,
        offset: u64,
        data: &[u8],
        byte_enable: Option<&[u8]>,
        ctx: &mut DeviceContext<'_>,
    ) -> Result<(), MemError> {
        if self.log.enabled() {
            tracing::debug!(
                component = self.log.name(),
                offset = format_args!("{offset:#x}"),
                len = data.len(),
                "register write"
            );
        }
        match offset {
            SCR_FINISH_OFFSET => {
                let _ = ctx.session.write_finish(data, byte_enable);
            }
            SCR_PRINT_OFFSET => ctx.session.write_print(data, byte_enable),
            _ => {}
        }
        Ok(())
    }

    fn log_mut(&mut self) -> Option<&mut ComponentLog> {
        Some(&mut self.log)
    }
}
