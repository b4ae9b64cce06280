//! Per-run state shared by the control registers and the memory controller.
//!
//! A session records the program's exit status (written once, through whichever finish
//! register the access reaches) and the characters the program sends to the print register.

use std::io::{self, Write};

use crate::common::constants::{BYTE_ENABLED, FINISH_PASS};
use crate::config::GeneralConfig;

/// Final status reported by the program under test.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExitStatus {
    /// The program wrote the pass code.
    Pass,
    /// The program wrote any other code.
    Fail(u32),
}

impl ExitStatus {
    /// Classifies a value written to the finish register.
    pub const fn from_code(code: u32) -> Self {
        if code == FINISH_PASS {
            Self::Pass
        } else {
            Self::Fail(code)
        }
    }

    /// Returns the code that was written to the finish register.
    pub const fn code(self) -> u32 {
        match self {
            Self::Pass => FINISH_PASS,
            Self::Fail(code) => code,
        }
    }

    /// Returns `true` for [`ExitStatus::Pass`].
    pub const fn passed(self) -> bool {
        matches!(self, Self::Pass)
    }
}

/// Run-scoped state owned by one simulated system.
#[derive(Debug, Default)]
pub struct Session {
    exit: Option<ExitStatus>,
    print_enabled: bool,
    echo: bool,
    console: Vec<u8>,
}

impl Session {
    /// Creates a session; print output is captured when `print_enabled` is set.
    pub const fn new(print_enabled: bool, echo: bool) -> Self {
        Self {
            exit: None,
            print_enabled,
            echo,
            console: Vec::new(),
        }
    }

    /// Creates a session from the general configuration.
    pub const fn from_config(config: &GeneralConfig) -> Self {
        Self::new(config.print_enabled, config.echo_console)
    }

    /// Records a finish code.
    ///
    /// Only the first call in a session takes effect; it returns the recorded status. Later
    /// calls return `None` and leave the status unchanged.
    pub fn finish(&mut self, code: u32) -> Option<ExitStatus> {
        if self.exit.is_some() {
            return None;
        }
        let status = ExitStatus::from_code(code);
        self.exit = Some(status);
        match status {
            ExitStatus::Pass => tracing::info!("test finished: PASS"),
            ExitStatus::Fail(code) => {
                tracing::warn!(code = format_args!("{code:#x}"), "test finished: FAIL");
            }
        }
        Some(status)
    }

    /// Applies a write to a finish register.
    ///
    /// The code is the little-endian word formed by the first four bytes of `data`, with
    /// lanes the byte-enable mask disables read as zero. A zero code is ignored.
    pub fn write_finish(
        &mut self,
        data: &[u8],
        byte_enable: Option<&[u8]>,
    ) -> Option<ExitStatus> {
        let mut word = [0u8; 4];
        for (i, (slot, &byte)) in word.iter_mut().zip(data).enumerate() {
            if lane_enabled(byte_enable, i) {
                *slot = byte;
            }
        }
        match u32::from_le_bytes(word) {
            0 => None,
            code => self.finish(code),
        }
    }

    /// Applies a write to a print register: the low byte is one output character.
    ///
    /// Nothing is printed when the mask disables the low lane.
    pub fn write_print(&mut self, data: &[u8], byte_enable: Option<&[u8]>) {
        if let Some(&byte) = data.first().filter(|_| lane_enabled(byte_enable, 0)) {
            self.print_char(byte);
        }
    }

    /// Returns the exit status once a finish code has been written.
    pub const fn exit_status(&self) -> Option<ExitStatus> {
        self.exit
    }

    /// Returns `true` once a finish code has been written.
    pub const fn is_finished(&self) -> bool {
        self.exit.is_some()
    }

    /// Appends one character written to the print register.
    ///
    /// Ignored while printing is disabled.
    pub fn print_char(&mut self, byte: u8) {
        if !self.print_enabled {
            return;
        }
        self.console.push(byte);
        if self.echo {
            let mut out = io::stdout().lock();
            if let Err(err) = out.write_all(&[byte]).and_then(|()| out.flush()) {
                tracing::warn!("console echo failed: {err}");
            }
        }
    }

    /// Returns whether print output is captured.
    pub const fn print_enabled(&self) -> bool {
        self.print_enabled
    }

    /// Turns print capture on or off.
    pub const fn set_print_enabled(&mut self, enabled: bool) {
        self.print_enabled = enabled;
    }

    /// Returns the captured print output.
    pub fn console(&self) -> &[u8] {
        &self.console
    }

    /// Drains and returns the captured print output.
    pub fn take_console(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.console)
    }
}

/// Returns whether lane `i` is written under a cyclic byte-enable mask.
fn lane_enabled(byte_enable: Option<&[u8]>, i: usize) -> bool {
    match byte_enable {
        Some(mask) if !mask.is_empty() => mask[i % mask.len()] == BYTE_ENABLED,
        _ => true,
    }
}
