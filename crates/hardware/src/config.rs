//! Configuration system for the simulator.
//!
//! This module defines all configuration structures used to parameterize a run. It provides:
//! 1. **Defaults:** Baseline constants (clock, page geometry, protocol delays, MMIO map).
//! 2. **Structures:** Hierarchical config for general, clock, memory and system settings.
//! 3. **Validation:** Geometry and capacity checks applied before anything is built.
//!
//! Configuration is supplied as JSON (`Config::from_json` / `Config::from_file`) or built
//! with `Config::default()`.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::common::error::ConfigError;

/// Default configuration constants for the simulator.
mod defaults {
    /// Clock period in nanoseconds (100 MHz).
    pub const CLOCK_PERIOD_NS: u64 = 10;

    /// Page offset width in bits (4 KiB pages).
    pub const PAGE_BITS: u32 = 12;

    /// Page index width in bits; with `PAGE_BITS` this spans a 48-bit address space.
    pub const PAGE_INDEX_BITS: u32 = 36;

    /// Cycles from read acceptance to the store access.
    pub const READ_DONE_DELAY: u64 = 1;

    /// Cycles from the store access to the read response.
    pub const READ_ACK_DELAY: u64 = 6;

    /// Cycles from write acceptance to the store access.
    pub const WRITE_DONE_DELAY: u64 = 0;

    /// Cycles from the store access to the write response.
    pub const WRITE_ACK_DELAY: u64 = 5;

    /// Slots per transaction queue.
    pub const QUEUE_CAPACITY: usize = 32;

    /// Base of the control/status register block.
    pub const SCR_BASE: u64 = 0x3fff_b000;

    /// Size of the control/status register block.
    pub const SCR_SIZE: u64 = 0x1000;

    /// Address of the boot ROM holding the reset vector.
    pub const ROM_BASE: u64 = 0x1000;

    /// Program start address used when no ELF entry is known.
    pub const START_PC: u64 = 0x2000_0000;

    /// Register width of the simulated core.
    pub const XLEN: u32 = 64;

    /// Cache stub line size in bytes.
    pub const CACHE_LINE: u64 = 64;
}

/// Target used for accesses that no registered device claims.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum Fallback {
    /// Forward to the timing-aware memory controller.
    #[default]
    TimedMemory,
    /// Access the shared paged store directly, with zero latency.
    Store,
    /// Reject the access as unmapped.
    None,
}

/// Root configuration structure.
///
/// # Example
///
/// ```
/// use memsim_core::config::Config;
///
/// let json = r#"{ "memory": { "read_done_delay": 3 } }"#;
/// let config = Config::from_json(json).unwrap();
/// assert_eq!(config.memory.read_done_delay, 3);
/// assert_eq!(config.clock.period_ns, 10);
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Logging and console settings.
    #[serde(default)]
    pub general: GeneralConfig,
    /// Simulation clock.
    #[serde(default)]
    pub clock: ClockConfig,
    /// Paged store geometry and memory controller timing.
    #[serde(default)]
    pub memory: MemoryConfig,
    /// Address map of the system.
    #[serde(default)]
    pub system: SystemConfig,
}

impl Config {
    /// Parses and validates a configuration from JSON text.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    /// Checks the invariants the builders rely on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let m = &self.memory;
        if m.page_bits == 0 || m.page_bits > 32 || m.page_bits + m.page_index_bits > 64 {
            return Err(ConfigError::Geometry {
                page_bits: m.page_bits,
                page_index_bits: m.page_index_bits,
            });
        }
        if m.queue_capacity < 2 || !m.queue_capacity.is_power_of_two() {
            return Err(ConfigError::QueueCapacity(m.queue_capacity));
        }
        if self.clock.period_ns == 0 {
            return Err(ConfigError::ClockPeriod);
        }
        if let Some(cache) = &self.system.cache {
            if !cache.line_bytes.is_power_of_two() {
                return Err(ConfigError::CacheLine(cache.line_bytes));
            }
        }
        Ok(())
    }
}

/// General simulation settings.
#[derive(Debug, Clone, Deserialize)]
pub struct GeneralConfig {
    /// Enable per-transaction debug traces on every component.
    #[serde(default)]
    pub debug: bool,

    /// Capture characters written to the print register.
    #[serde(default = "GeneralConfig::default_print_enabled")]
    pub print_enabled: bool,

    /// Echo captured characters to stdout as they arrive.
    #[serde(default)]
    pub echo_console: bool,

    /// Register width; ELF images of the other class are rejected.
    #[serde(default = "GeneralConfig::default_xlen")]
    pub xlen: u32,
}

impl GeneralConfig {
    const fn default_print_enabled() -> bool {
        true
    }

    const fn default_xlen() -> u32 {
        defaults::XLEN
    }
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            debug: false,
            print_enabled: true,
            echo_console: false,
            xlen: defaults::XLEN,
        }
    }
}

/// Clock settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ClockConfig {
    /// Clock period in nanoseconds.
    #[serde(default = "ClockConfig::default_period")]
    pub period_ns: u64,
}

impl ClockConfig {
    const fn default_period() -> u64 {
        defaults::CLOCK_PERIOD_NS
    }
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            period_ns: defaults::CLOCK_PERIOD_NS,
        }
    }
}

/// Paged store geometry and memory controller timing.
#[derive(Debug, Clone, Deserialize)]
pub struct MemoryConfig {
    /// Page offset width `L`; pages are `2^L` bytes.
    #[serde(default = "MemoryConfig::default_page_bits")]
    pub page_bits: u32,

    /// Page index width `U`; the store holds up to `2^U` pages.
    #[serde(default = "MemoryConfig::default_page_index_bits")]
    pub page_index_bits: u32,

    /// Cycles between read acceptance and the store read.
    #[serde(default = "MemoryConfig::default_read_done")]
    pub read_done_delay: u64,

    /// Cycles between the store read and the read response.
    #[serde(default = "MemoryConfig::default_read_ack")]
    pub read_ack_delay: u64,

    /// Cycles between write acceptance and the store write.
    #[serde(default = "MemoryConfig::default_write_done")]
    pub write_done_delay: u64,

    /// Cycles between the store write and the write response.
    #[serde(default = "MemoryConfig::default_write_ack")]
    pub write_ack_delay: u64,

    /// Slots in each of the four transaction queues (power of two).
    #[serde(default = "MemoryConfig::default_queue_capacity")]
    pub queue_capacity: usize,

    /// Target for addresses no device claims.
    #[serde(default)]
    pub fallback: Fallback,
}

impl MemoryConfig {
    const fn default_page_bits() -> u32 {
        defaults::PAGE_BITS
    }

    const fn default_page_index_bits() -> u32 {
        defaults::PAGE_INDEX_BITS
    }

    const fn default_read_done() -> u64 {
        defaults::READ_DONE_DELAY
    }

    const fn default_read_ack() -> u64 {
        defaults::READ_ACK_DELAY
    }

    const fn default_write_done() -> u64 {
        defaults::WRITE_DONE_DELAY
    }

    const fn default_write_ack() -> u64 {
        defaults::WRITE_ACK_DELAY
    }

    const fn default_queue_capacity() -> usize {
        defaults::QUEUE_CAPACITY
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            page_bits: defaults::PAGE_BITS,
            page_index_bits: defaults::PAGE_INDEX_BITS,
            read_done_delay: defaults::READ_DONE_DELAY,
            read_ack_delay: defaults::READ_ACK_DELAY,
            write_done_delay: defaults::WRITE_DONE_DELAY,
            write_ack_delay: defaults::WRITE_ACK_DELAY,
            queue_capacity: defaults::QUEUE_CAPACITY,
            fallback: Fallback::default(),
        }
    }
}

/// A plain memory region mapped onto the shared store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct RegionConfig {
    /// Base address.
    pub base: u64,
    /// Size in bytes.
    pub size: u64,
}

/// Placement of the cache stub device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct CacheConfig {
    /// Base address.
    pub base: u64,
    /// Size of the claimed window in bytes.
    pub size: u64,
    /// Line size in bytes.
    #[serde(default = "CacheConfig::default_line")]
    pub line_bytes: u64,
}

impl CacheConfig {
    const fn default_line() -> u64 {
        defaults::CACHE_LINE
    }
}

/// Address map of the simulated system.
#[derive(Debug, Clone, Deserialize)]
pub struct SystemConfig {
    /// Base of the control/status register block.
    #[serde(default = "SystemConfig::default_scr_base")]
    pub scr_base: u64,

    /// Size of the control/status register block.
    #[serde(default = "SystemConfig::default_scr_size")]
    pub scr_size: u64,

    /// Register the control/status block on the bus.
    #[serde(default = "SystemConfig::default_scr_enabled")]
    pub scr_enabled: bool,

    /// Boot ROM address for the reset vector.
    #[serde(default = "SystemConfig::default_rom_base")]
    pub rom_base: u64,

    /// Start address when no program entry is available.
    #[serde(default = "SystemConfig::default_start_pc")]
    pub start_pc: u64,

    /// Zero-latency memory windows onto the shared store.
    #[serde(default)]
    pub memories: Vec<RegionConfig>,

    /// Optional cache stub device.
    #[serde(default)]
    pub cache: Option<CacheConfig>,
}

impl SystemConfig {
    const fn default_scr_base() -> u64 {
        defaults::SCR_BASE
    }

    const fn default_scr_size() -> u64 {
        defaults::SCR_SIZE
    }

    const fn default_scr_enabled() -> bool {
        true
    }

    const fn default_rom_base() -> u64 {
        defaults::ROM_BASE
    }

    const fn default_start_pc() -> u64 {
        defaults::START_PC
    }
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            scr_base: defaults::SCR_BASE,
            scr_size: defaults::SCR_SIZE,
            scr_enabled: true,
            rom_base: defaults::ROM_BASE,
            start_pc: defaults::START_PC,
            memories: Vec::new(),
            cache: None,
        }
    }
}
