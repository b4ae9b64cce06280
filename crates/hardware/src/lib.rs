//! Cycle-approximate memory transaction simulator.
//!
//! This crate models the memory side of a RISC-V system at transaction level:
//! 1. **Store:** A sparse paged backing store covering a wide physical address space.
//! 2. **SoC:** A device router, a control/status register block and a cache stub.
//! 3. **Memory:** A two-phase timed memory engine with per-direction FIFO queues.
//! 4. **Simulation:** Event loop, transaction arena, ELF loader and reset vector.
//! 5. **Core:** The blocking load/store seam and a trace-replay core.

/// Common types and constants (protocol enums, errors, time, logging).
pub mod common;
/// Simulator configuration (defaults and JSON loading).
pub mod config;
/// Requester side (memory interface, trace replay core).
pub mod core;
/// Simulation kernel (transactions, events, session, loader).
pub mod sim;
/// System-on-chip (builder, bus, devices, memory engine, traits).
pub mod soc;
/// Transaction statistics collection and reporting.
pub mod stats;

/// Root configuration type; use `Config::default()` or deserialize from JSON.
pub use crate::config::Config;
/// Blocking access seam for core models.
pub use crate::core::MemoryInterface;
/// Event-driven simulator; construct with `Simulator::new`.
pub use crate::sim::Simulator;
/// Top-level system (bus, store, memory engine, session); construct with `System::new`.
pub use crate::soc::System;
