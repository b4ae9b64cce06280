//! System-on-Chip (SoC) Components.
//!
//! This module organizes the components that make up the simulated memory system,
//! including the bus, the timed memory, the devices, and the builder that assembles them.

/// System builder and top-level `System`.
pub mod builder;

/// Bus-attached device implementations.
pub mod devices;

/// Address-range router.
pub mod interconnect;

/// Paged store, transaction queues and the timed memory controller.
pub mod memory;

/// Device and socket traits.
pub mod traits;

pub use builder::System;
pub use traits::{BackwardTransport, Device, DeviceContext};
