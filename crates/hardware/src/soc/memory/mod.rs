//! Memory subsystem.
//!
//! This module implements the timing-aware main memory. It provides:
//! 1. **Buffer:** The sparse paged store shared by every device.
//! 2. **Queue:** Fixed-capacity circular buffers of in-flight transaction handles.
//! 3. **Controller:** The two-phase protocol engine that schedules store accesses and
//!    responses on clock edges.

/// Sparse paged backing store.
pub mod buffer;

/// Two-phase protocol engine.
pub mod controller;

/// Circular buffers of transaction handles.
pub mod queue;

pub use buffer::SparseMemory;
pub use controller::{Delays, EngineContext, MemoryController};
pub use queue::TxQueue;
