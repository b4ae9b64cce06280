//! Common utilities and types used throughout the simulator.
//!
//! This module provides the building blocks shared by every component:
//! 1. **Constants:** Byte-enable sentinels, register offsets and reset-vector encodings.
//! 2. **Protocol data:** Commands, phases and status codes of the transaction socket.
//! 3. **Errors:** Typed failures for each layer.
//! 4. **Time:** Simulated instants and clock-edge alignment.
//! 5. **Logging:** Per-component runtime debug switches.

/// Common constants used throughout the simulator.
pub mod constants;

/// Transaction protocol value types.
pub mod data;

/// Error types.
pub mod error;

/// Component debug switches.
pub mod log;

/// Simulated time and clock alignment.
pub mod time;

pub use data::{Command, Phase, ResponseStatus, SyncStatus};
pub use error::{
    ArenaError, BusError, ConfigError, LoadError, MemError, QueueFull, SimError, TransportError,
};
pub use log::ComponentLog;
pub use time::{Clock, SimTime};
