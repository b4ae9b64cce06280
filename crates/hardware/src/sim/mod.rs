//! Simulation kernel and program loading.
//!
//! This module contains everything that runs the memory system over time:
//! 1. **Transactions:** Generational records and the arena that owns them.
//! 2. **Events:** The time-ordered timer queue.
//! 3. **Session:** Per-run finish latch and console.
//! 4. **Simulator:** The event loop and the blocking/non-blocking requester API.
//! 5. **Loader:** ELF loading and the boot ROM reset vector.

/// Timed events and the event queue.
pub mod event;
/// ELF loading and reset vector installation.
pub mod loader;
/// Run-scoped finish state and console output.
pub mod session;
/// Event loop and requester API.
pub mod simulator;
/// Transaction records, handles and the arena.
pub mod transaction;

pub use event::{Event, EventKind, EventQueue};
pub use loader::{LoadedImage, install_reset_vector, load_elf, load_elf_bytes, reset_vector};
pub use session::{ExitStatus, Session};
pub use simulator::{InitiatorPort, Simulator};
pub use transaction::{Transaction, TransactionArena, TxExtension, TxHandle, TxState};
