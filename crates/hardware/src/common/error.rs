//! Error types for every simulator layer.
//!
//! This module defines one error enum per layer and a top-level [`SimError`]:
//! 1. **Store:** Out-of-range accesses on the paged memory.
//! 2. **Bus:** Unmapped addresses and rejected registrations.
//! 3. **Transport:** Backpressure, protocol violations and stale handles.
//! 4. **Setup:** Configuration and binary loading failures.
//!
//! Every failure is either returned as a typed error the caller can recover from, or is a
//! deliberate fatal stop surfaced through [`SimError`]. Nothing is dropped silently.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use super::data::{Command, Phase};
use crate::sim::transaction::{TxHandle, TxState};

/// Failure of a paged-store access.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum MemError {
    /// `addr + len` runs past the end of the address space.
    #[error("access of {len} bytes at {addr:#x} exceeds the {size:#x}-byte address space")]
    OutOfRange {
        /// Start address of the access.
        addr: u64,
        /// Length of the access in bytes.
        len: usize,
        /// Total size of the address space.
        size: u64,
    },
}

/// A push onto a circular buffer that has no free slot.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
#[error("transaction queue is full ({capacity} slots)")]
pub struct QueueFull {
    /// Total slot count of the rejecting buffer.
    pub capacity: usize,
}

/// Failure in the device router.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum BusError {
    /// No device claims the address and no fallback target is configured.
    #[error("no device mapped at {addr:#x}")]
    Unmapped {
        /// Address of the rejected access.
        addr: u64,
    },
    /// A new registration intersects an existing one.
    #[error("range {base:#x}+{size:#x} overlaps device '{existing}'")]
    Overlap {
        /// Base of the rejected range.
        base: u64,
        /// Size of the rejected range.
        size: u64,
        /// Name of the device already holding part of the range.
        existing: String,
    },
    /// A registration with no extent, or one that wraps past the top of the address space.
    #[error("invalid device range {base:#x}+{size:#x}")]
    InvalidRange {
        /// Base of the rejected range.
        base: u64,
        /// Size of the rejected range.
        size: u64,
    },
    /// The zero-latency store fallback rejected the access.
    #[error(transparent)]
    Memory(#[from] MemError),
}

/// Access to a transaction record through a handle that no longer names it.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum ArenaError {
    /// The record was retired, or the slot has been reused by a newer record.
    #[error("stale transaction handle {0}")]
    StaleHandle(TxHandle),
}

/// Failure while moving a transaction through the two-phase protocol.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The direction already holds as many in-flight transactions as its queues allow.
    ///
    /// The request was not accepted and may be presented again later.
    #[error("{command} queue is full; request not accepted")]
    BufferFull {
        /// Direction whose queues are saturated.
        command: Command,
    },
    /// A phase arrived that the transaction's state does not permit.
    #[error("protocol violation: {phase} received for {handle} in state {state}")]
    ProtocolViolation {
        /// The offending transaction.
        handle: TxHandle,
        /// Phase received.
        phase: Phase,
        /// State the transaction was in.
        state: TxState,
    },
    /// A timer fired for a transaction that is not at the front of its queue.
    #[error("ordering violation: event for {expected} but queue front is {found:?}")]
    OrderViolation {
        /// Handle carried by the event.
        expected: TxHandle,
        /// Handle actually at the front of the queue.
        found: Option<TxHandle>,
    },
    /// The target answered with an address error.
    #[error("{handle}: target reported an address error at {addr:#x}")]
    AddressError {
        /// The failed transaction.
        handle: TxHandle,
        /// Address of the access.
        addr: u64,
    },
    /// A queue rejected a push that admission control should have prevented.
    #[error(transparent)]
    Queue(#[from] QueueFull),
    /// The handle does not name a live record.
    #[error(transparent)]
    Arena(#[from] ArenaError),
    /// The store-backed access failed.
    #[error(transparent)]
    Memory(#[from] MemError),
    /// The router could not resolve the target.
    #[error(transparent)]
    Bus(#[from] BusError),
}

/// Failure to read or validate a program image.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The file could not be read.
    #[error("could not read '{}': {source}", path.display())]
    Io {
        /// Path that failed.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },
    /// The file is not an ELF image.
    #[error("bad ELF magic")]
    BadMagic,
    /// The ELF headers are malformed.
    #[error("malformed ELF: {0}")]
    Malformed(String),
    /// The image is not an executable.
    #[error("ELF is not an executable image")]
    NotExecutable,
    /// The image targets a machine other than RISC-V.
    #[error("unsupported ELF machine: {0}")]
    UnsupportedArchitecture(String),
    /// The image is big-endian.
    #[error("big-endian ELF images are not supported")]
    BigEndian,
    /// The ELF class does not match the configured register width.
    #[error("ELF word size is {found} bits, expected {expected}")]
    WordSize {
        /// Configured XLEN.
        expected: u32,
        /// Word size of the image.
        found: u32,
    },
    /// A loadable segment points outside the file.
    #[error("segment at {paddr:#x} lies outside the file")]
    SegmentOutOfBounds {
        /// Physical load address of the segment.
        paddr: u64,
    },
    /// A memory trace file is not valid JSON for a trace.
    #[error("invalid trace: {0}")]
    Trace(#[from] serde_json::Error),
    /// Writing a segment into the store failed.
    #[error(transparent)]
    Memory(#[from] MemError),
}

/// Invalid or unreadable configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("could not read config '{}': {source}", path.display())]
    Io {
        /// Path that failed.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },
    /// The JSON text does not describe a configuration.
    #[error("invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),
    /// The page geometry does not fit a 64-bit address.
    #[error("page geometry {page_index_bits}+{page_bits} bits does not fit a 64-bit address")]
    Geometry {
        /// Page offset width.
        page_bits: u32,
        /// Page index width.
        page_index_bits: u32,
    },
    /// Queue capacity must be a power of two, at least 2.
    #[error("queue capacity {0} is not a power of two >= 2")]
    QueueCapacity(usize),
    /// The clock period must be nonzero.
    #[error("clock period must be nonzero")]
    ClockPeriod,
    /// Cache line size must be a nonzero power of two.
    #[error("cache line size {0} is not a nonzero power of two")]
    CacheLine(u64),
}

/// Top-level simulator error.
#[derive(Debug, Error)]
pub enum SimError {
    /// Configuration was rejected.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Program loading failed.
    #[error(transparent)]
    Load(#[from] LoadError),
    /// A transaction could not proceed.
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// The router rejected a registration or an access.
    #[error(transparent)]
    Bus(#[from] BusError),
    /// A direct store access failed.
    #[error(transparent)]
    Memory(#[from] MemError),
    /// A handle was stale.
    #[error(transparent)]
    Arena(#[from] ArenaError),
    /// A request is waiting for something no scheduled event can ever provide.
    #[error("simulation stalled on {handle}: no pending events")]
    Deadlock {
        /// The transaction that can make no progress.
        handle: TxHandle,
    },
    /// The simulation finished while a blocking access was outstanding.
    #[error("simulation finished before {handle} completed")]
    Finished {
        /// The transaction left incomplete.
        handle: TxHandle,
    },
}
