//! Memory trace replay.
//!
//! A trace lists, per hart, the loads and stores that hart performs. The [`TraceCore`]
//! issues them through a [`MemoryInterface`], one operation per hart in round-robin order,
//! tagging each access with the hart id. Loads may carry the bytes they are expected to
//! return; differences are collected rather than aborting the run.
//!
//! ```json
//! { "harts": [
//!     [ { "op": "store", "addr": 2147483648, "data": [1, 2, 3, 4] },
//!       { "op": "load",  "addr": 2147483648, "len": 4, "expect": [1, 2, 3, 4] } ]
//! ] }
//! ```

use std::collections::VecDeque;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use super::MemoryInterface;
use crate::common::error::{LoadError, SimError};

/// One recorded memory operation.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum MemOp {
    /// Read `len` bytes.
    Load {
        /// Target address.
        addr: u64,
        /// Length in bytes.
        len: usize,
        /// Bytes the load should return.
        #[serde(default)]
        expect: Option<Vec<u8>>,
    },
    /// Write `data`.
    Store {
        /// Target address.
        addr: u64,
        /// Bytes to write.
        data: Vec<u8>,
        /// Optional byte-enable mask.
        #[serde(default)]
        byte_enable: Option<Vec<u8>>,
    },
}

/// Per-hart operation lists.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct Trace {
    /// Operations of each hart, indexed by hart id.
    pub harts: Vec<Vec<MemOp>>,
}

impl Trace {
    /// Parses a trace from JSON text.
    pub fn from_json(json: &str) -> Result<Self, LoadError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads and parses a JSON trace file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }
}

/// A load that returned something other than its expected bytes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Mismatch {
    /// Hart that issued the load.
    pub hart: usize,
    /// Load address.
    pub addr: u64,
    /// Bytes the trace expected.
    pub expected: Vec<u8>,
    /// Bytes actually returned.
    pub found: Vec<u8>,
}

/// Outcome of a replay.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TraceReport {
    /// Loads completed.
    pub loads: u64,
    /// Stores completed.
    pub stores: u64,
    /// Loads whose data differed from the expectation.
    pub mismatches: Vec<Mismatch>,
    /// Operations left unissued because the program finished first.
    pub skipped: usize,
}

/// Core stand-in that replays a [`Trace`].
#[derive(Debug)]
pub struct TraceCore {
    harts: Vec<VecDeque<MemOp>>,
}

impl TraceCore {
    /// Creates a core that will replay `trace`.
    pub fn new(trace: Trace) -> Self {
        Self {
            harts: trace.harts.into_iter().map(VecDeque::from).collect(),
        }
    }

    /// Returns the number of harts.
    pub fn hart_count(&self) -> usize {
        self.harts.len()
    }

    /// Returns the number of operations not yet issued.
    pub fn remaining(&self) -> usize {
        self.harts.iter().map(VecDeque::len).sum()
    }

    /// Replays every operation.
    ///
    /// Once the program writes its finish code the remaining operations are skipped and
    /// counted in the report. Any other error stops the replay and is returned.
    pub fn run(&mut self, mem: &mut impl MemoryInterface) -> Result<TraceReport, SimError> {
        let mut report = TraceReport::default();
        while self.remaining() > 0 {
            for hart in 0..self.harts.len() {
                let Some(op) = self.harts[hart].pop_front() else {
                    continue;
                };
                match Self::issue(hart, op, mem, &mut report) {
                    Ok(()) => {}
                    Err(SimError::Finished { .. }) => {
                        report.skipped = self.remaining() + 1;
                        self.harts.iter_mut().for_each(VecDeque::clear);
                        tracing::info!(skipped = report.skipped, "trace stopped at finish");
                        return Ok(report);
                    }
                    Err(err) => return Err(err),
                }
            }
        }
        Ok(report)
    }

    fn issue(
        hart: usize,
        op: MemOp,
        mem: &mut impl MemoryInterface,
        report: &mut TraceReport,
    ) -> Result<(), SimError> {
        match op {
            MemOp::Load { addr, len, expect } => {
                let found = mem.load(hart, addr, len)?;
                report.loads += 1;
                if let Some(expected) = expect {
                    if expected != found {
                        tracing::warn!(hart, addr = format_args!("{addr:#x}"), "load mismatch");
                        report.mismatches.push(Mismatch {
                            hart,
                            addr,
                            expected,
                            found,
                        });
                    }
                }
            }
            MemOp::Store {
                addr,
                data,
                byte_enable,
            } => {
                mem.store(hart, addr, &data, byte_enable.as_deref())?;
                report.stores += 1;
            }
        }
        Ok(())
    }
}
