//! Direct-mapped cache stub.
//!
//! Maps each device offset to `(line, line_offset)` with a fixed line size and keeps one
//! entry per line ever written. There is no eviction and no backing store: a read of a line
//! that was never written is a miss and leaves the caller's buffer as it was.

use std::collections::BTreeMap;

use crate::common::constants::BYTE_ENABLED;
use crate::common::error::MemError;
use crate::common::log::ComponentLog;
use crate::soc::traits::{Device, DeviceContext};

/// Cache stub with unlimited capacity.
#[derive(Debug)]
pub struct CacheStub {
    line_bytes: u64,
    lines: BTreeMap<u64, Box<[u8]>>,
    hits: u64,
    misses: u64,
    log: ComponentLog,
}

impl CacheStub {
    /// Creates an empty cache with `line_bytes` bytes per line (a power of two).
    pub fn new(line_bytes: u64) -> Self {
        Self {
            line_bytes: line_bytes.max(1),
            lines: BTreeMap::new(),
            hits: 0,
            misses: 0,
            log: ComponentLog::new("CACHE"),
        }
    }

    /// Returns the line size in bytes.
    pub const fn line_bytes(&self) -> u64 {
        self.line_bytes
    }

    /// Returns the number of valid lines.
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Returns whether the line holding `offset` is valid.
    pub fn is_valid(&self, offset: u64) -> bool {
        self.lines.contains_key(&(offset / self.line_bytes))
    }

    /// Returns `(hits, misses)` counted per line touched by reads.
    pub const fn hit_counts(&self) -> (u64, u64) {
        (self.hits, self.misses)
    }

    /// Splits an access into `(line, line_offset, start, len)` pieces.
    fn pieces(&self, offset: u64, len: usize) -> Vec<(u64, usize, usize, usize)> {
        let mut out = Vec::new();
        let mut start = 0usize;
        while start < len {
            let at = offset + start as u64;
            let line_offset = (at % self.line_bytes) as usize;
            let chunk = (self.line_bytes as usize - line_offset).min(len - start);
            out.push((at / self.line_bytes, line_offset, start, chunk));
            start += chunk;
        }
        out
    }
}

impl Device for CacheStub {
    fn name(&self) -> &str {
        "CACHE"
    }

    fn read(
        &mut self,
        offset: u64,
        buf: &mut [u8],
        _ctx: &mut DeviceContext<'_>,
    ) -> Result<(), MemError> {
        for (line, line_offset, start, len) in self.pieces(offset, buf.len()) {
            match self.lines.get(&line) {
                Some(data) => {
                    self.hits += 1;
                    buf[start..start + len]
                        .copy_from_slice(&data[line_offset..line_offset + len]);
                }
                None => {
                    self.misses += 1;
                    if self.log.enabled() {
                        tracing::warn!(
                            component = self.log.name(),
                            line,
                            "read miss, no back-fill"
                        );
                    }
                }
            }
        }
        Ok(())
    }

    fn write(
        &mut self,
        offset: u64,
        data: &[u8],
        byte_enable: Option<&[u8]>,
        _ctx: &mut DeviceContext<'_>,
    ) -> Result<(), MemError> {
        let mask = byte_enable.filter(|m| !m.is_empty());
        let size = self.line_bytes as usize;
        for (line, line_offset, start, len) in self.pieces(offset, data.len()) {
            let entry = self
                .lines
                .entry(line)
                .or_insert_with(|| vec![0u8; size].into_boxed_slice());
            let dst = &mut entry[line_offset..line_offset + len];
            let src = &data[start..start + len];
            match mask {
                None => dst.copy_from_slice(src),
                Some(mask) => {
                    for (i, (d, s)) in dst.iter_mut().zip(src).enumerate() {
                        if mask[(start + i) % mask.len()] == BYTE_ENABLED {
                            *d = *s;
                        }
                    }
                }
            }
        }
        if self.log.enabled() {
            tracing::debug!(
                component = self.log.name(),
                offset = format_args!("{offset:#x}"),
                len = data.len(),
                "line write"
            );
        }
        Ok(())
    }

    fn log_mut(&mut self) -> Option<&mut ComponentLog> {
        Some(&mut self.log)
    }
}
