//! Sparse paged memory store.
//!
//! This module provides the byte-addressable backing store shared by every device. The
//! address space spans `2^(U + L)` bytes split into `2^U` pages of `2^L` bytes each. Pages
//! are allocated zero-filled the first time any byte inside them is touched and are never
//! freed, so host memory grows with the touched footprint rather than the simulated size.
//!
//! Accesses that cross page boundaries are split into one bounded copy per page, in
//! address order.

use std::collections::HashMap;

use crate::common::constants::BYTE_ENABLED;
use crate::common::error::{ConfigError, MemError};
use crate::config::MemoryConfig;

/// One contiguous piece of an access that falls inside a single page.
#[derive(Clone, Copy, Debug)]
struct Span {
    page: u64,
    offset: usize,
    start: usize,
    len: usize,
}

/// Sparse byte array with on-demand page allocation.
#[derive(Debug)]
pub struct SparseMemory {
    pages: HashMap<u64, Box<[u8]>>,
    page_bits: u32,
    page_index_bits: u32,
}

impl SparseMemory {
    /// Creates an empty store with `2^page_index_bits` pages of `2^page_bits` bytes.
    ///
    /// # Arguments
    ///
    /// * `page_bits` - Page offset width `L` (1..=32).
    /// * `page_index_bits` - Page index width `U`; `U + L` must not exceed 64.
    pub fn new(page_bits: u32, page_index_bits: u32) -> Result<Self, ConfigError> {
        if page_bits == 0 || page_bits > 32 || page_bits + page_index_bits > 64 {
            return Err(ConfigError::Geometry {
                page_bits,
                page_index_bits,
            });
        }
        Ok(Self {
            pages: HashMap::new(),
            page_bits,
            page_index_bits,
        })
    }

    /// Creates a store with the geometry from the memory configuration.
    pub fn from_config(config: &MemoryConfig) -> Result<Self, ConfigError> {
        Self::new(config.page_bits, config.page_index_bits)
    }

    /// Returns the page size in bytes.
    pub const fn page_size(&self) -> u64 {
        1 << self.page_bits
    }

    /// Returns the number of pages the address space can hold.
    pub const fn page_count(&self) -> u64 {
        1 << self.page_index_bits
    }

    /// Returns the size of the address space in bytes, saturating at `u64::MAX` for a full
    /// 64-bit space.
    pub const fn size(&self) -> u64 {
        let bits = self.page_bits + self.page_index_bits;
        if bits >= 64 { u64::MAX } else { 1 << bits }
    }

    /// Returns the number of pages allocated so far.
    pub fn allocated_pages(&self) -> usize {
        self.pages.len()
    }

    /// Returns whether the page holding `addr` has been allocated, without allocating it.
    ///
    /// Addresses outside the address space are never allocated.
    pub fn is_allocated(&self, addr: u64) -> bool {
        self.check(addr, 1).is_ok() && self.pages.contains_key(&(addr >> self.page_bits))
    }

    /// Reads `buf.len()` bytes starting at `addr`.
    ///
    /// Every page touched is allocated if absent; untouched memory reads as zero.
    pub fn read(&mut self, addr: u64, buf: &mut [u8]) -> Result<(), MemError> {
        self.check(addr, buf.len())?;
        for span in self.spans(addr, buf.len()) {
            let page = self.page_mut(span.page);
            buf[span.start..span.start + span.len]
                .copy_from_slice(&page[span.offset..span.offset + span.len]);
        }
        Ok(())
    }

    /// Writes `data` starting at `addr`.
    ///
    /// With a non-empty `byte_enable` mask, byte `i` of the access is stored only when
    /// `byte_enable[i % mask_len]` is `0xFF`; other bytes keep their previous value.
    pub fn write(
        &mut self,
        addr: u64,
        data: &[u8],
        byte_enable: Option<&[u8]>,
    ) -> Result<(), MemError> {
        self.check(addr, data.len())?;
        let mask = byte_enable.filter(|m| !m.is_empty());
        for span in self.spans(addr, data.len()) {
            let page = self.page_mut(span.page);
            let dst = &mut page[span.offset..span.offset + span.len];
            let src = &data[span.start..span.start + span.len];
            match mask {
                None => dst.copy_from_slice(src),
                Some(mask) => {
                    for (i, (d, s)) in dst.iter_mut().zip(src).enumerate() {
                        if mask[(span.start + i) % mask.len()] == BYTE_ENABLED {
                            *d = *s;
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Copies a contiguous image into the store (no byte enables).
    pub fn load(&mut self, addr: u64, data: &[u8]) -> Result<(), MemError> {
        self.write(addr, data, None)
    }

    /// Zeroes `len` bytes starting at `addr` without allocating.
    ///
    /// Pages that were never touched already read as zero, so only resident pages change.
    /// The whole range is checked before anything is cleared.
    pub fn clear(&mut self, addr: u64, len: u64) -> Result<(), MemError> {
        let bits = self.page_bits + self.page_index_bits;
        let end = u128::from(addr) + u128::from(len);
        if end > 1u128 << bits {
            return Err(MemError::OutOfRange {
                addr,
                len: usize::try_from(len).unwrap_or(usize::MAX),
                size: self.size(),
            });
        }
        let page_bits = self.page_bits;
        let page_size = 1u128 << page_bits;
        for (&index, page) in &mut self.pages {
            let base = u128::from(index) << page_bits;
            let lo = base.max(u128::from(addr));
            let hi = (base + page_size).min(end);
            if lo < hi {
                page[(lo - base) as usize..(hi - base) as usize].fill(0);
            }
        }
        Ok(())
    }

    /// Reads a little-endian 32-bit word.
    pub fn read_u32(&mut self, addr: u64) -> Result<u32, MemError> {
        let mut bytes = [0u8; 4];
        self.read(addr, &mut bytes)?;
        Ok(u32::from_le_bytes(bytes))
    }

    /// Reads a little-endian 64-bit word.
    pub fn read_u64(&mut self, addr: u64) -> Result<u64, MemError> {
        let mut bytes = [0u8; 8];
        self.read(addr, &mut bytes)?;
        Ok(u64::from_le_bytes(bytes))
    }

    /// Writes a little-endian 32-bit word.
    pub fn write_u32(&mut self, addr: u64, val: u32) -> Result<(), MemError> {
        self.write(addr, &val.to_le_bytes(), None)
    }

    fn check(&self, addr: u64, len: usize) -> Result<(), MemError> {
        let bits = self.page_bits + self.page_index_bits;
        let limit = 1u128 << bits;
        if u128::from(addr) + len as u128 > limit {
            return Err(MemError::OutOfRange {
                addr,
                len,
                size: self.size(),
            });
        }
        Ok(())
    }

    fn spans(&self, addr: u64, len: usize) -> impl Iterator<Item = Span> + use<> {
        let page_bits = self.page_bits;
        let page_size = 1usize << page_bits;
        let mask = (1u64 << page_bits) - 1;
        let mut cursor = addr;
        let mut start = 0usize;
        std::iter::from_fn(move || {
            if start >= len {
                return None;
            }
            let offset = (cursor & mask) as usize;
            let chunk = (page_size - offset).min(len - start);
            let span = Span {
                page: cursor >> page_bits,
                offset,
                start,
                len: chunk,
            };
            start += chunk;
            cursor = cursor.wrapping_add(chunk as u64);
            Some(span)
        })
    }

    fn page_mut(&mut self, index: u64) -> &mut [u8] {
        let size = 1usize << self.page_bits;
        self.pages.entry(index).or_insert_with(|| {
            tracing::trace!(page = index, "allocating page");
            vec![0u8; size].into_boxed_slice()
        })
    }
}
