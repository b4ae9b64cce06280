//! Fixed-capacity circular buffer of transaction handles.
//!
//! The memory controller keeps four of these (pending and acknowledged, per direction).
//! Insertion order is completion order, so the buffer is the ordering primitive of the
//! protocol engine.
//!
//! `head` is the next slot to write and `tail` the next slot to read; the buffer is empty
//! when they are equal. One slot always stays free to tell full from empty, so a buffer of
//! capacity `N` holds at most `N - 1` handles.

use crate::common::error::QueueFull;
use crate::sim::transaction::TxHandle;

/// Circular FIFO of [`TxHandle`]s with a power-of-two slot count.
#[derive(Debug, Clone)]
pub struct TxQueue {
    slots: Box<[Option<TxHandle>]>,
    head: usize,
    tail: usize,
    mask: usize,
}

impl TxQueue {
    /// Creates an empty queue with `capacity` slots.
    ///
    /// `capacity` is rounded up to the next power of two, with a minimum of 2.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(2).next_power_of_two();
        Self {
            slots: vec![None; capacity].into_boxed_slice(),
            head: 0,
            tail: 0,
            mask: capacity - 1,
        }
    }

    /// Returns the total slot count.
    pub const fn capacity(&self) -> usize {
        self.mask + 1
    }

    /// Returns the maximum number of handles the queue can hold at once.
    pub const fn usable(&self) -> usize {
        self.mask
    }

    /// Returns the number of queued handles.
    pub const fn len(&self) -> usize {
        self.head.wrapping_sub(self.tail) & self.mask
    }

    /// Returns `true` when no handle is queued.
    pub const fn is_empty(&self) -> bool {
        self.head == self.tail
    }

    /// Returns `true` when a push would be rejected.
    pub const fn is_full(&self) -> bool {
        (self.head + 1) & self.mask == self.tail
    }

    /// Appends a handle at the back.
    ///
    /// A full queue rejects the push and is left unchanged.
    pub fn push(&mut self, handle: TxHandle) -> Result<(), QueueFull> {
        let next = (self.head + 1) & self.mask;
        if next == self.tail {
            return Err(QueueFull {
                capacity: self.capacity(),
            });
        }
        self.slots[self.head] = Some(handle);
        self.head = next;
        Ok(())
    }

    /// Removes and returns the handle at the front.
    pub fn pop(&mut self) -> Option<TxHandle> {
        if self.is_empty() {
            return None;
        }
        let handle = self.slots[self.tail].take();
        self.tail = (self.tail + 1) & self.mask;
        handle
    }

    /// Returns the handle at the front without removing it.
    pub fn peek(&self) -> Option<TxHandle> {
        if self.is_empty() {
            None
        } else {
            self.slots[self.tail]
        }
    }
}
