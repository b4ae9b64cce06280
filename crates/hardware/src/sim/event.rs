//! Discrete-event queue.
//!
//! Events are kept in a min-heap keyed by firing time. Events scheduled for the same instant
//! fire in the order they were scheduled, which keeps runs deterministic when several
//! timers land on one clock edge.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::common::data::Command;
use crate::common::time::SimTime;
use crate::sim::transaction::TxHandle;

/// The four timers of the memory controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// The store read for the front pending read is due.
    ReadDone,
    /// The response for the front acknowledged read is due.
    ReadAck,
    /// The store write for the front pending write is due.
    WriteDone,
    /// The response for the front acknowledged write is due.
    WriteAck,
}

impl EventKind {
    /// Returns the direction the timer belongs to.
    pub const fn command(self) -> Command {
        match self {
            Self::ReadDone | Self::ReadAck => Command::Read,
            Self::WriteDone | Self::WriteAck => Command::Write,
        }
    }
}

/// A timer notification for one transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Event {
    /// Which timer fired.
    pub kind: EventKind,
    /// Transaction the timer was armed for.
    pub handle: TxHandle,
}

#[derive(Debug)]
struct Scheduled {
    at: SimTime,
    seq: u64,
    event: Event,
}

impl PartialEq for Scheduled {
    fn eq(&self, other: &Self) -> bool {
        self.at == other.at && self.seq == other.seq
    }
}

impl Eq for Scheduled {}

impl PartialOrd for Scheduled {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Scheduled {
    // Reversed so the max-heap yields the earliest (time, seq) first.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .at
            .cmp(&self.at)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Time-ordered queue of pending [`Event`]s.
#[derive(Debug, Default)]
pub struct EventQueue {
    heap: BinaryHeap<Scheduled>,
    next_seq: u64,
}

impl EventQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms `event` to fire at `at`.
    pub fn schedule(&mut self, at: SimTime, event: Event) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Scheduled { at, seq, event });
    }

    /// Returns the firing time of the earliest event.
    pub fn peek_time(&self) -> Option<SimTime> {
        self.heap.peek().map(|s| s.at)
    }

    /// Removes and returns the earliest event with its firing time.
    pub fn pop(&mut self) -> Option<(SimTime, Event)> {
        self.heap.pop().map(|s| (s.at, s.event))
    }

    /// Returns the number of armed events.
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Returns `true` if no event is armed.
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}
