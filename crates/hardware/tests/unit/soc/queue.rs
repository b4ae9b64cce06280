//! Transaction Queue Tests.

use memsim_core::common::error::QueueFull;
use memsim_core::sim::transaction::{Transaction, TransactionArena, TxHandle};
use memsim_core::soc::memory::TxQueue;

fn handles(n: usize) -> Vec<TxHandle> {
    let mut arena = TransactionArena::new();
    (0..n)
        .map(|i| arena.alloc(Transaction::read(i as u64 * 8, 8)))
        .collect()
}

#[test]
fn capacity_rounds_up_to_power_of_two() {
    assert_eq!(TxQueue::new(5).capacity(), 8);
    assert_eq!(TxQueue::new(32).capacity(), 32);
    assert_eq!(TxQueue::new(0).capacity(), 2);
    assert_eq!(TxQueue::new(1).capacity(), 2);
}

#[test]
fn one_slot_stays_free() {
    let hs = handles(4);
    let mut q = TxQueue::new(4);
    assert_eq!(q.usable(), 3);
    for &h in &hs[..3] {
        q.push(h).expect("room");
    }
    assert!(q.is_full());
    assert_eq!(q.len(), 3);
    assert_eq!(q.push(hs[3]), Err(QueueFull { capacity: 4 }));
    assert_eq!(q.len(), 3);
    assert_eq!(q.peek(), Some(hs[0]));
}

#[test]
fn fifo_order_survives_wraparound() {
    let hs = handles(10);
    let mut q = TxQueue::new(4);
    let mut popped = Vec::new();
    for pair in hs.chunks(2) {
        for &h in pair {
            q.push(h).expect("room");
        }
        popped.extend(q.pop());
        popped.extend(q.pop());
    }
    assert_eq!(popped, hs);
    assert!(q.is_empty());
}

#[test]
fn empty_queue_pops_nothing() {
    let mut q = TxQueue::new(8);
    assert_eq!(q.pop(), None);
    assert_eq!(q.peek(), None);
    assert_eq!(q.len(), 0);
}
