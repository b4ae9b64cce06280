//! # Memory Controller Tests
//!
//! Drives the two-phase protocol engine directly and verifies:
//! 1. **Handshake:** Phase order, states and clock-aligned event times.
//! 2. **Ordering:** FIFO completion within a direction, independence across directions.
//! 3. **Backpressure:** Rejection at capacity without corrupting queued work.
//! 4. **Violations:** Out-of-order phases and mismatched events fail loudly.
//! 5. **Data path:** Byte enables, address errors and the finish/print words.

use memsim_core::common::constants::{
    BYTE_DISABLED, BYTE_ENABLED, FINISH_PASS, SCR_FINISH_OFFSET, SCR_PRINT_OFFSET,
};
use memsim_core::common::data::{Command, Phase, ResponseStatus, SyncStatus};
use memsim_core::common::error::{ArenaError, TransportError};
use memsim_core::common::time::SimTime;
use memsim_core::sim::event::{Event, EventKind};
use memsim_core::sim::session::ExitStatus;
use memsim_core::sim::transaction::{Transaction, TxHandle, TxState};
use memsim_core::soc::memory::{Delays, EngineContext, SparseMemory};
use pretty_assertions::assert_eq;
use rstest::rstest;

use crate::common::harness::{DEFAULT_DELAYS, DRAM_BASE, EngineRig, SCR_BASE};
use crate::common::mocks::MockRequester;

fn accept(rig: &mut EngineRig, tx: Transaction) -> TxHandle {
    let handle = rig.alloc(tx);
    assert_eq!(
        rig.send(handle, Phase::BeginReq),
        Ok(SyncStatus::Accepted)
    );
    handle
}

// ══════════════════════════════════════════════════════════
// 1. Handshake
// ══════════════════════════════════════════════════════════

#[test]
fn read_walks_all_four_phases() {
    let mut rig = EngineRig::new(32, DEFAULT_DELAYS);
    rig.store.load(DRAM_BASE, &[1, 2, 3, 4]).expect("in range");
    let h = accept(&mut rig, Transaction::read(DRAM_BASE, 4));

    assert_eq!(rig.port.calls, vec![(h, Phase::EndReq, SimTime::ZERO)]);
    let tx = rig.arena.get(h).expect("live");
    assert_eq!(tx.state(), TxState::RequestAcked);
    assert_eq!(tx.issued_at(), Some(SimTime::ZERO));
    assert_eq!(rig.ctrl.in_flight(Command::Read), 1);

    assert_eq!(rig.fire(), Some(SimTime(10)));
    let tx = rig.arena.get(h).expect("live");
    assert_eq!(tx.data(), &[1, 2, 3, 4]);
    assert_eq!(tx.state(), TxState::RequestAcked);
    assert_eq!(tx.response(), ResponseStatus::Incomplete);

    assert_eq!(rig.fire(), Some(SimTime(70)));
    assert_eq!(rig.port.responses(), vec![(h, SimTime(70))]);
    let tx = rig.arena.get(h).expect("live");
    assert_eq!(tx.state(), TxState::ResponseSent);
    assert_eq!(tx.response(), ResponseStatus::Ok);
    assert_eq!(rig.ctrl.in_flight(Command::Read), 0);

    assert_eq!(rig.send(h, Phase::EndResp), Ok(SyncStatus::Completed));
    assert_eq!(rig.arena.get(h).expect("live").state(), TxState::Completed);
    assert!(rig.events.is_empty());
}

#[test]
fn write_commits_at_data_phase_not_before() {
    let mut rig = EngineRig::new(32, DEFAULT_DELAYS);
    let h = accept(&mut rig, Transaction::write(DRAM_BASE, vec![9, 8, 7, 6]));
    assert!(!rig.store.is_allocated(DRAM_BASE));

    assert_eq!(rig.fire(), Some(SimTime::ZERO));
    assert_eq!(rig.store.read_u32(DRAM_BASE).expect("in range"), 0x0607_0809);
    assert_eq!(rig.fire(), Some(SimTime(50)));
    assert_eq!(rig.port.responses(), vec![(h, SimTime(50))]);
}

#[rstest]
#[case(0, 1, 6, 10, 70)]
#[case(25, 1, 6, 40, 100)]
#[case(25, 0, 0, 30, 30)]
#[case(30, 0, 5, 30, 80)]
#[case(3, 2, 2, 30, 50)]
fn events_fire_on_first_edge_after_delay(
    #[case] start: u64,
    #[case] done: u64,
    #[case] ack: u64,
    #[case] data_at: u64,
    #[case] resp_at: u64,
) {
    let delays = Delays {
        read_done: done,
        read_ack: ack,
        ..DEFAULT_DELAYS
    };
    let mut rig = EngineRig::new(32, delays);
    rig.now = SimTime(start);
    let h = accept(&mut rig, Transaction::read(DRAM_BASE, 8));
    assert_eq!(rig.fire(), Some(SimTime(data_at)));
    assert_eq!(rig.fire(), Some(SimTime(resp_at)));
    assert_eq!(rig.port.responses(), vec![(h, SimTime(resp_at))]);
}

#[test]
fn delays_can_be_changed_between_requests() {
    let mut rig = EngineRig::new(32, DEFAULT_DELAYS);
    rig.ctrl.set_read_done_delay(3);
    rig.ctrl.set_read_ack_delay(1);
    rig.ctrl.set_write_done_delay(2);
    rig.ctrl.set_write_ack_delay(2);
    assert_eq!(
        rig.ctrl.delays(),
        Delays {
            read_done: 3,
            read_ack: 1,
            write_done: 2,
            write_ack: 2,
        }
    );
    let _ = accept(&mut rig, Transaction::read(DRAM_BASE, 4));
    assert_eq!(rig.fire(), Some(SimTime(30)));
    assert_eq!(rig.fire(), Some(SimTime(40)));
}

// ══════════════════════════════════════════════════════════
// 2. Ordering
// ══════════════════════════════════════════════════════════

#[test]
fn reads_complete_in_acceptance_order() {
    let mut rig = EngineRig::new(32, DEFAULT_DELAYS);
    for i in 0..3u8 {
        rig.store
            .load(DRAM_BASE + u64::from(i) * 8, &[i + 1; 8])
            .expect("in range");
    }
    let hs: Vec<TxHandle> = (0..3)
        .map(|i| accept(&mut rig, Transaction::read(DRAM_BASE + i * 8, 8)))
        .collect();
    rig.drain();

    let order: Vec<TxHandle> = rig.port.responses().iter().map(|&(h, _)| h).collect();
    assert_eq!(order, hs);
    for (i, &h) in hs.iter().enumerate() {
        assert_eq!(rig.arena.get(h).expect("live").data(), &[i as u8 + 1; 8]);
    }
}

#[test]
fn directions_progress_independently() {
    let mut rig = EngineRig::new(32, DEFAULT_DELAYS);
    let read = accept(&mut rig, Transaction::read(DRAM_BASE, 4));
    let write = accept(&mut rig, Transaction::write(DRAM_BASE + 0x100, vec![1; 4]));
    assert_eq!(rig.ctrl.in_flight(Command::Read), 1);
    assert_eq!(rig.ctrl.in_flight(Command::Write), 1);
    rig.drain();
    assert_eq!(
        rig.port.responses(),
        vec![(write, SimTime(50)), (read, SimTime(70))]
    );
}

#[test]
fn request_arriving_later_never_overtakes() {
    let mut rig = EngineRig::new(32, DEFAULT_DELAYS);
    let first = accept(&mut rig, Transaction::read(DRAM_BASE, 4));
    rig.now = SimTime(5);
    let second = accept(&mut rig, Transaction::read(DRAM_BASE + 4, 4));
    rig.drain();
    assert_eq!(
        rig.port.responses(),
        vec![(first, SimTime(70)), (second, SimTime(80))]
    );
}

#[test]
fn shorter_done_delay_waits_for_queued_request() {
    let mut rig = EngineRig::new(32, DEFAULT_DELAYS);
    rig.ctrl.set_read_done_delay(5);
    let slow = accept(&mut rig, Transaction::read(DRAM_BASE, 4));
    rig.ctrl.set_read_done_delay(1);
    let fast = accept(&mut rig, Transaction::read(DRAM_BASE + 4, 4));

    assert_eq!(rig.events.peek_time(), Some(SimTime(50)));
    rig.drain();
    assert_eq!(
        rig.port.responses(),
        vec![(slow, SimTime(110)), (fast, SimTime(110))]
    );
    assert_eq!(rig.ctrl.in_flight(Command::Read), 0);
}

#[test]
fn shorter_ack_delay_waits_for_queued_response() {
    let mut rig = EngineRig::new(32, DEFAULT_DELAYS);
    let first = accept(&mut rig, Transaction::write(DRAM_BASE, vec![1; 4]));
    rig.now = SimTime(10);
    let second = accept(&mut rig, Transaction::write(DRAM_BASE + 4, vec![2; 4]));

    // First data phase at 0 arms its response for 50.
    assert_eq!(rig.fire(), Some(SimTime::ZERO));
    rig.ctrl.set_write_ack_delay(1);
    rig.drain();
    assert_eq!(
        rig.port.responses(),
        vec![(first, SimTime(50)), (second, SimTime(50))]
    );
}

// ══════════════════════════════════════════════════════════
// 3. Backpressure
// ══════════════════════════════════════════════════════════

#[test]
fn full_direction_rejects_without_side_effects() {
    let mut rig = EngineRig::new(4, DEFAULT_DELAYS);
    assert_eq!(rig.ctrl.max_in_flight(), 3);
    let hs: Vec<TxHandle> = (0..3)
        .map(|i| accept(&mut rig, Transaction::read(DRAM_BASE + i * 4, 4)))
        .collect();

    let extra = rig.alloc(Transaction::read(DRAM_BASE + 12, 4));
    assert_eq!(
        rig.send(extra, Phase::BeginReq),
        Err(TransportError::BufferFull {
            command: Command::Read
        })
    );
    let tx = rig.arena.get(extra).expect("still live");
    assert_eq!(tx.state(), TxState::Idle);
    assert_eq!(tx.issued_at(), None);
    assert_eq!(rig.port.calls.len(), 3);
    assert_eq!(rig.events.len(), 3);

    // Writes have their own queues.
    let _ = accept(&mut rig, Transaction::write(DRAM_BASE + 0x100, vec![0; 4]));

    while rig.ctrl.in_flight(Command::Read) == 3 {
        let _ = rig.fire();
    }
    assert_eq!(rig.send(extra, Phase::BeginReq), Ok(SyncStatus::Accepted));
    rig.drain();

    let reads: Vec<TxHandle> = rig
        .port
        .responses()
        .iter()
        .map(|&(h, _)| h)
        .filter(|h| rig.arena.get(*h).is_ok_and(Transaction::is_read))
        .collect();
    let mut expected = hs;
    expected.push(extra);
    assert_eq!(reads, expected);
}

// ══════════════════════════════════════════════════════════
// 4. Violations
// ══════════════════════════════════════════════════════════

#[test]
fn end_resp_before_response_is_a_violation() {
    let mut rig = EngineRig::new(32, DEFAULT_DELAYS);
    let h = accept(&mut rig, Transaction::read(DRAM_BASE, 4));
    assert_eq!(
        rig.send(h, Phase::EndResp),
        Err(TransportError::ProtocolViolation {
            handle: h,
            phase: Phase::EndResp,
            state: TxState::RequestAcked,
        })
    );
}

#[test]
fn begin_req_twice_is_a_violation() {
    let mut rig = EngineRig::new(32, DEFAULT_DELAYS);
    let h = accept(&mut rig, Transaction::read(DRAM_BASE, 4));
    assert_eq!(
        rig.send(h, Phase::BeginReq),
        Err(TransportError::ProtocolViolation {
            handle: h,
            phase: Phase::BeginReq,
            state: TxState::RequestAcked,
        })
    );
    assert_eq!(rig.ctrl.in_flight(Command::Read), 1);
}

#[rstest]
#[case(Phase::EndReq)]
#[case(Phase::BeginResp)]
fn backward_phases_are_rejected_on_forward_path(#[case] phase: Phase) {
    let mut rig = EngineRig::new(32, DEFAULT_DELAYS);
    let h = rig.alloc(Transaction::read(DRAM_BASE, 4));
    assert_eq!(
        rig.send(h, phase),
        Err(TransportError::ProtocolViolation {
            handle: h,
            phase,
            state: TxState::Idle,
        })
    );
}

#[test]
fn end_resp_after_completion_is_a_violation() {
    let mut rig = EngineRig::new(32, DEFAULT_DELAYS);
    let h = accept(&mut rig, Transaction::read(DRAM_BASE, 4));
    rig.drain();
    assert_eq!(rig.send(h, Phase::EndResp), Ok(SyncStatus::Completed));
    assert!(matches!(
        rig.send(h, Phase::EndResp),
        Err(TransportError::ProtocolViolation {
            state: TxState::Completed,
            ..
        })
    ));
}

#[test]
fn event_for_non_front_handle_is_an_order_violation() {
    let mut rig = EngineRig::new(32, DEFAULT_DELAYS);
    let first = accept(&mut rig, Transaction::read(DRAM_BASE, 4));
    let second = accept(&mut rig, Transaction::read(DRAM_BASE + 4, 4));
    assert_eq!(
        rig.deliver(Event {
            kind: EventKind::ReadDone,
            handle: second,
        }),
        Err(TransportError::OrderViolation {
            expected: second,
            found: Some(first),
        })
    );
    assert_eq!(
        rig.deliver(Event {
            kind: EventKind::ReadAck,
            handle: first,
        }),
        Err(TransportError::OrderViolation {
            expected: first,
            found: None,
        })
    );

    // Queues are untouched; the armed events still complete normally.
    rig.drain();
    let order: Vec<TxHandle> = rig.port.responses().iter().map(|&(h, _)| h).collect();
    assert_eq!(order, vec![first, second]);
}

#[test]
fn retired_handle_is_stale() {
    let mut rig = EngineRig::new(32, DEFAULT_DELAYS);
    let h = rig.alloc(Transaction::read(DRAM_BASE, 4));
    let _ = rig.arena.release(h).expect("live");
    assert_eq!(
        rig.send(h, Phase::BeginReq),
        Err(TransportError::Arena(ArenaError::StaleHandle(h)))
    );
}

// ══════════════════════════════════════════════════════════
// 5. Data path
// ══════════════════════════════════════════════════════════

#[test]
fn write_honours_byte_enables() {
    let mut rig = EngineRig::new(32, DEFAULT_DELAYS);
    rig.store.load(DRAM_BASE, &[0x11; 4]).expect("in range");
    let _ = accept(
        &mut rig,
        Transaction::write(DRAM_BASE, vec![0xAA, 0xBB, 0xCC, 0xDD])
            .with_byte_enable(vec![BYTE_ENABLED, BYTE_DISABLED, BYTE_ENABLED, BYTE_DISABLED]),
    );
    rig.drain();
    let mut buf = [0u8; 4];
    rig.store.read(DRAM_BASE, &mut buf).expect("in range");
    assert_eq!(buf, [0xAA, 0x11, 0xCC, 0x11]);
}

#[test]
fn out_of_range_access_still_responds_with_error() {
    let store = SparseMemory::new(12, 4).expect("valid geometry");
    let mut rig = EngineRig::with_store(32, DEFAULT_DELAYS, store);
    let h = accept(&mut rig, Transaction::read(0x1_0000, 4));
    rig.drain();
    assert_eq!(rig.port.responses(), vec![(h, SimTime(70))]);
    let tx = rig.arena.get(h).expect("live");
    assert_eq!(tx.response(), ResponseStatus::AddressError);
    assert_eq!(tx.state(), TxState::ResponseSent);
}

#[test]
fn finish_word_is_honoured_without_the_register_block() {
    let mut rig = EngineRig::new(32, DEFAULT_DELAYS);
    let _ = accept(
        &mut rig,
        Transaction::write(SCR_BASE + SCR_FINISH_OFFSET, FINISH_PASS.to_le_bytes().to_vec()),
    );
    assert!(!rig.session.is_finished());
    rig.drain();
    assert_eq!(rig.session.exit_status(), Some(ExitStatus::Pass));
}

#[test]
fn finish_word_ignores_disabled_lanes() {
    let mut rig = EngineRig::new(32, DEFAULT_DELAYS);
    let _ = accept(
        &mut rig,
        Transaction::write(SCR_BASE + SCR_FINISH_OFFSET, vec![0x55, 0x55, 0x12, 0x34])
            .with_byte_enable(vec![BYTE_ENABLED, BYTE_ENABLED, BYTE_DISABLED, BYTE_DISABLED]),
    );
    rig.drain();
    assert_eq!(rig.session.exit_status(), Some(ExitStatus::Pass));
}

#[test]
fn print_word_reaches_the_console() {
    let mut rig = EngineRig::new(32, DEFAULT_DELAYS);
    for &c in b"hi" {
        let _ = accept(
            &mut rig,
            Transaction::write(SCR_BASE + SCR_PRINT_OFFSET, vec![c, 0, 0, 0]),
        );
    }
    rig.drain();
    assert_eq!(rig.session.console(), b"hi");
}

// ══════════════════════════════════════════════════════════
// 6. Requester contract
// ══════════════════════════════════════════════════════════

#[test]
fn requester_can_complete_response_in_line() {
    let mut rig = EngineRig::new(32, DEFAULT_DELAYS);
    let h = rig.alloc(Transaction::read(DRAM_BASE, 4));

    let mut requester = MockRequester::new();
    let _ = requester
        .expect_nb_transport_bw()
        .withf(move |handle, phase, now| {
            *handle == h && *phase == Phase::EndReq && *now == SimTime::ZERO
        })
        .times(1)
        .return_const(SyncStatus::Accepted);
    let _ = requester
        .expect_nb_transport_bw()
        .withf(move |handle, phase, now| {
            *handle == h && *phase == Phase::BeginResp && *now == SimTime(70)
        })
        .times(1)
        .return_const(SyncStatus::Completed);

    assert_eq!(
        rig.send_via(h, Phase::BeginReq, &mut requester),
        Ok(SyncStatus::Accepted)
    );
    while let Some((at, event)) = rig.events.pop() {
        let mut ctx = EngineContext {
            arena: &mut rig.arena,
            events: &mut rig.events,
            store: &mut rig.store,
            session: &mut rig.session,
            now: at,
        };
        rig.ctrl
            .handle_event(event, &mut ctx, &mut requester)
            .expect("serviced");
    }
    assert_eq!(rig.arena.get(h).expect("live").state(), TxState::Completed);
    requester.checkpoint();
}
