//! Clock Alignment Tests.
//!
//! Verifies that every computed instant lands on a rising edge at or after the
//! requested time.

use memsim_core::common::time::{Clock, SimTime};
use rstest::rstest;

#[test]
fn zero_period_is_clamped() {
    assert_eq!(Clock::new(0).period_ns(), 1);
}

#[test]
fn default_clock_is_100mhz() {
    assert_eq!(Clock::default().period_ns(), 10);
}

#[rstest]
#[case(0, 0)]
#[case(1, 10)]
#[case(9, 10)]
#[case(10, 10)]
#[case(11, 20)]
fn align_up_moves_to_next_edge(#[case] t: u64, #[case] expected: u64) {
    assert_eq!(Clock::new(10).align_up(SimTime(t)), SimTime(expected));
}

#[rstest]
#[case(0, 0, 0)]
#[case(0, 1, 10)]
#[case(25, 0, 30)]
#[case(25, 1, 40)]
#[case(30, 6, 90)]
fn edge_after_is_first_edge_past_delay(
    #[case] now: u64,
    #[case] cycles: u64,
    #[case] expected: u64,
) {
    let clock = Clock::new(10);
    let at = clock.edge_after(SimTime(now), cycles);
    assert_eq!(at, SimTime(expected));
    assert!(at.as_ns() >= now + cycles * 10);
    assert_eq!(at.as_ns() % 10, 0);
}

#[test]
fn edge_after_saturates() {
    let clock = Clock::new(10);
    let at = clock.edge_after(SimTime(u64::MAX - 5), 3);
    assert_eq!(at, SimTime(u64::MAX));
}

#[test]
fn since_saturates_at_zero() {
    assert_eq!(SimTime(50).since(SimTime(20)), 30);
    assert_eq!(SimTime(20).since(SimTime(50)), 0);
}

#[test]
fn display_in_nanoseconds() {
    assert_eq!((SimTime::ZERO + 120).to_string(), "120 ns");
}

#[test]
fn cycles_truncates() {
    assert_eq!(Clock::new(10).cycles(129), 12);
}
