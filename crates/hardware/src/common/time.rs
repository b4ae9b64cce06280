//! Simulated time and clock-edge alignment.
//!
//! Time is an integer count of nanoseconds. The [`Clock`] converts cycle counts into
//! absolute instants that always land on a rising edge, so a request arriving in the middle
//! of a cycle still completes on a cycle boundary.

use std::fmt;
use std::ops::Add;

/// An absolute simulated instant, in nanoseconds since simulation start.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SimTime(pub u64);

impl SimTime {
    /// Simulation start.
    pub const ZERO: Self = Self(0);

    /// Returns the raw nanosecond count.
    #[inline(always)]
    pub const fn as_ns(self) -> u64 {
        self.0
    }

    /// Returns the elapsed time from `earlier` to `self`, saturating at zero.
    pub const fn since(self, earlier: Self) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}

impl Add<u64> for SimTime {
    type Output = Self;

    fn add(self, ns: u64) -> Self {
        Self(self.0.saturating_add(ns))
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ns", self.0)
    }
}

/// Free-running clock with a fixed period.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Clock {
    period_ns: u64,
}

impl Clock {
    /// Creates a clock; a zero period is clamped to one nanosecond.
    pub const fn new(period_ns: u64) -> Self {
        Self {
            period_ns: if period_ns == 0 { 1 } else { period_ns },
        }
    }

    /// Returns the clock period in nanoseconds.
    pub const fn period_ns(&self) -> u64 {
        self.period_ns
    }

    /// Returns the first rising edge at or after `t`.
    pub const fn align_up(&self, t: SimTime) -> SimTime {
        let rem = t.0 % self.period_ns;
        if rem == 0 {
            t
        } else {
            SimTime(t.0.saturating_add(self.period_ns - rem))
        }
    }

    /// Returns the instant `cycles` clock periods after `now`, moved forward to the next edge.
    ///
    /// This is the firing time of every engine event: the first edge at or after
    /// `now + cycles * period`.
    pub const fn edge_after(&self, now: SimTime, cycles: u64) -> SimTime {
        let span = cycles.saturating_mul(self.period_ns);
        self.align_up(SimTime(now.0.saturating_add(span)))
    }

    /// Converts a duration in nanoseconds into whole elapsed cycles.
    pub const fn cycles(&self, ns: u64) -> u64 {
        ns / self.period_ns
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new(10)
    }
}
