//! Transaction statistics collection and reporting.
//!
//! This module tracks what the memory system did during a run. It provides:
//! 1. **Throughput:** Accepted, completed and rejected transactions per direction.
//! 2. **Device traffic:** Accesses serviced at zero latency by bus devices.
//! 3. **Latency:** Total and worst-case request-to-completion time per direction.

use std::time::Instant;

use crate::common::data::Command;

/// Counters for one direction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DirectionStats {
    /// Requests accepted by the timed memory.
    pub accepted: u64,
    /// Requests rejected by backpressure (each retry counts).
    pub rejected: u64,
    /// Requests serviced synchronously by a bus device.
    pub device: u64,
    /// Transactions retired.
    pub completed: u64,
    /// Transactions that completed with an address error.
    pub errors: u64,
    /// Sum of request-to-retire latencies, in ns.
    pub latency_total_ns: u64,
    /// Worst request-to-retire latency, in ns.
    pub latency_max_ns: u64,
}

impl DirectionStats {
    /// Returns the mean request-to-retire latency in ns.
    pub fn latency_avg_ns(&self) -> f64 {
        if self.completed == 0 {
            0.0
        } else {
            self.latency_total_ns as f64 / self.completed as f64
        }
    }
}

/// Statistics for one simulation run.
#[derive(Clone, Debug)]
pub struct TransactionStats {
    start_time: Instant,
    /// Simulated time reached, in ns.
    pub sim_time_ns: u64,
    /// Timer events processed.
    pub events: u64,
    /// Read counters.
    pub reads: DirectionStats,
    /// Write counters.
    pub writes: DirectionStats,
}

impl Default for TransactionStats {
    fn default() -> Self {
        Self {
            start_time: Instant::now(),
            sim_time_ns: 0,
            events: 0,
            reads: DirectionStats::default(),
            writes: DirectionStats::default(),
        }
    }
}

impl TransactionStats {
    /// Returns the counters for one direction.
    pub const fn direction(&self, command: Command) -> &DirectionStats {
        match command {
            Command::Read => &self.reads,
            Command::Write => &self.writes,
        }
    }

    const fn direction_mut(&mut self, command: Command) -> &mut DirectionStats {
        match command {
            Command::Read => &mut self.reads,
            Command::Write => &mut self.writes,
        }
    }

    /// Counts a request accepted by the timed memory.
    pub const fn record_accept(&mut self, command: Command) {
        self.direction_mut(command).accepted += 1;
    }

    /// Counts a request rejected by backpressure.
    pub const fn record_reject(&mut self, command: Command) {
        self.direction_mut(command).rejected += 1;
    }

    /// Counts a request serviced by a bus device.
    pub const fn record_device(&mut self, command: Command) {
        self.direction_mut(command).device += 1;
    }

    /// Counts a retired transaction and its latency.
    pub fn record_completion(&mut self, command: Command, latency_ns: u64, ok: bool) {
        let dir = self.direction_mut(command);
        dir.completed += 1;
        dir.latency_total_ns += latency_ns;
        dir.latency_max_ns = dir.latency_max_ns.max(latency_ns);
        if !ok {
            dir.errors += 1;
        }
    }

    /// Prints the requested report sections (`summary`, `reads`, `writes`); all when empty.
    pub fn print_sections(&self, sections: &[String]) {
        let want = |s: &str| sections.is_empty() || sections.iter().any(|x| x == s);

        if want("summary") {
            let seconds = self.start_time.elapsed().as_secs_f64();
            let total = self.reads.completed + self.writes.completed;
            println!("\n==========================================================");
            println!("MEMORY TRANSACTION STATISTICS");
            println!("==========================================================");
            println!("host_seconds             {seconds:.4} s");
            println!("sim_time                 {} ns", self.sim_time_ns);
            println!("sim_events               {}", self.events);
            println!("sim_transactions         {total}");
            println!("----------------------------------------------------------");
        }
        for (name, dir) in [("reads", &self.reads), ("writes", &self.writes)] {
            if !want(name) {
                continue;
            }
            let row = |key: &str, value: String| {
                println!("  {:<22} {value}", format!("{name}.{key}"));
            };
            println!("{}", name.to_uppercase());
            row("accepted", dir.accepted.to_string());
            row("rejected", dir.rejected.to_string());
            row("device", dir.device.to_string());
            row("completed", dir.completed.to_string());
            row("errors", dir.errors.to_string());
            row("latency_avg", format!("{:.2} ns", dir.latency_avg_ns()));
            row("latency_max", format!("{} ns", dir.latency_max_ns));
            println!("----------------------------------------------------------");
        }
        println!("==========================================================");
    }

    /// Prints the full report.
    pub fn print(&self) {
        self.print_sections(&[]);
    }
}
