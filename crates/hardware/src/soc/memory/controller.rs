//! Timing-aware memory controller.
//!
//! The controller is the target behind the bus fallback. It runs the two-phase handshake for
//! every transaction it accepts:
//! 1. **Request:** `BeginReq` is answered with `EndReq` at the same instant; the handle
//!    enters the pending queue of its direction and a `*Done` timer is armed.
//! 2. **Data:** When `*Done` fires, the front of the pending queue is read from or written
//!    to the shared store, moved to the acknowledged queue, and a `*Ack` timer is armed.
//! 3. **Response:** When `*Ack` fires, the front of the acknowledged queue receives
//!    `BeginResp` with an `Ok` status.
//! 4. **Retire:** The requester's `EndResp` completes the transaction.
//!
//! Reads and writes are independent streams with their own queues and delays. Within one
//! stream, queue order is completion order.

use crate::common::constants::{SCR_FINISH_OFFSET, SCR_PRINT_OFFSET};
use crate::common::data::{Command, Phase, ResponseStatus, SyncStatus};
use crate::common::error::TransportError;
use crate::common::log::ComponentLog;
use crate::common::time::{Clock, SimTime};
use crate::config::{Config, MemoryConfig};
use crate::sim::event::{Event, EventKind, EventQueue};
use crate::sim::session::Session;
use crate::sim::transaction::{TransactionArena, TxHandle, TxState};
use crate::soc::memory::buffer::SparseMemory;
use crate::soc::memory::queue::TxQueue;
use crate::soc::traits::BackwardTransport;

/// The four per-direction delays, in clock cycles.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Delays {
    /// Read acceptance to store read.
    pub read_done: u64,
    /// Store read to read response.
    pub read_ack: u64,
    /// Write acceptance to store write.
    pub write_done: u64,
    /// Store write to write response.
    pub write_ack: u64,
}

impl Delays {
    /// Takes the delays from the memory configuration.
    pub const fn from_config(config: &MemoryConfig) -> Self {
        Self {
            read_done: config.read_done_delay,
            read_ack: config.read_ack_delay,
            write_done: config.write_done_delay,
            write_ack: config.write_ack_delay,
        }
    }
}

/// Everything the engine touches besides its own queues.
#[derive(Debug)]
pub struct EngineContext<'a> {
    /// Live transaction records.
    pub arena: &'a mut TransactionArena,
    /// Timer queue the engine arms.
    pub events: &'a mut EventQueue,
    /// Shared paged store.
    pub store: &'a mut SparseMemory,
    /// Finish latch and console.
    pub session: &'a mut Session,
    /// Current simulated time.
    pub now: SimTime,
}

/// Queues of one direction plus the latest due time armed for each of its two timers.
///
/// Due times never decrease within a queue, so each timer finds its own handle at the
/// front even after a delay is lowered at runtime.
#[derive(Debug)]
struct Stream {
    pending: TxQueue,
    acked: TxQueue,
    done_due: SimTime,
    ack_due: SimTime,
}

impl Stream {
    fn new(capacity: usize) -> Self {
        Self {
            pending: TxQueue::new(capacity),
            acked: TxQueue::new(capacity),
            done_due: SimTime::ZERO,
            ack_due: SimTime::ZERO,
        }
    }

    const fn in_flight(&self) -> usize {
        self.pending.len() + self.acked.len()
    }
}

/// Pops the front of `queue`, which must be `handle`.
///
/// On mismatch the queue is left unchanged.
fn pop_front(queue: &mut TxQueue, handle: TxHandle) -> Result<(), TransportError> {
    match queue.peek() {
        Some(front) if front == handle => {
            let _ = queue.pop();
            Ok(())
        }
        found => Err(TransportError::OrderViolation {
            expected: handle,
            found,
        }),
    }
}

/// Two-phase protocol engine in front of the paged store.
#[derive(Debug)]
pub struct MemoryController {
    reads: Stream,
    writes: Stream,
    delays: Delays,
    clock: Clock,
    finish_addr: u64,
    print_addr: u64,
    log: ComponentLog,
}

impl MemoryController {
    /// Creates a controller.
    ///
    /// # Arguments
    ///
    /// * `queue_capacity` - Slots per queue; each direction accepts at most
    ///   `queue_capacity - 1` in-flight transactions.
    /// * `delays` - Done and ack delays per direction, in cycles.
    /// * `clock` - Clock that every timer is aligned to.
    /// * `scr_base` - Base of the register block whose finish and print words the
    ///   controller also honours.
    pub fn new(queue_capacity: usize, delays: Delays, clock: Clock, scr_base: u64) -> Self {
        Self {
            reads: Stream::new(queue_capacity),
            writes: Stream::new(queue_capacity),
            delays,
            clock,
            finish_addr: scr_base.wrapping_add(SCR_FINISH_OFFSET),
            print_addr: scr_base.wrapping_add(SCR_PRINT_OFFSET),
            log: ComponentLog::new("memory"),
        }
    }

    /// Creates a controller from the full configuration.
    pub fn from_config(config: &Config) -> Self {
        let mut ctrl = Self::new(
            config.memory.queue_capacity,
            Delays::from_config(&config.memory),
            Clock::new(config.clock.period_ns),
            config.system.scr_base,
        );
        ctrl.log.set_enabled(config.general.debug);
        ctrl
    }

    /// Returns the configured delays.
    pub const fn delays(&self) -> Delays {
        self.delays
    }

    /// Sets the read acceptance-to-access delay.
    ///
    /// Applies to requests accepted from now on. A shorter delay never lets a new request
    /// overtake one already queued; it waits for the earlier request's timer instead.
    pub const fn set_read_done_delay(&mut self, cycles: u64) {
        self.delays.read_done = cycles;
    }

    /// Sets the read access-to-response delay.
    pub const fn set_read_ack_delay(&mut self, cycles: u64) {
        self.delays.read_ack = cycles;
    }

    /// Sets the write acceptance-to-access delay.
    pub const fn set_write_done_delay(&mut self, cycles: u64) {
        self.delays.write_done = cycles;
    }

    /// Sets the write access-to-response delay.
    pub const fn set_write_ack_delay(&mut self, cycles: u64) {
        self.delays.write_ack = cycles;
    }

    /// Returns the clock timers are aligned to.
    pub const fn clock(&self) -> Clock {
        self.clock
    }

    /// Returns the number of accepted, not yet responded transactions of one direction.
    pub const fn in_flight(&self, command: Command) -> usize {
        match command {
            Command::Read => self.reads.in_flight(),
            Command::Write => self.writes.in_flight(),
        }
    }

    /// Returns the most transactions one direction accepts at once.
    pub const fn max_in_flight(&self) -> usize {
        self.reads.pending.usable()
    }

    /// Returns the debug switch.
    pub const fn log_mut(&mut self) -> &mut ComponentLog {
        &mut self.log
    }

    /// Forward path of the socket.
    ///
    /// Accepts `BeginReq` and `EndResp`; any other phase, or a phase the transaction's state
    /// does not permit, is a protocol violation. A `BeginReq` that would overflow the
    /// direction's queues is rejected with [`TransportError::BufferFull`] and leaves the
    /// record untouched.
    pub fn transport_fw(
        &mut self,
        handle: TxHandle,
        phase: Phase,
        ctx: &mut EngineContext<'_>,
        bw: &mut dyn BackwardTransport,
    ) -> Result<SyncStatus, TransportError> {
        let result = match phase {
            Phase::BeginReq => self.begin_request(handle, ctx, bw),
            Phase::EndResp => self.end_response(handle, ctx),
            Phase::EndReq | Phase::BeginResp => Err(TransportError::ProtocolViolation {
                handle,
                phase,
                state: ctx.arena.get(handle)?.state(),
            }),
        };
        if let Err(err @ TransportError::ProtocolViolation { .. }) = &result {
            tracing::warn!(component = self.log.name(), "{err}");
        }
        result
    }

    fn begin_request(
        &mut self,
        handle: TxHandle,
        ctx: &mut EngineContext<'_>,
        bw: &mut dyn BackwardTransport,
    ) -> Result<SyncStatus, TransportError> {
        let now = ctx.now;
        let tx = ctx.arena.get_mut(handle)?;
        if tx.state() != TxState::Idle {
            return Err(TransportError::ProtocolViolation {
                handle,
                phase: Phase::BeginReq,
                state: tx.state(),
            });
        }
        let command = tx.command();
        let addr = tx.address();
        let limit = self.max_in_flight();
        let stream = match command {
            Command::Read => &mut self.reads,
            Command::Write => &mut self.writes,
        };
        if stream.in_flight() >= limit {
            if self.log.enabled() {
                tracing::debug!(
                    component = self.log.name(),
                    %handle,
                    %command,
                    "queue full, request rejected"
                );
            }
            return Err(TransportError::BufferFull { command });
        }
        stream.pending.push(handle)?;
        tx.set_state(TxState::Requested);
        tx.set_issued_at(now);

        let _ = bw.nb_transport_bw(handle, Phase::EndReq, now);
        tx.set_state(TxState::RequestAcked);

        let (kind, delay) = match command {
            Command::Read => (EventKind::ReadDone, self.delays.read_done),
            Command::Write => (EventKind::WriteDone, self.delays.write_done),
        };
        let at = self.clock.edge_after(now, delay).max(stream.done_due);
        stream.done_due = at;
        ctx.events.schedule(at, Event { kind, handle });
        if self.log.enabled() {
            tracing::debug!(
                component = self.log.name(),
                %handle,
                %command,
                addr = format_args!("{addr:#x}"),
                t = now.as_ns(),
                due = at.as_ns(),
                "BEGIN_REQ accepted, END_REQ sent"
            );
        }
        Ok(SyncStatus::Accepted)
    }

    fn end_response(
        &self,
        handle: TxHandle,
        ctx: &mut EngineContext<'_>,
    ) -> Result<SyncStatus, TransportError> {
        let tx = ctx.arena.get_mut(handle)?;
        if tx.state() != TxState::ResponseSent {
            return Err(TransportError::ProtocolViolation {
                handle,
                phase: Phase::EndResp,
                state: tx.state(),
            });
        }
        tx.set_state(TxState::Completed);
        if self.log.enabled() {
            tracing::debug!(
                component = self.log.name(),
                %handle,
                t = ctx.now.as_ns(),
                "END_RESP received"
            );
        }
        Ok(SyncStatus::Completed)
    }

    /// Services a timer armed by this controller.
    ///
    /// The event's handle must be at the front of the queue the timer drains; otherwise
    /// the queues have lost their ordering and [`TransportError::OrderViolation`] is
    /// returned without touching them.
    pub fn handle_event(
        &mut self,
        event: Event,
        ctx: &mut EngineContext<'_>,
        bw: &mut dyn BackwardTransport,
    ) -> Result<(), TransportError> {
        match event.kind {
            EventKind::ReadDone | EventKind::WriteDone => self.data_phase(event, ctx),
            EventKind::ReadAck | EventKind::WriteAck => self.response_phase(event, ctx, bw),
        }
    }

    fn data_phase(
        &mut self,
        event: Event,
        ctx: &mut EngineContext<'_>,
    ) -> Result<(), TransportError> {
        let handle = event.handle;
        let command = event.kind.command();
        let (finish_addr, print_addr) = (self.finish_addr, self.print_addr);
        let stream = match command {
            Command::Read => &mut self.reads,
            Command::Write => &mut self.writes,
        };
        pop_front(&mut stream.pending, handle)?;

        let tx = ctx.arena.get_mut(handle)?;
        let addr = tx.address();
        let access = match command {
            Command::Read => ctx.store.read(addr, tx.data_mut()),
            Command::Write => {
                let (addr, data, byte_enable) = tx.write_parts();
                if addr == finish_addr {
                    let _ = ctx.session.write_finish(data, byte_enable);
                } else if addr == print_addr {
                    ctx.session.write_print(data, byte_enable);
                }
                ctx.store.write(addr, data, byte_enable)
            }
        };
        if let Err(err) = access {
            tracing::warn!(component = self.log.name(), %handle, "{err}");
            tx.set_response(ResponseStatus::AddressError);
        }
        stream.acked.push(handle)?;

        let (kind, delay) = match command {
            Command::Read => (EventKind::ReadAck, self.delays.read_ack),
            Command::Write => (EventKind::WriteAck, self.delays.write_ack),
        };
        let at = self.clock.edge_after(ctx.now, delay).max(stream.ack_due);
        stream.ack_due = at;
        ctx.events.schedule(at, Event { kind, handle });
        if self.log.enabled() {
            tracing::debug!(
                component = self.log.name(),
                %handle,
                %command,
                addr = format_args!("{addr:#x}"),
                t = ctx.now.as_ns(),
                due = at.as_ns(),
                "data phase done"
            );
        }
        Ok(())
    }

    fn response_phase(
        &mut self,
        event: Event,
        ctx: &mut EngineContext<'_>,
        bw: &mut dyn BackwardTransport,
    ) -> Result<(), TransportError> {
        let handle = event.handle;
        let stream = match event.kind.command() {
            Command::Read => &mut self.reads,
            Command::Write => &mut self.writes,
        };
        pop_front(&mut stream.acked, handle)?;

        let tx = ctx.arena.get_mut(handle)?;
        if tx.response() == ResponseStatus::Incomplete {
            tx.set_response(ResponseStatus::Ok);
        }
        tx.set_state(TxState::ResponseSent);
        if self.log.enabled() {
            tracing::debug!(
                component = self.log.name(),
                %handle,
                t = ctx.now.as_ns(),
                "BEGIN_RESP sent"
            );
        }
        if bw.nb_transport_bw(handle, Phase::BeginResp, ctx.now) == SyncStatus::Completed {
            ctx.arena.get_mut(handle)?.set_state(TxState::Completed);
        }
        Ok(())
    }
}
