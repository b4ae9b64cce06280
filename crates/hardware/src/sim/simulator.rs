//! Discrete-event simulator driving the memory system.
//!
//! The simulator owns the [`System`], the transaction arena, the event queue and the
//! requester side of the socket. It offers two ways to issue accesses:
//! 1. **Non-blocking:** `submit`/`begin` present a request, `step`/`run_*` advance time,
//!    `poll_response` yields responses in arrival order and `complete` retires them.
//! 2. **Blocking:** `load`/`store` run the whole handshake, stalling on backpressure by
//!    advancing simulated time until the engine frees a slot.

use std::collections::VecDeque;

use crate::common::data::{Phase, ResponseStatus, SyncStatus};
use crate::common::error::{ArenaError, SimError, TransportError};
use crate::common::time::SimTime;
use crate::config::Config;
use crate::sim::event::EventQueue;
use crate::sim::transaction::{Transaction, TransactionArena, TxExtension, TxHandle, TxState};
use crate::soc::builder::System;
use crate::soc::traits::BackwardTransport;
use crate::stats::TransactionStats;

/// Requester end of the socket.
///
/// Records `EndReq` arrivals and queues `BeginResp` arrivals until the owner polls them.
#[derive(Debug, Default)]
pub struct InitiatorPort {
    end_req: u64,
    responses: VecDeque<(TxHandle, SimTime)>,
}

impl InitiatorPort {
    /// Returns how many `EndReq` phases have arrived.
    pub const fn end_req_count(&self) -> u64 {
        self.end_req
    }

    /// Returns the number of responses not yet polled.
    pub fn pending_responses(&self) -> usize {
        self.responses.len()
    }

    fn forget(&mut self, handle: TxHandle) {
        self.responses.retain(|(h, _)| *h != handle);
    }
}

impl BackwardTransport for InitiatorPort {
    fn nb_transport_bw(&mut self, handle: TxHandle, phase: Phase, now: SimTime) -> SyncStatus {
        match phase {
            Phase::EndReq => self.end_req += 1,
            Phase::BeginResp => self.responses.push_back((handle, now)),
            Phase::BeginReq | Phase::EndResp => {
                tracing::warn!(%handle, %phase, "forward phase received on the backward path");
            }
        }
        SyncStatus::Accepted
    }
}

/// Event-driven simulator.
#[derive(Debug)]
pub struct Simulator {
    system: System,
    arena: TransactionArena,
    events: EventQueue,
    port: InitiatorPort,
    now: SimTime,
    stats: TransactionStats,
}

impl Simulator {
    /// Builds the system from configuration and wraps it in a simulator.
    pub fn new(config: &Config) -> Result<Self, SimError> {
        Ok(Self::with_system(System::new(config)?))
    }

    /// Wraps an already built system.
    pub fn with_system(system: System) -> Self {
        Self {
            system,
            arena: TransactionArena::new(),
            events: EventQueue::new(),
            port: InitiatorPort::default(),
            now: SimTime::ZERO,
            stats: TransactionStats::default(),
        }
    }

    /// Returns the current simulated time.
    pub const fn now(&self) -> SimTime {
        self.now
    }

    /// Returns the simulated system.
    pub const fn system(&self) -> &System {
        &self.system
    }

    /// Returns the simulated system for direct access (store setup, device registration).
    pub const fn system_mut(&mut self) -> &mut System {
        &mut self.system
    }

    /// Returns the statistics gathered so far.
    pub const fn stats(&self) -> &TransactionStats {
        &self.stats
    }

    /// Returns the requester port.
    pub const fn port(&self) -> &InitiatorPort {
        &self.port
    }

    /// Returns the number of armed timers.
    pub fn pending_events(&self) -> usize {
        self.events.len()
    }

    /// Returns the number of live transaction records.
    pub const fn live_transactions(&self) -> usize {
        self.arena.len()
    }

    /// Returns the record named by `handle`.
    pub fn transaction(&self, handle: TxHandle) -> Result<&Transaction, ArenaError> {
        self.arena.get(handle)
    }

    /// Stores a record without presenting it.
    pub fn alloc(&mut self, tx: Transaction) -> TxHandle {
        self.arena.alloc(tx)
    }

    /// Presents `BeginReq` for an allocated record.
    ///
    /// A [`TransportError::BufferFull`] rejection leaves the record idle; it may be
    /// presented again once time has advanced.
    pub fn begin(&mut self, handle: TxHandle) -> Result<SyncStatus, TransportError> {
        let command = self.arena.get(handle)?.command();
        let result = self.system.transport_fw(
            handle,
            Phase::BeginReq,
            self.now,
            &mut self.arena,
            &mut self.events,
            &mut self.port,
        );
        match &result {
            Ok(SyncStatus::Accepted) => self.stats.record_accept(command),
            Ok(SyncStatus::Completed) => self.stats.record_device(command),
            Err(TransportError::BufferFull { .. }) => self.stats.record_reject(command),
            Err(_) => {}
        }
        result
    }

    /// Allocates and presents a record in one call.
    ///
    /// On any error the record is released again.
    pub fn submit(&mut self, tx: Transaction) -> Result<(TxHandle, SyncStatus), SimError> {
        let handle = self.arena.alloc(tx);
        match self.begin(handle) {
            Ok(status) => Ok((handle, status)),
            Err(err) => {
                let _ = self.arena.release(handle)?;
                Err(err.into())
            }
        }
    }

    /// Fires the earliest armed timer, advancing time to it.
    ///
    /// Returns `false` when no timer is armed.
    pub fn step(&mut self) -> Result<bool, SimError> {
        let Some((at, event)) = self.events.pop() else {
            return Ok(false);
        };
        self.now = self.now.max(at);
        self.stats.sim_time_ns = self.now.as_ns();
        self.stats.events += 1;
        self.system.handle_event(
            event,
            self.now,
            &mut self.arena,
            &mut self.events,
            &mut self.port,
        )?;
        Ok(true)
    }

    /// Fires timers until none is armed.
    pub fn run_until_idle(&mut self) -> Result<(), SimError> {
        while self.step()? {}
        Ok(())
    }

    /// Fires every timer due at or before `limit`, then advances time to `limit`.
    pub fn run_until(&mut self, limit: SimTime) -> Result<(), SimError> {
        while self.events.peek_time().is_some_and(|t| t <= limit) {
            let _ = self.step()?;
        }
        self.now = self.now.max(limit);
        self.stats.sim_time_ns = self.now.as_ns();
        Ok(())
    }

    /// Returns the next transaction whose `BeginResp` has arrived, in arrival order.
    pub fn poll_response(&mut self) -> Option<TxHandle> {
        self.port.responses.pop_front().map(|(handle, _)| handle)
    }

    /// Sends `EndResp` (unless the transaction already completed in-line) and retires the
    /// record.
    pub fn complete(&mut self, handle: TxHandle) -> Result<Transaction, SimError> {
        if self.arena.get(handle)?.state() != TxState::Completed {
            let _ = self.system.transport_fw(
                handle,
                Phase::EndResp,
                self.now,
                &mut self.arena,
                &mut self.events,
                &mut self.port,
            )?;
        }
        self.port.forget(handle);
        let tx = self.arena.release(handle)?;
        let latency = tx.issued_at().map_or(0, |t| self.now.since(t));
        self.stats.record_completion(
            tx.command(),
            latency,
            tx.response() == ResponseStatus::Ok,
        );
        Ok(tx)
    }

    /// Blocking read of `len` bytes at `addr` on behalf of hart `core_id`.
    pub fn load(&mut self, core_id: usize, addr: u64, len: usize) -> Result<Vec<u8>, SimError> {
        let tx = Transaction::read(addr, len).with_extension(TxExtension { core_id });
        Ok(self.transact(tx)?.into_data())
    }

    /// Blocking write of `data` at `addr` on behalf of hart `core_id`.
    pub fn store(
        &mut self,
        core_id: usize,
        addr: u64,
        data: &[u8],
        byte_enable: Option<&[u8]>,
    ) -> Result<(), SimError> {
        let mut tx = Transaction::write(addr, data).with_extension(TxExtension { core_id });
        if let Some(mask) = byte_enable {
            tx = tx.with_byte_enable(mask);
        }
        let _ = self.transact(tx)?;
        Ok(())
    }

    fn transact(&mut self, tx: Transaction) -> Result<Transaction, SimError> {
        let command = tx.command();
        let addr = tx.address();
        let handle = self.arena.alloc(tx);
        if let Err(err) = self.drive(handle) {
            if self.arena.get(handle).is_ok_and(|t| t.state() == TxState::Idle) {
                let _ = self.arena.release(handle)?;
            }
            return Err(err);
        }
        let tx = self.complete(handle)?;
        if tx.response() != ResponseStatus::Ok {
            return Err(TransportError::AddressError { handle, addr }.into());
        }
        tracing::trace!(
            %handle,
            %command,
            addr = format_args!("{addr:#x}"),
            "blocking access done"
        );
        Ok(tx)
    }

    fn drive(&mut self, handle: TxHandle) -> Result<(), SimError> {
        if self.system.session.is_finished() {
            return Err(SimError::Finished { handle });
        }
        loop {
            match self.begin(handle) {
                Ok(SyncStatus::Completed) => return Ok(()),
                Ok(SyncStatus::Accepted) => break,
                Err(TransportError::BufferFull { .. }) => {
                    if !self.step()? {
                        return Err(SimError::Deadlock { handle });
                    }
                }
                Err(err) => return Err(err.into()),
            }
        }
        loop {
            match self.arena.get(handle)?.state() {
                TxState::ResponseSent | TxState::Completed => return Ok(()),
                _ => {
                    if !self.step()? {
                        return Err(SimError::Deadlock { handle });
                    }
                }
            }
        }
    }
}
