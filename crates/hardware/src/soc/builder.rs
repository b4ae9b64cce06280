//! System construction and top-level `System` type.
//!
//! This module builds the complete memory system from configuration. It performs:
//! 1. **Store setup:** Creates the shared sparse store with the configured page geometry.
//! 2. **Device registration:** Registers the SCR block, memory windows and the cache stub.
//! 3. **Memory controller:** Creates the timed controller behind the bus fallback.
//! 4. **Forward path:** Resolves each new request to a device or the controller.

use crate::common::data::{Phase, ResponseStatus, SyncStatus};
use crate::common::error::{BusError, SimError, TransportError};
use crate::common::time::SimTime;
use crate::config::Config;
use crate::sim::event::{Event, EventQueue};
use crate::sim::session::{ExitStatus, Session};
use crate::sim::transaction::{TransactionArena, TxHandle, TxState};
use crate::soc::devices::{BusDevice, CacheStub, ControlStatus, DeviceContext, MemoryWindow};
use crate::soc::interconnect::{Bus, DeviceInfo, Dispatch};
use crate::soc::memory::{EngineContext, MemoryController, SparseMemory};
use crate::soc::traits::BackwardTransport;

/// Top-level system instance: store, bus, timed memory and session state.
#[derive(Debug)]
pub struct System {
    /// Shared paged store.
    pub store: SparseMemory,
    /// Device router.
    pub bus: Bus,
    /// Timed memory behind the bus fallback.
    pub controller: MemoryController,
    /// Finish latch and console of this run.
    pub session: Session,
}

impl System {
    /// Builds a system from configuration.
    ///
    /// Registers the SCR block (when enabled), one window per configured memory region
    /// (`MEM0`, `MEM1`, ...) and the cache stub (when configured).
    pub fn new(config: &Config) -> Result<Self, SimError> {
        config.validate()?;
        let store = SparseMemory::from_config(&config.memory)?;
        let mut bus = Bus::new(config.memory.fallback);
        let sys = &config.system;

        if sys.scr_enabled {
            bus.register(sys.scr_base, sys.scr_size, ControlStatus::new())?;
        }
        for (i, region) in sys.memories.iter().enumerate() {
            bus.register(
                region.base,
                region.size,
                MemoryWindow::new(format!("MEM{i}"), region.base),
            )?;
        }
        if let Some(cache) = &sys.cache {
            bus.register(cache.base, cache.size, CacheStub::new(cache.line_bytes))?;
        }

        let mut system = Self {
            store,
            bus,
            controller: MemoryController::from_config(config),
            session: Session::from_config(&config.general),
        };
        system.set_debug(config.general.debug);
        Ok(system)
    }

    /// Registers an additional device at `[base, base + size)`.
    pub fn register_device(
        &mut self,
        base: u64,
        size: u64,
        device: impl Into<BusDevice>,
    ) -> Result<(), BusError> {
        self.bus.register(base, size, device)
    }

    /// Returns the device claiming `addr`, if any.
    pub fn find_device(&self, addr: u64) -> Option<&BusDevice> {
        self.bus.find(addr)
    }

    /// Returns the device map in registration order.
    pub fn list_devices(&self) -> Vec<DeviceInfo> {
        self.bus.list()
    }

    /// Turns the debug trace of every component on or off.
    pub fn set_debug(&mut self, enabled: bool) {
        self.bus.set_debug(enabled);
        self.controller.log_mut().set_enabled(enabled);
    }

    /// Returns the exit status once the program has written a finish code.
    pub const fn exit_status(&self) -> Option<ExitStatus> {
        self.session.exit_status()
    }

    /// Forward path of the system socket.
    ///
    /// A `BeginReq` is first offered to the bus: a matching device services it at once and
    /// the call returns [`SyncStatus::Completed`]. Otherwise, and for every later phase, the
    /// call is handed to the memory controller.
    pub fn transport_fw(
        &mut self,
        handle: TxHandle,
        phase: Phase,
        now: SimTime,
        arena: &mut TransactionArena,
        events: &mut EventQueue,
        bw: &mut dyn BackwardTransport,
    ) -> Result<SyncStatus, TransportError> {
        if phase == Phase::BeginReq {
            let tx = arena.get_mut(handle)?;
            if tx.state() != TxState::Idle {
                let err = TransportError::ProtocolViolation {
                    handle,
                    phase,
                    state: tx.state(),
                };
                tracing::warn!("{err}");
                return Err(err);
            }
            let mut dev_ctx = DeviceContext {
                store: &mut self.store,
                session: &mut self.session,
            };
            let dispatch = if tx.is_read() {
                let addr = tx.address();
                self.bus.route_read(addr, tx.data_mut(), &mut dev_ctx)?
            } else {
                let (addr, data, byte_enable) = tx.write_parts();
                self.bus.route_write(addr, data, byte_enable, &mut dev_ctx)?
            };
            if dispatch == Dispatch::Completed {
                tx.set_issued_at(now);
                tx.set_response(ResponseStatus::Ok);
                tx.set_state(TxState::Completed);
                return Ok(SyncStatus::Completed);
            }
        }
        let mut ctx = EngineContext {
            arena,
            events,
            store: &mut self.store,
            session: &mut self.session,
            now,
        };
        self.controller.transport_fw(handle, phase, &mut ctx, bw)
    }

    /// Delivers a fired timer to the memory controller.
    pub fn handle_event(
        &mut self,
        event: Event,
        now: SimTime,
        arena: &mut TransactionArena,
        events: &mut EventQueue,
        bw: &mut dyn BackwardTransport,
    ) -> Result<(), TransportError> {
        let mut ctx = EngineContext {
            arena,
            events,
            store: &mut self.store,
            session: &mut self.session,
            now,
        };
        self.controller.handle_event(event, &mut ctx, bw)
    }
}
