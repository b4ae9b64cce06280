//! # System Assembly Tests
//!
//! Verifies the device map built from configuration and the device/controller split of
//! the forward path.

use memsim_core::common::constants::{FINISH_PASS, SCR_FINISH_OFFSET};
use memsim_core::common::data::{Phase, ResponseStatus, SyncStatus};
use memsim_core::common::error::{BusError, ConfigError, SimError, TransportError};
use memsim_core::common::time::SimTime;
use memsim_core::config::{CacheConfig, RegionConfig};
use memsim_core::sim::event::EventQueue;
use memsim_core::sim::session::ExitStatus;
use memsim_core::sim::transaction::{Transaction, TransactionArena, TxState};
use memsim_core::soc::System;
use memsim_core::soc::devices::{CacheStub, Device};

use crate::common::harness::{DRAM_BASE, SCR_BASE, config_with};
use crate::common::mocks::RecordingPort;

#[test]
fn default_map_holds_only_the_register_block() {
    let system = System::new(&config_with(|_| {})).expect("default builds");
    let devices = system.list_devices();
    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0].name, "SCR");
    assert_eq!(devices[0].base, SCR_BASE);
    assert_eq!(devices[0].size, 0x1000);
    assert!(system.exit_status().is_none());
}

#[test]
fn register_block_can_be_left_off_the_bus() {
    let system =
        System::new(&config_with(|c| c.system.scr_enabled = false)).expect("builds");
    assert!(system.list_devices().is_empty());
}

#[test]
fn memories_and_cache_are_registered_in_order() {
    let config = config_with(|c| {
        c.system.memories = vec![
            RegionConfig {
                base: 0x1000_0000,
                size: 0x1000,
            },
            RegionConfig {
                base: 0x1001_0000,
                size: 0x1000,
            },
        ];
        c.system.cache = Some(CacheConfig {
            base: 0x2000_0000,
            size: 0x1_0000,
            line_bytes: 32,
        });
    });
    let system = System::new(&config).expect("builds");
    let names: Vec<String> = system.list_devices().into_iter().map(|d| d.name).collect();
    assert_eq!(names, ["SCR", "MEM0", "MEM1", "CACHE"]);
    let cache = system
        .find_device(0x2000_0010)
        .and_then(|d| d.as_cache())
        .expect("cache mapped");
    assert_eq!(cache.line_bytes(), 32);
    assert_eq!(
        system
            .find_device(0x1001_0000)
            .and_then(|d| d.as_memory())
            .map(|m| m.base()),
        Some(0x1001_0000)
    );
}

#[test]
fn overlapping_memory_fails_the_build() {
    let config = config_with(|c| {
        c.system.memories = vec![RegionConfig {
            base: SCR_BASE + 0x800,
            size: 0x1000,
        }];
    });
    let err = System::new(&config).unwrap_err();
    assert!(matches!(err, SimError::Bus(BusError::Overlap { .. })));
}

#[test]
fn invalid_config_fails_the_build() {
    let err = System::new(&config_with(|c| c.memory.queue_capacity = 6)).unwrap_err();
    assert!(matches!(
        err,
        SimError::Config(ConfigError::QueueCapacity(6))
    ));
}

#[test]
fn runtime_registration_goes_through_the_same_checks() {
    let mut system = System::new(&config_with(|_| {})).expect("builds");
    system
        .register_device(0x5000_0000, 0x100, CacheStub::new(16))
        .expect("free range");
    assert_eq!(
        system
            .find_device(0x5000_0000)
            .map(|d| d.name().to_owned()),
        Some("CACHE".to_owned())
    );
    assert!(matches!(
        system.register_device(0x5000_0080, 0x100, CacheStub::new(16)),
        Err(BusError::Overlap { .. })
    ));
}

#[test]
fn device_requests_complete_synchronously() {
    let mut system = System::new(&config_with(|_| {})).expect("builds");
    let mut arena = TransactionArena::new();
    let mut events = EventQueue::new();
    let mut port = RecordingPort::default();

    let h = arena.alloc(Transaction::write(
        SCR_BASE + SCR_FINISH_OFFSET,
        FINISH_PASS.to_le_bytes().to_vec(),
    ));
    let status = system.transport_fw(
        h,
        Phase::BeginReq,
        SimTime(40),
        &mut arena,
        &mut events,
        &mut port,
    );
    assert_eq!(status, Ok(SyncStatus::Completed));
    let tx = arena.get(h).expect("live");
    assert_eq!(tx.state(), TxState::Completed);
    assert_eq!(tx.response(), ResponseStatus::Ok);
    assert_eq!(tx.issued_at(), Some(SimTime(40)));
    assert!(events.is_empty());
    assert!(port.calls.is_empty());
    assert_eq!(system.exit_status(), Some(ExitStatus::Pass));
}

#[test]
fn unclaimed_requests_reach_the_controller() {
    let mut system = System::new(&config_with(|_| {})).expect("builds");
    let mut arena = TransactionArena::new();
    let mut events = EventQueue::new();
    let mut port = RecordingPort::default();

    let h = arena.alloc(Transaction::read(DRAM_BASE, 8));
    let status = system.transport_fw(
        h,
        Phase::BeginReq,
        SimTime::ZERO,
        &mut arena,
        &mut events,
        &mut port,
    );
    assert_eq!(status, Ok(SyncStatus::Accepted));
    assert_eq!(events.len(), 1);
    assert_eq!(port.calls, vec![(h, Phase::EndReq, SimTime::ZERO)]);

    let again = system.transport_fw(
        h,
        Phase::BeginReq,
        SimTime::ZERO,
        &mut arena,
        &mut events,
        &mut port,
    );
    assert!(matches!(
        again,
        Err(TransportError::ProtocolViolation {
            phase: Phase::BeginReq,
            state: TxState::RequestAcked,
            ..
        })
    ));

    while let Some((at, event)) = events.pop() {
        system
            .handle_event(event, at, &mut arena, &mut events, &mut port)
            .expect("serviced");
    }
    assert_eq!(arena.get(h).expect("live").state(), TxState::ResponseSent);
}
