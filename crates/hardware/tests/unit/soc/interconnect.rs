//! # Bus Routing Tests
//!
//! Verifies registration rules, address lookup and fallback dispatch.

use memsim_core::common::error::BusError;
use memsim_core::config::Fallback;
use memsim_core::sim::session::Session;
use memsim_core::soc::devices::{CacheStub, ControlStatus, DeviceContext, MemoryWindow};
use memsim_core::soc::interconnect::{Bus, DeviceInfo, Dispatch};
use memsim_core::soc::memory::SparseMemory;
use pretty_assertions::assert_eq;

fn parts() -> (SparseMemory, Session) {
    (
        SparseMemory::new(12, 36).expect("valid geometry"),
        Session::default(),
    )
}

// ══════════════════════════════════════════════════════════
// 1. Registration
// ══════════════════════════════════════════════════════════

#[test]
fn devices_are_listed_in_registration_order() {
    let mut bus = Bus::new(Fallback::TimedMemory);
    bus.register(0x3fff_b000, 0x1000, ControlStatus::new())
        .expect("register");
    bus.register(0x1000_0000, 0x1000, MemoryWindow::new("MEM0", 0x1000_0000))
        .expect("register");
    assert_eq!(bus.len(), 2);
    assert_eq!(
        bus.list(),
        vec![
            DeviceInfo {
                base: 0x3fff_b000,
                size: 0x1000,
                name: "SCR".to_owned(),
            },
            DeviceInfo {
                base: 0x1000_0000,
                size: 0x1000,
                name: "MEM0".to_owned(),
            },
        ]
    );
}

#[test]
fn overlapping_registration_is_rejected() {
    let mut bus = Bus::new(Fallback::TimedMemory);
    bus.register(0x1000, 0x1000, ControlStatus::new())
        .expect("register");
    let err = bus
        .register(0x1800, 0x1000, CacheStub::new(64))
        .unwrap_err();
    assert_eq!(
        err,
        BusError::Overlap {
            base: 0x1800,
            size: 0x1000,
            existing: "SCR".to_owned(),
        }
    );
    assert_eq!(bus.len(), 1);
}

#[test]
fn adjacent_ranges_do_not_overlap() {
    let mut bus = Bus::new(Fallback::TimedMemory);
    bus.register(0x1000, 0x1000, ControlStatus::new())
        .expect("register");
    bus.register(0x2000, 0x1000, CacheStub::new(64))
        .expect("adjacent register");
    bus.register(0x0, 0x1000, MemoryWindow::new("LOW", 0))
        .expect("adjacent register");
    assert_eq!(bus.len(), 3);
}

#[test]
fn zero_size_and_wrapping_ranges_are_rejected() {
    let mut bus = Bus::new(Fallback::TimedMemory);
    assert_eq!(
        bus.register(0x1000, 0, CacheStub::new(64)),
        Err(BusError::InvalidRange {
            base: 0x1000,
            size: 0
        })
    );
    assert_eq!(
        bus.register(u64::MAX, 2, CacheStub::new(64)),
        Err(BusError::InvalidRange {
            base: u64::MAX,
            size: 2
        })
    );
    bus.register(u64::MAX, 1, CacheStub::new(64))
        .expect("last byte of the address space");
    assert!(bus.find(u64::MAX).is_some());
}

// ══════════════════════════════════════════════════════════
// 2. Lookup and dispatch
// ══════════════════════════════════════════════════════════

#[test]
fn find_matches_half_open_range() {
    let mut bus = Bus::new(Fallback::TimedMemory);
    bus.register(0x2000_0000, 0x100, CacheStub::new(64))
        .expect("register");
    assert!(bus.find(0x1FFF_FFFF).is_none());
    assert!(bus.find(0x2000_0000).and_then(|d| d.as_cache()).is_some());
    assert!(bus.find(0x2000_00FF).is_some());
    assert!(bus.find(0x2000_0100).is_none());
}

#[test]
fn device_access_uses_relative_offset() {
    let (mut store, mut session) = parts();
    let mut bus = Bus::new(Fallback::TimedMemory);
    bus.register(0x2000_0000, 0x1000, CacheStub::new(64))
        .expect("register");
    let mut ctx = DeviceContext {
        store: &mut store,
        session: &mut session,
    };
    let dispatch = bus
        .route_write(0x2000_0040, &[7; 4], None, &mut ctx)
        .expect("routed");
    assert_eq!(dispatch, Dispatch::Completed);
    let cache = bus
        .find(0x2000_0000)
        .and_then(|d| d.as_cache())
        .expect("cache registered");
    assert!(cache.is_valid(0x40));
    assert!(!cache.is_valid(0x0));
}

#[test]
fn timed_fallback_forwards_unclaimed_access() {
    let (mut store, mut session) = parts();
    let mut bus = Bus::new(Fallback::TimedMemory);
    let mut ctx = DeviceContext {
        store: &mut store,
        session: &mut session,
    };
    let mut buf = [0u8; 4];
    assert_eq!(
        bus.route_read(0x8000_0000, &mut buf, &mut ctx),
        Ok(Dispatch::Forward)
    );
    assert_eq!(store.allocated_pages(), 0);
}

#[test]
fn store_fallback_completes_immediately() {
    let (mut store, mut session) = parts();
    let mut bus = Bus::new(Fallback::Store);
    let mut ctx = DeviceContext {
        store: &mut store,
        session: &mut session,
    };
    assert_eq!(
        bus.route_write(0x8000_0000, &[1, 2, 3, 4], None, &mut ctx),
        Ok(Dispatch::Completed)
    );
    let mut buf = [0u8; 4];
    assert_eq!(
        bus.route_read(0x8000_0000, &mut buf, &mut ctx),
        Ok(Dispatch::Completed)
    );
    assert_eq!(buf, [1, 2, 3, 4]);
}

#[test]
fn no_fallback_reports_unmapped() {
    let (mut store, mut session) = parts();
    let mut bus = Bus::new(Fallback::TimedMemory);
    bus.set_fallback(Fallback::None);
    assert_eq!(bus.fallback(), Fallback::None);
    let mut ctx = DeviceContext {
        store: &mut store,
        session: &mut session,
    };
    let mut buf = [0u8; 4];
    assert_eq!(
        bus.route_read(0x8000_0000, &mut buf, &mut ctx),
        Err(BusError::Unmapped { addr: 0x8000_0000 })
    );
}
