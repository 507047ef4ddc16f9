//! Secondary-core startup and boot-time wait tests

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;

use crate::errno::{EINVAL, EIO, ETIMEDOUT};
use crate::lcpu::{
    LcpuRegistry, LCPU_STATE_BUSY0, LCPU_STATE_HALTED, LCPU_STATE_IDLE, LCPU_STATE_INIT,
    LCPU_STATE_OFFLINE,
};
use crate::mock::{self, smp_setup, wait_until, StartBehavior};

#[test]
fn start_and_wait_until_idle() {
    let (_platform, registry) = smp_setup(2);

    let started = registry
        .lcpu_start(None, &[0x1000, 0x2000], &[None, None])
        .unwrap();
    assert_eq!(started, 2);

    registry.lcpu_wait(None, 5_000_000_000).unwrap();
    assert_eq!(registry.get(1).unwrap().state(), LCPU_STATE_IDLE);
    assert_eq!(registry.get(2).unwrap().state(), LCPU_STATE_IDLE);
}

#[test]
fn restart_of_online_core_is_skipped() {
    let (_platform, registry) = smp_setup(1);

    assert_eq!(registry.lcpu_start(None, &[0x1000], &[None]).unwrap(), 1);
    registry.lcpu_wait(None, 5_000_000_000).unwrap();

    // The core is no longer OFFLINE; a second start warns and does nothing.
    assert_eq!(registry.lcpu_start(None, &[0x1000], &[None]).unwrap(), 0);
    assert_eq!(registry.get(1).unwrap().state(), LCPU_STATE_IDLE);
}

#[test]
fn missing_stack_slot_is_einval_and_leaves_target_startable() {
    let (platform, registry) = smp_setup(1);
    platform.set_start_behavior(StartBehavior::Ignore);

    assert_eq!(registry.lcpu_start(None, &[], &[]), Err(EINVAL));

    // The argument error must not claim the target; a corrected retry has
    // to find it OFFLINE and issue the start sequence.
    assert_eq!(registry.get(1).unwrap().state(), LCPU_STATE_OFFLINE);
    assert_eq!(registry.lcpu_start(None, &[0x1000], &[None]).unwrap(), 1);
    assert_eq!(registry.get(1).unwrap().state(), LCPU_STATE_INIT);
}

#[test]
fn explicit_list_reserves_slot_for_executing_core() {
    let (platform, registry) = smp_setup(1);
    platform.set_start_behavior(StartBehavior::Ignore);

    // The BSP is named in the list, so its slot is consumed even though it
    // is skipped; one stack is not enough for the secondary at slot 1.
    assert_eq!(
        registry.lcpu_start(Some(&[0, 1]), &[0x1000], &[None]),
        Err(EINVAL)
    );
}

#[test]
fn explicit_list_with_full_slots_starts_remainder() {
    let (platform, registry) = smp_setup(1);
    platform.set_start_behavior(StartBehavior::Ignore);

    let started = registry
        .lcpu_start(Some(&[0, 1]), &[0xAAAA, 0xBBBB], &[None, None])
        .unwrap();
    assert_eq!(started, 1);
    assert_eq!(registry.get(1).unwrap().state(), LCPU_STATE_INIT);
}

#[test]
fn failed_start_sequence_halts_target() {
    let (platform, registry) = smp_setup(1);
    platform.set_start_behavior(StartBehavior::Fail(EIO));

    assert_eq!(registry.lcpu_start(None, &[0x1000], &[None]), Err(EIO));

    let lcpu = registry.get(1).unwrap();
    assert_eq!(lcpu.state(), LCPU_STATE_HALTED);
    assert_eq!(lcpu.halt_code(), Some(EIO));

    // Halted cores are not waited for.
    registry.lcpu_wait(None, 0).unwrap();
}

#[test]
fn wait_times_out_on_stuck_core() {
    let (platform, registry) = smp_setup(1);
    platform.set_start_behavior(StartBehavior::Ignore);

    assert_eq!(registry.lcpu_start(None, &[0x1000], &[None]).unwrap(), 1);
    assert_eq!(registry.get(1).unwrap().state(), LCPU_STATE_INIT);

    assert_eq!(registry.lcpu_wait(None, 50_000_000), Err(ETIMEDOUT));
}

#[test]
fn wait_ignores_offline_cores() {
    let (_platform, registry) = smp_setup(2);
    // Nothing started; an unbounded wait must still return.
    registry.lcpu_wait(None, 0).unwrap();
}

static ENTRY_HIT: AtomicBool = AtomicBool::new(false);

fn spin_entry() -> ! {
    ENTRY_HIT.store(true, Ordering::SeqCst);
    loop {
        std::thread::park();
    }
}

#[test]
fn started_core_jumps_to_entry() {
    let (_platform, registry) = smp_setup(1);

    registry
        .lcpu_start(None, &[0x1000], &[Some(spin_entry)])
        .unwrap();
    assert!(wait_until(|| ENTRY_HIT.load(Ordering::SeqCst)));

    // A core handed to an entry function never decrements to IDLE.
    assert_eq!(registry.get(1).unwrap().state(), LCPU_STATE_BUSY0);
    assert_eq!(registry.lcpu_wait(Some(&[1]), 50_000_000), Err(ETIMEDOUT));
}

static HALT_REGISTRY: OnceLock<&'static LcpuRegistry> = OnceLock::new();

fn halting_entry() -> ! {
    HALT_REGISTRY.get().unwrap().lcpu_halt(EIO)
}

#[test]
fn core_self_halt_records_error_code() {
    let (_platform, registry) = smp_setup(1);
    HALT_REGISTRY.set(registry).ok();

    registry
        .lcpu_start(None, &[0x1000], &[Some(halting_entry)])
        .unwrap();

    let lcpu = registry.get(1).unwrap();
    assert!(wait_until(|| lcpu.state() == LCPU_STATE_HALTED));
    assert_eq!(lcpu.halt_code(), Some(EIO));
    assert!(!lcpu.is_online());
}

#[test]
#[should_panic(expected = "secondary init from invalid state")]
fn secondary_init_from_offline_is_fatal() {
    let (_platform, registry) = smp_setup(1);
    mock::with_cpu(crate::mock::SECONDARY_ID_BASE, || {
        let _ = registry.lcpu_init();
    });
}
