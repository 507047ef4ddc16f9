//! Registry and BSP initialization tests

use crate::lcpu::LCPU_STATE_BUSY0;
use crate::mock::{self, bsp_setup, BSP_ID};

#[cfg(feature = "smp")]
use crate::errno::{EINVAL, ENOMEM, EPERM};
#[cfg(feature = "smp")]
use crate::lcpu::{LcpuConfig, LcpuRegistry, OversubPolicy, LCPU_ID_INVALID, MAX_LCPUS};
#[cfg(feature = "smp")]
use crate::mock::MockPlatform;
#[cfg(feature = "smp")]
use crate::mock::{bsp_setup_with, smp_setup, RUN_IRQ, SECONDARY_ID_BASE, WAKEUP_IRQ};

#[test]
fn bsp_init_claims_index_zero() {
    let (_platform, registry) = bsp_setup();

    assert_eq!(registry.count(), 1);
    let bsp = registry.bsp();
    assert_eq!(bsp.idx(), 0);
    assert_eq!(bsp.id(), BSP_ID);
    assert_eq!(bsp.state(), LCPU_STATE_BUSY0);
    assert!(bsp.is_online());
    assert!(registry.is_bsp(bsp));
}

#[test]
fn current_resolves_executing_core() {
    let (_platform, registry) = bsp_setup();

    assert_eq!(registry.current_id(), BSP_ID);
    assert_eq!(registry.current_idx(), 0);
    assert!(registry.is_bsp(registry.current()));
}

#[test]
#[should_panic(expected = "is not registered")]
fn current_unknown_core_is_fatal() {
    let (_platform, registry) = bsp_setup();
    mock::with_cpu(0xDEAD, || {
        registry.current();
    });
}

#[test]
#[should_panic(expected = "secondary init from invalid state")]
fn double_bsp_init_is_fatal() {
    let (_platform, registry) = bsp_setup();
    // The second init finds the BSP's block already past INIT.
    let _ = registry.lcpu_init();
}

#[test]
fn get_beyond_count_is_none() {
    let (_platform, registry) = bsp_setup();
    assert!(registry.get(0).is_some());
    assert!(registry.get(1).is_none());
}

#[cfg(feature = "smp")]
#[test]
fn bsp_init_refused_after_cpu_discovery() {
    let platform = MockPlatform::new();
    let registry: &'static LcpuRegistry =
        Box::leak(Box::new(LcpuRegistry::new(platform, LcpuConfig::default())));
    platform.attach_registry(registry);

    registry.alloc(SECONDARY_ID_BASE).unwrap();

    mock::set_current_cpu(BSP_ID);
    assert_eq!(registry.lcpu_init(), Err(EPERM));
}

#[cfg(feature = "smp")]
#[test]
fn alloc_assigns_dense_indices() {
    let (_platform, registry) = bsp_setup();

    let first = registry.alloc(SECONDARY_ID_BASE).unwrap();
    assert_eq!(first.idx(), 1);
    assert_eq!(first.id(), SECONDARY_ID_BASE);
    assert!(!first.is_online());

    let second = registry.alloc(SECONDARY_ID_BASE + 1).unwrap();
    assert_eq!(second.idx(), 2);
    assert_eq!(registry.count(), 3);

    // Unallocated blocks stay invisible and unnamed
    assert!(registry.get(3).is_none());
    assert_ne!(first.id(), LCPU_ID_INVALID);
}

#[cfg(feature = "smp")]
#[test]
fn alloc_exhaustion_is_enomem() {
    let (_platform, registry) = bsp_setup();

    for i in 0..(MAX_LCPUS as u64 - 1) {
        registry.alloc(SECONDARY_ID_BASE + i).unwrap();
    }
    assert_eq!(registry.count() as usize, MAX_LCPUS);
    assert!(matches!(registry.alloc(0x1234), Err(ENOMEM)));
}

#[cfg(feature = "smp")]
#[test]
fn mp_init_records_and_enables_vectors() {
    let (platform, registry) = smp_setup(1);

    registry.mp_init(RUN_IRQ, WAKEUP_IRQ).unwrap();
    assert_eq!(registry.run_irq(), RUN_IRQ);
    assert_eq!(registry.wakeup_irq(), WAKEUP_IRQ);

    let enabled = platform.enabled_irqs.lock().unwrap();
    assert!(enabled.contains(&RUN_IRQ));
    assert!(enabled.contains(&WAKEUP_IRQ));
}

#[cfg(feature = "smp")]
#[test]
fn mp_init_is_once() {
    let (_platform, registry) = smp_setup(1);

    registry.mp_init(RUN_IRQ, WAKEUP_IRQ).unwrap();
    assert_eq!(registry.mp_init(RUN_IRQ, WAKEUP_IRQ), Err(EPERM));
}

#[cfg(feature = "smp")]
#[test]
fn mp_init_rejects_shared_vector() {
    let (_platform, registry) = smp_setup(1);
    assert_eq!(registry.mp_init(RUN_IRQ, RUN_IRQ), Err(EINVAL));
}

#[cfg(feature = "smp")]
#[test]
fn oversized_target_list_is_clamped_by_default() {
    let (_platform, registry) = smp_setup(1);

    // Indices 2 and 3 exceed the discovered count; clamping drops them.
    // Index 1 is OFFLINE, so the wait returns immediately.
    assert_eq!(registry.lcpu_wait(Some(&[0, 1, 2, 3]), 0), Ok(()));
}

#[cfg(feature = "smp")]
#[test]
fn oversized_target_list_rejected_when_configured() {
    let (_platform, registry) = bsp_setup_with(LcpuConfig {
        oversub: OversubPolicy::Error,
    });
    registry.alloc(SECONDARY_ID_BASE).unwrap();

    assert_eq!(registry.lcpu_wait(Some(&[0, 1, 2, 3]), 0), Err(EINVAL));
}

#[cfg(feature = "smp")]
#[test]
fn invalid_target_index_is_einval() {
    let (_platform, registry) = smp_setup(1);
    assert_eq!(registry.lcpu_wait(Some(&[5]), 0), Err(EINVAL));
}
