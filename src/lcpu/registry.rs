//! LCPU registry
//!
//! The registry is an explicit context struct rather than process-global
//! state, so a test binary can hold several independent instances. The
//! embedding kernel typically creates one at boot and leaks it to `'static`.

use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use alloc::boxed::Box;
use alloc::vec::Vec;

use crate::errno::{EINVAL, KernResult};
#[cfg(feature = "smp")]
use crate::errno::{ENOMEM, EPERM};

#[cfg(feature = "smp")]
use super::platform::IrqTrigger;
use super::platform::LcpuPlatform;
use super::types::Lcpu;
use super::{LcpuId, LcpuIdx, MAX_LCPUS};

/// Policy for target lists longer than the discovered core count.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OversubPolicy {
    /// Truncate to the discovered count with a warning.
    Clamp,
    /// Reject the request with `EINVAL`.
    Error,
}

#[derive(Clone, Copy, Debug)]
pub struct LcpuConfig {
    pub oversub: OversubPolicy,
}

impl Default for LcpuConfig {
    fn default() -> Self {
        Self {
            oversub: OversubPolicy::Clamp,
        }
    }
}

pub struct LcpuRegistry {
    lcpus: Box<[Lcpu]>,
    /// Number of allocated LCPUs; [1, MAX_LCPUS] after discovery.
    count: AtomicU32,
    pub(super) platform: &'static dyn LcpuPlatform,
    pub(super) run_irq: AtomicU32,
    pub(super) wakeup_irq: AtomicU32,
    pub(super) mp_ready: AtomicBool,
    oversub: OversubPolicy,
}

impl LcpuRegistry {
    pub fn new(platform: &'static dyn LcpuPlatform, config: LcpuConfig) -> Self {
        let mut lcpus = Vec::with_capacity(MAX_LCPUS);
        lcpus.resize_with(MAX_LCPUS, Lcpu::new);

        Self {
            lcpus: lcpus.into_boxed_slice(),
            count: AtomicU32::new(1),
            platform,
            run_irq: AtomicU32::new(0),
            wakeup_irq: AtomicU32::new(0),
            mp_ready: AtomicBool::new(false),
            oversub: config.oversub,
        }
    }

    /// Number of allocated logical CPUs.
    pub fn count(&self) -> u32 {
        self.count.load(Ordering::SeqCst)
    }

    pub fn get(&self, idx: LcpuIdx) -> Option<&Lcpu> {
        if idx >= self.count() {
            return None;
        }
        Some(&self.lcpus[idx as usize])
    }

    /// The bootstrap processor is always index 0.
    pub fn bsp(&self) -> &Lcpu {
        &self.lcpus[0]
    }

    pub fn is_bsp(&self, lcpu: &Lcpu) -> bool {
        core::ptr::eq(lcpu, self.bsp())
    }

    pub(super) fn find_by_id(&self, id: LcpuId) -> Option<&Lcpu> {
        let n = self.count() as usize;
        self.lcpus[..n].iter().find(|lcpu| lcpu.id() == id)
    }

    /// Control block of the core executing this call. The core must have
    /// been allocated (or be the initialized BSP); anything else is a
    /// corrupted setup and fatal.
    pub fn current(&self) -> &Lcpu {
        let id = self.platform.current_id();
        match self.find_by_id(id) {
            Some(lcpu) => lcpu,
            None => {
                crate::kfatal!("lcpu: no control block for executing CPU {:#x}", id);
                panic!("lcpu: executing CPU {:#x} is not registered", id);
            }
        }
    }

    /// Hardware id of the executing core.
    pub fn current_id(&self) -> LcpuId {
        self.platform.current_id()
    }

    /// Dense index of the executing core.
    pub fn current_idx(&self) -> LcpuIdx {
        self.current().idx()
    }

    /// Allocate a control block for a discovered core. BSP-only, before any
    /// secondary core is started; the caller is the CPU-discovery code.
    #[cfg(feature = "smp")]
    pub fn alloc(&self, id: LcpuId) -> KernResult<&Lcpu> {
        let count = self.count.load(Ordering::SeqCst);
        if count as usize == MAX_LCPUS {
            return Err(ENOMEM);
        }

        let lcpu = &self.lcpus[count as usize];
        lcpu.assign(count, id);
        self.count.store(count + 1, Ordering::SeqCst);

        crate::kdebug!("lcpu: allocated idx {} for CPU {:#x}", count, id);
        Ok(lcpu)
    }

    /// Record the run/wakeup IPI vectors and enable them at the interrupt
    /// controller. Must run once, on the BSP, after CPU discovery.
    #[cfg(feature = "smp")]
    pub fn mp_init(&self, run_irq: u32, wakeup_irq: u32) -> KernResult<()> {
        if self.mp_ready.swap(true, Ordering::SeqCst) {
            return Err(EPERM);
        }
        if run_irq == wakeup_irq {
            // The wakeup handler must stay minimal; sharing the vector with
            // the run path would reintroduce queue processing on wakeups.
            return Err(EINVAL);
        }

        self.run_irq.store(run_irq, Ordering::SeqCst);
        self.wakeup_irq.store(wakeup_irq, Ordering::SeqCst);

        self.platform.set_irq_type(run_irq, IrqTrigger::Edge);
        self.platform.set_irq_type(wakeup_irq, IrqTrigger::Edge);
        self.platform.enable_irq(run_irq);
        self.platform.enable_irq(wakeup_irq);

        crate::kinfo!(
            "lcpu: MP init, {} CPUs, run IRQ {}, wakeup IRQ {}",
            self.count(),
            run_irq,
            wakeup_irq
        );
        Ok(())
    }

    #[cfg(feature = "smp")]
    pub fn run_irq(&self) -> u32 {
        self.run_irq.load(Ordering::SeqCst)
    }

    #[cfg(feature = "smp")]
    pub fn wakeup_irq(&self) -> u32 {
        self.wakeup_irq.load(Ordering::SeqCst)
    }

    /// Resolve a target list length against the discovered count, applying
    /// the over-subscription policy.
    pub(super) fn target_count(&self, ids: Option<&[LcpuIdx]>) -> KernResult<usize> {
        let count = self.count() as usize;
        match ids {
            None => Ok(count),
            Some(list) if list.len() <= count => Ok(list.len()),
            Some(list) => match self.oversub {
                OversubPolicy::Clamp => {
                    crate::kwarn!(
                        "lcpu: {} targets requested, clamping to {} discovered CPUs",
                        list.len(),
                        count
                    );
                    Ok(count)
                }
                OversubPolicy::Error => Err(EINVAL),
            },
        }
    }

    /// The i-th target of a request: `ids[i]` when a list was given, the
    /// dense index `i` otherwise. Bad indices are a recoverable error.
    pub(super) fn target(&self, ids: Option<&[LcpuIdx]>, i: usize) -> KernResult<&Lcpu> {
        let idx = match ids {
            Some(list) => list[i],
            None => i as LcpuIdx,
        };
        self.get(idx).ok_or(EINVAL)
    }
}
