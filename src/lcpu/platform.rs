//! Platform traits consumed by the LCPU subsystem
//!
//! The interrupt-controller driver and the architecture startup code live
//! outside this crate. They plug in through these traits; `arch::x86_64`
//! provides the local-APIC implementation, and the hosted test suite
//! substitutes a mock.

use crate::errno::KernResult;

use super::{LcpuEntry, LcpuId, LcpuIdx};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IrqTrigger {
    Edge,
    Level,
}

/// Delivery class for directed interrupts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IpiKind {
    /// Normal fixed-vector delivery; masked while the target has IRQs off.
    Fixed,
    /// Non-maskable delivery, used to force a core out of a wait loop even
    /// with normal interrupts disabled.
    NonMaskable,
}

/// Interrupt-controller operations (GIC, local APIC, ...).
pub trait IntCtlr: Sync {
    /// Acknowledge the highest-priority pending interrupt, returning its id.
    fn ack_irq(&self) -> u32;

    /// Signal end-of-interrupt for `irq`.
    fn eoi_irq(&self, irq: u32);

    fn enable_irq(&self, irq: u32);

    fn disable_irq(&self, irq: u32);

    fn set_irq_type(&self, irq: u32, trigger: IrqTrigger);

    /// Send a directed interrupt to the core with hardware id `target`.
    fn send_ipi(&self, target: LcpuId, irq: u32, kind: IpiKind) -> KernResult<()>;
}

/// Per-platform LCPU operations beyond the interrupt controller.
pub trait LcpuPlatform: IntCtlr {
    /// Hardware id of the core executing this call. Must work on the BSP
    /// before any MP initialization.
    fn current_id(&self) -> LcpuId;

    /// Issue the architecture start sequence for the core with the given
    /// hardware id (e.g. INIT/SIPI/SIPI on x86). The started core must end
    /// up in `LcpuRegistry::lcpu_entry_default()` with IRQs disabled.
    fn start_core(&self, id: LcpuId, idx: LcpuIdx) -> KernResult<()>;

    /// Monotonic nanoseconds, used for boot-time wait deadlines.
    fn monotonic_ns(&self) -> u64;

    /// Enable interrupts and enter a low-power wait until the next one.
    fn wait_for_irq(&self);

    /// Low-power wait without touching the interrupt flag. Used by the halt
    /// loop, where only NMIs can still arrive.
    fn halt_wait(&self);

    /// Spin-loop hint for busy-poll loops.
    fn relax(&self);

    fn irq_enable(&self);

    fn irq_disable(&self);

    /// Switch to `stack` and continue at `entry`.
    ///
    /// # Safety
    /// `stack` must be the top of a valid, unused stack mapping. The current
    /// stack is abandoned.
    unsafe fn jump_to(&self, stack: usize, entry: LcpuEntry) -> !;
}
