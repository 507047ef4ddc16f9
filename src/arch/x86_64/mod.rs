//! x86_64 platform support
//!
//! Implements the LCPU platform traits on top of the local APIC: fixed and
//! NMI IPIs for the run/wakeup paths and the INIT/STARTUP sequence for
//! secondary-core bring-up. The boot code supplies the real-mode trampoline
//! that funnels started cores into `LcpuRegistry::lcpu_entry_default()`.

pub mod lapic;

use core::arch::asm;

use x86_64::instructions::hlt;
use x86_64::instructions::interrupts;

use crate::errno::{EIO, KernResult};
use crate::lcpu::platform::{IntCtlr, IpiKind, IrqTrigger, LcpuPlatform};
use crate::lcpu::{LcpuEntry, LcpuId, LcpuIdx};

/// Delay loops after the INIT IPI (about 10ms on common parts).
const INIT_DELAY_LOOPS: u64 = 100_000;
/// Delay loops between the two STARTUP IPIs (about 200us).
const SIPI_DELAY_LOOPS: u64 = 20_000;

pub fn halt_loop() -> ! {
    loop {
        hlt();
    }
}

fn busy_wait(loops: u64) {
    for _ in 0..loops {
        core::hint::spin_loop();
    }
}

/// The x86_64 LCPU platform.
pub struct X64Platform {
    /// Page number of the real-mode startup trampoline; SIPI vector.
    trampoline_vector: u8,
}

impl X64Platform {
    pub const fn new(trampoline_vector: u8) -> Self {
        Self { trampoline_vector }
    }
}

impl IntCtlr for X64Platform {
    fn ack_irq(&self) -> u32 {
        // The APIC delivers the vector through the IDT; there is no
        // GIC-style acknowledge register to read.
        0
    }

    fn eoi_irq(&self, _irq: u32) {
        lapic::send_eoi();
    }

    fn enable_irq(&self, _irq: u32) {
        // IPI vectors need no unmasking at the local APIC.
    }

    fn disable_irq(&self, _irq: u32) {}

    fn set_irq_type(&self, _irq: u32, _trigger: IrqTrigger) {
        // IPIs are always edge-triggered on x86.
    }

    fn send_ipi(&self, target: LcpuId, irq: u32, kind: IpiKind) -> KernResult<()> {
        if !lapic::is_ready() {
            return Err(EIO);
        }

        match kind {
            IpiKind::Fixed => lapic::send_fixed_ipi(target as u32, irq as u8),
            IpiKind::NonMaskable => lapic::send_nmi_ipi(target as u32),
        }
        Ok(())
    }
}

impl LcpuPlatform for X64Platform {
    fn current_id(&self) -> LcpuId {
        lapic::local_apic_id() as LcpuId
    }

    fn start_core(&self, id: LcpuId, idx: LcpuIdx) -> KernResult<()> {
        if !lapic::is_ready() {
            return Err(EIO);
        }

        crate::kdebug!(
            "x86: starting CPU {:#x} (idx {}), SIPI vector {:#x}",
            id,
            idx,
            self.trampoline_vector
        );

        // INIT, then STARTUP twice, per the MP specification.
        lapic::send_init_ipi(id as u32);
        busy_wait(INIT_DELAY_LOOPS);

        lapic::send_startup_ipi(id as u32, self.trampoline_vector);
        busy_wait(SIPI_DELAY_LOOPS);

        lapic::send_startup_ipi(id as u32, self.trampoline_vector);
        busy_wait(SIPI_DELAY_LOOPS);

        Ok(())
    }

    fn monotonic_ns(&self) -> u64 {
        crate::logger::boot_time_ns()
    }

    fn wait_for_irq(&self) {
        interrupts::enable_and_hlt();
    }

    fn halt_wait(&self) {
        hlt();
    }

    fn relax(&self) {
        core::hint::spin_loop();
    }

    fn irq_enable(&self) {
        interrupts::enable();
    }

    fn irq_disable(&self) {
        interrupts::disable();
    }

    unsafe fn jump_to(&self, stack: usize, entry: LcpuEntry) -> ! {
        asm!(
            "mov rsp, {stack}",
            "xor rbp, rbp",
            "jmp {entry}",
            stack = in(reg) stack,
            entry = in(reg) entry as usize,
            options(noreturn)
        );
    }
}
