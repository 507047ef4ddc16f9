//! Core startup, per-core init and boot-time wait
//!
//! `lcpu_start()` only issues the architecture start sequence; it does not
//! wait for the targets. Boot code that needs the cores online pairs it with
//! `lcpu_wait()`, a busy-poll that is acceptable only because no scheduler
//! exists at its call sites.

use core::sync::atomic::Ordering;

#[cfg(feature = "smp")]
use crate::errno::EINVAL;
use crate::errno::{EPERM, ETIMEDOUT, KernResult};

use super::registry::LcpuRegistry;
use super::state::{
    LCPU_STATE_BUSY0, LCPU_STATE_HALTED, LCPU_STATE_IDLE, LCPU_STATE_INIT, LCPU_STATE_OFFLINE,
};
#[cfg(feature = "smp")]
use super::LcpuEntry;
use super::LcpuIdx;

impl LcpuRegistry {
    /// Initialize the control block of the executing core.
    ///
    /// On the BSP this must run before any secondary CPU is allocated. On a
    /// secondary core it runs from the startup path with the block already
    /// in `INIT`. Leaves the core in `BUSY0`: it is online from this point
    /// and remote functions may be queued to it, but it has not entered the
    /// idle loop yet.
    pub fn lcpu_init(&self) -> KernResult<()> {
        let id = self.platform.current_id();

        if let Some(lcpu) = self.find_by_id(id) {
            // Secondary core coming out of the startup trampoline.
            let state = lcpu.state();
            if state != LCPU_STATE_INIT {
                crate::kfatal!(
                    "lcpu: CPU {:#x} entered init in state {}",
                    id,
                    super::state::state_name(state)
                );
                panic!("lcpu: secondary init from invalid state {}", state);
            }

            lcpu.state.store(LCPU_STATE_BUSY0, Ordering::SeqCst);
            return Ok(());
        }

        // Bootstrap processor: claims index 0. Refuse once secondary CPUs
        // have been allocated, the registry would no longer be consistent.
        if self.count() != 1 {
            return Err(EPERM);
        }

        let bsp = self.bsp();
        bsp.set_id(id);
        bsp.state.store(LCPU_STATE_BUSY0, Ordering::SeqCst);

        crate::kinfo!("lcpu: BSP is CPU {:#x}", id);
        Ok(())
    }

    /// Start the requested cores.
    ///
    /// `sps[i]`/`entries[i]` belong to the i-th *started* target; the
    /// executing core is skipped but, when named explicitly in `ids`, still
    /// consumes its argument slot. Targets that are not `OFFLINE` are
    /// skipped with a warning. A missing argument slot fails with `EINVAL`
    /// before the target is claimed, leaving it startable by a corrected
    /// retry. Returns the number of start sequences issued without waiting
    /// for the cores to come online.
    #[cfg(feature = "smp")]
    pub fn lcpu_start(
        &self,
        ids: Option<&[LcpuIdx]>,
        sps: &[usize],
        entries: &[Option<LcpuEntry>],
    ) -> KernResult<usize> {
        let n = self.target_count(ids)?;
        let this_id = self.platform.current_id();
        let mut argi = 0usize;
        let mut started = 0usize;

        for i in 0..n {
            let lcpu = self.target(ids, i)?;

            if lcpu.id() == this_id {
                // Without an explicit list the caller provided no slot for
                // the executing core; with one, skip its arguments too.
                if ids.is_some() {
                    argi += 1;
                }
                continue;
            }

            // Resolve the argument slot before claiming the core, so a
            // short sps/entries list fails with this target still OFFLINE
            // and the request retryable.
            let Some(&stack) = sps.get(argi) else {
                return Err(EINVAL);
            };
            let entry = entries.get(argi).copied().flatten();

            // Acquire the core for initialization. Losing the race, or the
            // core being beyond OFFLINE already, both mean somebody else
            // started it.
            if lcpu
                .state
                .compare_exchange(
                    LCPU_STATE_OFFLINE,
                    LCPU_STATE_INIT,
                    Ordering::SeqCst,
                    Ordering::SeqCst,
                )
                .is_err()
            {
                crate::kwarn!("lcpu: cannot start CPU {:#x}: not offline", lcpu.id());
                argi += 1;
                continue;
            }

            // Startup arguments must be visible before the start sequence;
            // the payload lock release orders them.
            lcpu.set_start_args(entry, stack);

            if let Err(rc) = self.platform.start_core(lcpu.id(), lcpu.idx()) {
                lcpu.set_halt_code(rc);
                lcpu.state.store(LCPU_STATE_HALTED, Ordering::SeqCst);
                crate::kerror!("lcpu: start sequence for CPU {:#x} failed: {}", lcpu.id(), rc);
                return Err(rc);
            }

            started += 1;
            argi += 1;
        }

        Ok(started)
    }

    /// Busy-poll the requested cores until they reach `IDLE`.
    ///
    /// Cores that are `OFFLINE` or `HALTED` are not waited for. With a
    /// non-zero `timeout_ns` the poll gives up with `ETIMEDOUT` once the
    /// deadline passes.
    ///
    /// Boot-time only: this never sleeps and must not be called from a
    /// schedulable context.
    pub fn lcpu_wait(&self, ids: Option<&[LcpuIdx]>, timeout_ns: u64) -> KernResult<()> {
        let n = self.target_count(ids)?;
        let this_id = self.platform.current_id();
        let deadline = if timeout_ns > 0 {
            self.platform.monotonic_ns().saturating_add(timeout_ns)
        } else {
            0
        };

        for i in 0..n {
            let lcpu = self.target(ids, i)?;
            if lcpu.id() == this_id {
                continue;
            }

            loop {
                match lcpu.state() {
                    LCPU_STATE_OFFLINE | LCPU_STATE_HALTED | LCPU_STATE_IDLE => break,
                    _ => {}
                }

                if timeout_ns > 0 && self.platform.monotonic_ns() >= deadline {
                    return Err(ETIMEDOUT);
                }

                self.platform.relax();
            }
        }

        Ok(())
    }

    /// Entry point for a secondary core, reached from the architecture
    /// trampoline with interrupts disabled.
    ///
    /// Finishes per-core init, then either jumps to the entry function from
    /// the startup arguments or drops to `IDLE` and waits for interrupts.
    pub fn lcpu_entry_default(&self) -> ! {
        let lcpu = self.current();
        let args = lcpu.take_start_args();

        if let Err(rc) = self.lcpu_init() {
            self.lcpu_halt(rc);
        }

        match args {
            Some((Some(entry), stack)) => {
                // Hand over to the user-supplied entry on its own stack.
                unsafe { self.platform.jump_to(stack, entry) }
            }
            _ => {
                // Coming from BUSY0 and heading for IDLE. Functions may
                // already be queued, so decrement instead of storing.
                lcpu.state.fetch_sub(1, Ordering::SeqCst);

                loop {
                    // Wakes for interrupts in general and for lcpu_run()
                    // requests destined for this core.
                    self.platform.wait_for_irq();
                }
            }
        }
    }

    /// Halt the executing core, recording `error_code` as the reason. The
    /// only way back is an external reset.
    pub fn lcpu_halt(&self, error_code: i32) -> ! {
        self.platform.irq_disable();

        let lcpu = self.current();
        lcpu.set_halt_code(error_code);
        lcpu.state.store(LCPU_STATE_HALTED, Ordering::SeqCst);

        if error_code != 0 {
            crate::kerror!("lcpu: CPU {:#x} halted with error {}", lcpu.id(), error_code);
        }

        loop {
            // Regular interrupts cannot recover us, but NMIs may still
            // arrive, so keep re-entering the wait.
            self.platform.halt_wait();
        }
    }
}
