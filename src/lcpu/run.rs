//! Remote-function dispatch
//!
//! `lcpu_run()` queues a function on each target core and raises the
//! dedicated run IPI; the handler on the target drains its FIFO and invokes
//! every queued function exactly once. The separate wakeup IPI carries no
//! work at all, which keeps the window in which a to-be-woken core could
//! miss the signal as small as possible.
//!
//! Ordering: functions queued to the same target execute FIFO. There is no
//! ordering across targets, nor between a run and a concurrent wakeup.

use core::sync::atomic::Ordering;

use crate::errno::{EAGAIN, EPERM, KernResult};

use super::platform::IpiKind;
use super::registry::LcpuRegistry;
use super::types::LcpuFunc;
use super::LcpuIdx;

/// Deliver through the non-maskable path, forcing the target out of a wait
/// loop even with normal interrupts masked.
pub const LCPU_RUN_URGENT: u64 = 1 << 0;

/// Fail with `EAGAIN` instead of spinning when a target FIFO is full.
pub const LCPU_RUN_NOBLOCK: u64 = 1 << 1;

impl LcpuRegistry {
    /// Execute `func` on each target core.
    ///
    /// Requests naming the executing core are dropped: there is no self-IPI,
    /// callers run the function locally if they need it. Targets that are
    /// not online are ignored. Once enqueued and signaled there is no
    /// cancellation; the function will run.
    pub fn lcpu_run(&self, ids: Option<&[LcpuIdx]>, func: LcpuFunc, flags: u64) -> KernResult<()> {
        if !self.mp_ready.load(Ordering::SeqCst) {
            return Err(EPERM);
        }

        let n = self.target_count(ids)?;
        let this_id = self.platform.current_id();

        for i in 0..n {
            let lcpu = self.target(ids, i)?;
            if lcpu.id() == this_id {
                continue;
            }

            // Raise the busy level first. The increment is what keeps the
            // state from falling back below BUSY while our function is in
            // flight; the handler decrements it after the invocation.
            if !lcpu.busy_transition(1) {
                continue;
            }

            loop {
                match lcpu.rfn_enqueue(func) {
                    Ok(()) => break,
                    Err(rc) => {
                        if rc == EAGAIN && flags & LCPU_RUN_NOBLOCK == 0 {
                            self.platform.relax();
                            continue;
                        }

                        // Roll back one busy level; the core may have gone
                        // offline meanwhile, which is fine.
                        lcpu.busy_transition(-1);
                        return Err(rc);
                    }
                }
            }

            let kind = if flags & LCPU_RUN_URGENT != 0 {
                IpiKind::NonMaskable
            } else {
                IpiKind::Fixed
            };

            if let Err(rc) = self.platform.send_ipi(lcpu.id(), self.run_irq(), kind) {
                // The function stays queued and will run with the next
                // batch; only the extra signal was lost.
                crate::kerror!("lcpu: run IPI to CPU {:#x} failed: {}", lcpu.id(), rc);
                return Err(rc);
            }
        }

        Ok(())
    }

    /// Force the target cores out of their low-power wait. No queue
    /// processing happens on the target.
    pub fn lcpu_wakeup(&self, ids: Option<&[LcpuIdx]>) -> KernResult<()> {
        if !self.mp_ready.load(Ordering::SeqCst) {
            return Err(EPERM);
        }

        let n = self.target_count(ids)?;
        let this_id = self.platform.current_id();

        for i in 0..n {
            let lcpu = self.target(ids, i)?;
            if lcpu.id() == this_id {
                continue;
            }

            // A core may halt right after this check; the halt loop simply
            // goes back to sleep after the spurious wakeup.
            if !lcpu.is_online() {
                continue;
            }

            self.platform
                .send_ipi(lcpu.id(), self.wakeup_irq(), IpiKind::Fixed)?;
        }

        Ok(())
    }

    /// Run-IPI handler, executed on the target core.
    ///
    /// Drains the FIFO, invoking every queued function once and unwinding
    /// one busy level per completed function. The interrupt controller is
    /// acknowledged once per dispatch batch, not per function. Returns the
    /// number of functions executed.
    pub fn lcpu_irq_run_handler(&self) -> usize {
        let lcpu = self.current();
        let mut executed = 0usize;

        while let Some(func) = lcpu.rfn_dequeue() {
            (func.func)(func.arg);

            // A transition to HALTED inside the function would never return
            // here, so the state still holds a busy level.
            debug_assert!(lcpu.is_busy());
            lcpu.state.fetch_sub(1, Ordering::SeqCst);
            executed += 1;
        }

        self.platform.eoi_irq(self.run_irq());
        executed
    }

    /// Wakeup-IPI handler: acknowledge and return.
    pub fn lcpu_irq_wakeup_handler(&self) {
        self.platform.eoi_irq(self.wakeup_irq());
    }
}
