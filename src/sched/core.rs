//! Policy-independent framework operations
//!
//! Everything here manipulates scheduler instances through their list lock
//! and defers the actual scheduling decisions to the backend hooks.

use alloc::boxed::Box;
use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;

use crate::errno::{EBUSY, EINVAL, ENOMEM, KernResult};

use super::registry::SchedRegistry;
use super::sched::Scheduler;
use super::thread::Thread;
use super::types::{
    GcFn, ThreadAttr, ThreadEntry, DEFAULT_STACK_SIZE, DEFAULT_TLS_SIZE, ECTX_SIZE,
    THREAD_EXITED, THREAD_RUNNABLE,
};

/// Fallible buffer allocation; thread stacks are large enough that running
/// the heap dry must surface as `ENOMEM`, not an abort.
fn alloc_buf(len: usize) -> KernResult<Box<[u8]>> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len).map_err(|_| ENOMEM)?;
    buf.resize(len, 0);
    Ok(buf.into_boxed_slice())
}

impl SchedRegistry {
    // =======================================================================
    // Creation
    // =======================================================================

    /// Create a thread with a zero-argument entry and add it to `sched`.
    pub fn thread_create_fn0(
        &self,
        sched: &Arc<Scheduler>,
        entry: fn(),
        attr: &ThreadAttr,
    ) -> KernResult<Arc<Thread>> {
        self.thread_create(sched, ThreadEntry::Fn0(entry), attr)
    }

    /// Create a thread with a one-argument entry and add it to `sched`.
    pub fn thread_create_fn1(
        &self,
        sched: &Arc<Scheduler>,
        entry: fn(usize),
        arg: usize,
        attr: &ThreadAttr,
    ) -> KernResult<Arc<Thread>> {
        self.thread_create(sched, ThreadEntry::Fn1(entry, arg), attr)
    }

    /// Create a thread with a two-argument entry and add it to `sched`.
    pub fn thread_create_fn2(
        &self,
        sched: &Arc<Scheduler>,
        entry: fn(usize, usize),
        arg0: usize,
        arg1: usize,
        attr: &ThreadAttr,
    ) -> KernResult<Arc<Thread>> {
        self.thread_create(sched, ThreadEntry::Fn2(entry, arg0, arg1), attr)
    }

    fn thread_create(
        &self,
        sched: &Arc<Scheduler>,
        entry: ThreadEntry,
        attr: &ThreadAttr,
    ) -> KernResult<Arc<Thread>> {
        if !sched.have_stack_alloc {
            return Err(EINVAL);
        }
        if attr.want_tls && !sched.have_tls_alloc {
            return Err(EINVAL);
        }

        let stack_len = if attr.stack_len == 0 {
            DEFAULT_STACK_SIZE
        } else {
            attr.stack_len
        };

        let stack = Some(alloc_buf(stack_len)?);
        let auxstack = if attr.auxstack_len > 0 {
            Some(alloc_buf(attr.auxstack_len)?)
        } else {
            None
        };
        let tls = if attr.want_tls {
            Some(alloc_buf(DEFAULT_TLS_SIZE)?)
        } else {
            None
        };
        let ectx = if attr.want_ectx {
            Some(alloc_buf(ECTX_SIZE)?)
        } else {
            None
        };

        let name = if attr.name.is_empty() {
            String::from("unnamed")
        } else {
            attr.name.clone()
        };

        let thread = Arc::new(Thread::new(
            name,
            entry,
            stack,
            auxstack,
            tls,
            ectx,
            attr.priv_data,
            attr.dtor,
        ));

        // Ownership transfers on add; a rejected thread is released here
        // and never observable through the scheduler.
        match self.thread_add(sched, &thread) {
            Ok(()) => {
                crate::kdebug!("sched: created thread '{}'", thread.name());
                Ok(thread)
            }
            Err(rc) => {
                thread.release_resources();
                Err(rc)
            }
        }
    }

    // =======================================================================
    // Admission / eviction
    // =======================================================================

    /// Add a thread to a scheduler. The policy may reject the admission.
    pub fn thread_add(&self, sched: &Arc<Scheduler>, thread: &Arc<Thread>) -> KernResult<()> {
        if thread.has_exited() {
            return Err(EINVAL);
        }
        if thread.owner().is_some() {
            crate::kfatal!("sched: thread '{}' is already owned", thread.name());
            panic!("sched: adding an already-owned thread");
        }

        let mut lists = sched.lists.lock();
        sched.policy.thread_add(thread)?;
        lists.threads.push(thread.clone());
        drop(lists);

        thread.set_owner(Some(Arc::downgrade(sched)));
        thread.set_flag(THREAD_RUNNABLE);
        Ok(())
    }

    /// Remove a thread from its scheduler. It becomes unowned and may be
    /// re-added later (to the same instance or another one).
    pub fn thread_remove(&self, thread: &Arc<Thread>) -> KernResult<()> {
        let Some(sched) = thread.owner() else {
            return Err(EINVAL);
        };

        let mut lists = sched.lists.lock();
        sched.policy.thread_remove(thread);
        lists.threads.retain(|t| !Arc::ptr_eq(t, thread));
        drop(lists);

        thread.clear_flag(THREAD_RUNNABLE);
        thread.set_owner(None);
        Ok(())
    }

    // =======================================================================
    // Termination
    // =======================================================================

    /// Terminate a thread.
    ///
    /// Externally terminated threads have their resources released before
    /// this returns. If the calling thread terminates itself, it is parked
    /// on its scheduler's exited list for a later `thread_gc()` sweep — it
    /// cannot free the stack it is running on — and this function never
    /// returns.
    pub fn thread_terminate(&self, thread: &Arc<Thread>) {
        // Double termination means the caller's idea of the thread's state
        // is corrupt; nothing can be unwound safely from that.
        if thread.set_flag(THREAD_EXITED) & THREAD_EXITED != 0 {
            crate::kfatal!("sched: double termination of thread '{}'", thread.name());
            panic!("sched: double termination");
        }

        let is_self = self
            .current_thread()
            .is_some_and(|current| Arc::ptr_eq(&current, thread));
        let owner = thread.owner();

        // Out of the scheduling lists first, in either branch.
        if let Some(sched) = owner.as_ref() {
            let mut lists = sched.lists.lock();
            sched.policy.thread_remove(thread);
            lists.threads.retain(|t| !Arc::ptr_eq(t, thread));
        }
        thread.clear_flag(THREAD_RUNNABLE);
        thread.set_owner(None);

        if !is_self {
            thread.release_resources();
            return;
        }

        let Some(sched) = owner else {
            crate::kfatal!(
                "sched: thread '{}' self-terminates without a scheduler",
                thread.name()
            );
            panic!("sched: self-termination without a scheduler");
        };

        sched.lists.lock().exited.push(thread.clone());

        // Yield away for good; the stack under our feet stays valid until
        // the GC sweep runs from another context.
        sched.policy.thread_yield();

        crate::kfatal!("sched: terminated thread '{}' resumed", thread.name());
        panic!("sched: terminated thread resumed");
    }

    /// Self-termination with a custom GC callback, e.g. to unmap the
    /// caller's own stack from a different context. Never returns.
    pub fn thread_exit2(&self, gc_fn: GcFn, gc_arg: usize) -> ! {
        self.do_exit(Some((gc_fn, gc_arg)))
    }

    /// Terminate the calling thread. Never returns.
    pub fn thread_exit(&self) -> ! {
        self.do_exit(None)
    }

    fn do_exit(&self, gc: Option<(GcFn, usize)>) -> ! {
        let Some(current) = self.current_thread() else {
            crate::kfatal!("sched: thread_exit outside of a thread context");
            panic!("sched: thread_exit outside of a thread context");
        };

        current.set_gc_callback(gc);
        self.thread_terminate(&current);

        // The self-branch of terminate diverges; getting here means the
        // backend resumed a dead thread.
        crate::kfatal!("sched: thread_exit returned");
        panic!("sched: thread_exit returned");
    }

    // =======================================================================
    // Garbage collection
    // =======================================================================

    /// Drain the exited list, releasing every parked thread. Must run from
    /// a context that is guaranteed not to be any collected thread (idle
    /// loop, dedicated collector). Returns the number reclaimed.
    pub fn thread_gc(&self, sched: &Arc<Scheduler>) -> usize {
        let current = self.current_thread();
        let drained = core::mem::take(&mut sched.lists.lock().exited);

        let mut reclaimed = 0;
        for thread in drained {
            if let Some(cur) = current.as_ref() {
                if Arc::ptr_eq(cur, &thread) {
                    crate::kfatal!("sched: gc would collect the executing thread");
                    panic!("sched: gc of the executing thread");
                }
            }

            if let Some((gc_fn, gc_arg)) = thread.take_gc_callback() {
                gc_fn(gc_arg);
            }
            thread.release_resources();
            reclaimed += 1;
        }

        if reclaimed > 0 {
            crate::kdebug!("sched: gc reclaimed {} thread(s)", reclaimed);
        }
        reclaimed
    }

    // =======================================================================
    // Scheduling entry points
    // =======================================================================

    /// Hand the calling core to the scheduler. Fails with `EBUSY` when the
    /// instance was already started.
    pub fn sched_start(&self, sched: &Arc<Scheduler>) -> KernResult<()> {
        if sched.started.swap(true, core::sync::atomic::Ordering::SeqCst) {
            return Err(EBUSY);
        }
        sched.policy.sched_start()
    }

    /// Voluntarily give up the CPU.
    pub fn yield_current(&self) {
        let sched = self
            .current_thread()
            .and_then(|t| t.owner())
            .or_else(|| self.default_sched());

        if let Some(sched) = sched {
            sched.policy.thread_yield();
        }
    }

    /// Block the calling thread for at least `ns` nanoseconds, then yield.
    /// Whether the core actually sleeps is backend policy; the framework
    /// only records the deadline and clears runnability until resume.
    pub fn thread_sleep(&self, ns: u64) {
        let Some(current) = self.current_thread() else {
            crate::kfatal!("sched: thread_sleep outside of a thread context");
            panic!("sched: thread_sleep outside of a thread context");
        };

        current.set_wakeup_ns((self.monotonic_ns)().saturating_add(ns));
        current.clear_flag(THREAD_RUNNABLE);

        if let Some(sched) = current.owner() {
            sched.policy.thread_yield();
        }

        // Resumed: runnable again, deadline cleared.
        current.set_wakeup_ns(0);
        current.set_flag(THREAD_RUNNABLE);
    }
}
