//! Thread control block

use core::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicUsize, Ordering};

use alloc::boxed::Box;
use alloc::string::String;
use alloc::sync::{Arc, Weak};
use spin::Mutex;

use super::sched::Scheduler;
use super::types::{
    GcFn, ThreadDtor, ThreadEntry, THREAD_EXITED, THREAD_OWNS_AUXSTACK, THREAD_OWNS_ECTX,
    THREAD_OWNS_STACK, THREAD_OWNS_TLS, THREAD_RUNNABLE,
};

/// A kernel thread.
///
/// The handle (`Arc<Thread>`) is fixed once created and never reused; the
/// owned allocations (stack, TLS, auxiliary stack, extended context) can be
/// released independently of the handle, which is what external termination
/// and the GC sweep do.
pub struct Thread {
    name: String,
    flags: AtomicU32,
    entry: ThreadEntry,
    priv_data: AtomicUsize,
    /// Absolute wakeup deadline for `thread_sleep()`, 0 when not sleeping.
    wakeup_ns: AtomicU64,

    stack: Mutex<Option<Box<[u8]>>>,
    auxstack: Mutex<Option<Box<[u8]>>>,
    tls: Mutex<Option<Box<[u8]>>>,
    ectx: Mutex<Option<Box<[u8]>>>,

    /// Owning scheduler; `None` while unowned.
    sched: Mutex<Option<Weak<Scheduler>>>,
    gc: Mutex<Option<(GcFn, usize)>>,
    dtor: Option<ThreadDtor>,
    released: AtomicBool,
}

impl Thread {
    #[allow(clippy::too_many_arguments)]
    pub(super) fn new(
        name: String,
        entry: ThreadEntry,
        stack: Option<Box<[u8]>>,
        auxstack: Option<Box<[u8]>>,
        tls: Option<Box<[u8]>>,
        ectx: Option<Box<[u8]>>,
        priv_data: usize,
        dtor: Option<ThreadDtor>,
    ) -> Self {
        let mut flags = 0;
        if stack.is_some() {
            flags |= THREAD_OWNS_STACK;
        }
        if auxstack.is_some() {
            flags |= THREAD_OWNS_AUXSTACK;
        }
        if tls.is_some() {
            flags |= THREAD_OWNS_TLS;
        }
        if ectx.is_some() {
            flags |= THREAD_OWNS_ECTX;
        }

        Self {
            name,
            flags: AtomicU32::new(flags),
            entry,
            priv_data: AtomicUsize::new(priv_data),
            wakeup_ns: AtomicU64::new(0),
            stack: Mutex::new(stack),
            auxstack: Mutex::new(auxstack),
            tls: Mutex::new(tls),
            ectx: Mutex::new(ectx),
            sched: Mutex::new(None),
            gc: Mutex::new(None),
            dtor,
            released: AtomicBool::new(false),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn entry(&self) -> ThreadEntry {
        self.entry
    }

    // -----------------------------------------------------------------
    // Flags
    // -----------------------------------------------------------------

    pub fn flags(&self) -> u32 {
        self.flags.load(Ordering::SeqCst)
    }

    pub(super) fn set_flag(&self, flag: u32) -> u32 {
        self.flags.fetch_or(flag, Ordering::SeqCst)
    }

    pub(super) fn clear_flag(&self, flag: u32) -> u32 {
        self.flags.fetch_and(!flag, Ordering::SeqCst)
    }

    pub fn is_runnable(&self) -> bool {
        self.flags() & THREAD_RUNNABLE != 0
    }

    pub fn has_exited(&self) -> bool {
        self.flags() & THREAD_EXITED != 0
    }

    // -----------------------------------------------------------------
    // Misc state
    // -----------------------------------------------------------------

    pub fn priv_data(&self) -> usize {
        self.priv_data.load(Ordering::Relaxed)
    }

    pub fn set_priv_data(&self, value: usize) {
        self.priv_data.store(value, Ordering::Relaxed)
    }

    pub fn wakeup_ns(&self) -> u64 {
        self.wakeup_ns.load(Ordering::SeqCst)
    }

    pub(super) fn set_wakeup_ns(&self, deadline: u64) {
        self.wakeup_ns.store(deadline, Ordering::SeqCst)
    }

    /// Top of the thread's stack, for the backend's context setup.
    pub fn stack_top(&self) -> Option<usize> {
        self.stack
            .lock()
            .as_ref()
            .map(|s| s.as_ptr() as usize + s.len())
    }

    pub fn tls_base(&self) -> Option<usize> {
        self.tls.lock().as_ref().map(|t| t.as_ptr() as usize)
    }

    // -----------------------------------------------------------------
    // Ownership
    // -----------------------------------------------------------------

    /// The owning scheduler, if any and still alive.
    pub fn owner(&self) -> Option<Arc<Scheduler>> {
        self.sched.lock().as_ref().and_then(Weak::upgrade)
    }

    pub(super) fn set_owner(&self, owner: Option<Weak<Scheduler>>) {
        *self.sched.lock() = owner;
    }

    pub(super) fn set_gc_callback(&self, gc: Option<(GcFn, usize)>) {
        *self.gc.lock() = gc;
    }

    pub(super) fn take_gc_callback(&self) -> Option<(GcFn, usize)> {
        self.gc.lock().take()
    }

    /// Release the thread's owned allocations and run its destructor.
    /// Idempotent; the handle itself stays valid but must not be reused.
    pub(super) fn release_resources(&self) {
        if self.released.swap(true, Ordering::SeqCst) {
            return;
        }

        if let Some(dtor) = self.dtor {
            dtor(self);
        }

        self.stack.lock().take();
        self.auxstack.lock().take();
        self.tls.lock().take();
        self.ectx.lock().take();
        self.clear_flag(
            THREAD_OWNS_STACK | THREAD_OWNS_AUXSTACK | THREAD_OWNS_TLS | THREAD_OWNS_ECTX,
        );
    }

    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }
}
