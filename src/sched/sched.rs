//! Scheduler instances and the backend policy trait

use core::sync::atomic::{AtomicBool, Ordering};

use alloc::boxed::Box;
use alloc::sync::Arc;
use alloc::vec::Vec;
use spin::Mutex;

use crate::errno::KernResult;

use super::thread::Thread;

/// Policy hooks implemented by a scheduler backend.
///
/// `thread_add` and `thread_remove` run with the instance's list lock held
/// and must not call back into the framework's list-mutating operations.
/// `thread_yield` and `sched_start` are invoked without the lock.
pub trait SchedPolicy: Send + Sync {
    /// Admit a thread to the run queue. May reject.
    fn thread_add(&self, thread: &Arc<Thread>) -> KernResult<()>;

    /// Evict a thread from the run queue.
    fn thread_remove(&self, thread: &Arc<Thread>);

    /// Give up the CPU. Returns when the calling thread is scheduled again;
    /// for a thread parked on the exited list it must never return.
    fn thread_yield(&self);

    /// Begin scheduling on the calling core.
    fn sched_start(&self) -> KernResult<()>;
}

pub(super) struct SchedLists {
    pub threads: Vec<Arc<Thread>>,
    pub exited: Vec<Arc<Thread>>,
}

/// One scheduler instance: a policy backend plus the threads it owns.
///
/// The thread and exited lists are guarded by a spinlock, so an instance
/// may be shared across cores; the exited list is appended to only by
/// self-terminating threads and drained only by `thread_gc()`.
pub struct Scheduler {
    pub(super) policy: Box<dyn SchedPolicy>,
    pub(super) lists: Mutex<SchedLists>,
    pub(super) have_stack_alloc: bool,
    pub(super) have_tls_alloc: bool,
    pub(super) started: AtomicBool,
}

impl Scheduler {
    /// Create an instance around a backend. The allocator-capability flags
    /// declare whether the backend's environment can provide thread stacks
    /// and TLS areas; creation requests requiring a missing capability are
    /// rejected.
    pub fn new(
        policy: Box<dyn SchedPolicy>,
        have_stack_alloc: bool,
        have_tls_alloc: bool,
    ) -> Arc<Self> {
        Arc::new(Self {
            policy,
            lists: Mutex::new(SchedLists {
                threads: Vec::new(),
                exited: Vec::new(),
            }),
            have_stack_alloc,
            have_tls_alloc,
            started: AtomicBool::new(false),
        })
    }

    pub fn policy(&self) -> &dyn SchedPolicy {
        &*self.policy
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    pub fn thread_count(&self) -> usize {
        self.lists.lock().threads.len()
    }

    pub fn exited_count(&self) -> usize {
        self.lists.lock().exited.len()
    }

    /// Whether the thread is on this instance's thread list.
    pub fn contains(&self, thread: &Arc<Thread>) -> bool {
        self.lists
            .lock()
            .threads
            .iter()
            .any(|t| Arc::ptr_eq(t, thread))
    }

    /// Snapshot of the thread list for the backend's pick loop.
    pub fn threads(&self) -> Vec<Arc<Thread>> {
        self.lists.lock().threads.clone()
    }
}
