//! Scheduler registry
//!
//! Explicit context struct holding the registered scheduler instances and
//! the per-core current-thread slots. The embedding kernel creates one and
//! hands it the hooks for the executing-core index and a monotonic clock;
//! test binaries create as many independent instances as they need.

use alloc::sync::Arc;
use alloc::vec::Vec;
use spin::Mutex;

use crate::errno::{EEXIST, KernResult};
use crate::lcpu::MAX_LCPUS;

use super::sched::Scheduler;
use super::thread::Thread;

pub struct SchedRegistry {
    scheds: Mutex<Vec<Arc<Scheduler>>>,
    /// Currently executing thread per core; maintained by the backend on
    /// every context switch.
    current: Vec<Mutex<Option<Arc<Thread>>>>,
    pub(super) current_cpu: fn() -> usize,
    pub(super) monotonic_ns: fn() -> u64,
}

impl SchedRegistry {
    /// `current_cpu` must return the dense index of the executing core
    /// (e.g. `LcpuRegistry::current_idx`); `monotonic_ns` backs sleep
    /// deadlines.
    pub fn new(current_cpu: fn() -> usize, monotonic_ns: fn() -> u64) -> Self {
        let mut current = Vec::with_capacity(MAX_LCPUS);
        current.resize_with(MAX_LCPUS, || Mutex::new(None));

        Self {
            scheds: Mutex::new(Vec::new()),
            current,
            current_cpu,
            monotonic_ns,
        }
    }

    /// Register a scheduler instance. The first one registered becomes the
    /// default.
    pub fn register(&self, sched: &Arc<Scheduler>) -> KernResult<()> {
        let mut scheds = self.scheds.lock();
        if scheds.iter().any(|s| Arc::ptr_eq(s, sched)) {
            return Err(EEXIST);
        }
        scheds.push(sched.clone());
        Ok(())
    }

    pub fn sched_count(&self) -> usize {
        self.scheds.lock().len()
    }

    pub fn default_sched(&self) -> Option<Arc<Scheduler>> {
        self.scheds.lock().first().cloned()
    }

    /// The thread executing on the calling core, if the backend set one.
    pub fn current_thread(&self) -> Option<Arc<Thread>> {
        self.current[(self.current_cpu)() % MAX_LCPUS].lock().clone()
    }

    /// Record the thread now executing on the calling core. Backends call
    /// this from their context-switch path; tests use it to stage contexts.
    pub fn set_current_thread(&self, thread: Option<Arc<Thread>>) {
        *self.current[(self.current_cpu)() % MAX_LCPUS].lock() = thread;
    }
}
