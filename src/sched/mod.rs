//! Thread scheduler framework
//!
//! Policy-independent thread lifecycle on top of pluggable scheduler
//! backends. The framework owns creation, admission, termination and
//! deferred garbage collection; a backend decides which runnable thread
//! executes on a given core through the `SchedPolicy` hooks.
//!
//! The one rule everything here bends around: a thread cannot free the
//! stack it is currently executing on. Self-termination therefore parks the
//! thread on its scheduler's exited list and yields away forever; a later
//! `thread_gc()` sweep, running from a different context, releases the
//! resources.
//!
//! ## Module Organization
//!
//! - `types`: flags, entry arities, creation attributes
//! - `thread`: the thread control block and resource release
//! - `sched`: scheduler instances and the `SchedPolicy` backend trait
//! - `registry`: `SchedRegistry`, per-core current-thread tracking
//! - `core`: the framework operations (create/add/remove/terminate/gc/...)

mod core;
pub mod registry;
pub mod sched;
pub mod thread;
pub mod types;

pub use registry::SchedRegistry;
pub use sched::{SchedPolicy, Scheduler};
pub use thread::Thread;
pub use types::{
    GcFn, ThreadAttr, ThreadDtor, ThreadEntry, DEFAULT_STACK_SIZE, ECTX_SIZE, THREAD_EXITED,
    THREAD_OWNS_AUXSTACK, THREAD_OWNS_ECTX, THREAD_OWNS_STACK, THREAD_OWNS_TLS, THREAD_RUNNABLE,
};
