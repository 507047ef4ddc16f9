//! Scheduler type definitions

use alloc::string::String;

use super::thread::Thread;

// ===========================================================================
// Thread flags
// ===========================================================================

/// Thread may be picked by the backend.
pub const THREAD_RUNNABLE: u32 = 1 << 0;
/// Thread has terminated; terminal together with resource release.
pub const THREAD_EXITED: u32 = 1 << 1;
/// Thread owns its stack allocation.
pub const THREAD_OWNS_STACK: u32 = 1 << 2;
/// Thread owns its TLS area.
pub const THREAD_OWNS_TLS: u32 = 1 << 3;
/// Thread owns an auxiliary stack (e.g. for signal handling).
pub const THREAD_OWNS_AUXSTACK: u32 = 1 << 4;
/// Thread owns an extended-context save area (FPU/SSE state).
pub const THREAD_OWNS_ECTX: u32 = 1 << 5;

// ===========================================================================
// Default allocation sizes
// ===========================================================================

pub const DEFAULT_STACK_SIZE: usize = 16 * 4096;
pub const DEFAULT_TLS_SIZE: usize = 4096;
/// FXSAVE area plus alignment slack.
pub const ECTX_SIZE: usize = 576;

// ===========================================================================
// Entry points and callbacks
// ===========================================================================

/// Entry function with its calling-convention arity, fixed at creation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ThreadEntry {
    Fn0(fn()),
    Fn1(fn(usize), usize),
    Fn2(fn(usize, usize), usize, usize),
}

impl ThreadEntry {
    /// Invoke the entry function. Called by the backend on the thread's own
    /// stack once it is first scheduled.
    pub fn invoke(&self) {
        match *self {
            ThreadEntry::Fn0(f) => f(),
            ThreadEntry::Fn1(f, a) => f(a),
            ThreadEntry::Fn2(f, a, b) => f(a, b),
        }
    }
}

/// Destructor run when a thread's resources are released.
pub type ThreadDtor = fn(&Thread);

/// Custom GC callback attached via `thread_exit2()`, executed by the GC
/// sweep from a context that is not the collected thread (e.g. to unmap the
/// thread's own stack).
pub type GcFn = fn(usize);

// ===========================================================================
// Creation attributes
// ===========================================================================

/// Attributes for thread creation. `..Default::default()` fills the usual
/// case: default-sized stack, no auxiliary stack, no TLS, no extended
/// context.
#[derive(Clone)]
pub struct ThreadAttr {
    pub name: String,
    /// Stack length in bytes; 0 selects `DEFAULT_STACK_SIZE`.
    pub stack_len: usize,
    /// Auxiliary stack length in bytes; 0 allocates none.
    pub auxstack_len: usize,
    pub want_tls: bool,
    pub want_ectx: bool,
    /// Opaque per-thread word for the embedder.
    pub priv_data: usize,
    pub dtor: Option<ThreadDtor>,
}

impl Default for ThreadAttr {
    fn default() -> Self {
        Self {
            name: String::new(),
            stack_len: 0,
            auxstack_len: 0,
            want_tls: false,
            want_ectx: false,
            priv_data: 0,
            dtor: None,
        }
    }
}
