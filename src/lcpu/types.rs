//! LCPU control block and remote-function types

use core::sync::atomic::{AtomicI32, AtomicU32, AtomicU64, Ordering};

use alloc::collections::VecDeque;
use spin::Mutex;

use crate::errno::{EAGAIN, KernResult};

use super::state::{
    state_is_busy, state_is_online, LCPU_STATE_OFFLINE,
};
use super::{LcpuEntry, LcpuId, LcpuIdx, LCPU_ID_INVALID, RFN_QUEUE_CAP};

/// A function to execute on a remote core.
///
/// The caller retains ownership of whatever `arg` refers to and must not
/// reuse or free it until completion has been observed out of band (e.g.
/// through a counter or flag updated by `func`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LcpuFunc {
    pub func: fn(usize),
    pub arg: usize,
}

/// State-dependent per-core storage.
///
/// Exactly one variant is meaningful at a time: startup arguments before the
/// core reaches `IDLE`, the halt error code once it is `HALTED`. Accessing
/// the wrong variant is a checked error, not type punning.
#[derive(Clone, Copy)]
pub enum LcpuPayload {
    Empty,
    /// Valid in `INIT`: where the started core should continue.
    Start {
        entry: Option<LcpuEntry>,
        stack: usize,
    },
    /// Valid in `HALTED`: why the core stopped.
    HaltCode(i32),
}

/// Per-core control block.
///
/// `state` is read by any core without locking; it is written only by the
/// owning core, except for the initiator's single `OFFLINE -> INIT`
/// transition in `lcpu_start()`. The remote-function FIFO accepts
/// lock-protected insertion from any core and is drained only by the owner.
pub struct Lcpu {
    /// Current state, one of the `LCPU_STATE_*` values or a busy level.
    pub(super) state: AtomicI32,
    idx: AtomicU32,
    id: AtomicU64,
    payload: Mutex<LcpuPayload>,
    rfn_queue: Mutex<VecDeque<LcpuFunc>>,
}

impl Lcpu {
    pub(super) fn new() -> Self {
        Self {
            state: AtomicI32::new(LCPU_STATE_OFFLINE),
            idx: AtomicU32::new(0),
            id: AtomicU64::new(LCPU_ID_INVALID),
            payload: Mutex::new(LcpuPayload::Empty),
            rfn_queue: Mutex::new(VecDeque::new()),
        }
    }

    #[inline]
    pub fn state(&self) -> i32 {
        self.state.load(Ordering::SeqCst)
    }

    #[inline]
    pub fn idx(&self) -> LcpuIdx {
        self.idx.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn id(&self) -> LcpuId {
        self.id.load(Ordering::Relaxed)
    }

    pub fn is_online(&self) -> bool {
        state_is_online(self.state())
    }

    pub fn is_busy(&self) -> bool {
        state_is_busy(self.state())
    }

    pub(super) fn assign(&self, idx: LcpuIdx, id: LcpuId) {
        self.idx.store(idx, Ordering::Relaxed);
        self.id.store(id, Ordering::Relaxed);
    }

    pub(super) fn set_id(&self, id: LcpuId) {
        self.id.store(id, Ordering::Relaxed);
    }

    /// Move the core `incr` busy levels up or down, refusing to touch a
    /// non-online state. A core may go offline or halt at any moment, so a
    /// blind atomic add could corrupt those states; the CAS loop re-checks
    /// on every attempt.
    ///
    /// Returns false if the core was not online.
    pub(super) fn busy_transition(&self, incr: i32) -> bool {
        let mut old = self.state.load(Ordering::SeqCst);
        loop {
            if !state_is_online(old) {
                return false;
            }

            let new = old + incr;
            debug_assert!(state_is_online(new));

            match self
                .state
                .compare_exchange(old, new, Ordering::SeqCst, Ordering::SeqCst)
            {
                Ok(_) => return true,
                Err(cur) => old = cur,
            }
        }
    }

    // -----------------------------------------------------------------
    // Tagged payload
    // -----------------------------------------------------------------

    pub(super) fn set_start_args(&self, entry: Option<LcpuEntry>, stack: usize) {
        *self.payload.lock() = LcpuPayload::Start { entry, stack };
    }

    /// Consume the startup arguments. Only meaningful on the started core
    /// while still in `INIT`.
    pub(super) fn take_start_args(&self) -> Option<(Option<LcpuEntry>, usize)> {
        let mut payload = self.payload.lock();
        match *payload {
            LcpuPayload::Start { entry, stack } => {
                *payload = LcpuPayload::Empty;
                Some((entry, stack))
            }
            _ => None,
        }
    }

    pub(super) fn set_halt_code(&self, error_code: i32) {
        *self.payload.lock() = LcpuPayload::HaltCode(error_code);
    }

    /// The error code recorded at halt, if the core is halted.
    pub fn halt_code(&self) -> Option<i32> {
        match *self.payload.lock() {
            LcpuPayload::HaltCode(code) => Some(code),
            _ => None,
        }
    }

    // -----------------------------------------------------------------
    // Remote-function FIFO
    // -----------------------------------------------------------------

    /// Append a remote function. Fails with `EAGAIN` when the FIFO is full.
    pub(super) fn rfn_enqueue(&self, func: LcpuFunc) -> KernResult<()> {
        let mut queue = self.rfn_queue.lock();
        if queue.len() >= RFN_QUEUE_CAP {
            return Err(EAGAIN);
        }
        queue.push_back(func);
        Ok(())
    }

    pub(super) fn rfn_dequeue(&self) -> Option<LcpuFunc> {
        self.rfn_queue.lock().pop_front()
    }

    pub fn rfn_pending(&self) -> usize {
        self.rfn_queue.lock().len()
    }
}
