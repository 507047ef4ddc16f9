//! LCPU state encoding
//!
//! The state is a plain integer so that busy nesting can be expressed as a
//! level rather than a flag: every remote-function or nested IRQ invocation
//! pushes the core one level deeper, and unwinding decrements back down to
//! `IDLE`.
//!
//! ```text
//!                          lcpu_init
//!                    ┌───────────────────┐lcpu_run
//!         lcpu_start │          ┌──────┐ │ ┌─────┐   ┌────
//!  ┌─────────┐   ┌───┴──┐   ┌───┴──┐ ┌─▼─▼─┴─┐ ┌─▼───┴─┐
//!  │ OFFLINE ├──►│ INIT │   │ IDLE │ │ BUSY0 │ │ BUSY1 │
//!  └─────────┘   └───┬──┘   └─┬─▲──┘ └─┬─┬─▲─┘ └─┬─┬─▲─┘
//!                    │        │ └──────┘ │ └─────┘ │ └────
//!  ┌────────┐        │        │          │ RUN_IRQ │
//!  │ HALTED │◄───────┴────────┴──────────┴─────────┴──────
//!  └────────┘        lcpu_halt (only the core itself)
//! ```

/// CPU stopped after an error or explicit halt; needs an external reset.
pub const LCPU_STATE_HALTED: i32 = -1;
/// CPU present but not started.
pub const LCPU_STATE_OFFLINE: i32 = 0;
/// CPU started, per-core init not finished.
pub const LCPU_STATE_INIT: i32 = 1;
/// CPU is idle, waiting for interrupts.
pub const LCPU_STATE_IDLE: i32 = 2;
/// First busy level; greater values are nested invocations.
pub const LCPU_STATE_BUSY0: i32 = 3;

/// A core is online once it finished init, regardless of busy nesting.
#[inline]
pub fn state_is_online(state: i32) -> bool {
    state >= LCPU_STATE_IDLE
}

/// Busy means at least one remote-function/IRQ invocation is in flight.
/// Note that `!is_busy` does not imply idle (the core may be offline).
#[inline]
pub fn state_is_busy(state: i32) -> bool {
    state >= LCPU_STATE_BUSY0
}

/// Nesting depth for online states, `None` otherwise.
#[inline]
pub fn busy_depth(state: i32) -> Option<u32> {
    if state_is_busy(state) {
        Some((state - LCPU_STATE_BUSY0) as u32 + 1)
    } else if state_is_online(state) {
        Some(0)
    } else {
        None
    }
}

pub fn state_name(state: i32) -> &'static str {
    match state {
        LCPU_STATE_HALTED => "halted",
        LCPU_STATE_OFFLINE => "offline",
        LCPU_STATE_INIT => "init",
        LCPU_STATE_IDLE => "idle",
        s if s >= LCPU_STATE_BUSY0 => "busy",
        _ => "invalid",
    }
}
