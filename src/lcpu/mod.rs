//! Logical CPU (LCPU) subsystem
//!
//! One control block per logical CPU, tracking its lifecycle from power-on
//! to halt. Other cores inspect the state with plain atomic loads; every
//! transition after `OFFLINE -> INIT` is performed by the owning core
//! itself.
//!
//! The subsystem also carries the cross-core remote-execution machinery:
//! each core owns a bounded FIFO of pending remote functions, filled by
//! `lcpu_run()` and drained by the run-IPI handler, plus a minimal wakeup
//! IPI whose handler does nothing but acknowledge.
//!
//! ## Module Organization
//!
//! - `state`: state encoding and predicates
//! - `types`: the `Lcpu` control block, tagged payload, remote functions
//! - `platform`: traits implemented by the interrupt controller / platform
//! - `registry`: `LcpuRegistry`, the explicit per-instance context
//! - `start`: core startup, boot-time wait, per-core init, self-halt
//! - `run`: remote-function dispatch and the wakeup path

pub mod platform;
pub mod registry;
#[cfg(feature = "smp")]
pub mod run;
pub mod start;
pub mod state;
pub mod types;

pub use platform::{IntCtlr, IpiKind, IrqTrigger, LcpuPlatform};
pub use registry::{LcpuConfig, LcpuRegistry, OversubPolicy};
#[cfg(feature = "smp")]
pub use run::{LCPU_RUN_NOBLOCK, LCPU_RUN_URGENT};
pub use state::{
    state_is_busy, state_is_online, state_name, LCPU_STATE_BUSY0, LCPU_STATE_HALTED,
    LCPU_STATE_IDLE, LCPU_STATE_INIT, LCPU_STATE_OFFLINE,
};
pub use types::{Lcpu, LcpuFunc, LcpuPayload};

/// Hardware-assigned CPU identifier (e.g. an APIC ID).
pub type LcpuId = u64;

/// Dense index into the LCPU array. The BSP is always index 0.
pub type LcpuIdx = u32;

/// Entry function for a started core. Never returns; the core must end in
/// `lcpu_halt()` or run forever.
pub type LcpuEntry = fn() -> !;

/// Maximum number of logical CPUs supported.
pub const MAX_LCPUS: usize = 64;

/// Hardware id of a not-yet-allocated control block.
pub const LCPU_ID_INVALID: LcpuId = LcpuId::MAX;

/// Capacity of the per-core remote-function FIFO.
pub const RFN_QUEUE_CAP: usize = 32;
