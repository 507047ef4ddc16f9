//! nexa-unicore — unikernel concurrency core
//!
//! This crate provides the multi-processor substrate of a unikernel-style
//! kernel:
//!
//! - **LCPU subsystem** (`lcpu`): one control block per logical CPU, an
//!   atomically inspected lifecycle state machine, secondary-core startup,
//!   and remote-function execution via dedicated run/wakeup IPIs.
//! - **Scheduler framework** (`sched`): policy-independent thread creation,
//!   admission, termination and deferred garbage collection on top of
//!   pluggable scheduler backends.
//!
//! Platform interrupt-controller drivers and CPU discovery (ACPI/MADT) live
//! outside this crate; they plug in through the traits in `lcpu::platform`.
//! An x86_64 implementation of those traits is provided in `arch::x86_64`.

#![no_std]

extern crate alloc;

pub mod arch;
pub mod errno;
pub mod heap;
pub mod lcpu;
pub mod logger;
pub mod sched;
pub mod serial;

// ===========================================================================
// Kernel logging macros
// ===========================================================================

#[macro_export]
macro_rules! klog {
    ($level:expr, $($arg:tt)*) => {{
        $crate::logger::log($level, format_args!($($arg)*));
    }};
}

#[macro_export]
macro_rules! kfatal {
    ($($arg:tt)*) => {{
        $crate::klog!($crate::logger::LogLevel::FATAL, $($arg)*);
    }};
}

#[macro_export]
macro_rules! kerror {
    ($($arg:tt)*) => {{
        $crate::klog!($crate::logger::LogLevel::ERROR, $($arg)*);
    }};
}

#[macro_export]
macro_rules! kwarn {
    ($($arg:tt)*) => {{
        $crate::klog!($crate::logger::LogLevel::WARN, $($arg)*);
    }};
}

#[macro_export]
macro_rules! kinfo {
    ($($arg:tt)*) => {{
        $crate::klog!($crate::logger::LogLevel::INFO, $($arg)*);
    }};
}

#[macro_export]
macro_rules! kdebug {
    ($($arg:tt)*) => {{
        $crate::klog!($crate::logger::LogLevel::DEBUG, $($arg)*);
    }};
}

#[macro_export]
macro_rules! ktrace {
    ($($arg:tt)*) => {{
        $crate::klog!($crate::logger::LogLevel::TRACE, $($arg)*);
    }};
}
