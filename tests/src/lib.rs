//! nexa-unicore Test Suite
//!
//! This crate tests kernel code by directly including kernel source files.
//! This bypasses no_std restrictions while testing the actual kernel logic.
//!
//! # How it works
//! 1. We define stub macros (kinfo!, ktrace!, etc.) that map to eprintln! or no-op
//! 2. We use `#[path = "..."]` to include kernel source files directly
//! 3. The `core::` references in kernel code work because std re-exports core
//!
//! This allows testing real kernel code without running in QEMU.

// Re-export alloc crate for kernel code that uses alloc::vec, alloc::sync, etc.
extern crate alloc;

// ===========================================================================
// Kernel macro stubs - these replace the kernel's logging macros for testing
// ===========================================================================

/// Stub for kernel's kinfo! macro - prints to stderr in tests
#[macro_export]
macro_rules! kinfo {
    ($($arg:tt)*) => {{
        #[cfg(test)]
        eprintln!("[INFO] {}", format_args!($($arg)*));
    }};
}

/// Stub for kernel's ktrace! macro - no-op in tests (too verbose)
#[macro_export]
macro_rules! ktrace {
    ($($arg:tt)*) => {{}};
}

/// Stub for kernel's kwarn! macro - prints to stderr in tests
#[macro_export]
macro_rules! kwarn {
    ($($arg:tt)*) => {{
        #[cfg(test)]
        eprintln!("[WARN] {}", format_args!($($arg)*));
    }};
}

/// Stub for kernel's kerror! macro - prints to stderr in tests
#[macro_export]
macro_rules! kerror {
    ($($arg:tt)*) => {{
        #[cfg(test)]
        eprintln!("[ERROR] {}", format_args!($($arg)*));
    }};
}

/// Stub for kernel's kfatal! macro - prints to stderr in tests
#[macro_export]
macro_rules! kfatal {
    ($($arg:tt)*) => {{
        #[cfg(test)]
        eprintln!("[FATAL] {}", format_args!($($arg)*));
    }};
}

/// Stub for kernel's kdebug! macro - no-op in tests
#[macro_export]
macro_rules! kdebug {
    ($($arg:tt)*) => {{}};
}

// ===========================================================================
// Import kernel source files directly using #[path]
// ===========================================================================

// Error codes and the kernel Result alias
#[path = "../../src/errno.rs"]
pub mod errno;

// LCPU subsystem (state machine, registry, startup, remote execution)
#[path = "../../src/lcpu/mod.rs"]
pub mod lcpu;

// Scheduler framework (threads, policies, termination, GC)
#[path = "../../src/sched/mod.rs"]
pub mod sched;

// ===========================================================================
// Hardware-level mocks (simulates underlying hardware, NOT kernel functionality)
// ===========================================================================


// ===========================================================================
// Test modules
// ===========================================================================

#[cfg(test)]
mod lcpu_tests;
