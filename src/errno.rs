//! Kernel error codes
//!
//! Error returns follow the negative-errno convention: recoverable failures
//! come back as `Err(code)` with one of the constants below, fatal logic
//! errors (corrupted concurrency invariants) never return and go through
//! the kernel panic path instead.

pub const EPERM: i32 = 1; // Operation not permitted
pub const EIO: i32 = 5; // I/O error
pub const EAGAIN: i32 = 11; // Try again
pub const ENOMEM: i32 = 12; // Out of memory
pub const EFAULT: i32 = 14; // Bad address
pub const EBUSY: i32 = 16; // Device or resource busy
pub const EEXIST: i32 = 17; // Already exists
pub const EINVAL: i32 = 22; // Invalid argument
pub const ENOSYS: i32 = 38; // Function not implemented
pub const ENOTSUP: i32 = 95; // Operation not supported
pub const ETIMEDOUT: i32 = 110; // Timed out

/// Result alias used throughout the kernel core.
pub type KernResult<T> = core::result::Result<T, i32>;
