//! LCPU subsystem tests

mod registry;

#[cfg(feature = "smp")]
mod startup;
