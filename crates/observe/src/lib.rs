//! Shared logging setup.

pub mod tracing;
