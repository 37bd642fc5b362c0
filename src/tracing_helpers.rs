//! Logging macros.
//!
//! With the `tracing` feature these forward to the `tracing` crate; without
//! it they expand to nothing.
//!
//! ```bash
//! RUST_LOG=cbtrie=trace cargo test --features tracing prefix_chain
//! ```
//!
//! Descents log at trace level where they stop, deletions log at debug level
//! which unlink case they took.

#![allow(unused_macros, unused_imports)]

/// Trace-level logging. No-op without the `tracing` feature.
#[cfg(feature = "tracing")]
macro_rules! trace_log {
    ($($arg:tt)*) => {
        tracing::trace!($($arg)*)
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_log {
    ($($arg:tt)*) => {};
}

/// Debug-level logging. No-op without the `tracing` feature.
#[cfg(feature = "tracing")]
macro_rules! debug_log {
    ($($arg:tt)*) => {
        tracing::debug!($($arg)*)
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! debug_log {
    ($($arg:tt)*) => {};
}

pub(crate) use debug_log;
pub(crate) use trace_log;
