//! Signal handling for Linux.
//!
//! Signals are never handled asynchronously. Each class of signal the supervisor cares about is blocked and routed into a
//! [`SignalSource`], a readable descriptor that can be multiplexed together with the other channels.

cfg_if::cfg_if! {
    if #[cfg(target_os = "linux")] {
        #[path = "linux.rs"]
        mod sys;
    } else {
        std::compile_error!("This target is not supported by `supervise` yet. `signalfd(2)` is required.");
    }
}

pub use sys::*;

/// Signals that make the supervisor terminate its descendants.
pub const FATAL_SIGNALS: [i32; 4] = [SIGHUP, SIGINT, SIGQUIT, SIGTERM];

