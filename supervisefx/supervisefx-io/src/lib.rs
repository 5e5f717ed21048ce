//! Descriptor-level I/O for fixed-size records.

cfg_if::cfg_if! {
    if #[cfg(target_os = "linux")] {
        mod channel;
        pub use channel::*;
    } else {
        std::compile_error!("This target is not supported by `supervise` yet.");
    }
}

/// Outcome of transferring one whole record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transfer {
    /// The whole record was transferred.
    Done,

    /// The descriptor is non-blocking and nothing could be transferred right now.
    WouldBlock,

    /// End of input was reached.
    Closed,

    /// Only part of the record was transferred. Carries the number of bytes actually transferred.
    Partial(usize),
}
