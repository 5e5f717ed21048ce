use thiserror::Error;

/// Represents to an error occurred while speaking the supervise protocol.
#[derive(Debug, Error)]
pub enum Error {
    /// A record was transferred partially.
    ///
    /// Records are smaller than `PIPE_BUF`, so this indicates a broken peer rather than a recoverable condition.
    #[error("truncated record: expected {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },

    /// The status record carried an unknown disposition tag.
    #[error("unknown disposition code {0}")]
    UnknownDisposition(i32),

    /// The peer closed the channel.
    #[error("channel closed")]
    Closed,

    /// The underlying I/O operation failed.
    #[error("{0}")]
    Io(#[from] std::io::Error),
}
