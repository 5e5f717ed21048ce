use thiserror::Error;

/// A condition that makes `supervise` unable to keep its contract. Every variant is fatal.
#[derive(Debug, Error)]
pub enum Error {
    #[error("unable to supervise descendants: {0}")]
    SanityCheck(#[from] supervisefx::process::SanityError),

    #[error("inexplicable partial read from {channel}: expected {expected} bytes, got {actual}")]
    PartialRead {
        channel: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("inexplicable partial write on {channel}: expected {expected} bytes, wrote {actual}")]
    PartialWrite {
        channel: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("failed to read from control channel: {0}")]
    ControlRead(std::io::Error),

    #[error("failed to write to status channel: {0}")]
    StatusWrite(std::io::Error),

    #[error("failed to set up {name} signal source: {source}")]
    SignalSource {
        name: &'static str,
        source: std::io::Error,
    },

    #[error("failed to read from {name} signal source: {source}")]
    SignalRead {
        name: &'static str,
        source: std::io::Error,
    },

    #[error("poll() failed: {0}")]
    Poll(std::io::Error),

    #[error("error event returned by poll for a signal source")]
    PollError,

    #[error("failed to collect children: {0}")]
    Wait(std::io::Error),

    #[error("failed to terminate descendants: {0}")]
    Filicide(std::io::Error),

    #[error("{0}")]
    Protocol(#[from] supervise_sdk::Error),
}
