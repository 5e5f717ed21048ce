//! The control channel: signal requests from the owner.

use crate::error::Error;
use supervise_sdk::protocol::ControlRequest;
use supervisefx::{
    io::{Channel, Transfer},
    process,
};

const CHANNEL: &str = "control channel";

/// State of the control channel after reading everything available.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlOutcome {
    /// Nothing more to read right now.
    Drained,

    /// The owner closed its end.
    Closed,
}

/// Reads and applies every request currently buffered in `control`, which must be non-blocking.
///
/// # Errors
/// An `Err(_)` is returned if reading failed or a request was received partially.
pub fn read_control(control: &Channel) -> Result<ControlOutcome, Error> {
    let mut buf = [0u8; ControlRequest::SIZE];
    loop {
        match control.read_record(&mut buf).map_err(Error::ControlRead)? {
            Transfer::Done => {
                apply(ControlRequest::decode(&buf)?);
            }
            Transfer::WouldBlock => return Ok(ControlOutcome::Drained),
            Transfer::Closed => return Ok(ControlOutcome::Closed),
            Transfer::Partial(actual) => {
                return Err(Error::PartialRead {
                    channel: CHANNEL,
                    expected: buf.len(),
                    actual,
                });
            }
        }
    }
}

/// Delivers `request` if it names a child of the supervisor. Returns `true` if a signal was sent.
///
/// Requests for anything else are dropped; a pid that is not our child may already belong to an unrelated process.
pub fn apply(request: ControlRequest) -> bool {
    let ControlRequest { pid, signal } = request;
    if !process::is_child(pid) {
        tracing::debug!("ignoring signal {signal} for {pid}: not a child");
        return false;
    }

    match process::kill(pid, signal) {
        Ok(()) => {
            tracing::debug!("sent signal {signal} to child {pid}");
            true
        }
        Err(err) => {
            tracing::debug!("failed to send signal {signal} to child {pid}: {err}");
            false
        }
    }
}
