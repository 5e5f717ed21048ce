//! Collection of terminated children.

use super::status::StatusChannel;
use crate::error::Error;
use supervise_sdk::protocol::{ChildStatus, Disposition};
use supervisefx::process::{self, ExitStatus, Reaped, Wait};

/// State of the subtree after collecting every waitable child.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReapOutcome {
    /// Children remain, none of them waitable.
    Drained,

    /// No children remain.
    Extinct,
}

/// Collects every waitable child, reporting each one on `status`.
///
/// # Errors
/// An `Err(_)` is returned if waiting or reporting failed.
pub fn reap(status: &mut StatusChannel) -> Result<ReapOutcome, Error> {
    loop {
        match process::wait_any_nonblocking().map_err(Error::Wait)? {
            Reaped::Child(wait) => {
                tracing::debug!("reaped child {}: {:?}", wait.pid(), wait.exit_status);
                status.report(&to_status(&wait))?;
            }
            Reaped::NoneReady => return Ok(ReapOutcome::Drained),
            Reaped::NoChildren => return Ok(ReapOutcome::Extinct),
        }
    }
}

/// Converts a wait result into its status record.
pub fn to_status(wait: &Wait) -> ChildStatus {
    let disposition = match wait.exit_status {
        ExitStatus::Exited(_) => Disposition::Exited,
        ExitStatus::Signaled {
            core_dumped: false, ..
        } => Disposition::Killed,
        ExitStatus::Signaled {
            core_dumped: true, ..
        } => Disposition::Dumped,
        ExitStatus::Trapped(_) => Disposition::Trapped,
        ExitStatus::Stopped(_) => Disposition::Stopped,
        ExitStatus::Continued(_) => Disposition::Continued,
    };

    ChildStatus {
        pid: wait.pid(),
        uid: wait.uid(),
        signal: wait.signal().unwrap_or(0),
        status: wait.exit_status.raw(),
        disposition,
    }
}
