//! A module for working with the descendants of the current process.
//!
//! This is the only place that knows how the process tree is observed and manipulated: registering as a child subreaper,
//! probing children with `waitid(2)`, enumerating descendants through procfs and terminating them.

cfg_if::cfg_if! {
    if #[cfg(target_os = "linux")] {
        #[path = "linux.rs"]
        mod sys;
    } else {
        std::compile_error!("This target is not supported by `supervise` yet. `PR_SET_CHILD_SUBREAPER` is required.");
    }
}

pub use sys::*;

use thiserror::Error;

/// Describes the result of calling `wait`-series methods.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Wait {
    pid: Pid,
    uid: u32,
    pub exit_status: ExitStatus,
}
impl Wait {
    /// Creates a new [`Wait`] object.
    pub fn new(pid: Pid, uid: u32, exit_status: ExitStatus) -> Self {
        Self {
            pid,
            uid,
            exit_status,
        }
    }

    /// Returns the OS-assigned process identifier associated with the wait result.
    pub fn pid(&self) -> Pid {
        self.pid
    }

    /// Returns the real user ID of the process.
    pub fn uid(&self) -> u32 {
        self.uid
    }

    /// Returns the exit code if the process terminated normally by a call to `exit`.
    pub fn code(&self) -> Option<libc::c_int> {
        match self.exit_status {
            ExitStatus::Exited(x) => Some(x),
            _ => None,
        }
    }

    /// Returns the terminating signal if the process was terminated by a signal.
    pub fn signal(&self) -> Option<libc::c_int> {
        match self.exit_status {
            ExitStatus::Signaled { signum, .. } => Some(signum),
            _ => None,
        }
    }
}

/// Represents to a state change of a child process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    /// The process was terminated normally by a call to [`libc::_exit`] or [`libc::exit`].
    Exited(libc::c_int),

    /// The process was terminated due to receipt of a signal.
    Signaled {
        signum: libc::c_int,
        core_dumped: bool,
    },

    /// A traced process has trapped.
    Trapped(libc::c_int),

    /// The process was stopped by a signal.
    Stopped(libc::c_int),

    /// The process was continued by `SIGCONT`.
    Continued(libc::c_int),
}
impl ExitStatus {
    /// Converts from the `si_code` and `si_status` of a `siginfo_t` filled in by `waitid`.
    pub fn from_siginfo(code: libc::c_int, status: libc::c_int) -> Option<Self> {
        Some(match code {
            libc::CLD_EXITED => Self::Exited(status),
            libc::CLD_KILLED => Self::Signaled {
                signum: status,
                core_dumped: false,
            },
            libc::CLD_DUMPED => Self::Signaled {
                signum: status,
                core_dumped: true,
            },
            libc::CLD_TRAPPED => Self::Trapped(status),
            libc::CLD_STOPPED => Self::Stopped(status),
            libc::CLD_CONTINUED => Self::Continued(status),
            _ => return None,
        })
    }

    /// Returns the raw `si_status` value this was built from.
    pub fn raw(&self) -> libc::c_int {
        match *self {
            Self::Exited(x) | Self::Trapped(x) | Self::Stopped(x) | Self::Continued(x) => x,
            Self::Signaled { signum, .. } => signum,
        }
    }
}

/// Outcome of a non-blocking wait for any child.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reaped {
    /// A child changed state and has been collected.
    Child(Wait),

    /// Children exist, but none of them is waitable right now.
    NoneReady,

    /// The process has no children at all.
    NoChildren,
}

/// An error occurred while checking whether the process can supervise its descendants.
#[derive(Debug, Error)]
pub enum SanityError {
    #[error("failed to become a child subreaper: {0}")]
    Subreaper(std::io::Error),

    #[error("the kernel did not register the process as a child subreaper")]
    NotSubreaper,

    #[error("descendants cannot be enumerated through `{path}`: {source}")]
    Enumeration {
        path: String,
        source: std::io::Error,
    },
}
