//! # supervise
//!
//! Becomes the subreaper of its whole process subtree, relays signal requests read from standard input to its children,
//! and reports every reaped child on standard output. Once the subtree is gone, it exits with code `0`.

pub mod env;
pub mod error;
pub mod shutdown;
pub mod supervisor;

use error::Error;
use shutdown::{Filicide, Shutdown};
use std::{os::fd::FromRawFd, process::ExitCode};
use supervisefx::prelude::*;
use supervisor::Supervisor;

/// Descriptor of the control channel.
const CONTROL_FD: i32 = 0;

/// Descriptor of the status channel.
const STATUS_FD: i32 = 1;

/// Entrypoint of the program.
fn main() -> ExitCode {
    env::console().logger().init(); // Configures and initializes the logger
    supervisefx::signal::disable_sigpipe().unwrap_log("unable to ignore SIGPIPE");
    if let Err(err) = supervisefx::process::sanity_check() {
        return fatal(err.into());
    }

    // From here on, every exit path goes through the shutdown guard.
    let shutdown = Shutdown::new(Filicide);

    // Safety: descriptors 0 and 1 are handed over by our owner and are used by nothing else in this process.
    let (control, status) = unsafe {
        (
            Channel::from_raw_fd(CONTROL_FD),
            Channel::from_raw_fd(STATUS_FD),
        )
    };
    if let Err(err) = control.set_nonblocking(true) {
        drop(shutdown);
        return fatal(Error::ControlRead(err));
    }

    let mut supervisor = match Supervisor::new(control, status, shutdown) {
        Ok(x) => x,
        Err(err) => return fatal(err),
    };
    let result = supervisor.run();
    drop(supervisor);

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => fatal(err),
    }
}

/// Logs a fatal error and returns the failure exit code.
fn fatal(err: Error) -> ExitCode {
    tracing::error!(target: "console", "{err}");
    ExitCode::FAILURE
}
