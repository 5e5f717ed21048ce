use std::{
    mem::MaybeUninit,
    os::fd::{AsFd, AsRawFd, BorrowedFd, FromRawFd, RawFd},
};
use supervisefx_io::{Channel, Transfer};

/// Terminal line hangup.
pub const SIGHUP: i32 = libc::SIGHUP;

/// Interrupt program.
pub const SIGINT: i32 = libc::SIGINT;

/// Quit program.
pub const SIGQUIT: i32 = libc::SIGQUIT;

/// Write on a pipe with no reader.
pub const SIGPIPE: i32 = libc::SIGPIPE;

/// Software termination signal.
pub const SIGTERM: i32 = libc::SIGTERM;

/// Child status has changed.
pub const SIGCHLD: i32 = libc::SIGCHLD;

/// Stops the process. Cannot be caught or ignored.
pub const SIGSTOP: i32 = libc::SIGSTOP;

/// Kills the process.
pub const SIGKILL: i32 = libc::SIGKILL;

/// A readable descriptor that becomes ready whenever one of its signals is delivered to the process.
///
/// Creating a source resets its signals to the default disposition and blocks them, so they are only ever observed through
/// the descriptor. Notifications coalesce: several deliveries of the same signal may be read as one record, so a source
/// tells only that *something* happened. Consumers should re-query the state they care about.
#[derive(Debug)]
pub struct SignalSource(Channel);
impl SignalSource {
    /// Creates a new source for all signals in `signals`.
    ///
    /// # Errors
    /// An `Err(_)` is returned if the underlying OS function failed.
    pub fn new(signals: &[i32]) -> std::io::Result<Self> {
        let set = sigset(signals)?;
        for &signum in signals {
            set_disposition(signum, libc::SIG_DFL)?;
        }
        block(&set)?;

        let fd = unsafe { libc::signalfd(-1, &set, libc::SFD_NONBLOCK | libc::SFD_CLOEXEC) };
        match fd {
            -1 => Err(std::io::Error::last_os_error()),
            fd => Ok(Self(unsafe { Channel::from_raw_fd(fd) })),
        }
    }

    /// Creates a source that fires on every child state change.
    pub fn child() -> std::io::Result<Self> {
        Self::new(&[SIGCHLD])
    }

    /// Creates a source that fires on every terminating-class signal listed in [`crate::FATAL_SIGNALS`].
    pub fn fatal() -> std::io::Result<Self> {
        Self::new(&crate::FATAL_SIGNALS)
    }

    /// Consumes every pending notification, returning how many were read.
    ///
    /// # Errors
    /// An `Err(_)` is returned if the underlying OS function failed, or a notification record was read partially, which the
    /// kernel never does for signal descriptors.
    pub fn drain(&self) -> std::io::Result<usize> {
        let mut count = 0;
        let mut buf = [0u8; std::mem::size_of::<libc::signalfd_siginfo>()];
        loop {
            match self.0.read_record(&mut buf)? {
                Transfer::Done => count += 1,
                Transfer::WouldBlock => return Ok(count),
                Transfer::Closed | Transfer::Partial(_) => {
                    return Err(std::io::Error::new(
                        std::io::ErrorKind::InvalidData,
                        "short read from signal descriptor",
                    ));
                }
            }
        }
    }
}
impl AsFd for SignalSource {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.0.as_fd()
    }
}
impl AsRawFd for SignalSource {
    fn as_raw_fd(&self) -> RawFd {
        self.0.as_raw_fd()
    }
}

/// Ignores a signal.
///
/// # Errors
/// An `Err(_)` is returned if the underlying OS function failed.
pub fn ignore(signum: i32) -> std::io::Result<()> {
    set_disposition(signum, libc::SIG_IGN)
}

/// Makes writes to a disconnected pipe or socket fail with `EPIPE` instead of killing the process.
///
/// # Errors
/// An `Err(_)` is returned if the underlying OS function failed.
pub fn disable_sigpipe() -> std::io::Result<()> {
    ignore(SIGPIPE)
}

fn sigset(signals: &[i32]) -> std::io::Result<libc::sigset_t> {
    let mut set = MaybeUninit::<libc::sigset_t>::uninit();
    unsafe {
        if libc::sigemptyset(set.as_mut_ptr()) == -1 {
            return Err(std::io::Error::last_os_error());
        }
        for &signum in signals {
            if libc::sigaddset(set.as_mut_ptr(), signum) == -1 {
                return Err(std::io::Error::last_os_error());
            }
        }
        Ok(set.assume_init())
    }
}

fn block(set: &libc::sigset_t) -> std::io::Result<()> {
    let result = unsafe { libc::sigprocmask(libc::SIG_BLOCK, set, std::ptr::null_mut()) };
    match result {
        0 => Ok(()),
        _ => Err(std::io::Error::last_os_error()),
    }
}

fn set_disposition(signum: i32, handler: libc::sighandler_t) -> std::io::Result<()> {
    unsafe {
        let mut action: libc::sigaction = std::mem::zeroed();
        action.sa_sigaction = handler;
        if libc::sigemptyset(&mut action.sa_mask) == -1 {
            return Err(std::io::Error::last_os_error());
        }
        match libc::sigaction(signum, &action, std::ptr::null_mut()) {
            0 => Ok(()),
            _ => Err(std::io::Error::last_os_error()),
        }
    }
}
