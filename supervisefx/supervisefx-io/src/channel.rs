use crate::Transfer;
use std::os::fd::{AsFd, AsRawFd, BorrowedFd, FromRawFd, OwnedFd, RawFd};

/// An owned descriptor that transfers fixed-size records in single system calls.
///
/// Records are expected to be no larger than `PIPE_BUF`, so the kernel moves each one atomically. This type never retries a
/// short transfer; it reports it as [`Transfer::Partial`] and leaves the decision to the caller.
#[derive(Debug)]
pub struct Channel(OwnedFd);
impl Channel {
    /// Creates a pipe, returning `(read_end, write_end)`. Both ends are close-on-exec.
    ///
    /// # Errors
    /// An `Err(_)` is returned if the underlying OS function failed.
    pub fn pipe() -> std::io::Result<(Self, Self)> {
        let mut fds = [-1; 2];
        let result = unsafe { libc::pipe2(fds.as_mut_ptr(), libc::O_CLOEXEC) };
        match result {
            0 => unsafe { Ok((Self::from_raw_fd(fds[0]), Self::from_raw_fd(fds[1]))) },
            _ => Err(std::io::Error::last_os_error()),
        }
    }

    /// Reads one record into `buf` with a single `read` call.
    ///
    /// # Errors
    /// An `Err(_)` is returned if the underlying OS function failed with anything other than `EAGAIN`.
    pub fn read_record(&self, buf: &mut [u8]) -> std::io::Result<Transfer> {
        loop {
            let n = unsafe { libc::read(self.as_raw_fd(), buf.as_mut_ptr() as *mut _, buf.len()) };
            match n {
                0 => return Ok(Transfer::Closed),
                -1 => match std::io::Error::last_os_error() {
                    x if x.kind() == std::io::ErrorKind::Interrupted => continue,
                    x if x.kind() == std::io::ErrorKind::WouldBlock => {
                        return Ok(Transfer::WouldBlock);
                    }
                    x => return Err(x),
                },
                n if n as usize == buf.len() => return Ok(Transfer::Done),
                n => return Ok(Transfer::Partial(n as usize)),
            }
        }
    }

    /// Writes one record from `buf` with a single `write` call.
    ///
    /// # Errors
    /// An `Err(_)` is returned if the underlying OS function failed with anything other than `EAGAIN`. In particular,
    /// writing to a pipe without readers yields `EPIPE`, provided `SIGPIPE` is ignored.
    pub fn write_record(&self, buf: &[u8]) -> std::io::Result<Transfer> {
        loop {
            let n = unsafe { libc::write(self.as_raw_fd(), buf.as_ptr() as *const _, buf.len()) };
            match n {
                -1 => match std::io::Error::last_os_error() {
                    x if x.kind() == std::io::ErrorKind::Interrupted => continue,
                    x if x.kind() == std::io::ErrorKind::WouldBlock => {
                        return Ok(Transfer::WouldBlock);
                    }
                    x => return Err(x),
                },
                n if n as usize == buf.len() => return Ok(Transfer::Done),
                n => return Ok(Transfer::Partial(n as usize)),
            }
        }
    }

    /// Sets whether the channel is in non-blocking mode.
    ///
    /// # Errors
    /// An `Err(_)` is returned if the underlying OS function failed.
    pub fn set_nonblocking(&self, val: bool) -> std::io::Result<()> {
        let fd = self.as_raw_fd();
        unsafe {
            let flags = libc::fcntl(fd, libc::F_GETFL);
            if flags == -1 {
                return Err(std::io::Error::last_os_error());
            }
            let flags = match val {
                true => flags | libc::O_NONBLOCK,
                false => flags & !libc::O_NONBLOCK,
            };
            match libc::fcntl(fd, libc::F_SETFL, flags) {
                -1 => Err(std::io::Error::last_os_error()),
                _ => Ok(()),
            }
        }
    }
}
impl AsFd for Channel {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.0.as_fd()
    }
}
impl AsRawFd for Channel {
    fn as_raw_fd(&self) -> RawFd {
        self.0.as_raw_fd()
    }
}
impl FromRawFd for Channel {
    unsafe fn from_raw_fd(fd: RawFd) -> Self {
        Self(unsafe { OwnedFd::from_raw_fd(fd) })
    }
}
