//! # Supervise Wire Protocol
//! The protocol `supervise` speaks on its two channels.
//!
//! ## Framing
//! There is no length prefix and no versioning. Each channel carries exactly one record shape, and the fixed record size is
//! the framing. Every record is much smaller than `PIPE_BUF`, so a single `read` or `write` transfers either the whole
//! record or nothing. Observing a partial record means a broken invariant, and is reported as [`Error::Truncated`].
//!
//! ## Control Channel
//! The owner writes [`ControlRequest`] records asking the supervisor to send a signal to one of its children:
//!
//! | Offset | Type  | Field    |
//! |--------|-------|----------|
//! | 0      | `i32` | `pid`    |
//! | 4      | `i32` | `signal` |
//!
//! ## Status Channel
//! The supervisor writes one [`ChildStatus`] record for every child it reaps:
//!
//! | Offset | Type  | Field    |
//! |--------|-------|----------|
//! | 0      | `i32` | `pid`    |
//! | 4      | `u32` | `uid`    |
//! | 8      | `i32` | `signal` |
//! | 12     | `i32` | `status` |
//! | 16     | `i32` | `code`   |
//!
//! All fields are in host byte order, since both ends always run on the same machine.

use crate::Error;

/// A request to deliver `signal` to the child `pid`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ControlRequest {
    pub pid: i32,
    pub signal: i32,
}
impl ControlRequest {
    /// Size of an encoded control record, in bytes.
    pub const SIZE: usize = 8;

    /// Creates a new [`ControlRequest`].
    pub const fn new(pid: i32, signal: i32) -> Self {
        Self { pid, signal }
    }

    /// Encodes the request into its wire representation.
    pub fn encode(&self) -> [u8; Self::SIZE] {
        let mut buf = [0u8; Self::SIZE];
        buf[0..4].copy_from_slice(&self.pid.to_ne_bytes());
        buf[4..8].copy_from_slice(&self.signal.to_ne_bytes());
        buf
    }

    /// Decodes a request from its wire representation.
    ///
    /// # Errors
    /// An `Err(_)` is returned if `buf` is not exactly [`ControlRequest::SIZE`] bytes long.
    pub fn decode(buf: &[u8]) -> Result<Self, Error> {
        let buf = exact::<{ Self::SIZE }>(buf)?;
        Ok(Self {
            pid: i32_at(buf, 0),
            signal: i32_at(buf, 4),
        })
    }
}

/// How a reaped child changed state.
///
/// The numbering follows the kernel's `CLD_*` codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum Disposition {
    /// The child exited normally.
    Exited = 1,

    /// The child was killed by a signal.
    Killed = 2,

    /// The child was killed by a signal and dumped core.
    Dumped = 3,

    /// A traced child has trapped.
    Trapped = 4,

    /// The child was stopped by a signal.
    Stopped = 5,

    /// A stopped child was continued.
    Continued = 6,
}
impl Disposition {
    /// Returns the wire code of the disposition.
    pub const fn code(self) -> i32 {
        self as i32
    }
}
impl TryFrom<i32> for Disposition {
    type Error = Error;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        Ok(match code {
            1 => Self::Exited,
            2 => Self::Killed,
            3 => Self::Dumped,
            4 => Self::Trapped,
            5 => Self::Stopped,
            6 => Self::Continued,
            x => return Err(Error::UnknownDisposition(x)),
        })
    }
}

/// A snapshot of a child's state change, emitted once per reaped child.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChildStatus {
    /// Process ID of the child.
    pub pid: i32,

    /// Real user ID of the child.
    pub uid: u32,

    /// Signal that terminated the child, or `0` if it was not terminated by a signal.
    pub signal: i32,

    /// Raw status: the exit code if the child exited, otherwise the signal number.
    pub status: i32,

    /// How the child changed state.
    pub disposition: Disposition,
}
impl ChildStatus {
    /// Size of an encoded status record, in bytes.
    pub const SIZE: usize = 20;

    /// Returns the exit code if the child exited normally.
    pub fn code(&self) -> Option<i32> {
        match self.disposition {
            Disposition::Exited => Some(self.status),
            _ => None,
        }
    }

    /// Returns the terminating signal if the child was killed.
    pub fn signal(&self) -> Option<i32> {
        match self.disposition {
            Disposition::Killed | Disposition::Dumped => Some(self.signal),
            _ => None,
        }
    }

    /// Returns `true` if the child exited with code `0`.
    pub fn is_success(&self) -> bool {
        self.code() == Some(0)
    }

    /// Encodes the status into its wire representation.
    pub fn encode(&self) -> [u8; Self::SIZE] {
        let mut buf = [0u8; Self::SIZE];
        buf[0..4].copy_from_slice(&self.pid.to_ne_bytes());
        buf[4..8].copy_from_slice(&self.uid.to_ne_bytes());
        buf[8..12].copy_from_slice(&self.signal.to_ne_bytes());
        buf[12..16].copy_from_slice(&self.status.to_ne_bytes());
        buf[16..20].copy_from_slice(&self.disposition.code().to_ne_bytes());
        buf
    }

    /// Decodes a status from its wire representation.
    ///
    /// # Errors
    /// An `Err(_)` is returned if `buf` is not exactly [`ChildStatus::SIZE`] bytes long, or the disposition tag is unknown.
    pub fn decode(buf: &[u8]) -> Result<Self, Error> {
        let buf = exact::<{ Self::SIZE }>(buf)?;
        Ok(Self {
            pid: i32_at(buf, 0),
            uid: u32::from_ne_bytes([buf[4], buf[5], buf[6], buf[7]]),
            signal: i32_at(buf, 8),
            status: i32_at(buf, 12),
            disposition: Disposition::try_from(i32_at(buf, 16))?,
        })
    }
}

fn exact<const N: usize>(buf: &[u8]) -> Result<&[u8; N], Error> {
    buf.try_into().map_err(|_| Error::Truncated {
        expected: N,
        actual: buf.len(),
    })
}

fn i32_at(buf: &[u8], offset: usize) -> i32 {
    i32::from_ne_bytes([
        buf[offset],
        buf[offset + 1],
        buf[offset + 2],
        buf[offset + 3],
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn control_layout() {
        let buf = ControlRequest::new(4242, libc::SIGTERM).encode();
        assert_eq!(&buf[0..4], &4242i32.to_ne_bytes());
        assert_eq!(&buf[4..8], &libc::SIGTERM.to_ne_bytes());
        assert_eq!(
            ControlRequest::decode(&buf).unwrap(),
            ControlRequest::new(4242, libc::SIGTERM)
        );
    }

    #[test]
    fn records_fit_in_pipe_buf() {
        assert!(ControlRequest::SIZE <= libc::PIPE_BUF);
        assert!(ChildStatus::SIZE <= libc::PIPE_BUF);
    }

    #[test]
    fn truncated_control() {
        let buf = ControlRequest::new(1, 2).encode();
        assert!(matches!(
            ControlRequest::decode(&buf[..5]),
            Err(Error::Truncated {
                expected: 8,
                actual: 5
            })
        ));
    }

    #[test]
    fn status_killed() {
        let status = ChildStatus {
            pid: 77,
            uid: 1000,
            signal: libc::SIGKILL,
            status: libc::SIGKILL,
            disposition: Disposition::Killed,
        };
        let decoded = ChildStatus::decode(&status.encode()).unwrap();
        assert_eq!(decoded, status);
        assert_eq!(decoded.signal(), Some(libc::SIGKILL));
        assert_eq!(decoded.code(), None);
        assert!(!decoded.is_success());
    }

    #[test]
    fn status_exited() {
        let status = ChildStatus {
            pid: 78,
            uid: 0,
            signal: 0,
            status: 0,
            disposition: Disposition::Exited,
        };
        assert!(status.is_success());
        assert_eq!(status.signal(), None);
    }

    #[test]
    fn status_unknown_disposition() {
        let mut buf = ChildStatus {
            pid: 1,
            uid: 0,
            signal: 0,
            status: 0,
            disposition: Disposition::Exited,
        }
        .encode();
        buf[16..20].copy_from_slice(&9i32.to_ne_bytes());
        assert!(matches!(
            ChildStatus::decode(&buf),
            Err(Error::UnknownDisposition(9))
        ));
    }

    #[test]
    fn disposition_codes_match_kernel() {
        assert_eq!(Disposition::Exited.code(), libc::CLD_EXITED);
        assert_eq!(Disposition::Killed.code(), libc::CLD_KILLED);
        assert_eq!(Disposition::Dumped.code(), libc::CLD_DUMPED);
        assert_eq!(Disposition::Trapped.code(), libc::CLD_TRAPPED);
        assert_eq!(Disposition::Stopped.code(), libc::CLD_STOPPED);
        assert_eq!(Disposition::Continued.code(), libc::CLD_CONTINUED);
    }
}
