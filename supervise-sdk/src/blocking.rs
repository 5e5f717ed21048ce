//! Blocking client for the owner side of the supervise channels.

use crate::{
    Error,
    protocol::{ChildStatus, ControlRequest},
};
use std::io::{ErrorKind, Read, Write};

/// Writes [`ControlRequest`] records to a supervisor's control channel.
#[derive(Debug)]
pub struct Controller<W> {
    inner: W,
}
impl<W: Write> Controller<W> {
    /// Creates a new [`Controller`] writing to `inner`.
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Asks the supervisor to send `signal` to its child `pid`.
    ///
    /// Requests naming a process that is not a child of the supervisor are silently dropped by the supervisor.
    ///
    /// # Errors
    /// An `Err(_)` is returned if the record could not be written as a whole.
    pub fn send_signal(&mut self, pid: i32, signal: i32) -> Result<(), Error> {
        let buf = ControlRequest::new(pid, signal).encode();
        loop {
            match self.inner.write(&buf) {
                Ok(n) if n == buf.len() => return Ok(()),
                Ok(0) => return Err(Error::Closed),
                Ok(n) => {
                    return Err(Error::Truncated {
                        expected: buf.len(),
                        actual: n,
                    });
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::BrokenPipe => return Err(Error::Closed),
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// Asks the supervisor to send `SIGTERM` to its child `pid`.
    pub fn terminate(&mut self, pid: i32) -> Result<(), Error> {
        self.send_signal(pid, libc::SIGTERM)
    }

    /// Asks the supervisor to send `SIGKILL` to its child `pid`.
    pub fn kill(&mut self, pid: i32) -> Result<(), Error> {
        self.send_signal(pid, libc::SIGKILL)
    }

    /// Consumes the controller, returning the underlying writer.
    ///
    /// Dropping the writer closes the control channel, which makes the supervisor terminate all of its descendants.
    pub fn into_inner(self) -> W {
        self.inner
    }
}

/// Reads [`ChildStatus`] records from a supervisor's status channel.
#[derive(Debug)]
pub struct StatusReader<R> {
    inner: R,
}
impl<R: Read> StatusReader<R> {
    /// Creates a new [`StatusReader`] reading from `inner`.
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    /// Receives the next status record, blocking until one is available.
    ///
    /// # Errors
    /// [`Error::Closed`] is returned once the supervisor has gone away. A partially received record yields
    /// [`Error::Truncated`].
    pub fn recv(&mut self) -> Result<ChildStatus, Error> {
        let mut buf = [0u8; ChildStatus::SIZE];
        loop {
            match self.inner.read(&mut buf) {
                Ok(0) => return Err(Error::Closed),
                Ok(n) => return ChildStatus::decode(&buf[..n]),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(err.into()),
            }
        }
    }
}
impl<R: Read> Iterator for StatusReader<R> {
    type Item = Result<ChildStatus, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.recv() {
            Err(Error::Closed) => None,
            x => Some(x),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Disposition;

    #[test]
    fn controller_writes_one_record() {
        let mut controller = Controller::new(Vec::new());
        controller.terminate(10).unwrap();
        controller.kill(11).unwrap();
        let buf = controller.into_inner();

        assert_eq!(buf.len(), 2 * ControlRequest::SIZE);
        assert_eq!(
            ControlRequest::decode(&buf[..8]).unwrap(),
            ControlRequest::new(10, libc::SIGTERM)
        );
        assert_eq!(
            ControlRequest::decode(&buf[8..]).unwrap(),
            ControlRequest::new(11, libc::SIGKILL)
        );
    }

    #[test]
    fn reader_iterates_until_closed() {
        let first = ChildStatus {
            pid: 5,
            uid: 0,
            signal: 0,
            status: 3,
            disposition: Disposition::Exited,
        };
        let second = ChildStatus {
            pid: 6,
            uid: 0,
            signal: libc::SIGTERM,
            status: libc::SIGTERM,
            disposition: Disposition::Killed,
        };
        let mut stream = Vec::new();
        stream.extend_from_slice(&first.encode());
        stream.extend_from_slice(&second.encode());

        let statuses = StatusReader::new(&stream[..])
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        assert_eq!(statuses, vec![first, second]);
    }

    #[test]
    fn reader_rejects_partial_record() {
        let stream = [0u8; 7];
        let mut reader = StatusReader::new(&stream[..]);
        assert!(matches!(
            reader.recv(),
            Err(Error::Truncated {
                expected: 20,
                actual: 7
            })
        ));
    }
}
