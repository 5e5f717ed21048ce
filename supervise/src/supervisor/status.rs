//! The status channel: one record per reaped child, for as long as someone listens.

use crate::error::Error;
use std::os::fd::{AsRawFd, RawFd};
use supervise_sdk::protocol::ChildStatus;
use supervisefx::io::{Channel, Transfer};

const CHANNEL: &str = "status channel";

/// The write side of the status channel, or nothing once the reader went away.
#[derive(Debug)]
pub struct StatusChannel(Option<Channel>);
impl StatusChannel {
    /// Creates a new, open [`StatusChannel`].
    pub fn new(channel: Channel) -> Self {
        Self(Some(channel))
    }

    /// Returns `true` unless the channel has been closed.
    pub fn is_open(&self) -> bool {
        self.0.is_some()
    }

    /// Returns the descriptor of the channel, or `-1` once closed.
    pub fn raw_fd(&self) -> RawFd {
        self.0.as_ref().map_or(-1, AsRawFd::as_raw_fd)
    }

    /// Closes the channel. Later reports are discarded.
    pub fn close(&mut self) {
        if self.0.take().is_some() {
            tracing::debug!("status channel closed");
        }
    }

    /// Writes one record to the channel.
    ///
    /// A reader that went away closes the channel instead of failing.
    ///
    /// # Errors
    /// An `Err(_)` is returned if the record could not be written as a whole for any other reason, including the channel
    /// being full.
    pub fn report(&mut self, status: &ChildStatus) -> Result<(), Error> {
        let Some(channel) = &self.0 else {
            return Ok(());
        };

        let buf = status.encode();
        match channel.write_record(&buf) {
            Ok(Transfer::Done) => Ok(()),
            Ok(Transfer::Partial(actual)) => Err(Error::PartialWrite {
                channel: CHANNEL,
                expected: buf.len(),
                actual,
            }),
            Ok(Transfer::WouldBlock) => Err(Error::StatusWrite(
                std::io::ErrorKind::WouldBlock.into(),
            )),
            Ok(Transfer::Closed) => {
                self.close();
                Ok(())
            }
            Err(err) if matches!(err.raw_os_error(), Some(libc::EPIPE | libc::ECONNRESET)) => {
                tracing::debug!("status reader went away: {err}");
                self.close();
                Ok(())
            }
            Err(err) => Err(Error::StatusWrite(err)),
        }
    }
}
