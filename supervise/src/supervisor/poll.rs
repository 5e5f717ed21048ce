//! Readiness multiplexing over the four descriptors of the supervisor.
//!
//! The set is fixed in size and order, so it lives on the stack and needs no allocation per iteration.

use std::os::fd::RawFd;

/// Index of a descriptor in the [`PollSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Control = 0,
    Status = 1,
    Child = 2,
    Fatal = 3,
}

/// Events reported for one slot after [`PollSet::wait`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Events(libc::c_short);
impl Events {
    /// Data can be read without blocking.
    pub fn readable(self) -> bool {
        self.0 & libc::POLLIN != 0
    }

    /// The peer hung up, the descriptor is in an error state or it is not open.
    pub fn hangup(self) -> bool {
        self.0 & (libc::POLLHUP | libc::POLLERR | libc::POLLNVAL) != 0
    }

    /// Like [`Events::hangup`], but also counts the writing side of a stream shutting down.
    pub fn closed(self) -> bool {
        self.hangup() || self.0 & libc::POLLRDHUP != 0
    }
}

/// What became ready during one [`PollSet::wait`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Readiness {
    pub control: Events,
    pub status: Events,
    pub child: Events,
    pub fatal: Events,
}

/// The `pollfd` array of the supervisor.
pub struct PollSet {
    fds: [libc::pollfd; 4],
}
impl PollSet {
    /// Creates a new [`PollSet`].
    ///
    /// The status channel is never polled for input; hangups and errors are reported on it regardless of the requested
    /// events.
    pub fn new(control: RawFd, status: RawFd, child: RawFd, fatal: RawFd) -> Self {
        let entry = |fd, events| libc::pollfd {
            fd,
            events,
            revents: 0,
        };
        Self {
            fds: [
                entry(control, libc::POLLIN | libc::POLLRDHUP),
                entry(status, 0),
                entry(child, libc::POLLIN),
                entry(fatal, libc::POLLIN),
            ],
        }
    }

    /// Stops watching the descriptor in `slot`. `poll` skips negative descriptors.
    pub fn disable(&mut self, slot: Slot) {
        let entry = &mut self.fds[slot as usize];
        entry.fd = -1;
        entry.revents = 0;
    }

    /// Blocks until at least one watched descriptor is ready.
    ///
    /// # Errors
    /// An `Err(_)` is returned if the underlying OS function failed.
    pub fn wait(&mut self) -> std::io::Result<Readiness> {
        loop {
            let result = unsafe {
                libc::poll(
                    self.fds.as_mut_ptr(),
                    self.fds.len() as libc::nfds_t,
                    -1,
                )
            };
            if result == -1 {
                let err = std::io::Error::last_os_error();
                if err.kind() == std::io::ErrorKind::Interrupted {
                    continue;
                }
                return Err(err);
            }

            let revents = |slot: Slot| Events(self.fds[slot as usize].revents);
            return Ok(Readiness {
                control: revents(Slot::Control),
                status: revents(Slot::Status),
                child: revents(Slot::Child),
                fatal: revents(Slot::Fatal),
            });
        }
    }
}
