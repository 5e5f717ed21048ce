//! The supervisor event loop.

pub mod control;
pub mod poll;
pub mod reaper;
pub mod status;

use crate::{
    error::Error,
    shutdown::{Filicide, Killer, Shutdown},
};
use control::ControlOutcome;
use poll::{PollSet, Slot};
use reaper::ReapOutcome;
use status::StatusChannel;
use std::os::fd::AsRawFd;
use supervisefx::prelude::*;

/// Owns every descriptor of the supervisor and the shutdown guard of its subtree.
pub struct Supervisor<K: Killer = Filicide> {
    control: Option<Channel>,
    status: StatusChannel,
    child_source: SignalSource,
    fatal_source: SignalSource,
    poll: PollSet,

    // Dropped last, after every channel is closed: descendants killed on the way out are not reported.
    shutdown: Shutdown<K>,
}
impl<K: Killer> Supervisor<K> {
    /// Creates a new [`Supervisor`], blocking `SIGCHLD` and the fatal signals so they are only seen through their sources.
    ///
    /// `control` must be non-blocking.
    ///
    /// # Errors
    /// An `Err(_)` is returned if a signal source could not be created.
    pub fn new(control: Channel, status: Channel, shutdown: Shutdown<K>) -> Result<Self, Error> {
        let fatal_source = SignalSource::fatal().map_err(|source| Error::SignalSource {
            name: "fatal",
            source,
        })?;
        let child_source = SignalSource::child().map_err(|source| Error::SignalSource {
            name: "child",
            source,
        })?;

        let status = StatusChannel::new(status);
        let poll = PollSet::new(
            control.as_raw_fd(),
            status.raw_fd(),
            child_source.as_raw_fd(),
            fatal_source.as_raw_fd(),
        );

        Ok(Self {
            control: Some(control),
            status,
            child_source,
            fatal_source,
            poll,
            shutdown,
        })
    }

    /// Runs the supervisor until no children remain.
    ///
    /// # Errors
    /// An `Err(_)` is returned on any condition that breaks the supervisor's contract. The subtree is terminated when the
    /// supervisor is dropped.
    pub fn run(&mut self) -> Result<(), Error> {
        // Children that changed state before `SIGCHLD` was blocked raise no notification.
        if self.reap()? == ReapOutcome::Extinct {
            tracing::debug!("no children left at startup");
            return Ok(());
        }

        loop {
            let ready = self.poll.wait().map_err(Error::Poll)?;

            if ready.control.readable() {
                if let Some(control) = &self.control {
                    if control::read_control(control)? == ControlOutcome::Closed {
                        self.close_control()?;
                    }
                }
            }
            if ready.control.closed() {
                self.close_control()?;
            }

            if ready.status.hangup() {
                self.status.close();
                self.poll.disable(Slot::Status);
            }

            if ready.child.readable() {
                self.child_source
                    .drain()
                    .map_err(|source| Error::SignalRead {
                        name: "child",
                        source,
                    })?;
                if self.reap()? == ReapOutcome::Extinct {
                    tracing::debug!("no children left");
                    return Ok(());
                }
            }

            if ready.fatal.readable() {
                let count = self
                    .fatal_source
                    .drain()
                    .map_err(|source| Error::SignalRead {
                        name: "fatal",
                        source,
                    })?;
                tracing::info!("received {count} fatal signal(s), terminating descendants");
                if !self.shutdown.trigger().map_err(Error::Filicide)? {
                    tracing::debug!("descendants are already being terminated");
                }
            }

            if ready.child.hangup() || ready.fatal.hangup() {
                return Err(Error::PollError);
            }
        }
    }

    fn reap(&mut self) -> Result<ReapOutcome, Error> {
        let outcome = reaper::reap(&mut self.status)?;
        if !self.status.is_open() {
            self.poll.disable(Slot::Status);
        }
        Ok(outcome)
    }

    /// The owner no longer wants the subtree. Stay around until every child has been reported.
    fn close_control(&mut self) -> Result<(), Error> {
        if self.control.take().is_none() {
            return Ok(());
        }
        self.poll.disable(Slot::Control);
        tracing::info!("control channel closed, terminating descendants");
        self.shutdown.trigger().map_err(Error::Filicide)?;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::shutdown::tests::CountingKiller;
    use std::{
        process::Command,
        sync::{Mutex, MutexGuard, PoisonError, atomic::Ordering},
    };
    use supervise_sdk::protocol::{ChildStatus, Disposition};
    use supervisefx::process;

    /// Serializes tests that create or reap children, since reaping collects any child of the test process.
    pub(crate) fn lock_children() -> MutexGuard<'static, ()> {
        static CHILDREN: Mutex<()> = Mutex::new(());
        CHILDREN.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Blocks until `pid` has exited, leaving it waitable.
    pub(crate) fn wait_exited(pid: i32) {
        let mut info: libc::siginfo_t = unsafe { std::mem::zeroed() };
        let result = unsafe {
            libc::waitid(
                libc::P_PID,
                pid as libc::id_t,
                &mut info,
                libc::WEXITED | libc::WNOWAIT,
            )
        };
        assert_eq!(result, 0);
    }

    /// Kills the given children and announces their exit to the calling thread only.
    ///
    /// Test threads share the process with the harness, whose other threads leave `SIGCHLD` unblocked, so the kernel's
    /// notification may never reach the child source.
    struct ChildKiller {
        counter: CountingKiller,
        pids: Vec<i32>,
    }
    impl Killer for ChildKiller {
        fn kill_descendants(&self) -> std::io::Result<usize> {
            self.counter.kill_descendants()?;
            for &pid in &self.pids {
                process::kill(pid, libc::SIGKILL)?;
                wait_exited(pid);
            }
            unsafe { libc::raise(libc::SIGCHLD) };
            Ok(self.pids.len())
        }
    }

    #[test]
    fn closed_control_fires_shutdown_once() {
        let _guard = lock_children();
        let child = Command::new("sleep").arg("30").spawn().unwrap();
        let pid = child.id() as i32;
        let counter = CountingKiller::default();
        let killer = ChildKiller {
            counter: counter.clone(),
            pids: vec![pid],
        };

        let (control_rx, control_tx) = Channel::pipe().unwrap();
        control_rx.set_nonblocking(true).unwrap();
        let (status_rx, status_tx) = Channel::pipe().unwrap();
        let mut supervisor = Supervisor::new(control_rx, status_tx, Shutdown::new(killer)).unwrap();

        // The owner goes away, then a fatal signal arrives on top of it.
        drop(control_tx);
        unsafe { libc::raise(libc::SIGTERM) };
        supervisor.run().unwrap();
        drop(supervisor);
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);

        let mut buf = [0u8; ChildStatus::SIZE];
        assert_eq!(status_rx.read_record(&mut buf).unwrap(), Transfer::Done);
        let status = ChildStatus::decode(&buf).unwrap();
        assert_eq!(status.pid, pid);
        assert_eq!(status.disposition, Disposition::Killed);
        assert_eq!(status.signal(), Some(libc::SIGKILL));
        assert_eq!(status_rx.read_record(&mut buf).unwrap(), Transfer::Closed);
    }

    #[test]
    fn dropping_terminates_subtree() {
        let counter = CountingKiller::default();
        let (control_rx, _control_tx) = Channel::pipe().unwrap();
        let (_status_rx, status_tx) = Channel::pipe().unwrap();
        let supervisor =
            Supervisor::new(control_rx, status_tx, Shutdown::new(counter.clone())).unwrap();
        assert_eq!(counter.0.load(Ordering::SeqCst), 0);
        drop(supervisor);
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);
    }
}
