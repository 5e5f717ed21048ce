//! End-to-end behavior of the `supervise` binary, driven through its standard input and output.

use std::{
    collections::BTreeSet,
    io::{BufRead, BufReader, Write},
    process::{Child, ChildStdin, ChildStdout, Command, ExitStatus, Stdio},
    sync::mpsc,
    time::{Duration, Instant},
};
use supervise_sdk::prelude::*;

const TIMEOUT: Duration = Duration::from_secs(20);

/// A running `supervise` whose children are the given shell jobs.
struct Harness {
    process: Child,
    controller: Option<Controller<ChildStdin>>,
    statuses: Option<StatusReader<ChildStdout>>,
    children: Vec<i32>,
    watchdog: Option<mpsc::Sender<()>>,
}
impl Harness {
    /// Starts each job in the background of a shell, then replaces the shell with `supervise`, which inherits the jobs as
    /// its children.
    ///
    /// A job does not start before the shell has become `supervise`; otherwise a short job could be reaped by the shell
    /// itself. The wait uses shell builtins only, so it leaves no grandchildren behind.
    fn spawn(jobs: &[&str]) -> Self {
        let mut script = String::new();
        for job in jobs {
            script.push_str(&format!(
                "(until read -r name < /proc/$$/comm && [ \"$name\" = supervise ]; do :; done; {job}) \
                 </dev/null >/dev/null 2>/dev/null & echo $! >&2; "
            ));
        }
        script.push_str("exec \"$0\"");

        let mut process = Command::new("/bin/sh")
            .arg("-c")
            .arg(script)
            .arg(env!("CARGO_BIN_EXE_supervise"))
            .env_remove("SUPERVISE_CONSOLE")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .unwrap();

        let mut stderr = BufReader::new(process.stderr.take().unwrap());
        let children = jobs
            .iter()
            .map(|_| {
                let mut line = String::new();
                stderr.read_line(&mut line).unwrap();
                line.trim().parse().unwrap()
            })
            .collect();

        // A hung supervisor is killed, which closes the status channel and fails the test instead of blocking it.
        let (tx, rx) = mpsc::channel::<()>();
        let pid = process.id() as i32;
        std::thread::spawn(move || {
            if let Err(mpsc::RecvTimeoutError::Timeout) = rx.recv_timeout(TIMEOUT) {
                unsafe { libc::kill(pid, libc::SIGKILL) };
            }
        });

        Self {
            controller: process.stdin.take().map(Controller::new),
            statuses: process.stdout.take().map(StatusReader::new),
            process,
            children,
            watchdog: Some(tx),
        }
    }

    fn pid(&self) -> i32 {
        self.process.id() as i32
    }

    fn controller(&mut self) -> &mut Controller<ChildStdin> {
        self.controller.as_mut().unwrap()
    }

    fn recv(&mut self) -> ChildStatus {
        self.statuses.as_mut().unwrap().recv().unwrap()
    }

    fn close_control(&mut self) {
        drop(self.controller.take());
    }

    fn close_status(&mut self) {
        drop(self.statuses.take());
    }

    /// Blocks until `supervise` has blocked the signals it handles.
    fn wait_ready(&self) {
        let mask = (1u64 << (libc::SIGTERM - 1)) | (1u64 << (libc::SIGCHLD - 1));
        let deadline = Instant::now() + TIMEOUT;
        loop {
            let status = std::fs::read_to_string(format!("/proc/{}/status", self.pid()))
                .unwrap_or_default();
            let blocked = status
                .lines()
                .find_map(|x| x.strip_prefix("SigBlk:"))
                .and_then(|x| u64::from_str_radix(x.trim(), 16).ok())
                .unwrap_or(0);
            if blocked & mask == mask {
                return;
            }
            assert!(Instant::now() < deadline, "supervise never became ready");
            std::thread::sleep(Duration::from_millis(10));
        }
    }

    fn wait(&mut self) -> ExitStatus {
        let status = self.process.wait().unwrap();
        drop(self.watchdog.take());
        status
    }
}
impl Drop for Harness {
    fn drop(&mut self) {
        if let Ok(None) = self.process.try_wait() {
            self.process.kill().ok();
            self.process.wait().ok();
        }
    }
}

fn killed_by(status: &ChildStatus, signal: i32) -> bool {
    status.disposition == Disposition::Killed && status.signal() == Some(signal)
}

#[test]
fn relays_signals_to_children_only() {
    let mut harness = Harness::spawn(&["exec sleep 30", "exec sleep 30"]);
    let (first, second) = (harness.children[0], harness.children[1]);
    let mut stranger = Command::new("sleep").arg("30").spawn().unwrap();

    harness.controller().terminate(stranger.id() as i32).unwrap();
    harness.controller().terminate(first).unwrap();

    let status = harness.recv();
    assert_eq!(status.pid, first);
    assert_eq!(status.uid, unsafe { libc::getuid() });
    assert!(killed_by(&status, libc::SIGTERM));

    // Requests are handled in order, so the one for the stranger was already dropped.
    assert!(stranger.try_wait().unwrap().is_none());
    stranger.kill().unwrap();
    stranger.wait().unwrap();

    harness.close_control();
    let status = harness.recv();
    assert_eq!(status.pid, second);
    assert!(killed_by(&status, libc::SIGKILL));

    assert!(harness.wait().success());
    assert!(harness.statuses.as_mut().unwrap().next().is_none());
}

#[test]
fn survives_status_reader_going_away() {
    let mut harness = Harness::spawn(&["sleep 1", "sleep 1", "sleep 1"]);
    harness.close_status();
    assert!(harness.wait().success());
}

#[test]
fn fatal_signal_terminates_subtree() {
    let mut harness = Harness::spawn(&["exec sleep 30", "exec sleep 30"]);
    harness.wait_ready();
    unsafe { libc::kill(harness.pid(), libc::SIGTERM) };

    let reported: BTreeSet<_> = (0..2)
        .map(|_| {
            let status = harness.recv();
            assert!(killed_by(&status, libc::SIGKILL));
            status.pid
        })
        .collect();
    assert_eq!(reported, harness.children.iter().copied().collect());
    assert!(harness.wait().success());
}

#[test]
fn exits_without_children() {
    let mut harness = Harness::spawn(&[]);
    assert!(harness.wait().success());

    let mut harness = Harness::spawn(&[]);
    harness.close_control();
    assert!(harness.wait().success());
}

#[test]
fn reports_exit_code() {
    let mut harness = Harness::spawn(&["exit 3"]);
    let status = harness.recv();
    assert_eq!(status.pid, harness.children[0]);
    assert_eq!(status.disposition, Disposition::Exited);
    assert_eq!(status.code(), Some(3));
    assert!(!status.is_success());
    assert!(harness.wait().success());
}

#[test]
fn partial_request_is_fatal() {
    let mut harness = Harness::spawn(&["exec sleep 30"]);
    let mut stdin = harness.controller.take().unwrap().into_inner();
    stdin.write_all(&[0u8; 3]).unwrap();

    let status = harness.wait();
    assert_eq!(status.code(), Some(1));
    assert!(harness.statuses.as_mut().unwrap().next().is_none());
}
