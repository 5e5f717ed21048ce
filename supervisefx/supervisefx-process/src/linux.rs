//! Process tree management on Linux.
//!
//! Descendants are enumerated through `/proc/<pid>/task/<tid>/children`, which requires a kernel built with
//! `CONFIG_PROC_CHILDREN`. [`sanity_check`] verifies that before anything relies on it.

use crate::{ExitStatus, Reaped, SanityError, Wait};
use std::collections::BTreeSet;
use supervisefx_signal::{SIGKILL, SIGSTOP};

pub type Pid = libc::pid_t;

/// Makes current process become a subreaper.
///
/// # Errors
/// An `Err(_)` is returned if the underlying OS function failed.
pub fn become_subreaper() -> std::io::Result<()> {
    let result = unsafe {
        libc::prctl(
            libc::PR_SET_CHILD_SUBREAPER,
            1 as libc::c_ulong,
            0 as libc::c_ulong,
            0 as libc::c_ulong,
            0 as libc::c_ulong,
        )
    };
    if result.is_negative() {
        Err(std::io::Error::last_os_error())
    } else {
        Ok(())
    }
}

/// Returns `true` if current process is a subreaper.
///
/// # Errors
/// An `Err(_)` is returned if the underlying OS function failed.
pub fn is_subreaper() -> std::io::Result<bool> {
    let mut flag: libc::c_int = 0;
    let result = unsafe {
        libc::prctl(
            libc::PR_GET_CHILD_SUBREAPER,
            &mut flag as *mut libc::c_int,
            0 as libc::c_ulong,
            0 as libc::c_ulong,
            0 as libc::c_ulong,
        )
    };
    if result.is_negative() {
        Err(std::io::Error::last_os_error())
    } else {
        Ok(flag != 0)
    }
}

/// Makes current process a subreaper and checks that [`filicide`] is able to find every descendant.
///
/// # Errors
/// An `Err(_)` is returned if the process cannot supervise its descendants on this system.
pub fn sanity_check() -> Result<(), SanityError> {
    become_subreaper().map_err(SanityError::Subreaper)?;
    if !is_subreaper().map_err(SanityError::Subreaper)? {
        return Err(SanityError::NotSubreaper);
    }

    let path = format!("/proc/self/task/{}/children", gettid());
    std::fs::read(&path).map_err(|source| SanityError::Enumeration { path, source })?;

    Ok(())
}

/// Sends the given signal to the specified process.
///
/// # Errors
/// An `Err(_)` is returned if the underlying OS function failed.
pub fn kill(pid: Pid, signum: i32) -> std::io::Result<()> {
    let result = unsafe { libc::kill(pid, signum) };
    match result {
        0 => Ok(()),
        _ => Err(std::io::Error::last_os_error()),
    }
}

/// Returns `true` if `pid` names a child of current process.
///
/// The probe neither blocks nor consumes the child's state change, so a zombie child still counts.
pub fn is_child(pid: Pid) -> bool {
    if pid <= 0 {
        return false;
    }

    // At least one kind of state change must be requested, or `waitid` fails with `EINVAL`.
    let mut info: libc::siginfo_t = unsafe { std::mem::zeroed() };
    let result = unsafe {
        libc::waitid(
            libc::P_PID,
            pid as libc::id_t,
            &mut info,
            libc::WEXITED | libc::WNOHANG | libc::WNOWAIT,
        )
    };
    result >= 0
}

/// Collects one terminated child without blocking.
///
/// # Errors
/// An `Err(_)` is returned if the underlying OS function failed for any reason other than having no children.
pub fn wait_any_nonblocking() -> std::io::Result<Reaped> {
    loop {
        let mut info: libc::siginfo_t = unsafe { std::mem::zeroed() };
        let result =
            unsafe { libc::waitid(libc::P_ALL, 0, &mut info, libc::WEXITED | libc::WNOHANG) };
        if result == -1 {
            let err = std::io::Error::last_os_error();
            match err.raw_os_error() {
                Some(libc::EINTR) => continue,
                Some(libc::ECHILD) => return Ok(Reaped::NoChildren),
                _ => return Err(err),
            }
        }

        let pid = unsafe { info.si_pid() };
        if pid == 0 {
            return Ok(Reaped::NoneReady);
        }

        let status = unsafe { info.si_status() };
        let exit_status = ExitStatus::from_siginfo(info.si_code, status).ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("unexpected si_code {} from waitid", info.si_code),
            )
        })?;
        let uid = unsafe { info.si_uid() };
        return Ok(Reaped::Child(Wait::new(pid, uid, exit_status)));
    }
}

/// Returns the direct children of `pid`, across all of its threads.
///
/// A process that vanished during the walk simply has no children.
pub fn children(pid: Pid) -> std::io::Result<Vec<Pid>> {
    let tasks = match std::fs::read_dir(format!("/proc/{pid}/task")) {
        Ok(x) => x,
        Err(err) if is_vanished(&err) => return Ok(Vec::new()),
        Err(err) => return Err(err),
    };

    let mut result = Vec::new();
    for task in tasks {
        let task = match task {
            Ok(x) => x,
            Err(err) if is_vanished(&err) => continue,
            Err(err) => return Err(err),
        };
        let list = match std::fs::read_to_string(task.path().join("children")) {
            Ok(x) => x,
            Err(err) if is_vanished(&err) => continue,
            Err(err) => return Err(err),
        };
        result.extend(
            list.split_ascii_whitespace()
                .filter_map(|x| x.parse::<Pid>().ok()),
        );
    }

    Ok(result)
}

/// Returns every descendant of `pid`, parents before their children.
pub fn descendants(pid: Pid) -> std::io::Result<Vec<Pid>> {
    let mut result = Vec::new();
    let mut queue = std::collections::VecDeque::from(children(pid)?);
    while let Some(x) = queue.pop_front() {
        result.push(x);
        queue.extend(children(x)?);
    }
    Ok(result)
}

/// Terminates every descendant of current process.
///
/// The tree is frozen first: every descendant found is sent `SIGSTOP`, and the enumeration repeats until it finds nothing
/// new, since a stopped process cannot fork. Every frozen process is then sent `SIGKILL`. Processes that exit in between
/// are skipped. Returns how many processes were killed.
///
/// This is not idempotent by itself; calling it twice signals whatever descendants exist at the second call.
///
/// # Errors
/// An `Err(_)` is returned if procfs could not be read or signaling failed for a reason other than the process being gone or
/// owned by someone else.
pub fn filicide() -> std::io::Result<usize> {
    let me = std::process::id() as Pid;
    let mut frozen = BTreeSet::new();

    loop {
        let fresh: Vec<_> = descendants(me)?
            .into_iter()
            .filter(|x| !frozen.contains(x))
            .collect();
        if fresh.is_empty() {
            break;
        }
        for pid in fresh {
            tracing::trace!("freezing descendant {pid}");
            signal_if_alive(pid, SIGSTOP)?;
            frozen.insert(pid);
        }
    }

    for &pid in &frozen {
        tracing::trace!("killing descendant {pid}");
        signal_if_alive(pid, SIGKILL)?;
    }

    Ok(frozen.len())
}

fn signal_if_alive(pid: Pid, signum: i32) -> std::io::Result<()> {
    match kill(pid, signum) {
        Err(err) if err.raw_os_error() == Some(libc::ESRCH) => Ok(()),
        Err(err) if err.raw_os_error() == Some(libc::EPERM) => {
            tracing::warn!("descendant {pid} cannot be signaled: {err}");
            Ok(())
        }
        x => x,
    }
}

fn is_vanished(err: &std::io::Error) -> bool {
    matches!(err.raw_os_error(), Some(libc::ENOENT) | Some(libc::ESRCH))
}

fn gettid() -> Pid {
    unsafe { libc::syscall(libc::SYS_gettid) as Pid }
}
