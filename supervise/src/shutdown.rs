//! Run-once termination of the supervised subtree.

use std::sync::atomic::{AtomicBool, Ordering};

/// Interface of subtree termination.
pub trait Killer {
    /// Sends a termination signal to every currently existing descendant, returning how many were signaled.
    ///
    /// # Errors
    /// An `Err(_)` is returned if the underlying OS function failed.
    fn kill_descendants(&self) -> std::io::Result<usize>;
}

/// The platform [`Killer`], backed by [`supervisefx::process::filicide`].
#[derive(Debug, Default, Clone, Copy)]
pub struct Filicide;
impl Killer for Filicide {
    fn kill_descendants(&self) -> std::io::Result<usize> {
        supervisefx::process::filicide()
    }
}

/// A guard that terminates the subtree at most once.
///
/// The first call to [`Shutdown::trigger`] runs the killer; every later call, from whatever trigger, does nothing. If the
/// guard is dropped before it was ever triggered, dropping it triggers it, so every way out of the supervisor, including
/// errors and panics, terminates the subtree.
#[derive(Debug)]
pub struct Shutdown<K: Killer> {
    killer: K,
    fired: AtomicBool,
}
impl<K: Killer> Shutdown<K> {
    /// Creates a new, unfired [`Shutdown`] guard.
    pub fn new(killer: K) -> Self {
        Self {
            killer,
            fired: AtomicBool::new(false),
        }
    }

    /// Terminates the subtree, unless this was already done.
    ///
    /// Returns `true` if this call performed the termination.
    ///
    /// # Errors
    /// An `Err(_)` is returned if the killer failed. The guard still counts as fired.
    pub fn trigger(&self) -> std::io::Result<bool> {
        if self
            .fired
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Ok(false);
        }

        let count = self.killer.kill_descendants()?;
        tracing::debug!("shutdown: sent termination to {count} descendant(s)");
        Ok(true)
    }
}
impl<K: Killer> Drop for Shutdown<K> {
    fn drop(&mut self) {
        if let Err(err) = self.trigger() {
            tracing::error!(target: "console", "failed to terminate descendants: {err}");
        }
    }
}
