//! Inspection and manipulation of the process's environment.

use std::ffi::OsStr;

/// Reads an environment variable and removes it, so it is not inherited by anything spawned later.
///
/// Must be called while the process is still single-threaded.
///
/// # Errors
/// An `Err(_)` is returned if the variable is unset or not valid Unicode.
pub fn take_var<K: AsRef<OsStr>>(key: K) -> Result<String, std::env::VarError> {
    let value = std::env::var(key.as_ref())?;
    unsafe { std::env::remove_var(key) };
    Ok(value)
}
