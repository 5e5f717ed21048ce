//! Extension to the standard library.

/// An extension for standard [`Result`] type to support logging.
pub trait ResultExt<T> {
    /// Returns the contained `Ok` value, consuming the `self` value.
    ///
    /// If the value is an `Err`, the error is logged to the console together with `why`, and the process exits with code
    /// `1`. Destructors of the caller's stack are not run, so this must only be used before anything needs cleaning up.
    fn unwrap_log(self, why: &str) -> T;
}
impl<T, E> ResultExt<T> for Result<T, E>
where
    E: std::fmt::Display,
{
    fn unwrap_log(self, why: &str) -> T {
        match self {
            Ok(val) => val,
            Err(err) => {
                tracing::error!(target: "console", "{}: {}", why, err);
                std::process::exit(1);
            }
        }
    }
}
