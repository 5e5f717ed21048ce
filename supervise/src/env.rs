//! Inspection and manipulation of `supervise`’s environment.
//!
//! `supervise` takes no command-line arguments. Console behavior is configured through `SUPERVISE_CONSOLE`, a
//! comma-separated list of `quiet`, `verbose` and `nocolor`.

use std::sync::OnceLock;

/// Name of the environment variable holding console options.
pub const CONSOLE_VAR: &str = "SUPERVISE_CONSOLE";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Console {
    /// Reduce console outputs to errors
    pub quiet: bool,

    /// Enable verbose console outputs
    pub verbose: bool,

    /// Disable colorful console outputs
    pub no_color: bool,
}
impl Console {
    /// Parses console options. Unknown options are ignored.
    pub fn parse(options: &str) -> Self {
        let mut object = Self::default();
        for opt in options.split(',') {
            match opt.trim() {
                "quiet" => object.quiet = true,
                "nocolor" => object.no_color = true,
                "verbose" => object.verbose = true,
                _ => {}
            }
        }
        object
    }

    /// Takes console options from the environment.
    pub fn from_env() -> Self {
        supervisefx::env::take_var(CONSOLE_VAR)
            .map(|x| Self::parse(&x))
            .unwrap_or_default()
    }

    /// Returns a logger builder configured with these options.
    pub fn logger(&self) -> supervisefx::log::Builder {
        let mut builder = supervisefx::log::Builder::new();
        builder
            .name("supervise")
            .quiet(self.quiet)
            .verbose(self.verbose)
            .color(!self.no_color);
        builder
    }
}

/// Returns a reference to the unique [`Console`] instance.
pub fn console() -> &'static Console {
    static CONSOLE: OnceLock<Console> = OnceLock::new();

    CONSOLE.get_or_init(Console::from_env)
}
