//! # The Supervise Logger
//! SuperviseFX-flavored presets for the [tracing] framework.
//!
//! Standard output is a protocol channel, so everything is logged to standard error.

use tracing::metadata::LevelFilter;
use tracing_subscriber::{filter::filter_fn, prelude::*};

/// Builder of `SuperviseFX`-flavor tracing configuration.
#[derive(Debug, Clone)]
pub struct Builder {
    name: String,
    quiet: bool,
    verbose: bool,
    color: bool,
}
impl Builder {
    /// Creates a new [`Builder`] instance with default settings.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the logger's name.
    #[inline]
    pub fn name<S: Into<String>>(&mut self, s: S) -> &mut Self {
        self.name = s.into();
        self
    }

    /// Sets whether console output is reduced to errors.
    #[inline]
    pub fn quiet(&mut self, val: bool) -> &mut Self {
        self.quiet = val;
        self
    }

    /// Sets whether console output is verbose for the logger.
    #[inline]
    pub fn verbose(&mut self, val: bool) -> &mut Self {
        self.verbose = val;
        self
    }

    /// Sets whether colorful console output is enabled for the logger.
    #[inline]
    pub fn color(&mut self, val: bool) -> &mut Self {
        self.color = val;
        self
    }

    /// Returns the maximum level that reaches the console.
    pub fn level_filter(&self) -> LevelFilter {
        match (self.quiet, self.verbose) {
            (true, _) => LevelFilter::ERROR,
            (false, true) => LevelFilter::TRACE,
            (false, false) => LevelFilter::INFO,
        }
    }

    /// Initializes the logger.
    #[inline]
    pub fn init(&mut self) {
        let verbose = self.verbose;
        let name = self.name.clone();

        let stdio_layer = tracing_subscriber::fmt::layer()
            .without_time()
            .with_ansi(self.color)
            .with_file(false)
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_filter(filter_fn(move |metadata| {
                verbose || metadata.target().contains("console")
            }))
            .with_filter(self.level_filter());

        tracing_subscriber::registry().with(stdio_layer).init();
        tracing::trace!("{name}[{}]: logger initialized", std::process::id());
    }
}
impl Default for Builder {
    fn default() -> Self {
        Self {
            name: "supervise".into(),
            quiet: false,
            verbose: false,
            color: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_filter() {
        assert_eq!(Builder::new().level_filter(), LevelFilter::INFO);
        assert_eq!(Builder::new().verbose(true).level_filter(), LevelFilter::TRACE);
        assert_eq!(
            Builder::new().verbose(true).quiet(true).level_filter(),
            LevelFilter::ERROR
        );
    }
}
