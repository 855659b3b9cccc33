//! Injected logging for the client.
//!
//! A component passes its logger in through
//! [`ClientOptions::with_logger`](crate::ClientOptions::with_logger). Nothing
//! here touches global state.

use std::fmt;
use std::io::Write as _;

/// Sink for the client's own diagnostics.
pub trait ClientLogger: Send + Sync + fmt::Debug {
    /// Routine progress.
    fn info(&self, message: &str);
    /// Detail useful only when troubleshooting.
    fn debug(&self, message: &str);
    /// Something failed and was absorbed.
    fn warn(&self, message: &str);
}

/// Forwards to `tracing` on target `tether::client`.
///
/// Silent unless the component installed a subscriber.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl ClientLogger for TracingLogger {
    fn info(&self, message: &str) {
        tracing::info!(target: "tether::client", "{message}");
    }

    fn debug(&self, message: &str) {
        tracing::debug!(target: "tether::client", "{message}");
    }

    fn warn(&self, message: &str) {
        tracing::warn!(target: "tether::client", "{message}");
    }
}

/// Writes prefixed lines to standard error.
#[derive(Debug, Default, Clone, Copy)]
pub struct StderrLogger {
    verbose: bool,
}

impl StderrLogger {
    /// Logger that prints `info` and `warn` lines.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Also print `debug` lines.
    #[must_use]
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Verbosity matching a `TETHER_LOG` level.
    #[must_use]
    pub fn for_level(level: Option<&str>) -> Self {
        let verbose = level.is_some_and(|l| {
            let l = l.trim();
            l.eq_ignore_ascii_case("debug") || l.eq_ignore_ascii_case("trace")
        });
        Self { verbose }
    }

    fn write(level: &str, message: &str) {
        // Nowhere left to report a failed write to stderr.
        let _ = writeln!(std::io::stderr().lock(), "[tether {level}] {message}");
    }
}

impl ClientLogger for StderrLogger {
    fn info(&self, message: &str) {
        Self::write("info", message);
    }

    fn debug(&self, message: &str) {
        if self.verbose {
            Self::write("debug", message);
        }
    }

    fn warn(&self, message: &str) {
        Self::write("warn", message);
    }
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopLogger;

impl ClientLogger for NoopLogger {
    fn info(&self, _message: &str) {}
    fn debug(&self, _message: &str) {}
    fn warn(&self, _message: &str) {}
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Mutex;

    use super::ClientLogger;

    /// Captures messages as `"level: message"`.
    #[derive(Debug, Default)]
    pub(crate) struct RecordingLogger {
        lines: Mutex<Vec<String>>,
    }

    impl RecordingLogger {
        pub(crate) fn lines(&self) -> Vec<String> {
            self.lines.lock().unwrap().clone()
        }

        fn push(&self, level: &str, message: &str) {
            self.lines.lock().unwrap().push(format!("{level}: {message}"));
        }
    }

    impl ClientLogger for RecordingLogger {
        fn info(&self, message: &str) {
            self.push("info", message);
        }

        fn debug(&self, message: &str) {
            self.push("debug", message);
        }

        fn warn(&self, message: &str) {
            self.push("warn", message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stderr_verbosity_follows_level() {
        assert!(StderrLogger::for_level(Some("debug")).verbose);
        assert!(StderrLogger::for_level(Some(" TRACE ")).verbose);
        assert!(!StderrLogger::for_level(Some("info")).verbose);
        assert!(!StderrLogger::for_level(None).verbose);
    }
}
