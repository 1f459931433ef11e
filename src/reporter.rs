//! Progress and diagnostics of dictionary builds.
//!
//! Index builds and imports report skipped tokens, malformed input lines and
//! summaries through a [`Reporter`] rather than failing. The command line
//! forwards them to `tracing` through [`TracingReporter`], while
//! [`CollectingReporter`] keeps them around for inspection.

use std::fmt;

use parking_lot::Mutex;

/// Report an informational build message.
#[macro_export]
macro_rules! report_info {
    ($reporter:expr, $($arg:tt)*) => {
        $crate::reporter::Reporter::info($reporter, &format_args!($($arg)*));
    }
}

/// Report a build warning, such as a skipped line or token.
#[macro_export]
macro_rules! report_warn {
    ($reporter:expr, $($arg:tt)*) => {
        $crate::reporter::Reporter::warn($reporter, &format_args!($($arg)*));
    }
}

/// Receiver of build diagnostics. Indices are built in parallel, so a
/// reporter is shared across threads.
pub trait Reporter: Sync {
    /// Report progress or a summary.
    fn info(&self, value: &dyn fmt::Display);

    /// Report input which was skipped.
    fn warn(&self, value: &dyn fmt::Display);
}

impl<T> Reporter for &T
where
    T: ?Sized + Reporter,
{
    #[inline]
    fn info(&self, value: &dyn fmt::Display) {
        (*self).info(value);
    }

    #[inline]
    fn warn(&self, value: &dyn fmt::Display) {
        (*self).warn(value);
    }
}

/// Forwards build diagnostics as `tracing` events.
pub struct TracingReporter;

impl Reporter for TracingReporter {
    #[inline]
    fn info(&self, value: &dyn fmt::Display) {
        tracing::event!(tracing::Level::INFO, "{}", value);
    }

    #[inline]
    fn warn(&self, value: &dyn fmt::Display) {
        tracing::event!(tracing::Level::WARN, "{}", value);
    }
}

/// Severity of a collected message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Warn,
}

/// Keeps every reported message in order.
#[derive(Default)]
pub struct CollectingReporter {
    messages: Mutex<Vec<(Level, String)>>,
}

impl CollectingReporter {
    /// Construct an empty reporter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the messages reported so far.
    pub fn take(&self) -> Vec<(Level, String)> {
        std::mem::take(&mut *self.messages.lock())
    }

    /// Messages reported as warnings so far.
    pub fn warnings(&self) -> Vec<String> {
        self.messages
            .lock()
            .iter()
            .filter(|(level, _)| *level == Level::Warn)
            .map(|(_, message)| message.clone())
            .collect()
    }
}

impl Reporter for CollectingReporter {
    fn info(&self, value: &dyn fmt::Display) {
        self.messages.lock().push((Level::Info, value.to_string()));
    }

    fn warn(&self, value: &dyn fmt::Display) {
        self.messages.lock().push((Level::Warn, value.to_string()));
    }
}
