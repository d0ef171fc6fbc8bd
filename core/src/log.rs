//! Pluggable diagnostics sink.
//!
//! Verifiers and the matcher report diagnostics through the [`LogSink`] of
//! the schema being parsed. Messages below the schema's minimum level are
//! dropped before the sink is invoked, and the message text is only formatted
//! when it will be delivered.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Severity of a diagnostic.
///
/// Levels are ordered; [`LogLevel::NoLogs`] is a sentinel that, used as a
/// minimum level, disables all logging.
///
/// # Examples
///
/// ```
/// use argwright_core::LogLevel;
///
/// assert!(LogLevel::Error.passes(LogLevel::Warning));
/// assert!(!LogLevel::Info.passes(LogLevel::Warning));
/// assert!(!LogLevel::ConfigError.passes(LogLevel::NoLogs));
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    /// Informational message.
    #[default]
    Info,
    /// Something unusual in the parsed input.
    Warning,
    /// A token or option was rejected.
    Error,
    /// Advisory finding about a schema definition.
    ConfigWarning,
    /// A schema definition is unusable.
    ConfigError,
    /// Disables all logging when used as the minimum level.
    NoLogs,
}

impl LogLevel {
    /// Returns `true` if a message at `self` is delivered under `min`.
    pub fn passes(self, min: LogLevel) -> bool {
        self != Self::NoLogs && min != Self::NoLogs && self >= min
    }

    /// Lowercase label used in log fields.
    pub fn label(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::ConfigWarning => "config_warning",
            Self::ConfigError => "config_error",
            Self::NoLogs => "no_logs",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Receiver of formatted diagnostics.
///
/// Any `Fn(LogLevel, &str)` closure that is `Send + Sync` is a sink.
pub trait LogSink: Send + Sync {
    /// Delivers one message; `schema` is the name of the reporting schema.
    fn log(&self, level: LogLevel, schema: &str, message: &str);
}

impl<F> LogSink for F
where
    F: Fn(LogLevel, &str) + Send + Sync,
{
    fn log(&self, level: LogLevel, _schema: &str, message: &str) {
        self(level, message)
    }
}

/// Default sink forwarding every message to [`tracing`].
///
/// Config-level messages use the `argwright::config` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn log(&self, level: LogLevel, schema: &str, message: &str) {
        match level {
            LogLevel::Info => tracing::info!(schema, "{message}"),
            LogLevel::Warning => tracing::warn!(schema, "{message}"),
            LogLevel::Error => tracing::error!(schema, "{message}"),
            LogLevel::ConfigWarning => {
                tracing::warn!(target: "argwright::config", schema, "{message}")
            }
            LogLevel::ConfigError => {
                tracing::error!(target: "argwright::config", schema, "{message}")
            }
            LogLevel::NoLogs => {}
        }
    }
}

/// Shared handle to a sink.
pub type SharedSink = Arc<dyn LogSink>;

pub(crate) fn default_sink() -> SharedSink {
    Arc::new(TracingSink)
}

/// Formats and delivers `args` if `level` passes `min`.
pub(crate) fn emit(
    sink: &dyn LogSink,
    min: LogLevel,
    schema: &str,
    level: LogLevel,
    args: fmt::Arguments<'_>,
) {
    if level.passes(min) {
        sink.log(level, schema, &args.to_string());
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[test]
    fn test_level_ordering_and_filter() {
        assert!(LogLevel::Info < LogLevel::Warning);
        assert!(LogLevel::ConfigError < LogLevel::NoLogs);
        assert!(LogLevel::Warning.passes(LogLevel::Info));
        assert!(LogLevel::Info.passes(LogLevel::Info));
        assert!(!LogLevel::Warning.passes(LogLevel::Error));
        assert!(!LogLevel::NoLogs.passes(LogLevel::Info));
    }

    #[test]
    fn test_emit_skips_filtered_messages() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = {
            let seen = Arc::clone(&seen);
            move |level: LogLevel, msg: &str| {
                seen.lock().unwrap().push((level, msg.to_string()));
            }
        };

        emit(&sink, LogLevel::Warning, "prog", LogLevel::Info, format_args!("hidden"));
        emit(&sink, LogLevel::Warning, "prog", LogLevel::Error, format_args!("shown {}", 1));

        let seen = seen.lock().unwrap();
        assert_eq!(seen.as_slice(), &[(LogLevel::Error, "shown 1".to_string())]);
    }

    #[test]
    fn test_no_logs_disables_everything() {
        let seen = Arc::new(Mutex::new(0usize));
        let sink = {
            let seen = Arc::clone(&seen);
            move |_: LogLevel, _: &str| *seen.lock().unwrap() += 1
        };
        emit(&sink, LogLevel::NoLogs, "prog", LogLevel::ConfigError, format_args!("x"));
        assert_eq!(*seen.lock().unwrap(), 0);
    }
}
