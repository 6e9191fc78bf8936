//! User-facing progress reporting.

use log::{error, info, warn};

/// Severity attached to a status message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Success => "success",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

/// Fire-and-forget sink for progress messages.
pub trait StatusSink: Send + Sync {
    fn notify(&self, message: &str, severity: Severity);
}

impl<F> StatusSink for F
where
    F: Fn(&str, Severity) + Send + Sync,
{
    fn notify(&self, message: &str, severity: Severity) {
        self(message, severity)
    }
}

/// Forwards status messages to the `log` facade.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogSink;

impl StatusSink for LogSink {
    fn notify(&self, message: &str, severity: Severity) {
        match severity {
            Severity::Info | Severity::Success => info!("status: {message}"),
            Severity::Warning => warn!("status: {message}"),
            Severity::Error => error!("status: {message}"),
        }
    }
}
