//! Error types for connector operations
//!
//! Failures carry two layers: the coarse [`Status`] code from the immediate
//! engine call (used for control-flow branching) and, where available, the
//! detail captured from the engine's deferred last-error channel (used for
//! display). The detail supersedes the coarse text when rendering but never
//! replaces the coarse code.

use crate::engine::{Engine, LastError, Status};
use std::fmt;
use thiserror::Error;

/// Main error type for connector operations.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The client is not connected; no engine interaction was attempted.
    #[error("not connected")]
    NotConnected,

    /// The subject failed local validation before any engine interaction.
    #[error("invalid subject: {0:?}")]
    InvalidSubject(String),

    /// The server URL is not syntactically valid.
    #[error("invalid server URL: {0}")]
    InvalidServerUrl(String),

    /// An engine operation failed.
    #[error("{op} failed: {report}")]
    Engine { op: Op, report: ErrorReport },

    /// Configuration loading or resolution failed.
    #[error("configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),
}

impl ClientError {
    /// Coarse engine status behind this error, when one exists.
    pub fn status(&self) -> Option<Status> {
        match self {
            ClientError::Engine { report, .. } => Some(report.status),
            _ => None,
        }
    }
}

/// The connector operation that produced an engine failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    CreateOptions,
    ConfigureCredentials,
    ConfigureUrl,
    Connect,
    Publish,
    Subscribe,
    Unsubscribe,
    Disconnect,
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Op::CreateOptions => "options creation",
            Op::ConfigureCredentials => "credential configuration",
            Op::ConfigureUrl => "URL configuration",
            Op::Connect => "connect",
            Op::Publish => "publish",
            Op::Subscribe => "subscribe",
            Op::Unsubscribe => "unsubscribe",
            Op::Disconnect => "disconnect",
        };
        f.write_str(name)
    }
}

/// A merged failure report: coarse status plus optional deferred detail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorReport {
    /// Coarse status from the immediate engine call. Authoritative for
    /// branching.
    pub status: Status,
    /// Engine-supplied text for `status`.
    pub status_text: String,
    /// Detail from the last-error channel, when it was queried.
    pub detail: Option<LastError>,
}

impl ErrorReport {
    /// Build a report for a failed operation.
    ///
    /// When `fetch_detail` is set, the engine's last-error channel is queried
    /// immediately; callers must only set it when this is the very next
    /// action after the failing call.
    pub fn capture<E: Engine + ?Sized>(engine: &E, status: Status, fetch_detail: bool) -> Self {
        let status_text = engine.status_text(status);
        let detail = if fetch_detail {
            engine.last_error()
        } else {
            None
        };
        Self {
            status,
            status_text,
            detail,
        }
    }
}

impl fmt::Display for ErrorReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.detail {
            Some(last) => write!(
                f,
                "{} [{:?}, last error {:?}]",
                last.message, self.status, last.status
            ),
            None => write!(f, "{} [{:?}]", self.status_text, self.status),
        }
    }
}
