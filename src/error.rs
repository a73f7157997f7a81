//! Centralized error types for mailtidy.

use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the mailtidy library.
///
/// The variants fall into four groups that decide how far an error reaches:
/// session errors abort the scan, message errors skip one message,
/// classifier errors abandon one classifier's work on one message, and
/// flush errors are collected and reported once the scan is over.
#[derive(Error, Debug)]
pub enum TidyError {
    /// I/O error with the associated file path.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Could not reach the mail server.
    #[error("Could not connect to {server}: {reason}")]
    Connect { server: String, reason: String },

    /// The server rejected the credentials.
    #[error("Login failed for {user}: {reason}")]
    Auth { user: String, reason: String },

    /// The mailbox could not be selected.
    #[error("Could not select mailbox '{mailbox}': {reason}")]
    MailboxSelect { mailbox: String, reason: String },

    /// Fetching the message range failed part way through.
    #[error("Fetch failed: {0}")]
    Fetch(String),

    /// The raw bytes are not a parseable RFC 5322 message.
    #[error("Message {sequence} could not be parsed")]
    MessageParse { sequence: u32 },

    /// A mandatory header is absent.
    #[error("Message {sequence} has no {header} header")]
    HeaderMissing {
        sequence: u32,
        header: &'static str,
    },

    /// One MIME part could not be decoded.
    #[error("Message {sequence}: could not read part {index}: {reason}")]
    PartRead {
        sequence: u32,
        index: usize,
        reason: String,
    },

    /// The ICS payload is malformed or not an invitation request.
    #[error("ICS error: {0}")]
    Ics(String),

    /// The calendar service failed.
    #[error("Calendar error: {0}")]
    Calendar(String),

    /// The browser could not be launched.
    #[error("Could not open '{url}': {reason}")]
    Browser { url: String, reason: String },

    /// The operator's input stream is exhausted.
    #[error("No more input available")]
    InputClosed,

    /// The dedup store file is corrupt or cannot be written.
    #[error("Dedup store '{path}': {reason}")]
    DedupStore { path: PathBuf, reason: String },

    /// A batched end-of-scan step failed.
    #[error("Flush step '{step}' failed: {reason}")]
    Flush { step: &'static str, reason: String },

    /// Configuration or credentials are unusable.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Convenience alias for `Result<T, TidyError>`.
pub type Result<T> = std::result::Result<T, TidyError>;

impl TidyError {
    /// Create an `Io` variant from a path and an `io::Error`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this error only concerns the message being built,
    /// so the scan can move on to the next one.
    pub fn is_message_scoped(&self) -> bool {
        matches!(
            self,
            Self::MessageParse { .. } | Self::HeaderMissing { .. } | Self::PartRead { .. }
        )
    }
}

/// Allow `?` on `std::io::Error` when no path context is available
/// (console reads and writes).
impl From<std::io::Error> for TidyError {
    fn from(source: std::io::Error) -> Self {
        Self::Io {
            path: PathBuf::from("<console>"),
            source,
        }
    }
}
