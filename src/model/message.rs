//! The per-message model the classifiers work on.

use chrono::{DateTime, Utc};

use super::address::EmailAddress;
use super::attachment::Attachment;

/// One fetched mailbox entry.
///
/// Built once by [`crate::parser::mime::parse_message`] and never mutated
/// afterwards; every classifier sees the same value.
#[derive(Debug, Clone, Default)]
pub struct Message {
    /// Mailbox-local sequence number. Only used to address the message
    /// for deletion.
    pub sequence: u32,

    /// Decoded subject line.
    pub subject: String,

    /// Senders, in header order. Never empty for a parsed message.
    pub from: Vec<EmailAddress>,

    /// Primary recipients. Empty when the header is missing or malformed.
    pub to: Vec<EmailAddress>,

    /// Parsed `Date:` header, if any.
    pub date: Option<DateTime<Utc>>,

    /// All inline parts concatenated in encounter order.
    pub body: String,

    /// Attachments in encounter order.
    pub attachments: Vec<Attachment>,
}

impl Message {
    /// The first sender.
    ///
    /// Messages produced by the parser always have one; hand-built messages
    /// without a sender fall back to an empty address so matching simply fails.
    pub fn sender(&self) -> &EmailAddress {
        static EMPTY: EmailAddress = EmailAddress {
            display_name: String::new(),
            address: String::new(),
        };
        self.from.first().unwrap_or(&EMPTY)
    }
}

fn join_addresses(list: &[EmailAddress]) -> String {
    list.iter()
        .map(|a| a.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl std::fmt::Display for Message {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.date {
            Some(date) => writeln!(f, "Date: {}", date.format("%Y-%m-%d %H:%M:%S %Z"))?,
            None => writeln!(f, "Date: unknown")?,
        }
        writeln!(f, "From: {}", join_addresses(&self.from))?;
        writeln!(f, "To: {}", join_addresses(&self.to))?;
        write!(f, "Subject: {}", self.subject)
    }
}
