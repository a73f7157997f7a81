//! Mail server sessions.

pub mod imap;

use crate::error::Result;

/// One message as delivered by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMessage {
    pub sequence: u32,
    pub data: Vec<u8>,
}

/// What the scanner needs from an authenticated mailbox connection.
///
/// Implementations must be `Send`: the fetch side runs on its own thread.
pub trait MailSession: Send {
    /// Select a mailbox and return the number of messages in it.
    fn select(&mut self, mailbox: &str) -> Result<u32>;

    /// Fetch the full contents of messages `from..=to`, in sequence order.
    fn fetch_range(&mut self, from: u32, to: u32) -> Result<Vec<RawMessage>>;

    /// Add the `\Deleted` flag to every listed message.
    fn store_deleted(&mut self, sequences: &[u32]) -> Result<()>;

    /// Permanently remove flagged messages. Returns the expunged sequence numbers.
    fn expunge(&mut self) -> Result<Vec<u32>>;

    fn logout(&mut self) -> Result<()>;
}

/// Compact IMAP sequence-set notation: `1:3,7,9:10`.
pub fn sequence_set(sequences: &[u32]) -> String {
    let mut sorted = sequences.to_vec();
    sorted.sort_unstable();
    sorted.dedup();

    let mut parts: Vec<String> = Vec::new();
    let mut iter = sorted.into_iter().peekable();
    while let Some(start) = iter.next() {
        let mut end = start;
        while iter.peek() == Some(&(end + 1)) {
            end += 1;
            iter.next();
        }
        if start == end {
            parts.push(start.to_string());
        } else {
            parts.push(format!("{start}:{end}"));
        }
    }
    parts.join(",")
}
