//! Attachment payloads.
//!
//! Unlike inline parts, attachments are kept as raw bytes so that
//! classifiers can hand them to collaborators unchanged.

/// A fully buffered attachment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attachment {
    /// Declared filename. Generated if missing from the headers.
    pub filename: String,

    /// Decoded content (transfer encoding already removed).
    pub data: Vec<u8>,
}

impl Attachment {
    pub fn new(filename: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.into(),
            data: data.into(),
        }
    }

    /// `true` if the filename carries the iCalendar extension.
    pub fn is_ics(&self) -> bool {
        self.filename.ends_with(".ics")
    }
}
