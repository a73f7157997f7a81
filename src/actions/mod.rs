//! The side-effect boundary between classification and the outside world.
//!
//! Classifiers never talk to the mail server, the browser or the terminal
//! directly. They ask an [`ActionsSink`] to record a deletion, defer a link,
//! or put a question to the operator. Destructive effects stay pending until
//! [`crate::flush`] runs at the end of the scan.

pub mod console;

use std::collections::BTreeSet;

use tracing::{debug, info, warn};

use crate::browser::Browser;
use crate::calendar::CalendarImporter;
use crate::dedup::{content_hash, DedupStore};
use crate::error::Result;
use crate::model::message::Message;

pub use self::console::{Console, Question};

/// A link queued for the end of the scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeferredLink {
    pub url: String,
    /// Content hash of the invitation this link answers. The dedup marker
    /// for it is withdrawn if the link cannot be opened.
    pub answers: Option<String>,
}

/// Effects accumulated during a scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingEffects {
    /// Sequence numbers to mark as deleted and expunge.
    pub deletions: BTreeSet<u32>,
    /// Links to open once the scan is over, in request order.
    pub links: Vec<DeferredLink>,
}

impl PendingEffects {
    pub fn is_empty(&self) -> bool {
        self.deletions.is_empty() && self.links.is_empty()
    }

    /// Deferred URLs in request order.
    pub fn urls(&self) -> Vec<&str> {
        self.links.iter().map(|l| l.url.as_str()).collect()
    }
}

/// Session-scoped sink for every action a classifier can request.
///
/// The sink owns the only mutable scan state: pending deletions, deferred
/// links and the dedup markers. Nothing recorded here is retracted before
/// the flush.
pub struct ActionsSink {
    console: Box<dyn Console>,
    calendar: Box<dyn CalendarImporter>,
    browser: Box<dyn Browser>,
    dedup: Option<DedupStore>,
    pending: PendingEffects,
}

impl ActionsSink {
    pub fn new(
        console: Box<dyn Console>,
        calendar: Box<dyn CalendarImporter>,
        browser: Box<dyn Browser>,
    ) -> Self {
        Self {
            console,
            calendar,
            browser,
            dedup: None,
            pending: PendingEffects::default(),
        }
    }

    /// Attach a dedup store consulted by the RSVP dialog.
    pub fn with_dedup(mut self, store: DedupStore) -> Self {
        self.dedup = Some(store);
        self
    }

    /// Request deletion of `msg`. Repeated requests are idempotent.
    pub fn delete(&mut self, msg: &Message) {
        if self.pending.deletions.insert(msg.sequence) {
            info!(sequence = msg.sequence, "Marked message for deletion");
        }
    }

    /// Show text to the operator.
    pub fn print(&mut self, text: &str) {
        if let Err(e) = self.console.say(text) {
            warn!(error = %e, "Could not write to console");
        }
    }

    /// Ask the operator a question and return the trimmed, uppercased answer.
    pub fn prompt(&mut self, question: &Question) -> Result<String> {
        let answer = self.console.ask(question)?.trim().to_uppercase();
        debug!(question = question.text(), answer = %answer, "Operator answered");
        Ok(answer)
    }

    /// Ask a yes/no question; only an answer of exactly `Y` counts as yes.
    pub fn confirm(&mut self, text: &str) -> Result<bool> {
        Ok(self.prompt(&Question::confirm(text))? == "Y")
    }

    /// Create a calendar event from an ICS payload and return its link.
    pub fn import_calendar(&mut self, ics: &[u8]) -> Result<String> {
        self.calendar.import_event(ics)
    }

    /// Open a link right away.
    pub fn open_now(&mut self, link: &str) -> Result<()> {
        self.browser.open(link)
    }

    /// Queue a link to be opened after the scan.
    pub fn open_later(&mut self, link: &str) {
        debug!(link, "Deferred link");
        self.pending.links.push(DeferredLink {
            url: link.to_string(),
            answers: None,
        });
    }

    /// Queue a link that answers the invitation in `msg`.
    pub fn open_later_answering(&mut self, link: &str, msg: &Message) {
        debug!(link, sequence = msg.sequence, "Deferred response link");
        self.pending.links.push(DeferredLink {
            url: link.to_string(),
            answers: Some(content_hash(msg)),
        });
    }

    pub fn already_responded(&self, msg: &Message) -> bool {
        self.dedup
            .as_ref()
            .is_some_and(|store| store.get_responded(msg))
    }

    pub fn mark_responded(&mut self, msg: &Message) {
        if let Some(store) = self.dedup.as_mut() {
            store.add_responded(msg);
        }
    }

    pub fn forget_responded(&mut self, msg: &Message) {
        if let Some(store) = self.dedup.as_mut() {
            store.remove_responded(msg);
        }
    }

    /// Withdraw the marker for a content hash whose response never went out.
    pub fn forget_answer(&mut self, hash: &str) {
        if let Some(store) = self.dedup.as_mut() {
            store.remove_hash(hash);
        }
    }

    pub fn pending(&self) -> &PendingEffects {
        &self.pending
    }

    /// Hand over everything accumulated so far, leaving the sink empty.
    pub fn take_pending(&mut self) -> PendingEffects {
        std::mem::take(&mut self.pending)
    }

    /// Persist the dedup store, if one is attached.
    pub fn save_dedup(&mut self) -> Result<()> {
        match self.dedup.as_mut() {
            Some(store) => store.save(),
            None => Ok(()),
        }
    }
}
