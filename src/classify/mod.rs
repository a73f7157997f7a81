//! The classification chain: an ordered list of independent classifiers.

pub mod calendar;
pub mod expired_event;
pub mod notices;
pub mod rsvp;

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::actions::ActionsSink;
use crate::error::{Result, TidyError};
use crate::model::message::Message;

/// One classification rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classifier {
    /// Account security alerts.
    SecurityAlert,
    /// Bounce notices.
    FailedMessageSend,
    /// Stand-alone `.ics` attachments.
    Calendar,
    /// Past events and pending RSVPs.
    ExpiredEvent,
}

impl Classifier {
    /// Every classifier in the default order.
    pub const ALL: [Classifier; 4] = [
        Classifier::SecurityAlert,
        Classifier::FailedMessageSend,
        Classifier::Calendar,
        Classifier::ExpiredEvent,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::SecurityAlert => "security-alert",
            Self::FailedMessageSend => "failed-message-send",
            Self::Calendar => "calendar",
            Self::ExpiredEvent => "expired-event",
        }
    }

    pub fn run(self, msg: &Message, sink: &mut ActionsSink, now: DateTime<Utc>) -> Result<()> {
        match self {
            Self::SecurityAlert => notices::handle_security_alert(msg, sink),
            Self::FailedMessageSend => notices::handle_failed_send(msg, sink),
            Self::Calendar => calendar::handle(msg, sink),
            Self::ExpiredEvent => expired_event::handle(msg, sink, now),
        }
    }
}

/// A classifier that gave up on a message.
#[derive(Debug)]
pub struct ClassifierFailure {
    pub classifier: Classifier,
    pub sequence: u32,
    pub error: TidyError,
}

/// Runs every classifier, in order, against each message.
///
/// A failing classifier abandons only its own work on the current message;
/// the classifiers after it still run.
#[derive(Debug, Clone)]
pub struct ClassificationChain {
    classifiers: Vec<Classifier>,
}

impl Default for ClassificationChain {
    fn default() -> Self {
        Self::new(Classifier::ALL.to_vec())
    }
}

impl ClassificationChain {
    pub fn new(classifiers: Vec<Classifier>) -> Self {
        Self { classifiers }
    }

    /// Classify against the current time.
    pub fn classify(&self, msg: &Message, sink: &mut ActionsSink) -> Vec<ClassifierFailure> {
        self.classify_at(msg, sink, Utc::now())
    }

    /// Classify as if the current time were `now`.
    pub fn classify_at(
        &self,
        msg: &Message,
        sink: &mut ActionsSink,
        now: DateTime<Utc>,
    ) -> Vec<ClassifierFailure> {
        let mut failures = Vec::new();
        for &classifier in &self.classifiers {
            if let Err(error) = classifier.run(msg, sink, now) {
                warn!(
                    classifier = classifier.name(),
                    sequence = msg.sequence,
                    error = %error,
                    "Classifier failed"
                );
                failures.push(ClassifierFailure {
                    classifier,
                    sequence: msg.sequence,
                    error,
                });
            }
        }
        failures
    }
}
