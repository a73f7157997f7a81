//! The scan loop: fetch a message range, build each message, classify it.
//!
//! Fetching runs on a scoped producer thread that fills a bounded queue;
//! the calling thread drains it in sequence order and owns the sink.

use std::sync::mpsc;
use std::thread;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::actions::ActionsSink;
use crate::classify::{ClassificationChain, ClassifierFailure};
use crate::error::{Result, TidyError};
use crate::parser::mime::parse_message;
use crate::session::{MailSession, RawMessage};

/// Scan limits and queue sizing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOptions {
    pub mailbox: String,
    /// Upper bound on the number of messages examined.
    pub max_messages: u32,
    /// Raw messages the producer may buffer ahead of the classifier.
    pub queue_capacity: usize,
    /// Messages requested per fetch command.
    pub fetch_chunk: u32,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            mailbox: "INBOX".to_string(),
            max_messages: 100,
            queue_capacity: 10,
            fetch_chunk: 10,
        }
    }
}

impl ScanOptions {
    /// Sequence range to fetch for a mailbox holding `exists` messages.
    pub fn range(&self, exists: u32) -> Option<(u32, u32)> {
        let last = exists.min(self.max_messages);
        (last > 0).then_some((1, last))
    }
}

/// What a completed scan saw.
#[derive(Debug, Default)]
pub struct ScanReport {
    /// Messages in the mailbox at select time.
    pub exists: u32,
    /// Messages that reached the classification chain.
    pub classified: usize,
    /// Messages dropped because they could not be built.
    pub skipped: Vec<(u32, TidyError)>,
    /// Classifiers that gave up on a message.
    pub failures: Vec<ClassifierFailure>,
}

/// Drives one scan of one mailbox.
pub struct Scanner {
    chain: ClassificationChain,
    options: ScanOptions,
    now: Option<DateTime<Utc>>,
}

impl Scanner {
    pub fn new(chain: ClassificationChain, options: ScanOptions) -> Self {
        Self {
            chain,
            options,
            now: None,
        }
    }

    /// Pin the clock used to decide whether an event is over.
    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = Some(now);
        self
    }

    /// Select the mailbox and classify every message in range.
    ///
    /// Session errors abort the scan. A fetch error still lets the
    /// already-queued messages through before it is returned.
    pub fn run(&self, session: &mut dyn MailSession, sink: &mut ActionsSink) -> Result<ScanReport> {
        let exists = session.select(&self.options.mailbox)?;
        let mut report = ScanReport {
            exists,
            ..Default::default()
        };

        let Some((first, last)) = self.options.range(exists) else {
            info!(mailbox = %self.options.mailbox, "Mailbox is empty");
            return Ok(report);
        };
        info!(
            mailbox = %self.options.mailbox,
            exists,
            first,
            last,
            "Scanning messages"
        );

        let chunk = self.options.fetch_chunk.max(1);
        let (tx, rx) = mpsc::sync_channel::<RawMessage>(self.options.queue_capacity.max(1));

        let fetched = thread::scope(|s| {
            let producer = s.spawn(move || fetch_chunks(session, first, last, chunk, tx));

            for raw in rx {
                self.consume(raw, sink, &mut report);
            }

            producer
                .join()
                .unwrap_or_else(|_| Err(TidyError::Fetch("fetch thread panicked".to_string())))
        });

        fetched?;
        info!(
            classified = report.classified,
            skipped = report.skipped.len(),
            failures = report.failures.len(),
            "Scan complete"
        );
        Ok(report)
    }

    fn consume(&self, raw: RawMessage, sink: &mut ActionsSink, report: &mut ScanReport) {
        let msg = match parse_message(raw.sequence, &raw.data) {
            Ok(msg) => msg,
            Err(e) => {
                warn!(sequence = raw.sequence, error = %e, "Skipping message");
                report.skipped.push((raw.sequence, e));
                return;
            }
        };

        debug!(sequence = msg.sequence, subject = %msg.subject, "Classifying");
        let failures = match self.now {
            Some(now) => self.chain.classify_at(&msg, sink, now),
            None => self.chain.classify(&msg, sink),
        };
        report.classified += 1;
        report.failures.extend(failures);
    }
}

/// Producer side: fetch `first..=last` in chunks and queue each message.
///
/// Stops quietly if the consumer hangs up.
fn fetch_chunks(
    session: &mut dyn MailSession,
    first: u32,
    last: u32,
    chunk: u32,
    tx: mpsc::SyncSender<RawMessage>,
) -> Result<()> {
    let mut from = first;
    while from <= last {
        let to = from.saturating_add(chunk - 1).min(last);
        debug!(from, to, "Fetching");
        for raw in session.fetch_range(from, to)? {
            if tx.send(raw).is_err() {
                return Ok(());
            }
        }
        if to == last {
            break;
        }
        from = to + 1;
    }
    Ok(())
}
