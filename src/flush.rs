//! End-of-scan batch: apply deletions, open deferred links, persist markers.

use tracing::{info, warn};

use crate::actions::ActionsSink;
use crate::error::TidyError;
use crate::session::MailSession;

/// Outcome of a flush.
#[derive(Debug, Default)]
pub struct FlushReport {
    /// Sequence numbers flagged as deleted.
    pub deleted: Vec<u32>,
    /// Sequence numbers the server reported as expunged.
    pub expunged: Vec<u32>,
    /// Links handed to the browser.
    pub opened: Vec<String>,
    /// Every step that failed, in the order it ran.
    pub failures: Vec<TidyError>,
}

impl FlushReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Apply everything the sink accumulated.
///
/// Deletions go out as one store plus one expunge, and only if there is
/// something to delete; the expunge is skipped when the store fails. Links
/// open in the order they were deferred; an RSVP link that fails to open
/// takes its dedup marker with it. No step stops the ones after it.
/// The sink is left empty, so a second flush does nothing.
pub fn flush(session: &mut dyn MailSession, sink: &mut ActionsSink) -> FlushReport {
    let pending = sink.take_pending();
    let mut report = FlushReport::default();

    if !pending.deletions.is_empty() {
        let sequences: Vec<u32> = pending.deletions.into_iter().collect();
        info!(count = sequences.len(), "Deleting messages");
        match session.store_deleted(&sequences) {
            Ok(()) => {
                report.deleted = sequences;
                match session.expunge() {
                    Ok(expunged) => {
                        info!(count = expunged.len(), "Expunged messages");
                        report.expunged = expunged;
                    }
                    Err(e) => {
                        warn!(error = %e, "Expunge failed");
                        report.failures.push(e);
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, "Marking messages as deleted failed");
                report.failures.push(e);
            }
        }
    }

    for link in pending.links {
        match sink.open_now(&link.url) {
            Ok(()) => report.opened.push(link.url),
            Err(e) => {
                warn!(link = %link.url, error = %e, "Could not open deferred link");
                if let Some(hash) = link.answers.as_deref() {
                    sink.forget_answer(hash);
                }
                report.failures.push(e);
            }
        }
    }

    if let Err(e) = sink.save_dedup() {
        warn!(error = %e, "Could not save dedup store");
        report.failures.push(e);
    }

    report
}
