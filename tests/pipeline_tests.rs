//! Integration tests for the scan loop and the end-of-scan flush.

mod common;

use chrono::{TimeZone, Utc};

use common::{harness, harness_with, load, FakeSession, RecordingBrowser};
use mailtidy::classify::ClassificationChain;
use mailtidy::dedup::{DedupStore, STORE_FILE_NAME};
use mailtidy::error::TidyError;
use mailtidy::flush::flush;
use mailtidy::scan::{ScanOptions, Scanner};

fn scanner() -> Scanner {
    Scanner::new(ClassificationChain::default(), ScanOptions::default())
        .at(Utc.with_ymd_and_hms(2023, 6, 1, 12, 0, 0).unwrap())
}

// ─── End to end ─────────────────────────────────────────────────────

#[test]
fn test_security_alert_end_to_end() {
    let mut session = FakeSession::with_fixtures(&["security_alert.eml"]);
    let mut h = harness(&["Y"]);

    let scan = scanner().run(&mut session, &mut h.sink).unwrap();
    assert_eq!(scan.exists, 1);
    assert_eq!(scan.classified, 1);
    assert!(scan.failures.is_empty());

    let pending = h.sink.pending();
    assert_eq!(pending.deletions.iter().copied().collect::<Vec<_>>(), vec![1]);
    assert!(pending.links.is_empty());

    let report = flush(&mut session, &mut h.sink);
    assert!(report.is_clean());
    assert_eq!(report.deleted, vec![1]);
    assert_eq!(session.count("store"), 1);
    assert_eq!(session.count("expunge"), 1);
    assert_eq!(
        session.commands,
        vec!["select INBOX", "fetch 1:1", "store 1", "expunge"]
    );
}

#[test]
fn test_mixed_mailbox_in_order() {
    let mut session = FakeSession::with_fixtures(&[
        "security_alert.eml",
        "rsvp_invite.eml",
        "bounce.eml",
        "past_event.eml",
    ]);
    // alert: keep, invite: yes, bounce: delete, past event: delete
    let mut h = harness(&["N", "Y", "Y", "Y"]);

    let scan = scanner().run(&mut session, &mut h.sink).unwrap();
    assert_eq!(scan.classified, 4);

    let report = flush(&mut session, &mut h.sink);
    assert!(report.is_clean());
    assert_eq!(report.deleted, vec![3, 4]);
    assert_eq!(session.count("store 3:4"), 1);
    assert_eq!(report.opened.len(), 1);
    assert!(report.opened[0].contains("rst=1"));
    assert_eq!(*h.browser.opened.borrow(), report.opened);
}

// ─── Scan ───────────────────────────────────────────────────────────

#[test]
fn test_scan_skips_unparseable_message() {
    let mut session = FakeSession::with_fixtures(&["no_from.eml", "security_alert.eml"]);
    let mut h = harness(&["Y"]);

    let scan = scanner().run(&mut session, &mut h.sink).unwrap();
    assert_eq!(scan.classified, 1);
    assert_eq!(scan.skipped.len(), 1);
    assert_eq!(scan.skipped[0].0, 1);
    assert!(scan.skipped[0].1.is_message_scoped());
    assert!(h.sink.pending().deletions.contains(&2));
}

#[test]
fn test_scan_caps_range_and_fetches_in_chunks() {
    let mut session = FakeSession::with_fixtures(&[
        "bounce.eml",
        "bounce.eml",
        "bounce.eml",
        "bounce.eml",
        "bounce.eml",
    ]);
    let mut h = harness(&["N", "N", "N"]);
    let options = ScanOptions {
        max_messages: 3,
        fetch_chunk: 2,
        queue_capacity: 1,
        ..Default::default()
    };

    let scan = Scanner::new(ClassificationChain::default(), options)
        .run(&mut session, &mut h.sink)
        .unwrap();
    assert_eq!(scan.exists, 5);
    assert_eq!(scan.classified, 3);
    assert_eq!(session.commands, vec!["select INBOX", "fetch 1:2", "fetch 3:3"]);
}

#[test]
fn test_scan_empty_mailbox() {
    let mut session = FakeSession::default();
    let mut h = harness(&[]);
    let scan = scanner().run(&mut session, &mut h.sink).unwrap();
    assert_eq!(scan.classified, 0);
    assert_eq!(session.commands, vec!["select INBOX"]);
}

#[test]
fn test_fetch_error_after_queued_messages() {
    let mut session = FakeSession::with_fixtures(&[
        "security_alert.eml",
        "bounce.eml",
        "bounce.eml",
    ]);
    session.fail_fetch_from = Some(3);
    let options = ScanOptions {
        fetch_chunk: 2,
        ..Default::default()
    };
    let mut h = harness(&["Y", "Y"]);

    let err = Scanner::new(ClassificationChain::default(), options)
        .run(&mut session, &mut h.sink)
        .unwrap_err();
    assert!(matches!(err, TidyError::Fetch(_)));

    // Both messages fetched before the failure were classified.
    assert_eq!(h.transcript.asked().len(), 2);
    assert_eq!(
        h.sink.pending().deletions.iter().copied().collect::<Vec<_>>(),
        vec![1, 2]
    );
    assert_eq!(session.count("store"), 0);
}

// ─── Flush ──────────────────────────────────────────────────────────

#[test]
fn test_flush_without_deletions_skips_store() {
    let mut session = FakeSession::default();
    let mut h = harness(&[]);
    h.sink.open_later("https://a.example/1");

    let report = flush(&mut session, &mut h.sink);
    assert!(report.is_clean());
    assert!(session.commands.is_empty());
    assert_eq!(report.opened, vec!["https://a.example/1"]);
}

#[test]
fn test_flush_is_idempotent() {
    let mut session = FakeSession::default();
    let mut h = harness(&[]);
    h.sink.delete(&load("bounce.eml", 2));

    flush(&mut session, &mut h.sink);
    let second = flush(&mut session, &mut h.sink);
    assert!(second.deleted.is_empty());
    assert_eq!(session.count("store"), 1);
    assert_eq!(session.count("expunge"), 1);
}

#[test]
fn test_flush_store_failure_skips_expunge() {
    let mut session = FakeSession {
        fail_store: true,
        ..Default::default()
    };
    let mut h = harness(&[]);
    h.sink.delete(&load("bounce.eml", 2));
    h.sink.open_later("https://a.example/1");

    let report = flush(&mut session, &mut h.sink);
    assert_eq!(report.failures.len(), 1);
    assert!(matches!(report.failures[0], TidyError::Flush { step: "store", .. }));
    assert_eq!(session.count("expunge"), 0);
    assert!(report.deleted.is_empty());
    assert_eq!(report.opened, vec!["https://a.example/1"]);
}

#[test]
fn test_flush_continues_past_browser_failure() {
    let mut session = FakeSession::default();
    let browser = RecordingBrowser {
        fail_on: Some("bad".into()),
        ..Default::default()
    };
    let mut h = harness_with(&[], browser);
    h.sink.open_later("https://bad.example/1");
    h.sink.open_later("https://good.example/2");

    let report = flush(&mut session, &mut h.sink);
    assert_eq!(report.failures.len(), 1);
    assert!(matches!(report.failures[0], TidyError::Browser { .. }));
    assert_eq!(report.opened, vec!["https://good.example/2"]);
}

#[test]
fn test_flush_saves_dedup_store() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(STORE_FILE_NAME);

    let mut session = FakeSession::with_fixtures(&["rsvp_invite.eml"]);
    let mut h = harness(&["Y"]);
    h.sink = h.sink.with_dedup(DedupStore::open(&path).unwrap());

    scanner().run(&mut session, &mut h.sink).unwrap();
    let report = flush(&mut session, &mut h.sink);
    assert!(report.is_clean());

    let reopened = DedupStore::open(&path).unwrap();
    assert_eq!(reopened.len(), 1);
    assert!(reopened.get_responded(&load("rsvp_invite.eml", 40)));
}

#[test]
fn test_failed_rsvp_launch_is_not_remembered() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(STORE_FILE_NAME);

    let mut session = FakeSession::with_fixtures(&["rsvp_invite.eml"]);
    let browser = RecordingBrowser {
        fail_on: Some("rst=1".into()),
        ..Default::default()
    };
    let mut h = harness_with(&["Y"], browser);
    h.sink = h.sink.with_dedup(DedupStore::open(&path).unwrap());

    scanner().run(&mut session, &mut h.sink).unwrap();
    let report = flush(&mut session, &mut h.sink);
    assert_eq!(report.failures.len(), 1);
    assert!(matches!(report.failures[0], TidyError::Browser { .. }));
    assert!(report.opened.is_empty());

    let reopened = DedupStore::open(&path).unwrap();
    assert_eq!(reopened.len(), 0);
    assert!(!reopened.get_responded(&load("rsvp_invite.eml", 40)));
}
