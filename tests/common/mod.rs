//! Fakes and fixture helpers shared by the integration tests.

#![allow(dead_code)]

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use mailtidy::actions::console::{ScriptedConsole, Transcript};
use mailtidy::actions::ActionsSink;
use mailtidy::browser::Browser;
use mailtidy::calendar::CalendarImporter;
use mailtidy::error::{Result, TidyError};
use mailtidy::model::message::Message;
use mailtidy::parser::mime::parse_message;
use mailtidy::session::{sequence_set, MailSession, RawMessage};

pub const EVENT_LINK: &str = "https://calendar.example/event/1";

pub fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

pub fn raw(name: &str, sequence: u32) -> RawMessage {
    RawMessage {
        sequence,
        data: std::fs::read(fixture(name)).unwrap(),
    }
}

pub fn load(name: &str, sequence: u32) -> Message {
    let raw = raw(name, sequence);
    parse_message(raw.sequence, &raw.data).unwrap()
}

// ─── Mail session ───────────────────────────────────────────────────

/// In-memory mailbox that records every command it receives.
#[derive(Debug, Default)]
pub struct FakeSession {
    pub messages: Vec<RawMessage>,
    pub commands: Vec<String>,
    /// Fetches starting at or after this sequence number fail.
    pub fail_fetch_from: Option<u32>,
    pub fail_store: bool,
}

impl FakeSession {
    pub fn with_fixtures(names: &[&str]) -> Self {
        Self {
            messages: names
                .iter()
                .enumerate()
                .map(|(i, name)| raw(name, i as u32 + 1))
                .collect(),
            ..Default::default()
        }
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.commands.iter().filter(|c| c.starts_with(prefix)).count()
    }
}

impl MailSession for FakeSession {
    fn select(&mut self, mailbox: &str) -> Result<u32> {
        self.commands.push(format!("select {mailbox}"));
        Ok(self.messages.len() as u32)
    }

    fn fetch_range(&mut self, from: u32, to: u32) -> Result<Vec<RawMessage>> {
        self.commands.push(format!("fetch {from}:{to}"));
        if self.fail_fetch_from.is_some_and(|f| from >= f) {
            return Err(TidyError::Fetch("connection reset by peer".into()));
        }
        Ok(self
            .messages
            .iter()
            .filter(|m| (from..=to).contains(&m.sequence))
            .cloned()
            .collect())
    }

    fn store_deleted(&mut self, sequences: &[u32]) -> Result<()> {
        self.commands.push(format!("store {}", sequence_set(sequences)));
        if self.fail_store {
            return Err(TidyError::Flush {
                step: "store",
                reason: "NO [READ-ONLY] mailbox is read-only".into(),
            });
        }
        Ok(())
    }

    fn expunge(&mut self) -> Result<Vec<u32>> {
        self.commands.push("expunge".into());
        Ok(Vec::new())
    }

    fn logout(&mut self) -> Result<()> {
        self.commands.push("logout".into());
        Ok(())
    }
}

// ─── Browser and calendar ───────────────────────────────────────────

/// Records opened URLs; URLs containing `fail_on` are refused.
#[derive(Clone, Default)]
pub struct RecordingBrowser {
    pub opened: Rc<RefCell<Vec<String>>>,
    pub fail_on: Option<String>,
}

impl Browser for RecordingBrowser {
    fn open(&mut self, url: &str) -> Result<()> {
        if self.fail_on.as_deref().is_some_and(|f| url.contains(f)) {
            return Err(TidyError::Browser {
                url: url.to_string(),
                reason: "no handler".into(),
            });
        }
        self.opened.borrow_mut().push(url.to_string());
        Ok(())
    }
}

/// Accepts every import and keeps the payloads.
#[derive(Clone, Default)]
pub struct RecordingCalendar {
    pub imported: Rc<RefCell<Vec<Vec<u8>>>>,
}

impl CalendarImporter for RecordingCalendar {
    fn import_event(&mut self, ics: &[u8]) -> Result<String> {
        self.imported.borrow_mut().push(ics.to_vec());
        Ok(EVENT_LINK.to_string())
    }
}

// ─── Sink harness ───────────────────────────────────────────────────

pub struct Harness {
    pub sink: ActionsSink,
    pub transcript: Transcript,
    pub browser: RecordingBrowser,
    pub calendar: RecordingCalendar,
}

pub fn harness(answers: &[&str]) -> Harness {
    harness_with(answers, RecordingBrowser::default())
}

pub fn harness_with(answers: &[&str], browser: RecordingBrowser) -> Harness {
    let console = ScriptedConsole::new(answers.iter().copied());
    let transcript = console.transcript();
    let calendar = RecordingCalendar::default();
    let sink = ActionsSink::new(
        Box::new(console),
        Box::new(calendar.clone()),
        Box::new(browser.clone()),
    );
    Harness {
        sink,
        transcript,
        browser,
        calendar,
    }
}
