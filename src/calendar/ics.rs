//! Minimal iCalendar (RFC 5545) reader for invitation requests.
//!
//! Only the fields needed to recreate the event are read: `METHOD` from the
//! calendar, and `DTSTART`, `DTEND`, `SUMMARY`, `DESCRIPTION` from the first
//! `VEVENT`.

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::error::{Result, TidyError};

/// Timestamp layout used by invitation payloads and `<time datetime>` tags.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%dT%H%M%SZ";

/// Parse a UTC timestamp such as `20230101T000000Z`.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw.trim(), TIMESTAMP_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

/// The event described by an invitation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IcsEvent {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub summary: String,
    pub description: String,
}

impl IcsEvent {
    /// Parse an ICS payload. Fails unless `METHOD` is `REQUEST` and the first
    /// event carries both timestamps and a summary.
    pub fn parse(payload: &[u8]) -> Result<Self> {
        let text = String::from_utf8_lossy(payload);
        let lines = unfold(&text);

        let mut method = None;
        let mut start = None;
        let mut end = None;
        let mut summary = None;
        let mut description = None;
        let mut in_event = false;
        let mut seen_event = false;

        for line in &lines {
            let Some((name, value)) = split_property(line) else {
                continue;
            };
            match name.as_str() {
                "BEGIN" if value.eq_ignore_ascii_case("VEVENT") => {
                    if seen_event {
                        break;
                    }
                    in_event = true;
                    seen_event = true;
                }
                "END" if value.eq_ignore_ascii_case("VEVENT") => in_event = false,
                "METHOD" if !in_event => method = Some(value.trim().to_string()),
                "DTSTART" if in_event => start = Some(value.to_string()),
                "DTEND" if in_event => end = Some(value.to_string()),
                "SUMMARY" if in_event => summary = Some(unescape(value)),
                "DESCRIPTION" if in_event => description = Some(unescape(value)),
                _ => {}
            }
        }

        match method.as_deref() {
            Some("REQUEST") => {}
            Some(other) => {
                return Err(TidyError::Ics(format!(
                    "unsupported METHOD '{other}', expected REQUEST"
                )))
            }
            None => return Err(TidyError::Ics("missing METHOD".to_string())),
        }

        let start = required_timestamp("DTSTART", start)?;
        let end = required_timestamp("DTEND", end)?;
        let summary = summary.ok_or_else(|| TidyError::Ics("missing SUMMARY".to_string()))?;

        Ok(Self {
            start,
            end,
            summary,
            description: description.unwrap_or_default(),
        })
    }
}

fn required_timestamp(field: &str, raw: Option<String>) -> Result<DateTime<Utc>> {
    let raw = raw.ok_or_else(|| TidyError::Ics(format!("missing {field}")))?;
    parse_timestamp(&raw).ok_or_else(|| TidyError::Ics(format!("unparseable {field} '{raw}'")))
}

/// Join continuation lines (those starting with a space or tab) onto
/// the previous line.
fn unfold(text: &str) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    for raw in text.split('\n') {
        let raw = raw.strip_suffix('\r').unwrap_or(raw);
        match (raw.strip_prefix([' ', '\t']), lines.last_mut()) {
            (Some(rest), Some(last)) => last.push_str(rest),
            _ => lines.push(raw.to_string()),
        }
    }
    lines
}

/// Split `NAME;PARAM=x:value` into the uppercased name and the value.
fn split_property(line: &str) -> Option<(String, &str)> {
    let colon = line.find(':')?;
    let head = &line[..colon];
    let name = head.split(';').next().unwrap_or(head);
    Some((name.trim().to_ascii_uppercase(), &line[colon + 1..]))
}

fn unescape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') | Some('N') => out.push('\n'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}
