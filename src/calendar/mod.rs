//! Calendar import: ICS parsing and the remote calendar service.

pub mod google;
pub mod ics;

use crate::error::{Result, TidyError};

/// Creates calendar events from invitation payloads.
pub trait CalendarImporter {
    /// Import an ICS payload and return a link to the created event.
    fn import_event(&mut self, ics: &[u8]) -> Result<String>;
}

/// Used when no calendar credentials are configured. Every import fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledCalendar;

impl CalendarImporter for DisabledCalendar {
    fn import_event(&mut self, _ics: &[u8]) -> Result<String> {
        Err(TidyError::Calendar(
            "calendar import is not configured".to_string(),
        ))
    }
}
