//! Stand-alone `.ics` invitations that the mail service did not turn into
//! a native invite.

use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;

use crate::actions::ActionsSink;
use crate::error::Result;
use crate::model::message::Message;

const INSTALL_QUESTION: &str = "Do you want to install the calendar attachment in this email? (Y/N)";

/// Subject shape of invitations the mail service already handles natively,
/// e.g. `Invitation: Standup @ Mon 2 Jan 2023 09:00 - 09:15 (GMT) (me@example.com)`.
fn native_invite_subject() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r".*@.*\(GMT\) \(.*\)").expect("static pattern compiles"))
}

pub fn is_native_invite(subject: &str) -> bool {
    native_invite_subject().is_match(subject)
}

pub fn handle(msg: &Message, sink: &mut ActionsSink) -> Result<()> {
    for attachment in msg.attachments.iter().filter(|a| a.is_ics()) {
        if is_native_invite(&msg.subject) {
            debug!(
                sequence = msg.sequence,
                filename = %attachment.filename,
                "Skipping native invite"
            );
            sink.print("This message is already a calendar invite. Skipping ICS installation.");
            continue;
        }

        sink.print(&format!("Calendar attachment found: {}", attachment.filename));
        sink.print(&msg.to_string());
        if !sink.confirm(INSTALL_QUESTION)? {
            continue;
        }

        let link = sink.import_calendar(&attachment.data)?;
        sink.print(&format!("Event created: {link}"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_native_invite_subjects() {
        assert!(is_native_invite(
            "Invitation: Standup @ Mon 2 Jan 2023 09:00 - 09:15 (GMT) (me@example.com)"
        ));
        assert!(!is_native_invite("Team offsite agenda"));
        assert!(!is_native_invite("Lunch @ noon (BST) (me@example.com)"));
    }
}
