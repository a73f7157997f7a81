//! Automated notices that are safe to throw away once read.

use crate::actions::ActionsSink;
use crate::error::Result;
use crate::model::message::Message;

/// Sender of account-security notifications.
pub const SECURITY_SENDER: &str = "no-reply@accounts.google.com";

/// Subject phrase of account-security notifications.
pub const SECURITY_SUBJECT: &str = "Security alert";

/// Display name of bounce messages.
pub const DELIVERY_SUBSYSTEM: &str = "Mail Delivery Subsystem";

const DELETE_QUESTION: &str = "Do you want to delete this email? (Y/N)";

pub fn is_security_alert(msg: &Message) -> bool {
    msg.subject.contains(SECURITY_SUBJECT) && msg.sender().is_address(SECURITY_SENDER)
}

pub fn is_failed_send(msg: &Message) -> bool {
    msg.sender().is_named(DELIVERY_SUBSYSTEM)
}

/// Security alerts from the account provider.
pub fn handle_security_alert(msg: &Message, sink: &mut ActionsSink) -> Result<()> {
    if !is_security_alert(msg) {
        return Ok(());
    }
    offer_deletion(msg, sink, "Security alert found.")
}

/// Bounce notices for mail that could not be delivered.
pub fn handle_failed_send(msg: &Message, sink: &mut ActionsSink) -> Result<()> {
    if !is_failed_send(msg) {
        return Ok(());
    }
    offer_deletion(msg, sink, "Failed delivery notice found.")
}

fn offer_deletion(msg: &Message, sink: &mut ActionsSink, notice: &str) -> Result<()> {
    sink.print(notice);
    sink.print(&msg.to_string());
    if sink.confirm(DELETE_QUESTION)? {
        sink.delete(msg);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::address::EmailAddress;

    fn from(name: &str, address: &str, subject: &str) -> Message {
        Message {
            subject: subject.into(),
            from: vec![EmailAddress::new(name, address)],
            ..Default::default()
        }
    }

    #[test]
    fn test_security_alert_needs_subject_and_sender() {
        assert!(is_security_alert(&from(
            "Google",
            "No-Reply@Accounts.Google.com",
            "Security alert for your account"
        )));
        assert!(!is_security_alert(&from(
            "Google",
            "no-reply@accounts.google.com",
            "Your weekly summary"
        )));
        assert!(!is_security_alert(&from(
            "Someone",
            "someone@example.com",
            "Security alert for your account"
        )));
    }

    #[test]
    fn test_failed_send_matches_display_name_only() {
        assert!(is_failed_send(&from(
            "mail delivery subsystem",
            "mailer-daemon@googlemail.com",
            "anything"
        )));
        assert!(!is_failed_send(&from(
            "Mail Delivery",
            "mailer-daemon@googlemail.com",
            "Delivery Status Notification"
        )));
    }
}
