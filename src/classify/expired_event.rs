//! Event notifications: stale ones are offered for deletion, live ones with
//! RSVP links go to the RSVP dialog.

use chrono::{DateTime, Utc};
use scraper::{Html, Selector};
use tracing::debug;

use super::rsvp::RsvpNegotiator;
use crate::actions::ActionsSink;
use crate::calendar::ics::parse_timestamp;
use crate::error::Result;
use crate::model::message::Message;

/// Body marker showing the invitation can be answered from the message.
pub const RSVP_PAGE_MARKER: &str = "https://calendar.google.com/calendar/event?action=RESPOND";

const PAST_EVENT_QUESTION: &str = "The event is in the past. Do you want to delete this email? (Y/N)";

/// Why no event window could be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingTime {
    /// The body has no `<time>` tags at all.
    NoTags,
    /// The first tag has no `datetime` or it does not parse.
    Start,
    /// The last tag has no `datetime` or it does not parse.
    End,
}

/// Start and end of the event, read from the first and last `<time datetime>` tags.
pub fn event_window(
    document: &Html,
) -> std::result::Result<(DateTime<Utc>, DateTime<Utc>), MissingTime> {
    let Ok(times) = Selector::parse("time") else {
        return Err(MissingTime::NoTags);
    };
    let tags: Vec<_> = document.select(&times).collect();
    let (Some(first), Some(last)) = (tags.first(), tags.last()) else {
        return Err(MissingTime::NoTags);
    };
    let read = |tag: &scraper::ElementRef<'_>| {
        tag.value().attr("datetime").and_then(parse_timestamp)
    };
    let start = read(first).ok_or(MissingTime::Start)?;
    let end = read(last).ok_or(MissingTime::End)?;
    Ok((start, end))
}

pub fn handle(msg: &Message, sink: &mut ActionsSink, now: DateTime<Utc>) -> Result<()> {
    let document = Html::parse_document(&msg.body);

    let (start, end) = match event_window(&document) {
        Ok(window) => window,
        Err(missing) => {
            let what = match missing {
                MissingTime::NoTags => "no event end time found",
                MissingTime::Start => "event start time is missing or unreadable",
                MissingTime::End => "event end time is missing or unreadable",
            };
            sink.print(&format!("Message {}: {what}.", msg.sequence));
            return Ok(());
        }
    };
    debug!(sequence = msg.sequence, %start, %end, "Event window");

    if end < now {
        sink.print(&msg.to_string());
        if sink.confirm(PAST_EVENT_QUESTION)? {
            sink.delete(msg);
        }
    } else if msg.body.contains(RSVP_PAGE_MARKER) {
        sink.print(&msg.to_string());
        let outcome = RsvpNegotiator::new(msg, &document).run(sink)?;
        debug!(sequence = msg.sequence, ?outcome, "RSVP dialog finished");
    } else {
        sink.print("No calendar response found for this message.");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_event_window_first_and_last() {
        let doc = Html::parse_document(
            r#"<p><time datetime="20230101T000000Z">start</time> to
               <time datetime="20230101T003000Z">mid</time>
               <time datetime="20230101T010000Z">end</time></p>"#,
        );
        let (start, end) = event_window(&doc).unwrap();
        assert_eq!(start, Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2023, 1, 1, 1, 0, 0).unwrap());
    }

    #[test]
    fn test_event_window_absent() {
        assert_eq!(
            event_window(&Html::parse_document("<p>plain</p>")),
            Err(MissingTime::NoTags)
        );
        assert_eq!(
            event_window(&Html::parse_document("<time>no attr</time>")),
            Err(MissingTime::Start)
        );
        assert_eq!(
            event_window(&Html::parse_document(
                r#"<time datetime="tomorrow">bad</time>"#
            )),
            Err(MissingTime::Start)
        );
    }

    #[test]
    fn test_event_window_names_the_bad_tag() {
        let bad_start = Html::parse_document(
            r#"<time datetime="soon">start</time>
               <time datetime="20230101T010000Z">end</time>"#,
        );
        assert_eq!(event_window(&bad_start), Err(MissingTime::Start));

        let bad_end = Html::parse_document(
            r#"<time datetime="20230101T000000Z">start</time>
               <time>end</time>"#,
        );
        assert_eq!(event_window(&bad_end), Err(MissingTime::End));
    }
}
