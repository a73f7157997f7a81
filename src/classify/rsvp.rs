//! Interactive RSVP dialog for calendar invitations.
//!
//! ```text
//!                 ┌──────────────────┐   invalid answer
//!         ┌──────▶│ AwaitingResponse │◀────────────┐
//!         │       └────────┬─────────┘─────────────┘
//!         │        D       │ Y/N/M     X        I
//!  ┌─────────────┐         ▼           ▼        ▼
//!  │ ShowDetails │   Respond(choice)  Delete   Ignore
//!  └─────────────┘   (terminal)       (terminal)(terminal)
//! ```
//!
//! The dialog runs for a single message and only touches that message's
//! links and the sink.

use scraper::{Html, Selector};
use tracing::{debug, warn};
use url::Url;

use crate::actions::{ActionsSink, Question};
use crate::error::Result;
use crate::model::message::Message;

/// Substring identifying RSVP response links.
pub const RSVP_ACTION_MARKER: &str = "event?action=RESPOND";

/// Substring identifying event detail links.
pub const DETAILS_ACTION_MARKER: &str = "event?action=VIEW";

/// Query parameter carrying the response code.
const RESPONSE_PARAM: &str = "rst";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RsvpChoice {
    Yes,
    No,
    Maybe,
}

impl RsvpChoice {
    /// Value of the `rst` parameter on the matching response link.
    pub fn response_code(self) -> &'static str {
        match self {
            Self::Yes => "1",
            Self::No => "2",
            Self::Maybe => "3",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    AwaitingResponse,
    ShowDetails,
    Respond(RsvpChoice),
    Delete,
    Ignore,
}

impl State {
    fn from_answer(answer: &str) -> Option<Self> {
        match answer {
            "Y" => Some(Self::Respond(RsvpChoice::Yes)),
            "N" => Some(Self::Respond(RsvpChoice::No)),
            "M" => Some(Self::Respond(RsvpChoice::Maybe)),
            "D" => Some(Self::ShowDetails),
            "X" => Some(Self::Delete),
            "I" => Some(Self::Ignore),
            _ => None,
        }
    }
}

/// How a dialog ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Matching response links were deferred.
    Responded { choice: RsvpChoice, deferred: usize },
    /// The message was marked for deletion.
    Deleted,
    /// The operator chose to do nothing.
    Ignored,
    /// The dedup store already has this message; no question was asked.
    AlreadyResponded,
}

/// One message's RSVP dialog.
pub struct RsvpNegotiator<'a> {
    msg: &'a Message,
    links: Vec<String>,
}

impl<'a> RsvpNegotiator<'a> {
    /// Collect the hyperlink targets of an already parsed body.
    pub fn new(msg: &'a Message, document: &Html) -> Self {
        let links = match Selector::parse("a[href]") {
            Ok(anchors) => document
                .select(&anchors)
                .filter_map(|a| a.value().attr("href"))
                .map(str::to_string)
                .collect(),
            Err(e) => {
                warn!(error = %e, "Anchor selector rejected");
                Vec::new()
            }
        };
        Self { msg, links }
    }

    /// Parse the message body and collect its hyperlink targets.
    pub fn from_body(msg: &'a Message) -> Self {
        Self::new(msg, &Html::parse_document(&msg.body))
    }

    /// Every hyperlink target in the body, in document order.
    pub fn links(&self) -> &[String] {
        &self.links
    }

    /// Run the dialog until it reaches a terminal state.
    pub fn run(&self, sink: &mut ActionsSink) -> Result<Outcome> {
        if sink.already_responded(self.msg) {
            sink.print("Already responded to this invitation. Skipping.");
            return Ok(Outcome::AlreadyResponded);
        }

        sink.print("Calendar response found for this message!");
        let mut state = State::AwaitingResponse;
        loop {
            debug!(sequence = self.msg.sequence, ?state, "RSVP dialog");
            state = match state {
                State::AwaitingResponse => {
                    let answer = sink.prompt(&Question::Rsvp)?;
                    State::from_answer(&answer).unwrap_or_else(|| {
                        sink.print("Invalid response.");
                        State::AwaitingResponse
                    })
                }
                State::ShowDetails => {
                    self.show_details(sink);
                    State::AwaitingResponse
                }
                State::Respond(choice) => return Ok(self.respond(choice, sink)),
                State::Delete => {
                    sink.delete(self.msg);
                    sink.forget_responded(self.msg);
                    return Ok(Outcome::Deleted);
                }
                State::Ignore => return Ok(Outcome::Ignored),
            };
        }
    }

    fn show_details(&self, sink: &mut ActionsSink) {
        let Some(link) = self
            .links
            .iter()
            .find(|l| l.contains(DETAILS_ACTION_MARKER))
        else {
            sink.print("No details link found for this message.");
            return;
        };

        sink.print("Displaying further details...");
        if let Err(e) = sink.open_now(link) {
            sink.print(&format!("Could not open details: {e}"));
        }
    }

    fn respond(&self, choice: RsvpChoice, sink: &mut ActionsSink) -> Outcome {
        let code = choice.response_code();
        let mut deferred = 0;
        for link in self
            .links
            .iter()
            .filter(|l| l.contains(RSVP_ACTION_MARKER) && has_query_param(l, RESPONSE_PARAM, code))
        {
            sink.open_later_answering(link, self.msg);
            deferred += 1;
        }

        if deferred == 0 {
            sink.print("No matching response link found for this message.");
        } else {
            sink.print("Adding to link list.");
            sink.mark_responded(self.msg);
        }
        Outcome::Responded { choice, deferred }
    }
}

/// `true` if the URL's decoded query has `key=value` as a whole parameter.
fn has_query_param(link: &str, key: &str, value: &str) -> bool {
    Url::parse(link).is_ok_and(|url| url.query_pairs().any(|(k, v)| k == key && v == value))
}
