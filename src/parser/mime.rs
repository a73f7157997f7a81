//! MIME message parsing: header extraction, inline body assembly, attachment buffering.

use chrono::DateTime;
use mail_parser::{Address, MessageParser, MessagePart, MimeHeaders, PartType};
use tracing::debug;

use crate::error::{Result, TidyError};
use crate::model::address::EmailAddress;
use crate::model::attachment::Attachment;
use crate::model::message::Message;

/// Parse a complete raw message (headers + body) into a [`Message`].
///
/// `Subject` and `From` are mandatory; `Date` and `To` are best-effort.
/// Leaf parts are walked in order: text parts of any subtype are appended
/// to the body unless they carry an attachment disposition or a file name,
/// everything else is buffered whole.
pub fn parse_message(sequence: u32, raw_message: &[u8]) -> Result<Message> {
    let parsed = MessageParser::default()
        .parse(raw_message)
        .ok_or(TidyError::MessageParse { sequence })?;

    let subject = parsed
        .subject()
        .map(str::to_string)
        .ok_or(TidyError::HeaderMissing {
            sequence,
            header: "Subject",
        })?;

    let from = collect_addresses(parsed.from());
    if from.is_empty() {
        return Err(TidyError::HeaderMissing {
            sequence,
            header: "From",
        });
    }

    let to = collect_addresses(parsed.to());
    let date = parsed
        .date()
        .and_then(|d| DateTime::from_timestamp(d.to_timestamp(), 0));

    let mut body = String::new();
    let mut attachments = Vec::new();

    for (idx, part) in parsed.parts.iter().enumerate() {
        if matches!(part.body, PartType::Multipart(_)) {
            continue;
        }
        if part.is_encoding_problem {
            return Err(TidyError::PartRead {
                sequence,
                index: idx,
                reason: "content could not be decoded".to_string(),
            });
        }

        match &part.body {
            PartType::Text(text) | PartType::Html(text) if !is_named_attachment(part) => {
                body.push_str(text);
            }
            _ => {
                let filename = part
                    .attachment_name()
                    .map(String::from)
                    .unwrap_or_else(|| format!("attachment_{}", attachments.len()));
                attachments.push(Attachment::new(filename, part.contents()));
            }
        }
    }

    debug!(
        sequence,
        body_len = body.len(),
        attachments = attachments.len(),
        "Parsed message"
    );

    Ok(Message {
        sequence,
        subject,
        from,
        to,
        date,
        body,
        attachments,
    })
}

/// `Content-Disposition: attachment`, or a `filename`/`name` parameter.
fn is_named_attachment(part: &MessagePart<'_>) -> bool {
    part.content_disposition().is_some_and(|cd| cd.is_attachment())
        || part.attachment_name().is_some()
}

/// Flatten an address header (plain list or groups) into address pairs,
/// dropping entries without an address.
fn collect_addresses(header: Option<&Address<'_>>) -> Vec<EmailAddress> {
    let addrs: Vec<EmailAddress> = match header {
        Some(Address::List(list)) => list.iter().map(EmailAddress::from_addr).collect(),
        Some(Address::Group(groups)) => groups
            .iter()
            .flat_map(|g| g.addresses.iter())
            .map(EmailAddress::from_addr)
            .collect(),
        None => Vec::new(),
    };
    addrs.into_iter().filter(|a| !a.address.is_empty()).collect()
}
