//! MIME rendering of a [`Message`]
//!
//! Every message is sent as `multipart/mixed`: one base64 text part holding
//! the body, followed by one base64 part per attachment. Rendering produces
//! lines without terminators; the connection joins them with CRLF.

use std::{
    borrow::Cow,
    fmt::{self, Display, Formatter},
    time::{SystemTime, UNIX_EPOCH},
};

use super::Message;
use crate::base64;

/// Multipart boundary of one message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Boundary(String);

impl Boundary {
    /// Derives a boundary from a millisecond timestamp
    pub fn from_timestamp(millis: u128) -> Self {
        Boundary(format!("----mxmail{millis}"))
    }

    /// Line opening a part
    pub fn delimiter(&self) -> String {
        format!("--{}", self.0)
    }

    /// Line closing the multipart body
    pub fn closing(&self) -> String {
        format!("--{}--", self.0)
    }
}

impl Display for Boundary {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Header and text part of a message, up to (not including) the attachments
#[derive(Debug, Clone)]
pub struct MimeBody {
    boundary: Boundary,
    lines: Vec<String>,
}

impl MimeBody {
    /// Renders `message` with a boundary and `Message-ID` derived from `date`
    ///
    /// `host` is used for the right-hand side of the `Message-ID`.
    pub fn new(message: &Message, host: &str, date: SystemTime) -> Self {
        let millis = date
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        let boundary = Boundary::from_timestamp(millis);
        let mut lines = Vec::new();

        if let Some(sender) = message.sender_mailbox() {
            lines.push(format!("From: {sender}"));
        }
        if !message.recipients().is_empty() {
            lines.push(format!("To: {}", address_list(message.recipients())));
        }
        if !message.carbon_copies().is_empty() {
            lines.push(format!("Cc: {}", address_list(message.carbon_copies())));
        }
        lines.push(format!("Subject: {}", encode_header_text(message.subject())));
        lines.push("MIME-Version: 1.0".to_owned());
        lines.push(format!("Message-ID: <{millis}@{host}>"));
        lines.push(format!("Date: {}", httpdate::fmt_http_date(date)));
        if !message.reply_to().is_empty() {
            lines.push(format!("Reply-To: {}", address_list(message.reply_to())));
        }
        lines.push(format!(
            "Content-Type: multipart/mixed; boundary=\"{boundary}\""
        ));
        lines.push(String::new());

        lines.push(boundary.delimiter());
        lines.push(format!(
            "Content-Type: {}; charset=\"utf-8\"",
            if message.is_html() {
                "text/html"
            } else {
                "text/plain"
            }
        ));
        lines.push("Content-Transfer-Encoding: base64".to_owned());
        lines.push(String::new());
        lines.extend(base64::encode_lines(normalize_line_endings(message.body())));

        MimeBody { boundary, lines }
    }

    /// Boundary shared by all parts of this message
    pub fn boundary(&self) -> &Boundary {
        &self.boundary
    }

    /// Rendered lines
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Consumes the body, returning its lines
    pub fn into_lines(self) -> Vec<String> {
        self.lines
    }
}

/// Lines of one attachment part, payload included
pub fn attachment_lines(boundary: &Boundary, name: &str, content: &[u8]) -> Vec<String> {
    let name = quoted_parameter(name);
    let mut lines = vec![
        boundary.delimiter(),
        format!("Content-Type: application/octet-stream; name=\"{name}\""),
        "Content-Transfer-Encoding: base64".to_owned(),
        format!("Content-Disposition: attachment; filename=\"{name}\""),
        String::new(),
    ];
    lines.extend(base64::encode_lines(content));
    lines.push(String::new());
    lines
}

/// Closing boundary followed by the end-of-data marker
pub fn closing_lines(boundary: &Boundary) -> Vec<String> {
    vec![boundary.closing(), String::new(), ".".to_owned()]
}

/// Converts every line ending of `body` to CRLF
pub fn normalize_line_endings(body: &str) -> String {
    body.replace("\r\n", "\n").replace('\n', "\r\n")
}

/// Whether `text` can be written into a header as is
///
/// Control characters, CR and LF among them, would end the header line early.
pub(crate) fn is_plain_header_text(text: &str) -> bool {
    text.chars().all(|c| c.is_ascii() && !c.is_ascii_control())
}

/// Encodes header text that is not plain ASCII as an RFC 2047 encoded word
pub(crate) fn encode_header_text(text: &str) -> Cow<'_, str> {
    if is_plain_header_text(text) {
        Cow::Borrowed(text)
    } else {
        Cow::Owned(format!("=?utf-8?b?{}?=", base64::encode(text)))
    }
}

fn address_list<T: Display>(addresses: &[T]) -> String {
    addresses
        .iter()
        .map(|a| format!("<{a}>"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn quoted_parameter(value: &str) -> Cow<'_, str> {
    if is_plain_header_text(value) {
        Cow::Owned(value.replace('\\', "\\\\").replace('"', "\\\""))
    } else {
        encode_header_text(value)
    }
}
