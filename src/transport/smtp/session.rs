//! Sans-IO SMTP session
//!
//! [`SmtpSession`] holds everything needed to deliver one message: the envelope
//! commands, the rendered MIME lines, the authentication responses and the queue of
//! attachments. It is fed one server line at a time through [`SmtpSession::handle`]
//! and answers with a [`Step`] telling the connection what to write next. It never
//! touches the network, which is the job of the connection driver.

use std::{borrow::Cow, collections::VecDeque, time::SystemTime};

use idna::domain_to_ascii;
use tracing::{debug, trace};

use crate::{
    message::{
        mimebody::{closing_lines, MimeBody},
        Attachment, Boundary, Message,
    },
    transport::smtp::{
        authentication::Credentials,
        commands::{Command, Ehlo, Helo, Mail, Rcpt},
        error::{self, Error},
        extension::{announces_esmtp, auth_mechanism, ClientId},
        response::Reply,
        SendOptions,
    },
};

/// Where the session stands in the exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Connected, waiting for the `220` greeting
    AwaitingGreeting,
    /// `HELO` or `EHLO` sent
    AwaitingHelloAck,
    /// An authentication value was sent
    AwaitingAuthChallenge,
    /// An envelope command was sent
    AwaitingCommandAck,
    /// `DATA` was sent, waiting for `354`
    AwaitingDataChallenge,
    /// The text part is written, attachments are being streamed
    StreamingAttachments,
    /// `QUIT` was acknowledged
    Done,
    /// The server rejected a command or sent garbage
    Failed,
}

/// What the connection has to do after a line was handled
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Nothing to send, read the next line
    Wait,
    /// Send these lines
    Write(Vec<String>),
    /// Send these lines, then stream every attachment returned by
    /// [`SmtpSession::next_attachment`] and finish with
    /// [`SmtpSession::finish_data`]
    StreamAttachments(Vec<String>),
    /// The message was delivered and the server said goodbye
    Done,
}

/// Protocol state of one delivery
#[derive(Debug)]
pub struct SmtpSession {
    state: State,
    hello_name: ClientId,
    credentials: Option<Credentials>,
    commands: VecDeque<Command>,
    message: Option<Vec<String>>,
    boundary: Boundary,
    auth: VecDeque<String>,
    attachments: VecDeque<Attachment>,
    auth_negotiated: bool,
    auth_completed: bool,
}

impl SmtpSession {
    /// Prepares the session for `message`
    ///
    /// The message is rendered right away, `date` giving its `Date` header, its
    /// `Message-ID` and its boundary. Fails when the message has no sender.
    pub fn new(message: &Message, options: &SendOptions, date: SystemTime) -> Result<Self, Error> {
        let sender = message
            .sender_mailbox()
            .ok_or_else(|| error::client("message has no sender"))?;
        let domain = ascii_domain(sender.email.domain());

        let mut commands = VecDeque::new();
        commands.push_back(Mail::new(Some(sender.email.clone())).into());
        commands.extend(
            message
                .envelope_recipients()
                .map(|rcpt| Command::from(Rcpt::new(rcpt.clone()))),
        );
        commands.push_back(Command::Data);
        commands.push_back(Command::Quit);

        let body = MimeBody::new(message, &domain, date);

        Ok(SmtpSession {
            state: State::AwaitingGreeting,
            hello_name: options
                .hello_name
                .clone()
                .unwrap_or_else(|| ClientId::from(domain.as_ref())),
            credentials: options.credentials.clone().filter(|c| !c.is_empty()),
            commands,
            boundary: body.boundary().clone(),
            message: Some(body.into_lines()),
            auth: VecDeque::new(),
            attachments: message.attachments().iter().cloned().collect(),
            auth_negotiated: false,
            auth_completed: false,
        })
    }

    /// Current state
    pub fn state(&self) -> State {
        self.state
    }

    /// Multipart boundary of the message
    pub fn boundary(&self) -> &Boundary {
        &self.boundary
    }

    /// Whether an `AUTH` exchange was agreed on with the server
    pub fn is_auth_negotiated(&self) -> bool {
        self.auth_negotiated
    }

    /// Whether the server accepted the credentials
    pub fn is_authenticated(&self) -> bool {
        self.auth_completed
    }

    /// Handles one line received from the server, without its CRLF
    ///
    /// An error moves the session to [`State::Failed`] for good: every later line
    /// is ignored.
    pub fn handle(&mut self, line: &str) -> Result<Step, Error> {
        if matches!(self.state, State::Done | State::Failed) {
            trace!("session over, ignoring {line:?}");
            return Ok(Step::Wait);
        }

        let reply = match Reply::parse(line) {
            Ok(reply) => reply,
            Err(err) => return Err(self.fail(err)),
        };

        if reply.is_error() {
            return Err(self.fail(error::protocol(reply.status(), reply.line())));
        }

        if self.state == State::AwaitingHelloAck && reply.has_code(250) {
            self.negotiate_auth(&reply);
        }

        if reply.is_continuation() {
            return Ok(Step::Wait);
        }

        match (self.state, reply.code()) {
            (State::AwaitingGreeting, 220) => {
                let hello = if announces_esmtp(reply.line()) {
                    Ehlo::new(self.hello_name.clone()).to_string()
                } else {
                    Helo::new(self.hello_name.clone()).to_string()
                };
                self.transition(State::AwaitingHelloAck);
                Ok(Step::Write(vec![hello]))
            }
            (State::AwaitingHelloAck, 221 | 235 | 250 | 251) if self.auth_negotiated => {
                self.transition(State::AwaitingAuthChallenge);
                self.next_auth_value()
            }
            (State::AwaitingHelloAck | State::AwaitingCommandAck, 221 | 235 | 250 | 251) => {
                Ok(self.next_command())
            }
            (State::AwaitingAuthChallenge, 334) => self.next_auth_value(),
            (State::AwaitingAuthChallenge, 235 | 250) => {
                self.auth_completed = true;
                debug!("authenticated");
                Ok(self.next_command())
            }
            (State::AwaitingDataChallenge, 354) => Ok(self.start_data()),
            (state, code) => {
                debug!("ignoring reply {code} while in {state:?}");
                Ok(Step::Wait)
            }
        }
    }

    /// Next attachment to stream, while in [`State::StreamingAttachments`]
    pub fn next_attachment(&mut self) -> Option<Attachment> {
        if self.state == State::StreamingAttachments {
            self.attachments.pop_front()
        } else {
            None
        }
    }

    /// Closes the `DATA` payload after the attachments
    ///
    /// Returns the closing boundary, an empty line and the `.` terminator, or
    /// nothing when attachments are not being streamed.
    pub fn finish_data(&mut self) -> Vec<String> {
        if self.state != State::StreamingAttachments {
            return Vec::new();
        }
        self.attachments.clear();
        self.transition(State::AwaitingCommandAck);
        closing_lines(&self.boundary)
    }

    fn negotiate_auth(&mut self, reply: &Reply) {
        if self.auth_negotiated {
            return;
        }
        let Some(credentials) = self.credentials.as_ref() else {
            return;
        };
        if let Some(mechanism) = auth_mechanism(reply.line()) {
            debug!("authenticating with {mechanism}");
            self.auth = mechanism.responses(credentials).into();
            self.auth_negotiated = true;
        }
    }

    fn next_auth_value(&mut self) -> Result<Step, Error> {
        match self.auth.pop_front() {
            Some(value) => Ok(Step::Write(vec![value])),
            None => Err(self.fail(error::authentication("Forbidden"))),
        }
    }

    fn next_command(&mut self) -> Step {
        match self.commands.pop_front() {
            Some(command) => {
                self.transition(if command.is_data() {
                    State::AwaitingDataChallenge
                } else {
                    State::AwaitingCommandAck
                });
                Step::Write(vec![command.to_string()])
            }
            None => {
                self.transition(State::Done);
                Step::Done
            }
        }
    }

    fn start_data(&mut self) -> Step {
        let mut lines = self.message.take().unwrap_or_default();
        if self.attachments.is_empty() {
            lines.extend(closing_lines(&self.boundary));
            self.transition(State::AwaitingCommandAck);
            Step::Write(lines)
        } else {
            self.transition(State::StreamingAttachments);
            Step::StreamAttachments(lines)
        }
    }

    fn transition(&mut self, state: State) {
        trace!("session {:?} -> {:?}", self.state, state);
        self.state = state;
    }

    fn fail(&mut self, err: Error) -> Error {
        self.transition(State::Failed);
        err
    }
}

/// Punycode form of an internationalized domain
fn ascii_domain(domain: &str) -> Cow<'_, str> {
    if domain.is_ascii() {
        return Cow::Borrowed(domain);
    }
    match domain_to_ascii(domain) {
        Ok(ascii) => Cow::Owned(ascii),
        Err(err) => {
            debug!("cannot convert {domain} to ascii: {err}");
            Cow::Borrowed(domain)
        }
    }
}

#[cfg(test)]
mod test {
    use std::time::{Duration, UNIX_EPOCH};

    use pretty_assertions::assert_eq;

    use super::*;

    fn date() -> SystemTime {
        UNIX_EPOCH + Duration::from_millis(1_700_000_000_000)
    }

    fn message() -> Message {
        let mut message = Message::new("Hi", "Hello");
        message
            .sender("shop@example.com", None)
            .unwrap()
            .to("a@example.org")
            .unwrap()
            .cc("b@example.org")
            .unwrap()
            .bcc("c@example.org")
            .unwrap();
        message
    }

    fn write(lines: &[&str]) -> Step {
        Step::Write(lines.iter().map(|l| (*l).to_owned()).collect())
    }

    fn session(message: &Message, options: &SendOptions) -> SmtpSession {
        SmtpSession::new(message, options, date()).unwrap()
    }

    fn data_lines(step: Step) -> Vec<String> {
        match step {
            Step::Write(lines) | Step::StreamAttachments(lines) => lines,
            other => panic!("unexpected step {other:?}"),
        }
    }

    #[test]
    fn full_exchange_without_attachments() {
        let message = message();
        let mut s = session(&message, &SendOptions::default());
        assert_eq!(s.state(), State::AwaitingGreeting);

        assert_eq!(
            s.handle("220 mx.example.org ESMTP").unwrap(),
            write(&["EHLO example.com"])
        );
        assert_eq!(s.handle("250-mx.example.org").unwrap(), Step::Wait);
        assert_eq!(s.handle("250-AUTH LOGIN PLAIN").unwrap(), Step::Wait);
        assert!(!s.is_auth_negotiated());
        assert_eq!(
            s.handle("250 8BITMIME").unwrap(),
            write(&["MAIL FROM:<shop@example.com>"])
        );
        assert_eq!(
            s.handle("250 ok").unwrap(),
            write(&["RCPT TO:<a@example.org>"])
        );
        assert_eq!(
            s.handle("250 ok").unwrap(),
            write(&["RCPT TO:<b@example.org>"])
        );
        assert_eq!(
            s.handle("251 forwarded").unwrap(),
            write(&["RCPT TO:<c@example.org>"])
        );
        assert_eq!(s.handle("250 ok").unwrap(), write(&["DATA"]));
        assert_eq!(s.state(), State::AwaitingDataChallenge);

        let lines = data_lines(s.handle("354 go ahead").unwrap());
        assert_eq!(
            &lines[lines.len() - 3..],
            &[s.boundary().closing(), String::new(), ".".to_owned()]
        );
        assert!(lines[0].starts_with("From: "));
        assert_eq!(s.state(), State::AwaitingCommandAck);

        assert_eq!(s.handle("250 queued").unwrap(), write(&["QUIT"]));
        assert_eq!(s.handle("221 bye").unwrap(), Step::Done);
        assert_eq!(s.state(), State::Done);
        assert_eq!(s.handle("250 late").unwrap(), Step::Wait);
    }

    #[test]
    fn helo_when_greeting_lacks_esmtp() {
        let message = message();
        let mut s = session(&message, &SendOptions::default());
        assert_eq!(
            s.handle("220 mail.example.org ready").unwrap(),
            write(&["HELO example.com"])
        );
    }

    #[test]
    fn configured_hello_name() {
        let message = message();
        let options = SendOptions::new().hello_name(ClientId::from("relay.example.net"));
        let mut s = session(&message, &options);
        assert_eq!(
            s.handle("220 ESMTP").unwrap(),
            write(&["EHLO relay.example.net"])
        );
    }

    #[test]
    fn internationalized_domain_greets_in_punycode() {
        let mut message = Message::new("s", "b");
        message
            .sender("shop@b\u{fc}cher.example", None)
            .unwrap()
            .to("a@example.org")
            .unwrap();
        let mut s = session(&message, &SendOptions::default());
        assert_eq!(
            s.handle("220 ESMTP").unwrap(),
            write(&["EHLO xn--bcher-kva.example"])
        );
        assert_eq!(
            s.handle("250 ok").unwrap(),
            write(&["MAIL FROM:<shop@b\u{fc}cher.example>"])
        );
        s.handle("250 ok").unwrap();
        s.handle("250 ok").unwrap();
        let lines = data_lines(s.handle("354 go ahead").unwrap());
        assert!(lines.contains(&"Message-ID: <1700000000000@xn--bcher-kva.example>".to_owned()));
    }

    #[test]
    fn line_breaks_in_headers_cannot_end_data() {
        let mut message = Message::new("Hello\r\n.\r\nRCPT TO:<victim@evil.example>", "b");
        message
            .sender("shop@example.com", Some("Shop\r\nBcc: x@evil.example"))
            .unwrap()
            .to("a@example.org")
            .unwrap();
        let mut s = session(&message, &SendOptions::default());
        s.handle("220 ESMTP").unwrap();
        s.handle("250 ok").unwrap();
        s.handle("250 ok").unwrap();
        assert_eq!(s.handle("250 ok").unwrap(), write(&["DATA"]));

        let lines = data_lines(s.handle("354 go ahead").unwrap());
        assert_eq!(lines.iter().filter(|l| *l == ".").count(), 1);
        assert_eq!(lines.last().map(String::as_str), Some("."));
        assert!(lines.iter().all(|l| !l.contains(['\r', '\n'])));
        assert!(!lines
            .iter()
            .any(|l| l.starts_with("Bcc:") || l.starts_with("RCPT")));
    }

    #[test]
    fn auth_login() {
        let message = message();
        let options = SendOptions::new().credentials(("alice", "wonderland").into());
        let mut s = session(&message, &options);

        s.handle("220 ESMTP").unwrap();
        assert_eq!(s.handle("250-AUTH LOGIN PLAIN").unwrap(), Step::Wait);
        assert!(s.is_auth_negotiated());
        assert_eq!(s.handle("250 OK").unwrap(), write(&["AUTH LOGIN"]));
        assert_eq!(s.state(), State::AwaitingAuthChallenge);
        assert_eq!(s.handle("334 VXNlcm5hbWU6").unwrap(), write(&["YWxpY2U="]));
        assert_eq!(
            s.handle("334 UGFzc3dvcmQ6").unwrap(),
            write(&["d29uZGVybGFuZA=="])
        );
        assert_eq!(
            s.handle("235 2.7.0 Authentication successful").unwrap(),
            write(&["MAIL FROM:<shop@example.com>"])
        );
        assert!(s.is_authenticated());
        assert_eq!(s.state(), State::AwaitingCommandAck);
    }

    #[test]
    fn auth_plain_with_xoauth() {
        let message = message();
        let options = SendOptions::new().credentials(("user", "password").into());
        let mut s = session(&message, &options);

        s.handle("220 ESMTP").unwrap();
        assert_eq!(
            s.handle("250 AUTH LOGIN PLAIN XOAUTH2").unwrap(),
            write(&["AUTH PLAIN AHVzZXIAcGFzc3dvcmQ="])
        );
        assert_eq!(
            s.handle("235 ok").unwrap(),
            write(&["MAIL FROM:<shop@example.com>"])
        );
    }

    #[test]
    fn auth_exhausted_is_forbidden() {
        let message = message();
        let options = SendOptions::new().credentials(("user", "password").into());
        let mut s = session(&message, &options);

        s.handle("220 ESMTP").unwrap();
        s.handle("250 AUTH PLAIN").unwrap();
        let err = s.handle("334 again").unwrap_err();
        assert!(err.is_authentication());
        assert_eq!(err.to_string(), "authentication error: Forbidden");
        assert_eq!(s.state(), State::Failed);
    }

    #[test]
    fn empty_credentials_skip_auth() {
        let message = message();
        let options = SendOptions::new().credentials(("", "").into());
        let mut s = session(&message, &options);

        s.handle("220 ESMTP").unwrap();
        assert_eq!(
            s.handle("250 AUTH LOGIN PLAIN").unwrap(),
            write(&["MAIL FROM:<shop@example.com>"])
        );
        assert!(!s.is_auth_negotiated());
    }

    #[test]
    fn rejection_fails_once() {
        let message = message();
        let mut s = session(&message, &SendOptions::default());

        s.handle("220 ESMTP").unwrap();
        s.handle("250 OK").unwrap();
        let err = s.handle("550 5.7.1 relaying denied").unwrap_err();
        assert!(err.is_protocol());
        assert!(err.is_permanent());
        assert_eq!(s.state(), State::Failed);
        assert_eq!(s.handle("250 OK").unwrap(), Step::Wait);
        assert_eq!(s.handle("550 again").unwrap(), Step::Wait);
    }

    #[test]
    fn rejected_greeting() {
        let message = message();
        let mut s = session(&message, &SendOptions::default());
        let err = s.handle("421 try later").unwrap_err();
        assert!(err.is_transient());
    }

    #[test]
    fn garbage_line() {
        let message = message();
        let mut s = session(&message, &SendOptions::default());
        assert!(s.handle("hello there").unwrap_err().is_response());
        assert_eq!(s.state(), State::Failed);
    }

    #[test]
    fn unexpected_codes_are_ignored() {
        let message = message();
        let mut s = session(&message, &SendOptions::default());
        assert_eq!(s.handle("250 early").unwrap(), Step::Wait);
        assert_eq!(s.state(), State::AwaitingGreeting);
        s.handle("220 ESMTP").unwrap();
        assert_eq!(s.handle("354 odd").unwrap(), Step::Wait);
        assert_eq!(s.state(), State::AwaitingHelloAck);
    }

    #[test]
    fn streams_attachments() {
        let mut message = message();
        message.attachment("/tmp/a.txt").attachment_named("/tmp/b", "b.pdf");
        let mut s = session(&message, &SendOptions::default());

        assert_eq!(s.next_attachment(), None);
        assert!(s.finish_data().is_empty());

        for line in ["220 ESMTP", "250 OK", "250 OK", "250 OK", "250 OK", "250 OK"] {
            s.handle(line).unwrap();
        }
        assert_eq!(s.state(), State::AwaitingDataChallenge);

        let lines = data_lines(s.handle("354 go").unwrap());
        assert_eq!(s.state(), State::StreamingAttachments);
        assert!(!lines.contains(&".".to_owned()));

        assert_eq!(s.next_attachment().unwrap().name(), "a.txt");
        assert_eq!(s.handle("250 stray").unwrap(), Step::Wait);
        assert_eq!(s.next_attachment().unwrap().name(), "b.pdf");
        assert_eq!(s.next_attachment(), None);
        assert_eq!(
            s.finish_data(),
            vec![s.boundary().closing(), String::new(), ".".to_owned()]
        );
        assert_eq!(s.state(), State::AwaitingCommandAck);
        assert_eq!(s.handle("250 queued").unwrap(), write(&["QUIT"]));
    }

    #[test]
    fn requires_sender() {
        let message = Message::new("s", "b");
        let err = SmtpSession::new(&message, &SendOptions::default(), date()).unwrap_err();
        assert!(err.is_client());
    }
}
