//! SMTP commands

use std::fmt::{self, Display, Formatter};

use crate::{address::Address, transport::smtp::extension::ClientId};

/// EHLO command
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct Ehlo {
    client_id: ClientId,
}

impl Display for Ehlo {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "EHLO {}", self.client_id)
    }
}

impl Ehlo {
    /// Creates a EHLO command
    pub fn new(client_id: ClientId) -> Ehlo {
        Ehlo { client_id }
    }
}

/// HELO command, for servers which do not announce ESMTP
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct Helo {
    client_id: ClientId,
}

impl Display for Helo {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "HELO {}", self.client_id)
    }
}

impl Helo {
    /// Creates a HELO command
    pub fn new(client_id: ClientId) -> Helo {
        Helo { client_id }
    }
}

/// MAIL command
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct Mail {
    sender: Option<Address>,
}

impl Display for Mail {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "MAIL FROM:<{}>",
            self.sender.as_ref().map(AsRef::as_ref).unwrap_or("")
        )
    }
}

impl Mail {
    /// Creates a MAIL command
    pub fn new(sender: Option<Address>) -> Mail {
        Mail { sender }
    }
}

/// RCPT command
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct Rcpt {
    recipient: Address,
}

impl Display for Rcpt {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "RCPT TO:<{}>", self.recipient)
    }
}

impl Rcpt {
    /// Creates an RCPT command
    pub fn new(recipient: Address) -> Rcpt {
        Rcpt { recipient }
    }
}

/// One step of the envelope, sent after the greeting exchange
#[derive(PartialEq, Eq, Clone, Debug)]
pub enum Command {
    /// `MAIL FROM`
    Mail(Mail),
    /// `RCPT TO`
    Rcpt(Rcpt),
    /// `DATA`
    Data,
    /// `QUIT`
    Quit,
}

impl Command {
    /// Whether the server answers this command with a `354` challenge
    pub fn is_data(&self) -> bool {
        matches!(self, Command::Data)
    }
}

impl Display for Command {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Command::Mail(mail) => mail.fmt(f),
            Command::Rcpt(rcpt) => rcpt.fmt(f),
            Command::Data => f.write_str("DATA"),
            Command::Quit => f.write_str("QUIT"),
        }
    }
}

impl From<Mail> for Command {
    fn from(mail: Mail) -> Self {
        Command::Mail(mail)
    }
}

impl From<Rcpt> for Command {
    fn from(rcpt: Rcpt) -> Self {
        Command::Rcpt(rcpt)
    }
}
