//! Message composition
//!
//! A [`Message`] collects a subject, a text or HTML body, a sender, recipients and
//! attachment files. Every address is validated when it is added: a malformed
//! address is rejected right away with an [`AddressError`] and nothing is recorded.
//!
//! ```
//! use mxmail::Message;
//!
//! # fn main() -> Result<(), mxmail::AddressError> {
//! let mut message = Message::new("Order #1042 shipped", "Your parcel is on its way.");
//! message
//!     .sender("shop@example.com", Some("Example Shop"))?
//!     .to("customer@example.org")?
//!     .reply("support@example.com")?
//!     .attachment("/var/shop/labels/1042.pdf");
//!
//! assert!(message.to("not-an-address").is_err());
//! assert_eq!(message.recipients().len(), 1);
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;

pub use self::{
    attachment::Attachment,
    mailbox::Mailbox,
    mimebody::{Boundary, MimeBody},
};
use crate::address::{Address, AddressError};

mod attachment;
mod mailbox;
pub mod mimebody;

/// An e-mail ready to be handed to a [`Mailer`](crate::Mailer)
#[derive(Debug, Clone, Default)]
pub struct Message {
    subject: String,
    body: String,
    sender: Option<Mailbox>,
    to: Vec<Address>,
    cc: Vec<Address>,
    bcc: Vec<Address>,
    reply_to: Vec<Address>,
    attachments: Vec<Attachment>,
}

impl Message {
    /// Creates a message with a subject and a body
    ///
    /// The body is sent as HTML when it contains both `<` and `>`, as plain text
    /// otherwise.
    pub fn new<S: Into<String>, B: Into<String>>(subject: S, body: B) -> Self {
        Message {
            subject: subject.into(),
            body: body.into(),
            ..Default::default()
        }
    }

    /// Sets the sender address and an optional display name
    ///
    /// The sender's domain is the one resolved when the message is sent without
    /// an explicit relay host.
    pub fn sender<A: AsRef<str>>(
        &mut self,
        address: A,
        name: Option<&str>,
    ) -> Result<&mut Self, AddressError> {
        let email = address.as_ref().parse()?;
        self.sender = Some(Mailbox::new(name.map(str::to_owned), email));
        Ok(self)
    }

    /// Adds a `To` recipient
    pub fn to<A: AsRef<str>>(&mut self, address: A) -> Result<&mut Self, AddressError> {
        self.to.push(address.as_ref().parse()?);
        Ok(self)
    }

    /// Adds a `Cc` recipient
    pub fn cc<A: AsRef<str>>(&mut self, address: A) -> Result<&mut Self, AddressError> {
        self.cc.push(address.as_ref().parse()?);
        Ok(self)
    }

    /// Adds a blind carbon copy recipient
    ///
    /// These get a `RCPT TO` command but never appear in the headers.
    pub fn bcc<A: AsRef<str>>(&mut self, address: A) -> Result<&mut Self, AddressError> {
        self.bcc.push(address.as_ref().parse()?);
        Ok(self)
    }

    /// Adds a `Reply-To` address
    pub fn reply<A: AsRef<str>>(&mut self, address: A) -> Result<&mut Self, AddressError> {
        self.reply_to.push(address.as_ref().parse()?);
        Ok(self)
    }

    /// Attaches a file, named after its file name
    pub fn attachment<P: Into<PathBuf>>(&mut self, path: P) -> &mut Self {
        self.attachments.push(Attachment::new(path));
        self
    }

    /// Attaches a file under another name (with extension)
    pub fn attachment_named<P: Into<PathBuf>, N: Into<String>>(
        &mut self,
        path: P,
        name: N,
    ) -> &mut Self {
        self.attachments.push(Attachment::named(path, name));
        self
    }

    /// Attaches a prepared [`Attachment`]
    pub fn attach(&mut self, attachment: Attachment) -> &mut Self {
        self.attachments.push(attachment);
        self
    }

    /// Subject line
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Body text, as given
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Whether the body is sent as `text/html`
    pub fn is_html(&self) -> bool {
        self.body.contains('<') && self.body.contains('>')
    }

    /// Sender, if set
    pub fn sender_mailbox(&self) -> Option<&Mailbox> {
        self.sender.as_ref()
    }

    /// `To` recipients, in insertion order
    pub fn recipients(&self) -> &[Address] {
        &self.to
    }

    /// `Cc` recipients, in insertion order
    pub fn carbon_copies(&self) -> &[Address] {
        &self.cc
    }

    /// Bcc recipients, in insertion order
    pub fn blind_copies(&self) -> &[Address] {
        &self.bcc
    }

    /// `Reply-To` addresses, in insertion order
    pub fn reply_to(&self) -> &[Address] {
        &self.reply_to
    }

    /// Attachments, in insertion order
    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }

    /// Every envelope recipient: `To`, then `Cc`, then Bcc
    pub fn envelope_recipients(&self) -> impl Iterator<Item = &Address> {
        self.to.iter().chain(&self.cc).chain(&self.bcc)
    }
}
