//! mxmail is a single-shot SMTP client.
//!
//! A [`Message`] is composed by the caller and handed to a [`Mailer`], which opens one
//! connection, either to an explicit relay or to the mail exchangers of the sender's
//! domain, and drives one SMTP session to deliver it: greeting, `HELO`/`EHLO`, optional
//! `AUTH`, envelope, and a `DATA` phase carrying a MIME multipart body with base64
//! encoded attachments.
//!
//! ## Example
//!
//! ```rust,no_run
//! use mxmail::{Mailer, Message, SendOptions};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let mut message = Message::new("Order #1042", "<p>Thanks for your order!</p>");
//! message
//!     .sender("shop@example.com", Some("Example Shop"))?
//!     .to("customer@example.org")?
//!     .bcc("archive@example.com")?
//!     .attachment("invoices/1042.pdf");
//!
//! let mailer = Mailer::builder()
//!     .on_event(|event: &mxmail::Event<'_>| println!("{event}"))
//!     .build();
//!
//! // Relay through an explicit host...
//! let options = SendOptions::new().port(2525);
//! mailer.send(&message, Some("smtp.example.com"), &options).await?;
//!
//! // ...or deliver directly to the MX hosts of example.com
//! mailer.send(&message, None, &SendOptions::default()).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Events
//!
//! Besides the `Result` returned by [`Mailer::send`], every send reports
//! [`Event::Sending`], [`Event::Success`] and [`Event::Error`] to the handler registered
//! on the mailer. Attachment read failures are reported only through events: the
//! attachment is skipped and the send goes on.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, trivial_casts, unused_import_braces)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod address;
mod base64;
pub mod message;
pub mod transport;

pub use crate::{
    address::{Address, AddressError},
    message::{Attachment, Mailbox, Message},
    transport::smtp::{Error, Event, Mailer, MailerBuilder, SendOptions},
};

pub(crate) type BoxError = Box<dyn std::error::Error + Send + Sync>;
