//! ### Sending Messages
//!
//! Messages are delivered over SMTP by a [`Mailer`](smtp::Mailer), either through a
//! relay host or directly to the mail exchangers of the sender's domain. Each call
//! to `send` runs its own session and reports its progress as
//! [`Event`](smtp::Event)s.

pub mod smtp;
