//! Delivery notifications

use std::fmt::{self, Display, Formatter};

use crate::{message::Message, transport::smtp::Error};

/// Something that happened while delivering a message
#[derive(Debug, Clone, Copy)]
pub enum Event<'a> {
    /// A connection to the server is up, the session starts
    Sending(&'a Message),
    /// The server accepted the message and closed the session
    Success(&'a Message),
    /// The delivery failed, or an attachment could not be read
    Error(&'a Message, &'a Error),
}

impl<'a> Event<'a> {
    /// The message being delivered
    pub fn message(&self) -> &'a Message {
        match *self {
            Event::Sending(message) | Event::Success(message) | Event::Error(message, _) => {
                message
            }
        }
    }

    /// The error, for [`Event::Error`]
    pub fn error(&self) -> Option<&'a Error> {
        match *self {
            Event::Error(_, err) => Some(err),
            _ => None,
        }
    }
}

impl Display for Event<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Event::Sending(message) => write!(f, "sending {:?}", message.subject()),
            Event::Success(message) => write!(f, "sent {:?}", message.subject()),
            Event::Error(message, err) => {
                write!(f, "failed sending {:?}: {}", message.subject(), err)
            }
        }
    }
}

/// Receives the [`Event`]s of a [`Mailer`](super::Mailer)
///
/// Implemented for closures taking an `&Event<'_>`.
pub trait EventHandler: Send + Sync {
    /// Called synchronously, in the task running the delivery
    fn handle(&self, event: &Event<'_>);
}

impl<F> EventHandler for F
where
    F: Fn(&Event<'_>) + Send + Sync,
{
    fn handle(&self, event: &Event<'_>) {
        self(event)
    }
}
