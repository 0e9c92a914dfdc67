//! Error and result type for SMTP clients

use std::{error::Error as StdError, fmt};

use crate::{transport::smtp::response::Code, BoxError};

// Inspired by https://github.com/seanmonstar/reqwest/blob/a8566383168c0ef06c21f38cbc9213af6ff6db31/src/error.rs

/// The Errors that may occur when sending an email over SMTP
pub struct Error {
    inner: Box<Inner>,
}

struct Inner {
    kind: Kind,
    source: Option<BoxError>,
}

impl Error {
    pub(crate) fn new<E>(kind: Kind, source: Option<E>) -> Error
    where
        E: Into<BoxError>,
    {
        Error {
            inner: Box::new(Inner {
                kind,
                source: source.map(Into::into),
            }),
        }
    }

    /// Returns true if no mail exchanger could be found for the domain
    pub fn is_resolution(&self) -> bool {
        matches!(self.inner.kind, Kind::Resolution)
    }

    /// Returns true if no host accepted a connection
    pub fn is_connectivity(&self) -> bool {
        matches!(self.inner.kind, Kind::Connectivity)
    }

    /// Returns true if the server rejected a command with a 4xx or 5xx reply
    pub fn is_protocol(&self) -> bool {
        matches!(self.inner.kind, Kind::Protocol(_))
    }

    /// Returns true if the server kept asking for credentials after all were sent
    pub fn is_authentication(&self) -> bool {
        matches!(self.inner.kind, Kind::Authentication)
    }

    /// Returns true if the server stayed silent for longer than the configured timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self.inner.kind, Kind::Timeout)
    }

    /// Returns true if an attachment file could not be read
    pub fn is_attachment_read(&self) -> bool {
        matches!(self.inner.kind, Kind::AttachmentRead)
    }

    /// Returns true if a server reply could not be understood
    pub fn is_response(&self) -> bool {
        matches!(self.inner.kind, Kind::Response)
    }

    /// Returns true if the error comes from the connection itself
    pub fn is_network(&self) -> bool {
        matches!(self.inner.kind, Kind::Network)
    }

    /// Returns true if the error is from TLS
    pub fn is_tls(&self) -> bool {
        matches!(self.inner.kind, Kind::Tls)
    }

    /// Returns true if the error is from client
    pub fn is_client(&self) -> bool {
        matches!(self.inner.kind, Kind::Client)
    }

    /// Returns true if the error is a transient SMTP error (4xx reply code)
    pub fn is_transient(&self) -> bool {
        self.status().is_some_and(|code| code.is_transient())
    }

    /// Returns true if the error is a permanent SMTP error (5xx reply code)
    pub fn is_permanent(&self) -> bool {
        self.status().is_some_and(|code| code.is_permanent())
    }

    /// Returns the status code, if the error was generated from a reply.
    pub fn status(&self) -> Option<Code> {
        match self.inner.kind {
            Kind::Protocol(code) => code,
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum Kind {
    /// MX lookup failed or found nothing
    Resolution,
    /// No candidate host accepted the connection
    Connectivity,
    /// Server replied with a code above 399
    ///
    /// The source holds the raw reply line.
    Protocol(Option<Code>),
    /// Credentials exhausted while the server still challenges
    Authentication,
    /// Idle timer expired
    Timeout,
    /// Attachment file could not be read
    AttachmentRead,
    /// Error parsing a response
    Response,
    /// Underlying network i/o error
    Network,
    /// TLS error
    Tls,
    /// Internal client error
    Client,
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut builder = f.debug_struct("mxmail::transport::smtp::Error");

        builder.field("kind", &self.inner.kind);

        if let Some(ref source) = self.inner.source {
            builder.field("source", source);
        }

        builder.finish()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.kind {
            Kind::Resolution => f.write_str("mx resolution error")?,
            Kind::Connectivity => f.write_str("connection error")?,
            Kind::Protocol(_) => f.write_str("server error")?,
            Kind::Authentication => f.write_str("authentication error")?,
            Kind::Timeout => f.write_str("timeout")?,
            Kind::AttachmentRead => f.write_str("attachment error")?,
            Kind::Response => f.write_str("response error")?,
            Kind::Network => f.write_str("network error")?,
            Kind::Tls => f.write_str("tls error")?,
            Kind::Client => f.write_str("internal client error")?,
        };

        if let Some(ref e) = self.inner.source {
            write!(f, ": {e}")?;
        }

        Ok(())
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.inner.source.as_ref().map(|e| {
            let r: &(dyn std::error::Error + 'static) = &**e;
            r
        })
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        network(err)
    }
}

pub(crate) fn resolution<E: Into<BoxError>>(e: E) -> Error {
    Error::new(Kind::Resolution, Some(e))
}

pub(crate) fn connectivity<E: Into<BoxError>>(e: E) -> Error {
    Error::new(Kind::Connectivity, Some(e))
}

/// Server rejection, keeping the raw reply line as the source
pub(crate) fn protocol(code: Option<Code>, line: &str) -> Error {
    Error::new(Kind::Protocol(code), Some(line.to_owned()))
}

pub(crate) fn authentication<E: Into<BoxError>>(e: E) -> Error {
    Error::new(Kind::Authentication, Some(e))
}

pub(crate) fn timeout() -> Error {
    Error::new(Kind::Timeout, None::<BoxError>)
}

pub(crate) fn attachment_read<E: Into<BoxError>>(e: E) -> Error {
    Error::new(Kind::AttachmentRead, Some(e))
}

pub(crate) fn response<E: Into<BoxError>>(e: E) -> Error {
    Error::new(Kind::Response, Some(e))
}

pub(crate) fn network<E: Into<BoxError>>(e: E) -> Error {
    Error::new(Kind::Network, Some(e))
}

pub(crate) fn tls<E: Into<BoxError>>(e: E) -> Error {
    Error::new(Kind::Tls, Some(e))
}

pub(crate) fn client<E: Into<BoxError>>(e: E) -> Error {
    Error::new(Kind::Client, Some(e))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn protocol_error_keeps_line() {
        let code = "550".parse::<Code>().ok();
        let err = protocol(code, "550 5.1.1 mailbox unavailable");
        assert!(err.is_protocol());
        assert!(err.is_permanent());
        assert!(!err.is_transient());
        assert_eq!(u16::from(err.status().unwrap()), 550);
        assert_eq!(
            err.source().unwrap().to_string(),
            "550 5.1.1 mailbox unavailable"
        );
        assert_eq!(
            err.to_string(),
            "server error: 550 5.1.1 mailbox unavailable"
        );
    }

    #[test]
    fn timeout_has_no_source() {
        let err = timeout();
        assert!(err.is_timeout());
        assert!(err.source().is_none());
        assert_eq!(err.to_string(), "timeout");
    }

    #[test]
    fn kinds_are_exclusive() {
        let err = connectivity("Cannot connect to any SMTP server.");
        assert!(err.is_connectivity());
        assert!(!err.is_protocol());
        assert!(!err.is_resolution());
        assert_eq!(err.status(), None);
    }

    #[test]
    fn io_errors_are_network_errors() {
        let err = Error::from(std::io::Error::from(std::io::ErrorKind::ConnectionRefused));
        assert!(err.is_network());
    }
}
