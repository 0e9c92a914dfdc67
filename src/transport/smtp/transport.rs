use std::{
    fmt::{self, Debug, Formatter},
    sync::Arc,
    time::SystemTime,
};

use tracing::{debug, info, warn};

use super::{
    client::{connect_timeout, Connector, NetworkStream, SmtpConnection, TokioConnector},
    error::{self, Error},
    event::{Event, EventHandler},
    mx::{sort_candidates, DnsResolver, MxResolver},
    session::SmtpSession,
    SendOptions,
};
use crate::message::Message;

/// Sends messages over SMTP, one session per message
///
/// A `Mailer` is cheap to clone and can be shared between tasks: every call to
/// [`send`](Mailer::send) opens its own connection.
#[derive(Clone)]
pub struct Mailer {
    inner: Arc<Inner>,
}

struct Inner {
    resolver: Box<dyn MxResolver>,
    connector: Box<dyn Connector>,
    handler: Option<Box<dyn EventHandler>>,
    debug: bool,
}

impl Mailer {
    /// Creates a mailer resolving MX records through DNS and connecting with tokio
    pub fn new() -> Mailer {
        Self::builder().build()
    }

    /// Starts configuring a mailer
    pub fn builder() -> MailerBuilder {
        MailerBuilder::default()
    }

    /// Delivers `message`
    ///
    /// With a non-empty `host`, the message is relayed through it, on
    /// `options.port` and with implicit TLS if `options.tls` is set. Otherwise it
    /// goes to the mail exchangers of the sender's domain, tried by priority on
    /// `options.port` over plain TCP.
    ///
    /// The outcome is both returned and reported to the event handler.
    pub async fn send(
        &self,
        message: &Message,
        host: Option<&str>,
        options: &SendOptions,
    ) -> Result<(), Error> {
        let result = self.deliver(message, host, options).await;
        match &result {
            Ok(()) => {
                info!("message {:?} sent", message.subject());
                self.emit(&Event::Success(message));
            }
            Err(err) => {
                warn!("sending {:?} failed: {err}", message.subject());
                self.emit(&Event::Error(message, err));
            }
        }
        result
    }

    async fn deliver(
        &self,
        message: &Message,
        host: Option<&str>,
        options: &SendOptions,
    ) -> Result<(), Error> {
        let mut session = SmtpSession::new(message, options, SystemTime::now())?;
        let stream = self.open(message, host, options).await?;
        self.emit(&Event::Sending(message));

        let mut connection = SmtpConnection::new(stream, options.timeout, self.inner.debug);
        let mut on_attachment_error = |err: Error| self.emit(&Event::Error(message, &err));
        let result = connection
            .run(&mut session, &mut on_attachment_error)
            .await;
        connection.close().await;
        result
    }

    async fn open(
        &self,
        message: &Message,
        host: Option<&str>,
        options: &SendOptions,
    ) -> Result<NetworkStream, Error> {
        let connector = self.inner.connector.as_ref();

        if let Some(host) = host.filter(|host| !host.is_empty()) {
            debug!("connecting to {host}:{}", options.port);
            return connect_timeout(connector, host, options.port, options.tls, options.timeout)
                .await
                .map_err(|err| {
                    if err.is_network() {
                        error::connectivity(err)
                    } else {
                        err
                    }
                });
        }

        let domain = message
            .sender_mailbox()
            .map(|sender| sender.email.domain())
            .ok_or_else(|| error::client("message has no sender"))?;

        let mut candidates = self.inner.resolver.resolve_mx(domain).await?;
        if candidates.is_empty() {
            return Err(error::resolution(format!("Cannot resolve MX of {domain}")));
        }
        sort_candidates(&mut candidates);

        for candidate in &candidates {
            debug!(
                "connecting to {} (priority {})",
                candidate.exchange, candidate.priority
            );
            match connect_timeout(
                connector,
                &candidate.exchange,
                options.port,
                false,
                options.timeout,
            )
            .await
            {
                Ok(stream) => return Ok(stream),
                Err(err) => warn!("{} refused the connection: {err}", candidate.exchange),
            }
        }

        Err(error::connectivity("Cannot connect to any SMTP server."))
    }

    fn emit(&self, event: &Event<'_>) {
        if let Some(handler) = &self.inner.handler {
            handler.handle(event);
        }
    }
}

impl Default for Mailer {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for Mailer {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mailer")
            .field("debug", &self.inner.debug)
            .field("handler", &self.inner.handler.is_some())
            .finish()
    }
}

/// Builds a [`Mailer`]
#[derive(Default)]
#[must_use]
pub struct MailerBuilder {
    resolver: Option<Box<dyn MxResolver>>,
    connector: Option<Box<dyn Connector>>,
    handler: Option<Box<dyn EventHandler>>,
    debug: bool,
}

impl MailerBuilder {
    /// Set how mail exchangers are found, [`DnsResolver`] by default
    pub fn resolver<R: MxResolver + 'static>(mut self, resolver: R) -> Self {
        self.resolver = Some(Box::new(resolver));
        self
    }

    /// Set how connections are opened, [`TokioConnector`] by default
    pub fn connector<C: Connector + 'static>(mut self, connector: C) -> Self {
        self.connector = Some(Box::new(connector));
        self
    }

    /// Set the handler receiving delivery [`Event`]s
    pub fn on_event<H: EventHandler + 'static>(mut self, handler: H) -> Self {
        self.handler = Some(Box::new(handler));
        self
    }

    /// Log every line sent and received at INFO level instead of TRACE
    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Creates the mailer
    pub fn build(self) -> Mailer {
        Mailer {
            inner: Arc::new(Inner {
                resolver: self
                    .resolver
                    .unwrap_or_else(|| Box::new(DnsResolver::new())),
                connector: self
                    .connector
                    .unwrap_or_else(|| Box::new(TokioConnector::new())),
                handler: self.handler,
                debug: self.debug,
            }),
        }
    }
}

impl Debug for MailerBuilder {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("MailerBuilder")
            .field("debug", &self.debug)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn assert_send_sync<T: Send + Sync + Clone>() {}

    #[test]
    fn mailer_is_shareable() {
        assert_send_sync::<Mailer>();
    }

    #[tokio::test]
    async fn no_sender_fails_before_connecting() {
        let mailer = Mailer::new();
        let message = Message::new("s", "b");
        let err = mailer
            .send(&message, Some("localhost"), &SendOptions::default())
            .await
            .unwrap_err();
        assert!(err.is_client());
    }
}
