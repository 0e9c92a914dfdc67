use std::time::Duration;

use async_trait::async_trait;
use tokio::{
    io::{AsyncRead, AsyncWrite},
    net::TcpStream,
};
use tokio_native_tls::TlsConnector;
use tracing::debug;

use crate::transport::smtp::{error, Error};

/// A bidirectional byte stream the session can run over
pub trait AsyncStream: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T> AsyncStream for T where T: AsyncRead + AsyncWrite + Unpin + Send {}

/// Boxed stream handed out by a [`Connector`]
pub type NetworkStream = Box<dyn AsyncStream>;

/// Opens connections to SMTP servers
///
/// Besides [`TokioConnector`], anything producing an [`AsyncStream`] can be
/// plugged in, like in-memory pipes or proxies.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Connects to `host:port`, wrapping the stream in TLS when `tls` is set
    async fn connect(&self, host: &str, port: u16, tls: bool) -> Result<NetworkStream, Error>;
}

/// Plain TCP or implicit TLS connections, through tokio and native-tls
#[derive(Debug, Clone, Default)]
pub struct TokioConnector {
    accept_invalid_certs: bool,
    accept_invalid_hostnames: bool,
}

impl TokioConnector {
    /// Creates a connector verifying certificates
    pub fn new() -> Self {
        Self::default()
    }

    /// Accepts invalid certificates on TLS connections
    ///
    /// Only meant for test servers with self-signed certificates.
    pub fn dangerous_accept_invalid_certs(mut self, accept_invalid_certs: bool) -> Self {
        self.accept_invalid_certs = accept_invalid_certs;
        self
    }

    /// Accepts certificates not matching the host name
    pub fn dangerous_accept_invalid_hostnames(mut self, accept_invalid_hostnames: bool) -> Self {
        self.accept_invalid_hostnames = accept_invalid_hostnames;
        self
    }

    fn tls_connector(&self) -> Result<TlsConnector, Error> {
        let connector = native_tls::TlsConnector::builder()
            .danger_accept_invalid_certs(self.accept_invalid_certs)
            .danger_accept_invalid_hostnames(self.accept_invalid_hostnames)
            .build()
            .map_err(error::tls)?;
        Ok(TlsConnector::from(connector))
    }
}

#[async_trait]
impl Connector for TokioConnector {
    async fn connect(&self, host: &str, port: u16, tls: bool) -> Result<NetworkStream, Error> {
        let tcp_stream = TcpStream::connect((host, port))
            .await
            .map_err(error::network)?;
        debug!("connected to {host}:{port}");

        if !tls {
            return Ok(Box::new(tcp_stream));
        }

        let stream = self
            .tls_connector()?
            .connect(host, tcp_stream)
            .await
            .map_err(error::tls)?;
        debug!("negotiated TLS with {host}");
        Ok(Box::new(stream))
    }
}

/// Runs `connector` with a deadline, turning its expiry into a timeout error
pub(crate) async fn connect_timeout(
    connector: &dyn Connector,
    host: &str,
    port: u16,
    tls: bool,
    timeout: Duration,
) -> Result<NetworkStream, Error> {
    tokio::time::timeout(timeout, connector.connect(host, port, tls))
        .await
        .map_err(|_| error::timeout())?
}
