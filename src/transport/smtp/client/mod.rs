//! SMTP connection driver
//!
//! [`SmtpConnection`] owns the stream to the server. It reads reply lines under
//! the idle timeout, feeds them to an [`SmtpSession`] and writes whatever the
//! session answers, reading attachment files from disk while the `DATA` payload
//! is being sent.

use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, warn};

pub use self::net::{AsyncStream, Connector, NetworkStream, TokioConnector};
pub(crate) use self::net::connect_timeout;
use crate::{
    message::mimebody::attachment_lines,
    transport::smtp::{
        error::{self, Error},
        session::{SmtpSession, Step},
    },
};

mod net;

/// Logs wire traffic at INFO in debug mode, at TRACE otherwise
macro_rules! wire {
    ($debug:expr, $($arg:tt)+) => {
        if $debug {
            tracing::info!($($arg)+);
        } else {
            tracing::trace!($($arg)+);
        }
    };
}

/// Longest reply line accepted, terminator included
const MAX_LINE_LENGTH: u64 = 4096;

fn escape_crlf(string: &str) -> String {
    string.replace("\r\n", "<CRLF>")
}

/// One open connection to an SMTP server
pub(crate) struct SmtpConnection {
    stream: BufReader<NetworkStream>,
    timeout: Duration,
    debug: bool,
}

impl SmtpConnection {
    pub(crate) fn new(stream: NetworkStream, timeout: Duration, debug: bool) -> Self {
        SmtpConnection {
            stream: BufReader::new(stream),
            timeout,
            debug,
        }
    }

    /// Exchanges lines until the session is done or fails
    ///
    /// Unreadable attachments are reported to `on_attachment_error` and skipped.
    pub(crate) async fn run(
        &mut self,
        session: &mut SmtpSession,
        on_attachment_error: &mut (dyn FnMut(Error) + Send),
    ) -> Result<(), Error> {
        loop {
            let line = self.read_line().await?;
            if line.is_empty() {
                continue;
            }

            match session.handle(&line)? {
                Step::Wait => {}
                Step::Write(lines) => self.write_lines(&lines).await?,
                Step::StreamAttachments(lines) => {
                    self.write_lines(&lines).await?;
                    while let Some(attachment) = session.next_attachment() {
                        match tokio::fs::read(attachment.path()).await {
                            Ok(content) => {
                                debug!(
                                    "attaching {} ({} bytes)",
                                    attachment.name(),
                                    content.len()
                                );
                                let part =
                                    attachment_lines(session.boundary(), attachment.name(), &content);
                                self.write_lines(&part).await?;
                            }
                            Err(err) => {
                                warn!("skipping attachment {}: {err}", attachment.path().display());
                                on_attachment_error(error::attachment_read(format!(
                                    "{}: {err}",
                                    attachment.path().display()
                                )));
                            }
                        }
                    }
                    let closing = session.finish_data();
                    self.write_lines(&closing).await?;
                }
                Step::Done => return Ok(()),
            }
        }
    }

    /// Reads one line, without its terminator
    async fn read_line(&mut self) -> Result<String, Error> {
        let mut buffer = String::with_capacity(100);
        let mut limited = (&mut self.stream).take(MAX_LINE_LENGTH);
        let read = tokio::time::timeout(self.timeout, limited.read_line(&mut buffer))
            .await
            .map_err(|_| error::timeout())?
            .map_err(error::network)?;
        if read == 0 {
            return Err(error::network("connection closed by server"));
        }
        if !buffer.ends_with('\n') && read as u64 >= MAX_LINE_LENGTH {
            return Err(error::response("reply line too long"));
        }
        wire!(self.debug, "<< {}", escape_crlf(&buffer));
        Ok(buffer.trim_end_matches(['\r', '\n']).to_owned())
    }

    /// Writes `lines`, each terminated by CRLF
    async fn write_lines(&mut self, lines: &[String]) -> Result<(), Error> {
        if lines.is_empty() {
            return Ok(());
        }
        let mut data = lines.join("\r\n");
        data.push_str("\r\n");

        let stream = self.stream.get_mut();
        tokio::time::timeout(self.timeout, async {
            stream.write_all(data.as_bytes()).await?;
            stream.flush().await
        })
        .await
        .map_err(|_| error::timeout())?
        .map_err(error::network)?;

        wire!(self.debug, "Wrote: {}", escape_crlf(&data));
        Ok(())
    }

    /// Closes the stream, ignoring errors
    pub(crate) async fn close(&mut self) {
        if let Err(err) = self.stream.get_mut().shutdown().await {
            debug!("error closing connection: {err}");
        }
    }
}

#[cfg(test)]
mod test {
    use std::time::{Duration, SystemTime};

    use pretty_assertions::assert_eq;
    use tokio::io::{duplex, AsyncReadExt, AsyncWriteExt};

    use super::*;
    use crate::{message::Message, transport::smtp::SendOptions};

    #[test]
    fn test_escape_crlf() {
        assert_eq!(escape_crlf("\r\n"), "<CRLF>");
        assert_eq!(escape_crlf("EHLO my_name\r\n"), "EHLO my_name<CRLF>");
        assert_eq!(
            escape_crlf("EHLO my_name\r\nSIZE 42\r\n"),
            "EHLO my_name<CRLF>SIZE 42<CRLF>"
        );
    }

    fn session() -> SmtpSession {
        let mut message = Message::new("s", "b");
        message
            .sender("shop@example.com", None)
            .unwrap()
            .to("a@example.org")
            .unwrap();
        SmtpSession::new(&message, &SendOptions::default(), SystemTime::now()).unwrap()
    }

    #[tokio::test]
    async fn silent_server_times_out() {
        let (client, mut server) = duplex(1024);
        let mut connection = SmtpConnection::new(Box::new(client), Duration::from_millis(20), false);
        let mut session = session();
        let err = connection
            .run(&mut session, &mut |_| panic!("no attachments"))
            .await
            .unwrap_err();
        assert!(err.is_timeout());

        connection.close().await;
        let mut buf = [0; 64];
        assert_eq!(server.read(&mut buf).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn overlong_reply_line_is_rejected() {
        let (client, mut server) = duplex(16 * 1024);
        let line = format!("220 {}", "a".repeat(2 * MAX_LINE_LENGTH as usize));
        server.write_all(line.as_bytes()).await.unwrap();
        let mut connection = SmtpConnection::new(Box::new(client), Duration::from_secs(5), false);
        let mut session = session();
        let err = connection
            .run(&mut session, &mut |_| panic!("no attachments"))
            .await
            .unwrap_err();
        assert!(err.is_response());
    }

    #[tokio::test]
    async fn hang_up_is_network_error() {
        let (client, mut server) = duplex(1024);
        server.write_all(b"220 ESMTP ready\r\n").await.unwrap();
        let mut connection = SmtpConnection::new(Box::new(client), Duration::from_secs(5), false);
        let mut session = session();

        let mut on_attachment_error = |_: Error| {};
        let run = connection.run(&mut session, &mut on_attachment_error);
        let hang_up = async {
            let mut buf = [0; 64];
            let n = server.read(&mut buf).await.unwrap();
            assert_eq!(&buf[..n], b"EHLO example.com\r\n");
            drop(server);
        };
        let (result, ()) = tokio::join!(run, hang_up);
        assert!(result.unwrap_err().is_network());
    }
}
