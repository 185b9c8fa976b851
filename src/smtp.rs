//! Minimal SMTP client session
//!
//! One connection per send, driven strictly in sequence: banner,
//! `EHLO`, optional STARTTLS upgrade (with the mandatory re-`EHLO`,
//! since servers reset their capability state after the handshake),
//! optional `AUTH LOGIN`, envelope, `DATA`, `QUIT`.
//!
//! Reply codes are enforced only where proceeding on the wrong code
//! would corrupt the session (STARTTLS, AUTH) or lose the message
//! outright (connect). The envelope and data phases read each reply
//! but tolerate non-2xx codes, preserving the fire-and-forget relay
//! behavior this engine replaces.

use crate::error::{Error, Result};
use crate::settings::SmtpRelaySettings;
use crate::security::TransportSecurity;
use crate::stream::{MailStream, wrap_tls};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tracing::debug;

/// A notification to relay.
#[derive(Debug, Clone)]
pub struct OutboundMessage {
    pub from: String,
    pub from_name: String,
    pub to: Vec<String>,
    pub subject: String,
    pub body: String,
}

impl OutboundMessage {
    /// `From:` header value, with the display name when configured.
    #[must_use]
    pub fn from_header(&self) -> String {
        if self.from_name.trim().is_empty() {
            self.from.clone()
        } else {
            format!("{} <{}>", self.from_name.trim(), self.from)
        }
    }
}

/// A parsed (possibly multi-line) server reply.
#[derive(Debug, Clone)]
pub struct Reply {
    pub code: u16,
    pub lines: Vec<String>,
}

impl Reply {
    #[must_use]
    pub fn first_line(&self) -> &str {
        self.lines.first().map_or("", String::as_str)
    }

    /// 2xx/3xx. Unused by the tolerant envelope phase today; the hook
    /// for a stricter policy.
    #[must_use]
    pub const fn is_positive(&self) -> bool {
        self.code >= 200 && self.code < 400
    }
}

/// Wire capture of one session, for the admin connectivity test.
/// Credential lines are masked.
#[derive(Debug, Default)]
pub struct Transcript {
    lines: Vec<String>,
}

impl Transcript {
    fn client(&mut self, line: &str) {
        self.lines.push(format!("C: {line}"));
    }

    fn server(&mut self, line: &str) {
        self.lines.push(format!("S: {line}"));
    }

    #[must_use]
    pub fn lines(&self) -> &[String] {
        &self.lines
    }
}

/// SMTP relay client. One [`SmtpClient::send`] call is one complete
/// session over its own connection.
pub struct SmtpClient {
    settings: SmtpRelaySettings,
    local_name: String,
    transcript: Option<Transcript>,
}

impl SmtpClient {
    #[must_use]
    pub fn new(settings: SmtpRelaySettings) -> Self {
        Self {
            settings,
            local_name: "localhost".to_string(),
            transcript: None,
        }
    }

    /// Name announced in `EHLO`.
    #[must_use]
    pub fn with_local_name(mut self, name: impl Into<String>) -> Self {
        self.local_name = name.into();
        self
    }

    /// Record every command and reply line for later inspection.
    #[must_use]
    pub fn with_transcript(mut self) -> Self {
        self.transcript = Some(Transcript::default());
        self
    }

    #[must_use]
    pub fn transcript(&self) -> Option<&Transcript> {
        self.transcript.as_ref()
    }

    /// Relay one message to every recipient in `message.to`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Connection`] when the socket fails,
    /// [`Error::Protocol`] when STARTTLS is refused or a reply is
    /// unreadable, and [`Error::Auth`] when the relay rejects the
    /// configured credentials (the socket closes before `MAIL FROM`).
    pub async fn send(&mut self, message: &OutboundMessage) -> Result<()> {
        self.run_session(Some(message)).await
    }

    /// Connectivity test: negotiate up to (and including) AUTH, then
    /// `QUIT` without sending mail.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`SmtpClient::send`].
    pub async fn probe(&mut self) -> Result<()> {
        self.run_session(None).await
    }

    async fn run_session(&mut self, message: Option<&OutboundMessage>) -> Result<()> {
        let settings = self.settings.clone();
        if !settings.has_relay() {
            return Err(Error::Config("no SMTP relay host configured".into()));
        }

        debug!("Opening SMTP session to {}", settings.addr());
        let tcp = TcpStream::connect(settings.addr())
            .await
            .map_err(|e| Error::Connection(format!("SMTP connect failed: {e}")))?;

        let stream = match settings.security {
            TransportSecurity::Ssl => {
                let tls = wrap_tls(tcp, &settings.host)
                    .await
                    .map_err(|e| Error::Connection(e.to_string()))?;
                MailStream::Tls(Box::new(tls))
            }
            TransportSecurity::StartTls | TransportSecurity::Plain => MailStream::Plain(tcp),
        };

        let mut wire = Wire {
            reader: BufReader::new(stream),
            transcript: self.transcript.as_mut(),
        };

        // Banner, then greet. Neither is validated beyond receipt.
        wire.read_reply().await?;
        let ehlo = format!("EHLO {}", self.local_name);
        wire.command(&ehlo).await?;

        if settings.security == TransportSecurity::StartTls {
            let reply = wire.command("STARTTLS").await?;
            if reply.code != 220 {
                return Err(Error::Protocol(format!(
                    "STARTTLS refused: {} {}",
                    reply.code,
                    reply.first_line()
                )));
            }
            wire = wire.upgrade(&settings.host).await?;
            // Capabilities reset across the handshake; greet again.
            wire.command(&ehlo).await?;
        }

        if !settings.username.is_empty() {
            wire.command("AUTH LOGIN").await?;
            wire.command_masked(&BASE64.encode(&settings.username)).await?;
            let reply = wire.command_masked(&BASE64.encode(&settings.password)).await?;
            if reply.code != 235 {
                return Err(Error::Auth(format!(
                    "relay rejected credentials: {} {}",
                    reply.code,
                    reply.first_line()
                )));
            }
        }

        let Some(message) = message else {
            wire.command("QUIT").await.ok();
            return Ok(());
        };

        // Envelope and data replies are read but tolerated.
        wire.command(&format!("MAIL FROM:<{}>", message.from)).await?;
        for rcpt in &message.to {
            wire.command(&format!("RCPT TO:<{rcpt}>")).await?;
        }
        wire.command("DATA").await?;
        wire.send_payload(message).await?;
        wire.command("QUIT").await.ok();
        Ok(())
    }
}

/// Buffered command/reply transport over one connection.
struct Wire<'a, S> {
    reader: BufReader<S>,
    transcript: Option<&'a mut Transcript>,
}

impl<'a, S: AsyncRead + AsyncWrite + Unpin> Wire<'a, S> {
    async fn command(&mut self, line: &str) -> Result<Reply> {
        self.send_line(line, line).await?;
        self.read_reply().await
    }

    /// Send a line whose content must not reach the transcript
    /// (base64 credentials).
    async fn command_masked(&mut self, line: &str) -> Result<Reply> {
        self.send_line(line, "[credentials]").await?;
        self.read_reply().await
    }

    async fn send_line(&mut self, line: &str, recorded: &str) -> Result<()> {
        if let Some(t) = self.transcript.as_deref_mut() {
            t.client(recorded);
        }
        let stream = self.reader.get_mut();
        stream
            .write_all(format!("{line}\r\n").as_bytes())
            .await
            .map_err(|e| Error::Connection(format!("SMTP write failed: {e}")))?;
        stream
            .flush()
            .await
            .map_err(|e| Error::Connection(format!("SMTP write failed: {e}")))
    }

    /// Read one reply, following dash-continued lines until the line
    /// whose fourth character is a space.
    async fn read_reply(&mut self) -> Result<Reply> {
        let mut code = 0u16;
        let mut lines = Vec::new();

        loop {
            let mut line = String::new();
            let n = self
                .reader
                .read_line(&mut line)
                .await
                .map_err(|e| Error::Connection(format!("SMTP read failed: {e}")))?;
            if n == 0 {
                return Err(Error::Connection("server closed the connection".into()));
            }

            let trimmed = line.trim_end_matches(['\r', '\n']);
            if let Some(t) = self.transcript.as_deref_mut() {
                t.server(trimmed);
            }

            let line_code: u16 = trimmed
                .get(..3)
                .and_then(|c| c.parse().ok())
                .ok_or_else(|| Error::Protocol(format!("malformed reply line: {trimmed:?}")))?;
            if code == 0 {
                code = line_code;
            }

            let (separator, text) = if trimmed.len() == 3 {
                (' ', "")
            } else {
                (
                    trimmed.as_bytes()[3] as char,
                    trimmed.get(4..).unwrap_or(""),
                )
            };
            lines.push(text.to_string());

            if separator == ' ' {
                break;
            }
        }

        Ok(Reply { code, lines })
    }

    /// Transmit headers, body, and the terminating dot, then read the
    /// final reply.
    async fn send_payload(&mut self, message: &OutboundMessage) -> Result<Reply> {
        let payload = render_payload(message);
        if let Some(t) = self.transcript.as_deref_mut() {
            t.client(&format!("[message payload, {} bytes]", payload.len()));
        }

        let stream = self.reader.get_mut();
        stream
            .write_all(payload.as_bytes())
            .await
            .map_err(|e| Error::Connection(format!("SMTP write failed: {e}")))?;
        stream
            .write_all(b".\r\n")
            .await
            .map_err(|e| Error::Connection(format!("SMTP write failed: {e}")))?;
        stream
            .flush()
            .await
            .map_err(|e| Error::Connection(format!("SMTP write failed: {e}")))?;
        self.read_reply().await
    }
}

impl<'a> Wire<'a, MailStream> {
    /// Upgrade the plaintext stream to TLS in place (after a `220`
    /// reply to STARTTLS).
    async fn upgrade(self, host: &str) -> Result<Wire<'a, MailStream>> {
        let transcript = self.transcript;
        let stream = self.reader.into_inner().upgrade(host).await?;
        Ok(Wire {
            reader: BufReader::new(stream),
            transcript,
        })
    }
}

/// Message headers and dot-stuffed body, CRLF line endings.
fn render_payload(message: &OutboundMessage) -> String {
    let mut data = String::new();
    data.push_str(&format!("From: {}\r\n", message.from_header()));
    data.push_str(&format!("To: {}\r\n", message.to.join(", ")));
    data.push_str(&format!("Subject: {}\r\n", message.subject));
    data.push_str("MIME-Version: 1.0\r\n");
    data.push_str("Content-Type: text/plain; charset=utf-8\r\n");
    data.push_str("\r\n");
    for line in message.body.lines() {
        // RFC 5321 4.5.2: a leading dot is doubled in transit.
        if line.starts_with('.') {
            data.push('.');
        }
        data.push_str(line);
        data.push_str("\r\n");
    }
    data
}
