//! IMAP connection and the mailbox capability interface
//!
//! `connect()` opens a session using a mailbox's effective security
//! mode. The scan loop talks to the server only through the narrow
//! [`MailboxSession`] trait (search / fetch / move / expunge / close)
//! so it can run against a fake in tests.

use crate::error::{Error, Result};
use crate::extractor::embedded_message_part;
use crate::mailbox::Mailbox;
use crate::security::TransportSecurity;
use crate::stream::{MailStream, wrap_tls};
use async_imap::Session;
use futures::StreamExt;
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncReadCompatExt};
use tracing::{debug, info};

/// An IMAP session over a plaintext or TLS-wrapped socket.
pub type ImapSession = Session<Compat<MailStream>>;

/// What the scan loop needs from a selected mailbox. Everything is
/// UID-based: UIDs stay valid across the copy/flag/expunge sequence,
/// unlike sequence numbers.
#[allow(async_fn_in_trait)]
pub trait MailboxSession {
    /// UIDs of all messages in the selected folder, in mailbox order.
    async fn search_all(&mut self) -> Result<Vec<u32>>;

    /// The message's top-level header block.
    async fn fetch_header_block(&mut self, uid: u32) -> Result<Option<Vec<u8>>>;

    /// Part identifier of an embedded `message/rfc822` part, if the
    /// message structure reveals one.
    async fn embedded_part_path(&mut self, uid: u32) -> Result<Option<String>>;

    /// Raw bytes of one MIME part (`None` when the part is absent).
    async fn fetch_part(&mut self, uid: u32, part: &str) -> Result<Option<Vec<u8>>>;

    /// Stage a move: copy to `folder` and flag the original deleted.
    /// Committed by [`MailboxSession::expunge`].
    async fn move_to(&mut self, uid: u32, folder: &str) -> Result<()>;

    /// Commit staged moves.
    async fn expunge(&mut self) -> Result<()>;

    /// Close the folder and log out.
    async fn close(&mut self) -> Result<()>;
}

/// Open an IMAP session for `mailbox` and select its inbox folder.
///
/// Port 993 (or an explicit `ssl` setting) wraps the socket in TLS
/// before the first byte; `tls` upgrades via STARTTLS; `none` stays
/// plaintext.
///
/// # Errors
///
/// Returns [`Error::Connection`] when the socket, TLS negotiation, or
/// login fails, and [`Error::Imap`] when the folder cannot be
/// selected.
pub async fn connect(mailbox: &Mailbox) -> Result<ImapMailboxSession> {
    let addr = mailbox.addr();
    let security = mailbox.effective_security();
    debug!("Connecting to IMAP server at {} ({})", addr, security);

    let tcp = TcpStream::connect(&addr)
        .await
        .map_err(|e| Error::Connection(e.to_string()))?;

    let stream = match security {
        TransportSecurity::Ssl => {
            let tls = wrap_tls(tcp, &mailbox.host)
                .await
                .map_err(|e| Error::Connection(e.to_string()))?;
            MailStream::Tls(Box::new(tls))
        }
        TransportSecurity::StartTls => {
            let mut client = async_imap::Client::new(MailStream::Plain(tcp).compat());
            client
                .run_command_and_check_ok("STARTTLS", None)
                .await
                .map_err(|e| Error::Connection(format!("STARTTLS failed: {e}")))?;

            let MailStream::Plain(tcp) = client.into_inner().into_inner() else {
                return Err(Error::Tls("unexpected encrypted stream".into()));
            };
            let tls = wrap_tls(tcp, &mailbox.host)
                .await
                .map_err(|e| Error::Connection(e.to_string()))?;
            MailStream::Tls(Box::new(tls))
        }
        TransportSecurity::Plain => MailStream::Plain(tcp),
    };

    let client = async_imap::Client::new(stream.compat());
    let mut session = client
        .login(&mailbox.username, &mailbox.secret)
        .await
        .map_err(|(e, _)| Error::Connection(format!("login failed: {e}")))?;

    session
        .select(&mailbox.inbox_folder)
        .await
        .map_err(|e| Error::Imap(format!("Failed to select {}: {e}", mailbox.inbox_folder)))?;

    info!("Connected to IMAP server at {}", addr);
    Ok(ImapMailboxSession { session })
}

/// The real [`MailboxSession`] over `async-imap`.
pub struct ImapMailboxSession {
    session: ImapSession,
}

impl MailboxSession for ImapMailboxSession {
    async fn search_all(&mut self) -> Result<Vec<u32>> {
        let uids = self
            .session
            .uid_search("ALL")
            .await
            .map_err(|e| Error::Imap(format!("Search failed: {e}")))?;

        let mut uid_list: Vec<u32> = uids.into_iter().collect();
        uid_list.sort_unstable();
        Ok(uid_list)
    }

    async fn fetch_header_block(&mut self, uid: u32) -> Result<Option<Vec<u8>>> {
        let mut messages = self
            .session
            .uid_fetch(uid.to_string(), "(RFC822.HEADER)")
            .await
            .map_err(|e| Error::Imap(format!("Fetch failed: {e}")))?;

        let mut block = None;
        while let Some(msg_result) = messages.next().await {
            let msg = msg_result.map_err(|e| Error::Imap(format!("Fetch error: {e}")))?;
            if let Some(header) = msg.header() {
                block = Some(header.to_vec());
            }
        }
        drop(messages);
        Ok(block)
    }

    async fn embedded_part_path(&mut self, uid: u32) -> Result<Option<String>> {
        let mut messages = self
            .session
            .uid_fetch(uid.to_string(), "(BODYSTRUCTURE)")
            .await
            .map_err(|e| Error::Imap(format!("Fetch failed: {e}")))?;

        let mut path = None;
        while let Some(msg_result) = messages.next().await {
            let msg = msg_result.map_err(|e| Error::Imap(format!("Fetch error: {e}")))?;
            if let Some(structure) = msg.bodystructure() {
                path = embedded_message_part(structure);
            }
        }
        drop(messages);
        Ok(path)
    }

    async fn fetch_part(&mut self, uid: u32, part: &str) -> Result<Option<Vec<u8>>> {
        let query = format!("(BODY.PEEK[{part}])");
        let mut messages = self
            .session
            .uid_fetch(uid.to_string(), &query)
            .await
            .map_err(|e| Error::Imap(format!("Fetch failed: {e}")))?;

        let mut body = None;
        while let Some(msg_result) = messages.next().await {
            let msg = msg_result.map_err(|e| Error::Imap(format!("Fetch error: {e}")))?;
            if let Some(data) = msg.body() {
                if !data.is_empty() {
                    body = Some(data.to_vec());
                }
            }
        }
        drop(messages);
        Ok(body)
    }

    async fn move_to(&mut self, uid: u32, folder: &str) -> Result<()> {
        self.session
            .uid_copy(uid.to_string(), folder)
            .await
            .map_err(|e| Error::Imap(format!("Copy to {folder} failed: {e}")))?;

        let _updates: Vec<_> = self
            .session
            .uid_store(uid.to_string(), "+FLAGS.SILENT (\\Deleted)")
            .await
            .map_err(|e| Error::Imap(format!("Store failed: {e}")))?
            .collect()
            .await;
        Ok(())
    }

    async fn expunge(&mut self) -> Result<()> {
        let _expunged: Vec<_> = self
            .session
            .expunge()
            .await
            .map_err(|e| Error::Imap(format!("Expunge failed: {e}")))?
            .collect()
            .await;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.session
            .close()
            .await
            .map_err(|e| Error::Imap(format!("Close failed: {e}")))?;
        self.session.logout().await.ok();
        Ok(())
    }
}
