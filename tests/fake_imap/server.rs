//! In-process fake IMAP server
//!
//! Binds an ephemeral localhost port, accepts plaintext connections,
//! and dispatches commands parsed with `imap-codec` to the handler
//! modules. Shared mailbox state lives behind a mutex so tests can
//! inspect folder contents after a scan.

use super::handlers::{
    handle_capability, handle_close, handle_expunge, handle_login, handle_logout, handle_noop,
    handle_select, handle_uid_copy, handle_uid_fetch, handle_uid_search, handle_uid_store,
};
use super::io::write_line;
use super::mailbox::Mailbox;
use imap_codec::CommandCodec;
use imap_codec::decode::Decoder;
use imap_codec::imap_types::command::CommandBody;
use imap_codec::imap_types::mailbox::Mailbox as ImapMailbox;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, BufReader};
use tokio::net::TcpListener;

/// A fake IMAP server on `127.0.0.1` with an OS-assigned port.
pub struct FakeImapServer {
    port: u16,
    mailbox: Arc<Mutex<Mailbox>>,
    /// Keeps the accept loop alive for the server's lifetime.
    _handle: tokio::task::JoinHandle<()>,
}

impl FakeImapServer {
    /// Start a server over the given mailbox state.
    pub async fn start(mailbox: Mailbox) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind to ephemeral port");
        let port = listener.local_addr().unwrap().port();

        let mailbox = Arc::new(Mutex::new(mailbox));
        let shared = mailbox.clone();

        let handle = tokio::spawn(async move {
            loop {
                let Ok((stream, _addr)) = listener.accept().await else {
                    break;
                };
                let mailbox = shared.clone();
                tokio::spawn(async move {
                    handle_connection(stream, &mailbox).await;
                });
            }
        });

        Self {
            port,
            mailbox,
            _handle: handle,
        }
    }

    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Snapshot of the current mailbox state, for assertions.
    pub fn snapshot(&self) -> Mailbox {
        self.mailbox.lock().unwrap().clone()
    }
}

fn mailbox_name(mb: &ImapMailbox<'_>) -> String {
    match mb {
        ImapMailbox::Inbox => "INBOX".to_string(),
        ImapMailbox::Other(other) => {
            let bytes: &[u8] = other.as_ref();
            String::from_utf8_lossy(bytes).into_owned()
        }
    }
}

/// Greeting plus the command loop for one connection.
async fn handle_connection(stream: tokio::net::TcpStream, mailbox: &Mutex<Mailbox>) {
    let mut reader = BufReader::new(stream);

    if write_line(&mut reader, "* OK IMAP4rev1 Fake server ready\r\n")
        .await
        .is_err()
    {
        return;
    }

    run_session(&mut reader, mailbox).await;
}

async fn run_session<S: AsyncRead + AsyncWrite + Unpin>(
    reader: &mut BufReader<S>,
    mailbox: &Mutex<Mailbox>,
) {
    let mut selected_folder: Option<String> = None;
    let codec = CommandCodec::default();

    loop {
        let mut line = String::new();
        match reader.read_line(&mut line).await {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let Ok((_, command)) = codec.decode(line.as_bytes()) else {
            let tag = trimmed.split_whitespace().next().unwrap_or("*");
            let resp = format!("{tag} BAD Parse error\r\n");
            if write_line(reader, &resp).await.is_err() {
                break;
            }
            continue;
        };

        let tag = command.tag.inner();
        let snap = mailbox.lock().unwrap().clone();

        match command.body {
            CommandBody::Capability => {
                handle_capability(tag, reader).await;
            }
            CommandBody::Noop => {
                handle_noop(tag, reader).await;
            }
            CommandBody::Login { .. } => {
                if !handle_login(tag, reader).await {
                    break;
                }
            }
            CommandBody::Select { mailbox: mb, .. } => {
                let name = mailbox_name(&mb);
                selected_folder = handle_select(tag, &name, &snap, reader).await;
            }
            CommandBody::Search { uid: true, .. } => {
                handle_uid_search(tag, &snap, selected_folder.as_deref(), reader).await;
            }
            CommandBody::Fetch {
                sequence_set,
                uid: true,
                ..
            } => {
                // The raw line carries which items were requested;
                // string inspection keeps the handler independent of
                // the codec's item model.
                handle_uid_fetch(
                    tag,
                    &sequence_set,
                    trimmed,
                    &snap,
                    selected_folder.as_deref(),
                    reader,
                )
                .await;
            }
            CommandBody::Copy {
                ref sequence_set,
                mailbox: ref dest_mb,
                uid: true,
                ..
            } => {
                let dest_name = mailbox_name(dest_mb);
                handle_uid_copy(
                    tag,
                    sequence_set,
                    &dest_name,
                    mailbox,
                    selected_folder.as_deref(),
                    reader,
                )
                .await;
            }
            CommandBody::Store {
                ref sequence_set,
                ref kind,
                ref flags,
                uid: true,
                ..
            } => {
                handle_uid_store(
                    tag,
                    sequence_set,
                    kind,
                    flags,
                    mailbox,
                    selected_folder.as_deref(),
                    reader,
                )
                .await;
            }
            CommandBody::Expunge => {
                handle_expunge(tag, mailbox, selected_folder.as_deref(), reader).await;
            }
            CommandBody::Close => {
                handle_close(tag, mailbox, selected_folder.as_deref(), reader).await;
                selected_folder = None;
            }
            CommandBody::Logout => {
                handle_logout(tag, reader).await;
                break;
            }
            _ => {
                let resp = format!("{tag} BAD Unknown command\r\n");
                if write_line(reader, &resp).await.is_err() {
                    break;
                }
            }
        }
    }
}
