//! EXPUNGE command handler.
//!
//! Removes `\Deleted` messages and reports each removal with an
//! untagged `* N EXPUNGE`, N being the live sequence number at the
//! moment of removal.

use crate::fake_imap::io::write_line;
use crate::fake_imap::mailbox::Mailbox;
use std::sync::Mutex;
use tokio::io::{AsyncRead, AsyncWrite, BufReader};

pub async fn handle_expunge<S: AsyncRead + AsyncWrite + Unpin>(
    tag: &str,
    mailbox: &Mutex<Mailbox>,
    selected_folder: Option<&str>,
    stream: &mut BufReader<S>,
) {
    let Some(folder_name) = selected_folder else {
        let resp = format!("{tag} BAD No folder selected\r\n");
        let _ = write_line(stream, &resp).await;
        return;
    };

    let maybe_seqs = {
        let mut mb = mailbox.lock().unwrap();
        mb.get_folder_mut(folder_name).map(|folder| {
            let mut seqs = Vec::new();
            let mut index = 0;
            folder.messages.retain(|m| {
                index += 1;
                if m.deleted {
                    // Sequence numbers shift as earlier messages go.
                    seqs.push(index - seqs.len());
                    false
                } else {
                    true
                }
            });
            seqs
        })
    };

    let Some(expunged_seqs) = maybe_seqs else {
        let resp = format!("{tag} BAD Folder not found\r\n");
        let _ = write_line(stream, &resp).await;
        return;
    };

    for seq in &expunged_seqs {
        if write_line(stream, &format!("* {seq} EXPUNGE\r\n")).await.is_err() {
            return;
        }
    }
    let resp = format!("{tag} OK EXPUNGE completed\r\n");
    let _ = write_line(stream, &resp).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake_imap::mailbox::MailboxBuilder;

    async fn run(mailbox: &Mutex<Mailbox>) -> String {
        let (client, server) = tokio::io::duplex(4096);
        let mut stream = BufReader::new(server);
        handle_expunge("A1", mailbox, Some("INBOX"), &mut stream).await;
        drop(stream);

        let mut buf = Vec::new();
        tokio::io::AsyncReadExt::read_to_end(&mut BufReader::new(client), &mut buf)
            .await
            .unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[tokio::test]
    async fn removes_flagged_messages() {
        let mut mailbox = MailboxBuilder::new()
            .folder("INBOX")
            .message(1, b"Subject: a\r\n\r\n")
            .message(2, b"Subject: b\r\n\r\n")
            .build();
        mailbox.get_folder_mut("INBOX").unwrap().messages[0].deleted = true;
        let mb = Mutex::new(mailbox);

        let output = run(&mb).await;
        assert!(output.contains("* 1 EXPUNGE"));
        assert!(output.contains("A1 OK EXPUNGE completed"));

        let locked = mb.lock().unwrap();
        let inbox = locked.get_folder("INBOX").unwrap();
        assert_eq!(inbox.messages.len(), 1);
        assert_eq!(inbox.messages[0].uid, 2);
    }

    #[tokio::test]
    async fn nothing_flagged_is_a_noop() {
        let mb = Mutex::new(
            MailboxBuilder::new()
                .folder("INBOX")
                .message(1, b"Subject: a\r\n\r\n")
                .build(),
        );
        let output = run(&mb).await;
        assert!(!output.contains("* 1 EXPUNGE"));
        assert_eq!(mb.lock().unwrap().get_folder("INBOX").unwrap().messages.len(), 1);
    }
}
