//! UID SEARCH command handler.
//!
//! The scan loop only ever searches ALL, so every UID in the selected
//! folder is returned regardless of the criteria.

use crate::fake_imap::io::write_line;
use crate::fake_imap::mailbox::Mailbox;
use tokio::io::{AsyncRead, AsyncWrite, BufReader};

pub async fn handle_uid_search<S: AsyncRead + AsyncWrite + Unpin>(
    tag: &str,
    mailbox: &Mailbox,
    selected_folder: Option<&str>,
    stream: &mut BufReader<S>,
) {
    let Some(folder_name) = selected_folder else {
        let resp = format!("{tag} BAD No folder selected\r\n");
        let _ = write_line(stream, &resp).await;
        return;
    };
    let Some(folder) = mailbox.get_folder(folder_name) else {
        let resp = format!("{tag} BAD Folder not found\r\n");
        let _ = write_line(stream, &resp).await;
        return;
    };

    let uids: Vec<String> = folder.messages.iter().map(|m| m.uid.to_string()).collect();
    let _ = write_line(stream, &format!("* SEARCH {}\r\n", uids.join(" "))).await;
    let resp = format!("{tag} OK SEARCH completed\r\n");
    let _ = write_line(stream, &resp).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake_imap::mailbox::MailboxBuilder;

    #[tokio::test]
    async fn returns_every_uid() {
        let mailbox = MailboxBuilder::new()
            .folder("INBOX")
            .message(1, b"Subject: a\r\n\r\n")
            .message(5, b"Subject: b\r\n\r\n")
            .build();

        let (client, server) = tokio::io::duplex(4096);
        let mut stream = BufReader::new(server);
        handle_uid_search("A1", &mailbox, Some("INBOX"), &mut stream).await;
        drop(stream);

        let mut buf = Vec::new();
        tokio::io::AsyncReadExt::read_to_end(&mut BufReader::new(client), &mut buf)
            .await
            .unwrap();
        let output = String::from_utf8(buf).unwrap();
        assert!(output.contains("* SEARCH 1 5\r\n"));
        assert!(output.contains("A1 OK SEARCH completed"));
    }
}
