//! SELECT command handler.
//!
//! Responds with the metadata async-imap expects when opening a
//! folder (FLAGS, EXISTS, RECENT, UIDVALIDITY, UIDNEXT) and returns
//! the selected folder name, or `None` when it does not exist.

use crate::fake_imap::io::write_line;
use crate::fake_imap::mailbox::Mailbox;
use tokio::io::{AsyncRead, AsyncWrite, BufReader};

pub async fn handle_select<S: AsyncRead + AsyncWrite + Unpin>(
    tag: &str,
    folder_name: &str,
    mailbox: &Mailbox,
    stream: &mut BufReader<S>,
) -> Option<String> {
    let Some(folder) = mailbox.get_folder(folder_name) else {
        let resp = format!("{tag} NO Folder not found\r\n");
        let _ = write_line(stream, &resp).await;
        return None;
    };

    let _ = write_line(
        stream,
        "* FLAGS (\\Seen \\Answered \\Flagged \\Deleted \\Draft)\r\n",
    )
    .await;
    let _ = write_line(stream, &format!("* {} EXISTS\r\n", folder.messages.len())).await;
    let _ = write_line(stream, "* 0 RECENT\r\n").await;
    let _ = write_line(stream, "* OK [UIDVALIDITY 1]\r\n").await;

    let uidnext = folder
        .messages
        .iter()
        .map(|m| m.uid)
        .max()
        .map_or(1, |max| max + 1);
    let _ = write_line(stream, &format!("* OK [UIDNEXT {uidnext}]\r\n")).await;
    let _ = write_line(stream, "* OK [PERMANENTFLAGS (\\Seen \\Deleted)] Limited\r\n").await;

    let resp = format!("{tag} OK [READ-WRITE] SELECT completed\r\n");
    let _ = write_line(stream, &resp).await;
    Some(folder_name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake_imap::mailbox::MailboxBuilder;

    async fn run(folder: &str, mailbox: &Mailbox) -> (String, Option<String>) {
        let (client, server) = tokio::io::duplex(4096);
        let mut stream = BufReader::new(server);
        let selected = handle_select("A1", folder, mailbox, &mut stream).await;
        drop(stream);

        let mut buf = Vec::new();
        tokio::io::AsyncReadExt::read_to_end(&mut BufReader::new(client), &mut buf)
            .await
            .unwrap();
        (String::from_utf8(buf).unwrap(), selected)
    }

    #[tokio::test]
    async fn selects_existing_folder() {
        let mailbox = MailboxBuilder::new()
            .folder("INBOX")
            .message(1, b"Subject: s\r\n\r\nbody")
            .build();
        let (output, selected) = run("INBOX", &mailbox).await;
        assert_eq!(selected, Some("INBOX".to_string()));
        assert!(output.contains("* 1 EXISTS"));
        assert!(output.contains("A1 OK"));
    }

    #[tokio::test]
    async fn missing_folder_is_no() {
        let mailbox = MailboxBuilder::new().folder("INBOX").build();
        let (output, selected) = run("Gone", &mailbox).await;
        assert!(selected.is_none());
        assert!(output.contains("A1 NO"));
    }
}
