//! Platform mail fallback
//!
//! Used when no SMTP relay host is configured: the notification is
//! piped to the system `sendmail` binary with `-t` (recipients taken
//! from the message headers). Delivery is fire-and-forget: a
//! non-zero exit is logged and otherwise ignored.

use crate::error::{Error, Result};
use crate::smtp::OutboundMessage;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

const SENDMAIL: &str = "/usr/sbin/sendmail";

/// Hand the message to the platform's mail submission program.
///
/// # Errors
///
/// Returns [`Error::Connection`] only when `sendmail` cannot be
/// spawned or fed at all; a delivery rejection reported via its exit
/// status is swallowed with a warning.
pub async fn deliver(message: &OutboundMessage) -> Result<()> {
    let mut child = Command::new(SENDMAIL)
        .arg("-t")
        .arg("-i")
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| Error::Connection(format!("cannot spawn {SENDMAIL}: {e}")))?;

    let payload = render(message);
    if let Some(mut stdin) = child.stdin.take() {
        stdin
            .write_all(payload.as_bytes())
            .await
            .map_err(|e| Error::Connection(format!("cannot write to {SENDMAIL}: {e}")))?;
    }

    match child.wait().await {
        Ok(status) if status.success() => {
            debug!("sendmail accepted message for {:?}", message.to);
        }
        Ok(status) => warn!("sendmail exited with {status}"),
        Err(e) => warn!("sendmail did not report a status: {e}"),
    }
    Ok(())
}

fn render(message: &OutboundMessage) -> String {
    format!(
        "From: {}\nTo: {}\nSubject: {}\nMIME-Version: 1.0\nContent-Type: text/plain; charset=utf-8\n\n{}\n",
        message.from_header(),
        message.to.join(", "),
        message.subject,
        message.body,
    )
}
