//! Notification dispatch
//!
//! Builds the human-readable notification for a detected bounce and
//! sends it through the configured relay, or through the platform
//! mail fallback when no relay host is set.

use crate::error::Result;
use crate::mailbox::Mailbox;
use crate::record::BounceRecord;
use crate::sendmail;
use crate::settings::SmtpRelaySettings;
use crate::smtp::{OutboundMessage, SmtpClient};

/// Compose the notification message for `record`, addressed to
/// `recipients`.
#[must_use]
pub fn bounce_notification(
    mailbox: &Mailbox,
    record: &BounceRecord,
    smtp: &SmtpRelaySettings,
    recipients: Vec<String>,
) -> OutboundMessage {
    let from = if smtp.from_email.trim().is_empty() {
        mailbox.username.clone()
    } else {
        smtp.from_email.clone()
    };

    let mut body = format!(
        "A delivery failure was detected in mailbox '{}'.\n\n\
         Sender:     {}\n\
         Subject:    {}\n\
         Diagnostic: {} {}\n",
        mailbox.name, record.sender, record.subject, record.code, record.diagnostic,
    );
    if !record.original_to.is_empty() {
        body.push_str(&format!("Original To: {}\n", record.original_to));
    }
    if !record.cc_addresses.is_empty() {
        body.push_str(&format!("Original Cc: {}\n", record.cc_addresses));
    }

    OutboundMessage {
        from,
        from_name: smtp.from_name.clone(),
        to: recipients,
        subject: format!("Bounce notification: {}", record.subject),
        body,
    }
}

/// Send a notification through the relay, or the platform fallback
/// when no relay host is configured.
///
/// # Errors
///
/// Propagates the SMTP client's connection/protocol/auth errors, or
/// the fallback's spawn failure. Callers treat a failure as aborting
/// this one notification, never the scan.
pub async fn send(
    smtp: &SmtpRelaySettings,
    local_name: &str,
    message: &OutboundMessage,
) -> Result<()> {
    if smtp.has_relay() {
        SmtpClient::new(smtp.clone())
            .with_local_name(local_name)
            .send(message)
            .await
    } else {
        sendmail::deliver(message).await
    }
}
