//! Mailbox scan orchestration
//!
//! One [`BounceProcessor::scan`] call is one pass over one mailbox:
//! connect, search everything in the inbox folder (all messages, not
//! just unseen; reprocessing is deliberate), classify each message,
//! extract and notify for bounces, sort messages into the processed
//! and skipped folders, expunge, close.
//!
//! Failure containment: structural failures (lookup, connect, search)
//! abort the scan into the outcome's error field; anything that goes
//! wrong with a single message is logged and the loop moves on; sink
//! write failures only warn. Nothing escapes `scan` as an `Err`.
//!
//! Callers are expected to serialize scans per mailbox id; two
//! concurrent scans of the same mailbox will race on folder moves.

use crate::classifier::BounceClassifier;
use crate::error::{Error, Result};
use crate::extractor;
use crate::imap::{self, MailboxSession};
use crate::mailbox::Mailbox;
use crate::notify;
use crate::record::{BounceRecord, ScanOutcome};
use crate::settings::{SmtpRelaySettings, TestModeSettings};
use crate::store::{ActivityLog, BounceLog, MailboxDirectory, SettingsStore};
use tracing::{info, warn};

enum MessageAction {
    Processed,
    Skipped,
}

/// Drives scans against the external collaborators it is built from.
pub struct BounceProcessor<'a> {
    directory: &'a dyn MailboxDirectory,
    settings: &'a dyn SettingsStore,
    activity: &'a dyn ActivityLog,
    bounces: &'a dyn BounceLog,
    classifier: BounceClassifier,
    local_name: String,
}

impl<'a> BounceProcessor<'a> {
    #[must_use]
    pub fn new(
        directory: &'a dyn MailboxDirectory,
        settings: &'a dyn SettingsStore,
        activity: &'a dyn ActivityLog,
        bounces: &'a dyn BounceLog,
    ) -> Self {
        Self {
            directory,
            settings,
            activity,
            bounces,
            classifier: BounceClassifier::with_defaults(),
            local_name: "localhost".to_string(),
        }
    }

    /// Replace the built-in subject patterns.
    #[must_use]
    pub fn with_classifier(mut self, classifier: BounceClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    /// Name announced in the SMTP `EHLO`.
    #[must_use]
    pub fn with_local_name(mut self, name: impl Into<String>) -> Self {
        self.local_name = name.into();
        self
    }

    /// Scan one mailbox, examining at most `limit` messages.
    ///
    /// Settings are snapshotted once at the start; changing them
    /// mid-scan has no effect on the running pass.
    pub async fn scan(&self, mailbox_id: u32, limit: usize) -> ScanOutcome {
        self.log(
            "Scan started",
            &format!("mailbox id {mailbox_id}, limit {limit}"),
        );

        let mut processed = 0u32;
        let error = match self.run(mailbox_id, limit, &mut processed).await {
            Ok(()) => {
                self.log("Scan finished", &format!("{processed} bounce(s) processed"));
                None
            }
            Err(e) => {
                let message = e.to_string();
                self.log("Scan failed", &message);
                Some(message)
            }
        };

        info!(
            "Scan of mailbox {} done: {} processed, error: {:?}",
            mailbox_id, processed, error
        );
        ScanOutcome { processed, error }
    }

    async fn run(&self, mailbox_id: u32, limit: usize, processed: &mut u32) -> Result<()> {
        let mailbox = self
            .directory
            .mailbox(mailbox_id)
            .ok_or(Error::MailboxNotFound(mailbox_id))?;

        // Snapshot settings once; the scan is a function of these.
        let test = self.settings.test_settings();
        let smtp = self.settings.smtp_settings();

        let mut session = imap::connect(&mailbox).await?;
        self.log("Connected", &mailbox.addr());

        self.process_mailbox(&mut session, &mailbox, &test, &smtp, limit, processed)
            .await
    }

    /// The scan body, generic over the session so it can run against
    /// a fake mailbox in tests.
    pub async fn process_mailbox<S: MailboxSession>(
        &self,
        session: &mut S,
        mailbox: &Mailbox,
        test: &TestModeSettings,
        smtp: &SmtpRelaySettings,
        limit: usize,
        processed: &mut u32,
    ) -> Result<()> {
        let uids = session.search_all().await?;
        self.log(
            "Search completed",
            &format!("{} message(s) in {}", uids.len(), mailbox.inbox_folder),
        );

        for &uid in uids.iter().take(limit) {
            match self
                .handle_message(session, mailbox, test, smtp, uid)
                .await
            {
                Ok(MessageAction::Processed) => *processed += 1,
                Ok(MessageAction::Skipped) => {}
                Err(e) => self.log("Message failed", &format!("UID {uid}: {e}")),
            }
        }

        if test.enabled {
            self.log("Test mode", "moves and expunge suppressed");
        } else {
            match session.expunge().await {
                Ok(()) => self.log("Expunged", &mailbox.inbox_folder),
                Err(e) => self.log("Expunge failed", &e.to_string()),
            }
        }

        if let Err(e) = session.close().await {
            warn!("Closing the IMAP session failed: {e}");
        }
        Ok(())
    }

    async fn handle_message<S: MailboxSession>(
        &self,
        session: &mut S,
        mailbox: &Mailbox,
        test: &TestModeSettings,
        smtp: &SmtpRelaySettings,
        uid: u32,
    ) -> Result<MessageAction> {
        let raw = session
            .fetch_header_block(uid)
            .await?
            .ok_or_else(|| Error::Imap(format!("no headers returned for UID {uid}")))?;
        let block = extractor::header_block(&raw);
        let subject = first_value(&block, "Subject");
        let sender = first_value(&block, "From");

        let bounce =
            self.classifier.is_bounce(&subject) && !self.classifier.is_auto_reply(&subject);
        if !bounce {
            self.log("Message skipped", &format!("UID {uid}: '{subject}'"));
            if !test.enabled {
                session.move_to(uid, &mailbox.skipped_folder).await?;
            }
            return Ok(MessageAction::Skipped);
        }

        let mut record = BounceRecord::new(mailbox.id, sender, subject);
        let mut cc_list = Vec::new();

        // Test mode inspects without touching real recipient data.
        if !test.enabled {
            match extractor::extract_original_headers(session, uid).await {
                Ok(original) => {
                    self.log(
                        "Original message located",
                        &format!("UID {uid}: {}", original.source),
                    );
                    record.original_to =
                        extractor::first_to_address(&original.block).unwrap_or_default();
                    cc_list = extractor::cc_addresses(&original.block);
                    record.cc_addresses = cc_list.join(",");
                }
                Err(e) => self.log("Extraction failed", &format!("UID {uid}: {e}")),
            }
        }

        if let Err(e) = self.bounces.append(&record) {
            warn!("Bounce log write failed: {e}");
        }
        self.log(
            "Bounce detected",
            &format!("UID {uid}: '{}' from {}", record.subject, record.sender),
        );

        let recipients = if test.enabled {
            test.recipient_list()
        } else {
            cc_list
        };
        if recipients.is_empty() {
            self.log("Notification skipped", &format!("UID {uid}: no recipients"));
        } else {
            let message = notify::bounce_notification(mailbox, &record, smtp, recipients.clone());
            match notify::send(smtp, &self.local_name, &message).await {
                Ok(()) => self.log(
                    "Notification sent",
                    &format!("UID {uid}: {}", recipients.join(", ")),
                ),
                // A failed notification never aborts the scan.
                Err(e) => self.log("Notification failed", &format!("UID {uid}: {e}")),
            }
        }

        if !test.enabled {
            session.move_to(uid, &mailbox.processed_folder).await?;
            self.log(
                "Message moved",
                &format!("UID {uid} -> {}", mailbox.processed_folder),
            );
        }
        Ok(MessageAction::Processed)
    }

    fn log(&self, action: &str, details: &str) {
        if let Err(e) = self.activity.append(action, details) {
            warn!("Activity log write failed ({action}): {e}");
        }
    }
}

fn first_value(block: &str, name: &str) -> String {
    extractor::header_values(block, name)
        .into_iter()
        .next()
        .unwrap_or_default()
}
