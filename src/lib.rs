//! IMAP bounce-mailbox scanner
//!
//! Scans configured IMAP mailboxes for non-delivery notifications,
//! classifies them by subject, digs the original recipients out of
//! the nested `message/rfc822` part, records what it finds, and
//! relays a notification through a minimal SMTP client (or the
//! platform `sendmail` when no relay is configured).
//!
//! The scan loop talks to its surroundings through narrow traits
//! ([`MailboxDirectory`], [`SettingsStore`], [`ActivityLog`],
//! [`BounceLog`], [`MailboxSession`]) so it can be embedded and
//! tested without a real server on either protocol.

mod classifier;
mod config;
mod error;
mod extractor;
mod file_store;
mod imap;
mod mailbox;
mod notify;
mod processor;
mod record;
mod security;
mod sendmail;
mod settings;
mod smtp;
mod store;
mod stream;

pub use classifier::{BounceClassifier, DEFAULT_BOUNCE_PATTERNS};
pub use config::RunnerConfig;
pub use error::{Error, Result};
pub use extractor::{
    HeaderSource, OriginalHeaders, cc_addresses, extract_original_headers, first_to_address,
    header_block,
};
pub use file_store::{FileStore, StoreConfig};
pub use imap::{ImapMailboxSession, MailboxSession, connect};
pub use mailbox::Mailbox;
pub use notify::{bounce_notification, send as send_notification};
pub use processor::BounceProcessor;
pub use record::{ActivityEvent, BounceRecord, DIAGNOSTIC_CODE, DIAGNOSTIC_MESSAGE, ScanOutcome};
pub use security::TransportSecurity;
pub use settings::{SmtpRelaySettings, TestModeSettings, split_addresses};
pub use smtp::{OutboundMessage, Reply, SmtpClient, Transcript};
pub use store::{
    ActivityLog, BounceLog, MailboxDirectory, MemoryActivityLog, MemoryBounceLog, MemoryDirectory,
    MemorySettings, SettingsStore,
};
