//! Records produced by a scan
//!
//! `BounceRecord` and `ActivityEvent` are owned by their log sinks
//! once appended; the core never reads them back. `ScanOutcome` is
//! the transient result of one processor invocation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Diagnostic assigned to every detected bounce.
///
/// The engine does not parse status codes out of message bodies; a
/// generic permanent-failure pair stands in for all of them.
pub const DIAGNOSTIC_CODE: &str = "550";
pub const DIAGNOSTIC_MESSAGE: &str = "Mailbox unavailable";

/// One detected bounce, written once and never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BounceRecord {
    pub mailbox_id: u32,
    /// Sender of the bounce notification itself.
    pub sender: String,
    /// Subject of the bounce notification.
    pub subject: String,
    pub code: String,
    pub diagnostic: String,
    /// `To:` of the embedded original message, when extracted.
    pub original_to: String,
    /// Comma-joined `Cc:` list of the embedded original message.
    pub cc_addresses: String,
}

impl BounceRecord {
    #[must_use]
    pub fn new(mailbox_id: u32, sender: String, subject: String) -> Self {
        Self {
            mailbox_id,
            sender,
            subject,
            code: DIAGNOSTIC_CODE.to_string(),
            diagnostic: DIAGNOSTIC_MESSAGE.to_string(),
            original_to: String::new(),
            cc_addresses: String::new(),
        }
    }
}

/// One line of the append-only activity stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityEvent {
    pub timestamp: DateTime<Utc>,
    pub action: String,
    pub details: String,
}

/// Result of one mailbox scan. Never an `Err`: internal failures end
/// up in `error` and the count reflects what completed before them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanOutcome {
    pub processed: u32,
    pub error: Option<String>,
}
