//! External collaborator interfaces
//!
//! The processor reads mailbox definitions and settings, and appends
//! bounce records and activity events, through these traits. The real
//! persisted stores (the admin UI's database) live outside this
//! crate; `file_store` provides a stand-in for the CLI and the
//! in-memory implementations here back the tests and embedders.

use crate::error::{Error, Result};
use crate::mailbox::Mailbox;
use crate::record::{ActivityEvent, BounceRecord};
use crate::settings::{SmtpRelaySettings, TestModeSettings};
use chrono::Utc;
use std::sync::Mutex;

/// Read-only lookup of mailbox connection parameters.
pub trait MailboxDirectory {
    fn mailbox(&self, id: u32) -> Option<Mailbox>;
}

/// Read-only access to scan-time configuration.
pub trait SettingsStore {
    fn test_settings(&self) -> TestModeSettings;
    fn smtp_settings(&self) -> SmtpRelaySettings;
}

/// Append-only activity stream. The sink assigns the timestamp.
pub trait ActivityLog {
    /// # Errors
    ///
    /// Returns [`Error::Persistence`] when the sink rejects the write.
    /// Callers treat this as non-fatal.
    fn append(&self, action: &str, details: &str) -> Result<()>;
}

/// Append-only structured bounce store.
pub trait BounceLog {
    /// # Errors
    ///
    /// Returns [`Error::Persistence`] when the sink rejects the write.
    /// Callers treat this as non-fatal.
    fn append(&self, record: &BounceRecord) -> Result<()>;
}

/// Fixed in-memory directory.
#[derive(Debug, Default)]
pub struct MemoryDirectory {
    mailboxes: Vec<Mailbox>,
}

impl MemoryDirectory {
    #[must_use]
    pub const fn new(mailboxes: Vec<Mailbox>) -> Self {
        Self { mailboxes }
    }
}

impl MailboxDirectory for MemoryDirectory {
    fn mailbox(&self, id: u32) -> Option<Mailbox> {
        self.mailboxes.iter().find(|m| m.id == id).cloned()
    }
}

/// Fixed in-memory settings.
#[derive(Debug, Default)]
pub struct MemorySettings {
    pub test: TestModeSettings,
    pub smtp: SmtpRelaySettings,
}

impl SettingsStore for MemorySettings {
    fn test_settings(&self) -> TestModeSettings {
        self.test.clone()
    }

    fn smtp_settings(&self) -> SmtpRelaySettings {
        self.smtp.clone()
    }
}

/// In-memory activity sink, inspectable after a scan.
#[derive(Debug, Default)]
pub struct MemoryActivityLog {
    events: Mutex<Vec<ActivityEvent>>,
}

impl MemoryActivityLog {
    #[must_use]
    pub fn events(&self) -> Vec<ActivityEvent> {
        self.events.lock().expect("activity log poisoned").clone()
    }
}

impl ActivityLog for MemoryActivityLog {
    fn append(&self, action: &str, details: &str) -> Result<()> {
        let mut events = self
            .events
            .lock()
            .map_err(|e| Error::Persistence(e.to_string()))?;
        events.push(ActivityEvent {
            timestamp: Utc::now(),
            action: action.to_string(),
            details: details.to_string(),
        });
        Ok(())
    }
}

/// In-memory bounce sink, inspectable after a scan.
#[derive(Debug, Default)]
pub struct MemoryBounceLog {
    records: Mutex<Vec<BounceRecord>>,
}

impl MemoryBounceLog {
    #[must_use]
    pub fn records(&self) -> Vec<BounceRecord> {
        self.records.lock().expect("bounce log poisoned").clone()
    }
}

impl BounceLog for MemoryBounceLog {
    fn append(&self, record: &BounceRecord) -> Result<()> {
        let mut records = self
            .records
            .lock()
            .map_err(|e| Error::Persistence(e.to_string()))?;
        records.push(record.clone());
        Ok(())
    }
}
