//! Mailbox connection records
//!
//! A `Mailbox` carries everything needed to open one IMAP account:
//! connection parameters plus the three folder names the processor
//! sorts messages into. Records are created and edited by the admin
//! collaborator; the core only reads them.

use crate::security::TransportSecurity;
use serde::{Deserialize, Serialize};

fn default_inbox() -> String {
    "INBOX".to_string()
}

fn default_processed() -> String {
    "Processed".to_string()
}

fn default_skipped() -> String {
    "Skipped".to_string()
}

fn default_problem() -> String {
    "Problem".to_string()
}

/// One scannable IMAP account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mailbox {
    pub id: u32,
    pub name: String,
    pub host: String,
    pub port: u16,
    pub username: String,
    pub secret: String,
    /// Explicit security mode; when absent it is inferred from the
    /// port (993 means implicit TLS).
    #[serde(default)]
    pub security: Option<TransportSecurity>,
    #[serde(default = "default_inbox")]
    pub inbox_folder: String,
    #[serde(default = "default_processed")]
    pub processed_folder: String,
    #[serde(default = "default_skipped")]
    pub skipped_folder: String,
    /// Reserved for messages that repeatedly fail processing; the
    /// scan loop does not use it yet.
    #[serde(default = "default_problem")]
    pub problem_folder: String,
}

impl Mailbox {
    /// The security mode to actually connect with.
    #[must_use]
    pub fn effective_security(&self) -> TransportSecurity {
        self.security
            .unwrap_or_else(|| TransportSecurity::infer_from_port(self.port))
    }

    /// `host:port` for socket connects and log lines.
    #[must_use]
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
