//! Scan-time settings snapshots
//!
//! Test mode and relay configuration are read once at the start of a
//! scan and passed through as plain values, so a scan's behavior is a
//! function of its inputs rather than of ambient mutable state.

use crate::security::TransportSecurity;
use serde::{Deserialize, Serialize};

/// Dry-run switch.
///
/// When enabled, notifications go to the override recipients and the
/// scan leaves the mailbox untouched: no extraction of real recipient
/// data, no folder moves, no expunge.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TestModeSettings {
    #[serde(default)]
    pub enabled: bool,
    /// Comma-separated override recipient list.
    #[serde(default)]
    pub recipients: String,
}

impl TestModeSettings {
    /// The trimmed, non-empty override recipients.
    #[must_use]
    pub fn recipient_list(&self) -> Vec<String> {
        split_addresses(&self.recipients)
    }
}

/// Outbound relay configuration.
///
/// An empty `host` means "no custom relay": notifications go through
/// the platform's default mail submission instead of the SMTP client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmtpRelaySettings {
    #[serde(default)]
    pub host: String,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_smtp_security")]
    pub security: TransportSecurity,
    #[serde(default)]
    pub from_email: String,
    #[serde(default)]
    pub from_name: String,
}

const fn default_smtp_port() -> u16 {
    587
}

const fn default_smtp_security() -> TransportSecurity {
    TransportSecurity::StartTls
}

impl Default for SmtpRelaySettings {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: default_smtp_port(),
            username: String::new(),
            password: String::new(),
            security: default_smtp_security(),
            from_email: String::new(),
            from_name: String::new(),
        }
    }
}

impl SmtpRelaySettings {
    /// Whether a custom relay is configured at all.
    #[must_use]
    pub fn has_relay(&self) -> bool {
        !self.host.trim().is_empty()
    }

    #[must_use]
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Split a comma-separated address list, dropping empty entries.
#[must_use]
pub fn split_addresses(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .map(ToString::to_string)
        .collect()
}
