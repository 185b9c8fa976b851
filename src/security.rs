//! Transport security modes
//!
//! Provides a strongly-typed enum for the connection security of a
//! mailbox or SMTP relay instead of raw strings. The wire strings
//! (`ssl`, `tls`, `none`) match what the admin collaborator stores.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How a TCP connection to a mail server is protected.
///
/// `Ssl` wraps the socket in TLS immediately (implicit TLS, e.g. IMAP
/// port 993 or SMTP port 465). `StartTls` opens plaintext and upgrades
/// in-band. `Plain` never encrypts.
///
/// # Examples
///
/// ```
/// use bounce_processor::TransportSecurity;
///
/// assert_eq!(TransportSecurity::Ssl.as_str(), "ssl");
/// assert_eq!(TransportSecurity::from("tls"), TransportSecurity::StartTls);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransportSecurity {
    /// Implicit TLS from the first byte.
    #[serde(rename = "ssl")]
    Ssl,
    /// Plaintext upgraded via STARTTLS.
    #[serde(rename = "tls")]
    StartTls,
    /// No encryption.
    #[serde(rename = "none")]
    Plain,
}

impl TransportSecurity {
    /// The configured string form (`ssl`, `tls`, or `none`).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ssl => "ssl",
            Self::StartTls => "tls",
            Self::Plain => "none",
        }
    }

    /// Infer a mode from a port when no explicit setting exists.
    ///
    /// Port 993 is the implicit-TLS IMAP port; everything else is
    /// treated as plaintext. STARTTLS is never inferred, only
    /// configured.
    #[must_use]
    pub const fn infer_from_port(port: u16) -> Self {
        if port == 993 { Self::Ssl } else { Self::Plain }
    }
}

impl fmt::Display for TransportSecurity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for TransportSecurity {
    fn from(s: &str) -> Self {
        if s.eq_ignore_ascii_case("ssl") {
            Self::Ssl
        } else if s.eq_ignore_ascii_case("tls") || s.eq_ignore_ascii_case("starttls") {
            Self::StartTls
        } else {
            Self::Plain
        }
    }
}
