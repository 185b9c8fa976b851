//! Error types for bounce-processor

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("mailbox not found: {0}")]
    MailboxNotFound(u32),

    #[error("IMAP connection failed: {0}")]
    Connection(String),

    #[error("IMAP error: {0}")]
    Imap(String),

    #[error("SMTP protocol error: {0}")]
    Protocol(String),

    #[error("authentication failed: {0}")]
    Auth(String),

    /// Non-fatal: the extractor fell through every strategy.
    #[error("extraction failed: {0}")]
    Extraction(String),

    /// Non-fatal: a log sink rejected a write.
    #[error("persistence error: {0}")]
    Persistence(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("TLS error: {0}")]
    Tls(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
