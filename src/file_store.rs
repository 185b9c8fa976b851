//! File-backed stores for the CLI
//!
//! The persisted admin database is an external collaborator; the CLI
//! stands one in with a JSON config file (mailboxes, settings,
//! classifier patterns) and JSONL append-only log files next to it.

use crate::error::{Error, Result};
use crate::mailbox::Mailbox;
use crate::record::{ActivityEvent, BounceRecord};
use crate::settings::{SmtpRelaySettings, TestModeSettings};
use crate::store::{ActivityLog, BounceLog, MailboxDirectory, SettingsStore};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

fn default_activity_log() -> String {
    "activity.jsonl".to_string()
}

fn default_bounce_log() -> String {
    "bounces.jsonl".to_string()
}

/// On-disk configuration document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub mailboxes: Vec<Mailbox>,
    #[serde(default)]
    pub test_mode: TestModeSettings,
    #[serde(default)]
    pub smtp: SmtpRelaySettings,
    /// Extra bounce-subject patterns, prepended to the built-in set.
    #[serde(default)]
    pub bounce_patterns: Vec<String>,
    #[serde(default = "default_activity_log")]
    pub activity_log: String,
    #[serde(default = "default_bounce_log")]
    pub bounce_log: String,
}

/// Directory, settings store, and log sinks in one file-backed value.
#[derive(Debug)]
pub struct FileStore {
    config: StoreConfig,
    activity_path: PathBuf,
    bounce_path: PathBuf,
}

impl FileStore {
    /// Load the JSON config at `path`. Log files resolve relative to
    /// the config file's directory.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when the file is missing or not
    /// valid JSON.
    pub fn open(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {e}", path.display())))?;
        let config: StoreConfig = serde_json::from_str(&raw)
            .map_err(|e| Error::Config(format!("invalid config {}: {e}", path.display())))?;

        let base = path.parent().unwrap_or_else(|| Path::new("."));
        let activity_path = base.join(&config.activity_log);
        let bounce_path = base.join(&config.bounce_log);
        Ok(Self {
            config,
            activity_path,
            bounce_path,
        })
    }

    #[must_use]
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    #[must_use]
    pub fn mailboxes(&self) -> &[Mailbox] {
        &self.config.mailboxes
    }

    /// Read back the activity stream (newest last), tolerating and
    /// skipping unparseable lines.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Persistence`] when the log file exists but
    /// cannot be read.
    pub fn read_activity(&self) -> Result<Vec<ActivityEvent>> {
        read_jsonl(&self.activity_path)
    }

    /// Read back the recorded bounces (newest last).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Persistence`] when the log file exists but
    /// cannot be read.
    pub fn read_bounces(&self) -> Result<Vec<BounceRecord>> {
        read_jsonl(&self.bounce_path)
    }
}

fn read_jsonl<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let raw = std::fs::read_to_string(path)
        .map_err(|e| Error::Persistence(format!("cannot read {}: {e}", path.display())))?;
    Ok(raw
        .lines()
        .filter_map(|line| serde_json::from_str(line).ok())
        .collect())
}

fn append_jsonl<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let line = serde_json::to_string(value)
        .map_err(|e| Error::Persistence(format!("serialize failed: {e}")))?;
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| Error::Persistence(format!("cannot open {}: {e}", path.display())))?;
    writeln!(file, "{line}")
        .map_err(|e| Error::Persistence(format!("cannot write {}: {e}", path.display())))
}

impl MailboxDirectory for FileStore {
    fn mailbox(&self, id: u32) -> Option<Mailbox> {
        self.config.mailboxes.iter().find(|m| m.id == id).cloned()
    }
}

impl SettingsStore for FileStore {
    fn test_settings(&self) -> TestModeSettings {
        self.config.test_mode.clone()
    }

    fn smtp_settings(&self) -> SmtpRelaySettings {
        self.config.smtp.clone()
    }
}

impl ActivityLog for FileStore {
    fn append(&self, action: &str, details: &str) -> Result<()> {
        let event = ActivityEvent {
            timestamp: Utc::now(),
            action: action.to_string(),
            details: details.to_string(),
        };
        append_jsonl(&self.activity_path, &event)
    }
}

impl BounceLog for FileStore {
    fn append(&self, record: &BounceRecord) -> Result<()> {
        append_jsonl(&self.bounce_path, record)
    }
}
