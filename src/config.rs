//! Runner configuration
//!
//! Environment bootstrap for the CLI: where the store config file
//! lives and what name to announce in SMTP `EHLO`.

use std::env;
use std::path::PathBuf;

/// CLI bootstrap settings.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub config_path: PathBuf,
    pub helo_name: String,
}

impl RunnerConfig {
    /// Load from environment variables, reading a `.env` file if
    /// present. All variables are optional:
    ///
    /// - `BOUNCE_CONFIG` (default: `bounce.json`)
    /// - `BOUNCE_HELO_NAME` (default: `localhost`)
    #[must_use]
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            config_path: env::var("BOUNCE_CONFIG")
                .map_or_else(|_| PathBuf::from("bounce.json"), PathBuf::from),
            helo_name: env::var("BOUNCE_HELO_NAME").unwrap_or_else(|_| "localhost".to_string()),
        }
    }
}
