//! Run configuration.
//!
//! [`Settings`] is the immutable bundle the pipeline runs on, resolved
//! before any thread starts. Defaults can be kept in a TOML file at:
//! 1. `$ATTFETCH_CONFIG` (environment variable)
//! 2. `~/.config/attfetch/config.toml` (Linux/macOS)
//!    `%APPDATA%\attfetch\config.toml` (Windows)
//! Command-line flags always take precedence.

use std::path::PathBuf;

use serde::Deserialize;

/// Everything the pipeline needs, resolved and validated.
///
/// Shared read-only by all workers.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: String,
    pub port: u16,
    pub login: String,
    pub password: String,
    /// Mailbox name as typed; modified-UTF-7 encoding happens at the
    /// session boundary.
    pub mailbox: String,
    /// Target directory for saved attachments. Must exist.
    pub dir: PathBuf,
    /// Worker sessions, between 1 and [`crate::pipeline::MAX_WORKERS`].
    pub workers: usize,
    /// Process only the newest N messages when set.
    pub max_messages: Option<usize>,
    /// Delete each message after a clean extraction.
    pub delete: bool,
    /// Skip parts whose disposition is `inline`.
    pub skip_inline: bool,
}

/// On-disk defaults. Every field is optional; the CLI fills the rest.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub account: AccountConfig,
    pub download: DownloadConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AccountConfig {
    pub server: Option<String>,
    pub port: Option<u16>,
    pub login: Option<String>,
    pub mailbox: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    pub dir: Option<PathBuf>,
    pub workers: Option<usize>,
    pub skip_inline: Option<bool>,
}

/// Load the defaults file, searching standard locations.
///
/// Returns empty defaults if no file is found or on parse error.
pub fn load_file_config() -> FileConfig {
    if let Some(path) = config_file_path() {
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(contents) => match toml::from_str::<FileConfig>(&contents) {
                    Ok(cfg) => {
                        tracing::info!(path = %path.display(), "Loaded config");
                        return cfg;
                    }
                    Err(e) => {
                        tracing::warn!(
                            path = %path.display(),
                            error = %e,
                            "Failed to parse config, ignoring"
                        );
                    }
                },
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "Failed to read config file, ignoring"
                    );
                }
            }
        }
    }
    FileConfig::default()
}

/// Determine the config file path (checking env var first, then standard dirs).
pub fn config_file_path() -> Option<PathBuf> {
    if let Ok(env_path) = std::env::var("ATTFETCH_CONFIG") {
        return Some(PathBuf::from(env_path));
    }
    dirs::config_dir().map(|d| d.join("attfetch").join("config.toml"))
}

/// Cache directory for the log file.
pub fn cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("attfetch")
}
