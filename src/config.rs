//! Application configuration.
//!
//! Configuration is loaded from a TOML file at:
//! 1. `$MAILTIDY_CONFIG` (environment variable)
//! 2. `~/.config/mailtidy/config.toml` (Linux/macOS)
//!    `%APPDATA%\mailtidy\config.toml` (Windows)
//! 3. Built-in defaults

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, TidyError};
use crate::scan::ScanOptions;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General behavior settings.
    pub general: GeneralConfig,
    /// Mail account, overridable from the command line.
    pub account: AccountConfig,
    /// Scan limits and queue sizing.
    pub scan: ScanConfig,
    /// Calendar import.
    pub calendar: CalendarConfig,
}

/// General behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Override cache directory for the dedup store and logs.
    pub cache_dir: Option<PathBuf>,
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub log_level: String,
}

/// Mail account settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountConfig {
    pub user: Option<String>,
    pub pass: Option<String>,
    /// `host[:port]`; the port defaults to 993.
    pub server: Option<String>,
    pub mailbox: String,
}

/// Scan settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Examine at most this many messages, starting from the oldest.
    pub max_messages: u32,
    /// Raw messages buffered between fetching and classification.
    pub queue_capacity: usize,
    /// Messages per fetch command.
    pub fetch_chunk: u32,
    /// Remember answered invitations between runs.
    pub dedup: bool,
}

/// Calendar import settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CalendarConfig {
    /// OAuth client secret downloaded from the provider console.
    pub credentials_file: PathBuf,
    /// Cached OAuth token; relative paths live in the cache directory.
    pub token_file: PathBuf,
    pub calendar_id: String,
}

// ── Default implementations ─────────────────────────────────────

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            cache_dir: None,
            log_level: "warn".to_string(),
        }
    }
}

impl Default for AccountConfig {
    fn default() -> Self {
        Self {
            user: None,
            pass: None,
            server: None,
            mailbox: "INBOX".to_string(),
        }
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            max_messages: 100,
            queue_capacity: 10,
            fetch_chunk: 10,
            dedup: true,
        }
    }
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            credentials_file: PathBuf::from("client_secret.json"),
            token_file: PathBuf::from("token.json"),
            calendar_id: "primary".to_string(),
        }
    }
}

impl Config {
    /// Scan options for the configured mailbox.
    pub fn scan_options(&self) -> ScanOptions {
        ScanOptions {
            mailbox: self.account.mailbox.clone(),
            max_messages: self.scan.max_messages,
            queue_capacity: self.scan.queue_capacity,
            fetch_chunk: self.scan.fetch_chunk,
        }
    }
}

// ── Load ────────────────────────────────────────────────────────

/// Load configuration, searching standard locations.
///
/// Returns the default configuration if no file is found or on parse error.
pub fn load_config() -> Config {
    if let Some(path) = config_file_path() {
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(contents) => match toml::from_str::<Config>(&contents) {
                    Ok(cfg) => {
                        tracing::info!(path = %path.display(), "Loaded config");
                        return cfg;
                    }
                    Err(e) => {
                        tracing::warn!(
                            path = %path.display(),
                            error = %e,
                            "Failed to parse config, using defaults"
                        );
                    }
                },
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "Failed to read config file, using defaults"
                    );
                }
            }
        }
    }
    Config::default()
}

/// Determine the config file path (checking env var first, then standard dirs).
pub fn config_file_path() -> Option<PathBuf> {
    if let Ok(env_path) = std::env::var("MAILTIDY_CONFIG") {
        return Some(PathBuf::from(env_path));
    }
    dirs::config_dir().map(|d| d.join("mailtidy").join("config.toml"))
}

/// Return the cache directory for the dedup store, tokens and logs.
pub fn cache_dir(config: &Config) -> PathBuf {
    if let Some(ref dir) = config.general.cache_dir {
        return dir.clone();
    }
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mailtidy")
}

/// Return the log file path.
pub fn log_file_path(config: &Config) -> PathBuf {
    cache_dir(config).join("mailtidy.log")
}

/// Return the OAuth token path, resolving relative paths against the cache directory.
pub fn token_file_path(config: &Config) -> PathBuf {
    let token = &config.calendar.token_file;
    if token.is_absolute() {
        token.clone()
    } else {
        cache_dir(config).join(token)
    }
}

// ── Credentials file ────────────────────────────────────────────

/// Account credentials kept beside the binary as `{"User","Pass","Serv"}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    #[serde(rename = "User", default)]
    pub user: Option<String>,
    #[serde(rename = "Pass", default)]
    pub pass: Option<String>,
    #[serde(rename = "Serv", default)]
    pub server: Option<String>,
}

impl Credentials {
    /// Read a credentials file. A missing file yields `Ok(None)`.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        let contents = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(TidyError::io(path, e)),
        };
        let creds = serde_json::from_str(&contents).map_err(|e| {
            TidyError::Config(format!("invalid credentials file '{}': {e}", path.display()))
        })?;
        tracing::info!(path = %path.display(), "Loaded credentials");
        Ok(Some(creds))
    }

    /// Fill `account` from these credentials; present fields win.
    pub fn apply_to(&self, account: &mut AccountConfig) {
        if let Some(ref user) = self.user {
            account.user = Some(user.clone());
        }
        if let Some(ref pass) = self.pass {
            account.pass = Some(pass.clone());
        }
        if let Some(ref server) = self.server {
            account.server = Some(server.clone());
        }
    }
}
