//! Application settings and Telegram configuration.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::gate::RequiredChannel;
use crate::UserId;

/// Telegram API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    /// Telegram API ID (obtain from <https://my.telegram.org>).
    pub api_id: i32,

    /// Telegram API hash (obtain from <https://my.telegram.org>).
    pub api_hash: String,

    /// Bot token issued by `@BotFather`. Prompted for when absent.
    #[serde(default)]
    pub bot_token: Option<String>,

    /// Path to the session file.
    #[serde(default = "default_session_path")]
    pub session_path: PathBuf,
}

fn default_session_path() -> PathBuf {
    PathBuf::from("bot.session")
}

impl TelegramConfig {
    /// Creates a new Telegram configuration.
    #[must_use]
    pub fn new(api_id: i32, api_hash: String) -> Self {
        Self {
            api_id,
            api_hash,
            bot_token: None,
            session_path: default_session_path(),
        }
    }

    /// Creates configuration from environment variables.
    ///
    /// Expects `TG_API_ID` and `TG_API_HASH` to be set; `TG_BOT_TOKEN` and
    /// `TG_SESSION_PATH` are optional.
    ///
    /// # Errors
    ///
    /// Returns an error if environment variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_id: i32 = std::env::var("TG_API_ID")
            .map_err(|_| ConfigError::MissingEnvVar("TG_API_ID"))?
            .parse()
            .map_err(|_| ConfigError::InvalidApiId)?;

        let api_hash = std::env::var("TG_API_HASH")
            .map_err(|_| ConfigError::MissingEnvVar("TG_API_HASH"))?;

        let bot_token = std::env::var("TG_BOT_TOKEN")
            .ok()
            .map(|t| t.trim().to_owned())
            .filter(|t| !t.is_empty());

        let session_path = std::env::var("TG_SESSION_PATH")
            .map_or_else(|_| default_session_path(), PathBuf::from);

        Ok(Self {
            api_id,
            api_hash,
            bot_token,
            session_path,
        })
    }
}

/// Bot-specific settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotSettings {
    /// Channels a user must be a member of before using the bot, in display order.
    #[serde(default)]
    pub required_channels: Vec<RequiredChannel>,

    /// Users allowed to run admin operations.
    #[serde(default)]
    pub admin_ids: Vec<UserId>,

    /// Handle shown to users when they need to contact an administrator.
    #[serde(default = "default_admin_contact")]
    pub admin_contact: String,

    /// Directory holding the uploaded dataset file and its manifest.
    #[serde(default = "default_upload_dir")]
    pub upload_dir: PathBuf,

    /// Accepted file extension for dataset uploads (including the dot).
    #[serde(default = "default_upload_extension")]
    pub upload_extension: String,

    /// Largest accepted dataset upload in bytes.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: u64,

    /// Timeout for a single channel membership query, in seconds.
    #[serde(default = "default_membership_timeout")]
    pub membership_timeout_secs: u64,

    /// Minimum interval between outbound sends, in milliseconds.
    #[serde(default = "default_send_interval")]
    pub send_interval_ms: u64,

    /// Path of the SQLite database with registered users.
    #[serde(default = "default_user_db_path")]
    pub user_db_path: PathBuf,
}

fn default_admin_contact() -> String {
    "@admin".to_owned()
}

fn default_upload_dir() -> PathBuf {
    PathBuf::from("files")
}

fn default_upload_extension() -> String {
    ".xlsx".to_owned()
}

fn default_max_upload_bytes() -> u64 {
    20 * 1024 * 1024 // Bot API download ceiling
}

fn default_membership_timeout() -> u64 {
    5
}

fn default_send_interval() -> u64 {
    40
}

fn default_user_db_path() -> PathBuf {
    PathBuf::from("users.db")
}

impl Default for BotSettings {
    fn default() -> Self {
        Self {
            required_channels: Vec::new(),
            admin_ids: Vec::new(),
            admin_contact: default_admin_contact(),
            upload_dir: default_upload_dir(),
            upload_extension: default_upload_extension(),
            max_upload_bytes: default_max_upload_bytes(),
            membership_timeout_secs: default_membership_timeout(),
            send_interval_ms: default_send_interval(),
            user_db_path: default_user_db_path(),
        }
    }
}

impl BotSettings {
    /// Creates bot settings from environment variables, falling back to
    /// defaults for unset ones.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set but cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds settings from an arbitrary variable source.
    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let required_channels = var("REQUIRED_CHANNELS")
            .map(|raw| split_list(&raw).map(RequiredChannel::new).collect())
            .unwrap_or(defaults.required_channels);

        let admin_ids = match var("ADMIN_IDS") {
            Some(raw) => split_list(&raw)
                .map(|item| parse_value::<i64>("ADMIN_IDS", item).map(UserId))
                .collect::<Result<Vec<_>, _>>()?,
            None => defaults.admin_ids,
        };

        let mut upload_extension = var("UPLOAD_EXTENSION")
            .map(|e| e.trim().to_lowercase())
            .filter(|e| !e.is_empty())
            .unwrap_or(defaults.upload_extension);
        if !upload_extension.starts_with('.') {
            upload_extension.insert(0, '.');
        }

        Ok(Self {
            required_channels,
            admin_ids,
            admin_contact: var("ADMIN_CONTACT")
                .filter(|c| !c.trim().is_empty())
                .unwrap_or(defaults.admin_contact),
            upload_dir: var("UPLOAD_DIR").map_or(defaults.upload_dir, PathBuf::from),
            upload_extension,
            max_upload_bytes: parse_optional(&var, "MAX_UPLOAD_BYTES")?
                .unwrap_or(defaults.max_upload_bytes),
            membership_timeout_secs: parse_optional(&var, "MEMBERSHIP_TIMEOUT_SECS")?
                .unwrap_or(defaults.membership_timeout_secs),
            send_interval_ms: parse_optional(&var, "SEND_INTERVAL_MS")?
                .unwrap_or(defaults.send_interval_ms),
            user_db_path: var("USER_DB_PATH").map_or(defaults.user_db_path, PathBuf::from),
        })
    }

    /// Checks whether the user is on the admin allow-list.
    #[must_use]
    pub fn is_admin(&self, user: UserId) -> bool {
        self.admin_ids.contains(&user)
    }

    /// Returns the per-channel membership query timeout.
    #[must_use]
    pub const fn membership_timeout(&self) -> Duration {
        Duration::from_secs(self.membership_timeout_secs)
    }

    /// Returns the minimum interval between outbound sends.
    #[must_use]
    pub const fn send_interval(&self) -> Duration {
        Duration::from_millis(self.send_interval_ms)
    }

    /// Checks whether a file name carries the accepted upload extension.
    #[must_use]
    pub fn accepts_file_name(&self, file_name: &str) -> bool {
        file_name.to_lowercase().ends_with(&self.upload_extension)
    }
}

fn split_list(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(',').map(str::trim).filter(|s| !s.is_empty())
}

fn parse_value<T: FromStr>(name: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
        name,
        value: raw.to_owned(),
    })
}

fn parse_optional<T: FromStr>(
    var: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<Option<T>, ConfigError> {
    var(name).map(|raw| parse_value(name, &raw)).transpose()
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Invalid API ID format (must be a positive integer)")]
    InvalidApiId,

    #[error("Invalid value for {name}: '{value}'")]
    InvalidValue { name: &'static str, value: String },
}
