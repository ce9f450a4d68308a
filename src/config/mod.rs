//! Configuration module for the lookup bot.
//!
//! Handles loading of Telegram API credentials and bot settings
//! (required channels, admin allow-list, upload storage) from the
//! environment.

mod settings;

pub use settings::{BotSettings, ConfigError, TelegramConfig};
