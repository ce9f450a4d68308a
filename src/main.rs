//! Gated Lookup Bot - Main Entry Point
//!
//! Runs the Telegram bot that answers ID lookups for users subscribed to
//! the required channels.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use dialoguer::Password;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use gated_lookup_bot::broadcast::DisabledBroadcast;
use gated_lookup_bot::commands::Dispatcher;
use gated_lookup_bot::config::{BotSettings, TelegramConfig};
use gated_lookup_bot::dataset::DatasetStore;
use gated_lookup_bot::gate::{MembershipOracle, SubscriptionGate};
use gated_lookup_bot::registry::SqliteUserRegistry;
use gated_lookup_bot::render::TextTableRenderer;
use gated_lookup_bot::telegram::TelegramBot;

/// Telegram bot answering ID lookups behind channel subscriptions.
#[derive(Parser, Debug)]
#[command(name = "lookup_bot")]
#[command(about = "Answer ID lookups from an uploaded spreadsheet, gated by channel subscriptions")]
#[command(version)]
struct Args {
    /// Path to the .env file for environment variables.
    #[arg(long, default_value = ".env")]
    env_file: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level);

    if let Err(e) = dotenvy::from_filename(&args.env_file) {
        debug!("Could not load .env file ({}): {}", args.env_file, e);
    }

    let tg_config = TelegramConfig::from_env()
        .context("Failed to load Telegram configuration from environment")?;
    let settings = Arc::new(BotSettings::from_env().context("Invalid bot settings")?);

    if settings.required_channels.is_empty() {
        warn!("REQUIRED_CHANNELS is empty, every user will be admitted");
    }
    if settings.admin_ids.is_empty() {
        warn!("ADMIN_IDS is empty, nobody can upload a dataset");
    }
    info!(
        "Required channels: {}",
        settings
            .required_channels
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    );

    let store = Arc::new(DatasetStore::new(&settings.upload_dir));
    match store.restore().await {
        Ok(Some(summary)) => info!(
            "Restored dataset '{}' ({} records)",
            summary.file_name, summary.record_count
        ),
        Ok(None) => info!("No dataset loaded yet"),
        Err(e) => warn!("Could not restore the previous dataset: {}", e),
    }

    let registry = Arc::new(
        SqliteUserRegistry::open(&settings.user_db_path).context("Failed to open the user registry")?,
    );

    let bot = Arc::new(
        TelegramBot::connect(&tg_config, settings.send_interval(), settings.max_upload_bytes)
            .await
            .context("Failed to connect to Telegram")?,
    );

    if !bot.is_authorized().await.context("Failed to check authorization")? {
        authenticate(&bot, &tg_config).await?;
    }

    let oracle = MembershipOracle::new(bot.clone(), settings.membership_timeout());
    let gate = Arc::new(SubscriptionGate::new(oracle, settings.required_channels.clone()));
    let dispatcher = Arc::new(Dispatcher::new(
        Arc::clone(&settings),
        gate,
        store,
        registry,
        Arc::new(TextTableRenderer::new(settings.admin_contact.clone())),
        Arc::new(DisabledBroadcast),
    ));

    info!("Bot is running. Use Ctrl+C to stop.");

    loop {
        let update = tokio::select! {
            update = bot.next_update() => update,
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
                break;
            }
        };

        let Some(update) = update else {
            warn!("Update stream ended");
            break;
        };

        let Some((event, target)) = bot.to_event(update).await else {
            continue;
        };

        let bot = Arc::clone(&bot);
        let dispatcher = Arc::clone(&dispatcher);
        tokio::spawn(async move {
            let user = event.user().id;
            let effects = dispatcher.dispatch(event).await;
            if let Err(e) = bot.execute(&target, effects).await {
                warn!("Failed to reply to {}: {}", user, e);
            }
        });
    }

    bot.disconnect();
    Ok(())
}

/// Initializes the logging subsystem.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Signs the bot in, asking for the token when it is not configured.
async fn authenticate(bot: &TelegramBot, config: &TelegramConfig) -> Result<()> {
    info!("Authentication required");

    let token = match &config.bot_token {
        Some(token) => token.clone(),
        None => Password::new().with_prompt("Enter the bot token").interact()?,
    };

    bot.bot_sign_in(&token, &config.api_hash)
        .await
        .context("Authentication failed")
}
