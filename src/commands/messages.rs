//! Reply texts.

use chrono::{DateTime, Utc};

use super::types::{
    Button, Markup, Outbound, PANEL_DELETE, PANEL_PROMO, PANEL_STATUS, PANEL_UPLOAD, PANEL_USER_COUNT,
};
use crate::dataset::LoadSummary;
use crate::gate::SubscriptionPrompt;
use crate::render::escape_html;

pub const GREETING: &str = "Hello! Please send your ID.";
pub const ALL_SUBSCRIBED: &str = "✅ You have joined all channels! Send your ID.";
pub const INVALID_INPUT: &str = "❗ Please send a valid ID or press /start!";
pub const NOT_ADMIN: &str = "❌ You are not an admin!";
pub const ADMINS_ONLY_UPLOAD: &str = "❌ Only admins can upload files!";
pub const ADMIN_WELCOME: &str = "👨‍💻 Welcome to the admin panel! Choose an action:";
pub const FILE_DELETED: &str = "✅ File deleted.";
pub const NOTHING_TO_DELETE: &str = "❌ No file to delete!";
pub const COUNT_FAILED: &str = "❌ Could not get the number of users.";
pub const RENDER_FAILED: &str = "❌ Could not prepare the result, please try again later.";
pub const NO_DATASET: &str = "ℹ️ No dataset loaded.";
pub const BROADCAST_DISABLED: &str = "📣 Promotions are not available.";

const PROMPT_FIRST: &str = "<b>❌ To use the bot, please join these channels:</b>";
const PROMPT_AGAIN: &str = "<b>❌ Please join these channels:</b>";
const RECHECK_LABEL: &str = "✅ Check subscription";

/// The subscription prompt as a message with join and re-check buttons.
#[must_use]
pub fn subscription_prompt(prompt: &SubscriptionPrompt, again: bool) -> Outbound {
    let mut rows: Vec<Vec<Button>> = prompt
        .entries
        .iter()
        .map(|entry| {
            vec![Button::Url {
                text: format!("❌ Channel {} - {}", entry.index, entry.channel),
                url: entry.join_url.clone(),
            }]
        })
        .collect();
    rows.push(vec![Button::Callback {
        text: RECHECK_LABEL.to_owned(),
        data: prompt.recheck_action.to_owned(),
    }]);

    let text = if again { PROMPT_AGAIN } else { PROMPT_FIRST };
    Outbound::with_markup(text, Markup::Inline(rows))
}

#[must_use]
pub fn admin_panel() -> Outbound {
    let rows = vec![
        vec![PANEL_UPLOAD.to_owned(), PANEL_DELETE.to_owned()],
        vec![PANEL_USER_COUNT.to_owned(), PANEL_STATUS.to_owned()],
        vec![PANEL_PROMO.to_owned()],
    ];
    Outbound::with_markup(ADMIN_WELCOME, Markup::ReplyKeyboard(rows))
}

#[must_use]
pub fn no_data_yet(admin_contact: &str) -> String {
    format!(
        "❗ No data is available yet. Contact the admin: {}",
        escape_html(admin_contact)
    )
}

#[must_use]
pub fn not_found(id: &str) -> String {
    format!("❌ No data found for ID {}.", escape_html(id))
}

#[must_use]
pub fn upload_instructions(extension: &str) -> String {
    format!("📥 Please send the Excel file ({}).", escape_html(extension))
}

#[must_use]
pub fn wrong_extension(extension: &str) -> String {
    format!("❌ Please send only {} files!", escape_html(extension))
}

#[must_use]
pub fn too_large(limit: u64) -> String {
    format!("❌ The file is too large. The limit is {limit} bytes.")
}

#[must_use]
pub fn download_failed(reason: &str) -> String {
    format!("❌ Could not download the file: {}", escape_html(reason))
}

#[must_use]
pub fn upload_failed(reason: &str) -> String {
    format!("❌ Error: {}", escape_html(reason))
}

#[must_use]
pub fn upload_succeeded(summary: &LoadSummary) -> String {
    format!(
        "✅ File '{}' loaded: {} records, {} columns.",
        escape_html(&summary.file_name),
        summary.record_count,
        summary.column_count
    )
}

#[must_use]
pub fn user_count(count: u64) -> String {
    format!("👥 Total users: {count}")
}

#[must_use]
pub fn dataset_status(file_name: &str, record_count: usize, loaded_at: DateTime<Utc>) -> String {
    format!(
        "📄 Active dataset: {}\nRecords: {}\nLoaded: {}",
        escape_html(file_name),
        record_count,
        loaded_at.format("%Y-%m-%d %H:%M:%S UTC")
    )
}
