//! Conversions between bot effects and Telegram message types.

use async_trait::async_trait;
use grammers_client::media::Media;
use grammers_client::message::InputMessage;
use grammers_client::{Client, button, reply_markup};

use crate::commands::{Button, DocumentFetcher, FetchError, Markup};

/// Builds an HTML message with an optional keyboard.
pub fn input_message(text: &str, markup: Option<&Markup>) -> InputMessage {
    let message = InputMessage::new().html(text);
    match markup {
        Some(Markup::Inline(rows)) => {
            let rows = rows
                .iter()
                .map(|row| row.iter().map(inline_button).collect())
                .collect();
            message.reply_markup(&reply_markup::inline(rows))
        }
        Some(Markup::ReplyKeyboard(rows)) => {
            let rows = rows
                .iter()
                .map(|row| row.iter().map(|label| button::text(label.as_str())).collect())
                .collect();
            message.reply_markup(&reply_markup::keyboard(rows).fit_size())
        }
        None => message,
    }
}

fn inline_button(button: &Button) -> button::Inline {
    match button {
        Button::Url { text, url } => button::url(text.as_str(), url.as_str()),
        Button::Callback { text, data } => button::inline(text.as_str(), data.as_bytes()),
    }
}

/// Downloads a document on demand, refusing to exceed a size limit.
pub struct MediaFetcher {
    client: Client,
    media: Media,
    limit: u64,
}

impl MediaFetcher {
    #[must_use]
    pub const fn new(client: Client, media: Media, limit: u64) -> Self {
        Self { client, media, limit }
    }
}

#[async_trait]
impl DocumentFetcher for MediaFetcher {
    async fn fetch(&self) -> Result<Vec<u8>, FetchError> {
        let mut download = self.client.iter_download(&self.media);
        let mut bytes = Vec::new();

        while let Some(chunk) = download.next().await.map_err(|e| FetchError(e.to_string()))? {
            bytes.extend_from_slice(&chunk);
            if u64::try_from(bytes.len()).map_or(true, |len| len > self.limit) {
                return Err(FetchError(format!("file exceeds {} bytes", self.limit)));
            }
        }

        Ok(bytes)
    }
}
