//! Telegram bot connection: authorization, updates and replies.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use grammers_client::media::Media;
use grammers_client::message::{InputMessage, Message};
use grammers_client::peer::Peer;
use grammers_client::update::{CallbackQuery, Update};
use grammers_client::{Client, InvocationError, SenderPool, SignInError, UpdatesConfiguration, sender};
use async_trait::async_trait;
use grammers_session::storages::SqliteSession;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::convert::{MediaFetcher, input_message};
use super::rate_limiter::{RateLimiter, extract_flood_wait_seconds};
use crate::commands::{InboundEvent, IncomingDocument, Outbound};
use crate::config::TelegramConfig;
use crate::{UserId, UserProfile};

/// Buffered updates between the network task and the dispatcher.
const UPDATE_BUFFER: usize = 256;

/// Errors that can occur during Telegram operations.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Sign in failed: {0}")]
    SignInFailed(String),

    #[error("Flood wait required: {0} seconds")]
    FloodWait(u32),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Session error: {0}")]
    Session(String),

    #[error("API invocation error: {0}")]
    Invocation(String),
}

impl From<InvocationError> for TransportError {
    fn from(err: InvocationError) -> Self {
        let err_str = err.to_string();

        if (err_str.contains("FLOOD_WAIT") || err_str.contains("flood"))
            && let Some(seconds) = extract_flood_wait_seconds(&err_str)
        {
            return Self::FloodWait(seconds);
        }

        Self::Invocation(err_str)
    }
}

/// Where the effects of one inbound event are delivered.
#[derive(Debug, Clone)]
pub enum ReplyTarget {
    Message(Message),
    Callback(CallbackQuery),
}

/// Telegram bot account connected over `MTProto`.
pub struct TelegramBot {
    pub(super) client: Client,

    /// Handle to the sender pool for disconnection.
    handle: sender::SenderPoolHandle,

    /// Spaces out outbound sends.
    limiter: RateLimiter,

    /// Largest document the bot will download.
    max_download_bytes: u64,

    /// Access hashes of users seen in updates, by user id.
    ///
    /// Never pruned: membership checks need the hash of any user who may
    /// write again, and each entry is two integers.
    pub(super) known_users: RwLock<HashMap<i64, i64>>,

    /// Resolved required channels, by handle.
    pub(super) channels: RwLock<HashMap<String, grammers_tl_types::enums::InputChannel>>,

    updates: Mutex<mpsc::Receiver<Update>>,

    _pool_task: JoinHandle<()>,
    _updates_task: JoinHandle<()>,
}

impl TelegramBot {
    /// Connects to Telegram and starts receiving updates.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be opened or the connection fails.
    pub async fn connect(
        config: &TelegramConfig,
        send_interval: Duration,
        max_download_bytes: u64,
    ) -> Result<Self, TransportError> {
        info!("Connecting to Telegram...");

        let session = Arc::new(
            SqliteSession::open(&config.session_path)
                .await
                .map_err(|e| TransportError::Session(e.to_string()))?,
        );

        let SenderPool { runner, updates, handle } = SenderPool::new(Arc::clone(&session), config.api_id);

        let client = Client::new(handle.clone());

        let pool_task = tokio::spawn(async move {
            runner.run().await;
        });

        let (tx, rx) = mpsc::channel(UPDATE_BUFFER);
        let mut stream = client.stream_updates(
            updates,
            UpdatesConfiguration {
                catch_up: false,
                ..Default::default()
            },
        );
        let updates_task = tokio::spawn(async move {
            loop {
                match stream.next().await {
                    Ok(update) => {
                        if tx.send(update).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!("Update stream failed: {}", e);
                        break;
                    }
                }
            }
            debug!("Update stream closed");
        });

        let is_authorized = client
            .is_authorized()
            .await
            .map_err(|e| TransportError::Connection(e.to_string()))?;

        info!("Connected to Telegram. Authorized: {}", is_authorized);

        Ok(Self {
            client,
            handle: handle.thin,
            limiter: RateLimiter::new(send_interval),
            max_download_bytes,
            known_users: RwLock::new(HashMap::new()),
            channels: RwLock::new(HashMap::new()),
            updates: Mutex::new(rx),
            _pool_task: pool_task,
            _updates_task: updates_task,
        })
    }

    /// Checks if the client is authorized.
    ///
    /// # Errors
    ///
    /// Returns an error if the check fails.
    pub async fn is_authorized(&self) -> Result<bool, TransportError> {
        self.client
            .is_authorized()
            .await
            .map_err(|e| TransportError::Connection(e.to_string()))
    }

    /// Signs in as a bot.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is rejected.
    pub async fn bot_sign_in(&self, token: &str, api_hash: &str) -> Result<(), TransportError> {
        info!("Signing in with bot token...");

        match self.client.bot_sign_in(token, api_hash).await {
            Ok(_user) => {
                info!("Successfully signed in!");
                Ok(())
            }
            Err(SignInError::Other(e)) => Err(e.into()),
            Err(e) => Err(TransportError::SignInFailed(e.to_string())),
        }
    }

    /// Waits for the next update; `None` once the stream has ended.
    pub async fn next_update(&self) -> Option<Update> {
        self.updates.lock().await.recv().await
    }

    /// Converts an update into an inbound event and its reply target.
    ///
    /// Returns `None` for updates the bot does not react to.
    pub async fn to_event(&self, update: Update) -> Option<(InboundEvent, ReplyTarget)> {
        match update {
            Update::NewMessage(message) if !message.outgoing() => {
                let user = self.profile_of(&message.sender()?).await?;

                if let Some(Media::Document(document)) = message.media() {
                    let size = u64::try_from(document.size()).ok();
                    let file_name = document.name().to_owned();
                    let fetcher = MediaFetcher::new(
                        self.client.clone(),
                        Media::Document(document),
                        self.max_download_bytes,
                    );
                    let document = IncomingDocument::new(file_name, size, Arc::new(fetcher));
                    return Some((InboundEvent::Document { user, document }, ReplyTarget::Message(message)));
                }

                let text = message.text();
                if text.trim().is_empty() {
                    return None;
                }
                Some((InboundEvent::from_text(user, text), ReplyTarget::Message(message)))
            }
            Update::CallbackQuery(query) => {
                let user = self.profile_of(query.sender()).await?;
                let action = String::from_utf8_lossy(query.data()).into_owned();
                Some((InboundEvent::Callback { user, action }, ReplyTarget::Callback(query)))
            }
            _ => None,
        }
    }

    /// Extracts the sender profile and remembers its access hash.
    async fn profile_of(&self, peer: &Peer) -> Option<UserProfile> {
        let Peer::User(user) = peer else {
            return None;
        };

        let id = user.raw.id;
        if let Some(access_hash) = user.raw.access_hash {
            self.known_users.write().await.insert(id, access_hash);
        }

        let mut profile = UserProfile::new(UserId(id), user.full_name());
        if let Some(username) = user.username() {
            profile = profile.with_username(username);
        }
        Some(profile)
    }

    /// Performs the effects of one event in order.
    ///
    /// A failed effect does not stop the ones after it, so a callback is
    /// still answered when deleting the prompt fails.
    ///
    /// # Errors
    ///
    /// Returns the first failure.
    pub async fn execute(&self, target: &ReplyTarget, effects: Vec<Outbound>) -> Result<(), TransportError> {
        let origin = match target {
            ReplyTarget::Message(message) => Some(message.clone()),
            ReplyTarget::Callback(_) => None,
        };
        let mut delivery = Delivery {
            bot: self,
            target,
            origin,
        };
        deliver(&mut delivery, effects).await
    }

    async fn respond(&self, chat: &Message, input: InputMessage) -> Result<(), TransportError> {
        let waited = self.limiter.acquire().await;
        if !waited.is_zero() {
            debug!("Waited {:?} for rate limit", waited);
        }

        match chat.respond(input).await {
            Ok(_sent) => Ok(()),
            Err(e) => {
                let err: TransportError = e.into();
                if let TransportError::FloodWait(seconds) = &err {
                    self.limiter.handle_flood_wait(*seconds).await;
                }
                Err(err)
            }
        }
    }

    /// Disconnects from Telegram.
    pub fn disconnect(&self) {
        info!("Disconnecting from Telegram...");
        self.handle.quit();
    }
}

impl std::fmt::Debug for TelegramBot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramBot")
            .field("limiter", &self.limiter)
            .field("max_download_bytes", &self.max_download_bytes)
            .finish_non_exhaustive()
    }
}

/// Something that can perform a single outbound effect.
#[async_trait]
trait EffectSink: Send {
    async fn perform(&mut self, effect: Outbound) -> Result<(), TransportError>;
}

/// Attempts every effect in order and returns the first failure.
async fn deliver<S: EffectSink>(sink: &mut S, effects: Vec<Outbound>) -> Result<(), TransportError> {
    let mut first_error = None;
    for effect in effects {
        if let Err(e) = sink.perform(effect).await {
            debug!("Outbound effect failed: {}", e);
            first_error.get_or_insert(e);
        }
    }
    first_error.map_or(Ok(()), Err)
}

/// Effects of one event addressed to its chat.
struct Delivery<'a> {
    bot: &'a TelegramBot,
    target: &'a ReplyTarget,

    /// The message the event came from, loaded lazily for callbacks.
    origin: Option<Message>,
}

impl Delivery<'_> {
    async fn origin(&mut self) -> Result<Message, TransportError> {
        if let Some(message) = &self.origin {
            return Ok(message.clone());
        }
        let ReplyTarget::Callback(query) = self.target else {
            return Err(TransportError::Invocation("reply target has no message".to_owned()));
        };
        let message = query.load_message().await?;
        self.origin = Some(message.clone());
        Ok(message)
    }
}

#[async_trait]
impl EffectSink for Delivery<'_> {
    async fn perform(&mut self, effect: Outbound) -> Result<(), TransportError> {
        match effect {
            Outbound::Text { text, markup } => {
                let chat = self.origin().await?;
                self.bot.respond(&chat, input_message(&text, markup.as_ref())).await
            }
            Outbound::Table(table) => {
                let chat = self.origin().await?;
                self.bot.respond(&chat, input_message(&table.to_html(), None)).await
            }
            Outbound::DeleteOrigin => {
                if matches!(self.target, ReplyTarget::Callback(_)) {
                    self.origin().await?.delete().await?;
                }
                Ok(())
            }
            Outbound::AnswerCallback => {
                if let ReplyTarget::Callback(query) = self.target {
                    query.answer().send().await?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Records effects by name and fails the ones listed in `failing`.
    #[derive(Default)]
    struct RecordingSink {
        performed: Vec<&'static str>,
        failing: Vec<&'static str>,
    }

    #[async_trait]
    impl EffectSink for RecordingSink {
        async fn perform(&mut self, effect: Outbound) -> Result<(), TransportError> {
            let name = match effect {
                Outbound::Text { .. } => "text",
                Outbound::Table(_) => "table",
                Outbound::DeleteOrigin => "delete",
                Outbound::AnswerCallback => "answer",
            };
            self.performed.push(name);
            if self.failing.contains(&name) {
                return Err(TransportError::Invocation(format!("{name} failed")));
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_callback_is_answered_when_delete_fails() {
        let mut sink = RecordingSink {
            failing: vec!["delete"],
            ..RecordingSink::default()
        };
        let effects = vec![Outbound::DeleteOrigin, Outbound::text("welcome"), Outbound::AnswerCallback];

        let result = deliver(&mut sink, effects).await;

        assert_eq!(sink.performed, vec!["delete", "text", "answer"]);
        assert!(matches!(result, Err(TransportError::Invocation(msg)) if msg == "delete failed"));
    }

    #[tokio::test]
    async fn test_first_failure_is_reported() {
        let mut sink = RecordingSink {
            failing: vec!["text", "answer"],
            ..RecordingSink::default()
        };

        let result = deliver(&mut sink, vec![Outbound::text("a"), Outbound::AnswerCallback]).await;

        assert_eq!(sink.performed, vec!["text", "answer"]);
        assert!(matches!(result, Err(TransportError::Invocation(msg)) if msg == "text failed"));
    }

    #[tokio::test]
    async fn test_all_effects_succeed() {
        let mut sink = RecordingSink::default();
        assert!(deliver(&mut sink, vec![Outbound::text("a")]).await.is_ok());
        assert_eq!(sink.performed, vec!["text"]);
    }
}
