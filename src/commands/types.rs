//! Inbound events and outbound effects.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::UserProfile;
use crate::render::RenderedTable;

/// Admin panel button labels.
pub const PANEL_UPLOAD: &str = "📤 Upload file";
pub const PANEL_DELETE: &str = "🗑️ Delete file";
pub const PANEL_USER_COUNT: &str = "👥 User count";
pub const PANEL_STATUS: &str = "📄 Dataset status";

/// Label and command that hand over to the broadcast feature.
pub const PANEL_PROMO: &str = "📣 Promo";
pub const PROMO_COMMAND: &str = "/promo";

/// Operations of the admin control surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminCommand {
    /// Show the admin keyboard.
    OpenPanel,

    /// Explain how to upload a dataset.
    Upload,

    /// Remove the active dataset.
    Delete,

    /// Report the number of registered users.
    UserCount,

    /// Describe the active dataset.
    Status,
}

impl AdminCommand {
    /// Parses a slash command or panel button label.
    ///
    /// Returns `None` if the text is not an admin command.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();

        match text {
            PANEL_UPLOAD => return Some(Self::Upload),
            PANEL_DELETE => return Some(Self::Delete),
            PANEL_USER_COUNT => return Some(Self::UserCount),
            PANEL_STATUS => return Some(Self::Status),
            _ => {}
        }

        let command = slash_command(text)?;
        match command.as_str() {
            "admin_panel" | "admin" => Some(Self::OpenPanel),
            "upload" => Some(Self::Upload),
            "delete" => Some(Self::Delete),
            "user_count" | "users" => Some(Self::UserCount),
            "dataset_status" => Some(Self::Status),
            _ => None,
        }
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::OpenPanel => "open_panel",
            Self::Upload => "upload",
            Self::Delete => "delete",
            Self::UserCount => "user_count",
            Self::Status => "status",
        }
    }
}

impl fmt::Display for AdminCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Extracts the lowercased command name from `/name@bot args`.
fn slash_command(text: &str) -> Option<String> {
    let rest = text.strip_prefix('/')?;
    let word = rest.split_whitespace().next()?;
    let name = word.split('@').next().unwrap_or(word);
    Some(name.to_lowercase())
}

/// True for text that hands the conversation to the broadcast feature.
#[must_use]
pub fn is_broadcast_trigger(text: &str) -> bool {
    let text = text.trim();
    text == PANEL_PROMO || slash_command(text).is_some_and(|c| c == &PROMO_COMMAND[1..])
}

/// True for a non-empty run of ASCII digits after trimming.
#[must_use]
pub fn is_identifier(text: &str) -> bool {
    let text = text.trim();
    !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit())
}

/// Failure to download a document.
#[derive(Debug, Clone, Error)]
#[error("download failed: {0}")]
pub struct FetchError(pub String);

/// Lazily downloads a document's content.
#[async_trait]
pub trait DocumentFetcher: Send + Sync {
    async fn fetch(&self) -> Result<Vec<u8>, FetchError>;
}

/// A document attached to an inbound message.
///
/// The content is fetched only when a handler asks for it.
#[derive(Clone)]
pub struct IncomingDocument {
    pub file_name: String,

    /// Size reported by the platform, if known.
    pub size: Option<u64>,

    fetcher: Arc<dyn DocumentFetcher>,
}

impl IncomingDocument {
    #[must_use]
    pub fn new(file_name: impl Into<String>, size: Option<u64>, fetcher: Arc<dyn DocumentFetcher>) -> Self {
        Self {
            file_name: file_name.into(),
            size,
            fetcher,
        }
    }

    /// A document whose content is already in memory.
    #[must_use]
    pub fn from_bytes(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let size = u64::try_from(bytes.len()).ok();
        Self::new(file_name, size, Arc::new(InMemory(bytes)))
    }

    /// Downloads the document content.
    ///
    /// # Errors
    ///
    /// Returns an error if the download fails.
    pub async fn fetch(&self) -> Result<Vec<u8>, FetchError> {
        self.fetcher.fetch().await
    }
}

impl fmt::Debug for IncomingDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IncomingDocument")
            .field("file_name", &self.file_name)
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}

struct InMemory(Vec<u8>);

#[async_trait]
impl DocumentFetcher for InMemory {
    async fn fetch(&self) -> Result<Vec<u8>, FetchError> {
        Ok(self.0.clone())
    }
}

/// Everything the bot reacts to.
#[derive(Debug, Clone)]
pub enum InboundEvent {
    Start(UserProfile),
    Text { user: UserProfile, text: String },
    Callback { user: UserProfile, action: String },
    Document { user: UserProfile, document: IncomingDocument },
    AdminCommand { user: UserProfile, command: AdminCommand },
}

impl InboundEvent {
    /// Classifies a plain text message.
    #[must_use]
    pub fn from_text(user: UserProfile, text: impl Into<String>) -> Self {
        let text = text.into();
        if slash_command(text.trim()).is_some_and(|c| c == "start") {
            return Self::Start(user);
        }
        match AdminCommand::parse(&text) {
            Some(command) => Self::AdminCommand { user, command },
            None => Self::Text { user, text },
        }
    }

    #[must_use]
    pub const fn user(&self) -> &UserProfile {
        match self {
            Self::Start(user)
            | Self::Text { user, .. }
            | Self::Callback { user, .. }
            | Self::Document { user, .. }
            | Self::AdminCommand { user, .. } => user,
        }
    }

    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Start(_) => "start",
            Self::Text { .. } => "text",
            Self::Callback { .. } => "callback",
            Self::Document { .. } => "document",
            Self::AdminCommand { .. } => "admin_command",
        }
    }
}

/// An inline keyboard button.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Button {
    Url { text: String, url: String },
    Callback { text: String, data: String },
}

/// Keyboard attached to a text reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Markup {
    /// Buttons under the message, one row per inner vector.
    Inline(Vec<Vec<Button>>),

    /// Persistent reply keyboard made of text labels.
    ReplyKeyboard(Vec<Vec<String>>),
}

/// Effects a handler asks the transport to perform, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// HTML text, optionally with a keyboard.
    Text { text: String, markup: Option<Markup> },

    /// A rendered lookup result.
    Table(RenderedTable),

    /// Delete the message that carried the callback.
    DeleteOrigin,

    /// Acknowledge the callback query.
    AnswerCallback,
}

impl Outbound {
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text {
            text: text.into(),
            markup: None,
        }
    }

    #[must_use]
    pub fn with_markup(text: impl Into<String>, markup: Markup) -> Self {
        Self::Text {
            text: text.into(),
            markup: Some(markup),
        }
    }

    /// The text body, for text replies.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text, .. } => Some(text),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::UserId;

    fn ann() -> UserProfile {
        UserProfile::new(UserId(1), "Ann")
    }

    #[test]
    fn test_parse_slash_commands() {
        assert_eq!(AdminCommand::parse("/admin_panel"), Some(AdminCommand::OpenPanel));
        assert_eq!(AdminCommand::parse("/upload"), Some(AdminCommand::Upload));
        assert_eq!(AdminCommand::parse("/delete"), Some(AdminCommand::Delete));
        assert_eq!(AdminCommand::parse("/user_count"), Some(AdminCommand::UserCount));
        assert_eq!(AdminCommand::parse("/dataset_status"), Some(AdminCommand::Status));
    }

    #[test]
    fn test_parse_panel_labels() {
        assert_eq!(AdminCommand::parse(PANEL_UPLOAD), Some(AdminCommand::Upload));
        assert_eq!(AdminCommand::parse(PANEL_DELETE), Some(AdminCommand::Delete));
        assert_eq!(AdminCommand::parse(PANEL_USER_COUNT), Some(AdminCommand::UserCount));
        assert_eq!(AdminCommand::parse(PANEL_STATUS), Some(AdminCommand::Status));
    }

    #[test]
    fn test_parse_with_bot_suffix_and_case() {
        assert_eq!(AdminCommand::parse("/Admin_Panel@lookup_bot"), Some(AdminCommand::OpenPanel));
        assert_eq!(AdminCommand::parse("  /upload now "), Some(AdminCommand::Upload));
    }

    #[test]
    fn test_parse_rejects_other_text() {
        assert_eq!(AdminCommand::parse("upload"), None);
        assert_eq!(AdminCommand::parse("/start"), None);
        assert_eq!(AdminCommand::parse("12345"), None);
        assert_eq!(AdminCommand::parse("/"), None);
    }

    #[test]
    fn test_is_identifier() {
        assert!(is_identifier("12345"));
        assert!(is_identifier("  007 "));
        assert!(!is_identifier(""));
        assert!(!is_identifier("   "));
        assert!(!is_identifier("12a"));
        assert!(!is_identifier("-5"));
        assert!(!is_identifier("١٢"));
    }

    #[test]
    fn test_broadcast_trigger() {
        assert!(is_broadcast_trigger("/promo"));
        assert!(is_broadcast_trigger("/promo@lookup_bot"));
        assert!(is_broadcast_trigger(PANEL_PROMO));
        assert!(!is_broadcast_trigger("/promotion"));
        assert!(!is_broadcast_trigger("promo"));
    }

    #[test]
    fn test_from_text_classifies() {
        assert!(matches!(InboundEvent::from_text(ann(), "/start"), InboundEvent::Start(_)));
        assert!(matches!(
            InboundEvent::from_text(ann(), "/start payload"),
            InboundEvent::Start(_)
        ));
        assert!(matches!(
            InboundEvent::from_text(ann(), PANEL_DELETE),
            InboundEvent::AdminCommand {
                command: AdminCommand::Delete,
                ..
            }
        ));
        assert!(matches!(InboundEvent::from_text(ann(), "42"), InboundEvent::Text { .. }));
    }

    #[tokio::test]
    async fn test_in_memory_document() {
        let doc = IncomingDocument::from_bytes("a.xlsx", vec![1, 2, 3]);
        assert_eq!(doc.size, Some(3));
        assert_eq!(doc.fetch().await.unwrap(), vec![1, 2, 3]);
    }
}
