//! Event dispatch.
//!
//! Every inbound event goes through one ordered route table. The first
//! matching rule wins; the last rule matches everything.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::messages;
use super::types::{AdminCommand, InboundEvent, IncomingDocument, Outbound, is_broadcast_trigger, is_identifier};
use crate::broadcast::BroadcastDelegate;
use crate::config::BotSettings;
use crate::dataset::{DatasetStore, LookupError};
use crate::gate::{GateDecision, RECHECK_ACTION, SubscriptionGate};
use crate::registry::UserRegistry;
use crate::render::TableRenderer;
use crate::{UserId, UserProfile};

/// Handler selected for an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Admin,
    Upload,
    Broadcast,
    Recheck,
    Start,
    Lookup,
    Fallback,
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Admin => "admin",
            Self::Upload => "upload",
            Self::Broadcast => "broadcast",
            Self::Recheck => "recheck",
            Self::Start => "start",
            Self::Lookup => "lookup",
            Self::Fallback => "fallback",
        };
        f.write_str(name)
    }
}

struct RouteRule {
    route: Route,
    matches: fn(&InboundEvent) -> bool,
}

/// Ordered routes; admin and upload routes bypass the subscription gate.
const ROUTES: &[RouteRule] = &[
    RouteRule {
        route: Route::Admin,
        matches: is_admin_command,
    },
    RouteRule {
        route: Route::Upload,
        matches: is_document,
    },
    RouteRule {
        route: Route::Broadcast,
        matches: is_broadcast,
    },
    RouteRule {
        route: Route::Recheck,
        matches: is_recheck,
    },
    RouteRule {
        route: Route::Start,
        matches: is_start,
    },
    RouteRule {
        route: Route::Lookup,
        matches: is_lookup,
    },
    RouteRule {
        route: Route::Fallback,
        matches: always,
    },
];

fn is_admin_command(event: &InboundEvent) -> bool {
    matches!(event, InboundEvent::AdminCommand { .. })
}

fn is_document(event: &InboundEvent) -> bool {
    matches!(event, InboundEvent::Document { .. })
}

fn is_broadcast(event: &InboundEvent) -> bool {
    matches!(event, InboundEvent::Text { text, .. } if is_broadcast_trigger(text))
}

fn is_recheck(event: &InboundEvent) -> bool {
    matches!(event, InboundEvent::Callback { action, .. } if action == RECHECK_ACTION)
}

fn is_start(event: &InboundEvent) -> bool {
    matches!(event, InboundEvent::Start(_))
}

fn is_lookup(event: &InboundEvent) -> bool {
    matches!(event, InboundEvent::Text { text, .. } if is_identifier(text))
}

const fn always(_: &InboundEvent) -> bool {
    true
}

/// Picks the route for an event.
#[must_use]
pub fn route_for(event: &InboundEvent) -> Route {
    ROUTES
        .iter()
        .find(|rule| (rule.matches)(event))
        .map_or(Route::Fallback, |rule| rule.route)
}

/// Routes inbound events to the gate, the dataset and the admin surface.
pub struct Dispatcher {
    settings: Arc<BotSettings>,
    gate: Arc<SubscriptionGate>,
    store: Arc<DatasetStore>,
    registry: Arc<dyn UserRegistry>,
    renderer: Arc<dyn TableRenderer>,
    broadcast: Arc<dyn BroadcastDelegate>,
}

impl Dispatcher {
    /// Creates a new dispatcher.
    #[must_use]
    pub fn new(
        settings: Arc<BotSettings>,
        gate: Arc<SubscriptionGate>,
        store: Arc<DatasetStore>,
        registry: Arc<dyn UserRegistry>,
        renderer: Arc<dyn TableRenderer>,
        broadcast: Arc<dyn BroadcastDelegate>,
    ) -> Self {
        Self {
            settings,
            gate,
            store,
            registry,
            renderer,
            broadcast,
        }
    }

    /// Handles one event and returns the effects to perform, in order.
    pub async fn dispatch(&self, event: InboundEvent) -> Vec<Outbound> {
        let route = route_for(&event);
        debug!("Dispatching {} from {} to {}", event.kind(), event.user().id, route);

        match (route, event) {
            (Route::Admin, InboundEvent::AdminCommand { user, command }) => {
                self.handle_admin(&user, command).await
            }
            (Route::Upload, InboundEvent::Document { user, document }) => {
                self.handle_document(&user, &document).await
            }
            (Route::Broadcast, event) => self.broadcast.start(event.user()).await,
            (Route::Recheck, event) => self.handle_recheck(event.user().id).await,
            (Route::Start, event) => self.handle_start(event.user()).await,
            (Route::Lookup, InboundEvent::Text { user, text }) => self.handle_lookup(user.id, &text).await,
            (_, event) => self.handle_fallback(&event).await,
        }
    }

    /// Runs the gate; on denial returns the prompt to send instead.
    async fn admit(&self, user: UserId) -> Result<(), Vec<Outbound>> {
        match self.gate.evaluate(user).await {
            GateDecision::Admitted => Ok(()),
            GateDecision::Denied(prompt) => Err(vec![messages::subscription_prompt(&prompt, false)]),
        }
    }

    async fn handle_start(&self, user: &UserProfile) -> Vec<Outbound> {
        if let Err(prompt) = self.admit(user.id).await {
            return prompt;
        }

        match self.registry.register_if_absent(user).await {
            Ok(true) => info!("Registered new user {} ({})", user.id, user.display_name),
            Ok(false) => {}
            Err(e) => warn!("Failed to register user {}: {}", user.id, e),
        }

        vec![Outbound::text(messages::GREETING)]
    }

    async fn handle_recheck(&self, user: UserId) -> Vec<Outbound> {
        let reply = match self.gate.evaluate(user).await {
            GateDecision::Admitted => Outbound::text(messages::ALL_SUBSCRIBED),
            GateDecision::Denied(prompt) => messages::subscription_prompt(&prompt, true),
        };
        vec![Outbound::DeleteOrigin, reply, Outbound::AnswerCallback]
    }

    async fn handle_lookup(&self, user: UserId, text: &str) -> Vec<Outbound> {
        if let Err(prompt) = self.admit(user).await {
            return prompt;
        }

        let id = text.trim();
        let records = match self.store.lookup(id).await {
            Ok(records) => records,
            Err(LookupError::NoDatasetLoaded) => {
                return vec![Outbound::text(messages::no_data_yet(&self.settings.admin_contact))];
            }
        };

        if records.is_empty() {
            debug!("No records for ID {} (user {})", id, user);
            return vec![Outbound::text(messages::not_found(id))];
        }

        match self.renderer.render(id, &records) {
            Ok(table) => vec![Outbound::Table(table)],
            Err(e) => {
                warn!("Failed to render {} record(s) for ID {}: {}", records.len(), id, e);
                vec![Outbound::text(messages::RENDER_FAILED)]
            }
        }
    }

    async fn handle_fallback(&self, event: &InboundEvent) -> Vec<Outbound> {
        // Unknown callbacks only need acknowledging.
        if matches!(event, InboundEvent::Callback { .. }) {
            return vec![Outbound::AnswerCallback];
        }

        if let Err(prompt) = self.admit(event.user().id).await {
            return prompt;
        }
        vec![Outbound::text(messages::INVALID_INPUT)]
    }

    async fn handle_admin(&self, user: &UserProfile, command: AdminCommand) -> Vec<Outbound> {
        if !self.settings.is_admin(user.id) {
            warn!("User {} tried admin command '{}'", user.id, command);
            return vec![Outbound::text(messages::NOT_ADMIN)];
        }

        info!("Admin {} ran '{}'", user.id, command);
        let reply = match command {
            AdminCommand::OpenPanel => return vec![messages::admin_panel()],
            AdminCommand::Upload => messages::upload_instructions(&self.settings.upload_extension),
            AdminCommand::Delete => self.handle_delete().await,
            AdminCommand::UserCount => self.handle_user_count().await,
            AdminCommand::Status => self.handle_status().await,
        };
        vec![Outbound::text(reply)]
    }

    async fn handle_delete(&self) -> String {
        if self.store.clear().await {
            messages::FILE_DELETED.to_owned()
        } else {
            messages::NOTHING_TO_DELETE.to_owned()
        }
    }

    async fn handle_user_count(&self) -> String {
        match self.registry.count_users().await {
            Ok(count) => messages::user_count(count),
            Err(e) => {
                warn!("Failed to count users: {}", e);
                messages::COUNT_FAILED.to_owned()
            }
        }
    }

    async fn handle_status(&self) -> String {
        match self.store.snapshot().await {
            Some(dataset) => messages::dataset_status(&dataset.file_name, dataset.len(), dataset.loaded_at),
            None => messages::NO_DATASET.to_owned(),
        }
    }

    async fn handle_document(&self, user: &UserProfile, document: &IncomingDocument) -> Vec<Outbound> {
        vec![Outbound::text(self.accept_upload(user, document).await)]
    }

    /// Validates, downloads and installs an uploaded dataset.
    async fn accept_upload(&self, user: &UserProfile, document: &IncomingDocument) -> String {
        if !self.settings.is_admin(user.id) {
            warn!("User {} tried to upload '{}'", user.id, document.file_name);
            return messages::ADMINS_ONLY_UPLOAD.to_owned();
        }

        if !self.settings.accepts_file_name(&document.file_name) {
            return messages::wrong_extension(&self.settings.upload_extension);
        }

        let limit = self.settings.max_upload_bytes;
        if document.size.is_some_and(|size| size > limit) {
            return messages::too_large(limit);
        }

        let bytes = match document.fetch().await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Failed to download '{}': {}", document.file_name, e);
                return messages::download_failed(&e.to_string());
            }
        };
        if u64::try_from(bytes.len()).map_or(true, |len| len > limit) {
            return messages::too_large(limit);
        }

        match self.store.load_upload(&document.file_name, &bytes).await {
            Ok(summary) => {
                info!(
                    "Admin {} uploaded '{}' ({} records)",
                    user.id, summary.file_name, summary.record_count
                );
                messages::upload_succeeded(&summary)
            }
            Err(e) => {
                warn!("Rejected upload '{}': {}", document.file_name, e);
                messages::upload_failed(&e.to_string())
            }
        }
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("gate", &self.gate)
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}
