//! Hand-off point for the promotional broadcast feature.

use async_trait::async_trait;
use tracing::info;

use crate::UserProfile;
use crate::commands::{Outbound, messages};

/// Starts a broadcast conversation for a user.
///
/// Implementations decide who may broadcast and own the whole flow after
/// the first reply.
#[async_trait]
pub trait BroadcastDelegate: Send + Sync {
    async fn start(&self, user: &UserProfile) -> Vec<Outbound>;
}

/// Delegate used when no broadcast feature is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledBroadcast;

#[async_trait]
impl BroadcastDelegate for DisabledBroadcast {
    async fn start(&self, user: &UserProfile) -> Vec<Outbound> {
        info!("Broadcast requested by {} but the feature is disabled", user.id);
        vec![Outbound::text(messages::BROADCAST_DISABLED)]
    }
}
