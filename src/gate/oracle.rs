//! Channel membership queries.
//!
//! The oracle asks the platform about every required channel at once and
//! never fails: errors and timeouts become [`ChannelStatus::CheckFailed`].

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::UserId;

/// A channel users must join, identified by its public handle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequiredChannel(String);

impl RequiredChannel {
    #[must_use]
    pub fn new(handle: impl Into<String>) -> Self {
        Self(handle.into())
    }

    /// The configured handle, e.g. `@news`.
    #[must_use]
    pub fn handle(&self) -> &str {
        &self.0
    }

    /// The handle without the leading `@`.
    #[must_use]
    pub fn username(&self) -> &str {
        self.0.trim_start_matches('@')
    }

    /// Public link that opens the channel.
    #[must_use]
    pub fn join_url(&self) -> String {
        format!("https://t.me/{}", self.username())
    }
}

impl fmt::Display for RequiredChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A user's role in a channel as reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberRole {
    Creator,
    Administrator,
    Member,
    Restricted,
    Left,
    Banned,
}

impl MemberRole {
    /// Only full members and channel staff count as subscribed.
    #[must_use]
    pub const fn is_subscribed(self) -> bool {
        matches!(self, Self::Creator | Self::Administrator | Self::Member)
    }
}

/// Errors a membership query can hit.
#[derive(Debug, Clone, Error)]
pub enum OracleError {
    #[error("channel not found: {0}")]
    UnknownChannel(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("transport error: {0}")]
    Transport(String),
}

/// Per-channel membership lookup provided by the transport.
#[async_trait]
pub trait ChatMemberSource: Send + Sync {
    async fn member_role(&self, channel: &RequiredChannel, user: UserId) -> Result<MemberRole, OracleError>;
}

/// Outcome of one channel check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelStatus {
    Subscribed,
    NotSubscribed,
    /// The check could not be completed; treated as not subscribed.
    CheckFailed(String),
}

impl ChannelStatus {
    #[must_use]
    pub const fn is_subscribed(&self) -> bool {
        matches!(self, Self::Subscribed)
    }
}

/// Membership results for one user, in required-channel order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SubscriptionVerdict {
    entries: Vec<(RequiredChannel, ChannelStatus)>,
}

impl SubscriptionVerdict {
    #[must_use]
    pub const fn new(entries: Vec<(RequiredChannel, ChannelStatus)>) -> Self {
        Self { entries }
    }

    /// True when every channel is [`ChannelStatus::Subscribed`].
    #[must_use]
    pub fn all_subscribed(&self) -> bool {
        self.entries.iter().all(|(_, status)| status.is_subscribed())
    }

    /// Channels the user still has to join, in order.
    pub fn unsubscribed(&self) -> impl Iterator<Item = &RequiredChannel> {
        self.entries
            .iter()
            .filter(|(_, status)| !status.is_subscribed())
            .map(|(channel, _)| channel)
    }

    #[must_use]
    pub fn status(&self, channel: &RequiredChannel) -> Option<&ChannelStatus> {
        self.entries
            .iter()
            .find(|(c, _)| c == channel)
            .map(|(_, status)| status)
    }

    pub fn entries(&self) -> &[(RequiredChannel, ChannelStatus)] {
        &self.entries
    }
}

/// Checks a user's membership in a set of channels.
#[derive(Clone)]
pub struct MembershipOracle {
    source: Arc<dyn ChatMemberSource>,
    timeout: Duration,
}

impl MembershipOracle {
    #[must_use]
    pub fn new(source: Arc<dyn ChatMemberSource>, timeout: Duration) -> Self {
        Self { source, timeout }
    }

    /// Queries every channel concurrently and waits for all answers.
    pub async fn check_membership(&self, user: UserId, channels: &[RequiredChannel]) -> SubscriptionVerdict {
        let checks = channels.iter().map(|channel| async move {
            let status = self.check_channel(user, channel).await;
            (channel.clone(), status)
        });

        SubscriptionVerdict::new(join_all(checks).await)
    }

    async fn check_channel(&self, user: UserId, channel: &RequiredChannel) -> ChannelStatus {
        match tokio::time::timeout(self.timeout, self.source.member_role(channel, user)).await {
            Ok(Ok(role)) => {
                debug!("User {} in {}: {:?}", user, channel, role);
                if role.is_subscribed() {
                    ChannelStatus::Subscribed
                } else {
                    ChannelStatus::NotSubscribed
                }
            }
            Ok(Err(e)) => {
                warn!("Membership check for {} in {} failed: {}", user, channel, e);
                ChannelStatus::CheckFailed(e.to_string())
            }
            Err(_) => {
                warn!(
                    "Membership check for {} in {} timed out after {:?}",
                    user, channel, self.timeout
                );
                ChannelStatus::CheckFailed("timed out".to_owned())
            }
        }
    }
}

impl fmt::Debug for MembershipOracle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MembershipOracle")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}
