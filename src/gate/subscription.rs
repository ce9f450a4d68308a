//! Admission decisions for the required-channel set.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::debug;

use super::oracle::{MembershipOracle, RequiredChannel, SubscriptionVerdict};
use crate::UserId;

/// Callback action carried by the "I subscribed" button.
pub const RECHECK_ACTION: &str = "check_subscription";

/// One line of the subscription prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptEntry {
    /// 1-based position among the channels still to join.
    pub index: usize,
    pub channel: RequiredChannel,
    pub join_url: String,
}

/// What a denied user is shown: channels to join and a re-check action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionPrompt {
    pub entries: Vec<PromptEntry>,
    pub recheck_action: &'static str,
}

impl SubscriptionPrompt {
    /// Builds the prompt from a verdict, `None` if nothing is missing.
    #[must_use]
    pub fn from_verdict(verdict: &SubscriptionVerdict) -> Option<Self> {
        let entries: Vec<PromptEntry> = verdict
            .unsubscribed()
            .enumerate()
            .map(|(i, channel)| PromptEntry {
                index: i + 1,
                channel: channel.clone(),
                join_url: channel.join_url(),
            })
            .collect();

        if entries.is_empty() {
            return None;
        }

        Some(Self {
            entries,
            recheck_action: RECHECK_ACTION,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Admitted,
    Denied(SubscriptionPrompt),
}

impl GateDecision {
    #[must_use]
    pub const fn is_admitted(&self) -> bool {
        matches!(self, Self::Admitted)
    }
}

/// Applies the membership requirement to a user.
///
/// Every call asks the oracle again. The last-admitted map is only kept
/// for diagnostics and never short-circuits a check.
#[derive(Debug)]
pub struct SubscriptionGate {
    oracle: MembershipOracle,
    channels: Vec<RequiredChannel>,

    /// One entry per currently admitted user; grows with the user base and
    /// shrinks only on denial.
    last_admitted: RwLock<HashMap<UserId, DateTime<Utc>>>,
}

impl SubscriptionGate {
    #[must_use]
    pub fn new(oracle: MembershipOracle, channels: Vec<RequiredChannel>) -> Self {
        Self {
            oracle,
            channels,
            last_admitted: RwLock::new(HashMap::new()),
        }
    }

    pub async fn evaluate(&self, user: UserId) -> GateDecision {
        let verdict = self.oracle.check_membership(user, &self.channels).await;

        match SubscriptionPrompt::from_verdict(&verdict) {
            None => {
                self.last_admitted.write().await.insert(user, Utc::now());
                debug!("User {} admitted", user);
                GateDecision::Admitted
            }
            Some(prompt) => {
                self.last_admitted.write().await.remove(&user);
                debug!("User {} denied, {} channel(s) missing", user, prompt.entries.len());
                GateDecision::Denied(prompt)
            }
        }
    }

    /// When the user last passed the gate, if they are currently cached.
    pub async fn last_admitted(&self, user: UserId) -> Option<DateTime<Utc>> {
        self.last_admitted.read().await.get(&user).copied()
    }
}
