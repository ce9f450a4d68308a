//! Mandatory channel subscription check.

mod oracle;
mod subscription;

pub use oracle::{
    ChannelStatus, ChatMemberSource, MemberRole, MembershipOracle, OracleError, RequiredChannel,
    SubscriptionVerdict,
};
pub use subscription::{GateDecision, PromptEntry, RECHECK_ACTION, SubscriptionGate, SubscriptionPrompt};

#[cfg(test)]
pub(crate) use oracle::tests::FakeMembers;
