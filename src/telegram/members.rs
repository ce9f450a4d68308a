//! Channel membership queries over raw `MTProto` calls.

use async_trait::async_trait;
use grammers_tl_types as tl;
use tracing::debug;

use super::client::TelegramBot;
use crate::UserId;
use crate::gate::{ChatMemberSource, MemberRole, OracleError, RequiredChannel};

impl TelegramBot {
    /// Resolves a channel handle once and caches the result.
    async fn resolve_channel(&self, channel: &RequiredChannel) -> Result<tl::enums::InputChannel, OracleError> {
        if let Some(resolved) = self.channels.read().await.get(channel.handle()) {
            return Ok(resolved.clone());
        }

        let request = tl::functions::contacts::ResolveUsername {
            username: channel.username().to_owned(),
            referer: None,
        };
        let tl::enums::contacts::ResolvedPeer::Peer(resolved) = self
            .client
            .invoke(&request)
            .await
            .map_err(|e| classify_error(&e.to_string()))?;

        let input = resolved
            .chats
            .into_iter()
            .find_map(|chat| match chat {
                tl::enums::Chat::Channel(c) => Some(tl::enums::InputChannel::Channel(tl::types::InputChannel {
                    channel_id: c.id,
                    access_hash: c.access_hash.unwrap_or(0),
                })),
                _ => None,
            })
            .ok_or_else(|| OracleError::UnknownChannel(channel.to_string()))?;

        debug!("Resolved channel {}", channel);
        self.channels
            .write()
            .await
            .insert(channel.handle().to_owned(), input.clone());
        Ok(input)
    }
}

#[async_trait]
impl ChatMemberSource for TelegramBot {
    async fn member_role(&self, channel: &RequiredChannel, user: UserId) -> Result<MemberRole, OracleError> {
        let input_channel = self.resolve_channel(channel).await?;
        let access_hash = self.known_users.read().await.get(&user.0).copied().unwrap_or(0);

        let request = tl::functions::channels::GetParticipant {
            channel: input_channel,
            participant: tl::enums::InputPeer::User(tl::types::InputPeerUser {
                user_id: user.0,
                access_hash,
            }),
        };

        match self.client.invoke(&request).await {
            Ok(tl::enums::channels::ChannelParticipant::Participant(result)) => Ok(role_of(&result.participant)),
            Err(e) => {
                let message = e.to_string();
                if is_not_participant(&message) {
                    Ok(MemberRole::Left)
                } else {
                    Err(classify_error(&message))
                }
            }
        }
    }
}

fn role_of(participant: &tl::enums::ChannelParticipant) -> MemberRole {
    use tl::enums::ChannelParticipant as P;

    match participant {
        P::Creator(_) => MemberRole::Creator,
        P::Admin(_) => MemberRole::Administrator,
        P::Participant(_) | P::ParticipantSelf(_) => MemberRole::Member,
        P::Left(_) => MemberRole::Left,
        P::Banned(banned) => {
            let tl::enums::ChatBannedRights::Rights(rights) = &banned.banned_rights;
            if banned.left {
                MemberRole::Left
            } else if rights.view_messages {
                MemberRole::Banned
            } else {
                MemberRole::Restricted
            }
        }
    }
}

/// A user who never joined (or left) is reported as an error by Telegram.
fn is_not_participant(message: &str) -> bool {
    message.contains("USER_NOT_PARTICIPANT")
}

/// Maps an RPC error message to an oracle error.
fn classify_error(message: &str) -> OracleError {
    const UNKNOWN: &[&str] = &["USERNAME_NOT_OCCUPIED", "USERNAME_INVALID", "CHANNEL_INVALID"];
    const FORBIDDEN: &[&str] = &["CHAT_ADMIN_REQUIRED", "CHANNEL_PRIVATE", "USER_ID_INVALID"];

    let has = |codes: &[&str]| codes.iter().any(|code| message.contains(code));

    if has(UNKNOWN) {
        OracleError::UnknownChannel(message.to_owned())
    } else if has(FORBIDDEN) {
        OracleError::PermissionDenied(message.to_owned())
    } else {
        OracleError::Transport(message.to_owned())
    }
}
