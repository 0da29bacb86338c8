//! Telegram adapter (teloxide).
//!
//! Implements the `gib-core` directory and membership ports over the Bot
//! API, and hosts the command/callback/inline handlers plus the polling
//! router.
//!
//! The Bot API cannot serve everything the directory port models: message
//! history and plain participant listings need a user client (MTProto).
//! Those methods degrade honestly: `oldest_message` reports no message, so
//! the id-era heuristic carries the creation estimate, and the admin
//! fallback listing fails into an empty list.

use async_trait::async_trait;

use teloxide::{prelude::*, types::Recipient};

pub mod handlers;
pub mod router;

use gib_core::{
    domain::{NormalizedRef, UserId},
    ports::{ChatMembership, Directory, Entity, FullProfile, MessageStamp, Participant},
    Error, Result,
};

#[derive(Clone)]
pub struct TelegramDirectory {
    bot: Bot,
}

impl TelegramDirectory {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    fn map_err(e: teloxide::RequestError) -> Error {
        Error::External(format!("telegram error: {e}"))
    }

    fn recipient(reference: &NormalizedRef) -> Result<Recipient> {
        match reference {
            NormalizedRef::Numeric(id) => Ok(Recipient::Id(teloxide::types::ChatId(*id))),
            NormalizedRef::Handle(handle) => Ok(Recipient::ChannelUsername(handle.clone())),
            NormalizedRef::Invite(_) => Err(Error::External(
                "invite links need a user-client directory".to_string(),
            )),
            NormalizedRef::Raw(text) if text.starts_with('@') => {
                Ok(Recipient::ChannelUsername(text.clone()))
            }
            NormalizedRef::Raw(_) => Err(Error::External("unrecognized reference".to_string())),
        }
    }

    fn entity_recipient(entity: &Entity) -> Recipient {
        Recipient::Id(teloxide::types::ChatId(entity.id))
    }
}

#[async_trait]
impl Directory for TelegramDirectory {
    async fn lookup(&self, reference: &NormalizedRef) -> Result<Entity> {
        let chat = self
            .bot
            .get_chat(Self::recipient(reference)?)
            .await
            .map_err(Self::map_err)?;

        Ok(Entity {
            id: chat.id.0,
            title: chat.title().map(str::to_string),
            channel_like: chat.is_channel() || chat.is_supergroup(),
            broadcast: chat.is_channel(),
            // The Bot API chat object carries no participant count; the
            // extended profile request fills it in.
            member_count: None,
        })
    }

    async fn full_profile(&self, entity: &Entity) -> Result<FullProfile> {
        let count = self
            .bot
            .get_chat_member_count(Self::entity_recipient(entity))
            .await
            .map_err(Self::map_err)?;
        Ok(FullProfile {
            member_count: Some(count as i64),
        })
    }

    async fn oldest_message(&self, _entity: &Entity) -> Result<Option<MessageStamp>> {
        // History iteration is MTProto-only.
        Ok(None)
    }

    async fn list_admins(&self, entity: &Entity) -> Result<Vec<Participant>> {
        let members = self
            .bot
            .get_chat_administrators(Self::entity_recipient(entity))
            .await
            .map_err(Self::map_err)?;

        Ok(members
            .into_iter()
            .map(|m| Participant {
                id: m.user.id.0 as i64,
                first_name: Some(m.user.first_name.clone()),
                last_name: m.user.last_name.clone(),
                username: m.user.username.clone(),
                is_bot: m.user.is_bot,
            })
            .collect())
    }

    async fn list_participants(&self, _entity: &Entity, _limit: usize) -> Result<Vec<Participant>> {
        Err(Error::External(
            "participant listing needs a user-client directory".to_string(),
        ))
    }
}

/// Membership gate over `getChatMember`.
#[derive(Clone)]
pub struct TelegramGate {
    bot: Bot,
}

impl TelegramGate {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl ChatMembership for TelegramGate {
    async fn is_member(&self, channel: &str, user: UserId) -> bool {
        let member = self
            .bot
            .get_chat_member(
                Recipient::ChannelUsername(channel.to_string()),
                teloxide::types::UserId(user.0 as u64),
            )
            .await;
        match member {
            Ok(m) => m.is_owner() || m.is_administrator() || m.is_member(),
            Err(_) => false, // treat lookup failure as not joined
        }
    }
}
