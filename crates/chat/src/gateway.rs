use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use thiserror::Error;

use rosterbot_core::color::Color;

use crate::messages::ReplyPayload;

macro_rules! id_type {
    ($name:ident) => {
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_type!(GuildId);
id_type!(ChannelId);
id_type!(MessageId);
id_type!(RoleId);
id_type!(UserId);

/// Snapshot of a role at creation time. The platform reports colorless
/// roles as zero.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoleHandle {
    pub id: RoleId,
    pub name: String,
    pub color: Color,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewRole {
    pub name: String,
    pub color: Option<Color>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("role operation failed: {0}")]
    Role(String),
    #[error("member operation denied: {0}")]
    PermissionDenied(String),
    #[error("member operation failed: {0}")]
    Member(String),
    #[error("message operation failed: {0}")]
    Message(String),
}

/// Chat-platform surface the bot drives. Everything the flow does to the
/// outside world goes through here, so tests can script it.
#[async_trait]
pub trait ChatGateway: Send + Sync {
    async fn create_role(&self, guild: GuildId, role: NewRole) -> Result<RoleHandle, GatewayError>;
    async fn delete_role(&self, guild: GuildId, role: RoleId) -> Result<(), GatewayError>;
    async fn set_role_color(
        &self,
        guild: GuildId,
        role: RoleId,
        color: Color,
    ) -> Result<(), GatewayError>;
    async fn find_role_by_prefix(
        &self,
        guild: GuildId,
        prefix: &str,
    ) -> Result<Option<RoleHandle>, GatewayError>;
    async fn role_members(&self, guild: GuildId, role: RoleId)
        -> Result<Vec<UserId>, GatewayError>;
    async fn add_member_role(
        &self,
        guild: GuildId,
        user: UserId,
        role: RoleId,
    ) -> Result<(), GatewayError>;
    async fn set_nickname(
        &self,
        guild: GuildId,
        user: UserId,
        nickname: &str,
    ) -> Result<(), GatewayError>;
    async fn post_reply(
        &self,
        channel: ChannelId,
        payload: ReplyPayload,
    ) -> Result<MessageId, GatewayError>;
    async fn update_reply(
        &self,
        channel: ChannelId,
        message: MessageId,
        payload: ReplyPayload,
    ) -> Result<(), GatewayError>;
    async fn delete_message(
        &self,
        channel: ChannelId,
        message: MessageId,
    ) -> Result<(), GatewayError>;
    async fn add_reaction(
        &self,
        channel: ChannelId,
        message: MessageId,
        emoji: &str,
    ) -> Result<(), GatewayError>;
}

/// Placeholder gateway used until a real platform transport is wired in.
/// Accepts everything and fabricates ids from a counter.
#[derive(Default)]
pub struct NoopChatGateway {
    next_id: AtomicU64,
}

impl NoopChatGateway {
    fn next(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed) + 1
    }
}

#[async_trait]
impl ChatGateway for NoopChatGateway {
    async fn create_role(&self, _guild: GuildId, role: NewRole) -> Result<RoleHandle, GatewayError> {
        Ok(RoleHandle {
            id: RoleId(self.next()),
            name: role.name,
            color: role.color.unwrap_or(Color::from_rgb(0)),
        })
    }

    async fn delete_role(&self, _guild: GuildId, _role: RoleId) -> Result<(), GatewayError> {
        Ok(())
    }

    async fn set_role_color(
        &self,
        _guild: GuildId,
        _role: RoleId,
        _color: Color,
    ) -> Result<(), GatewayError> {
        Ok(())
    }

    async fn find_role_by_prefix(
        &self,
        _guild: GuildId,
        _prefix: &str,
    ) -> Result<Option<RoleHandle>, GatewayError> {
        Ok(None)
    }

    async fn role_members(
        &self,
        _guild: GuildId,
        _role: RoleId,
    ) -> Result<Vec<UserId>, GatewayError> {
        Ok(Vec::new())
    }

    async fn add_member_role(
        &self,
        _guild: GuildId,
        _user: UserId,
        _role: RoleId,
    ) -> Result<(), GatewayError> {
        Ok(())
    }

    async fn set_nickname(
        &self,
        _guild: GuildId,
        _user: UserId,
        _nickname: &str,
    ) -> Result<(), GatewayError> {
        Ok(())
    }

    async fn post_reply(
        &self,
        _channel: ChannelId,
        _payload: ReplyPayload,
    ) -> Result<MessageId, GatewayError> {
        Ok(MessageId(self.next()))
    }

    async fn update_reply(
        &self,
        _channel: ChannelId,
        _message: MessageId,
        _payload: ReplyPayload,
    ) -> Result<(), GatewayError> {
        Ok(())
    }

    async fn delete_message(
        &self,
        _channel: ChannelId,
        _message: MessageId,
    ) -> Result<(), GatewayError> {
        Ok(())
    }

    async fn add_reaction(
        &self,
        _channel: ChannelId,
        _message: MessageId,
        _emoji: &str,
    ) -> Result<(), GatewayError> {
        Ok(())
    }
}
