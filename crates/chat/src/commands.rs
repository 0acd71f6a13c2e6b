use std::collections::BTreeMap;

use async_trait::async_trait;
use thiserror::Error;

use crate::gateway::{ChannelId, GuildId, UserId};
use crate::messages::{self, ReplyPayload};
use crate::setup::SetupRequest;

/// A slash-command invocation as delivered by the host framework, with
/// options already split into name/value pairs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlashCommand {
    pub name: String,
    pub options: BTreeMap<String, String>,
    pub guild: GuildId,
    pub channel: ChannelId,
    pub user: UserId,
    pub is_admin: bool,
    pub request_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BotCommand {
    Setup { nickname: String, team_number: u32 },
    ShowMap,
    UpdateMap { keyword: String, emoji: String },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandParseError {
    #[error("unsupported slash command: {0}")]
    UnsupportedCommand(String),
    #[error("`/{command}` requires option `{option}`")]
    MissingOption { command: String, option: &'static str },
    #[error("option `{option}` has invalid value `{value}`")]
    InvalidOption { option: &'static str, value: String },
}

pub fn parse_command(payload: &SlashCommand) -> Result<BotCommand, CommandParseError> {
    match payload.name.as_str() {
        "setup" => {
            let nickname = require_option(payload, "nickname")?;
            let raw_number = require_option(payload, "teamnumber")?;
            let team_number = raw_number.parse::<u32>().map_err(|_| {
                CommandParseError::InvalidOption { option: "teamnumber", value: raw_number }
            })?;
            Ok(BotCommand::Setup { nickname, team_number })
        }
        "showmap" => Ok(BotCommand::ShowMap),
        "updatemap" => {
            let keyword = require_option(payload, "keyword")?;
            let emoji = require_option(payload, "emoji")?;
            Ok(BotCommand::UpdateMap { keyword, emoji })
        }
        other => Err(CommandParseError::UnsupportedCommand(other.to_owned())),
    }
}

fn require_option(payload: &SlashCommand, option: &'static str) -> Result<String, CommandParseError> {
    payload
        .options
        .get(option)
        .filter(|value| !value.trim().is_empty())
        .cloned()
        .ok_or_else(|| CommandParseError::MissingOption { command: payload.name.clone(), option })
}

/// Map commands are admin-only; setup is open to everyone.
pub fn requires_admin(command: &BotCommand) -> bool {
    matches!(command, BotCommand::ShowMap | BotCommand::UpdateMap { .. })
}

#[derive(Debug, Error)]
pub enum CommandRouteError {
    #[error("command service failed: {0}")]
    Service(String),
}

/// What the ingress loop should do once a command is routed: nothing (the
/// service already drove its own replies) or send one payload back.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CommandReply {
    Handled,
    Respond(ReplyPayload),
}

#[async_trait]
pub trait BotCommandService: Send + Sync {
    /// Runs the whole interactive team-setup conversation.
    async fn setup(
        &self,
        request: SetupRequest,
        command: &SlashCommand,
    ) -> Result<(), CommandRouteError>;

    async fn show_map(&self, command: &SlashCommand) -> Result<ReplyPayload, CommandRouteError>;

    /// Applies one map edit, driving the two-phase reply itself.
    async fn update_map(
        &self,
        keyword: String,
        emoji: String,
        command: &SlashCommand,
    ) -> Result<(), CommandRouteError>;
}

pub struct CommandRouter<S> {
    service: S,
}

impl<S> CommandRouter<S>
where
    S: BotCommandService,
{
    pub fn new(service: S) -> Self {
        Self { service }
    }

    pub async fn route(&self, payload: SlashCommand) -> Result<CommandReply, CommandRouteError> {
        let command = match parse_command(&payload) {
            Ok(command) => command,
            Err(error) => {
                return Ok(CommandReply::Respond(messages::command_error(
                    &error.to_string(),
                    &payload.request_id,
                )))
            }
        };

        if requires_admin(&command) && !payload.is_admin {
            return Ok(CommandReply::Respond(messages::admin_denial()));
        }

        match command {
            BotCommand::Setup { nickname, team_number } => {
                let request = SetupRequest {
                    guild: payload.guild,
                    channel: payload.channel,
                    requester: payload.user,
                    nickname,
                    team_number,
                };
                self.service.setup(request, &payload).await?;
                Ok(CommandReply::Handled)
            }
            BotCommand::ShowMap => {
                Ok(CommandReply::Respond(self.service.show_map(&payload).await?))
            }
            BotCommand::UpdateMap { keyword, emoji } => {
                self.service.update_map(keyword, emoji, &payload).await?;
                Ok(CommandReply::Handled)
            }
        }
    }
}

/// Inert service used by the default runner and in router tests.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopBotCommandService;

#[async_trait]
impl BotCommandService for NoopBotCommandService {
    async fn setup(
        &self,
        _request: SetupRequest,
        _command: &SlashCommand,
    ) -> Result<(), CommandRouteError> {
        Ok(())
    }

    async fn show_map(&self, _command: &SlashCommand) -> Result<ReplyPayload, CommandRouteError> {
        Ok(messages::map_display("{}"))
    }

    async fn update_map(
        &self,
        _keyword: String,
        _emoji: String,
        _command: &SlashCommand,
    ) -> Result<(), CommandRouteError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::{
        parse_command, requires_admin, BotCommand, CommandParseError, CommandReply, CommandRouter,
        NoopBotCommandService, SlashCommand,
    };
    use crate::gateway::{ChannelId, GuildId, UserId};

    fn command(name: &str, options: &[(&str, &str)], is_admin: bool) -> SlashCommand {
        SlashCommand {
            name: name.to_owned(),
            options: options
                .iter()
                .map(|(key, value)| ((*key).to_owned(), (*value).to_owned()))
                .collect::<BTreeMap<_, _>>(),
            guild: GuildId(1),
            channel: ChannelId(2),
            user: UserId(3),
            is_admin,
            request_id: "req-1".to_owned(),
        }
    }

    #[test]
    fn parses_setup_with_both_options() {
        let parsed = parse_command(&command(
            "setup",
            &[("nickname", "Riley"), ("teamnumber", "254")],
            false,
        ))
        .expect("valid setup command");

        assert_eq!(
            parsed,
            BotCommand::Setup { nickname: "Riley".to_owned(), team_number: 254 }
        );
    }

    #[test]
    fn setup_requires_a_numeric_team_number() {
        let error = parse_command(&command(
            "setup",
            &[("nickname", "Riley"), ("teamnumber", "poofs")],
            false,
        ))
        .expect_err("non-numeric team number");

        assert!(matches!(error, CommandParseError::InvalidOption { option: "teamnumber", .. }));
    }

    #[test]
    fn missing_options_are_reported_by_name() {
        let error = parse_command(&command("updatemap", &[("keyword", "ship")], true))
            .expect_err("emoji missing");

        assert_eq!(
            error,
            CommandParseError::MissingOption { command: "updatemap".to_owned(), option: "emoji" }
        );
    }

    #[test]
    fn map_commands_are_admin_only() {
        assert!(requires_admin(&BotCommand::ShowMap));
        assert!(requires_admin(&BotCommand::UpdateMap {
            keyword: "ship".to_owned(),
            emoji: "🚢".to_owned()
        }));
        assert!(!requires_admin(&BotCommand::Setup {
            nickname: "Riley".to_owned(),
            team_number: 254
        }));
    }

    #[tokio::test]
    async fn router_denies_non_admin_map_commands() {
        let router = CommandRouter::new(NoopBotCommandService);
        let reply = router
            .route(command("showmap", &[], false))
            .await
            .expect("routing should not error");

        let CommandReply::Respond(payload) = reply else {
            panic!("denial should produce a reply payload");
        };
        assert!(payload.ephemeral);
        assert!(payload.content.contains("do not have permission"));
    }

    #[tokio::test]
    async fn router_passes_admin_map_commands_through() {
        let router = CommandRouter::new(NoopBotCommandService);
        let reply =
            router.route(command("showmap", &[], true)).await.expect("routing should not error");

        assert!(matches!(reply, CommandReply::Respond(payload) if payload.content.contains("json")));
    }

    #[tokio::test]
    async fn router_reports_unsupported_commands() {
        let router = CommandRouter::new(NoopBotCommandService);
        let reply =
            router.route(command("banish", &[], true)).await.expect("routing should not error");

        let CommandReply::Respond(payload) = reply else {
            panic!("unsupported command should produce a reply payload");
        };
        assert!(payload.content.contains("unsupported slash command"));
        assert!(payload.content.contains("req-1"));
    }
}
