use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use rosterbot_core::reaction_map::{
    render_for_display, MapPublisher, ReactionMapStore, UpdateOutcome,
};
use rosterbot_core::team::{resolve_team, TeamDirectory, TeamLookupError};

use crate::commands::{BotCommandService, CommandRouteError, SlashCommand};
use crate::gateway::{ChatGateway, GatewayError, RoleHandle};
use crate::messages;
use crate::provision::team_role_prefix;
use crate::runner::SessionRegistry;
use crate::setup::{display_nickname, SetupFlow, SetupRequest};

/// Production command service: wires the gateway, the metadata directory,
/// the reaction-map store, and the setup flow together.
#[derive(Clone)]
pub struct RosterService {
    gateway: Arc<dyn ChatGateway>,
    directory: Arc<dyn TeamDirectory>,
    store: Arc<ReactionMapStore>,
    publisher: Arc<dyn MapPublisher>,
    registry: Arc<SessionRegistry>,
    flow: SetupFlow,
}

impl RosterService {
    pub fn new(
        gateway: Arc<dyn ChatGateway>,
        directory: Arc<dyn TeamDirectory>,
        store: Arc<ReactionMapStore>,
        publisher: Arc<dyn MapPublisher>,
        registry: Arc<SessionRegistry>,
        flow: SetupFlow,
    ) -> Self {
        Self { gateway, directory, store, publisher, registry, flow }
    }

    /// Existing-team fast path: the role is reused, the requester joins it
    /// directly, and the reply lists whoever already holds it.
    async fn join_existing(
        &self,
        request: &SetupRequest,
        role: RoleHandle,
    ) -> Result<(), CommandRouteError> {
        info!(
            event_name = "setup.existing_role_reused",
            team_number = request.team_number,
            role = %role.name,
            user = %request.requester,
            "existing team role reused"
        );

        if let Err(error) =
            self.gateway.add_member_role(request.guild, request.requester, role.id).await
        {
            warn!(%error, "adding member to existing role failed");
            self.gateway
                .post_reply(
                    request.channel,
                    messages::ReplyPayload::text(
                        "There was an error adding you to the existing role.",
                    ),
                )
                .await
                .map_err(service_error)?;
            return Ok(());
        }

        let nickname = display_nickname(&request.nickname, request.team_number);
        if let Err(error) =
            self.gateway.set_nickname(request.guild, request.requester, &nickname).await
        {
            warn!(%error, "nickname change failed; continuing");
        }

        let mut teammates = match self.gateway.role_members(request.guild, role.id).await {
            Ok(members) => members,
            Err(error) => {
                warn!(%error, "listing role members failed; showing an empty roster");
                Vec::new()
            }
        };
        teammates.retain(|member| *member != request.requester);

        let payload = messages::roster(request.team_number, &role, request.requester, &teammates);
        self.gateway.post_reply(request.channel, payload).await.map_err(service_error)?;
        Ok(())
    }
}

fn service_error(error: GatewayError) -> CommandRouteError {
    CommandRouteError::Service(error.to_string())
}

#[async_trait]
impl BotCommandService for RosterService {
    async fn setup(
        &self,
        request: SetupRequest,
        _command: &SlashCommand,
    ) -> Result<(), CommandRouteError> {
        let prefix = team_role_prefix(request.team_number);
        match self.gateway.find_role_by_prefix(request.guild, &prefix).await {
            Ok(Some(role)) => return self.join_existing(&request, role).await,
            Ok(None) => {}
            Err(error) => return Err(service_error(error)),
        }

        let team = match resolve_team(self.directory.as_ref(), request.team_number).await {
            Ok(team) => team,
            Err(TeamLookupError::NotFound { team_number }) => {
                info!(
                    event_name = "setup.team_not_found",
                    team_number,
                    "team metadata or colors missing; no roles created"
                );
                self.gateway
                    .post_reply(request.channel, messages::team_not_found())
                    .await
                    .map_err(service_error)?;
                return Ok(());
            }
            Err(TeamLookupError::Directory(error)) => {
                return Err(CommandRouteError::Service(error.to_string()))
            }
        };

        let mut events = self.registry.begin(request.guild, request.requester).await;
        let result = self.flow.run(&request, &team, &mut events).await;
        self.registry.end(request.guild, request.requester).await;

        result.map(|_| ()).map_err(|error| CommandRouteError::Service(error.to_string()))
    }

    async fn show_map(&self, _command: &SlashCommand) -> Result<messages::ReplyPayload, CommandRouteError> {
        let map = self.store.load().await;
        Ok(messages::map_display(&render_for_display(&map)))
    }

    async fn update_map(
        &self,
        keyword: String,
        emoji: String,
        command: &SlashCommand,
    ) -> Result<(), CommandRouteError> {
        let reply = self
            .gateway
            .post_reply(command.channel, messages::map_updating(&keyword, &emoji))
            .await
            .map_err(service_error)?;

        let (payload, reaction) =
            match self.store.set(&keyword, &emoji, self.publisher.as_ref()).await {
                Ok(UpdateOutcome::Published) => {
                    info!(
                        event_name = "reaction_map.published",
                        %keyword,
                        %emoji,
                        "reaction map updated and pushed"
                    );
                    (messages::map_updated(&keyword, &emoji), "✅")
                }
                Ok(UpdateOutcome::SavedLocally { reason }) => {
                    warn!(%keyword, %reason, "reaction map saved locally only");
                    (messages::map_saved_locally(&keyword), "❌")
                }
                Err(error) => {
                    warn!(%keyword, %error, "reaction map update failed");
                    (messages::map_update_failed(), "❌")
                }
            };

        if let Err(error) = self.gateway.update_reply(command.channel, reply, payload).await {
            warn!(%error, "updating the map reply failed");
        }
        if let Err(error) = self.gateway.add_reaction(command.channel, reply, reaction).await {
            warn!(%error, "reacting to the map reply failed");
        }
        Ok(())
    }
}
