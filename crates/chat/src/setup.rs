use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use rosterbot_core::color::{find_hex_token, Color};
use rosterbot_core::team::TeamIdentity;

use crate::events::{SessionEvents, WaitError};
use crate::gateway::{ChannelId, ChatGateway, GatewayError, GuildId, MessageId, RoleId, UserId};
use crate::messages;
use crate::provision::{provision_roles, ProvisionError, RoleSet};

/// Windows for the interactive waits and the lifetime of terminal notices.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FlowTimings {
    pub selection_window: Duration,
    pub message_window: Duration,
    pub notice_ttl: Duration,
}

impl Default for FlowTimings {
    fn default() -> Self {
        Self {
            selection_window: Duration::from_secs(120),
            message_window: Duration::from_secs(120),
            notice_ttl: Duration::from_secs(10),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SetupRequest {
    pub guild: GuildId,
    pub channel: ChannelId,
    pub requester: UserId,
    pub nickname: String,
    pub team_number: u32,
}

/// Terminal outcome of one setup session. Exactly one occurs per session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SetupOutcome {
    ColorCommitted { color: Color },
    Cancelled,
    Failed,
}

/// Errors raised before the choice prompt is presented. Everything after
/// presentation folds into the `Failed` outcome instead.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error(transparent)]
    Provision(#[from] ProvisionError),
    #[error("presenting the setup prompt failed: {0}")]
    Present(#[from] GatewayError),
}

#[derive(Debug, Error)]
enum FlowFault {
    #[error(transparent)]
    Wait(#[from] WaitError),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Slot {
    Team,
    Primary,
    Secondary,
}

/// Which roles still exist. A slot is taken the moment an outcome decides
/// to delete it, so no later path can touch that role again.
struct LiveRoles {
    team: Option<(RoleId, String)>,
    primary: Option<(RoleId, String)>,
    secondary: Option<(RoleId, String)>,
}

impl LiveRoles {
    fn new(roles: &RoleSet) -> Self {
        Self {
            team: Some((roles.team_role.id, roles.team_role.name.clone())),
            primary: Some((roles.primary_color_role.id, roles.primary_color_role.name.clone())),
            secondary: Some((
                roles.secondary_color_role.id,
                roles.secondary_color_role.name.clone(),
            )),
        }
    }

    fn take(&mut self, slot: Slot) -> Option<(RoleId, String)> {
        match slot {
            Slot::Team => self.team.take(),
            Slot::Primary => self.primary.take(),
            Slot::Secondary => self.secondary.take(),
        }
    }
}

/// One in-flight `/setup` invocation, carried explicitly through the flow.
pub struct SetupSession {
    pub id: Uuid,
    pub guild: GuildId,
    pub channel: ChannelId,
    pub requester: UserId,
    pub nickname: String,
    pub team_number: u32,
    pub reply: MessageId,
    team_role: RoleId,
    team_color: Color,
    primary_color: Color,
    secondary_color: Color,
    live: LiveRoles,
}

/// `"<nickname> | <teamNumber>"`, the display name every committed member
/// ends up with.
pub fn display_nickname(nickname: &str, team_number: u32) -> String {
    format!("{nickname} | {team_number}")
}

impl SetupSession {
    fn new(request: &SetupRequest, roles: &RoleSet, reply: MessageId) -> Self {
        Self {
            id: Uuid::new_v4(),
            guild: request.guild,
            channel: request.channel,
            requester: request.requester,
            nickname: request.nickname.clone(),
            team_number: request.team_number,
            reply,
            team_role: roles.team_role.id,
            team_color: roles.team_role.color,
            primary_color: roles.primary_color_role.color,
            secondary_color: roles.secondary_color_role.color,
            live: LiveRoles::new(roles),
        }
    }

    fn display_nickname(&self) -> String {
        display_nickname(&self.nickname, self.team_number)
    }
}

/// Post-provisioning lifecycle of a `/setup` invocation: present the four
/// choices, wait for exactly one selection from the requester inside the
/// window, and drive the chosen outcome to its terminal state with full
/// role cleanup on every failure path.
#[derive(Clone)]
pub struct SetupFlow {
    gateway: Arc<dyn ChatGateway>,
    timings: FlowTimings,
}

impl SetupFlow {
    pub fn new(gateway: Arc<dyn ChatGateway>, timings: FlowTimings) -> Self {
        Self { gateway, timings }
    }

    pub async fn run(
        &self,
        request: &SetupRequest,
        team: &TeamIdentity,
        events: &mut SessionEvents,
    ) -> Result<SetupOutcome, SetupError> {
        let roles = provision_roles(self.gateway.as_ref(), request.guild, team).await?;
        let prompt = messages::setup_prompt(request.team_number, &roles);
        let reply = self.gateway.post_reply(request.channel, prompt).await?;

        let mut session = SetupSession::new(request, &roles, reply);
        info!(
            event_name = "setup.presented",
            session_id = %session.id,
            team_number = session.team_number,
            user = %session.requester,
            "setup choices presented"
        );

        let result = match events
            .await_selection(session.requester, self.timings.selection_window)
            .await
        {
            Ok(selection) => match selection.action_id.as_str() {
                messages::ACTION_PRIMARY => self.commit_color(&mut session, Slot::Primary).await,
                messages::ACTION_SECONDARY => {
                    self.commit_color(&mut session, Slot::Secondary).await
                }
                messages::ACTION_CUSTOM => self.custom_color(&mut session, events).await,
                other => {
                    // `cancel` and anything unrecognized both cancel.
                    if other != messages::ACTION_CANCEL {
                        warn!(
                            session_id = %session.id,
                            action_id = other,
                            "unrecognized selection treated as cancel"
                        );
                    }
                    return Ok(self.cancel(&mut session).await);
                }
            },
            Err(wait) => Err(FlowFault::Wait(wait)),
        };

        match result {
            Ok(outcome) => Ok(outcome),
            Err(fault) => Ok(self.fail(&mut session, fault).await),
        }
    }

    /// `primary` / `secondary`: the chosen color role's display color
    /// becomes the team role's color, the temporary color roles go away,
    /// and the requester joins the team role.
    async fn commit_color(
        &self,
        session: &mut SetupSession,
        chosen: Slot,
    ) -> Result<SetupOutcome, FlowFault> {
        let desired = match chosen {
            Slot::Primary => session.primary_color,
            _ => session.secondary_color,
        };

        self.gateway.set_role_color(session.guild, session.team_role, desired).await?;
        self.delete_slot(session, Slot::Primary).await?;
        self.delete_slot(session, Slot::Secondary).await?;

        self.gateway.add_member_role(session.guild, session.requester, session.team_role).await?;
        self.set_nickname_best_effort(session).await;

        let confirmation = messages::color_committed(
            session.team_number,
            session.team_role,
            session.requester,
            desired,
        );
        self.gateway.update_reply(session.channel, session.reply, confirmation).await?;

        info!(
            event_name = "setup.color_committed",
            session_id = %session.id,
            team_number = session.team_number,
            color = %desired,
            "team color committed"
        );
        Ok(SetupOutcome::ColorCommitted { color: desired })
    }

    /// `custom`: drop the prepared color roles, then collect hex attempts
    /// until one parses. Only the per-iteration window bounds the loop.
    async fn custom_color(
        &self,
        session: &mut SetupSession,
        events: &mut SessionEvents,
    ) -> Result<SetupOutcome, FlowFault> {
        self.delete_slot(session, Slot::Primary).await?;
        self.delete_slot(session, Slot::Secondary).await?;

        let prompt =
            messages::custom_prompt(session.team_number, session.team_role, session.team_color);
        self.gateway.update_reply(session.channel, session.reply, prompt).await?;

        let mut rejected: Vec<MessageId> = Vec::new();
        let mut attempts: u32 = 0;

        loop {
            let message = events
                .await_message(session.requester, session.channel, self.timings.message_window)
                .await?;

            let Some(color) = find_hex_token(&message.text) else {
                attempts += 1;
                let retry = messages::custom_retry(
                    session.team_number,
                    session.team_role,
                    session.team_color,
                    attempts,
                );
                self.gateway.update_reply(session.channel, session.reply, retry).await?;
                rejected.push(message.message);
                continue;
            };

            let confirmation = messages::custom_committed(
                session.team_number,
                session.team_role,
                session.requester,
                color,
            );
            self.gateway.update_reply(session.channel, session.reply, confirmation).await?;

            self.gateway.delete_message(session.channel, message.message).await?;
            for old in rejected.drain(..) {
                self.gateway.delete_message(session.channel, old).await?;
            }

            self.gateway.set_role_color(session.guild, session.team_role, color).await?;
            self.gateway
                .add_member_role(session.guild, session.requester, session.team_role)
                .await?;
            self.set_nickname_best_effort(session).await;

            info!(
                event_name = "setup.color_committed",
                session_id = %session.id,
                team_number = session.team_number,
                color = %color,
                rejected_attempts = attempts,
                "custom team color committed"
            );
            return Ok(SetupOutcome::ColorCommitted { color });
        }
    }

    async fn cancel(&self, session: &mut SetupSession) -> SetupOutcome {
        self.delete_remaining(session).await;

        let notice = messages::cancel_notice(session.team_number);
        if let Err(error) = self.gateway.update_reply(session.channel, session.reply, notice).await
        {
            warn!(session_id = %session.id, %error, "cancel notice update failed");
        }
        self.schedule_reply_deletion(session.channel, session.reply);

        info!(
            event_name = "setup.cancelled",
            session_id = %session.id,
            team_number = session.team_number,
            "setup cancelled"
        );
        SetupOutcome::Cancelled
    }

    async fn fail(&self, session: &mut SetupSession, fault: FlowFault) -> SetupOutcome {
        warn!(
            event_name = "setup.failed",
            session_id = %session.id,
            team_number = session.team_number,
            error = %fault,
            "setup flow failed; cleaning up"
        );

        self.delete_remaining(session).await;

        let notice = messages::failure_notice(session.team_number);
        if let Err(error) = self.gateway.update_reply(session.channel, session.reply, notice).await
        {
            warn!(session_id = %session.id, %error, "failure notice update failed");
        }
        self.schedule_reply_deletion(session.channel, session.reply);

        SetupOutcome::Failed
    }

    /// Deletes one still-live role, propagating the platform error. The
    /// slot is vacated before the attempt so no other path retries it.
    async fn delete_slot(&self, session: &mut SetupSession, slot: Slot) -> Result<(), FlowFault> {
        if let Some((id, _name)) = session.live.take(slot) {
            self.gateway.delete_role(session.guild, id).await?;
        }
        Ok(())
    }

    /// Best-effort cleanup: every remaining role is attempted
    /// independently and failures are only logged.
    async fn delete_remaining(&self, session: &mut SetupSession) {
        for slot in [Slot::Team, Slot::Primary, Slot::Secondary] {
            if let Some((id, name)) = session.live.take(slot) {
                if let Err(error) = self.gateway.delete_role(session.guild, id).await {
                    warn!(
                        session_id = %session.id,
                        role = %name,
                        %error,
                        "cleanup role deletion failed"
                    );
                }
            }
        }
    }

    async fn set_nickname_best_effort(&self, session: &SetupSession) {
        let nickname = session.display_nickname();
        if let Err(error) =
            self.gateway.set_nickname(session.guild, session.requester, &nickname).await
        {
            warn!(
                event_name = "setup.nickname_failed",
                session_id = %session.id,
                %error,
                "nickname change failed; continuing"
            );
        }
    }

    fn schedule_reply_deletion(&self, channel: ChannelId, message: MessageId) {
        let gateway = Arc::clone(&self.gateway);
        let ttl = self.timings.notice_ttl;
        tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            if let Err(error) = gateway.delete_message(channel, message).await {
                warn!(%error, "scheduled notice deletion failed");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::FlowTimings;

    #[test]
    fn default_timings_match_the_interaction_windows() {
        let timings = FlowTimings::default();
        assert_eq!(timings.selection_window, Duration::from_secs(120));
        assert_eq!(timings.message_window, Duration::from_secs(120));
        assert_eq!(timings.notice_ttl, Duration::from_secs(10));
    }
}
