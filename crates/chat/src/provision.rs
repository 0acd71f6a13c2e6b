use thiserror::Error;
use tracing::warn;

use rosterbot_core::team::TeamIdentity;

use crate::gateway::{ChatGateway, GatewayError, GuildId, NewRole, RoleHandle};

/// The three roles a setup session owns until it reaches a terminal
/// outcome.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoleSet {
    pub team_role: RoleHandle,
    pub primary_color_role: RoleHandle,
    pub secondary_color_role: RoleHandle,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProvisionError {
    #[error("creating role `{name}` failed: {source}")]
    RoleCreate { name: String, source: GatewayError },
}

pub fn team_role_name(team_number: u32, team_name: &str) -> String {
    format!("{team_number} | {team_name}")
}

/// Prefix used to detect an already-provisioned team in the community.
pub fn team_role_prefix(team_number: u32) -> String {
    format!("{team_number} |")
}

/// Creates the team role plus both color roles. Fails on the first
/// creation error; earlier creations are left in place.
pub async fn provision_roles(
    gateway: &dyn ChatGateway,
    guild: GuildId,
    team: &TeamIdentity,
) -> Result<RoleSet, ProvisionError> {
    let base = team_role_name(team.team_number, &team.team_name);

    let team_role = create_role(gateway, guild, base.clone(), None).await?;
    let primary_color_role =
        create_role(gateway, guild, format!("{base} Primary"), Some(team.primary)).await?;
    let secondary_color_role =
        create_role(gateway, guild, format!("{base} Secondary"), Some(team.secondary)).await?;

    Ok(RoleSet { team_role, primary_color_role, secondary_color_role })
}

async fn create_role(
    gateway: &dyn ChatGateway,
    guild: GuildId,
    name: String,
    color: Option<rosterbot_core::color::Color>,
) -> Result<RoleHandle, ProvisionError> {
    let display = color.map(|c| c.contrast_safe());
    match gateway.create_role(guild, NewRole { name: name.clone(), color: display }).await {
        Ok(role) => Ok(role),
        Err(source) => {
            warn!(role = %name, %source, "role creation failed");
            Err(ProvisionError::RoleCreate { name, source })
        }
    }
}
