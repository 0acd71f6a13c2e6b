use async_trait::async_trait;
use thiserror::Error;

use crate::color::Color;

/// Resolved team identity, immutable once fetched.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TeamIdentity {
    pub team_number: u32,
    pub team_name: String,
    pub primary: Color,
    pub secondary: Color,
}

/// Raw profile lookup result. The upstream service omits `nickname` for
/// unknown teams rather than returning an error status.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TeamProfile {
    pub nickname: Option<String>,
}

/// Raw color lookup result. The color service returns both hues together;
/// a missing primary means the team is unknown to it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TeamColors {
    pub primary: Option<Color>,
    pub secondary: Option<Color>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DirectoryError {
    #[error("metadata request failed: {0}")]
    Request(String),
    #[error("metadata response could not be decoded: {0}")]
    Decode(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TeamLookupError {
    #[error("team {team_number} has no published name or colors")]
    NotFound { team_number: u32 },
    #[error(transparent)]
    Directory(#[from] DirectoryError),
}

/// External metadata lookups, implemented over HTTP in the server crate.
#[async_trait]
pub trait TeamDirectory: Send + Sync {
    async fn team_profile(&self, team_number: u32) -> Result<TeamProfile, DirectoryError>;
    async fn team_colors(&self, team_number: u32) -> Result<TeamColors, DirectoryError>;
}

/// Combines both lookups into a usable identity.
///
/// Name and primary color are both required; the secondary falls back to
/// the primary on the rare lookup that returns only one hue.
pub async fn resolve_team(
    directory: &dyn TeamDirectory,
    team_number: u32,
) -> Result<TeamIdentity, TeamLookupError> {
    let profile = directory.team_profile(team_number).await?;
    let colors = directory.team_colors(team_number).await?;

    let (Some(team_name), Some(primary)) = (profile.nickname, colors.primary) else {
        return Err(TeamLookupError::NotFound { team_number });
    };

    Ok(TeamIdentity {
        team_number,
        team_name,
        primary,
        secondary: colors.secondary.unwrap_or(primary),
    })
}
