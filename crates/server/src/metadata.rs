//! HTTP lookups against the team-metadata and team-color services.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use rosterbot_core::color::Color;
use rosterbot_core::config::MetadataConfig;
use rosterbot_core::team::{DirectoryError, TeamColors, TeamDirectory, TeamProfile};

pub struct HttpTeamDirectory {
    client: Client,
    base_url: String,
    color_base_url: String,
    auth_key: SecretString,
}

impl HttpTeamDirectory {
    pub fn new(config: &MetadataConfig) -> Result<Self, reqwest::Error> {
        let client =
            Client::builder().timeout(Duration::from_secs(config.timeout_secs)).build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_owned(),
            color_base_url: config.color_base_url.trim_end_matches('/').to_owned(),
            auth_key: config.auth_key.clone(),
        })
    }

    fn profile_url(&self, team_number: u32) -> String {
        format!("{}/team/frc{team_number}/simple", self.base_url)
    }

    fn colors_url(&self, team_number: u32) -> String {
        format!("{}/team/{team_number}", self.color_base_url)
    }
}

#[derive(Debug, Deserialize)]
struct ProfileResponse {
    nickname: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ColorsResponse {
    #[serde(rename = "primaryHex")]
    primary_hex: Option<String>,
    #[serde(rename = "secondaryHex")]
    secondary_hex: Option<String>,
}

impl ColorsResponse {
    fn into_team_colors(self) -> TeamColors {
        TeamColors {
            primary: self.primary_hex.as_deref().and_then(|raw| Color::parse(raw).ok()),
            secondary: self.secondary_hex.as_deref().and_then(|raw| Color::parse(raw).ok()),
        }
    }
}

#[async_trait]
impl TeamDirectory for HttpTeamDirectory {
    async fn team_profile(&self, team_number: u32) -> Result<TeamProfile, DirectoryError> {
        let response = self
            .client
            .get(self.profile_url(team_number))
            .header("accept", "application/json")
            .header("X-TBA-Auth-Key", self.auth_key.expose_secret())
            .send()
            .await
            .map_err(|error| DirectoryError::Request(error.to_string()))?;

        let body: ProfileResponse = response
            .json()
            .await
            .map_err(|error| DirectoryError::Decode(error.to_string()))?;

        Ok(TeamProfile { nickname: body.nickname })
    }

    async fn team_colors(&self, team_number: u32) -> Result<TeamColors, DirectoryError> {
        let response = self
            .client
            .get(self.colors_url(team_number))
            .header("accept", "application/json")
            .send()
            .await
            .map_err(|error| DirectoryError::Request(error.to_string()))?;

        let body: ColorsResponse = response
            .json()
            .await
            .map_err(|error| DirectoryError::Decode(error.to_string()))?;

        Ok(body.into_team_colors())
    }
}
