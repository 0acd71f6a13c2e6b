use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use rosterbot_chat::commands::CommandRouter;
use rosterbot_chat::gateway::{ChatGateway, NoopChatGateway};
use rosterbot_chat::runner::{BotRunner, NoopEventSource, ReconnectPolicy, SessionRegistry};
use rosterbot_chat::service::RosterService;
use rosterbot_chat::setup::{FlowTimings, SetupFlow};
use rosterbot_core::config::{AppConfig, ConfigError, LoadOptions};
use rosterbot_core::gitops::GitMapPublisher;
use rosterbot_core::reaction_map::ReactionMapStore;

use crate::metadata::HttpTeamDirectory;

pub struct Application {
    pub config: AppConfig,
    pub runner: BotRunner<RosterService>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("http client construction failed: {0}")]
    HttpClient(#[source] reqwest::Error),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );
    config.require_credentials()?;

    let gateway: Arc<dyn ChatGateway> = Arc::new(NoopChatGateway::default());
    let directory =
        Arc::new(HttpTeamDirectory::new(&config.metadata).map_err(BootstrapError::HttpClient)?);
    let store = Arc::new(ReactionMapStore::new(config.reaction_map.path.clone()));
    let publisher = Arc::new(GitMapPublisher::new(&config.reaction_map));
    let registry = Arc::new(SessionRegistry::new());

    let flow = SetupFlow::new(Arc::clone(&gateway), FlowTimings::default());
    let service = RosterService::new(
        Arc::clone(&gateway),
        directory,
        store,
        publisher,
        Arc::clone(&registry),
        flow,
    );

    let runner = BotRunner::new(
        Arc::new(NoopEventSource),
        CommandRouter::new(service),
        registry,
        gateway,
        ReconnectPolicy::default(),
    );

    info!(
        event_name = "system.bootstrap.ready",
        correlation_id = "bootstrap",
        map_path = %config.reaction_map.path.display(),
        "application bootstrap complete"
    );

    Ok(Application { config, runner })
}
