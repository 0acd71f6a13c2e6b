use chrono::Utc;

use rosterbot_core::config::{AppConfig, LoadOptions};
use rosterbot_core::gitops::GitMapPublisher;
use rosterbot_core::reaction_map::{
    MapPublisher, NoopMapPublisher, ReactionMapStore, UpdateOutcome,
};

use super::CommandResult;

pub async fn run(keyword: &str, emoji: &str, no_publish: bool) -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure("updatemap", "config_load", error.to_string(), 2)
        }
    };

    let store = ReactionMapStore::new(config.reaction_map.path.clone());
    let publisher: Box<dyn MapPublisher> = if no_publish {
        Box::new(NoopMapPublisher)
    } else {
        Box::new(GitMapPublisher::new(&config.reaction_map))
    };

    match store.set(keyword, emoji, publisher.as_ref()).await {
        Ok(UpdateOutcome::Published) if no_publish => CommandResult::success(
            "updatemap",
            format!("{keyword} -> {emoji} written at {} (publish skipped)", Utc::now().to_rfc3339()),
        ),
        Ok(UpdateOutcome::Published) => CommandResult::success(
            "updatemap",
            format!("{keyword} -> {emoji} published at {}", Utc::now().to_rfc3339()),
        ),
        Ok(UpdateOutcome::SavedLocally { reason }) => CommandResult::failure(
            "updatemap",
            "publish",
            format!("{keyword} -> {emoji} saved locally but not published: {reason}"),
            1,
        ),
        Err(error) => CommandResult::failure("updatemap", "store", error.to_string(), 2),
    }
}
