use rosterbot_core::config::{AppConfig, LoadOptions};
use rosterbot_core::reaction_map::{render_for_display, ReactionMapStore};

use super::CommandResult;

pub async fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure("showmap", "config_load", error.to_string(), 2)
        }
    };

    let store = ReactionMapStore::new(config.reaction_map.path);
    let map = store.load().await;
    CommandResult::success("showmap", render_for_display(&map))
}
