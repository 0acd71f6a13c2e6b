use secrecy::ExposeSecret;
use serde::Serialize;

use rosterbot_core::config::{AppConfig, LoadOptions};

use super::CommandResult;

#[derive(Debug, Serialize)]
struct ConfigSummary {
    platform: PlatformSummary,
    metadata: MetadataSummary,
    reaction_map: ReactionMapSummary,
    logging: LoggingSummary,
}

#[derive(Debug, Serialize)]
struct PlatformSummary {
    bot_token: &'static str,
}

#[derive(Debug, Serialize)]
struct MetadataSummary {
    base_url: String,
    color_base_url: String,
    auth_key: &'static str,
    timeout_secs: u64,
}

#[derive(Debug, Serialize)]
struct ReactionMapSummary {
    path: String,
    commit_author: String,
    remote: String,
    branch: String,
}

#[derive(Debug, Serialize)]
struct LoggingSummary {
    level: String,
    format: String,
}

fn redacted(secret: &secrecy::SecretString) -> &'static str {
    if secret.expose_secret().is_empty() {
        "<unset>"
    } else {
        "<set>"
    }
}

pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return CommandResult::failure("config", "config_load", error.to_string(), 2),
    };

    let summary = ConfigSummary {
        platform: PlatformSummary { bot_token: redacted(&config.platform.bot_token) },
        metadata: MetadataSummary {
            base_url: config.metadata.base_url.clone(),
            color_base_url: config.metadata.color_base_url.clone(),
            auth_key: redacted(&config.metadata.auth_key),
            timeout_secs: config.metadata.timeout_secs,
        },
        reaction_map: ReactionMapSummary {
            path: config.reaction_map.path.display().to_string(),
            commit_author: config.reaction_map.commit_author.clone(),
            remote: config.reaction_map.remote.clone(),
            branch: config.reaction_map.branch.clone(),
        },
        logging: LoggingSummary {
            level: config.logging.level.clone(),
            format: format!("{:?}", config.logging.format).to_ascii_lowercase(),
        },
    };

    match serde_json::to_string_pretty(&summary) {
        Ok(rendered) => CommandResult::success("config", rendered),
        Err(error) => CommandResult::failure("config", "serialization", error.to_string(), 2),
    }
}
