//! Mirrors reaction-map updates into version control via the `git` CLI.

use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::info;

use crate::config::ReactionMapConfig;
use crate::reaction_map::{commit_message, MapPublisher, PublishError};

pub struct GitMapPublisher {
    commit_author: String,
    remote: String,
    branch: String,
}

impl GitMapPublisher {
    pub fn new(config: &ReactionMapConfig) -> Self {
        Self {
            commit_author: config.commit_author.clone(),
            remote: config.remote.clone(),
            branch: config.branch.clone(),
        }
    }
}

async fn run_git(step: &'static str, command: &mut Command) -> Result<(), PublishError> {
    let output = command
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|error| PublishError::Git { step, detail: error.to_string() })?;

    if !output.status.success() {
        let detail = String::from_utf8_lossy(&output.stderr).trim().to_owned();
        return Err(PublishError::Git { step, detail });
    }

    Ok(())
}

#[async_trait]
impl MapPublisher for GitMapPublisher {
    async fn publish(&self, path: &Path, key: &str, value: &str) -> Result<(), PublishError> {
        run_git("add", Command::new("git").arg("add").arg(path)).await?;

        run_git(
            "commit",
            Command::new("git")
                .arg("commit")
                .arg("-m")
                .arg(commit_message(key, value))
                .arg(format!("--author={}", self.commit_author)),
        )
        .await?;

        run_git("push", Command::new("git").arg("push").arg(&self.remote).arg(&self.branch))
            .await?;

        info!(
            event_name = "reaction_map.pushed",
            %key,
            %value,
            remote = %self.remote,
            branch = %self.branch,
            "pushed reaction map update"
        );
        Ok(())
    }
}
