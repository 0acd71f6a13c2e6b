use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub platform: PlatformConfig,
    pub metadata: MetadataConfig,
    pub reaction_map: ReactionMapConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct PlatformConfig {
    pub bot_token: SecretString,
}

#[derive(Clone, Debug)]
pub struct MetadataConfig {
    pub base_url: String,
    pub color_base_url: String,
    pub auth_key: SecretString,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct ReactionMapConfig {
    pub path: PathBuf,
    pub commit_author: String,
    pub remote: String,
    pub branch: String,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub bot_token: Option<String>,
    pub auth_key: Option<String>,
    pub map_path: Option<PathBuf>,
    pub log_level: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            platform: PlatformConfig { bot_token: String::new().into() },
            metadata: MetadataConfig {
                base_url: "https://www.thebluealliance.com/api/v3".to_string(),
                color_base_url: "https://api.frc-colors.com/v1".to_string(),
                auth_key: String::new().into(),
                timeout_secs: 30,
            },
            reaction_map: ReactionMapConfig {
                path: PathBuf::from("reactionMap.json"),
                commit_author: "Server Admin <ruhmit@ruhmit.com>".to_string(),
                remote: "origin".to_string(),
                branch: "main".to_string(),
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("rosterbot.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(platform) = patch.platform {
            if let Some(bot_token_value) = platform.bot_token {
                self.platform.bot_token = secret_value(bot_token_value);
            }
        }

        if let Some(metadata) = patch.metadata {
            if let Some(base_url) = metadata.base_url {
                self.metadata.base_url = base_url;
            }
            if let Some(color_base_url) = metadata.color_base_url {
                self.metadata.color_base_url = color_base_url;
            }
            if let Some(auth_key_value) = metadata.auth_key {
                self.metadata.auth_key = secret_value(auth_key_value);
            }
            if let Some(timeout_secs) = metadata.timeout_secs {
                self.metadata.timeout_secs = timeout_secs;
            }
        }

        if let Some(reaction_map) = patch.reaction_map {
            if let Some(path) = reaction_map.path {
                self.reaction_map.path = path;
            }
            if let Some(commit_author) = reaction_map.commit_author {
                self.reaction_map.commit_author = commit_author;
            }
            if let Some(remote) = reaction_map.remote {
                self.reaction_map.remote = remote;
            }
            if let Some(branch) = reaction_map.branch {
                self.reaction_map.branch = branch;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("ROSTERBOT_BOT_TOKEN") {
            self.platform.bot_token = secret_value(value);
        }

        if let Some(value) = read_env("ROSTERBOT_METADATA_BASE_URL") {
            self.metadata.base_url = value;
        }
        if let Some(value) = read_env("ROSTERBOT_METADATA_COLOR_BASE_URL") {
            self.metadata.color_base_url = value;
        }
        if let Some(value) = read_env("ROSTERBOT_METADATA_AUTH_KEY") {
            self.metadata.auth_key = secret_value(value);
        }
        if let Some(value) = read_env("ROSTERBOT_METADATA_TIMEOUT_SECS") {
            self.metadata.timeout_secs = parse_u64("ROSTERBOT_METADATA_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("ROSTERBOT_REACTION_MAP_PATH") {
            self.reaction_map.path = PathBuf::from(value);
        }
        if let Some(value) = read_env("ROSTERBOT_REACTION_MAP_COMMIT_AUTHOR") {
            self.reaction_map.commit_author = value;
        }
        if let Some(value) = read_env("ROSTERBOT_REACTION_MAP_REMOTE") {
            self.reaction_map.remote = value;
        }
        if let Some(value) = read_env("ROSTERBOT_REACTION_MAP_BRANCH") {
            self.reaction_map.branch = value;
        }

        let log_level =
            read_env("ROSTERBOT_LOGGING_LEVEL").or_else(|| read_env("ROSTERBOT_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("ROSTERBOT_LOGGING_FORMAT").or_else(|| read_env("ROSTERBOT_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(bot_token) = overrides.bot_token {
            self.platform.bot_token = secret_value(bot_token);
        }
        if let Some(auth_key) = overrides.auth_key {
            self.metadata.auth_key = secret_value(auth_key);
        }
        if let Some(map_path) = overrides.map_path {
            self.reaction_map.path = map_path;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_metadata(&self.metadata)?;
        validate_reaction_map(&self.reaction_map)?;
        validate_logging(&self.logging)?;
        Ok(())
    }

    /// Stricter check applied by the server at startup. The CLI can operate
    /// on the reaction map without platform credentials; the bot cannot.
    pub fn require_credentials(&self) -> Result<(), ConfigError> {
        if self.platform.bot_token.expose_secret().is_empty() {
            return Err(ConfigError::Validation(
                "platform.bot_token is required to run the bot (set ROSTERBOT_BOT_TOKEN)"
                    .to_string(),
            ));
        }
        if self.metadata.auth_key.expose_secret().is_empty() {
            return Err(ConfigError::Validation(
                "metadata.auth_key is required to run the bot (set ROSTERBOT_METADATA_AUTH_KEY)"
                    .to_string(),
            ));
        }
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("rosterbot.toml"), PathBuf::from("config/rosterbot.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_metadata(metadata: &MetadataConfig) -> Result<(), ConfigError> {
    for (field, url) in [
        ("metadata.base_url", &metadata.base_url),
        ("metadata.color_base_url", &metadata.color_base_url),
    ] {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(ConfigError::Validation(format!(
                "{field} must start with http:// or https://"
            )));
        }
    }

    if metadata.timeout_secs == 0 || metadata.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "metadata.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_reaction_map(reaction_map: &ReactionMapConfig) -> Result<(), ConfigError> {
    if reaction_map.path.as_os_str().is_empty() {
        return Err(ConfigError::Validation("reaction_map.path must not be empty".to_string()));
    }
    if reaction_map.commit_author.trim().is_empty() {
        return Err(ConfigError::Validation(
            "reaction_map.commit_author must not be empty".to_string(),
        ));
    }
    if reaction_map.remote.trim().is_empty() || reaction_map.branch.trim().is_empty() {
        return Err(ConfigError::Validation(
            "reaction_map.remote and reaction_map.branch must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    platform: Option<PlatformPatch>,
    metadata: Option<MetadataPatch>,
    reaction_map: Option<ReactionMapPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct PlatformPatch {
    bot_token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct MetadataPatch {
    base_url: Option<String>,
    color_base_url: Option<String>,
    auth_key: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ReactionMapPatch {
    path: Option<PathBuf>,
    commit_author: Option<String>,
    remote: Option<String>,
    branch: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::sync::{Mutex, OnceLock};

    use secrecy::ExposeSecret;
    use tempfile::TempDir;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TEST_ROSTERBOT_AUTH_KEY", "tba-from-env");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("rosterbot.toml");
            fs::write(
                &path,
                r#"
[metadata]
auth_key = "${TEST_ROSTERBOT_AUTH_KEY}"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.metadata.auth_key.expose_secret() == "tba-from-env",
                "auth key should be loaded from environment",
            )
        })();

        clear_vars(&["TEST_ROSTERBOT_AUTH_KEY"]);
        result
    }

    #[test]
    fn logging_env_aliases_are_supported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("ROSTERBOT_LOG_LEVEL", "warn");
        env::set_var("ROSTERBOT_LOG_FORMAT", "pretty");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.logging.level == "warn", "warning log level should be set from env var")?;
            ensure(
                matches!(config.logging.format, LogFormat::Pretty),
                "pretty logging format should be set from env var",
            )
        })();

        clear_vars(&["ROSTERBOT_LOG_LEVEL", "ROSTERBOT_LOG_FORMAT"]);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("ROSTERBOT_METADATA_BASE_URL", "https://metadata.from-env.example");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("rosterbot.toml");
            fs::write(
                &path,
                r#"
[metadata]
base_url = "https://metadata.from-file.example"

[logging]
level = "warn"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    log_level: Some("debug".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.metadata.base_url == "https://metadata.from-env.example",
                "env base url should win over file and defaults",
            )?;
            ensure(config.logging.level == "debug", "overridden log level should be debug")
        })();

        clear_vars(&["ROSTERBOT_METADATA_BASE_URL"]);
        result
    }

    #[test]
    fn validation_fails_fast_with_actionable_error() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("ROSTERBOT_METADATA_BASE_URL", "not-a-url");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => {
                    return Err("expected validation failure but config load succeeded".to_string())
                }
                Err(error) => error,
            };
            let has_message = matches!(
                error,
                ConfigError::Validation(ref message) if message.contains("metadata.base_url")
            );
            ensure(has_message, "validation failure should mention metadata.base_url")
        })();

        clear_vars(&["ROSTERBOT_METADATA_BASE_URL"]);
        result
    }

    #[test]
    fn missing_credentials_are_only_rejected_by_the_server_check() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let config = AppConfig::load(LoadOptions::default())
            .map_err(|err| format!("config load failed: {err}"))?;

        ensure(config.validate().is_ok(), "tokenless config should pass baseline validation")?;
        ensure(
            config.require_credentials().is_err(),
            "tokenless config should fail the server credential check",
        )
    }

    #[test]
    fn secret_values_are_not_leaked_by_debug() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("ROSTERBOT_BOT_TOKEN", "bot-secret-value");
        env::set_var("ROSTERBOT_METADATA_AUTH_KEY", "tba-secret-value");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;
            let debug = format!("{config:?}");

            ensure(
                !debug.contains("bot-secret-value"),
                "debug output should not contain bot token",
            )?;
            ensure(
                !debug.contains("tba-secret-value"),
                "debug output should not contain metadata auth key",
            )?;
            ensure(
                matches!(config.logging.format, LogFormat::Compact),
                "default logging format should be compact",
            )
        })();

        clear_vars(&["ROSTERBOT_BOT_TOKEN", "ROSTERBOT_METADATA_AUTH_KEY"]);
        result
    }
}
