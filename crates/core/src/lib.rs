pub mod color;
pub mod config;
pub mod gitops;
pub mod reaction_map;
pub mod team;

pub use color::{find_hex_token, Color, ColorParseError, DEFAULT_VISIBLE};
pub use config::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};
pub use reaction_map::{
    commit_message, render_for_display, MapPublisher, MapStoreError, NoopMapPublisher,
    PublishError, ReactionMap, ReactionMapStore, UpdateOutcome,
};
pub use team::{
    resolve_team, DirectoryError, TeamColors, TeamDirectory, TeamIdentity, TeamLookupError,
    TeamProfile,
};
