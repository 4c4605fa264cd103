use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::LazyLock,
};

use config::{Environment, File, FileFormat};
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::configs::*;

/// Files searched, in order, when no explicit path is given.
const CONFIG_FILE_NAMES: &[&str] = &["config.toml", "config.default.toml"];

/// Prefix for environment overrides, e.g. `EM_BOT__TOKEN`.
const ENV_PREFIX: &str = "EM";

static TOKEN_SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^.{24}\..{6}\..{27}$").expect("hardcoded regex"));

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Validation(String),
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub bot: BotConfig,
    #[serde(default)]
    pub channels: ChannelsConfig,
    #[serde(default)]
    pub roles: RolesConfig,
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub player: PlayerConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Loads the first config file found in the working directory, then applies
    /// `EM_*` environment overrides.
    ///
    /// Returns the file that was used, if any.
    pub fn load() -> Result<(Self, Option<PathBuf>), ConfigError> {
        let path = CONFIG_FILE_NAMES
            .iter()
            .map(PathBuf::from)
            .find(|p| p.exists());
        let config = Self::load_from(path.as_deref(), None)?;
        Ok((config, path))
    }

    /// Loads `path` (if any) layered under environment overrides.
    ///
    /// `env` replaces the process environment as the override source when given.
    pub fn load_from(
        path: Option<&Path>,
        env: Option<HashMap<String, String>>,
    ) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("bot.guild_ids")
                .with_list_parse_key("bot.dev_guild_ids")
                .try_parsing(true)
                .source(env),
        );

        let config: Config = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.bot.token.is_empty() && !TOKEN_SHAPE.is_match(&self.bot.token) {
            return Err(ConfigError::Validation(
                "bot.token does not look like a Discord token".into(),
            ));
        }

        for id in self.bot.guild_ids.iter().chain(&self.bot.dev_guild_ids) {
            check_snowflake("bot.guild_ids", *id)?;
        }
        if self.channels.devlog != 0 {
            check_snowflake("channels.devlog", self.channels.devlog)?;
        }

        if self.bot.prefix.trim().is_empty() {
            return Err(ConfigError::Validation("bot.prefix cannot be empty".into()));
        }
        if self.server.port == 0 {
            return Err(ConfigError::Validation("server.port cannot be 0".into()));
        }
        if self.audio.max_download_size == 0 {
            return Err(ConfigError::Validation(
                "audio.max_download_size cannot be 0".into(),
            ));
        }
        if !(1..=1000).contains(&self.audio.frame_duration_ms) {
            return Err(ConfigError::Validation(
                "audio.frame_duration_ms must be between 1 and 1000".into(),
            ));
        }

        Ok(())
    }
}

fn check_snowflake(field: &str, id: u64) -> Result<(), ConfigError> {
    let digits = id.to_string().len();
    if (17..=20).contains(&digits) {
        Ok(())
    } else {
        Err(ConfigError::Validation(format!(
            "{field}: {id} is not a Discord id (expected 17-20 digits)"
        )))
    }
}
