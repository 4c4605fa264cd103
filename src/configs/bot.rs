use serde::{Deserialize, Serialize};

use crate::common::types::GuildId;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct BotConfig {
    #[serde(default = "default_name")]
    pub name: String,
    /// Chat platform token. Only its shape is checked here.
    #[serde(default)]
    pub token: String,
    /// Prefix that marks a plain message as a command.
    #[serde(default = "default_prefix")]
    pub prefix: String,
    #[serde(default)]
    pub guild_ids: Vec<u64>,
    #[serde(default)]
    pub dev_guild_ids: Vec<u64>,
    #[serde(default)]
    pub debug: bool,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            token: String::new(),
            prefix: default_prefix(),
            guild_ids: Vec::new(),
            dev_guild_ids: Vec::new(),
            debug: false,
        }
    }
}

impl BotConfig {
    /// Whether events from `guild` should be handled.
    ///
    /// Scoping is off while both guild lists are empty. With scoping on, events
    /// without a guild (direct messages) are dropped too.
    pub fn is_guild_allowed(&self, guild: Option<GuildId>) -> bool {
        if self.guild_ids.is_empty() && self.dev_guild_ids.is_empty() {
            return true;
        }
        guild.is_some_and(|g| self.guild_ids.contains(&g.0) || self.dev_guild_ids.contains(&g.0))
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct ChannelsConfig {
    /// Channel that receives startup and failure notices. 0 disables it.
    #[serde(default)]
    pub devlog: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RolesConfig {
    #[serde(default = "default_admin_role")]
    pub admin: String,
    #[serde(default = "default_dj_role")]
    pub dj: String,
}

impl Default for RolesConfig {
    fn default() -> Self {
        Self {
            admin: default_admin_role(),
            dj: default_dj_role(),
        }
    }
}

fn default_name() -> String {
    "Project E.M".to_string()
}

fn default_prefix() -> String {
    "!".to_string()
}

fn default_admin_role() -> String {
    "Admin".to_string()
}

fn default_dj_role() -> String {
    "DJ".to_string()
}
