use std::{
    fmt::Write,
    sync::{Arc, OnceLock},
};

use async_trait::async_trait;

use crate::{
    command::{
        Args, Command, CommandContext, CommandError, CommandHandler, PermissionLevel, Reply,
    },
    common::{
        format::{color_level, format_bytes, format_duration},
        types::now_ms,
    },
    monitoring::StatsCollector,
    server::SessionRegistry,
};

pub fn ping() -> Command {
    Command::new("ping", "Shows the bot's latency", Arc::new(Ping))
}

pub fn stats(registry: Arc<SessionRegistry>, collector: Arc<StatsCollector>) -> Command {
    Command::new(
        "stats",
        "Shows process statistics",
        Arc::new(Stats {
            registry,
            collector,
        }),
    )
    .permission(PermissionLevel::Admin)
}

pub fn help(catalogue: Arc<OnceLock<Vec<HelpEntry>>>) -> Command {
    Command::new("help", "Lists the commands you can use", Arc::new(Help { catalogue }))
}

struct Ping;

#[async_trait]
impl CommandHandler for Ping {
    async fn handle(&self, ctx: &CommandContext, _args: &Args) -> Result<Reply, CommandError> {
        let latency = ctx
            .timestamp
            .map(|sent| now_ms().saturating_sub(sent))
            .unwrap_or(0);
        Ok(Reply::plain(format!("Pong! {latency} ms")).colour(color_level(latency)))
    }
}

struct Stats {
    registry: Arc<SessionRegistry>,
    collector: Arc<StatsCollector>,
}

#[async_trait]
impl CommandHandler for Stats {
    async fn handle(&self, _ctx: &CommandContext, _args: &Args) -> Result<Reply, CommandError> {
        let stats = self.collector.collect(&self.registry);
        Ok(Reply::info(format!(
            "Uptime: {}\nSessions: {} ({} playing)\nMemory: {} of {}\nCPU: {:.1}% ({} cores)",
            format_duration(stats.uptime),
            stats.sessions,
            stats.playing_sessions,
            format_bytes(stats.memory.used as f64, false, 1),
            format_bytes(stats.memory.total as f64, false, 1),
            stats.cpu.process_load * 100.0,
            stats.cpu.cores,
        )))
    }
}

/// What `help` shows for one command.
#[derive(Debug, Clone)]
pub struct HelpEntry {
    pub usage: String,
    pub description: &'static str,
    pub permission: PermissionLevel,
}

impl From<&Command> for HelpEntry {
    fn from(command: &Command) -> Self {
        Self {
            usage: command.usage(),
            description: command.description,
            permission: command.permission,
        }
    }
}

struct Help {
    catalogue: Arc<OnceLock<Vec<HelpEntry>>>,
}

#[async_trait]
impl CommandHandler for Help {
    async fn handle(&self, ctx: &CommandContext, _args: &Args) -> Result<Reply, CommandError> {
        let mut out = String::from("Commands you can use:");
        let entries = self.catalogue.get().map(Vec::as_slice).unwrap_or_default();
        for entry in entries.iter().filter(|e| e.permission <= ctx.level) {
            let _ = write!(out, "\n`{}`: {}", entry.usage, entry.description);
        }
        Ok(Reply::info(out).ephemeral())
    }
}
