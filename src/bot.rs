//! Glue between inbound chat events and the command router.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use tracing::{debug, info};

use crate::{
    command::{CommandError, CommandRouter, InboundEvent, Invocation, Reply, builtin},
    common::types::ChannelId,
    configs::Config,
    monitoring::StatsCollector,
    protocol::EventHub,
    server::SessionRegistry,
};

pub struct Bot {
    config: Arc<Config>,
    router: CommandRouter,
    hub: EventHub,
    announced: AtomicBool,
}

impl Bot {
    pub fn new(
        config: Arc<Config>,
        registry: Arc<SessionRegistry>,
        stats: Arc<StatsCollector>,
    ) -> Result<Self, CommandError> {
        let mut router = CommandRouter::new(config.roles.clone());
        builtin::register_all(&mut router, registry.clone(), stats)?;
        info!("Registered {} commands", router.len());

        Ok(Self {
            hub: registry.hub().clone(),
            config,
            router,
            announced: AtomicBool::new(false),
        })
    }

    pub fn router(&self) -> &CommandRouter {
        &self.router
    }

    /// Handles one inbound event and publishes the reply to its channel.
    ///
    /// Returns `None` when the event is not a command for this bot: a plain
    /// message, or an event from a guild outside the configured scope.
    pub async fn handle_event(&self, event: &InboundEvent) -> Option<Reply> {
        if !self.config.bot.is_guild_allowed(event.guild_id) {
            debug!(
                "Ignoring event from guild {:?} outside the configured scope",
                event.guild_id
            );
            return None;
        }

        let invocation = Invocation::from_event(event, &self.config.bot.prefix)?;
        let ctx = self.router.context(event, invocation.name());

        let reply = match self.router.dispatch(&invocation, &ctx).await {
            Ok(reply) => reply,
            Err(e) => {
                match &e {
                    CommandError::NotFound(_) | CommandError::Argument(_) => {
                        debug!("Rejected /{} from {}: {}", ctx.command, ctx.caller.name, e)
                    }
                    _ => info!("Rejected /{} from {}: {}", ctx.command, ctx.caller.name, e),
                }
                e.to_reply()
            }
        };

        self.hub.reply(event.channel_id, reply.clone());
        Some(reply)
    }

    /// Posts the connection notice to the devlog channel, if one is configured.
    /// Only the first call per process posts; reconnects stay quiet.
    pub fn announce_ready(&self) {
        let devlog = self.config.channels.devlog;
        if devlog != 0 && !self.announced.swap(true, Ordering::AcqRel) {
            self.hub
                .devlog(ChannelId(devlog), format!("{} connected 🥳", self.config.bot.name));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        command::event::fixtures::message,
        common::types::GuildId,
        media::fakes::ScriptedFetcher,
        protocol::OutgoingMessage,
        sink::fakes::{Behaviour, ScriptedSink},
    };

    fn bot(config: Config) -> (Bot, Arc<SessionRegistry>, EventHub) {
        let hub = EventHub::new();
        let registry = SessionRegistry::new(
            &config,
            Arc::new(ScriptedFetcher::default()),
            Arc::new(ScriptedSink::new(vec![], Behaviour::Hang)),
            hub.clone(),
        );
        let bot = Bot::new(Arc::new(config), registry.clone(), Arc::new(StatsCollector::new()))
            .expect("built-ins register");
        (bot, registry, hub)
    }

    #[tokio::test]
    async fn test_plain_message_is_ignored() {
        let (bot, _, hub) = bot(Config::default());
        let mut rx = hub.subscribe();
        assert_eq!(bot.handle_event(&message("hello", &[], None)).await, None);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_unknown_command_rejected_without_state_change() {
        let (bot, registry, hub) = bot(Config::default());
        let mut rx = hub.subscribe();

        let reply = bot
            .handle_event(&message("!dance", &[], Some(1)))
            .await
            .expect("prefixed messages get a reply");
        assert_eq!(reply.content, "Unknown command `dance`.");
        assert!(registry.is_empty());

        match rx.try_recv() {
            Ok(OutgoingMessage::Reply { channel_id, reply }) => {
                assert_eq!(channel_id, ChannelId(333333333333333333));
                assert!(reply.ephemeral);
            }
            other => panic!("expected a reply, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_guild_scoping_drops_other_guilds() {
        let mut config = Config::default();
        config.bot.guild_ids = vec![999999999999999999];
        let (bot, _, _) = bot(config);

        let event = message("!ping", &[], None);
        assert_eq!(event.guild_id, Some(GuildId(222222222222222222)));
        assert_eq!(bot.handle_event(&event).await, None);
    }

    #[test]
    fn test_devlog_announcement() {
        let mut config = Config::default();
        config.channels.devlog = 777777777777777777;
        let hub = EventHub::new();
        let mut rx = hub.subscribe();
        let bot = Bot {
            config: Arc::new(config),
            router: CommandRouter::new(Default::default()),
            hub,
            announced: AtomicBool::new(false),
        };

        bot.announce_ready();
        match rx.try_recv() {
            Ok(OutgoingMessage::Devlog { channel_id, content }) => {
                assert_eq!(channel_id, ChannelId(777777777777777777));
                assert!(content.ends_with("connected 🥳"));
            }
            other => panic!("expected a devlog message, got {other:?}"),
        }

        // A second subscriber connecting does not repeat it.
        bot.announce_ready();
        assert!(rx.try_recv().is_err());
    }
}
