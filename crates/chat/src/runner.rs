use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::commands::{BotCommandService, CommandReply, CommandRouter, SlashCommand};
use crate::events::{session_channel, MessageEvent, SelectionEvent, SessionEvent, SessionEvents, SessionEventSender};
use crate::gateway::{ChatGateway, GuildId, UserId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SourceError {
    #[error("event source failed to connect: {0}")]
    Connect(String),
    #[error("event source read failed: {0}")]
    Receive(String),
    #[error("event source disconnect failed: {0}")]
    Disconnect(String),
}

/// Everything the host framework can hand the bot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InboundEvent {
    Command(SlashCommand),
    Selection(SelectionEvent),
    Message(MessageEvent),
    Unsupported { kind: String },
}

/// Stream of platform events. A real transport implements this; the noop
/// keeps the process alive with nothing wired in.
#[async_trait]
pub trait EventSource: Send + Sync {
    async fn connect(&self) -> Result<(), SourceError>;
    async fn next_event(&self) -> Result<Option<InboundEvent>, SourceError>;
    async fn disconnect(&self) -> Result<(), SourceError>;
}

#[derive(Default)]
pub struct NoopEventSource;

#[async_trait]
impl EventSource for NoopEventSource {
    async fn connect(&self) -> Result<(), SourceError> {
        Ok(())
    }

    async fn next_event(&self) -> Result<Option<InboundEvent>, SourceError> {
        Ok(None)
    }

    async fn disconnect(&self) -> Result<(), SourceError> {
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self { max_retries: 5, base_delay_ms: 250, max_delay_ms: 5_000 }
    }
}

impl ReconnectPolicy {
    fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.min(16);
        let multiplier = 1_u64 << exponent;
        let delay_ms = self.base_delay_ms.saturating_mul(multiplier).min(self.max_delay_ms);
        Duration::from_millis(delay_ms)
    }
}

/// Live setup sessions keyed by requester. Selection and message events
/// are only ever delivered to the session they belong to.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<(GuildId, UserId), SessionEventSender>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens the event channel for a new session. A second `begin` for the
    /// same requester replaces the first; the replaced session's next wait
    /// resolves as a closed stream.
    pub async fn begin(&self, guild: GuildId, user: UserId) -> SessionEvents {
        let (sender, events) = session_channel();
        self.sessions.lock().await.insert((guild, user), sender);
        events
    }

    pub async fn end(&self, guild: GuildId, user: UserId) {
        self.sessions.lock().await.remove(&(guild, user));
    }

    pub async fn forward(&self, event: SessionEvent) {
        let key = match &event {
            SessionEvent::Selection(selection) => (selection.guild, selection.user),
            SessionEvent::Message(message) => (message.guild, message.user),
        };

        if let Some(sender) = self.sessions.lock().await.get(&key) {
            sender.send(event);
        }
    }

    pub async fn active_sessions(&self) -> usize {
        self.sessions.lock().await.len()
    }
}

/// Event-loop driver: pulls events from the source, spawns command
/// handling, and feeds interaction events into their sessions.
pub struct BotRunner<S> {
    source: Arc<dyn EventSource>,
    router: Arc<CommandRouter<S>>,
    registry: Arc<SessionRegistry>,
    gateway: Arc<dyn ChatGateway>,
    reconnect_policy: ReconnectPolicy,
}

impl<S> BotRunner<S>
where
    S: BotCommandService + 'static,
{
    pub fn new(
        source: Arc<dyn EventSource>,
        router: CommandRouter<S>,
        registry: Arc<SessionRegistry>,
        gateway: Arc<dyn ChatGateway>,
        reconnect_policy: ReconnectPolicy,
    ) -> Self {
        Self { source, router: Arc::new(router), registry, gateway, reconnect_policy }
    }

    pub async fn start(&self) -> Result<()> {
        for attempt in 0..=self.reconnect_policy.max_retries {
            match self.connect_and_pump(attempt).await {
                Ok(()) => return Ok(()),
                Err(source_error) => {
                    warn!(
                        attempt,
                        max_retries = self.reconnect_policy.max_retries,
                        error = %source_error,
                        "event source failed"
                    );

                    if attempt >= self.reconnect_policy.max_retries {
                        warn!(
                            max_retries = self.reconnect_policy.max_retries,
                            "event source retries exhausted; continuing process without crash"
                        );
                        return Ok(());
                    }

                    let delay = self.reconnect_policy.backoff(attempt);
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        Ok(())
    }

    async fn connect_and_pump(&self, attempt: u32) -> Result<(), SourceError> {
        info!(attempt, "opening event source connection");
        self.source.connect().await?;
        info!(attempt, "event source connected");

        loop {
            let Some(event) = self.source.next_event().await? else {
                info!(attempt, "event source stream closed");
                self.source.disconnect().await?;
                return Ok(());
            };

            match event {
                InboundEvent::Command(payload) => {
                    info!(
                        event_name = "ingress.command_received",
                        command = %payload.name,
                        user = %payload.user,
                        request_id = %payload.request_id,
                        "received slash command"
                    );
                    self.spawn_command(payload);
                }
                InboundEvent::Selection(selection) => {
                    self.registry.forward(SessionEvent::Selection(selection)).await;
                }
                InboundEvent::Message(message) => {
                    self.registry.forward(SessionEvent::Message(message)).await;
                }
                InboundEvent::Unsupported { kind } => {
                    debug!(kind, "ignoring unsupported event");
                }
            }
        }
    }

    /// Commands run in their own task so one interactive session cannot
    /// stall the ingress loop for everyone else.
    fn spawn_command(&self, payload: SlashCommand) {
        let router = Arc::clone(&self.router);
        let gateway = Arc::clone(&self.gateway);
        let channel = payload.channel;
        let request_id = payload.request_id.clone();

        tokio::spawn(async move {
            match router.route(payload).await {
                Ok(CommandReply::Handled) => {}
                Ok(CommandReply::Respond(reply)) => {
                    if let Err(error) = gateway.post_reply(channel, reply).await {
                        warn!(%request_id, %error, "command reply delivery failed");
                    }
                }
                Err(error) => {
                    warn!(%request_id, %error, "command routing failed");
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio::sync::Mutex;

    use super::{
        BotRunner, EventSource, InboundEvent, ReconnectPolicy, SessionRegistry, SourceError,
    };
    use crate::commands::{CommandRouter, NoopBotCommandService};
    use crate::events::{SelectionEvent, SessionEvent};
    use crate::gateway::{ChannelId, GuildId, MessageId, NoopChatGateway, UserId};

    #[derive(Default)]
    struct ScriptedSource {
        state: Mutex<ScriptedState>,
    }

    #[derive(Default)]
    struct ScriptedState {
        connect_results: VecDeque<Result<(), SourceError>>,
        events: VecDeque<Result<Option<InboundEvent>, SourceError>>,
        connect_attempts: usize,
    }

    impl ScriptedSource {
        fn with_script(
            connect_results: Vec<Result<(), SourceError>>,
            events: Vec<Result<Option<InboundEvent>, SourceError>>,
        ) -> Self {
            Self {
                state: Mutex::new(ScriptedState {
                    connect_results: connect_results.into(),
                    events: events.into(),
                    connect_attempts: 0,
                }),
            }
        }

        async fn connect_attempts(&self) -> usize {
            self.state.lock().await.connect_attempts
        }
    }

    #[async_trait]
    impl EventSource for ScriptedSource {
        async fn connect(&self) -> Result<(), SourceError> {
            let mut state = self.state.lock().await;
            state.connect_attempts += 1;
            state.connect_results.pop_front().unwrap_or(Ok(()))
        }

        async fn next_event(&self) -> Result<Option<InboundEvent>, SourceError> {
            let mut state = self.state.lock().await;
            state.events.pop_front().unwrap_or(Ok(None))
        }

        async fn disconnect(&self) -> Result<(), SourceError> {
            Ok(())
        }
    }

    fn runner(
        source: Arc<ScriptedSource>,
        registry: Arc<SessionRegistry>,
    ) -> BotRunner<NoopBotCommandService> {
        BotRunner::new(
            source,
            CommandRouter::new(NoopBotCommandService),
            registry,
            Arc::new(NoopChatGateway::default()),
            ReconnectPolicy { max_retries: 2, base_delay_ms: 0, max_delay_ms: 0 },
        )
    }

    fn selection(user: u64) -> InboundEvent {
        InboundEvent::Selection(SelectionEvent {
            guild: GuildId(1),
            channel: ChannelId(2),
            message: MessageId(3),
            user: UserId(user),
            action_id: "primary".to_owned(),
        })
    }

    #[tokio::test]
    async fn reconnects_after_initial_connect_failure() {
        let source = Arc::new(ScriptedSource::with_script(
            vec![Err(SourceError::Connect("network down".to_owned())), Ok(())],
            vec![Ok(Some(InboundEvent::Unsupported { kind: "typing".to_owned() })), Ok(None)],
        ));

        let registry = Arc::new(SessionRegistry::new());
        runner(source.clone(), registry).start().await.expect("runner should not fail");

        assert_eq!(source.connect_attempts().await, 2);
    }

    #[tokio::test]
    async fn exhausts_retries_without_crashing() {
        let source = Arc::new(ScriptedSource::with_script(
            vec![
                Err(SourceError::Connect("fail-1".to_owned())),
                Err(SourceError::Connect("fail-2".to_owned())),
                Err(SourceError::Connect("fail-3".to_owned())),
            ],
            vec![],
        ));

        let registry = Arc::new(SessionRegistry::new());
        runner(source.clone(), registry).start().await.expect("runner should degrade gracefully");
        assert_eq!(source.connect_attempts().await, 3);
    }

    #[tokio::test]
    async fn forwards_selections_to_the_matching_session() {
        let registry = Arc::new(SessionRegistry::new());
        let mut events = registry.begin(GuildId(1), UserId(7)).await;

        let source = Arc::new(ScriptedSource::with_script(
            vec![Ok(())],
            vec![Ok(Some(selection(99))), Ok(Some(selection(7))), Ok(None)],
        ));

        runner(source, registry.clone()).start().await.expect("runner should complete");

        // Only the requester's own selection landed in this session.
        let resolved = events
            .await_selection(UserId(7), Duration::from_millis(50))
            .await
            .expect("selection should already be queued");
        assert_eq!(resolved.user, UserId(7));
        assert_eq!(registry.active_sessions().await, 1);
    }

    #[tokio::test]
    async fn second_session_for_the_same_requester_replaces_the_first() {
        let registry = SessionRegistry::new();
        let mut first = registry.begin(GuildId(1), UserId(7)).await;
        let _second = registry.begin(GuildId(1), UserId(7)).await;

        let error = first
            .await_selection(UserId(7), Duration::from_millis(50))
            .await
            .expect_err("replaced session should see a closed stream");
        assert_eq!(error, crate::events::WaitError::Closed);
        assert_eq!(registry.active_sessions().await, 1);
    }

    #[tokio::test]
    async fn ended_sessions_stop_receiving_events() {
        let registry = SessionRegistry::new();
        let _events = registry.begin(GuildId(1), UserId(7)).await;
        registry.end(GuildId(1), UserId(7)).await;
        assert_eq!(registry.active_sessions().await, 0);

        // Forwarding to a finished session is a quiet no-op.
        registry
            .forward(SessionEvent::Selection(SelectionEvent {
                guild: GuildId(1),
                channel: ChannelId(2),
                message: MessageId(3),
                user: UserId(7),
                action_id: "primary".to_owned(),
            }))
            .await;
    }
}
