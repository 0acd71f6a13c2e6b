use std::time::Duration;

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::{timeout_at, Instant};
use tracing::warn;

use crate::gateway::{ChannelId, GuildId, MessageId, UserId};

/// One activated selection control on a presented message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectionEvent {
    pub guild: GuildId,
    pub channel: ChannelId,
    pub message: MessageId,
    pub user: UserId,
    pub action_id: String,
}

/// One text message observed in a channel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageEvent {
    pub guild: GuildId,
    pub channel: ChannelId,
    pub message: MessageId,
    pub user: UserId,
    pub text: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionEvent {
    Selection(SelectionEvent),
    Message(MessageEvent),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WaitError {
    #[error("no response within {window:?}")]
    Timeout { window: Duration },
    #[error("session event stream closed")]
    Closed,
}

const SESSION_CHANNEL_CAPACITY: usize = 16;

/// Creates the single-consumer event channel for one setup session.
pub fn session_channel() -> (SessionEventSender, SessionEvents) {
    let (tx, rx) = mpsc::channel(SESSION_CHANNEL_CAPACITY);
    (SessionEventSender { tx }, SessionEvents { rx })
}

/// Producer half, held by the ingress loop while the session is live.
#[derive(Clone)]
pub struct SessionEventSender {
    tx: mpsc::Sender<SessionEvent>,
}

impl SessionEventSender {
    pub fn send(&self, event: SessionEvent) {
        if let Err(error) = self.tx.try_send(event) {
            warn!(%error, "dropping session event; consumer is gone or lagging");
        }
    }
}

/// Consumer half, owned by the session's flow. Each wait is a suspension
/// point bounded by its own deadline; events that do not match the
/// predicate never resolve a wait.
pub struct SessionEvents {
    rx: mpsc::Receiver<SessionEvent>,
}

impl SessionEvents {
    /// Waits for one selection by `requester`. Selections from other users
    /// are ignored without resolving the wait.
    pub async fn await_selection(
        &mut self,
        requester: UserId,
        window: Duration,
    ) -> Result<SelectionEvent, WaitError> {
        let deadline = Instant::now() + window;
        loop {
            match timeout_at(deadline, self.rx.recv()).await {
                Err(_) => return Err(WaitError::Timeout { window }),
                Ok(None) => return Err(WaitError::Closed),
                Ok(Some(SessionEvent::Selection(event))) if event.user == requester => {
                    return Ok(event)
                }
                Ok(Some(_)) => continue,
            }
        }
    }

    /// Waits for one text message by `requester` in `channel`.
    pub async fn await_message(
        &mut self,
        requester: UserId,
        channel: ChannelId,
        window: Duration,
    ) -> Result<MessageEvent, WaitError> {
        let deadline = Instant::now() + window;
        loop {
            match timeout_at(deadline, self.rx.recv()).await {
                Err(_) => return Err(WaitError::Timeout { window }),
                Ok(None) => return Err(WaitError::Closed),
                Ok(Some(SessionEvent::Message(event)))
                    if event.user == requester && event.channel == channel =>
                {
                    return Ok(event)
                }
                Ok(Some(_)) => continue,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::{session_channel, MessageEvent, SelectionEvent, SessionEvent, WaitError};
    use crate::gateway::{ChannelId, GuildId, MessageId, UserId};

    fn selection(user: u64, action_id: &str) -> SessionEvent {
        SessionEvent::Selection(SelectionEvent {
            guild: GuildId(1),
            channel: ChannelId(2),
            message: MessageId(3),
            user: UserId(user),
            action_id: action_id.to_owned(),
        })
    }

    fn message(user: u64, channel: u64, text: &str) -> SessionEvent {
        SessionEvent::Message(MessageEvent {
            guild: GuildId(1),
            channel: ChannelId(channel),
            message: MessageId(9),
            user: UserId(user),
            text: text.to_owned(),
        })
    }

    #[tokio::test(start_paused = true)]
    async fn other_users_do_not_resolve_the_selection_wait() {
        let (tx, mut events) = session_channel();
        tx.send(selection(99, "primary"));
        tx.send(selection(7, "secondary"));

        let resolved = events
            .await_selection(UserId(7), Duration::from_secs(120))
            .await
            .expect("requester selection should resolve");

        assert_eq!(resolved.user, UserId(7));
        assert_eq!(resolved.action_id, "secondary");
    }

    #[tokio::test(start_paused = true)]
    async fn selection_wait_times_out_without_a_matching_event() {
        let (tx, mut events) = session_channel();
        tx.send(selection(99, "primary"));

        let error = events
            .await_selection(UserId(7), Duration::from_secs(120))
            .await
            .expect_err("no requester event arrives");

        assert_eq!(error, WaitError::Timeout { window: Duration::from_secs(120) });
    }

    #[tokio::test(start_paused = true)]
    async fn message_wait_filters_by_user_and_channel() {
        let (tx, mut events) = session_channel();
        tx.send(message(7, 5, "wrong channel"));
        tx.send(message(99, 2, "wrong user"));
        tx.send(message(7, 2, "#1a2"));

        let resolved = events
            .await_message(UserId(7), ChannelId(2), Duration::from_secs(120))
            .await
            .expect("matching message should resolve");

        assert_eq!(resolved.text, "#1a2");
    }

    #[tokio::test(start_paused = true)]
    async fn closed_channel_surfaces_as_closed() {
        let (tx, mut events) = session_channel();
        drop(tx);

        let error = events
            .await_selection(UserId(7), Duration::from_secs(120))
            .await
            .expect_err("closed stream");

        assert_eq!(error, WaitError::Closed);
    }
}
