use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use webchat_config::SessionConfig;
use webchat_protocol::{
    ChatEvent, Guest, Participant, ParticipantState, ParticipantType, PartyInfoEnvelope,
    PartyInfoRequest, QueueRef, SendMessageRequest, StartChatOptions, StartChatResponse,
    ChatEnvelope, ChatUpdate, SYSTEM_PARTICIPANT_ID, TEXT_PLAIN,
};
use webchat_transport::{Request, OCTET_STREAM};

use crate::client::{payload, Connection};
use crate::error::{ChatError, ChatResult};
use crate::poller::{Command, Poller};
use crate::stream::EventStream;

/// Lower bound applied to the poll interval suggested by the service.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1000);

pub fn clamp_poll_interval(suggested_ms: i64) -> Duration {
    let suggested = Duration::from_millis(u64::try_from(suggested_ms).unwrap_or(0));
    suggested.max(MIN_POLL_INTERVAL)
}

/// Facts fixed when the chat starts.
#[derive(Debug, Clone)]
pub struct ChatInfo {
    pub chat_id: String,
    pub queue: QueueRef,
    pub guest: Guest,
    pub poll_interval: Duration,
    pub language: String,
    pub date_format: String,
    pub time_format: String,
}

impl ChatInfo {
    pub(crate) fn new(options: StartChatOptions, language: String, started: &StartChatResponse) -> Self {
        Self {
            chat_id: started.chat_id.clone(),
            queue: options.queue,
            guest: options.guest,
            poll_interval: clamp_poll_interval(started.poll_wait_suggestion),
            language,
            date_format: started.date_format.clone(),
            time_format: started.time_format.clone(),
        }
    }
}

/// Mutable chat state as last published by the poll task.
///
/// The first participant is always the session's own participant.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatSnapshot {
    pub id: String,
    pub participants: Vec<Participant>,
}

impl ChatSnapshot {
    pub fn own_participant(&self) -> Option<&Participant> {
        self.participants.first()
    }

    /// Own participant id while the chat is live.
    pub fn connected_participant_id(&self) -> Option<&str> {
        if self.id.is_empty() {
            return None;
        }
        self.own_participant()
            .map(|participant| participant.id.as_str())
            .filter(|id| !id.is_empty())
    }

    pub fn is_connected(&self) -> bool {
        self.connected_participant_id().is_some()
    }
}

/// Handle on a live chat.
///
/// The poll task owns the chat state. This handle reads the published
/// snapshot and talks to the task over its command queue, so any number of
/// callers may share it behind an `Arc`.
///
/// Dropping the handle while the chat is live makes the poll task leave the
/// chat on its own; call [`ChatSession::stop`] to learn the outcome.
pub struct ChatSession {
    info: ChatInfo,
    connection: Connection,
    snapshot: watch::Receiver<ChatSnapshot>,
    commands: mpsc::Sender<Command>,
    events: broadcast::Sender<ChatEvent>,
    first_subscriber: Mutex<Option<broadcast::Receiver<ChatEvent>>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl ChatSession {
    pub(crate) fn spawn(
        connection: Connection,
        info: ChatInfo,
        participant_id: String,
        config: &SessionConfig,
    ) -> Self {
        let mut own = Participant::new(participant_id, info.guest.name.clone(), ParticipantType::WebUser);
        own.state = ParticipantState::Active;

        let initial = ChatSnapshot {
            id: info.chat_id.clone(),
            participants: vec![own],
        };

        let (published, snapshot) = watch::channel(initial.clone());
        let (events, first_subscriber) = broadcast::channel(config.event_buffer.max(1));
        let (commands, inbox) = mpsc::channel(config.command_buffer.max(1));

        let poller = Poller::new(
            connection.clone(),
            initial,
            info.poll_interval,
            published,
            events.clone(),
            inbox,
        );
        let task = tokio::spawn(poller.run());

        Self {
            info,
            connection,
            snapshot,
            commands,
            events,
            first_subscriber: Mutex::new(Some(first_subscriber)),
            task: Mutex::new(Some(task)),
        }
    }

    /// Current chat identifier; empty once the chat has ended.
    pub fn id(&self) -> String {
        self.snapshot.borrow().id.clone()
    }

    pub fn is_connected(&self) -> bool {
        self.snapshot.borrow().is_connected()
    }

    pub fn participants(&self) -> Vec<Participant> {
        self.snapshot.borrow().participants.clone()
    }

    pub fn snapshot(&self) -> ChatSnapshot {
        self.snapshot.borrow().clone()
    }

    pub fn info(&self) -> &ChatInfo {
        &self.info
    }

    pub fn poll_interval(&self) -> Duration {
        self.info.poll_interval
    }

    pub fn queue(&self) -> &QueueRef {
        &self.info.queue
    }

    pub fn language(&self) -> &str {
        &self.info.language
    }

    /// Subscribes to the chat events.
    ///
    /// The first subscription replays every event since the chat started;
    /// later ones only see what is emitted after they subscribe.
    pub fn subscribe(&self) -> EventStream {
        let receiver = lock(&self.first_subscriber)
            .take()
            .unwrap_or_else(|| self.events.subscribe());
        EventStream::new(receiver)
    }

    fn connected_participant_id(&self) -> ChatResult<String> {
        self.snapshot
            .borrow()
            .connected_participant_id()
            .map(str::to_string)
            .ok_or(ChatError::NotConnected)
    }

    /// Leaves the chat. Calling it on an ended chat is a no-op.
    ///
    /// Returns once the poll task has exited, so no poll happens afterwards.
    pub async fn stop(&self) -> ChatResult<()> {
        if !self.is_connected() {
            debug!(chat_id = %self.info.chat_id, "chat already stopped");
            self.join_task().await;
            return Ok(());
        }

        let (reply, outcome) = oneshot::channel();
        if self.commands.send(Command::Stop { reply }).await.is_err() {
            self.join_task().await;
            return Ok(());
        }

        let result = outcome.await.unwrap_or(Ok(()));
        self.join_task().await;
        result
    }

    async fn join_task(&self) {
        let task = lock(&self.task).take();
        if let Some(task) = task {
            if let Err(error) = task.await {
                warn!(chat_id = %self.info.chat_id, %error, "poll task ended abnormally");
            }
        }
    }

    /// Sends a message as the own participant. `content_type` defaults to
    /// `text/plain`.
    ///
    /// Events carried by the response are queued to the poll task behind any
    /// earlier command and delivered on the event stream from there.
    pub async fn send_message(&self, text: &str, content_type: Option<&str>) -> ChatResult<()> {
        let participant_id = self.connected_participant_id()?;
        let body = payload(&SendMessageRequest {
            message: text,
            content_type: content_type.unwrap_or(TEXT_PLAIN),
        })?;

        let envelope: ChatEnvelope<ChatUpdate> = self
            .connection
            .call(Request::post(format!("/chat/sendMessage/{participant_id}"), body))
            .await?;
        let ChatUpdate { events, status, .. } = envelope.chat;

        if !events.is_empty() {
            self.forward(events).await;
        }
        Ok(status.into_result()?)
    }

    async fn forward(&self, events: Vec<serde_json::Value>) {
        if self.commands.send(Command::Dispatch { events }).await.is_err() {
            debug!(chat_id = %self.info.chat_id, "chat ended before response events were dispatched");
        }
    }

    /// Downloads a file announced by a file event.
    pub async fn get_file(&self, path: &str) -> ChatResult<Bytes> {
        self.connected_participant_id()?;
        let path = path
            .strip_prefix("/websvcs")
            .filter(|rest| rest.starts_with('/'))
            .unwrap_or(path);

        let response = self
            .connection
            .send(Request::get(path).with_accept(OCTET_STREAM))
            .await?;
        Ok(response.body)
    }

    /// Looks up a participant of this chat. The system participant is
    /// answered locally.
    pub async fn participant(&self, id: &str) -> ChatResult<Participant> {
        if id == SYSTEM_PARTICIPANT_ID {
            return Ok(Participant::system());
        }

        let own = self.connected_participant_id()?;
        let body = payload(&PartyInfoRequest { participant_id: id })?;
        let envelope: PartyInfoEnvelope = self
            .connection
            .call(Request::post(format!("/partyInfo/{own}"), body))
            .await?;

        let (mut participant, status) = envelope.party_info.into_parts();
        status.into_result()?;
        participant.id = id.to_string();
        Ok(participant)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
