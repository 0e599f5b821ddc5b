//! Background task owning the state of one chat.

use std::ops::ControlFlow;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use webchat_protocol::{
    decode_events, ChatEnvelope, ChatEvent, ChatUpdate, Participant, ParticipantState,
    ParticipantType, ReconnectRequest, Status, StopEvent,
};
use webchat_transport::{Method, Request};

use crate::client::{payload, Connection};
use crate::error::ChatResult;
use crate::session::ChatSnapshot;

pub(crate) enum Command {
    Stop {
        reply: oneshot::Sender<ChatResult<()>>,
    },
    /// Raw events returned by a call made outside the task.
    Dispatch { events: Vec<Value> },
}

enum Tick {
    Continue,
    Switchover,
    Finished,
}

/// Sole writer of the chat identifier and participant list.
///
/// Commands are only looked at between ticks, so a poll or reconnect in
/// flight always completes before a stop is handled.
pub(crate) struct Poller {
    connection: Connection,
    chat: ChatSnapshot,
    interval: Duration,
    published: watch::Sender<ChatSnapshot>,
    events: broadcast::Sender<ChatEvent>,
    inbox: mpsc::Receiver<Command>,
}

impl Poller {
    pub(crate) fn new(
        connection: Connection,
        chat: ChatSnapshot,
        interval: Duration,
        published: watch::Sender<ChatSnapshot>,
        events: broadcast::Sender<ChatEvent>,
        inbox: mpsc::Receiver<Command>,
    ) -> Self {
        Self {
            connection,
            chat,
            interval,
            published,
            events,
            inbox,
        }
    }

    pub(crate) async fn run(mut self) {
        let mut ticker = time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(
            chat_id = %self.chat.id,
            interval_ms = self.interval.as_millis() as u64,
            "poll task started"
        );

        loop {
            tokio::select! {
                biased;
                command = self.inbox.recv() => match command {
                    Some(Command::Stop { reply }) => {
                        let result = self.stop().await;
                        let _ = reply.send(result);
                        break;
                    }
                    Some(Command::Dispatch { events }) => {
                        if self.dispatch(events).is_break() {
                            break;
                        }
                    }
                    None => {
                        debug!(chat_id = %self.chat.id, "session handle dropped, leaving chat");
                        if let Err(error) = self.stop().await {
                            warn!(%error, "failed to leave chat after its handle was dropped");
                        }
                        break;
                    }
                },
                _ = ticker.tick() => match self.tick().await {
                    Tick::Continue => {}
                    Tick::Switchover => {
                        if self.reconnect().await.is_break() {
                            break;
                        }
                        ticker.reset();
                    }
                    Tick::Finished => break,
                },
            }
        }

        info!("poll task stopped");
    }

    async fn tick(&mut self) -> Tick {
        let Some(own) = self.chat.own_participant().cloned() else {
            info!(chat_id = %self.chat.id, "no participant left, ending chat");
            self.finish(None);
            return Tick::Finished;
        };

        match &own.state {
            ParticipantState::Active => {}
            ParticipantState::Disconnected => {
                info!(chat_id = %self.chat.id, participant_id = %own.id, "own participant disconnected, ending chat");
                self.finish(None);
                return Tick::Finished;
            }
            other => {
                warn!(participant_id = %own.id, state = %other, "participant in unexpected state, skipping poll");
                return Tick::Continue;
            }
        }

        let polled = self
            .connection
            .call::<ChatEnvelope<ChatUpdate>>(Request::get(format!("/chat/poll/{}", own.id)))
            .await;

        let update = match polled {
            Ok(envelope) => envelope.chat,
            Err(error) if error.is_service_unavailable() && self.can_switch_over() => {
                warn!(
                    chat_id = %self.chat.id,
                    endpoint = %self.connection.current_endpoint(),
                    "endpoint unavailable, switching over"
                );
                return Tick::Switchover;
            }
            Err(error) => {
                warn!(chat_id = %self.chat.id, %error, "poll failed");
                return Tick::Continue;
            }
        };

        if update.status.is_a(&Status::unknown_session()) {
            info!(chat_id = %self.chat.id, "service no longer knows this chat, ending it");
            self.finish(None);
            return Tick::Finished;
        }
        if update.status.is_a(&Status::service_unavailable()) && self.can_switch_over() {
            warn!(chat_id = %self.chat.id, "service reported unavailable, switching over");
            return Tick::Switchover;
        }
        if !update.status.is_ok() {
            warn!(chat_id = %self.chat.id, reason = update.status.reason(), "poll reported a failure");
            return Tick::Continue;
        }

        match self.dispatch(update.events) {
            ControlFlow::Continue(()) => Tick::Continue,
            ControlFlow::Break(()) => Tick::Finished,
        }
    }

    fn can_switch_over(&self) -> bool {
        self.connection.endpoints().has_backup()
    }

    async fn reconnect(&mut self) -> ControlFlow<()> {
        let endpoint = self.connection.endpoints().next().clone();
        info!(chat_id = %self.chat.id, %endpoint, "reconnecting chat");

        let body = match payload(&ReconnectRequest {
            chat_id: &self.chat.id,
        }) {
            Ok(body) => body,
            Err(error) => {
                warn!(chat_id = %self.chat.id, %error, "unable to encode reconnect request");
                return ControlFlow::Continue(());
            }
        };

        let update = match self
            .connection
            .call::<ChatEnvelope<ChatUpdate>>(Request::post("/chat/reconnect", body))
            .await
        {
            Ok(envelope) => envelope.chat,
            Err(error) => {
                warn!(chat_id = %self.chat.id, %endpoint, %error, "reconnect failed");
                return ControlFlow::Continue(());
            }
        };

        if update.status.is_a(&Status::unknown_session()) {
            info!(chat_id = %self.chat.id, "chat unknown after switchover, ending it");
            self.finish(None);
            return ControlFlow::Break(());
        }
        if !update.status.is_ok() {
            warn!(chat_id = %self.chat.id, reason = update.status.reason(), "reconnect reported a failure");
            return ControlFlow::Continue(());
        }

        if !update.participant_id.is_empty() {
            if let Some(own) = self.chat.participants.first_mut() {
                debug!(old = %own.id, new = %update.participant_id, "participant id replaced after reconnect");
                own.id = update.participant_id;
            }
            self.publish();
        }

        self.dispatch(update.events)
    }

    async fn stop(&mut self) -> ChatResult<()> {
        let Some(participant_id) = self.chat.connected_participant_id().map(str::to_string) else {
            return Ok(());
        };

        info!(chat_id = %self.chat.id, %participant_id, "leaving chat");
        let exited = self
            .connection
            .call::<ChatEnvelope<ChatUpdate>>(
                Request::get(format!("/chat/exit/{participant_id}")).with_method(Method::Post),
            )
            .await;
        self.finish(None);

        match exited?.chat.status.into_result() {
            Ok(()) => Ok(()),
            Err(error) if error.is_a(&Status::unknown_session()) => Ok(()),
            Err(error) => Err(error.into()),
        }
    }

    /// Applies the dispatch rules to one batch, in arrival order.
    ///
    /// The own participant's disconnect ends the chat, but only after the
    /// rest of the batch is delivered, so its Stop is the last event.
    fn dispatch(&mut self, records: Vec<Value>) -> ControlFlow<()> {
        let mut ending = None;

        for decoded in decode_events(records) {
            let event = match decoded {
                Ok(event) => event,
                Err(error) => {
                    warn!(chat_id = %self.chat.id, %error, "skipping undecodable event");
                    continue;
                }
            };

            match event {
                ChatEvent::ParticipantStateChanged(changed) => {
                    self.upsert_participant(&changed.participant);
                    if !changed.is_disconnect() {
                        self.emit(ChatEvent::ParticipantStateChanged(changed));
                        continue;
                    }

                    let stop = ChatEvent::Stop(StopEvent {
                        chat_id: self.chat.id.clone(),
                        sequence_number: changed.sequence_number,
                    });
                    if self.is_own(&changed.participant.id) {
                        ending.get_or_insert(stop);
                    } else {
                        self.emit(stop);
                    }
                }
                ChatEvent::Text(text)
                    if text.participant.kind == ParticipantType::WebUser
                        && self.is_own(&text.participant.id) =>
                {
                    debug!(sequence_number = text.sequence_number, "suppressing echo of own message");
                }
                other => self.emit(other),
            }
        }

        match ending {
            Some(stop) => {
                info!(chat_id = %self.chat.id, "own participant disconnected, ending chat");
                self.finish(Some(stop));
                ControlFlow::Break(())
            }
            None => ControlFlow::Continue(()),
        }
    }

    fn is_own(&self, participant_id: &str) -> bool {
        self.chat
            .own_participant()
            .is_some_and(|own| own.id == participant_id)
    }

    fn upsert_participant(&mut self, update: &Participant) {
        match self
            .chat
            .participants
            .iter_mut()
            .find(|known| known.id == update.id)
        {
            Some(known) => {
                if !update.name.is_empty() {
                    known.name = update.name.clone();
                }
                if update.kind != ParticipantType::Unspecified {
                    known.kind = update.kind.clone();
                }
                if update.state != ParticipantState::Unspecified {
                    known.state = update.state.clone();
                }
                if update.picture.is_some() {
                    known.picture = update.picture.clone();
                }
            }
            None => self.chat.participants.push(update.clone()),
        }
        self.publish();
    }

    fn emit(&self, event: ChatEvent) {
        let kind = event.kind();
        if self.events.send(event).is_err() {
            debug!(chat_id = %self.chat.id, kind, "no subscriber for chat event");
        }
    }

    /// Emits the terminal stop event and clears the chat identifier.
    fn finish(&mut self, stop: Option<ChatEvent>) {
        let stop = stop.unwrap_or_else(|| ChatEvent::stop(self.chat.id.clone()));
        self.emit(stop);
        self.chat.id.clear();
        self.publish();
    }

    fn publish(&self) {
        self.published.send_replace(self.chat.clone());
    }
}
