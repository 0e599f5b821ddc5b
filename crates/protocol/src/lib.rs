//! # Web chat protocol
//!
//! Wire-level vocabulary shared by the transport and the session engine:
//!
//! - **Status**: the success/failure envelope every response embeds
//! - **Participant**: parties attached to a chat
//! - **Events**: the closed set of chat events and their tagged JSON codec
//! - **Queue / ServerConfiguration**: lookup value objects
//! - **Chat bodies**: request and response shapes of the chat endpoints

pub mod chat;
pub mod event;
pub mod participant;
pub mod queue;
pub mod server;
pub mod status;

pub use chat::{
    decode_events, ChatEnvelope, ChatUpdate, Guest, PartyInfoEnvelope, PartyInfoRequest,
    ReconnectRequest, RoutingContext, SendMessageRequest, StartChatOptions, StartChatRequest,
    StartChatResponse, TEXT_PLAIN,
};
pub use event::{
    ChatEvent, EventError, FileEvent, ParticipantStateChangedEvent, StartEvent, StopEvent,
    TextEvent, TypingIndicatorEvent, UrlEvent,
};
pub use participant::{
    PartyInfo, Participant, ParticipantState, ParticipantType, SYSTEM_PARTICIPANT_ID,
};
pub use queue::{InvalidQueueType, Queue, QueueEnvelope, QueueQuery, QueueRef, QueueType};
pub use server::{ServerConfiguration, ServerConfigurationEnvelope};
pub use status::{
    Outcome, Status, StatusError, REASON_NOT_CONNECTED, REASON_SERVICE_UNAVAILABLE,
    REASON_UNKNOWN_SESSION,
};
