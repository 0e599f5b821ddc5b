//! Request and response bodies of the chat endpoints.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::event::{ChatEvent, EventError};
use crate::queue::{QueueRef, QueueType};
use crate::status::Status;

/// The only content type the client negotiates.
pub const TEXT_PLAIN: &str = "text/plain";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingContext {
    pub category: String,
    pub context: String,
}

/// The guest starting a chat.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Guest {
    pub name: String,
    pub credentials: Option<String>,
}

impl Guest {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            credentials: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct StartChatOptions {
    pub queue: QueueRef,
    pub guest: Guest,
    /// Falls back to the client language when unset.
    pub language: Option<String>,
    pub email_address: Option<String>,
    pub transcript_required: bool,
    pub attributes: BTreeMap<String, String>,
    pub routing_contexts: Vec<RoutingContext>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartChatRequest<'a> {
    pub supported_content_types: &'static str,
    pub participant: GuestRecord<'a>,
    pub transcript_required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_address: Option<&'a str>,
    #[serde(skip_serializing_if = "str::is_empty")]
    pub language: &'a str,
    pub target: &'a str,
    #[serde(rename = "targettype")]
    pub target_type: QueueType,
    #[serde(skip_serializing_if = "no_attributes")]
    pub attributes: &'a BTreeMap<String, String>,
    #[serde(skip_serializing_if = "no_routing_contexts")]
    pub routing_contexts: &'a [RoutingContext],
}

fn no_attributes(attributes: &&BTreeMap<String, String>) -> bool {
    attributes.is_empty()
}

fn no_routing_contexts(contexts: &&[RoutingContext]) -> bool {
    contexts.is_empty()
}

#[derive(Debug, Clone, Serialize)]
pub struct GuestRecord<'a> {
    pub name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credentials: Option<&'a str>,
}

impl<'a> StartChatRequest<'a> {
    pub fn new(options: &'a StartChatOptions, language: &'a str) -> Self {
        Self {
            supported_content_types: TEXT_PLAIN,
            participant: GuestRecord {
                name: &options.guest.name,
                credentials: options.guest.credentials.as_deref(),
            },
            transcript_required: options.transcript_required,
            email_address: options.email_address.as_deref(),
            language,
            target: &options.queue.name,
            target_type: options.queue.kind,
            attributes: &options.attributes,
            routing_contexts: &options.routing_contexts,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartChatResponse {
    #[serde(rename = "chatID", default)]
    pub chat_id: String,
    #[serde(rename = "participantID", default)]
    pub participant_id: String,
    /// Suggested poll interval in milliseconds.
    #[serde(default)]
    pub poll_wait_suggestion: i64,
    #[serde(default)]
    pub date_format: String,
    #[serde(default)]
    pub time_format: String,
    #[serde(rename = "cfgVer", default)]
    pub config_version: i64,
    pub status: Status,
}

/// Body shared by poll, send, exit and reconnect responses.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatUpdate {
    /// Only present in reconnect responses.
    #[serde(rename = "participantID", default)]
    pub participant_id: String,
    #[serde(default)]
    pub poll_wait_suggestion: i64,
    #[serde(rename = "cfgVer", default)]
    pub config_version: i64,
    #[serde(default)]
    pub events: Vec<Value>,
    pub status: Status,
}

/// `{"chat": ...}` wrapper around every chat endpoint response.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatEnvelope<T> {
    pub chat: T,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest<'a> {
    pub message: &'a str,
    pub content_type: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconnectRequest<'a> {
    #[serde(rename = "chatID")]
    pub chat_id: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct PartyInfoRequest<'a> {
    #[serde(rename = "participantID")]
    pub participant_id: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PartyInfoEnvelope {
    #[serde(rename = "partyInfo")]
    pub party_info: crate::participant::PartyInfo,
}

/// Decodes every record of a batch independently, keeping arrival order.
pub fn decode_events(records: Vec<Value>) -> Vec<Result<ChatEvent, EventError>> {
    records.into_iter().map(ChatEvent::from_value).collect()
}
