//! Chat events and their tagged JSON codec.
//!
//! Every event record carries a `type` discriminator next to the fields of
//! its variant. Participant data is flattened into the record
//! (`participantID`, `displayName`, `participantType`, `state`) and is
//! re-assembled into a nested [`Participant`] when decoding.

use std::fmt;

use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use thiserror::Error;
use url::Url;

use crate::participant::{Participant, ParticipantFields, ParticipantState};

#[derive(Debug, Error)]
pub enum EventError {
    #[error("event record is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("event record has no type discriminator")]
    MissingType,

    #[error("unsupported event type: {0}")]
    Unsupported(String),

    #[error("malformed {kind} event: {source}")]
    Malformed {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StartEvent {
    pub chat_id: String,
    pub sequence_number: i64,
    pub participants: Vec<Participant>,
    /// Identity of the guest on their own platform, when the chat was bridged.
    pub guest: Participant,
    pub language: String,
    pub date_format: String,
    pub time_format: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StopEvent {
    pub chat_id: String,
    pub sequence_number: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextEvent {
    pub participant: Participant,
    pub sequence_number: i64,
    pub conversation_sequence_number: i64,
    pub content_type: String,
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileEvent {
    pub participant: Participant,
    pub sequence_number: i64,
    pub conversation_sequence_number: i64,
    pub content_type: String,
    /// Service path the file can be fetched from.
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlEvent {
    pub participant: Participant,
    pub sequence_number: i64,
    pub conversation_sequence_number: i64,
    pub url: Url,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypingIndicatorEvent {
    pub participant: Participant,
    pub sequence_number: i64,
    pub content_type: String,
    pub typing: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParticipantStateChangedEvent {
    /// The participant, carrying its new state.
    pub participant: Participant,
    pub sequence_number: i64,
    pub conversation_sequence_number: i64,
}

/// The closed set of events a chat can produce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEvent {
    Start(StartEvent),
    Stop(StopEvent),
    Text(TextEvent),
    File(FileEvent),
    Url(UrlEvent),
    TypingIndicator(TypingIndicatorEvent),
    ParticipantStateChanged(ParticipantStateChangedEvent),
}

impl ChatEvent {
    pub fn stop(chat_id: impl Into<String>) -> Self {
        Self::Stop(StopEvent {
            chat_id: chat_id.into(),
            sequence_number: 0,
        })
    }

    /// The wire discriminator of this event.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Start(_) => "start",
            Self::Stop(_) => "stop",
            Self::Text(_) => "text",
            Self::File(_) => "file",
            Self::Url(_) => "url",
            Self::TypingIndicator(_) => "typingIndicator",
            Self::ParticipantStateChanged(_) => "participantStateChanged",
        }
    }

    pub fn sequence_number(&self) -> i64 {
        match self {
            Self::Start(event) => event.sequence_number,
            Self::Stop(event) => event.sequence_number,
            Self::Text(event) => event.sequence_number,
            Self::File(event) => event.sequence_number,
            Self::Url(event) => event.sequence_number,
            Self::TypingIndicator(event) => event.sequence_number,
            Self::ParticipantStateChanged(event) => event.sequence_number,
        }
    }

    pub fn conversation_sequence_number(&self) -> Option<i64> {
        match self {
            Self::Text(event) => Some(event.conversation_sequence_number),
            Self::File(event) => Some(event.conversation_sequence_number),
            Self::Url(event) => Some(event.conversation_sequence_number),
            Self::ParticipantStateChanged(event) => Some(event.conversation_sequence_number),
            Self::Start(_) | Self::Stop(_) | Self::TypingIndicator(_) => None,
        }
    }

    pub fn participant(&self) -> Option<&Participant> {
        match self {
            Self::Text(event) => Some(&event.participant),
            Self::File(event) => Some(&event.participant),
            Self::Url(event) => Some(&event.participant),
            Self::TypingIndicator(event) => Some(&event.participant),
            Self::ParticipantStateChanged(event) => Some(&event.participant),
            Self::Start(_) | Self::Stop(_) => None,
        }
    }

    pub fn is_stop(&self) -> bool {
        matches!(self, Self::Stop(_))
    }

    pub fn from_slice(raw: &[u8]) -> Result<Self, EventError> {
        let value: Value = serde_json::from_slice(raw)?;
        Self::from_value(value)
    }

    /// Decodes one tagged record. Unknown discriminators are an error.
    pub fn from_value(value: Value) -> Result<Self, EventError> {
        let kind = value
            .get("type")
            .and_then(Value::as_str)
            .ok_or(EventError::MissingType)?;

        let &(name, decoder) = DECODERS
            .iter()
            .find(|(name, _)| *name == kind)
            .ok_or_else(|| EventError::Unsupported(kind.to_string()))?;

        decoder(value).map_err(|source| EventError::Malformed { kind: name, source })
    }

    /// Encodes the variant's fields and injects the discriminator next to them.
    pub fn to_value(&self) -> Result<Value, EventError> {
        let encoded = match self {
            Self::Start(event) => serde_json::to_value(StartRecord::from(event)),
            Self::Stop(event) => serde_json::to_value(StopRecord::from(event)),
            Self::Text(event) => serde_json::to_value(TextRecord::from(event)),
            Self::File(event) => serde_json::to_value(FileRecord::from(event)),
            Self::Url(event) => serde_json::to_value(UrlRecord::from(event)),
            Self::TypingIndicator(event) => serde_json::to_value(TypingIndicatorRecord::from(event)),
            Self::ParticipantStateChanged(event) => {
                serde_json::to_value(ParticipantStateChangedRecord::from(event))
            }
        };
        let mut value = encoded.map_err(|source| EventError::Malformed {
            kind: self.kind(),
            source,
        })?;
        if let Value::Object(fields) = &mut value {
            fields.insert("type".to_string(), Value::String(self.kind().to_string()));
        }
        Ok(value)
    }
}

impl fmt::Display for ChatEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start(event) => write!(f, "chat {} started", event.chat_id),
            Self::Stop(event) => write!(f, "chat {} stopped", event.chat_id),
            Self::Text(event) => f.write_str(&event.text),
            Self::File(event) => f.write_str(&event.path),
            Self::Url(event) => f.write_str(event.url.as_str()),
            Self::TypingIndicator(event) if event.typing => f.write_str("typing"),
            Self::TypingIndicator(_) => f.write_str("not typing"),
            Self::ParticipantStateChanged(event) => write!(
                f,
                "Participant {} ({}) new state: {}",
                event.participant.name, event.participant.id, event.participant.state
            ),
        }
    }
}

impl Serialize for ChatEvent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value()
            .map_err(serde::ser::Error::custom)?
            .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ChatEvent {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_value(value).map_err(serde::de::Error::custom)
    }
}

type Decoder = fn(Value) -> Result<ChatEvent, serde_json::Error>;

const DECODERS: &[(&str, Decoder)] = &[
    ("start", decode::<StartRecord>),
    ("stop", decode::<StopRecord>),
    ("text", decode::<TextRecord>),
    ("file", decode::<FileRecord>),
    ("url", decode::<UrlRecord>),
    ("typingIndicator", decode::<TypingIndicatorRecord>),
    ("participantStateChanged", decode::<ParticipantStateChangedRecord>),
];

fn decode<R>(value: Value) -> Result<ChatEvent, serde_json::Error>
where
    R: DeserializeOwned + Into<ChatEvent>,
{
    serde_json::from_value::<R>(value).map(Into::into)
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StartRecord {
    #[serde(rename = "chatID", default)]
    chat_id: String,
    #[serde(default)]
    sequence_number: i64,
    #[serde(default)]
    participants: Vec<ParticipantFields>,
    #[serde(default)]
    guest: ParticipantFields,
    #[serde(default)]
    language: String,
    #[serde(default)]
    date_format: String,
    #[serde(default)]
    time_format: String,
}

impl From<StartRecord> for ChatEvent {
    fn from(record: StartRecord) -> Self {
        ChatEvent::Start(StartEvent {
            chat_id: record.chat_id,
            sequence_number: record.sequence_number,
            participants: record.participants.into_iter().map(Into::into).collect(),
            guest: record.guest.into(),
            language: record.language,
            date_format: record.date_format,
            time_format: record.time_format,
        })
    }
}

impl From<&StartEvent> for StartRecord {
    fn from(event: &StartEvent) -> Self {
        Self {
            chat_id: event.chat_id.clone(),
            sequence_number: event.sequence_number,
            participants: event.participants.iter().map(Into::into).collect(),
            guest: (&event.guest).into(),
            language: event.language.clone(),
            date_format: event.date_format.clone(),
            time_format: event.time_format.clone(),
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StopRecord {
    #[serde(rename = "chatID", default)]
    chat_id: String,
    #[serde(default)]
    sequence_number: i64,
}

impl From<StopRecord> for ChatEvent {
    fn from(record: StopRecord) -> Self {
        ChatEvent::Stop(StopEvent {
            chat_id: record.chat_id,
            sequence_number: record.sequence_number,
        })
    }
}

impl From<&StopEvent> for StopRecord {
    fn from(event: &StopEvent) -> Self {
        Self {
            chat_id: event.chat_id.clone(),
            sequence_number: event.sequence_number,
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TextRecord {
    #[serde(flatten)]
    participant: ParticipantFields,
    #[serde(default)]
    sequence_number: i64,
    #[serde(default)]
    conversation_sequence_number: i64,
    #[serde(default)]
    content_type: String,
    #[serde(rename = "value", default)]
    text: String,
}

impl From<TextRecord> for ChatEvent {
    fn from(record: TextRecord) -> Self {
        ChatEvent::Text(TextEvent {
            participant: record.participant.into(),
            sequence_number: record.sequence_number,
            conversation_sequence_number: record.conversation_sequence_number,
            content_type: record.content_type,
            text: record.text,
        })
    }
}

impl From<&TextEvent> for TextRecord {
    fn from(event: &TextEvent) -> Self {
        Self {
            participant: (&event.participant).into(),
            sequence_number: event.sequence_number,
            conversation_sequence_number: event.conversation_sequence_number,
            content_type: event.content_type.clone(),
            text: event.text.clone(),
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileRecord {
    #[serde(flatten)]
    participant: ParticipantFields,
    #[serde(default)]
    sequence_number: i64,
    #[serde(default)]
    conversation_sequence_number: i64,
    #[serde(default)]
    content_type: String,
    #[serde(rename = "value", default)]
    path: String,
}

impl From<FileRecord> for ChatEvent {
    fn from(record: FileRecord) -> Self {
        ChatEvent::File(FileEvent {
            participant: record.participant.into(),
            sequence_number: record.sequence_number,
            conversation_sequence_number: record.conversation_sequence_number,
            content_type: record.content_type,
            path: record.path,
        })
    }
}

impl From<&FileEvent> for FileRecord {
    fn from(event: &FileEvent) -> Self {
        Self {
            participant: (&event.participant).into(),
            sequence_number: event.sequence_number,
            conversation_sequence_number: event.conversation_sequence_number,
            content_type: event.content_type.clone(),
            path: event.path.clone(),
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UrlRecord {
    #[serde(flatten)]
    participant: ParticipantFields,
    #[serde(default)]
    sequence_number: i64,
    #[serde(default)]
    conversation_sequence_number: i64,
    #[serde(rename = "value")]
    url: Url,
}

impl From<UrlRecord> for ChatEvent {
    fn from(record: UrlRecord) -> Self {
        ChatEvent::Url(UrlEvent {
            participant: record.participant.into(),
            sequence_number: record.sequence_number,
            conversation_sequence_number: record.conversation_sequence_number,
            url: record.url,
        })
    }
}

impl From<&UrlEvent> for UrlRecord {
    fn from(event: &UrlEvent) -> Self {
        Self {
            participant: (&event.participant).into(),
            sequence_number: event.sequence_number,
            conversation_sequence_number: event.conversation_sequence_number,
            url: event.url.clone(),
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TypingIndicatorRecord {
    #[serde(flatten)]
    participant: ParticipantFields,
    #[serde(default)]
    sequence_number: i64,
    #[serde(default)]
    content_type: String,
    #[serde(rename = "value", default)]
    typing: bool,
}

impl From<TypingIndicatorRecord> for ChatEvent {
    fn from(record: TypingIndicatorRecord) -> Self {
        ChatEvent::TypingIndicator(TypingIndicatorEvent {
            participant: record.participant.into(),
            sequence_number: record.sequence_number,
            content_type: record.content_type,
            typing: record.typing,
        })
    }
}

impl From<&TypingIndicatorEvent> for TypingIndicatorRecord {
    fn from(event: &TypingIndicatorEvent) -> Self {
        Self {
            participant: (&event.participant).into(),
            sequence_number: event.sequence_number,
            content_type: event.content_type.clone(),
            typing: event.typing,
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ParticipantStateChangedRecord {
    #[serde(flatten)]
    participant: ParticipantFields,
    #[serde(default)]
    sequence_number: i64,
    #[serde(default)]
    conversation_sequence_number: i64,
}

impl From<ParticipantStateChangedRecord> for ChatEvent {
    fn from(record: ParticipantStateChangedRecord) -> Self {
        ChatEvent::ParticipantStateChanged(ParticipantStateChangedEvent {
            participant: record.participant.into(),
            sequence_number: record.sequence_number,
            conversation_sequence_number: record.conversation_sequence_number,
        })
    }
}

impl From<&ParticipantStateChangedEvent> for ParticipantStateChangedRecord {
    fn from(event: &ParticipantStateChangedEvent) -> Self {
        Self {
            participant: (&event.participant).into(),
            sequence_number: event.sequence_number,
            conversation_sequence_number: event.conversation_sequence_number,
        }
    }
}

impl ParticipantStateChangedEvent {
    pub fn is_disconnect(&self) -> bool {
        self.participant.state == ParticipantState::Disconnected
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::participant::ParticipantType;
    use serde_json::json;

    #[test]
    fn decodes_text_with_flattened_participant() {
        let event = ChatEvent::from_slice(
            br#"{"type":"text","participantID":"p1","displayName":"Bob","participantType":"Agent","value":"hi"}"#,
        )
        .unwrap();

        let ChatEvent::Text(text) = event else {
            panic!("expected a text event");
        };
        assert_eq!(text.text, "hi");
        assert_eq!(text.participant.id, "p1");
        assert_eq!(text.participant.name, "Bob");
        assert_eq!(text.participant.kind, ParticipantType::Agent);
    }

    #[test]
    fn unknown_discriminator_is_an_error() {
        let error = ChatEvent::from_value(json!({"type": "video", "value": "x"})).unwrap_err();
        assert!(matches!(error, EventError::Unsupported(kind) if kind == "video"));
    }

    #[test]
    fn missing_discriminator_is_an_error() {
        let error = ChatEvent::from_value(json!({"value": "x"})).unwrap_err();
        assert!(matches!(error, EventError::MissingType));
    }

    #[test]
    fn malformed_url_reports_variant() {
        let error = ChatEvent::from_value(json!({"type": "url", "value": "not a url"})).unwrap_err();
        assert!(matches!(error, EventError::Malformed { kind: "url", .. }));
    }

    #[test]
    fn encoding_injects_discriminator() {
        let event = ChatEvent::TypingIndicator(TypingIndicatorEvent {
            participant: Participant::new("p2", "", ParticipantType::Unspecified),
            sequence_number: 4,
            content_type: "application/x-typing".to_string(),
            typing: true,
        });

        let value = event.to_value().unwrap();
        assert_eq!(value["type"], "typingIndicator");
        assert_eq!(value["participantID"], "p2");
        assert_eq!(value["value"], true);
        assert_eq!(value["sequenceNumber"], 4);
        assert!(value.get("participant").is_none());
    }

    #[test]
    fn displays_like_the_event_content() {
        let event = ChatEvent::TypingIndicator(TypingIndicatorEvent::default());
        assert_eq!(event.to_string(), "not typing");
        assert_eq!(ChatEvent::stop("c1").to_string(), "chat c1 stopped");
    }
}
