//! Chat participants and their wire projections.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::status::Status;

/// Identifier the service uses for messages authored by the system itself.
pub const SYSTEM_PARTICIPANT_ID: &str = "00000000-0000-0000-0000-000000000000";

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ParticipantType {
    Agent,
    WebUser,
    System,
    #[default]
    Unspecified,
    Other(String),
}

impl ParticipantType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Agent => "Agent",
            Self::WebUser => "WebUser",
            Self::System => "System",
            Self::Unspecified => "",
            Self::Other(value) => value,
        }
    }
}

impl From<String> for ParticipantType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "Agent" => Self::Agent,
            "WebUser" => Self::WebUser,
            "System" => Self::System,
            "" => Self::Unspecified,
            _ => Self::Other(value),
        }
    }
}

impl From<ParticipantType> for String {
    fn from(value: ParticipantType) -> Self {
        match value {
            ParticipantType::Other(value) => value,
            other => other.as_str().to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ParticipantState {
    Active,
    Disconnected,
    #[default]
    Unspecified,
    Other(String),
}

impl ParticipantState {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Active => "active",
            Self::Disconnected => "disconnected",
            Self::Unspecified => "",
            Self::Other(value) => value,
        }
    }
}

impl From<String> for ParticipantState {
    fn from(value: String) -> Self {
        match value.as_str() {
            "active" => Self::Active,
            "disconnected" => Self::Disconnected,
            "" => Self::Unspecified,
            _ => Self::Other(value),
        }
    }
}

impl From<ParticipantState> for String {
    fn from(value: ParticipantState) -> Self {
        match value {
            ParticipantState::Other(value) => value,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for ParticipantState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Any party attached to a chat: the guest, an agent, or the system.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Participant {
    pub id: String,
    pub name: String,
    pub kind: ParticipantType,
    pub state: ParticipantState,
    pub picture: Option<String>,
}

impl Participant {
    pub fn new(id: impl Into<String>, name: impl Into<String>, kind: ParticipantType) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            ..Self::default()
        }
    }

    /// The well-known system participant. It is never looked up remotely.
    pub fn system() -> Self {
        Self {
            id: SYSTEM_PARTICIPANT_ID.to_string(),
            name: "System".to_string(),
            kind: ParticipantType::System,
            state: ParticipantState::Active,
            picture: None,
        }
    }

    pub fn is_system(&self) -> bool {
        self.id == SYSTEM_PARTICIPANT_ID
    }

    pub fn is_active(&self) -> bool {
        self.state == ParticipantState::Active
    }

    pub fn is_disconnected(&self) -> bool {
        self.state == ParticipantState::Disconnected
    }
}

impl fmt::Display for Participant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}

/// Participant fields as they appear flattened at the top level of an event
/// record, or as the elements of a participant list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct ParticipantFields {
    #[serde(rename = "participantID", default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(
        rename = "displayName",
        alias = "participantName",
        alias = "name",
        default,
        skip_serializing_if = "String::is_empty"
    )]
    pub name: String,
    #[serde(
        rename = "participantType",
        default,
        skip_serializing_if = "is_unspecified_type"
    )]
    pub kind: ParticipantType,
    #[serde(default, skip_serializing_if = "is_unspecified_state")]
    pub state: ParticipantState,
    #[serde(rename = "photo", default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
}

fn is_unspecified_type(kind: &ParticipantType) -> bool {
    *kind == ParticipantType::Unspecified
}

fn is_unspecified_state(state: &ParticipantState) -> bool {
    *state == ParticipantState::Unspecified
}

impl From<ParticipantFields> for Participant {
    fn from(fields: ParticipantFields) -> Self {
        Self {
            id: fields.id,
            name: fields.name,
            kind: fields.kind,
            state: fields.state,
            picture: fields.picture,
        }
    }
}

impl From<&Participant> for ParticipantFields {
    fn from(participant: &Participant) -> Self {
        Self {
            id: participant.id.clone(),
            name: participant.name.clone(),
            kind: participant.kind.clone(),
            state: participant.state.clone(),
            picture: participant.picture.clone(),
        }
    }
}

/// Body of a party information lookup.
#[derive(Debug, Clone, Deserialize)]
pub struct PartyInfo {
    #[serde(rename = "participantID", default)]
    id: String,
    #[serde(alias = "displayName", default)]
    name: String,
    #[serde(rename = "participantType", default)]
    kind: ParticipantType,
    #[serde(default)]
    state: ParticipantState,
    #[serde(rename = "photo", default)]
    picture: Option<String>,
    pub status: Status,
}

impl PartyInfo {
    pub fn into_parts(self) -> (Participant, Status) {
        let participant = Participant {
            id: self.id,
            name: self.name,
            kind: self.kind,
            state: self.state,
            picture: self.picture,
        };
        (participant, self.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_type_survives_round_trip() {
        let kind: ParticipantType = serde_json::from_str(r#""Supervisor""#).unwrap();
        assert_eq!(kind, ParticipantType::Other("Supervisor".to_string()));
        assert_eq!(serde_json::to_string(&kind).unwrap(), r#""Supervisor""#);
    }

    #[test]
    fn state_parses_known_values() {
        let state: ParticipantState = serde_json::from_str(r#""disconnected""#).unwrap();
        assert_eq!(state, ParticipantState::Disconnected);
        let state: ParticipantState = serde_json::from_str(r#""active""#).unwrap();
        assert_eq!(state, ParticipantState::Active);
    }

    #[test]
    fn system_participant_is_recognised() {
        let system = Participant::system();
        assert!(system.is_system());
        assert_eq!(system.kind, ParticipantType::System);
        assert!(!Participant::new("p1", "Bob", ParticipantType::Agent).is_system());
    }

    #[test]
    fn party_info_accepts_name_field() {
        let info: PartyInfo = serde_json::from_str(
            r#"{"name":"Administrator","photo":"/img/admin.png","status":{"type":"success"}}"#,
        )
        .unwrap();
        let (participant, status) = info.into_parts();
        assert!(status.is_ok());
        assert_eq!(participant.name, "Administrator");
        assert_eq!(participant.picture.as_deref(), Some("/img/admin.png"));
    }
}
