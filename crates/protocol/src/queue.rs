//! Queue lookups.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::status::Status;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum QueueType {
    Station,
    User,
    #[default]
    Workgroup,
}

impl QueueType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Station => "Station",
            Self::User => "User",
            Self::Workgroup => "Workgroup",
        }
    }
}

impl fmt::Display for QueueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid queue type: {0}")]
pub struct InvalidQueueType(pub String);

impl std::str::FromStr for QueueType {
    type Err = InvalidQueueType;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "workgroup" => Ok(Self::Workgroup),
            "user" => Ok(Self::User),
            "station" => Ok(Self::Station),
            _ => Err(InvalidQueueType(value.to_string())),
        }
    }
}

impl Serialize for QueueType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for QueueType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// A queue a chat can be routed to, identified by name and type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueRef {
    pub name: String,
    pub kind: QueueType,
}

impl QueueRef {
    pub fn new(name: impl Into<String>, kind: QueueType) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

impl fmt::Display for QueueRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} Queue:{}", self.kind, self.name)
    }
}

/// Current state of a queue as reported by the service.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Queue {
    #[serde(rename = "queueName", default)]
    pub name: String,
    #[serde(rename = "queueType", default)]
    pub kind: QueueType,
    /// Estimated wait, as reported by the service.
    #[serde(default)]
    pub estimated_wait_time: i64,
    /// Suggested poll interval in milliseconds.
    #[serde(default)]
    pub poll_wait_suggestion: i64,
    #[serde(rename = "agentsAvailable", default)]
    pub available_agents: i64,
    pub status: Status,
}

#[derive(Debug, Clone, Serialize)]
pub struct QueueQuery<'a> {
    #[serde(rename = "queueName")]
    pub name: &'a str,
    #[serde(rename = "queueType")]
    pub kind: QueueType,
    pub participant: QueryParticipant<'a>,
}

#[derive(Debug, Clone, Serialize)]
pub struct QueryParticipant<'a> {
    pub name: &'a str,
}

impl<'a> QueueQuery<'a> {
    pub fn anonymous(name: &'a str, kind: QueueType) -> Self {
        Self {
            name,
            kind,
            participant: QueryParticipant {
                name: "Anonymous User",
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct QueueEnvelope {
    pub queue: Queue,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queue_type_parses_case_insensitively() {
        assert_eq!("WORKGROUP".parse::<QueueType>().unwrap(), QueueType::Workgroup);
        assert_eq!("user".parse::<QueueType>().unwrap(), QueueType::User);
        assert_eq!("Station".parse::<QueueType>().unwrap(), QueueType::Station);
        assert_eq!("".parse::<QueueType>().unwrap(), QueueType::Workgroup);
        assert!("lobby".parse::<QueueType>().is_err());
    }

    #[test]
    fn queue_query_serializes_anonymous_participant() {
        let query = QueueQuery::anonymous("Line", QueueType::Workgroup);
        assert_eq!(
            serde_json::to_value(&query).unwrap(),
            serde_json::json!({
                "queueName": "Line",
                "queueType": "Workgroup",
                "participant": {"name": "Anonymous User"}
            })
        );
    }

    #[test]
    fn queue_decodes_service_payload() {
        let envelope: QueueEnvelope = serde_json::from_str(
            r#"{"queue":{"agentsAvailable":2,"estimatedWaitTime":1,"pollWaitSuggestion":2000,"status":{"type":"success"}}}"#,
        )
        .unwrap();
        assert_eq!(envelope.queue.available_agents, 2);
        assert_eq!(envelope.queue.poll_wait_suggestion, 2000);
        assert_eq!(envelope.queue.kind, QueueType::Workgroup);
        assert!(envelope.queue.status.is_ok());
    }
}
