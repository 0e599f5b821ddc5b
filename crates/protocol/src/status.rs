//! Outcome envelope embedded in every response of the web services.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Reason reported when the service no longer knows the chat.
pub const REASON_UNKNOWN_SESSION: &str = "error.websvc.unknownEntity.session";
/// Reason used when an operation needs a connected chat.
pub const REASON_NOT_CONNECTED: &str = "error.websvc.entity.notconnected";
/// Reason used when the current endpoint cannot serve requests.
pub const REASON_SERVICE_UNAVAILABLE: &str = "error.websvc.serviceUnavailable";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure,
}

/// Success or failure of a remote call, with a dotted reason code on failure.
///
/// Parameters are diagnostic context only: they show up in the error message
/// but never take part in [`Status::is_a`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "StatusRecord", into = "StatusRecord")]
pub struct Status {
    outcome: Outcome,
    reason: String,
    parameters: Vec<(String, String)>,
}

impl Status {
    pub fn success() -> Self {
        Self {
            outcome: Outcome::Success,
            reason: String::new(),
            parameters: Vec::new(),
        }
    }

    pub fn failure(reason: impl Into<String>) -> Self {
        Self {
            outcome: Outcome::Failure,
            reason: reason.into(),
            parameters: Vec::new(),
        }
    }

    pub fn unknown_session() -> Self {
        Self::failure(REASON_UNKNOWN_SESSION)
    }

    pub fn not_connected() -> Self {
        Self::failure(REASON_NOT_CONNECTED)
    }

    pub fn service_unavailable() -> Self {
        Self::failure(REASON_SERVICE_UNAVAILABLE)
    }

    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn parameters(&self) -> &[(String, String)] {
        &self.parameters
    }

    pub fn is_ok(&self) -> bool {
        self.outcome == Outcome::Success
    }

    /// Compares outcome and reason, ignoring parameters.
    pub fn is_a(&self, reference: &Status) -> bool {
        self.outcome == reference.outcome && self.reason == reference.reason
    }

    /// Returns a copy of this status carrying one more diagnostic parameter.
    #[must_use]
    pub fn with_parameter(&self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let mut status = self.clone();
        status.parameters.push((key.into(), value.into()));
        status
    }

    pub fn as_error(&self) -> Option<StatusError> {
        if self.is_ok() {
            return None;
        }
        Some(StatusError {
            reason: self.reason.clone(),
            parameters: self.parameters.clone(),
        })
    }

    pub fn into_result(self) -> Result<(), StatusError> {
        match self.outcome {
            Outcome::Success => Ok(()),
            Outcome::Failure => Err(StatusError {
                reason: self.reason,
                parameters: self.parameters,
            }),
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.outcome {
            Outcome::Success => f.write_str("success"),
            Outcome::Failure => f.write_str(&self.reason),
        }
    }
}

/// A failed [`Status`] converted into an error value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusError {
    reason: String,
    parameters: Vec<(String, String)>,
}

impl StatusError {
    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn parameters(&self) -> &[(String, String)] {
        &self.parameters
    }

    pub fn is_a(&self, reference: &Status) -> bool {
        !reference.is_ok() && self.reason == reference.reason
    }

    pub fn to_status(&self) -> Status {
        Status {
            outcome: Outcome::Failure,
            reason: self.reason.clone(),
            parameters: self.parameters.clone(),
        }
    }
}

impl fmt::Display for StatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.reason)?;
        if !self.parameters.is_empty() {
            let context = self
                .parameters
                .iter()
                .map(|(key, value)| format!("{key}={value}"))
                .collect::<Vec<_>>()
                .join(", ");
            write!(f, " ({context})")?;
        }
        Ok(())
    }
}

impl std::error::Error for StatusError {}

#[derive(Serialize, Deserialize)]
struct StatusRecord {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    reason: String,
}

impl From<StatusRecord> for Status {
    fn from(record: StatusRecord) -> Self {
        let outcome = if record.kind == "success" {
            Outcome::Success
        } else {
            Outcome::Failure
        };
        Self {
            outcome,
            reason: record.reason,
            parameters: Vec::new(),
        }
    }
}

impl From<Status> for StatusRecord {
    fn from(status: Status) -> Self {
        let kind = match status.outcome {
            Outcome::Success => "success",
            Outcome::Failure => "failure",
        };
        Self {
            kind: kind.to_string(),
            reason: status.reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_ok_only_for_success_type() {
        let ok: Status = serde_json::from_str(r#"{"type":"success","reason":""}"#).unwrap();
        assert!(ok.is_ok());
        assert!(ok.as_error().is_none());

        let failed: Status =
            serde_json::from_str(r#"{"type":"failure","reason":"error.websvc.content.invalid"}"#)
                .unwrap();
        assert!(!failed.is_ok());
        assert_eq!(failed.reason(), "error.websvc.content.invalid");

        let odd: Status = serde_json::from_str(r#"{"type":"pending"}"#).unwrap();
        assert!(!odd.is_ok());
    }

    #[test]
    fn is_a_ignores_parameters() {
        let tagged = Status::unknown_session().with_parameter("chat", "abc");
        assert!(tagged.is_a(&Status::unknown_session()));
        assert!(!tagged.is_a(&Status::not_connected()));
        assert!(!Status::success().is_a(&Status::unknown_session()));
        assert!(Status::success().is_a(&Status::success()));
    }

    #[test]
    fn with_parameter_leaves_original_untouched() {
        let original = Status::not_connected();
        let tagged = original.with_parameter("chat", "42");
        assert!(original.parameters().is_empty());
        assert_eq!(tagged.parameters(), &[("chat".to_string(), "42".to_string())]);
    }

    #[test]
    fn error_message_lists_parameters() {
        let error = Status::unknown_session()
            .with_parameter("chat", "42")
            .with_parameter("participant", "p1")
            .into_result()
            .unwrap_err();
        assert_eq!(
            error.to_string(),
            "error.websvc.unknownEntity.session (chat=42, participant=p1)"
        );
        assert!(error.is_a(&Status::unknown_session()));
        assert!(Status::success().into_result().is_ok());
    }

    #[test]
    fn serializes_to_wire_shape() {
        let json = serde_json::to_value(Status::not_connected().with_parameter("a", "b")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"type": "failure", "reason": "error.websvc.entity.notconnected"})
        );
    }
}
