use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::TransportError;

pub const APPLICATION_JSON: &str = "application/json";
pub const OCTET_STREAM: &str = "application/octet-stream";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

/// A call relative to the currently selected endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub method: Option<Method>,
    pub path: String,
    pub payload: Option<Value>,
    pub accept: Option<String>,
}

impl Request {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: None,
            path: path.into(),
            payload: None,
            accept: None,
        }
    }

    pub fn post(path: impl Into<String>, payload: Value) -> Self {
        Self {
            method: None,
            path: path.into(),
            payload: Some(payload),
            accept: None,
        }
    }

    #[must_use]
    pub fn with_method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    #[must_use]
    pub fn with_accept(mut self, accept: impl Into<String>) -> Self {
        self.accept = Some(accept.into());
        self
    }

    /// The explicit method, else POST when a payload is present, else GET.
    pub fn effective_method(&self) -> Method {
        match (self.method, &self.payload) {
            (Some(method), _) => method,
            (None, Some(_)) => Method::Post,
            (None, None) => Method::Get,
        }
    }

    pub fn effective_accept(&self) -> &str {
        self.accept.as_deref().unwrap_or(APPLICATION_JSON)
    }
}

#[derive(Debug, Clone)]
pub struct Response {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Bytes,
}

impl Response {
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, TransportError> {
        Ok(serde_json::from_slice(&self.body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn method_follows_payload_unless_explicit() {
        assert_eq!(Request::get("/chat/poll/p1").effective_method(), Method::Get);
        assert_eq!(
            Request::post("/chat/reconnect", json!({"chatID": "c1"})).effective_method(),
            Method::Post
        );
        assert_eq!(
            Request::get("/chat/exit/p1")
                .with_method(Method::Post)
                .effective_method(),
            Method::Post
        );
    }

    #[test]
    fn accept_defaults_to_json() {
        assert_eq!(Request::get("/x").effective_accept(), APPLICATION_JSON);
        assert_eq!(
            Request::get("/x").with_accept(OCTET_STREAM).effective_accept(),
            OCTET_STREAM
        );
    }
}
