//! Scripted [`RequestSender`] for exercising callers without a network.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::Value;
use tokio::time::Instant;
use url::Url;

use crate::error::TransportError;
use crate::request::{Method, Request, Response, APPLICATION_JSON};
use crate::sender::RequestSender;

#[derive(Debug, Clone)]
pub enum MockReply {
    Json(Value),
    Body { content_type: String, body: Bytes },
    Unavailable,
    HttpStatus(u16),
    /// Holds the inner reply back for `delay` before answering.
    Delayed { delay: Duration, reply: Box<MockReply> },
}

impl MockReply {
    pub fn delayed(delay: Duration, reply: MockReply) -> Self {
        Self::Delayed {
            delay,
            reply: Box::new(reply),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub endpoint: Url,
    pub method: Method,
    pub path: String,
    pub payload: Option<Value>,
    pub accept: String,
    pub at: Instant,
}

#[derive(Debug)]
struct Script {
    method: Method,
    path_prefix: String,
    replies: Vec<MockReply>,
}

#[derive(Debug, Default)]
struct State {
    scripts: Vec<Script>,
    calls: Vec<RecordedCall>,
}

/// Replies are matched by method and path prefix, first registered first.
///
/// Each script hands out its replies in order and repeats the last one once
/// the queue is down to a single reply. Unmatched calls fail with HTTP 404.
#[derive(Debug, Clone, Default)]
pub struct MockSender {
    state: Arc<Mutex<State>>,
}

impl MockSender {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn on(&self, method: Method, path_prefix: impl Into<String>, reply: MockReply) -> &Self {
        self.on_sequence(method, path_prefix, vec![reply])
    }

    pub fn on_sequence(
        &self,
        method: Method,
        path_prefix: impl Into<String>,
        replies: Vec<MockReply>,
    ) -> &Self {
        let path_prefix = path_prefix.into();
        let mut state = self.lock();
        if let Some(existing) = state
            .scripts
            .iter_mut()
            .find(|script| script.method == method && script.path_prefix == path_prefix)
        {
            existing.replies = replies;
        } else {
            state.scripts.push(Script {
                method,
                path_prefix,
                replies,
            });
        }
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.lock().calls.clone()
    }

    pub fn calls_to(&self, path_prefix: &str) -> Vec<RecordedCall> {
        self.lock()
            .calls
            .iter()
            .filter(|call| call.path.starts_with(path_prefix))
            .cloned()
            .collect()
    }

    pub fn call_count(&self) -> usize {
        self.lock().calls.len()
    }
}

#[async_trait]
impl RequestSender for MockSender {
    async fn send(&self, endpoint: &Url, request: Request) -> Result<Response, TransportError> {
        let method = request.effective_method();
        let reply = {
            let mut state = self.lock();
            state.calls.push(RecordedCall {
                endpoint: endpoint.clone(),
                method,
                path: request.path.clone(),
                payload: request.payload.clone(),
                accept: request.effective_accept().to_string(),
                at: Instant::now(),
            });
            state
                .scripts
                .iter_mut()
                .find(|script| script.method == method && request.path.starts_with(&script.path_prefix))
                .and_then(|script| {
                    if script.replies.len() > 1 {
                        Some(script.replies.remove(0))
                    } else {
                        script.replies.first().cloned()
                    }
                })
        };

        let reply = match reply {
            Some(MockReply::Delayed { delay, reply }) => {
                tokio::time::sleep(delay).await;
                Some(*reply)
            }
            other => other,
        };

        match reply {
            Some(MockReply::Json(value)) => Ok(Response {
                status: 200,
                content_type: Some(APPLICATION_JSON.to_string()),
                body: Bytes::from(serde_json::to_vec(&value)?),
            }),
            Some(MockReply::Body { content_type, body }) => Ok(Response {
                status: 200,
                content_type: Some(content_type),
                body,
            }),
            Some(MockReply::Unavailable) => Err(TransportError::ServiceUnavailable),
            Some(MockReply::HttpStatus(status)) => Err(TransportError::Status {
                status,
                reason: "scripted failure".to_string(),
            }),
            Some(MockReply::Delayed { .. }) => Err(TransportError::Status {
                status: 500,
                reason: "nested delayed replies are not supported".to_string(),
            }),
            None => Err(TransportError::Status {
                status: 404,
                reason: format!("no scripted reply for {} {}", method.as_str(), request.path),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn endpoint() -> Url {
        Url::parse("https://primary/websvcs").unwrap()
    }

    #[tokio::test]
    async fn replays_sequence_then_repeats_last() {
        let sender = MockSender::new();
        sender.on_sequence(
            Method::Get,
            "/chat/poll/",
            vec![MockReply::Unavailable, MockReply::Json(json!({"n": 1}))],
        );

        let first = sender.send(&endpoint(), Request::get("/chat/poll/p1")).await;
        assert!(first.unwrap_err().is_service_unavailable());

        for _ in 0..2 {
            let value: Value = sender
                .send(&endpoint(), Request::get("/chat/poll/p1"))
                .await
                .unwrap()
                .json()
                .unwrap();
            assert_eq!(value, json!({"n": 1}));
        }
        assert_eq!(sender.call_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn delayed_reply_answers_after_its_delay() {
        let sender = MockSender::new();
        sender.on(
            Method::Get,
            "/chat/poll/",
            MockReply::delayed(Duration::from_millis(500), MockReply::Json(json!({"n": 2}))),
        );

        let started = Instant::now();
        let value: Value = sender
            .send(&endpoint(), Request::get("/chat/poll/p1"))
            .await
            .unwrap()
            .json()
            .unwrap();
        assert_eq!(value, json!({"n": 2}));
        assert!(started.elapsed() >= Duration::from_millis(500));
        assert_eq!(sender.calls()[0].at, started);
    }

    #[tokio::test]
    async fn unmatched_call_is_recorded_and_fails() {
        let sender = MockSender::new();
        let error = sender
            .send(&endpoint(), Request::post("/chat/exit/p1", json!({})))
            .await
            .unwrap_err();
        assert!(matches!(error, TransportError::Status { status: 404, .. }));

        let calls = sender.calls_to("/chat/exit");
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].method, Method::Post);
        assert_eq!(calls[0].endpoint, endpoint());
    }
}
