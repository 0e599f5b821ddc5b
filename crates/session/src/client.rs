use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::{debug, info};
use url::Url;

use webchat_config::SessionConfig;
use webchat_protocol::{
    ChatEnvelope, QueueEnvelope, QueueQuery, QueueType, Queue, ServerConfiguration,
    ServerConfigurationEnvelope, StartChatOptions, StartChatRequest, StartChatResponse,
};
use webchat_transport::{EndpointRotator, Request, RequestSender, Response, TransportError};

use crate::error::{ChatError, ChatResult};
use crate::session::{ChatInfo, ChatSession};

/// Request sender bound to the rotating set of endpoints.
#[derive(Clone)]
pub(crate) struct Connection {
    sender: Arc<dyn RequestSender>,
    endpoints: Arc<EndpointRotator>,
}

impl Connection {
    pub(crate) fn endpoints(&self) -> &EndpointRotator {
        &self.endpoints
    }

    pub(crate) fn current_endpoint(&self) -> Url {
        self.endpoints.current().clone()
    }

    pub(crate) async fn send(&self, request: Request) -> Result<Response, TransportError> {
        let endpoint = self.current_endpoint();
        self.sender.send(&endpoint, request).await
    }

    pub(crate) async fn call<T: DeserializeOwned>(&self, request: Request) -> ChatResult<T> {
        Ok(self.send(request).await?.json()?)
    }
}

pub(crate) fn payload<T: Serialize>(body: &T) -> ChatResult<Value> {
    Ok(serde_json::to_value(body)?)
}

/// Entry point to the web chat service.
///
/// Holds the request sender and the endpoint list shared by every chat it
/// starts, so a switchover performed by one chat also applies to the
/// lookups issued afterwards.
#[derive(Clone)]
pub struct Client {
    connection: Connection,
    language: String,
    session: SessionConfig,
}

impl Client {
    pub fn new(sender: Arc<dyn RequestSender>, endpoints: EndpointRotator) -> Self {
        Self {
            connection: Connection {
                sender,
                endpoints: Arc::new(endpoints),
            },
            language: "en-us".to_string(),
            session: SessionConfig::default(),
        }
    }

    #[must_use]
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    #[must_use]
    pub fn with_session_config(mut self, session: SessionConfig) -> Self {
        self.session = session;
        self
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn endpoints(&self) -> &EndpointRotator {
        self.connection.endpoints()
    }

    /// Starts a chat on the requested queue and spawns its poll task.
    ///
    /// A failed status from the service is returned as [`ChatError::Status`]
    /// and no session is created.
    pub async fn start_chat(&self, options: StartChatOptions) -> ChatResult<ChatSession> {
        let language = options
            .language
            .clone()
            .unwrap_or_else(|| self.language.clone());
        let body = payload(&StartChatRequest::new(&options, &language))?;

        info!(
            queue = %options.queue,
            guest = %options.guest.name,
            endpoint = %self.connection.current_endpoint(),
            "starting chat"
        );
        let envelope: ChatEnvelope<StartChatResponse> = self
            .connection
            .call(Request::post("/chat/start", body))
            .await?;
        let started = envelope.chat;
        started.status.clone().into_result()?;

        if started.chat_id.is_empty() || started.participant_id.is_empty() {
            return Err(ChatError::NotConnected);
        }

        let info = ChatInfo::new(options, language, &started);
        debug!(
            chat_id = %started.chat_id,
            participant_id = %started.participant_id,
            suggested_ms = started.poll_wait_suggestion,
            poll_interval_ms = info.poll_interval.as_millis() as u64,
            "chat started"
        );

        Ok(ChatSession::spawn(
            self.connection.clone(),
            info,
            started.participant_id,
            &self.session,
        ))
    }

    /// Queue status as seen by an anonymous user.
    pub async fn query_queue(&self, name: &str, kind: QueueType) -> ChatResult<Queue> {
        let body = payload(&QueueQuery::anonymous(name, kind))?;
        let envelope: QueueEnvelope = self
            .connection
            .call(Request::post("/queue/query", body))
            .await?;

        let mut queue = envelope.queue;
        queue.status.clone().into_result()?;
        queue.name = name.to_string();
        queue.kind = kind;
        Ok(queue)
    }

    pub async fn server_configuration(&self) -> ChatResult<ServerConfiguration> {
        let entries: Vec<ServerConfigurationEnvelope> = self
            .connection
            .call(Request::get("/serverConfiguration"))
            .await?;

        entries
            .into_iter()
            .next()
            .map(|entry| entry.configuration)
            .ok_or(ChatError::EmptyServerConfiguration)
    }
}
