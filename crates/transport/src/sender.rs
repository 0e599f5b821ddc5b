use std::{path::Path, time::Duration};

use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use tracing::debug;
use url::Url;
use uuid::Uuid;

use crate::error::TransportError;
use crate::request::{Method, Request, Response, APPLICATION_JSON};

/// Issues one request against an endpoint and hands back the raw response.
#[async_trait]
pub trait RequestSender: Send + Sync {
    async fn send(&self, endpoint: &Url, request: Request) -> Result<Response, TransportError>;
}

#[derive(Debug, Clone)]
pub struct SenderSettings {
    pub timeout: Duration,
    pub user_agent: String,
    pub proxy_url: Option<String>,
    pub ca_cert_path: Option<String>,
}

impl Default for SenderSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: format!("webchat-session/{}", env!("CARGO_PKG_VERSION")),
            proxy_url: None,
            ca_cert_path: None,
        }
    }
}

/// [`RequestSender`] backed by a shared reqwest client.
#[derive(Debug, Clone)]
pub struct ReqwestSender {
    client: Client,
}

impl ReqwestSender {
    pub fn new(settings: &SenderSettings) -> Result<Self, TransportError> {
        let mut builder = Client::builder()
            .timeout(settings.timeout)
            .user_agent(settings.user_agent.clone());

        if let Some(proxy) = settings.proxy_url.as_deref() {
            builder = builder.proxy(reqwest::Proxy::all(proxy)?);
        }

        if let Some(path) = settings.ca_cert_path.as_deref() {
            builder = builder.add_root_certificate(load_certificate(Path::new(path))?);
        }

        Ok(Self {
            client: builder.build()?,
        })
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

fn load_certificate(path: &Path) -> Result<reqwest::Certificate, TransportError> {
    let pem = std::fs::read(path).map_err(|source| TransportError::Certificate {
        path: path.display().to_string(),
        source,
    })?;
    Ok(reqwest::Certificate::from_pem(&pem)?)
}

/// Joins a relative path onto the endpoint without dropping the endpoint path.
/// Absolute `http(s)` URLs are used as they are.
pub fn join_path(endpoint: &Url, path: &str) -> Result<Url, TransportError> {
    if path.starts_with("http://") || path.starts_with("https://") {
        return Ok(Url::parse(path)?);
    }
    let base = endpoint.as_str().trim_end_matches('/');
    let path = path.trim_start_matches('/');
    Ok(Url::parse(&format!("{base}/{path}"))?)
}

#[async_trait]
impl RequestSender for ReqwestSender {
    async fn send(&self, endpoint: &Url, request: Request) -> Result<Response, TransportError> {
        let url = join_path(endpoint, &request.path)?;
        let method = request.effective_method();
        let request_id = Uuid::new_v4();

        let mut builder = match method {
            Method::Get => self.client.get(url.clone()),
            Method::Post => self.client.post(url.clone()),
        }
        .header(header::ACCEPT, request.effective_accept())
        .header("X-Request-Id", request_id.to_string());

        if let Some(payload) = &request.payload {
            builder = builder
                .header(header::CONTENT_TYPE, APPLICATION_JSON)
                .body(serde_json::to_vec(payload)?);
        }

        let started = tokio::time::Instant::now();
        let response = builder.send().await?;
        let status = response.status();
        debug!(
            method = method.as_str(),
            %url,
            %request_id,
            status = status.as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "web service request completed"
        );

        if status == StatusCode::SERVICE_UNAVAILABLE {
            return Err(TransportError::ServiceUnavailable);
        }
        if status.is_client_error() || status.is_server_error() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("unknown").to_string(),
            });
        }

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = response.bytes().await?;

        Ok(Response {
            status: status.as_u16(),
            content_type,
            body,
        })
    }
}
