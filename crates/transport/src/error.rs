use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("service unavailable")]
    ServiceUnavailable,
    #[error("request failed with HTTP {status}: {reason}")]
    Status { status: u16, reason: String },
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("invalid endpoint url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("no endpoint configured")]
    NoEndpoint,
    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("unable to read certificate {path}: {source}")]
    Certificate {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl TransportError {
    /// True for the HTTP 503 condition that triggers endpoint failover.
    pub fn is_service_unavailable(&self) -> bool {
        matches!(self, Self::ServiceUnavailable)
    }
}
