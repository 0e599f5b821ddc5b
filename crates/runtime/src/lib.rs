use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use tracing::info;
use webchat_config::AppConfig;
use webchat_session::Client;
use webchat_transport::{EndpointRotator, ReqwestSender, SenderSettings};

pub mod telemetry {
    use anyhow::Result;
    use tracing::Level;
    use tracing_subscriber::{fmt::SubscriberBuilder, EnvFilter};

    pub fn init_tracing() -> Result<()> {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        let subscriber = SubscriberBuilder::default()
            .with_max_level(Level::INFO)
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .finish();

        tracing::subscriber::set_global_default(subscriber)
            .map_err(|error| anyhow::anyhow!("failed to set tracing subscriber: {error}"))
    }
}

pub fn sender_settings(config: &AppConfig) -> SenderSettings {
    SenderSettings {
        timeout: Duration::from_secs(config.client.request_timeout_seconds),
        user_agent: config.client.user_agent.clone(),
        proxy_url: config.client.proxy_url.clone(),
        ca_cert_path: config.client.ca_cert_path.clone(),
    }
}

/// Builds a [`Client`] talking to the configured endpoints over HTTP.
pub fn build_client(config: &AppConfig) -> Result<Client> {
    let urls = config.client.endpoint_urls();
    let endpoints =
        EndpointRotator::from_strs(&urls).context("invalid web services endpoint")?;
    let sender =
        ReqwestSender::new(&sender_settings(config)).context("failed to build http client")?;

    info!(
        primary = %endpoints.endpoints()[0],
        backup = endpoints.has_backup(),
        language = %config.client.language,
        "web chat client ready"
    );

    Ok(Client::new(Arc::new(sender), endpoints)
        .with_language(config.client.language.clone())
        .with_session_config(config.session.clone()))
}

pub async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::warn!(?error, "failed to listen for shutdown signal");
    }
    info!("shutdown signal received");
}
