use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::debug;

const DEFAULT_CONFIG_FILES: &[&str] = &[
    "webchat.toml",
    "config/webchat.toml",
    "../webchat.toml",
    "../config/webchat.toml",
];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub client: ClientConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

/// Connection settings for the web services endpoints.
///
/// ```
/// use webchat_config::ClientConfig;
///
/// let client = ClientConfig::default();
/// assert_eq!(client.primary_url, "https://localhost:3508/websvcs");
/// assert!(client.backup_url.is_none());
/// assert_eq!(client.request_timeout_seconds, 30);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default = "ClientConfig::default_primary_url")]
    pub primary_url: String,
    #[serde(default)]
    pub backup_url: Option<String>,
    #[serde(default = "ClientConfig::default_language")]
    pub language: String,
    #[serde(default = "ClientConfig::default_request_timeout")]
    pub request_timeout_seconds: u64,
    #[serde(default = "ClientConfig::default_user_agent")]
    pub user_agent: String,
    #[serde(default)]
    pub proxy_url: Option<String>,
    #[serde(default)]
    pub ca_cert_path: Option<String>,
}

impl ClientConfig {
    fn default_primary_url() -> String {
        "https://localhost:3508/websvcs".to_string()
    }

    fn default_language() -> String {
        "en-us".to_string()
    }

    const fn default_request_timeout() -> u64 {
        30
    }

    fn default_user_agent() -> String {
        format!("webchat-session/{}", env!("CARGO_PKG_VERSION"))
    }

    /// Primary endpoint first, then the backup when one is configured.
    pub fn endpoint_urls(&self) -> Vec<String> {
        std::iter::once(self.primary_url.clone())
            .chain(
                self.backup_url
                    .iter()
                    .filter(|url| !url.trim().is_empty())
                    .cloned(),
            )
            .collect()
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            primary_url: Self::default_primary_url(),
            backup_url: None,
            language: Self::default_language(),
            request_timeout_seconds: Self::default_request_timeout(),
            user_agent: Self::default_user_agent(),
            proxy_url: None,
            ca_cert_path: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Capacity of the outbound event stream; the oldest events are dropped past it.
    #[serde(default = "SessionConfig::default_event_buffer")]
    pub event_buffer: usize,
    #[serde(default = "SessionConfig::default_command_buffer")]
    pub command_buffer: usize,
}

impl SessionConfig {
    const fn default_event_buffer() -> usize {
        256
    }

    const fn default_command_buffer() -> usize {
        32
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            event_buffer: Self::default_event_buffer(),
            command_buffer: Self::default_command_buffer(),
        }
    }
}

fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// Load the client configuration by combining defaults, files, and environment overrides.
///
/// ```
/// use webchat_config::load;
///
/// std::env::remove_var("WEBCHAT_CONFIG");
///
/// let config = load().expect("configuration should load with defaults");
/// assert!(!config.client.primary_url.is_empty());
/// ```
pub fn load() -> anyhow::Result<AppConfig> {
    let defaults = AppConfig::default();

    let mut builder = config::Config::builder()
        .set_default("client.primary_url", defaults.client.primary_url.clone())?
        .set_default("client.language", defaults.client.language.clone())?
        .set_default(
            "client.request_timeout_seconds",
            to_i64(defaults.client.request_timeout_seconds),
        )?
        .set_default("client.user_agent", defaults.client.user_agent.clone())?
        .set_default(
            "session.event_buffer",
            to_i64(defaults.session.event_buffer as u64),
        )?
        .set_default(
            "session.command_buffer",
            to_i64(defaults.session.command_buffer as u64),
        )?;

    let environment_overrides = config::Environment::with_prefix("WEBCHAT").separator("__");

    let mut config_file_attached = false;

    if let Ok(path) = std::env::var("WEBCHAT_CONFIG") {
        builder = builder.add_source(config::File::from(PathBuf::from(&path)));
        config_file_attached = true;
        debug!(path, "loading configuration via WEBCHAT_CONFIG");
    } else if let Ok(cwd) = std::env::current_dir() {
        let fallback = DEFAULT_CONFIG_FILES
            .iter()
            .map(|candidate| cwd.join(candidate))
            .find(|path| path.exists());

        if let Some(path) = fallback {
            debug!(path = %path.display(), "loading configuration file");
            builder = builder.add_source(config::File::from(path));
            config_file_attached = true;
        }
    }

    if !config_file_attached {
        debug!("no configuration file found, relying on defaults and environment overrides");
    }

    builder = builder.add_source(environment_overrides);

    let cfg = builder.build().context("unable to build configuration")?;

    let mut config = cfg
        .try_deserialize::<AppConfig>()
        .context("invalid configuration")?;

    if config.session.event_buffer == 0 {
        config.session.event_buffer = SessionConfig::default_event_buffer();
    }
    if config.session.command_buffer == 0 {
        config.session.command_buffer = SessionConfig::default_command_buffer();
    }

    debug!(?config, "loaded client configuration");
    Ok(config)
}
