//! Test plan for the `webchat-config` crate.
//!
//! These tests exercise the configuration loader across default handling,
//! file discovery, environment overrides, and validation behaviour.

use std::fs;
use std::path::{Path, PathBuf};

use serial_test::serial;
use tempfile::TempDir;

use webchat_config::{load, AppConfig, ClientConfig, SessionConfig};

const ENV_VARS_TO_RESET: &[&str] = &[
    "WEBCHAT_CONFIG",
    "WEBCHAT__CLIENT__PRIMARY_URL",
    "WEBCHAT__CLIENT__BACKUP_URL",
    "WEBCHAT__CLIENT__LANGUAGE",
    "WEBCHAT__CLIENT__REQUEST_TIMEOUT_SECONDS",
    "WEBCHAT__CLIENT__USER_AGENT",
    "WEBCHAT__CLIENT__PROXY_URL",
    "WEBCHAT__CLIENT__CA_CERT_PATH",
    "WEBCHAT__SESSION__EVENT_BUFFER",
    "WEBCHAT__SESSION__COMMAND_BUFFER",
];

struct TestContext {
    vars: Vec<(String, Option<String>)>,
    original_dir: Option<PathBuf>,
}

impl TestContext {
    fn new() -> Self {
        Self {
            vars: Vec::new(),
            original_dir: None,
        }
    }

    fn reset_environment(&mut self) {
        for key in ENV_VARS_TO_RESET {
            self.remove_var(key);
        }
    }

    fn set_var(&mut self, key: &str, value: impl AsRef<str>) {
        let previous = std::env::var(key).ok();
        std::env::set_var(key, value.as_ref());
        self.vars.push((key.to_string(), previous));
    }

    fn remove_var(&mut self, key: &str) {
        let previous = std::env::var(key).ok();
        std::env::remove_var(key);
        self.vars.push((key.to_string(), previous));
    }

    fn set_current_dir(&mut self, dir: &Path) {
        if self.original_dir.is_none() {
            self.original_dir =
                Some(std::env::current_dir().expect("failed to capture current directory"));
        }
        std::env::set_current_dir(dir).expect("failed to set current directory");
    }
}

impl Drop for TestContext {
    fn drop(&mut self) {
        if let Some(original) = self.original_dir.take() {
            let _ = std::env::set_current_dir(original);
        }

        while let Some((key, value)) = self.vars.pop() {
            match value {
                Some(val) => std::env::set_var(&key, val),
                None => std::env::remove_var(&key),
            }
        }
    }
}

fn write_config_file(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("failed to create config directories");
    }
    fs::write(path, contents).expect("failed to write config file");
}

#[test]
#[serial]
fn load_uses_default_values_when_no_files_found() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let mut ctx = TestContext::new();
    ctx.reset_environment();
    ctx.set_current_dir(temp_dir.path());

    let config = load().expect("configuration load should succeed without files");
    let defaults = AppConfig::default();

    assert_eq!(config.client.primary_url, defaults.client.primary_url);
    assert_eq!(config.client.backup_url, None);
    assert_eq!(config.client.language, defaults.client.language);
    assert_eq!(
        config.client.request_timeout_seconds,
        defaults.client.request_timeout_seconds
    );
    assert_eq!(config.session.event_buffer, defaults.session.event_buffer);
    assert_eq!(config.session.command_buffer, defaults.session.command_buffer);
}

#[test]
#[serial]
fn load_picks_first_available_file_in_search_order() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let mut ctx = TestContext::new();
    ctx.reset_environment();
    ctx.set_current_dir(temp_dir.path());

    write_config_file(
        temp_dir.path(),
        "webchat.toml",
        r#"
        [client]
        language = "fr-fr"
        "#,
    );
    write_config_file(
        temp_dir.path(),
        "config/webchat.toml",
        r#"
        [client]
        language = "de-de"
        "#,
    );

    let config = load().expect("configuration load should pick the first file");
    assert_eq!(config.client.language, "fr-fr");
}

#[test]
#[serial]
fn load_merges_partial_file_with_defaults() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let mut ctx = TestContext::new();
    ctx.reset_environment();
    ctx.set_current_dir(temp_dir.path());

    write_config_file(
        temp_dir.path(),
        "config/webchat.toml",
        r#"
        [client]
        backup_url = "https://backup.example.com:3508/websvcs"

        [session]
        event_buffer = 16
        "#,
    );

    let config = load().expect("configuration load should succeed");
    let defaults = AppConfig::default();

    assert_eq!(
        config.client.backup_url.as_deref(),
        Some("https://backup.example.com:3508/websvcs")
    );
    assert_eq!(config.client.primary_url, defaults.client.primary_url);
    assert_eq!(config.session.event_buffer, 16);
    assert_eq!(config.session.command_buffer, defaults.session.command_buffer);
    assert_eq!(config.client.endpoint_urls().len(), 2);
}

#[test]
#[serial]
fn load_honours_explicit_config_path() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let mut ctx = TestContext::new();
    ctx.reset_environment();
    ctx.set_current_dir(temp_dir.path());

    write_config_file(
        temp_dir.path(),
        "elsewhere/custom.toml",
        r#"
        [client]
        primary_url = "https://primary.example.com/websvcs"
        "#,
    );
    ctx.set_var(
        "WEBCHAT_CONFIG",
        temp_dir.path().join("elsewhere/custom.toml").display().to_string(),
    );

    let config = load().expect("configuration load should read WEBCHAT_CONFIG");
    assert_eq!(config.client.primary_url, "https://primary.example.com/websvcs");
}

#[test]
#[serial]
fn load_applies_environment_overrides() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let mut ctx = TestContext::new();
    ctx.reset_environment();
    ctx.set_current_dir(temp_dir.path());

    write_config_file(
        temp_dir.path(),
        "webchat.toml",
        r#"
        [client]
        request_timeout_seconds = 10
        "#,
    );

    ctx.set_var("WEBCHAT__CLIENT__REQUEST_TIMEOUT_SECONDS", "45");
    ctx.set_var("WEBCHAT__CLIENT__BACKUP_URL", "https://backup.local/websvcs");

    let config = load().expect("configuration load should honour env overrides");
    assert_eq!(config.client.request_timeout_seconds, 45);
    assert_eq!(
        config.client.backup_url.as_deref(),
        Some("https://backup.local/websvcs")
    );
}

#[test]
#[serial]
fn load_replaces_zero_buffers_with_defaults() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let mut ctx = TestContext::new();
    ctx.reset_environment();
    ctx.set_current_dir(temp_dir.path());

    ctx.set_var("WEBCHAT__SESSION__EVENT_BUFFER", "0");

    let config = load().expect("configuration load should succeed");
    assert_eq!(config.session.event_buffer, SessionConfig::default().event_buffer);
}

#[test]
#[serial]
fn load_errors_on_invalid_toml_contents() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let mut ctx = TestContext::new();
    ctx.reset_environment();
    ctx.set_current_dir(temp_dir.path());

    write_config_file(
        temp_dir.path(),
        "webchat.toml",
        r#"
        [client]
        request_timeout_seconds = "not-a-number
        "#,
    );

    let error = load().expect_err("invalid TOML should cause load to fail");
    let message = error.to_string();
    assert!(
        message.contains("invalid configuration") || message.contains("unable to build configuration"),
        "unexpected error message: {message}"
    );
}

#[test]
fn client_config_defaults_have_no_optional_transport_settings() {
    let defaults = ClientConfig::default();
    assert!(defaults.proxy_url.is_none());
    assert!(defaults.ca_cert_path.is_none());
    assert_eq!(defaults.language, "en-us");
}

#[test]
fn session_config_defaults_match_expected_capacities() {
    let defaults = SessionConfig::default();
    assert_eq!(defaults.event_buffer, 256);
    assert_eq!(defaults.command_buffer, 32);
}
