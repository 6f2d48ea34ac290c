use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::error::{MonitorError, Result};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MonitorConfig {
    #[serde(default)]
    pub target: TargetConfig,
    #[serde(default = "default_status_file")]
    pub status_file: PathBuf,
    #[serde(default)]
    pub display_name: Option<DisplayNameConfig>,
    #[serde(default)]
    pub zulip: Option<ZulipConfig>,
    #[serde(default)]
    pub discord_webhook_url: Option<String>,
    #[serde(default = "default_notify_timeout")]
    pub notify_timeout_ms: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TargetConfig {
    #[serde(default)]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_probe_timeout")]
    pub timeout_ms: u64,
}

/// How the human-readable name of the target is obtained.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum DisplayNameConfig {
    /// Log in over SSH and run `hostname`.
    Ssh {
        username: String,
        #[serde(default)]
        password: Option<String>,
        #[serde(default)]
        private_key: Option<PathBuf>,
        #[serde(default = "default_lookup_timeout")]
        timeout_ms: u64,
    },
    ReverseDns {
        #[serde(default = "default_lookup_timeout")]
        timeout_ms: u64,
    },
    Static { name: String },
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct ZulipConfig {
    #[serde(default)]
    pub site: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub stream: String,
    #[serde(default)]
    pub topic: String,
}

fn default_status_file() -> PathBuf { PathBuf::from("status.txt") }
fn default_port() -> u16 { 22 }
fn default_probe_timeout() -> u64 { 3000 }
fn default_lookup_timeout() -> u64 { 5000 }
fn default_notify_timeout() -> u64 { 10_000 }

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: default_port(),
            timeout_ms: default_probe_timeout(),
        }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            target: TargetConfig::default(),
            status_file: default_status_file(),
            display_name: None,
            zulip: None,
            discord_webhook_url: None,
            notify_timeout_ms: default_notify_timeout(),
        }
    }
}

/// Loads an env file into the process environment. A missing file is only an
/// error when it was asked for explicitly; a file that exists but cannot be read
/// or parsed always is.
pub fn load_env_file(path: &Path, required: bool) -> Result<()> {
    match dotenvy::from_path(path) {
        Ok(()) => Ok(()),
        Err(e) if e.not_found() && !required => {
            debug!(path = %path.display(), "No env file, using the process environment");
            Ok(())
        }
        Err(e) => Err(MonitorError::Config(format!(
            "Failed to load env file {}: {}",
            path.display(),
            e
        ))),
    }
}

impl MonitorConfig {
    /// Read `path` if it exists, layer environment overrides on top and validate.
    pub fn load<F>(path: &Path, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path).map_err(|e| {
                MonitorError::Config(format!("Failed to read {}: {}", path.display(), e))
            })?;
            serde_json::from_str(&content).map_err(|e| {
                MonitorError::Config(format!("Failed to parse {}: {}", path.display(), e))
            })?
        } else {
            debug!(path = %path.display(), "Config file not found, using environment only");
            MonitorConfig::default()
        };

        config.apply_env(env)?;
        config.validate()?;
        Ok(config)
    }

    pub fn apply_env<F>(&mut self, env: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = env("VM_HOST") {
            self.target.host = host;
        }
        if let Some(port) = env("VM_PORT") {
            self.target.port = parse_var("VM_PORT", &port)?;
        }
        if let Some(timeout) = env("PROBE_TIMEOUT_MS") {
            self.target.timeout_ms = parse_var("PROBE_TIMEOUT_MS", &timeout)?;
        }
        if let Some(path) = env("STATUS_FILE") {
            self.status_file = PathBuf::from(path);
        }
        if let Some(url) = env("DISCORD_WEBHOOK_URL") {
            self.discord_webhook_url = Some(url);
        }

        let zulip_vars = [
            ("ZULIP_SITE", env("ZULIP_SITE")),
            ("ZULIP_EMAIL", env("ZULIP_EMAIL")),
            ("ZULIP_API_KEY", env("ZULIP_API_KEY")),
            ("STREAM", env("STREAM")),
            ("TOPIC", env("TOPIC")),
        ];
        if zulip_vars.iter().any(|(_, v)| v.is_some()) {
            let zulip = self.zulip.get_or_insert_with(ZulipConfig::default);
            for (name, value) in zulip_vars {
                let Some(value) = value else { continue };
                match name {
                    "ZULIP_SITE" => zulip.site = value,
                    "ZULIP_EMAIL" => zulip.email = value,
                    "ZULIP_API_KEY" => zulip.api_key = value,
                    "STREAM" => zulip.stream = value,
                    _ => zulip.topic = value,
                }
            }
        }

        let password = env("SSH_PASSWORD");
        let key_path = env("SSH_KEY_PATH").map(PathBuf::from);
        if let Some(user) = env("SSH_USER") {
            let (old_password, old_key, timeout_ms) = match self.display_name.take() {
                Some(DisplayNameConfig::Ssh { password, private_key, timeout_ms, .. }) => {
                    (password, private_key, timeout_ms)
                }
                _ => (None, None, default_lookup_timeout()),
            };
            self.display_name = Some(DisplayNameConfig::Ssh {
                username: user,
                password: password.or(old_password),
                private_key: key_path.or(old_key),
                timeout_ms,
            });
        } else if let Some(DisplayNameConfig::Ssh { password: p, private_key: k, .. }) =
            self.display_name.as_mut()
        {
            if password.is_some() {
                *p = password;
            }
            if key_path.is_some() {
                *k = key_path;
            }
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.target.host.trim().is_empty() {
            return Err(MonitorError::Config("target host is not set (VM_HOST)".into()));
        }
        if self.target.port == 0 {
            return Err(MonitorError::Config("target port must be between 1 and 65535".into()));
        }
        if self.target.timeout_ms == 0 || self.notify_timeout_ms == 0 {
            return Err(MonitorError::Config("timeouts must be greater than zero".into()));
        }

        if let Some(zulip) = &self.zulip {
            let missing: Vec<&str> = [
                ("ZULIP_SITE", &zulip.site),
                ("ZULIP_EMAIL", &zulip.email),
                ("ZULIP_API_KEY", &zulip.api_key),
                ("STREAM", &zulip.stream),
                ("TOPIC", &zulip.topic),
            ]
            .into_iter()
            .filter(|(_, v)| v.trim().is_empty())
            .map(|(name, _)| name)
            .collect();
            if !missing.is_empty() {
                return Err(MonitorError::Config(format!(
                    "incomplete Zulip settings, missing: {}",
                    missing.join(", ")
                )));
            }
        }
        if matches!(&self.discord_webhook_url, Some(url) if url.trim().is_empty()) {
            return Err(MonitorError::Config("discord webhook URL is empty".into()));
        }
        if self.zulip.is_none() && self.discord_webhook_url.is_none() {
            return Err(MonitorError::Config(
                "no notification channel configured (set ZULIP_* or DISCORD_WEBHOOK_URL)".into(),
            ));
        }

        match &self.display_name {
            Some(DisplayNameConfig::Ssh { username, password, private_key, timeout_ms }) => {
                if username.trim().is_empty() {
                    return Err(MonitorError::Config("SSH display-name lookup needs a username".into()));
                }
                if password.is_none() && private_key.is_none() {
                    return Err(MonitorError::Config(
                        "SSH display-name lookup needs a password or private key".into(),
                    ));
                }
                if *timeout_ms == 0 {
                    return Err(MonitorError::Config("timeouts must be greater than zero".into()));
                }
            }
            Some(DisplayNameConfig::ReverseDns { timeout_ms }) if *timeout_ms == 0 => {
                return Err(MonitorError::Config("timeouts must be greater than zero".into()));
            }
            Some(DisplayNameConfig::Static { name }) if name.trim().is_empty() => {
                return Err(MonitorError::Config("static display name is empty".into()));
            }
            _ => {}
        }

        Ok(())
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.target.timeout_ms)
    }

    pub fn notify_timeout(&self) -> Duration {
        Duration::from_millis(self.notify_timeout_ms)
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| MonitorError::Config(format!("{} has an invalid value: {:?}", name, value)))
}
