//! Service settings and the channel configuration source.
//!
//! Channel configurations live in a TOML or JSON file (extension-hinted)
//! pointed at by `CHANNELS_CONFIG_PATH`; environment variables supply
//! credentials for platforms the file does not mention. The source is
//! re-read per event, so edits take effect on the next webhook without a
//! restart — each dispatch works from its own snapshot.

use std::collections::BTreeMap;
use std::env;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

use crate::registry::{ChannelConfig, ChannelKind};

pub const ENV_PORT: &str = "PORT";
pub const DEFAULT_PORT: u16 = 3000;

pub const ENV_CHANNELS_CONFIG_PATH: &str = "CHANNELS_CONFIG_PATH";
pub const DEFAULT_CHANNELS_CONFIG_PATH: &str = "config/channels.toml";

pub const ENV_AUDIT_LOG_DIR: &str = "AUDIT_LOG_DIR";
pub const DEFAULT_AUDIT_LOG_DIR: &str = "data";

/// Process-level settings, resolved once at startup.
#[derive(Debug, Clone)]
pub struct Settings {
    pub port: u16,
    pub channels_config_path: PathBuf,
    pub audit_log_dir: PathBuf,
}

impl Settings {
    pub fn from_env() -> Self {
        let port = env::var(ENV_PORT)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_PORT);
        let channels_config_path = env::var(ENV_CHANNELS_CONFIG_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CHANNELS_CONFIG_PATH));
        let audit_log_dir = env::var(ENV_AUDIT_LOG_DIR)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_AUDIT_LOG_DIR));
        Self {
            port,
            channels_config_path,
            audit_log_dir,
        }
    }
}

/// Where channel configurations come from. Listed fresh per event.
#[async_trait]
pub trait ConfigSource: Send + Sync {
    async fn list_configs(&self) -> Result<Vec<ChannelConfig>>;
}

/// File-backed source with an environment overlay.
///
/// The file owns a platform's entry when present; env credentials only
/// supply platforms absent from the file, which preserves the env-only
/// deployment mode when no file exists at all.
pub struct FileConfigSource {
    path: PathBuf,
}

impl FileConfigSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ConfigSource for FileConfigSource {
    async fn list_configs(&self) -> Result<Vec<ChannelConfig>> {
        let mut configs = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => parse_channels(&content, extension_hint(&self.path))
                .with_context(|| format!("parsing channels from {}", self.path.display()))?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("reading channels from {}", self.path.display()));
            }
        };

        for env_config in env_configs() {
            if !configs.iter().any(|c| c.kind() == env_config.kind()) {
                configs.push(env_config);
            }
        }
        Ok(configs)
    }
}

/// Fixed in-memory list, for tests and the demo binary.
pub struct StaticConfigSource {
    configs: Vec<ChannelConfig>,
}

impl StaticConfigSource {
    pub fn new(configs: Vec<ChannelConfig>) -> Self {
        Self { configs }
    }
}

#[async_trait]
impl ConfigSource for StaticConfigSource {
    async fn list_configs(&self) -> Result<Vec<ChannelConfig>> {
        Ok(self.configs.clone())
    }
}

fn extension_hint(path: &Path) -> &str {
    match path.extension().and_then(|s| s.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("json") => "json",
        _ => "toml",
    }
}

#[derive(Deserialize)]
struct ChannelsFile {
    #[serde(default)]
    channels: Vec<ChannelConfig>,
}

fn parse_channels(content: &str, hint: &str) -> Result<Vec<ChannelConfig>> {
    if hint == "json" {
        if let Ok(file) = serde_json::from_str::<ChannelsFile>(content) {
            return Ok(file.channels);
        }
        // Bare array form.
        if let Ok(list) = serde_json::from_str::<Vec<ChannelConfig>>(content) {
            return Ok(list);
        }
        return Err(anyhow!("unsupported JSON channels format"));
    }
    let file: ChannelsFile = toml::from_str(content)?;
    Ok(file.channels)
}

/// Per-platform credential env vars, in the original deployment's names.
const ENV_CREDENTIALS: [(&str, &[(&str, &str)]); 4] = [
    (
        "telegram",
        &[
            ("botToken", "TELEGRAM_BOT_TOKEN"),
            ("chatId", "TELEGRAM_CHAT_ID"),
        ],
    ),
    (
        "facebook",
        &[
            ("pageId", "FACEBOOK_PAGE_ID"),
            ("accessToken", "FACEBOOK_ACCESS_TOKEN"),
        ],
    ),
    ("discord", &[("webhookUrl", "DISCORD_WEBHOOK_URL")]),
    ("slack", &[("webhookUrl", "SLACK_WEBHOOK_URL")]),
];

/// Channel configs built from credential env vars. A platform appears only
/// when at least one of its vars is set; incomplete sets still surface the
/// config so the selector can report what is missing.
fn env_configs() -> Vec<ChannelConfig> {
    let mut configs = Vec::new();
    for (platform, fields) in ENV_CREDENTIALS {
        let mut credentials = BTreeMap::new();
        for (field, var) in fields {
            if let Ok(value) = env::var(var) {
                if !value.trim().is_empty() {
                    credentials.insert(field.to_string(), value.trim().to_string());
                }
            }
        }
        if !credentials.is_empty() {
            debug_assert!(!matches!(
                ChannelKind::parse(platform),
                ChannelKind::Unknown(_)
            ));
            configs.push(ChannelConfig::new(platform, credentials));
        }
    }
    configs
}
