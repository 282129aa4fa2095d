//! Channel registry and selection.
//!
//! Channel configurations name a platform, an enabled flag, and an opaque
//! credential mapping. [`resolve_channels`] turns the configured set into
//! constructed adapters for one event, excluding disabled entries, entries
//! with incomplete credentials, and platforms no adapter exists for. The
//! last case is a loud error: an operator enabled something that can never
//! deliver.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::notify::discord::DiscordChannel;
use crate::notify::facebook::FacebookChannel;
use crate::notify::slack::SlackChannel;
use crate::notify::telegram::TelegramChannel;
use crate::notify::NotificationChannel;

/// Closed set of known platforms plus an explicit escape hatch for
/// configuration typos and not-yet-supported keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelKind {
    Telegram,
    Facebook,
    Discord,
    Slack,
    Unknown(String),
}

impl ChannelKind {
    pub fn parse(key: &str) -> Self {
        match key.trim().to_ascii_lowercase().as_str() {
            "telegram" => ChannelKind::Telegram,
            "facebook" => ChannelKind::Facebook,
            "discord" => ChannelKind::Discord,
            "slack" => ChannelKind::Slack,
            _ => ChannelKind::Unknown(key.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ChannelKind::Telegram => "telegram",
            ChannelKind::Facebook => "facebook",
            ChannelKind::Discord => "discord",
            ChannelKind::Slack => "slack",
            ChannelKind::Unknown(key) => key,
        }
    }

    /// Every platform an adapter exists for.
    pub fn known() -> [ChannelKind; 4] {
        [
            ChannelKind::Telegram,
            ChannelKind::Facebook,
            ChannelKind::Discord,
            ChannelKind::Slack,
        ]
    }

    /// Credential fields that must be present (and non-empty) before the
    /// adapter is dispatched.
    pub fn required_fields(&self) -> &'static [&'static str] {
        match self {
            ChannelKind::Telegram => &["botToken", "chatId"],
            ChannelKind::Facebook => &["pageId", "accessToken"],
            ChannelKind::Discord | ChannelKind::Slack => &["webhookUrl"],
            ChannelKind::Unknown(_) => &[],
        }
    }
}

/// One stored channel configuration, as read from the config source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelConfig {
    pub platform: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub credentials: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

fn default_enabled() -> bool {
    true
}

impl ChannelConfig {
    pub fn new(platform: impl Into<String>, credentials: BTreeMap<String, String>) -> Self {
        Self {
            platform: platform.into(),
            enabled: true,
            credentials,
            updated_at: None,
        }
    }

    pub fn kind(&self) -> ChannelKind {
        ChannelKind::parse(&self.platform)
    }

    /// A credential value, treating empty strings as absent.
    pub fn credential(&self, field: &str) -> Option<&str> {
        self.credentials
            .get(field)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// Required fields this config does not carry a usable value for.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        self.kind()
            .required_fields()
            .iter()
            .copied()
            .filter(|field| self.credential(field).is_none())
            .collect()
    }
}

/// Why a configured channel was left out of a dispatch.
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    Disabled,
    MissingCredentials(Vec<&'static str>),
    UnknownPlatform,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedChannel {
    pub platform: String,
    pub reason: SkipReason,
}

/// Adapters to invoke for one event, plus everything that was excluded.
pub struct Resolution {
    pub channels: Vec<Arc<dyn NotificationChannel>>,
    pub skipped: Vec<SkippedChannel>,
}

/// Resolve the configured set into ready adapters. The snapshot is taken
/// per event; stale reads within one event are fine.
pub fn resolve_channels(configs: &[ChannelConfig], http: &reqwest::Client) -> Resolution {
    let mut channels: Vec<Arc<dyn NotificationChannel>> = Vec::new();
    let mut skipped = Vec::new();

    for config in configs {
        if !config.enabled {
            tracing::debug!(platform = %config.platform, "channel disabled, skipping");
            skipped.push(SkippedChannel {
                platform: config.platform.clone(),
                reason: SkipReason::Disabled,
            });
            continue;
        }

        let missing = config.missing_fields();
        if !missing.is_empty() {
            tracing::debug!(
                platform = %config.platform,
                missing = ?missing,
                "channel not fully configured, skipping"
            );
            skipped.push(SkippedChannel {
                platform: config.platform.clone(),
                reason: SkipReason::MissingCredentials(missing),
            });
            continue;
        }

        let owned = |field: &str| {
            config
                .credential(field)
                .unwrap_or_default()
                .to_string()
        };

        let channel: Arc<dyn NotificationChannel> = match config.kind() {
            ChannelKind::Unknown(_) => {
                tracing::error!(
                    platform = %config.platform,
                    "enabled channel has no adapter, it will never deliver"
                );
                skipped.push(SkippedChannel {
                    platform: config.platform.clone(),
                    reason: SkipReason::UnknownPlatform,
                });
                continue;
            }
            ChannelKind::Telegram => {
                let mut adapter =
                    TelegramChannel::new(http.clone(), owned("botToken"), owned("chatId"));
                if let Some(base) = config.credential("apiBase") {
                    adapter = adapter.with_api_base(base);
                }
                Arc::new(adapter)
            }
            ChannelKind::Facebook => {
                let mut adapter =
                    FacebookChannel::new(http.clone(), owned("pageId"), owned("accessToken"));
                if let Some(base) = config.credential("apiBase") {
                    adapter = adapter.with_api_base(base);
                }
                Arc::new(adapter)
            }
            ChannelKind::Discord => {
                Arc::new(DiscordChannel::new(http.clone(), owned("webhookUrl")))
            }
            ChannelKind::Slack => Arc::new(SlackChannel::new(http.clone(), owned("webhookUrl"))),
        };
        channels.push(channel);
    }

    Resolution { channels, skipped }
}
