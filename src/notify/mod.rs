//! Notification channels.
//!
//! One adapter per external platform. Each adapter turns a [`CanonicalPost`]
//! into its platform-specific payload and performs exactly one outbound HTTP
//! call per delivery; a feature image switches the endpoint, it does not add
//! a second call. Failures never cross the trait boundary: [`deliver`]
//! converts them into a [`ChannelResult`] so one channel's outcome cannot
//! affect another.
//!
//! [`deliver`]: NotificationChannel::deliver

pub mod discord;
pub mod facebook;
pub mod slack;
pub mod telegram;

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::event::CanonicalPost;

/// Default per-call HTTP timeout for all adapters.
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Terminal state of one delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum DeliveryOutcome {
    Success,
    Error { message: String },
}

impl DeliveryOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryOutcome::Success => "success",
            DeliveryOutcome::Error { .. } => "error",
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            DeliveryOutcome::Success => None,
            DeliveryOutcome::Error { message } => Some(message),
        }
    }
}

/// Per-channel result of one dispatched event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelResult {
    pub platform: String,
    #[serde(flatten)]
    pub outcome: DeliveryOutcome,
}

impl ChannelResult {
    pub fn success(platform: impl Into<String>) -> Self {
        Self {
            platform: platform.into(),
            outcome: DeliveryOutcome::Success,
        }
    }

    pub fn failure(platform: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            platform: platform.into(),
            outcome: DeliveryOutcome::Error {
                message: message.into(),
            },
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome == DeliveryOutcome::Success
    }
}

/// One external notification destination.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    /// Stable platform key ("telegram", "facebook", ...).
    fn platform(&self) -> &'static str;

    /// Single delivery attempt. May fail; never retried.
    async fn send(&self, post: &CanonicalPost) -> anyhow::Result<()>;

    /// Total wrapper around [`send`](Self::send): errors become a failed
    /// [`ChannelResult`] instead of propagating.
    async fn deliver(&self, post: &CanonicalPost) -> ChannelResult {
        match self.send(post).await {
            Ok(()) => {
                tracing::info!(platform = self.platform(), "notification sent");
                ChannelResult::success(self.platform())
            }
            Err(err) => {
                tracing::warn!(platform = self.platform(), error = ?err, "notification failed");
                ChannelResult::failure(self.platform(), format!("{err:#}"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_result_serializes_flat() {
        let ok = ChannelResult::success("telegram");
        assert_eq!(
            serde_json::to_value(&ok).expect("serialize"),
            serde_json::json!({ "platform": "telegram", "status": "success" })
        );

        let failed = ChannelResult::failure("facebook", "token expired");
        assert_eq!(
            serde_json::to_value(&failed).expect("serialize"),
            serde_json::json!({
                "platform": "facebook",
                "status": "error",
                "message": "token expired",
            })
        );
    }

    #[test]
    fn outcome_accessors() {
        assert!(ChannelResult::success("slack").is_success());
        let failed = ChannelResult::failure("slack", "410 gone");
        assert!(!failed.is_success());
        assert_eq!(failed.outcome.as_str(), "error");
        assert_eq!(failed.outcome.error_message(), Some("410 gone"));
    }
}
