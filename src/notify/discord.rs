//! Discord webhook channel.
//!
//! Posts one embed per event: the post title links to the article; a feature
//! image, when present, is attached to the same embed rather than sent as a
//! second call.

use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use super::{NotificationChannel, DEFAULT_SEND_TIMEOUT};
use crate::event::CanonicalPost;

#[derive(Clone)]
pub struct DiscordChannel {
    webhook_url: String,
    client: Client,
    timeout: Duration,
}

impl DiscordChannel {
    pub fn new(client: Client, webhook_url: String) -> Self {
        Self {
            webhook_url,
            client,
            timeout: DEFAULT_SEND_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }
}

#[async_trait]
impl NotificationChannel for DiscordChannel {
    fn platform(&self) -> &'static str {
        "discord"
    }

    async fn send(&self, post: &CanonicalPost) -> Result<()> {
        if self.webhook_url.is_empty() {
            return Err(anyhow!("Discord configuration missing"));
        }

        let payload = DiscordWebhookPayload::for_post(post);

        let rsp = self
            .client
            .post(&self.webhook_url)
            .timeout(self.timeout)
            .json(&payload)
            .send()
            .await
            .map_err(|e| anyhow!("Discord webhook request failed: {e}"))?;

        if let Err(e) = rsp.error_for_status_ref() {
            return Err(anyhow!("Discord webhook HTTP error: {e}"));
        }
        Ok(())
    }
}

#[derive(Serialize)]
struct DiscordEmbed {
    title: String,
    description: String,
    url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    image: Option<DiscordImage>,
}

#[derive(Serialize)]
struct DiscordImage {
    url: String,
}

#[derive(Serialize)]
struct DiscordWebhookPayload {
    content: Option<String>,
    embeds: Vec<DiscordEmbed>,
}

impl DiscordWebhookPayload {
    fn for_post(post: &CanonicalPost) -> Self {
        let description = if post.excerpt.is_empty() {
            format!("👤 {}", post.author_line())
        } else {
            format!("{}\n\n👤 {}", post.excerpt, post.author_line())
        };

        Self {
            content: Some("📝 New post published!".to_string()),
            embeds: vec![DiscordEmbed {
                title: post.title.clone(),
                description,
                url: post.url.clone(),
                image: post
                    .feature_image
                    .clone()
                    .map(|url| DiscordImage { url }),
            }],
        }
    }
}
