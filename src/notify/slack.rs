//! Slack incoming-webhook channel.
//!
//! Text-only: Slack unfurls the post link itself, so there is no separate
//! image path.

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;

use super::{NotificationChannel, DEFAULT_SEND_TIMEOUT};
use crate::event::CanonicalPost;

#[derive(Clone)]
pub struct SlackChannel {
    webhook_url: String,
    client: Client,
    timeout: Duration,
}

impl SlackChannel {
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
impl NotificationChannel for SlackChannel {
    fn platform(&self) -> &'static str {
        "slack"
    }

    async fn send(&self, post: &CanonicalPost) -> Result<()> {
        if self.webhook_url.is_empty() {
            return Err(anyhow!("Slack configuration missing"));
        }

        let body = serde_json::json!({ "text": message_text(post) });

        self.client
            .post(&self.webhook_url)
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .context("slack post")?
            .error_for_status()
            .context("slack non-2xx")?;
        Ok(())
    }
}

fn message_text(post: &CanonicalPost) -> String {
    let mut text = format!("📝 *New post published!*\n*{}*", post.title);
    if !post.excerpt.is_empty() {
        text.push('\n');
        text.push_str(&post.excerpt);
    }
    text.push_str(&format!(
        "\n👤 {}\n🔗 <{}|Read the post>",
        post.author_line(),
        post.url
    ));
    text
}
