//! Telegram chat-bot channel.
//!
//! Sends through the Bot API: `sendMessage` for text-only posts, `sendPhoto`
//! with a caption when the post carries a feature image. Both paths use the
//! legacy `Markdown` parse mode, so free-text fields are escaped once via
//! [`escape_markdown`]; the post URL is left raw inside the inline link.

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use super::{NotificationChannel, DEFAULT_SEND_TIMEOUT};
use crate::event::CanonicalPost;
use crate::markdown::escape_markdown;

pub const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

#[derive(Clone)]
pub struct TelegramChannel {
    bot_token: String,
    chat_id: String,
    api_base: String,
    client: Client,
    timeout: Duration,
}

impl TelegramChannel {
    pub fn new(client: Client, bot_token: String, chat_id: String) -> Self {
        Self {
            bot_token,
            chat_id,
            api_base: TELEGRAM_API_BASE.to_string(),
            client,
            timeout: DEFAULT_SEND_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }

    /// Point the channel at a different API host (tests, proxies).
    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into();
        self
    }
}

#[async_trait]
impl NotificationChannel for TelegramChannel {
    fn platform(&self) -> &'static str {
        "telegram"
    }

    async fn send(&self, post: &CanonicalPost) -> Result<()> {
        if self.bot_token.is_empty() || self.chat_id.is_empty() {
            return Err(anyhow!("Telegram configuration missing"));
        }

        let (url, payload) = if let Some(image) = &post.feature_image {
            (
                format!("{}/bot{}/sendPhoto", self.api_base, self.bot_token),
                json!({
                    "chat_id": self.chat_id,
                    "photo": image,
                    "caption": photo_caption(post),
                    "parse_mode": "Markdown",
                }),
            )
        } else {
            (
                format!("{}/bot{}/sendMessage", self.api_base, self.bot_token),
                json!({
                    "chat_id": self.chat_id,
                    "text": message_text(post),
                    "parse_mode": "Markdown",
                    "disable_web_page_preview": false,
                }),
            )
        };

        let rsp = self
            .client
            .post(&url)
            .timeout(self.timeout)
            .json(&payload)
            .send()
            .await
            .context("telegram post")?;

        let body: TelegramResponse = rsp.json().await.context("telegram response body")?;
        if !body.ok {
            return Err(anyhow!(
                "Telegram API error: {}",
                body.description.unwrap_or_else(|| "unknown".to_string())
            ));
        }
        Ok(())
    }
}

#[derive(Deserialize)]
struct TelegramResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

fn message_text(post: &CanonicalPost) -> String {
    format!(
        "📝 *New post published!*\n\n*{}*\n\n{}\n\n👤 Author: {}\n🔗 [Read the post]({})",
        escape_markdown(&post.title),
        escape_markdown(&post.excerpt),
        escape_markdown(&post.author_line()),
        post.url
    )
}

// The photo caption drops the heading and the "Author:" label.
fn photo_caption(post: &CanonicalPost) -> String {
    format!(
        "📝 *{}*\n\n{}\n\n👤 {}\n🔗 [Read the post]({})",
        escape_markdown(&post.title),
        escape_markdown(&post.excerpt),
        escape_markdown(&post.author_line()),
        post.url
    )
}
