//! Facebook page-posting channel.
//!
//! Publishes to the Graph API: `/feed` for text posts, `/photos` when the
//! post carries a feature image. The photo caption reuses the text message
//! verbatim. Graph reports failures inside a 200 body as `error.message`, so
//! the response is inspected rather than the HTTP status.

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use super::{NotificationChannel, DEFAULT_SEND_TIMEOUT};
use crate::event::CanonicalPost;

pub const FACEBOOK_API_BASE: &str = "https://graph.facebook.com";
const GRAPH_VERSION: &str = "v18.0";

#[derive(Clone)]
pub struct FacebookChannel {
    page_id: String,
    access_token: String,
    api_base: String,
    client: Client,
    timeout: Duration,
}

impl FacebookChannel {
    pub fn new(client: Client, page_id: String, access_token: String) -> Self {
        Self {
            page_id,
            access_token,
            api_base: FACEBOOK_API_BASE.to_string(),
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
impl NotificationChannel for FacebookChannel {
    fn platform(&self) -> &'static str {
        "facebook"
    }

    async fn send(&self, post: &CanonicalPost) -> Result<()> {
        if self.page_id.is_empty() || self.access_token.is_empty() {
            return Err(anyhow!("Facebook configuration missing"));
        }

        let message = post_message(post);
        let (url, payload) = if let Some(image) = &post.feature_image {
            (
                format!(
                    "{}/{}/{}/photos",
                    self.api_base, GRAPH_VERSION, self.page_id
                ),
                json!({
                    "url": image,
                    "caption": message,
                    "access_token": self.access_token,
                }),
            )
        } else {
            (
                format!("{}/{}/{}/feed", self.api_base, GRAPH_VERSION, self.page_id),
                json!({
                    "message": message,
                    "access_token": self.access_token,
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
            .context("facebook post")?;

        let body: FacebookResponse = rsp.json().await.context("facebook response body")?;
        if let Some(error) = body.error {
            return Err(anyhow!("Facebook API error: {}", error.message));
        }
        Ok(())
    }
}

#[derive(Deserialize)]
struct FacebookResponse {
    #[serde(default)]
    error: Option<FacebookError>,
}

#[derive(Deserialize)]
struct FacebookError {
    #[serde(default)]
    message: String,
}

// Plain text, no Markdown: Facebook renders the message as-is.
fn post_message(post: &CanonicalPost) -> String {
    format!(
        "📝 {}\n\n{}\n\n👤 Author: {}\n\nRead the full post at: {}",
        post.title,
        post.excerpt,
        post.author_line(),
        post.url
    )
}
