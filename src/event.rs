//! Inbound webhook payload normalization.
//!
//! Ghost posts a `{ post: { current: { ... } } }` document on publish events.
//! [`normalize`] validates that shape and produces the [`CanonicalPost`] every
//! channel adapter consumes. Unpublished revisions (drafts, scheduled posts)
//! are a distinguished skip, not an error.

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Payload failed shape validation. Maps to a 400 at the API boundary.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("payload has no post object")]
    MissingPost,
    #[error("post has no current revision")]
    MissingCurrent,
}

/// Channel-agnostic description of one published post. Built once per event
/// and shared read-only across every adapter invocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CanonicalPost {
    pub id: String,
    pub title: String,
    pub url: String,
    pub excerpt: String,
    pub feature_image: Option<String>,
    pub published_at: Option<String>,
    pub authors: Vec<String>,
}

impl CanonicalPost {
    /// Author names joined for display. An empty author list renders as the
    /// literal `Unknown`.
    pub fn author_line(&self) -> String {
        if self.authors.is_empty() {
            "Unknown".to_string()
        } else {
            self.authors.join(", ")
        }
    }
}

/// Outcome of payload normalization.
#[derive(Debug, Clone, PartialEq)]
pub enum Normalized {
    Published(CanonicalPost),
    NotPublished { title: String, status: String },
}

/// Validate the inbound payload and extract the canonical post.
pub fn normalize(payload: &Value) -> Result<Normalized, ValidationError> {
    let post = payload
        .get("post")
        .and_then(Value::as_object)
        .ok_or(ValidationError::MissingPost)?;
    let current = post
        .get("current")
        .and_then(Value::as_object)
        .ok_or(ValidationError::MissingCurrent)?;

    let status = str_field(current, "status");
    if status != "published" {
        return Ok(Normalized::NotPublished {
            title: str_field(current, "title"),
            status,
        });
    }

    let excerpt = nonempty_field(current, "excerpt")
        .or_else(|| nonempty_field(current, "custom_excerpt"))
        .unwrap_or_default();

    let authors = current
        .get("authors")
        .and_then(Value::as_array)
        .map(|authors| {
            authors
                .iter()
                .filter_map(|a| a.get("name").and_then(Value::as_str))
                .filter(|name| !name.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    Ok(Normalized::Published(CanonicalPost {
        id: str_field(current, "id"),
        title: str_field(current, "title"),
        url: str_field(current, "url"),
        excerpt,
        feature_image: nonempty_field(current, "feature_image"),
        published_at: nonempty_field(current, "published_at"),
        authors,
    }))
}

fn str_field(obj: &serde_json::Map<String, Value>, key: &str) -> String {
    obj.get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn nonempty_field(obj: &serde_json::Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
