//! Append-only audit trail.
//!
//! Every accepted webhook event opens a `processing` entry under a fresh
//! event id; channel outcomes and the terminal status are appended later
//! under the same id. Nothing is ever updated in place: readers fold the
//! entries per event id, latest status wins. Identity fields and the raw
//! payload come from the opening entry.
//!
//! Two stores implement the contract: an in-memory one for tests and demos,
//! and a JSONL-backed one that appends one JSON document per line and
//! replays both files on startup.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::event::CanonicalPost;
use crate::notify::{ChannelResult, DeliveryOutcome};

/// Lifecycle state carried by one event entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum EventStatus {
    Processing,
    Success,
    Error { message: String },
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Processing => "processing",
            EventStatus::Success => "success",
            EventStatus::Error { .. } => "error",
        }
    }

    fn error_message(&self) -> Option<&str> {
        match self {
            EventStatus::Error { message } => Some(message),
            _ => None,
        }
    }
}

/// One append in an event's lifecycle. The opening entry carries the raw
/// payload; terminal entries only carry the status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEventEntry {
    pub event_id: String,
    pub post_id: String,
    pub post_title: String,
    pub post_url: String,
    #[serde(flatten)]
    pub status: EventStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    pub created_at: DateTime<Utc>,
}

/// One channel outcome, referencing its event by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditChannelEntry {
    pub event_id: String,
    pub platform: String,
    #[serde(flatten)]
    pub outcome: DeliveryOutcome,
    pub created_at: DateTime<Utc>,
}

/// Folded, read-side view of one event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditEventView {
    pub id: String,
    pub post_id: String,
    pub post_title: String,
    pub post_url: String,
    pub status: String,
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditChannelView {
    pub platform: String,
    pub status: String,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Event view plus its channel outcomes, for the by-id endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditEventDetail {
    #[serde(flatten)]
    pub log: AuditEventView,
    pub notifications: Vec<AuditChannelView>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WebhookStats {
    pub total: u64,
    pub processing: u64,
    pub success: u64,
    pub error: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlatformStats {
    pub platform: String,
    pub total: u64,
    pub success: u64,
    pub error: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditStats {
    #[serde(rename = "webhookStats")]
    pub webhook: WebhookStats,
    #[serde(rename = "notificationStats")]
    pub notifications: Vec<PlatformStats>,
}

/// Append/read contract shared by the stores. Appends are the only writes;
/// duplicate appends per event id are valid and folded by the readers.
#[async_trait]
pub trait AuditStore: Send + Sync {
    async fn append_event(&self, entry: AuditEventEntry) -> Result<()>;
    async fn append_channel(&self, entry: AuditChannelEntry) -> Result<()>;

    /// Folded events, newest first.
    async fn events(&self, limit: usize, offset: usize) -> Result<Vec<AuditEventView>>;
    async fn event(&self, event_id: &str) -> Result<Option<AuditEventDetail>>;
    async fn stats(&self) -> Result<AuditStats>;
}

// ---------- folding ----------

fn event_view(entry: &AuditEventEntry) -> AuditEventView {
    AuditEventView {
        id: entry.event_id.clone(),
        post_id: entry.post_id.clone(),
        post_title: entry.post_title.clone(),
        post_url: entry.post_url.clone(),
        status: entry.status.as_str().to_string(),
        error_message: entry.status.error_message().map(str::to_string),
        payload: entry.payload.clone(),
        created_at: entry.created_at,
    }
}

/// Fold entries per event id: identity and payload from the first entry,
/// status from the last. Returns first-appearance order.
fn fold_events(entries: &[AuditEventEntry]) -> Vec<AuditEventView> {
    let mut order: Vec<&str> = Vec::new();
    let mut folded: HashMap<&str, AuditEventView> = HashMap::new();

    for entry in entries {
        match folded.get_mut(entry.event_id.as_str()) {
            None => {
                order.push(&entry.event_id);
                folded.insert(&entry.event_id, event_view(entry));
            }
            Some(view) => {
                view.status = entry.status.as_str().to_string();
                view.error_message = entry.status.error_message().map(str::to_string);
            }
        }
    }

    order
        .into_iter()
        .filter_map(|id| folded.remove(id))
        .collect()
}

fn channel_view(entry: &AuditChannelEntry) -> AuditChannelView {
    AuditChannelView {
        platform: entry.platform.clone(),
        status: entry.outcome.as_str().to_string(),
        error_message: entry.outcome.error_message().map(str::to_string),
        created_at: entry.created_at,
    }
}

fn list_page(entries: &[AuditEventEntry], limit: usize, offset: usize) -> Vec<AuditEventView> {
    fold_events(entries)
        .into_iter()
        .rev()
        .skip(offset)
        .take(limit)
        .collect()
}

fn lookup_event(
    events: &[AuditEventEntry],
    channels: &[AuditChannelEntry],
    event_id: &str,
) -> Option<AuditEventDetail> {
    let own: Vec<AuditEventEntry> = events
        .iter()
        .filter(|e| e.event_id == event_id)
        .cloned()
        .collect();
    let log = fold_events(&own).into_iter().next()?;
    let notifications = channels
        .iter()
        .filter(|c| c.event_id == event_id)
        .map(channel_view)
        .collect();
    Some(AuditEventDetail { log, notifications })
}

fn compute_stats(events: &[AuditEventEntry], channels: &[AuditChannelEntry]) -> AuditStats {
    let mut webhook = WebhookStats::default();
    for view in fold_events(events) {
        webhook.total += 1;
        match view.status.as_str() {
            "success" => webhook.success += 1,
            "error" => webhook.error += 1,
            _ => webhook.processing += 1,
        }
    }

    let mut per_platform: std::collections::BTreeMap<&str, PlatformStats> =
        std::collections::BTreeMap::new();
    for entry in channels {
        let stats = per_platform
            .entry(entry.platform.as_str())
            .or_insert_with(|| PlatformStats {
                platform: entry.platform.clone(),
                total: 0,
                success: 0,
                error: 0,
            });
        stats.total += 1;
        match entry.outcome {
            DeliveryOutcome::Success => stats.success += 1,
            DeliveryOutcome::Error { .. } => stats.error += 1,
        }
    }

    AuditStats {
        webhook,
        notifications: per_platform.into_values().collect(),
    }
}

// ---------- in-memory store ----------

/// Mutexed vectors; snapshots are cloned out for folding.
#[derive(Debug, Default)]
pub struct MemoryAuditStore {
    events: Mutex<Vec<AuditEventEntry>>,
    channels: Mutex<Vec<AuditChannelEntry>>,
}

impl MemoryAuditStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn event_snapshot(&self) -> Vec<AuditEventEntry> {
        self.events.lock().expect("audit mutex poisoned").clone()
    }

    fn channel_snapshot(&self) -> Vec<AuditChannelEntry> {
        self.channels.lock().expect("audit mutex poisoned").clone()
    }
}

#[async_trait]
impl AuditStore for MemoryAuditStore {
    async fn append_event(&self, entry: AuditEventEntry) -> Result<()> {
        self.events.lock().expect("audit mutex poisoned").push(entry);
        Ok(())
    }

    async fn append_channel(&self, entry: AuditChannelEntry) -> Result<()> {
        self.channels
            .lock()
            .expect("audit mutex poisoned")
            .push(entry);
        Ok(())
    }

    async fn events(&self, limit: usize, offset: usize) -> Result<Vec<AuditEventView>> {
        Ok(list_page(&self.event_snapshot(), limit, offset))
    }

    async fn event(&self, event_id: &str) -> Result<Option<AuditEventDetail>> {
        Ok(lookup_event(
            &self.event_snapshot(),
            &self.channel_snapshot(),
            event_id,
        ))
    }

    async fn stats(&self) -> Result<AuditStats> {
        Ok(compute_stats(
            &self.event_snapshot(),
            &self.channel_snapshot(),
        ))
    }
}

// ---------- JSONL store ----------

const EVENTS_FILE: &str = "events.jsonl";
const CHANNELS_FILE: &str = "channels.jsonl";

/// Durable store: one JSON document per line, two files, append-only.
/// The in-memory mirror only ever contains rows that reached disk.
pub struct JsonlAuditStore {
    events_path: PathBuf,
    channels_path: PathBuf,
    events: Mutex<Vec<AuditEventEntry>>,
    channels: Mutex<Vec<AuditChannelEntry>>,
}

impl JsonlAuditStore {
    /// Open (or create) the audit directory and replay both logs.
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("create audit dir {}", dir.display()))?;

        let events_path = dir.join(EVENTS_FILE);
        let channels_path = dir.join(CHANNELS_FILE);
        let events = read_jsonl::<AuditEventEntry>(&events_path).await?;
        let channels = read_jsonl::<AuditChannelEntry>(&channels_path).await?;

        tracing::info!(
            dir = %dir.display(),
            events = events.len(),
            channels = channels.len(),
            "audit log replayed"
        );

        Ok(Self {
            events_path,
            channels_path,
            events: Mutex::new(events),
            channels: Mutex::new(channels),
        })
    }

    fn event_snapshot(&self) -> Vec<AuditEventEntry> {
        self.events.lock().expect("audit mutex poisoned").clone()
    }

    fn channel_snapshot(&self) -> Vec<AuditChannelEntry> {
        self.channels.lock().expect("audit mutex poisoned").clone()
    }
}

#[async_trait]
impl AuditStore for JsonlAuditStore {
    async fn append_event(&self, entry: AuditEventEntry) -> Result<()> {
        let line = serde_json::to_string(&entry).context("encode audit event")?;
        append_line(&self.events_path, &line).await?;
        self.events.lock().expect("audit mutex poisoned").push(entry);
        Ok(())
    }

    async fn append_channel(&self, entry: AuditChannelEntry) -> Result<()> {
        let line = serde_json::to_string(&entry).context("encode audit channel entry")?;
        append_line(&self.channels_path, &line).await?;
        self.channels
            .lock()
            .expect("audit mutex poisoned")
            .push(entry);
        Ok(())
    }

    async fn events(&self, limit: usize, offset: usize) -> Result<Vec<AuditEventView>> {
        Ok(list_page(&self.event_snapshot(), limit, offset))
    }

    async fn event(&self, event_id: &str) -> Result<Option<AuditEventDetail>> {
        Ok(lookup_event(
            &self.event_snapshot(),
            &self.channel_snapshot(),
            event_id,
        ))
    }

    async fn stats(&self) -> Result<AuditStats> {
        Ok(compute_stats(
            &self.event_snapshot(),
            &self.channel_snapshot(),
        ))
    }
}

/// Replay one JSONL file. A missing file is an empty log; a line that does
/// not parse (e.g. torn by a crash mid-append) is skipped with a warning.
async fn read_jsonl<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let text = match tokio::fs::read_to_string(path).await {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => {
            return Err(err).with_context(|| format!("read {}", path.display()));
        }
    };

    let mut rows = Vec::new();
    for (lineno, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<T>(line) {
            Ok(row) => rows.push(row),
            Err(err) => {
                tracing::warn!(
                    path = %path.display(),
                    line = lineno + 1,
                    error = %err,
                    "skipping unparsable audit line"
                );
            }
        }
    }
    Ok(rows)
}

async fn append_line(path: &Path, line: &str) -> Result<()> {
    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await
        .with_context(|| format!("open {}", path.display()))?;
    file.write_all(line.as_bytes())
        .await
        .with_context(|| format!("append to {}", path.display()))?;
    file.write_all(b"\n")
        .await
        .with_context(|| format!("append to {}", path.display()))?;
    file.flush()
        .await
        .with_context(|| format!("flush {}", path.display()))?;
    Ok(())
}

// ---------- recorder ----------

/// Drives the open / per-channel / close lifecycle against a store.
#[derive(Clone)]
pub struct AuditRecorder {
    store: std::sync::Arc<dyn AuditStore>,
}

impl AuditRecorder {
    pub fn new(store: std::sync::Arc<dyn AuditStore>) -> Self {
        Self { store }
    }

    /// Append the opening `processing` entry and return the new event id.
    pub async fn open_event(&self, post: &CanonicalPost, raw_payload: Value) -> Result<String> {
        let event_id = Uuid::new_v4().to_string();
        self.store
            .append_event(AuditEventEntry {
                event_id: event_id.clone(),
                post_id: post.id.clone(),
                post_title: post.title.clone(),
                post_url: post.url.clone(),
                status: EventStatus::Processing,
                payload: Some(raw_payload),
                created_at: Utc::now(),
            })
            .await?;
        Ok(event_id)
    }

    pub async fn record_channel_outcome(
        &self,
        event_id: &str,
        result: &ChannelResult,
    ) -> Result<()> {
        self.store
            .append_channel(AuditChannelEntry {
                event_id: event_id.to_string(),
                platform: result.platform.clone(),
                outcome: result.outcome.clone(),
                created_at: Utc::now(),
            })
            .await
    }

    /// Append the terminal entry under the same event id.
    pub async fn close_event(
        &self,
        event_id: &str,
        post: &CanonicalPost,
        status: EventStatus,
    ) -> Result<()> {
        self.store
            .append_event(AuditEventEntry {
                event_id: event_id.to_string(),
                post_id: post.id.clone(),
                post_title: post.title.clone(),
                post_url: post.url.clone(),
                status,
                payload: None,
                created_at: Utc::now(),
            })
            .await
    }
}
