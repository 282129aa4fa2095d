//! HTTP surface.
//!
//! `POST /webhook/ghost` is the ingestion endpoint: normalize the payload,
//! open the audit entry, resolve channels, fan out, record outcomes, close
//! the entry. The read side (`/api/logs`, `/api/stats`) serves the folded
//! audit views. All bodies are JSON; errors map through [`ApiError`].

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use metrics::{counter, gauge};
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;

use crate::audit::{AuditRecorder, AuditStore, EventStatus};
use crate::config::ConfigSource;
use crate::dispatch::dispatch_all;
use crate::error::ApiError;
use crate::event::{self, CanonicalPost, Normalized};
use crate::notify::ChannelResult;
use crate::registry::resolve_channels;

const DEFAULT_LOGS_PAGE_SIZE: usize = 20;

#[derive(Clone)]
pub struct AppState {
    http: reqwest::Client,
    configs: Arc<dyn ConfigSource>,
    store: Arc<dyn AuditStore>,
    audit: AuditRecorder,
}

impl AppState {
    pub fn new(configs: Arc<dyn ConfigSource>, store: Arc<dyn AuditStore>) -> Self {
        Self {
            http: reqwest::Client::new(),
            configs,
            audit: AuditRecorder::new(Arc::clone(&store)),
            store,
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/webhook/ghost", post(handle_webhook))
        .route("/api/logs", get(list_logs))
        .route("/api/logs/{id}", get(get_log))
        .route("/api/stats", get(get_stats))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok", "message": "Webhook handler is running" }))
}

async fn handle_webhook(
    State(state): State<AppState>,
    Json(payload): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    let post = match event::normalize(&payload).map_err(|err| {
        counter!("webhook_invalid_total").increment(1);
        err
    })? {
        Normalized::NotPublished { title, status } => {
            counter!("webhook_skipped_total").increment(1);
            tracing::info!(%title, %status, "post is not published, skipping");
            return Ok(Json(json!({
                "success": true,
                "message": "Post is not published",
            })));
        }
        Normalized::Published(post) => post,
    };

    counter!("webhook_events_total").increment(1);
    tracing::info!(title = %post.title, url = %post.url, "new published post detected");

    let event_id = state.audit.open_event(&post, payload).await.map_err(|err| {
        counter!("webhook_failed_total").increment(1);
        err
    })?;

    let results = match run_dispatch(&state, &event_id, &post).await {
        Ok(results) => results,
        Err(err) => {
            counter!("webhook_failed_total").increment(1);
            // The entry is already open, so try to close it with the fault
            // before surfacing the 500.
            let status = EventStatus::Error {
                message: format!("{err:#}"),
            };
            if let Err(close_err) = state.audit.close_event(&event_id, &post, status).await {
                tracing::error!(error = ?close_err, "failed to close audit entry after fault");
            }
            return Err(err.into());
        }
    };

    state
        .audit
        .close_event(&event_id, &post, EventStatus::Success)
        .await?;
    gauge!("webhook_last_event_ts").set(Utc::now().timestamp() as f64);

    Ok(Json(json!({
        "success": true,
        "message": "Notifications sent",
        "post": post,
        "notifications": results,
    })))
}

/// Resolve, fan out, and record one outcome per invoked channel. Any error
/// here is an orchestration fault, not a channel failure.
async fn run_dispatch(
    state: &AppState,
    event_id: &str,
    post: &CanonicalPost,
) -> anyhow::Result<Vec<ChannelResult>> {
    let configs = state.configs.list_configs().await?;
    let resolution = resolve_channels(&configs, &state.http);
    let results = dispatch_all(post, &resolution.channels).await;
    for result in &results {
        state.audit.record_channel_outcome(event_id, result).await?;
    }
    Ok(results)
}

#[derive(Deserialize)]
struct LogsQuery {
    page: Option<usize>,
    limit: Option<usize>,
}

async fn list_logs(
    State(state): State<AppState>,
    Query(query): Query<LogsQuery>,
) -> Result<Json<Value>, ApiError> {
    let limit = query.limit.unwrap_or(DEFAULT_LOGS_PAGE_SIZE).max(1);
    let page = query.page.unwrap_or(1).max(1);
    let logs = state.store.events(limit, (page - 1) * limit).await?;
    Ok(Json(json!({ "logs": logs, "page": page })))
}

async fn get_log(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let detail = state.store.event(&id).await?.ok_or(ApiError::LogNotFound)?;
    Ok(Json(
        serde_json::to_value(detail).map_err(anyhow::Error::from)?,
    ))
}

async fn get_stats(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let stats = state.store.stats().await?;
    Ok(Json(
        serde_json::to_value(stats).map_err(anyhow::Error::from)?,
    ))
}
