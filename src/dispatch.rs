//! Concurrent fan-out.
//!
//! Every resolved channel delivers in its own task so one slow or failing
//! platform cannot delay or abort the others. The join is settle-all: the
//! caller gets exactly one result per invoked channel, in invocation order,
//! and a panicked delivery task is folded into a failed result for that
//! channel alone.

use std::sync::Arc;
use std::time::Instant;

use metrics::{counter, histogram};

use crate::event::CanonicalPost;
use crate::notify::{ChannelResult, DeliveryOutcome, NotificationChannel};

pub async fn dispatch_all(
    post: &CanonicalPost,
    channels: &[Arc<dyn NotificationChannel>],
) -> Vec<ChannelResult> {
    if channels.is_empty() {
        tracing::info!("no channels resolved, nothing to dispatch");
        return Vec::new();
    }

    let shared = Arc::new(post.clone());
    let started = Instant::now();

    let mut handles = Vec::with_capacity(channels.len());
    for channel in channels {
        let platform = channel.platform();
        let channel = Arc::clone(channel);
        let post = Arc::clone(&shared);
        let handle = tokio::spawn(async move { channel.deliver(&post).await });
        handles.push((platform, handle));
    }

    let mut results = Vec::with_capacity(handles.len());
    for (platform, handle) in handles {
        let result = match handle.await {
            Ok(result) => result,
            Err(err) => {
                tracing::error!(platform, error = %err, "delivery task failed");
                ChannelResult::failure(platform, format!("delivery task failed: {err}"))
            }
        };
        match &result.outcome {
            DeliveryOutcome::Success => {
                counter!("notify_success_total", "platform" => platform).increment(1);
            }
            DeliveryOutcome::Error { .. } => {
                counter!("notify_error_total", "platform" => platform).increment(1);
            }
        }
        results.push(result);
    }

    histogram!("dispatch_duration_ms").record(started.elapsed().as_millis() as f64);
    tracing::info!(
        channels = results.len(),
        failed = results.iter().filter(|r| !r.is_success()).count(),
        "dispatch settled"
    );
    results
}
