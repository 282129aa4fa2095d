// tests/dispatch_fanout.rs
//
// Fan-out semantics on scripted channels: one result per channel in
// invocation order, settle-all timing, and panic isolation.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::bail;
use async_trait::async_trait;

use ghost_notify::dispatch::dispatch_all;
use ghost_notify::event::CanonicalPost;
use ghost_notify::notify::NotificationChannel;

struct Scripted {
    platform: &'static str,
    delay: Duration,
    fail: bool,
    panic: bool,
    calls: Arc<AtomicUsize>,
}

impl Scripted {
    fn ok(platform: &'static str, delay_ms: u64) -> (Arc<dyn NotificationChannel>, Arc<AtomicUsize>) {
        Self::build(platform, delay_ms, false, false)
    }

    fn failing(
        platform: &'static str,
        delay_ms: u64,
    ) -> (Arc<dyn NotificationChannel>, Arc<AtomicUsize>) {
        Self::build(platform, delay_ms, true, false)
    }

    fn panicking(platform: &'static str) -> (Arc<dyn NotificationChannel>, Arc<AtomicUsize>) {
        Self::build(platform, 0, false, true)
    }

    fn build(
        platform: &'static str,
        delay_ms: u64,
        fail: bool,
        panic: bool,
    ) -> (Arc<dyn NotificationChannel>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let channel: Arc<dyn NotificationChannel> = Arc::new(Scripted {
            platform,
            delay: Duration::from_millis(delay_ms),
            fail,
            panic,
            calls: Arc::clone(&calls),
        });
        (channel, calls)
    }
}

#[async_trait]
impl NotificationChannel for Scripted {
    fn platform(&self) -> &'static str {
        self.platform
    }

    async fn send(&self, _post: &CanonicalPost) -> anyhow::Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.panic {
            panic!("scripted panic in {}", self.platform);
        }
        if self.fail {
            bail!("scripted failure in {}", self.platform);
        }
        Ok(())
    }
}

fn sample_post() -> CanonicalPost {
    CanonicalPost {
        id: "p-1".into(),
        title: "Hi".into(),
        url: "https://x/1".into(),
        excerpt: String::new(),
        feature_image: None,
        published_at: None,
        authors: vec!["A".into()],
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn one_result_per_channel_in_invocation_order() {
    let (a, _) = Scripted::ok("telegram", 0);
    let (b, _) = Scripted::failing("facebook", 0);
    let (c, _) = Scripted::ok("slack", 0);

    let results = dispatch_all(&sample_post(), &[a, b, c]).await;
    assert_eq!(results.len(), 3, "exactly N results for N channels");
    assert_eq!(
        results.iter().map(|r| r.platform.as_str()).collect::<Vec<_>>(),
        vec!["telegram", "facebook", "slack"]
    );
    assert!(results[0].is_success());
    assert!(!results[1].is_success());
    assert!(results[2].is_success());
    assert!(results[1]
        .outcome
        .error_message()
        .expect("failure message")
        .contains("scripted failure in facebook"));
}

#[tokio::test(flavor = "multi_thread")]
async fn completion_is_bounded_by_the_slowest_channel() {
    // Three channels sleeping 150ms each: sequential execution would take
    // ~450ms, concurrent ~150ms. The bound leaves generous slack for CI.
    let (a, _) = Scripted::ok("telegram", 150);
    let (b, _) = Scripted::failing("facebook", 150);
    let (c, _) = Scripted::ok("slack", 150);

    let started = Instant::now();
    let results = dispatch_all(&sample_post(), &[a, b, c]).await;
    let elapsed = started.elapsed();

    assert_eq!(results.len(), 3);
    assert!(
        elapsed >= Duration::from_millis(150),
        "must wait for the slowest channel, took {elapsed:?}"
    );
    assert!(
        elapsed < Duration::from_millis(400),
        "channels must run concurrently, took {elapsed:?}"
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn early_failure_does_not_cancel_siblings() {
    // The failing channel settles immediately; the slow sibling must still
    // run to completion and report success.
    let (fast_fail, _) = Scripted::failing("facebook", 0);
    let (slow_ok, slow_calls) = Scripted::ok("telegram", 100);

    let results = dispatch_all(&sample_post(), &[fast_fail, slow_ok]).await;
    assert_eq!(results.len(), 2);
    assert!(!results[0].is_success());
    assert!(results[1].is_success(), "sibling must not be cancelled");
    assert_eq!(slow_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn panicked_delivery_folds_into_a_failure_for_that_channel() {
    let (panicking, _) = Scripted::panicking("facebook");
    let (ok, _) = Scripted::ok("telegram", 0);

    let results = dispatch_all(&sample_post(), &[panicking, ok]).await;
    assert_eq!(results.len(), 2, "a panic still yields a result");
    assert!(!results[0].is_success());
    assert!(results[0]
        .outcome
        .error_message()
        .expect("failure message")
        .contains("delivery task failed"));
    assert!(results[1].is_success(), "sibling unaffected by the panic");
}

#[tokio::test]
async fn empty_channel_set_settles_immediately() {
    let results = dispatch_all(&sample_post(), &[]).await;
    assert!(results.is_empty());
}
