//! Demo that pushes one sample publish event through resolve + dispatch
//! using env-configured channels (set TELEGRAM_BOT_TOKEN etc. first).

use ghost_notify::config::{ConfigSource, FileConfigSource, Settings};
use ghost_notify::dispatch::dispatch_all;
use ghost_notify::event::CanonicalPost;
use ghost_notify::registry::resolve_channels;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt().with_target(false).init();

    let settings = Settings::from_env();
    let source = FileConfigSource::new(&settings.channels_config_path);
    let configs = source.list_configs().await?;

    let post = CanonicalPost {
        id: "demo-1".into(),
        title: "Hello from ghost-notify".into(),
        url: "https://blog.example/hello-world/".into(),
        excerpt: "A sample publish event pushed through the fan-out.".into(),
        feature_image: None,
        published_at: Some("2024-05-01T10:00:00.000Z".into()),
        authors: vec!["Demo Author".into()],
    };

    let http = reqwest::Client::new();
    let resolution = resolve_channels(&configs, &http);
    for skipped in &resolution.skipped {
        println!("skipped {}: {:?}", skipped.platform, skipped.reason);
    }
    if resolution.channels.is_empty() {
        println!("no channels configured, nothing to dispatch");
        return Ok(());
    }

    let results = dispatch_all(&post, &resolution.channels).await;
    for result in &results {
        match result.outcome.error_message() {
            None => println!("✓ {}", result.platform),
            Some(message) => println!("✗ {}: {message}", result.platform),
        }
    }

    println!("dispatch-demo done");
    Ok(())
}
