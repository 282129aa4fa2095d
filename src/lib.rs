// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod api;
pub mod audit;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod event;
pub mod markdown;
pub mod metrics;
pub mod notify;
pub mod registry;

// ---- Re-exports for stable public API ----
pub use crate::api::{create_router, AppState};
pub use crate::event::{CanonicalPost, Normalized};
pub use crate::notify::{ChannelResult, DeliveryOutcome, NotificationChannel};
