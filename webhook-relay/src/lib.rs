//! Fluxpaper - Miniflux to Instapaper webhook relay.
//!
//! Miniflux posts a signed webhook whenever a feed refresh finds new entries
//! or a user saves an entry. Fluxpaper verifies the signature, parses the
//! event and bookmarks each article through the Instapaper Simple API.
//!
//! ## Architecture
//!
//! ```text
//! Miniflux → /webhook → verify signature → parse event → Instapaper (one call per article)
//! ```

pub mod config;
pub mod error;
pub mod instapaper;
pub mod miniflux;
pub mod web;

// Re-export commonly used types
pub use config::{Config, Credentials};
pub use error::{ConfigError, EventError, FailureKind, ForwardError};
pub use instapaper::{forward_event, ForwardSummary, InstapaperClient};
pub use miniflux::{parse_webhook, Article, ParsedWebhook, WebhookEvent};
pub use web::AppState;
