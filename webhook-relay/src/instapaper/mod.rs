//! Instapaper side of the relay.
//!
//! ```text
//! WebhookEvent → forward_event() → InstapaperClient::add_bookmark() (per article) → ForwardSummary
//! ```

pub mod client;
pub mod description;
pub mod forward;

pub use client::{InstapaperClient, SavedBookmark};
pub use description::{describe, describe_saved};
pub use forward::{forward_article, forward_event, ArticleFailure, ForwardSummary};
