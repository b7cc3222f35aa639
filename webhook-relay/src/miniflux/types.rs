//! Miniflux webhook payload types.
//!
//! This module defines:
//! - The raw wire shapes Miniflux posts (`RawWebhook`, `RawEntry`)
//! - The typed events handed to the forwarder (`WebhookEvent`, `Article`)

use serde::Deserialize;

use crate::error::EventError;

/// Event type for freshly fetched entries.
pub const NEW_ENTRIES: &str = "new_entries";

/// Event type for an entry the user saved manually.
pub const SAVE_ENTRY: &str = "save_entry";

// =============================================================================
// Wire Types
// =============================================================================

/// Top-level webhook body.
///
/// Entries are kept as raw JSON so one bad entry cannot fail the whole batch.
/// `event_type` and `feed` are informational and read leniently: a value of
/// the wrong JSON type is ignored rather than rejecting the payload.
#[derive(Debug, Deserialize)]
pub struct RawWebhook {
    #[serde(default)]
    pub event_type: Option<serde_json::Value>,
    #[serde(default)]
    pub feed: Option<serde_json::Value>,
    #[serde(default)]
    pub entries: Option<Vec<serde_json::Value>>,
    #[serde(default)]
    pub entry: Option<serde_json::Value>,
}

impl RawWebhook {
    /// Body-level event type, when it is a non-empty string.
    pub fn event_type(&self) -> Option<&str> {
        self.event_type
            .as_ref()
            .and_then(serde_json::Value::as_str)
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }

    /// `feed.title`, when it is a non-empty string.
    pub fn feed_title(&self) -> Option<&str> {
        self.feed
            .as_ref()
            .and_then(|feed| feed.get("title"))
            .and_then(serde_json::Value::as_str)
            .filter(|t| !t.is_empty())
    }
}

/// A single Miniflux entry. Only the fields forwarded to Instapaper are read.
#[derive(Debug, Deserialize)]
pub struct RawEntry {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

// =============================================================================
// Typed Events
// =============================================================================

/// An article ready to be bookmarked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Article {
    /// Miniflux entry id, for log context only
    pub entry_id: Option<i64>,
    pub title: String,
    /// Bookmarking key
    pub url: String,
    /// HTML content, if Miniflux sent any
    pub content: Option<String>,
}

impl Article {
    pub fn new(url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            entry_id: None,
            title: title.into(),
            url: url.into(),
            content: None,
        }
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }
}

impl TryFrom<RawEntry> for Article {
    type Error = EventError;

    fn try_from(entry: RawEntry) -> Result<Self, Self::Error> {
        let url = entry
            .url
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty())
            .ok_or_else(|| match entry.id {
                Some(id) => EventError::malformed(format!("entry {} has no url", id)),
                None => EventError::malformed("entry has no url"),
            })?;

        Ok(Article {
            entry_id: entry.id,
            title: entry.title.unwrap_or_default(),
            url,
            content: entry.content.filter(|c| !c.trim().is_empty()),
        })
    }
}

/// A webhook event the relay knows how to forward.
#[derive(Debug, Clone, PartialEq)]
pub enum WebhookEvent {
    /// Entries discovered by a feed refresh, in payload order.
    ///
    /// Entries that failed validation stay in place so they are counted as
    /// failed alongside their siblings.
    NewEntries {
        feed_title: Option<String>,
        entries: Vec<Result<Article, EventError>>,
    },
    /// An entry the user saved from the Miniflux UI.
    SaveEntry { article: Article },
}

impl WebhookEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            WebhookEvent::NewEntries { .. } => NEW_ENTRIES,
            WebhookEvent::SaveEntry { .. } => SAVE_ENTRY,
        }
    }

    pub fn feed_title(&self) -> Option<&str> {
        match self {
            WebhookEvent::NewEntries { feed_title, .. } => feed_title.as_deref(),
            WebhookEvent::SaveEntry { .. } => None,
        }
    }
}

/// Outcome of parsing a webhook body.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedWebhook {
    Supported(WebhookEvent),
    /// Acknowledged without forwarding so Miniflux does not redeliver.
    Unsupported { event_type: String },
}
