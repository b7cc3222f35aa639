//! Miniflux webhook parsing.
//!
//! ## Processing Flow
//!
//! ```text
//! raw body + event-type header → parse_webhook() → ParsedWebhook
//! ```
//!
//! Only `new_entries` and `save_entry` are forwarded. Any other event type is
//! reported as `Unsupported` so the endpoint can acknowledge it.

pub mod types;

use tracing::{info, warn};

use crate::error::EventError;

pub use types::{
    Article, ParsedWebhook, RawEntry, RawWebhook, WebhookEvent, NEW_ENTRIES, SAVE_ENTRY,
};

/// Parse a webhook body into a typed event.
///
/// The event type comes from the event-type header; when the header is
/// missing or blank the body's own `event_type` field is used.
pub fn parse_webhook(body: &[u8], event_type_header: Option<&str>) -> Result<ParsedWebhook, EventError> {
    let raw: RawWebhook = serde_json::from_slice(body).map_err(|e| {
        warn!(error = %e, body_length = body.len(), "miniflux_payload_invalid_json");
        EventError::malformed(format!("invalid JSON body: {}", e))
    })?;

    let event_type = event_type_header
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .or_else(|| raw.event_type())
        .map(str::to_string)
        .unwrap_or_default();

    let event = match event_type.as_str() {
        NEW_ENTRIES => parse_new_entries(raw)?,
        SAVE_ENTRY => parse_save_entry(raw)?,
        _ => {
            info!(event_type = %event_type, "miniflux_event_unsupported");
            return Ok(ParsedWebhook::Unsupported { event_type });
        }
    };

    Ok(ParsedWebhook::Supported(event))
}

fn parse_new_entries(raw: RawWebhook) -> Result<WebhookEvent, EventError> {
    let feed_title = raw.feed_title().map(str::to_string);

    let entries = raw
        .entries
        .ok_or_else(|| EventError::malformed("new_entries event has no entries list"))?;

    let entries: Vec<Result<Article, EventError>> = entries
        .into_iter()
        .enumerate()
        .map(|(index, value)| {
            serde_json::from_value::<RawEntry>(value)
                .map_err(|e| EventError::malformed(format!("entry {} is not an entry object: {}", index, e)))
                .and_then(Article::try_from)
                .inspect_err(|e| {
                    warn!(index = index, error = %e, "miniflux_entry_malformed");
                })
        })
        .collect();

    info!(
        event_type = NEW_ENTRIES,
        feed = feed_title.as_deref().unwrap_or("unknown"),
        entry_count = entries.len(),
        malformed_count = entries.iter().filter(|e| e.is_err()).count(),
        "miniflux_event_parsed"
    );

    Ok(WebhookEvent::NewEntries { feed_title, entries })
}

fn parse_save_entry(raw: RawWebhook) -> Result<WebhookEvent, EventError> {
    let value = raw
        .entry
        .filter(|v| !v.is_null())
        .ok_or_else(|| EventError::malformed("save_entry event has no entry"))?;

    let entry: RawEntry = serde_json::from_value(value)
        .map_err(|e| EventError::malformed(format!("entry is not an entry object: {}", e)))?;

    let article = Article::try_from(entry)?;

    info!(
        event_type = SAVE_ENTRY,
        entry_id = ?article.entry_id,
        url = %article.url,
        "miniflux_event_parsed"
    );

    Ok(WebhookEvent::SaveEntry { article })
}
