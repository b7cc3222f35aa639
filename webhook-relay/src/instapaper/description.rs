//! Builds the Instapaper "selection" text from Miniflux entry HTML.

use scraper::Html;

use crate::miniflux::WebhookEvent;

/// Maximum number of characters of article text sent as the description.
pub const MAX_DESCRIPTION_CHARS: usize = 200;

/// Marker prepended to entries saved by hand in Miniflux.
pub const SAVED_PREFIX: &str = "[Saved from Miniflux]";

/// Strip markup from `html` and collapse whitespace.
pub fn html_to_text(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let text: String = fragment.root_element().text().collect();
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Truncate to [`MAX_DESCRIPTION_CHARS`] characters, appending "..." when cut.
fn truncate(text: &str) -> String {
    if text.chars().count() > MAX_DESCRIPTION_CHARS {
        let cut: String = text.chars().take(MAX_DESCRIPTION_CHARS).collect();
        format!("{}...", cut.trim_end())
    } else {
        text.to_string()
    }
}

/// Description for a newly discovered entry, if it has any text.
pub fn describe(content: Option<&str>) -> Option<String> {
    let text = html_to_text(content?);
    if text.is_empty() {
        None
    } else {
        Some(truncate(&text))
    }
}

/// Description for a manually saved entry. Always present.
pub fn describe_saved(content: Option<&str>) -> String {
    match describe(content) {
        Some(text) => format!("{} {}", SAVED_PREFIX, text),
        None => SAVED_PREFIX.to_string(),
    }
}

/// Description for an article according to the event it arrived in.
pub fn describe_for(event: &WebhookEvent, content: Option<&str>) -> Option<String> {
    match event {
        WebhookEvent::NewEntries { .. } => describe(content),
        WebhookEvent::SaveEntry { .. } => Some(describe_saved(content)),
    }
}
