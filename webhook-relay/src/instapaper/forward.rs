//! Forwarding of parsed Miniflux events to Instapaper.
//!
//! Articles are sent one at a time. A failure on one article is recorded and
//! the next one is still attempted; there is no retry.

use serde::Serialize;
use tracing::{error, info, warn};

use crate::error::{EventError, FailureKind, ForwardError};
use crate::instapaper::client::{InstapaperClient, SavedBookmark};
use crate::instapaper::description::describe_for;
use crate::miniflux::{Article, WebhookEvent};

/// One article that could not be bookmarked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArticleFailure {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub kind: FailureKind,
    pub error: String,
}

/// Aggregate outcome of forwarding one event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ForwardSummary {
    pub forwarded: usize,
    pub failed: usize,
    pub failures: Vec<ArticleFailure>,
}

impl ForwardSummary {
    fn record_success(&mut self) {
        self.forwarded += 1;
    }

    fn record_failure(&mut self, url: Option<&str>, kind: FailureKind, error: String) {
        self.failed += 1;
        self.failures.push(ArticleFailure {
            url: url.map(str::to_string),
            kind,
            error,
        });
    }

    /// Nothing got through and every failure happened at Instapaper.
    pub fn all_failed_downstream(&self) -> bool {
        self.forwarded == 0
            && self.failed > 0
            && self.failures.iter().all(|f| f.kind.is_downstream())
    }

    pub fn auth_failures(&self) -> usize {
        self.failures
            .iter()
            .filter(|f| f.kind == FailureKind::Auth)
            .count()
    }
}

/// Forward a single article with the given description.
pub async fn forward_article(
    client: &InstapaperClient,
    article: &Article,
    selection: Option<&str>,
) -> Result<SavedBookmark, ForwardError> {
    let title = Some(article.title.as_str()).filter(|t| !t.trim().is_empty());
    client.add_bookmark(&article.url, title, selection).await
}

/// Forward every article in `event`, sequentially.
pub async fn forward_event(client: &InstapaperClient, event: &WebhookEvent) -> ForwardSummary {
    let event_type = event.event_type();
    let mut summary = ForwardSummary::default();

    let articles: Vec<Result<&Article, &EventError>> = match event {
        WebhookEvent::NewEntries { entries, .. } => entries.iter().map(|e| e.as_ref()).collect(),
        WebhookEvent::SaveEntry { article } => vec![Ok(article)],
    };

    info!(
        event_type = event_type,
        article_count = articles.len(),
        "forward_event_starting"
    );

    for entry in articles {
        let article = match entry {
            Ok(article) => article,
            Err(e) => {
                warn!(
                    event_type = event_type,
                    error_kind = FailureKind::Malformed.as_str(),
                    error = %e,
                    "forward_article_skipped"
                );
                summary.record_failure(None, FailureKind::Malformed, e.to_string());
                continue;
            }
        };

        let selection = describe_for(event, article.content.as_deref());

        match forward_article(client, article, selection.as_deref()).await {
            Ok(_) => {
                info!(
                    event_type = event_type,
                    entry_id = ?article.entry_id,
                    url = %article.url,
                    title = %article.title,
                    "forward_article_complete"
                );
                summary.record_success();
            }
            Err(e) => {
                let kind = e.kind();
                if kind == FailureKind::Auth {
                    error!(
                        event_type = event_type,
                        entry_id = ?article.entry_id,
                        url = %article.url,
                        error_kind = kind.as_str(),
                        error = %e,
                        hint = "check INSTAPAPER_USERNAME and INSTAPAPER_PASSWORD",
                        "forward_article_auth_error"
                    );
                } else {
                    error!(
                        event_type = event_type,
                        entry_id = ?article.entry_id,
                        url = %article.url,
                        error_kind = kind.as_str(),
                        error = %e,
                        "forward_article_failed"
                    );
                }
                summary.record_failure(Some(&article.url), kind, e.to_string());
            }
        }
    }

    info!(
        event_type = event_type,
        forwarded = summary.forwarded,
        failed = summary.failed,
        auth_failures = summary.auth_failures(),
        "forward_event_complete"
    );

    summary
}
