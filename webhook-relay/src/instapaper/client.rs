//! Instapaper Simple API client.
//!
//! Reference: https://www.instapaper.com/api/simple
//!
//! - `POST /api/add` returns `201 Created` when the URL was saved
//! - `POST /api/authenticate` returns `200 OK` for valid credentials
//! - `403 Forbidden` means the username or password is wrong
//! - `400 Bad Request` means the request itself was rejected
//! - `500` means the service had a problem

use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use tracing::{error, info, warn};
use url::Url;

use crate::config::{Config, Credentials};
use crate::error::ForwardError;

/// Longest slice of an error response body kept for logs.
const ERROR_BODY_PREVIEW: usize = 200;

/// What Instapaper reported back about a saved bookmark.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SavedBookmark {
    /// Canonical URL Instapaper stored (`Content-Location`)
    pub content_location: Option<String>,
    /// Title Instapaper detected (`X-Instapaper-Title`)
    pub detected_title: Option<String>,
}

/// Client for the Instapaper Simple API.
///
/// Cheap to clone: the underlying `reqwest::Client` shares its connection pool.
#[derive(Clone)]
pub struct InstapaperClient {
    http: Client,
    add_url: String,
    authenticate_url: String,
    credentials: Credentials,
    timeout: Duration,
}

impl InstapaperClient {
    /// Create a client from an existing HTTP client.
    pub fn new(http: Client, config: &Config) -> Self {
        Self {
            http,
            add_url: config.instapaper_api_url.clone(),
            authenticate_url: authenticate_url_for(&config.instapaper_api_url),
            credentials: config.credentials.clone(),
            timeout: config.request_timeout(),
        }
    }

    /// Create a client with its own HTTP connection pool.
    pub fn from_config(config: &Config) -> Result<Self, reqwest::Error> {
        let http = Client::builder()
            .timeout(config.request_timeout())
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self::new(http, config))
    }

    fn authed(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .basic_auth(&self.credentials.username, self.credentials.password.as_deref())
            .timeout(self.timeout)
    }

    /// Save `url` to Instapaper.
    ///
    /// `title` and `selection` are sent only when present and non-empty.
    pub async fn add_bookmark(
        &self,
        url: &str,
        title: Option<&str>,
        selection: Option<&str>,
    ) -> Result<SavedBookmark, ForwardError> {
        let mut form: Vec<(&str, &str)> = vec![("url", url)];
        if let Some(title) = title.filter(|t| !t.is_empty()) {
            form.push(("title", title));
        }
        if let Some(selection) = selection.filter(|s| !s.is_empty()) {
            form.push(("selection", selection));
        }

        info!(
            url = url,
            has_title = form.iter().any(|(k, _)| *k == "title"),
            has_selection = form.iter().any(|(k, _)| *k == "selection"),
            "instapaper_add_starting"
        );

        let response = self
            .authed(self.http.post(&self.add_url))
            .form(&form)
            .send()
            .await
            .map_err(|e| log_transport_error(url, e, self.timeout))?;

        let status = response.status();

        if status.is_success() {
            let saved = SavedBookmark {
                content_location: header_value(&response, "Content-Location"),
                detected_title: header_value(&response, "X-Instapaper-Title"),
            };

            info!(
                url = url,
                status_code = status.as_u16(),
                content_location = saved.content_location.as_deref(),
                detected_title = saved.detected_title.as_deref(),
                "instapaper_add_complete"
            );

            return Ok(saved);
        }

        Err(classify_failure(url, response).await)
    }

    /// Check the configured credentials against `/api/authenticate`.
    pub async fn authenticate(&self) -> Result<(), ForwardError> {
        let response = self
            .authed(self.http.post(&self.authenticate_url))
            .send()
            .await
            .map_err(|e| log_transport_error(&self.authenticate_url, e, self.timeout))?;

        let status = response.status();
        if status == StatusCode::OK {
            info!(username = %self.credentials.username, "instapaper_authenticate_ok");
            return Ok(());
        }

        Err(classify_failure(&self.authenticate_url, response).await)
    }
}

/// Map a non-success response onto the error taxonomy, logging it.
async fn classify_failure(url: &str, response: Response) -> ForwardError {
    let status = response.status();

    match status {
        StatusCode::FORBIDDEN | StatusCode::UNAUTHORIZED => {
            error!(
                url = url,
                status_code = status.as_u16(),
                "instapaper_invalid_credentials"
            );
            ForwardError::Auth(status)
        }
        StatusCode::BAD_REQUEST => {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            let body: String = body.chars().take(ERROR_BODY_PREVIEW).collect();
            warn!(
                url = url,
                status_code = status.as_u16(),
                body = %body,
                "instapaper_bad_request"
            );
            ForwardError::Rejected { status, body }
        }
        _ => {
            error!(
                url = url,
                status_code = status.as_u16(),
                "instapaper_service_error"
            );
            ForwardError::Service(status)
        }
    }
}

fn log_transport_error(url: &str, e: reqwest::Error, timeout: Duration) -> ForwardError {
    if e.is_timeout() {
        error!(
            url = url,
            timeout_seconds = timeout.as_secs_f64(),
            error = %e,
            "instapaper_request_timeout"
        );
    } else if e.is_connect() {
        error!(url = url, error = %e, "instapaper_connect_error");
    } else {
        error!(url = url, error = %e, "instapaper_request_error");
    }
    ForwardError::Transport(e)
}

fn header_value(response: &Response, name: &str) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string())
}

/// `/api/authenticate` sits next to `/api/add`.
fn authenticate_url_for(add_url: &str) -> String {
    match Url::parse(add_url).and_then(|u| u.join("authenticate")) {
        Ok(u) => u.to_string(),
        Err(_) => match add_url.trim_end_matches('/').rsplit_once('/') {
            Some((base, _)) => format!("{}/authenticate", base),
            None => add_url.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureKind;
    use mockito::Matcher;

    fn client_for(server: &mockito::Server, password: Option<&str>) -> InstapaperClient {
        let mut config = Config::new(
            "secret",
            Credentials::new("reader@example.com", password.map(str::to_string)),
        );
        config.instapaper_api_url = format!("{}/api/add", server.url());
        InstapaperClient::from_config(&config).unwrap()
    }

    // "reader@example.com:hunter2"
    const BASIC_WITH_PASSWORD: &str = "Basic cmVhZGVyQGV4YW1wbGUuY29tOmh1bnRlcjI=";

    #[test]
    fn test_authenticate_url_for() {
        assert_eq!(
            authenticate_url_for("https://www.instapaper.com/api/add"),
            "https://www.instapaper.com/api/authenticate"
        );
        assert_eq!(
            authenticate_url_for("http://127.0.0.1:8080/api/add"),
            "http://127.0.0.1:8080/api/authenticate"
        );
    }

    #[tokio::test]
    async fn test_add_created() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/add")
            .match_header("authorization", BASIC_WITH_PASSWORD)
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("url".into(), "https://example.com/a".into()),
                Matcher::UrlEncoded("title".into(), "A title".into()),
                Matcher::UrlEncoded("selection".into(), "Some text".into()),
            ]))
            .with_status(201)
            .with_header("Content-Location", "https://example.com/a")
            .with_header("X-Instapaper-Title", "Detected")
            .create_async()
            .await;

        let client = client_for(&server, Some("hunter2"));
        let saved = client
            .add_bookmark("https://example.com/a", Some("A title"), Some("Some text"))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(saved.content_location.as_deref(), Some("https://example.com/a"));
        assert_eq!(saved.detected_title.as_deref(), Some("Detected"));
    }

    #[tokio::test]
    async fn test_add_omits_empty_title() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/add")
            .match_body(Matcher::Regex("^url=https%3A%2F%2Fexample.com%2Fb$".to_string()))
            .with_status(201)
            .create_async()
            .await;

        let client = client_for(&server, None);
        client
            .add_bookmark("https://example.com/b", Some(""), None)
            .await
            .unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_add_forbidden_is_auth_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/add")
            .with_status(403)
            .create_async()
            .await;

        let client = client_for(&server, Some("wrong"));
        let err = client
            .add_bookmark("https://example.com/a", None, None)
            .await
            .unwrap_err();

        assert!(matches!(err, ForwardError::Auth(StatusCode::FORBIDDEN)));
    }

    #[tokio::test]
    async fn test_add_bad_request_is_rejected() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/add")
            .with_status(400)
            .with_body("Bad request or exceeded the rate limit")
            .create_async()
            .await;

        let client = client_for(&server, None);
        let err = client
            .add_bookmark("notaurl", None, None)
            .await
            .unwrap_err();

        match err {
            ForwardError::Rejected { status, body } => {
                assert_eq!(status, StatusCode::BAD_REQUEST);
                assert!(body.contains("rate limit"));
            }
            other => panic!("Expected Rejected, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_add_server_error_is_transient() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/add")
            .with_status(500)
            .create_async()
            .await;

        let client = client_for(&server, None);
        let err = client
            .add_bookmark("https://example.com/a", None, None)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), crate::error::FailureKind::Transient);
    }

    #[tokio::test]
    async fn test_add_connection_refused_is_transient() {
        let mut config = Config::new("secret", Credentials::new("reader", None));
        // Port 9 (discard) is not expected to be listening locally.
        config.instapaper_api_url = "http://127.0.0.1:9/api/add".to_string();
        config.request_timeout_ms = 2_000;
        let client = InstapaperClient::from_config(&config).unwrap();

        let err = client
            .add_bookmark("https://example.com/a", None, None)
            .await
            .unwrap_err();

        assert!(matches!(err, ForwardError::Transport(_)));
    }

    #[tokio::test]
    async fn test_add_timeout_is_transient() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        // Accept connections and hold them open without ever replying.
        let stalled = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let mut config = Config::new("secret", Credentials::new("reader", None));
        config.instapaper_api_url = format!("http://{}/api/add", addr);
        config.request_timeout_ms = 200;
        let client = InstapaperClient::from_config(&config).unwrap();

        let started = std::time::Instant::now();
        let err = client
            .add_bookmark("https://example.com/a", None, None)
            .await
            .unwrap_err();

        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(err.kind(), FailureKind::Transient);
        match err {
            ForwardError::Transport(e) => assert!(e.is_timeout(), "expected timeout, got {e}"),
            other => panic!("expected transport error, got {other:?}"),
        }

        stalled.abort();
    }

    #[tokio::test]
    async fn test_authenticate_ok() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/authenticate")
            .match_header("authorization", BASIC_WITH_PASSWORD)
            .with_status(200)
            .create_async()
            .await;

        let client = client_for(&server, Some("hunter2"));
        client.authenticate().await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_authenticate_forbidden() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/authenticate")
            .with_status(403)
            .create_async()
            .await;

        let client = client_for(&server, Some("nope"));
        let err = client.authenticate().await.unwrap_err();
        assert!(matches!(err, ForwardError::Auth(_)));
    }
}
