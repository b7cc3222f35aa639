//! Configuration module for environment variable parsing.
//!
//! All configuration is read once at startup and then shared immutably
//! (behind an `Arc`) by the web handlers and the Instapaper client.

use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use crate::error::ConfigError;

/// Default Instapaper Simple API "add URL" endpoint.
pub const DEFAULT_INSTAPAPER_API_URL: &str = "https://www.instapaper.com/api/add";

/// Header carrying the hex HMAC-SHA256 of the body.
pub const DEFAULT_SIGNATURE_HEADER: &str = "X-Miniflux-Signature";

/// Header carrying the Miniflux event type.
pub const DEFAULT_EVENT_TYPE_HEADER: &str = "X-Miniflux-Event-Type";

/// Largest webhook body accepted. Miniflux batches carry full entry content.
pub const DEFAULT_MAX_BODY_BYTES: usize = 32 * 1024 * 1024;

/// Instapaper account used for HTTP Basic authentication.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    /// Instapaper accounts may have no password at all.
    pub password: Option<String>,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: Option<String>) -> Self {
        Self {
            username: username.into(),
            password: password.filter(|p| !p.is_empty()),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Application configuration loaded from environment variables.
#[derive(Clone)]
pub struct Config {
    /// Shared secret Miniflux signs webhook bodies with
    pub webhook_secret: Option<String>,

    /// Instapaper account credentials
    pub credentials: Credentials,

    /// Host the web server binds to
    pub host: String,

    /// Port the web server listens on
    pub port: u16,

    /// Largest webhook body accepted, in bytes
    pub max_body_bytes: usize,

    /// Instapaper "add URL" endpoint
    pub instapaper_api_url: String,

    /// Timeout for each outbound Instapaper request in milliseconds
    pub request_timeout_ms: u64,

    /// Probe the Instapaper credentials once at startup
    pub verify_credentials_on_start: bool,

    /// Name of the signature header sent by Miniflux
    pub signature_header: String,

    /// Name of the event-type header sent by Miniflux
    pub event_type_header: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Missing optional values fall back to defaults. Required values are
    /// checked separately by [`Config::validate`].
    pub fn from_env() -> Self {
        Config {
            webhook_secret: env::var("MINIFLUX_WEBHOOK_SECRET")
                .ok()
                .filter(|s| !s.trim().is_empty()),

            credentials: Credentials::new(
                env::var("INSTAPAPER_USERNAME").unwrap_or_default(),
                env::var("INSTAPAPER_PASSWORD").ok(),
            ),

            host: env::var("WEBHOOK_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),

            port: parse_or("WEBHOOK_PORT", 5002),

            max_body_bytes: parse_or("WEBHOOK_MAX_BODY_BYTES", DEFAULT_MAX_BODY_BYTES),

            instapaper_api_url: env::var("INSTAPAPER_API_URL")
                .unwrap_or_else(|_| DEFAULT_INSTAPAPER_API_URL.to_string()),

            request_timeout_ms: parse_or("INSTAPAPER_TIMEOUT_MS", 30_000),

            verify_credentials_on_start: parse_bool("INSTAPAPER_VERIFY_CREDENTIALS", false),

            signature_header: env::var("SIGNATURE_HEADER")
                .unwrap_or_else(|_| DEFAULT_SIGNATURE_HEADER.to_string()),

            event_type_header: env::var("EVENT_TYPE_HEADER")
                .unwrap_or_else(|_| DEFAULT_EVENT_TYPE_HEADER.to_string()),
        }
    }

    /// Build a configuration with defaults for everything but the secret and
    /// the Instapaper account.
    pub fn new(webhook_secret: impl Into<String>, credentials: Credentials) -> Self {
        Config {
            webhook_secret: Some(webhook_secret.into()),
            credentials,
            host: "0.0.0.0".to_string(),
            port: 5002,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            instapaper_api_url: DEFAULT_INSTAPAPER_API_URL.to_string(),
            request_timeout_ms: 30_000,
            verify_credentials_on_start: false,
            signature_header: DEFAULT_SIGNATURE_HEADER.to_string(),
            event_type_header: DEFAULT_EVENT_TYPE_HEADER.to_string(),
        }
    }

    /// Check that the values the service cannot run without are present.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.credentials.username.trim().is_empty() {
            return Err(ConfigError::Missing("INSTAPAPER_USERNAME"));
        }
        if self.webhook_secret.is_none() {
            return Err(ConfigError::Missing("MINIFLUX_WEBHOOK_SECRET"));
        }
        if let Err(e) = url::Url::parse(&self.instapaper_api_url) {
            return Err(ConfigError::Invalid {
                name: "INSTAPAPER_API_URL",
                reason: e.to_string(),
            });
        }
        if self.max_body_bytes == 0 {
            return Err(ConfigError::Invalid {
                name: "WEBHOOK_MAX_BODY_BYTES",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.request_timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                name: "INSTAPAPER_TIMEOUT_MS",
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    /// Outbound request timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Address string the listener binds to.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("webhook_secret", &self.webhook_secret.as_ref().map(|_| "<redacted>"))
            .field("credentials", &self.credentials)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("max_body_bytes", &self.max_body_bytes)
            .field("instapaper_api_url", &self.instapaper_api_url)
            .field("request_timeout_ms", &self.request_timeout_ms)
            .field("verify_credentials_on_start", &self.verify_credentials_on_start)
            .field("signature_header", &self.signature_header)
            .field("event_type_header", &self.event_type_header)
            .finish()
    }
}

/// Parse an environment variable, falling back to `default` when unset or invalid.
fn parse_or<T: FromStr + Copy>(name: &str, default: T) -> T {
    let raw = match env::var(name) {
        Ok(v) => v,
        Err(_) => return default,
    };

    match raw.trim().parse() {
        Ok(v) => v,
        Err(_) => {
            warn!(env_var = name, value = %raw, "Invalid value, using default");
            default
        }
    }
}

/// Parse a boolean flag such as "true", "1", "yes" or "off".
fn parse_bool(name: &str, default: bool) -> bool {
    let raw = match env::var(name) {
        Ok(v) => v,
        Err(_) => return default,
    };

    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" | "" => false,
        _ => {
            warn!(env_var = name, value = %raw, "Invalid boolean, using default");
            default
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_or_valid() {
        env::set_var("TEST_PORT_VALID", "8081");
        assert_eq!(parse_or("TEST_PORT_VALID", 5002u16), 8081);
        env::remove_var("TEST_PORT_VALID");
    }

    #[test]
    fn test_parse_or_invalid_uses_default() {
        env::set_var("TEST_PORT_INVALID", "not-a-port");
        assert_eq!(parse_or("TEST_PORT_INVALID", 5002u16), 5002);
        env::remove_var("TEST_PORT_INVALID");
    }

    #[test]
    fn test_parse_or_default() {
        assert_eq!(parse_or("NONEXISTENT_VAR", 30_000u64), 30_000);
    }

    #[test]
    fn test_parse_bool() {
        env::set_var("TEST_BOOL_YES", "Yes");
        env::set_var("TEST_BOOL_ZERO", "0");
        env::set_var("TEST_BOOL_GARBAGE", "maybe");
        assert!(parse_bool("TEST_BOOL_YES", false));
        assert!(!parse_bool("TEST_BOOL_ZERO", true));
        assert!(parse_bool("TEST_BOOL_GARBAGE", true));
        assert!(!parse_bool("NONEXISTENT_BOOL", false));
        env::remove_var("TEST_BOOL_YES");
        env::remove_var("TEST_BOOL_ZERO");
        env::remove_var("TEST_BOOL_GARBAGE");
    }

    #[test]
    fn test_validate_requires_username_and_secret() {
        let config = Config::new("secret", Credentials::new("", None));
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Missing("INSTAPAPER_USERNAME"))
        ));

        let mut config = Config::new("secret", Credentials::new("reader@example.com", None));
        assert!(config.validate().is_ok());

        config.webhook_secret = None;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Missing("MINIFLUX_WEBHOOK_SECRET"))
        ));
    }

    #[test]
    fn test_validate_rejects_bad_api_url() {
        let mut config = Config::new("secret", Credentials::new("reader", None));
        config.instapaper_api_url = "not a url".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn test_validate_rejects_zero_body_limit() {
        let mut config = Config::new("secret", Credentials::new("reader", None));
        assert_eq!(config.max_body_bytes, DEFAULT_MAX_BODY_BYTES);
        config.max_body_bytes = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid {
                name: "WEBHOOK_MAX_BODY_BYTES",
                ..
            })
        ));
    }

    #[test]
    fn test_empty_password_is_none() {
        let creds = Credentials::new("reader", Some(String::new()));
        assert_eq!(creds.password, None);
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = Config::new(
            "topsecret",
            Credentials::new("reader", Some("hunter2".to_string())),
        );
        let debug = format!("{:?}", config);
        assert!(!debug.contains("topsecret"));
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("reader"));
    }

    #[test]
    fn test_bind_addr() {
        let mut config = Config::new("s", Credentials::new("u", None));
        config.host = "127.0.0.1".to_string();
        config.port = 8081;
        assert_eq!(config.bind_addr(), "127.0.0.1:8081");
    }
}
