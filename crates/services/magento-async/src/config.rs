use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::header::{ACCEPT, CONNECTION, HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use serde::Deserialize;

use crate::auth::{AuthMode, OAuth1Credentials};
use crate::endpoint::{Base, Bases};
use crate::error::MagentoError;

/// Default `User-Agent` sent with every request
pub const DEFAULT_USER_AGENT: &str = concat!("magento-async/", env!("CARGO_PKG_VERSION"));

/// Environment variable holding the consumer key
pub const ENV_CONSUMER_KEY: &str = "MAGENTO_CONSUMER_KEY";
/// Environment variable holding the consumer secret
pub const ENV_CONSUMER_SECRET: &str = "MAGENTO_CONSUMER_SECRET";
/// Environment variable holding the access token
pub const ENV_ACCESS_TOKEN_KEY: &str = "MAGENTO_ACCESS_TOKEN_KEY";
/// Environment variable holding the access token secret
pub const ENV_ACCESS_TOKEN_SECRET: &str = "MAGENTO_ACCESS_TOKEN_SECRET";
/// Environment variable holding an application-only bearer token
pub const ENV_BEARER_TOKEN: &str = "MAGENTO_BEARER_TOKEN";

/// Configuration for the Magento client
///
/// Defaults: the five `*.magento.com/1.1` bases, `Accept: */*`,
/// `Connection: close`, [`DEFAULT_USER_AGENT`], no request timeout, and
/// credentials read from the `MAGENTO_*` environment variables.
///
/// The configuration is consumed by [`Client::with_config`](crate::Client::with_config)
/// and is not changed afterwards.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct MagentoConfig {
    credentials: OAuth1Credentials,
    bearer_token: Option<String>,
    bases: Bases,
    headers: BTreeMap<String, String>,
    user_agent: String,
    request_timeout: Option<Duration>,
}

impl std::fmt::Debug for MagentoConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MagentoConfig")
            .field("auth", &self.auth_mode())
            .field("bases", &self.bases)
            .field("headers", &self.headers)
            .field("user_agent", &self.user_agent)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

/// Helper to read and normalize an env var (trim + filter empty).
fn env_trimmed(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl Default for MagentoConfig {
    fn default() -> Self {
        Self {
            credentials: OAuth1Credentials {
                consumer_key: env_trimmed(ENV_CONSUMER_KEY).unwrap_or_default(),
                consumer_secret: env_trimmed(ENV_CONSUMER_SECRET).unwrap_or_default(),
                access_token_key: env_trimmed(ENV_ACCESS_TOKEN_KEY).unwrap_or_default(),
                access_token_secret: env_trimmed(ENV_ACCESS_TOKEN_SECRET).unwrap_or_default(),
            },
            bearer_token: env_trimmed(ENV_BEARER_TOKEN),
            bases: Bases::default(),
            headers: BTreeMap::new(),
            user_agent: DEFAULT_USER_AGENT.into(),
            request_timeout: None,
        }
    }
}

impl MagentoConfig {
    /// Creates a new configuration with default settings
    ///
    /// Attempts to read credentials from environment variables:
    /// - `MAGENTO_CONSUMER_KEY`, `MAGENTO_CONSUMER_SECRET`
    /// - `MAGENTO_ACCESS_TOKEN_KEY`, `MAGENTO_ACCESS_TOKEN_SECRET`
    /// - `MAGENTO_BEARER_TOKEN` for application-only auth
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the consumer key and secret
    #[must_use]
    pub fn with_consumer(mut self, key: impl Into<String>, secret: impl Into<String>) -> Self {
        self.credentials.consumer_key = key.into();
        self.credentials.consumer_secret = secret.into();
        self
    }

    /// Sets the user access token and secret
    #[must_use]
    pub fn with_access_token(
        mut self,
        key: impl Into<String>,
        secret: impl Into<String>,
    ) -> Self {
        self.credentials.access_token_key = key.into();
        self.credentials.access_token_secret = secret.into();
        self
    }

    /// Sets an application-only bearer token
    ///
    /// When set, the bearer token is used instead of any OAuth1 credentials.
    #[must_use]
    pub fn with_bearer(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    /// Clears the bearer token so OAuth1 is used
    #[must_use]
    pub fn without_bearer(mut self) -> Self {
        self.bearer_token = None;
        self
    }

    /// Overrides one base URL
    #[must_use]
    pub fn with_base(mut self, base: Base, url: impl Into<String>) -> Self {
        *self.bases.get_mut(base) = url.into();
        self
    }

    /// Points every base at the same root URL
    ///
    /// Mostly useful against a single mock server.
    #[must_use]
    pub fn with_all_bases(mut self, url: impl Into<String>) -> Self {
        let url = url.into();
        for base in Base::ALL {
            *self.bases.get_mut(base) = url.clone();
        }
        self
    }

    /// Adds a header sent with every request
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Sets the `User-Agent` header
    #[must_use]
    pub fn with_user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = ua.into();
        self
    }

    /// Sets a timeout for one-shot requests
    ///
    /// Streams are never subject to it.
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Returns the configured bases
    #[must_use]
    pub const fn bases(&self) -> &Bases {
        &self.bases
    }

    /// Returns the OAuth1 credentials
    #[must_use]
    pub const fn credentials(&self) -> &OAuth1Credentials {
        &self.credentials
    }

    /// Returns the bearer token, if one is configured
    #[must_use]
    pub fn bearer_token(&self) -> Option<&str> {
        self.bearer_token.as_deref()
    }

    /// Selects the authentication mode, see [`AuthMode::select`]
    #[must_use]
    pub fn auth_mode(&self) -> AuthMode {
        AuthMode::select(self.bearer_token.as_deref(), &self.credentials)
    }
}

/// Configuration trait for the Magento client
///
/// Implement this trait to provide custom endpoint resolution or transport defaults.
pub trait Config: Send + Sync {
    /// Returns HTTP headers to include in every request (authentication excluded)
    ///
    /// # Errors
    ///
    /// Returns an error if header names or values contain invalid characters.
    fn headers(&self) -> Result<HeaderMap, MagentoError>;

    /// Resolves a logical path against a named base
    fn url(&self, path: &str, base: &str) -> String;

    /// Returns the authentication mode, evaluated once at client construction
    fn auth_mode(&self) -> AuthMode;

    /// Returns the timeout for one-shot requests
    fn request_timeout(&self) -> Option<Duration> {
        None
    }
}

impl Config for MagentoConfig {
    fn headers(&self) -> Result<HeaderMap, MagentoError> {
        let mut h = HeaderMap::new();
        h.insert(ACCEPT, HeaderValue::from_static("*/*"));
        h.insert(CONNECTION, HeaderValue::from_static("close"));
        h.insert(
            USER_AGENT,
            HeaderValue::from_str(&self.user_agent)
                .map_err(|_| MagentoError::Config("Invalid User-Agent header".into()))?,
        );

        for (name, value) in &self.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| MagentoError::Config(format!("Invalid header name: {name}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|_| MagentoError::Config(format!("Invalid value for header {name}")))?;
            h.insert(name, value);
        }

        Ok(h)
    }

    fn url(&self, path: &str, base: &str) -> String {
        self.bases.resolve(path, base)
    }

    fn auth_mode(&self) -> AuthMode {
        self.auth_mode()
    }

    fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout
    }
}
