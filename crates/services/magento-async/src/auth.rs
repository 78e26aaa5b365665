//! Authentication mode selection.
//!
//! A client authenticates either with an application-only bearer token or with
//! OAuth1 user credentials, never both. The mode is chosen once from the
//! configuration and turned into an [`Authorizer`] that produces the
//! `Authorization` header for every outbound request.

use reqwest::header::HeaderValue;
use serde::{Deserialize, Serialize};

use crate::error::MagentoError;
use crate::oauth::OAuthSigner;

/// OAuth1 consumer and access token credentials
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OAuth1Credentials {
    /// Consumer (application) key
    pub consumer_key: String,
    /// Consumer (application) secret
    pub consumer_secret: String,
    /// User access token
    pub access_token_key: String,
    /// User access token secret
    pub access_token_secret: String,
}

impl std::fmt::Debug for OAuth1Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuth1Credentials")
            .field("consumer_key", &self.consumer_key)
            .field("consumer_secret", &"<redacted>")
            .field("access_token_key", &"<redacted>")
            .field("access_token_secret", &"<redacted>")
            .finish()
    }
}

/// The single active authentication identity of a client
#[derive(Clone, PartialEq, Eq)]
pub enum AuthMode {
    /// Application-only auth: `Authorization: Bearer <token>`
    Bearer(String),
    /// User auth: per-request OAuth1 HMAC-SHA1 signature
    OAuth1(OAuth1Credentials),
}

impl std::fmt::Debug for AuthMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bearer(_) => f.debug_tuple("Bearer").field(&"<redacted>").finish(),
            Self::OAuth1(c) => f.debug_tuple("OAuth1").field(c).finish(),
        }
    }
}

impl AuthMode {
    /// Selects the mode from optional bearer token and OAuth1 credentials
    ///
    /// A non-empty bearer token always wins, whatever the OAuth1 fields hold.
    /// Credentials are not validated: empty fields produce an OAuth1 mode with
    /// empty fields.
    #[must_use]
    pub fn select(bearer_token: Option<&str>, credentials: &OAuth1Credentials) -> Self {
        match bearer_token {
            Some(t) if !t.is_empty() => Self::Bearer(t.to_string()),
            _ => Self::OAuth1(credentials.clone()),
        }
    }

    /// True for the bearer mode
    #[must_use]
    pub const fn is_bearer(&self) -> bool {
        matches!(self, Self::Bearer(_))
    }
}

/// Produces the `Authorization` header for outbound requests
///
/// Built once per client from its [`AuthMode`].
#[derive(Debug, Clone)]
pub enum Authorizer {
    /// Fixed bearer header
    Bearer(HeaderValue),
    /// OAuth1 signer, one signature per request
    OAuth1(OAuthSigner),
}

impl Authorizer {
    /// Builds the authorizer for a mode
    ///
    /// # Errors
    ///
    /// Returns [`MagentoError::Config`] if the bearer token cannot be sent as a
    /// header value.
    pub fn new(mode: AuthMode) -> Result<Self, MagentoError> {
        match mode {
            AuthMode::Bearer(token) => {
                let mut v = HeaderValue::from_str(&format!("Bearer {token}"))
                    .map_err(|_| MagentoError::Config("Invalid Authorization header".into()))?;
                v.set_sensitive(true);
                Ok(Self::Bearer(v))
            }
            AuthMode::OAuth1(credentials) => Ok(Self::OAuth1(OAuthSigner::new(credentials))),
        }
    }

    /// Header value for one request
    ///
    /// `params` are the query or form parameters that OAuth1 signs; bearer
    /// auth ignores them.
    pub fn authorize(
        &self,
        method: &str,
        url: &str,
        params: &[(String, String)],
    ) -> Result<HeaderValue, MagentoError> {
        match self {
            Self::Bearer(v) => Ok(v.clone()),
            Self::OAuth1(signer) => {
                let header = signer.sign(method, url, params)?;
                let mut v = HeaderValue::from_str(&header)
                    .map_err(|_| MagentoError::OAuth("Invalid OAuth header".into()))?;
                v.set_sensitive(true);
                Ok(v)
            }
        }
    }
}
