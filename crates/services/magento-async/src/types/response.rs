use std::time::Duration;

use bytes::Bytes;
use reqwest::StatusCode;
use reqwest::header::HeaderMap;

/// Status, headers and undecoded body of a completed response
#[derive(Debug, Clone)]
pub struct RawResponse {
    /// HTTP status
    pub status: StatusCode,
    /// Response headers
    pub headers: HeaderMap,
    /// Body bytes exactly as received
    pub body: Bytes,
}

impl RawResponse {
    /// Body as text, replacing invalid UTF-8
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Rate limit information from the response headers
    #[must_use]
    pub fn rate_limit(&self) -> RateLimitInfo {
        RateLimitInfo::from_headers(&self.headers)
    }
}

/// A successful one-shot call
#[derive(Debug, Clone)]
pub struct ApiResponse {
    /// Decoded JSON body
    pub data: serde_json::Value,
    /// The response it was decoded from
    pub response: RawResponse,
}

/// Rate limit information from `x-rate-limit-*` headers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RateLimitInfo {
    /// Maximum number of requests allowed in the window
    pub limit: Option<u32>,
    /// Remaining requests in the current window
    pub remaining: Option<u32>,
    /// Unix timestamp when the window resets
    pub reset: Option<i64>,
}

impl RateLimitInfo {
    /// Parses rate limit info from response headers
    #[must_use]
    pub fn from_headers(headers: &HeaderMap) -> Self {
        fn parse<T: std::str::FromStr>(headers: &HeaderMap, name: &str) -> Option<T> {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse().ok())
        }

        Self {
            limit: parse(headers, "x-rate-limit-limit"),
            remaining: parse(headers, "x-rate-limit-remaining"),
            reset: parse(headers, "x-rate-limit-reset"),
        }
    }

    /// True when the window has no requests left
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.remaining == Some(0)
    }

    /// Time left until the window resets, if it is in the future
    #[must_use]
    pub fn time_until_reset(&self) -> Option<Duration> {
        let reset = self.reset?;
        let now = chrono::Utc::now().timestamp();
        (reset > now).then(|| Duration::from_secs((reset - now) as u64))
    }
}
