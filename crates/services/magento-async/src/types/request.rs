use std::fmt;

use super::params::Params;

/// HTTP method of a one-shot call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// `GET`, parameters go in the query string
    Get,
    /// `POST`, parameters go in the body
    Post,
}

impl Method {
    /// Upper-case method name as used on the wire and in OAuth1 base strings
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Method> for reqwest::Method {
    fn from(m: Method) -> Self {
        match m {
            Method::Get => Self::GET,
            Method::Post => Self::POST,
        }
    }
}

/// How the parameters of a request are transmitted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// URL query string (GET)
    Query(Vec<(String, String)>),
    /// `application/x-www-form-urlencoded` body (POST)
    Form(Vec<(String, String)>),
    /// `multipart/form-data` body (POST with a `media` parameter)
    Multipart(Params),
}

impl Payload {
    /// Parameters that take part in the OAuth1 signature
    ///
    /// Multipart bodies are not form-encoded and are excluded.
    #[must_use]
    pub fn signature_params(&self) -> &[(String, String)] {
        match self {
            Self::Query(p) | Self::Form(p) => p,
            Self::Multipart(_) => &[],
        }
    }
}

/// A fully resolved request, ready to be authorized and sent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedRequest {
    /// HTTP method
    pub method: Method,
    /// Absolute URL after endpoint resolution
    pub url: String,
    /// Name of the base the request was resolved against
    pub base: String,
    /// True when the base name designates a streaming host
    ///
    /// The dispatcher does not act on this; streaming calls belong on
    /// [`Client::stream`](crate::Client::stream).
    pub streaming: bool,
    /// Parameter transmission
    pub payload: Payload,
}
