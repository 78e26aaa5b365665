//! Endpoint resolution: which base URL a logical path is sent to.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Default REST base
pub const DEFAULT_REST_BASE: &str = "https://api.magento.com/1.1";
/// Default public stream base
pub const DEFAULT_STREAM_BASE: &str = "https://stream.magento.com/1.1";
/// Default user stream base
pub const DEFAULT_USER_STREAM_BASE: &str = "https://userstream.magento.com/1.1";
/// Default site stream base
pub const DEFAULT_SITE_STREAM_BASE: &str = "https://sitestream.magento.com/1.1";
/// Default media upload base
pub const DEFAULT_MEDIA_BASE: &str = "https://upload.magento.com/1.1";

/// One of the named root URLs a path resolves against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Base {
    /// REST API (`rest`)
    Rest,
    /// Public streams (`stream`)
    Stream,
    /// User streams (`user_stream`)
    UserStream,
    /// Site streams (`site_stream`)
    SiteStream,
    /// Media uploads (`media`)
    Media,
}

impl Base {
    /// All bases, in configuration order
    pub const ALL: [Self; 5] = [
        Self::Rest,
        Self::Stream,
        Self::UserStream,
        Self::SiteStream,
        Self::Media,
    ];

    /// Configuration name of the base
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Rest => "rest",
            Self::Stream => "stream",
            Self::UserStream => "user_stream",
            Self::SiteStream => "site_stream",
            Self::Media => "media",
        }
    }

    /// Looks a base up by its exact configuration name
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|b| b.name() == name)
    }

    /// True when a base name designates a streaming host
    ///
    /// This is a substring test on the name, so unknown names containing
    /// `stream` count as well.
    #[must_use]
    pub fn is_streaming_name(name: &str) -> bool {
        name.contains("stream")
    }

    /// Base a streaming method is opened against
    ///
    /// `user` and `site` go to their dedicated hosts, everything else to the
    /// public stream host.
    #[must_use]
    pub fn for_stream(method: &str) -> Self {
        match method {
            "user" => Self::UserStream,
            "site" => Self::SiteStream,
            _ => Self::Stream,
        }
    }
}

impl fmt::Display for Base {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The five configured base URLs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Bases {
    /// REST base
    pub rest: String,
    /// Public stream base
    pub stream: String,
    /// User stream base
    pub user_stream: String,
    /// Site stream base
    pub site_stream: String,
    /// Media upload base
    pub media: String,
}

impl Default for Bases {
    fn default() -> Self {
        Self {
            rest: DEFAULT_REST_BASE.into(),
            stream: DEFAULT_STREAM_BASE.into(),
            user_stream: DEFAULT_USER_STREAM_BASE.into(),
            site_stream: DEFAULT_SITE_STREAM_BASE.into(),
            media: DEFAULT_MEDIA_BASE.into(),
        }
    }
}

impl Bases {
    /// URL of a base
    #[must_use]
    pub fn get(&self, base: Base) -> &str {
        match base {
            Base::Rest => &self.rest,
            Base::Stream => &self.stream,
            Base::UserStream => &self.user_stream,
            Base::SiteStream => &self.site_stream,
            Base::Media => &self.media,
        }
    }

    /// Mutable URL of a base
    pub fn get_mut(&mut self, base: Base) -> &mut String {
        match base {
            Base::Rest => &mut self.rest,
            Base::Stream => &mut self.stream,
            Base::UserStream => &mut self.user_stream,
            Base::SiteStream => &mut self.site_stream,
            Base::Media => &mut self.media,
        }
    }

    /// Resolves `path` against the base named `base_name`, see [`resolve`]
    #[must_use]
    pub fn resolve(&self, path: &str, base_name: &str) -> String {
        resolve(self, path, base_name)
    }
}

/// Resolves a logical path to an absolute URL
///
/// * a path that already carries a scheme is returned verbatim;
/// * unknown base names fall back to `rest`;
/// * paths starting with `media` or `/media` always use the media base;
/// * one trailing `/` is stripped;
/// * `.json` is appended unless the last `.`-separated segment of the path is
///   `json` (media paths included).
#[must_use]
pub fn resolve(bases: &Bases, path: &str, base_name: &str) -> String {
    if has_scheme(path) {
        return path.to_string();
    }

    let base = if is_media_path(path) {
        Base::Media
    } else {
        Base::from_name(base_name).unwrap_or(Base::Rest)
    };

    let mut endpoint = String::with_capacity(bases.get(base).len() + path.len() + 6);
    endpoint.push_str(bases.get(base));
    if !path.starts_with('/') {
        endpoint.push('/');
    }
    endpoint.push_str(path);

    if endpoint.ends_with('/') {
        endpoint.pop();
    }

    if path.rsplit('.').next() != Some("json") {
        endpoint.push_str(".json");
    }

    endpoint
}

/// `true` when `path` starts with `scheme:`, valid URL or not
fn has_scheme(path: &str) -> bool {
    let Some((scheme, _)) = path.split_once(':') else {
        return false;
    };
    let mut chars = scheme.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

fn is_media_path(path: &str) -> bool {
    path.strip_prefix('/').unwrap_or(path).starts_with("media")
}
