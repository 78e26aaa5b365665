//! OAuth 1.0a request signing (RFC 5849, HMAC-SHA1).
//!
//! User-context calls carry an `Authorization: OAuth ...` header computed per
//! request from the method, the normalized URL and the form/query parameters.

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use hmac::{Hmac, Mac};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use rand::RngCore;
use sha1::Sha1;

use crate::auth::OAuth1Credentials;
use crate::error::MagentoError;

/// Everything except RFC 3986 unreserved characters: ALPHA / DIGIT / "-" / "." / "_" / "~"
const OAUTH_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// OAuth 1.0a signer holding the four credentials
#[derive(Clone)]
pub struct OAuthSigner {
    credentials: OAuth1Credentials,
}

impl std::fmt::Debug for OAuthSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthSigner")
            .field("credentials", &self.credentials)
            .finish()
    }
}

impl OAuthSigner {
    /// Creates a signer; empty credential fields are signed as empty strings
    #[must_use]
    pub const fn new(credentials: OAuth1Credentials) -> Self {
        Self { credentials }
    }

    /// Generates the `Authorization` header value for a request
    ///
    /// `url` may carry a query string; its pairs are signed together with
    /// `params`. `params` are the query or form-encoded body parameters.
    pub fn sign(
        &self,
        method: &str,
        url: &str,
        params: &[(String, String)],
    ) -> Result<String, MagentoError> {
        let timestamp = chrono::Utc::now().timestamp().to_string();
        self.sign_with(method, url, params, &generate_nonce(), &timestamp)
    }

    /// Signs with a caller-supplied nonce and timestamp
    pub(crate) fn sign_with(
        &self,
        method: &str,
        url: &str,
        params: &[(String, String)],
        nonce: &str,
        timestamp: &str,
    ) -> Result<String, MagentoError> {
        let c = &self.credentials;
        let (base_url, query) = normalize_url(url)?;

        let mut oauth_params = vec![
            ("oauth_consumer_key".to_string(), c.consumer_key.clone()),
            ("oauth_nonce".to_string(), nonce.to_string()),
            (
                "oauth_signature_method".to_string(),
                "HMAC-SHA1".to_string(),
            ),
            ("oauth_timestamp".to_string(), timestamp.to_string()),
            ("oauth_token".to_string(), c.access_token_key.clone()),
            ("oauth_version".to_string(), "1.0".to_string()),
        ];

        // Encode first, then sort by encoded key and value (RFC 5849 3.4.1.3.2)
        let mut encoded: Vec<(String, String)> = oauth_params
            .iter()
            .chain(query.iter())
            .chain(params.iter())
            .map(|(k, v)| (percent_encode(k), percent_encode(v)))
            .collect();
        encoded.sort();

        let param_string = encoded
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&");

        let base_string = format!(
            "{}&{}&{}",
            method.to_uppercase(),
            percent_encode(&base_url),
            percent_encode(&param_string)
        );

        let signing_key = format!(
            "{}&{}",
            percent_encode(&c.consumer_secret),
            percent_encode(&c.access_token_secret)
        );

        let signature = hmac_sha1(&signing_key, &base_string)?;
        oauth_params.push(("oauth_signature".to_string(), signature));

        let header = oauth_params
            .iter()
            .map(|(k, v)| format!("{}=\"{}\"", percent_encode(k), percent_encode(v)))
            .collect::<Vec<_>>()
            .join(", ");

        Ok(format!("OAuth {header}"))
    }
}

/// Splits a URL into its signature base form and its query pairs
///
/// Scheme and host are lower-cased and default ports dropped (RFC 5849 3.4.1.2).
fn normalize_url(url: &str) -> Result<(String, Vec<(String, String)>), MagentoError> {
    let parsed =
        url::Url::parse(url).map_err(|e| MagentoError::OAuth(format!("invalid URL {url}: {e}")))?;

    let host = parsed.host_str().unwrap_or_default();
    let base = match parsed.port() {
        Some(port) => format!("{}://{host}:{port}{}", parsed.scheme(), parsed.path()),
        None => format!("{}://{host}{}", parsed.scheme(), parsed.path()),
    };

    let query = parsed
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    Ok((base, query))
}

/// Percent-encodes a string according to RFC 3986
fn percent_encode(s: &str) -> String {
    utf8_percent_encode(s, OAUTH_ENCODE_SET).to_string()
}

/// Generates a random 32 hex character nonce
fn generate_nonce() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Computes HMAC-SHA1 and returns it base64-encoded
fn hmac_sha1(key: &str, data: &str) -> Result<String, MagentoError> {
    type HmacSha1 = Hmac<Sha1>;

    let mut mac = HmacSha1::new_from_slice(key.as_bytes())
        .map_err(|e| MagentoError::OAuth(e.to_string()))?;
    mac.update(data.as_bytes());
    Ok(BASE64.encode(mac.finalize().into_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference_signer() -> OAuthSigner {
        OAuthSigner::new(OAuth1Credentials {
            consumer_key: "xvz1evFS4wEEPTGEFPHBog".into(),
            consumer_secret: "kAcSOqF21Fu85e7zjz7ZN2U4ZRhfV3WpwPAoE3Z7kBw".into(),
            access_token_key: "370773112-GmHxMAgYyLbNEtIKZeRNFsMKPR9EyMZeS9weJAEb".into(),
            access_token_secret: "LswwdoUaIvS8ltyTt5jkRh4J50vUPVVHtR2YPi5kE".into(),
        })
    }

    fn header_field<'a>(header: &'a str, name: &str) -> Option<&'a str> {
        header
            .trim_start_matches("OAuth ")
            .split(", ")
            .find_map(|kv| kv.strip_prefix(&format!("{name}=\"")))
            .map(|v| v.trim_end_matches('"'))
    }

    #[test]
    fn test_percent_encode() {
        assert_eq!(percent_encode("hello world"), "hello%20world");
        assert_eq!(percent_encode("foo=bar&baz"), "foo%3Dbar%26baz");
        assert_eq!(percent_encode("test-value_123.txt"), "test-value_123.txt");
        assert_eq!(percent_encode("~tilde"), "~tilde");
        assert_eq!(percent_encode("a+b*c"), "a%2Bb%2Ac");
        assert_eq!(percent_encode("☃"), "%E2%98%83");
    }

    #[test]
    fn test_generate_nonce() {
        let nonce1 = generate_nonce();
        let nonce2 = generate_nonce();
        assert_ne!(nonce1, nonce2);
        assert_eq!(nonce1.len(), 32);
        assert!(nonce1.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn known_signature() {
        // Worked example from the platform's signing documentation
        let header = reference_signer()
            .sign_with(
                "post",
                "https://api.twitter.com/1.1/statuses/update.json",
                &[
                    ("include_entities".into(), "true".into()),
                    (
                        "status".into(),
                        "Hello Ladies + Gentlemen, a signed OAuth request!".into(),
                    ),
                ],
                "kYjzVBB8Y0ZFabxSWbWovY3uYSQ2pTgmZeNu2VS4cg",
                "1318622958",
            )
            .unwrap();

        assert_eq!(
            header_field(&header, "oauth_signature"),
            Some("hCtSmYh%2BiHYCEqBWrE7C7hYmtUk%3D")
        );
    }

    #[test]
    fn query_in_url_is_signed_like_params() {
        let signer = reference_signer();
        let url_form = signer
            .sign_with(
                "POST",
                "https://api.twitter.com/1.1/statuses/update.json?include_entities=true",
                &[(
                    "status".into(),
                    "Hello Ladies + Gentlemen, a signed OAuth request!".into(),
                )],
                "kYjzVBB8Y0ZFabxSWbWovY3uYSQ2pTgmZeNu2VS4cg",
                "1318622958",
            )
            .unwrap();
        assert_eq!(
            header_field(&url_form, "oauth_signature"),
            Some("hCtSmYh%2BiHYCEqBWrE7C7hYmtUk%3D")
        );
    }

    #[test]
    fn default_port_and_host_case_are_normalized() {
        let (base, query) = normalize_url("HTTPS://API.Example.com:443/a/b.json?x=1").unwrap();
        assert_eq!(base, "https://api.example.com/a/b.json");
        assert_eq!(query, vec![("x".to_string(), "1".to_string())]);

        let (base, _) = normalize_url("http://localhost:8080/a.json").unwrap();
        assert_eq!(base, "http://localhost:8080/a.json");
    }

    #[test]
    fn header_carries_oauth_fields() {
        let header = reference_signer()
            .sign("GET", "https://api.magento.com/1.1/account/verify_credentials.json", &[])
            .unwrap();

        assert!(header.starts_with("OAuth "));
        for field in [
            "oauth_consumer_key",
            "oauth_nonce",
            "oauth_signature",
            "oauth_signature_method",
            "oauth_timestamp",
            "oauth_token",
            "oauth_version",
        ] {
            assert!(header_field(&header, field).is_some(), "missing {field}");
        }
        assert_eq!(header_field(&header, "oauth_signature_method"), Some("HMAC-SHA1"));
    }

    #[test]
    fn empty_credentials_still_sign() {
        let signer = OAuthSigner::new(OAuth1Credentials::default());
        let header = signer.sign("GET", "https://api.magento.com/1.1/x.json", &[]).unwrap();
        assert_eq!(header_field(&header, "oauth_consumer_key"), Some(""));
    }

    #[test]
    fn debug_redacts_secrets() {
        let s = format!("{:?}", reference_signer());
        assert!(!s.contains("kAcSOqF21Fu85e7zjz7ZN2U4ZRhfV3WpwPAoE3Z7kBw"));
        assert!(s.contains("<redacted>"));
    }
}
