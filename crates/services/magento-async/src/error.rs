use reqwest::StatusCode;
use thiserror::Error;

use crate::types::RawResponse;

/// Errors that can occur when using the Magento API client
#[derive(Debug, Error)]
pub enum MagentoError {
    /// Transport failure: connection, DNS, TLS, timeout or body read
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a top-level `errors` member
    ///
    /// `errors` is the member exactly as decoded. This is reported even when the
    /// HTTP status was 200.
    #[error("API error: {errors}")]
    Api {
        /// The decoded `errors` member
        errors: serde_json::Value,
        /// The full decoded body
        body: serde_json::Value,
        /// Status, headers and raw bytes of the response
        response: Box<RawResponse>,
    },

    /// Non-200 status, or a body that could not be decoded as JSON
    ///
    /// `body` is `None` when the response body was not valid JSON.
    #[error("Status Code: {}", .status.as_u16())]
    Status {
        /// HTTP status of the response
        status: StatusCode,
        /// The decoded body, when it was valid JSON
        body: Option<serde_json::Value>,
        /// Status, headers and raw bytes of the response
        response: Box<RawResponse>,
    },

    /// Configuration error (e.g., a header value that cannot be sent)
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// OAuth1 signature generation failed
    #[error("OAuth error: {0}")]
    OAuth(String),
}

impl MagentoError {
    /// Returns the HTTP status code when the server produced a response
    #[must_use]
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Api { response, .. } | Self::Status { response, .. } => Some(response.status),
            Self::Http(e) => e.status(),
            Self::Config(_) | Self::OAuth(_) => None,
        }
    }

    /// Returns the raw response attached to this error, if any
    #[must_use]
    pub fn response(&self) -> Option<&RawResponse> {
        match self {
            Self::Api { response, .. } | Self::Status { response, .. } => Some(response.as_ref()),
            Self::Http(_) | Self::Config(_) | Self::OAuth(_) => None,
        }
    }

    /// Returns the decoded body attached to this error, if any
    #[must_use]
    pub fn body(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Api { body, .. } => Some(body),
            Self::Status { body, .. } => body.as_ref(),
            Self::Http(_) | Self::Config(_) | Self::OAuth(_) => None,
        }
    }

    /// True for failures that happened before any response was classified
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Http(_))
    }
}

/// Classifies a completed response
///
/// Order matters: an undecodable body is a status error whatever the status
/// was, an `errors` member wins over the status code, and only an exact 200
/// counts as success.
pub(crate) fn classify(
    raw: RawResponse,
) -> Result<(serde_json::Value, RawResponse), MagentoError> {
    let status = raw.status;
    let Ok(data) = serde_json::from_slice::<serde_json::Value>(&raw.body) else {
        return Err(MagentoError::Status {
            status,
            body: None,
            response: Box::new(raw),
        });
    };

    if let Some(errors) = data.get("errors") {
        return Err(MagentoError::Api {
            errors: errors.clone(),
            body: data,
            response: Box::new(raw),
        });
    }

    if status != StatusCode::OK {
        return Err(MagentoError::Status {
            status,
            body: Some(data),
            response: Box::new(raw),
        });
    }

    Ok((data, raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderMap;

    fn raw(status: u16, body: &'static str) -> RawResponse {
        RawResponse {
            status: StatusCode::from_u16(status).unwrap(),
            headers: HeaderMap::new(),
            body: bytes::Bytes::from_static(body.as_bytes()),
        }
    }

    #[test]
    fn ok_json_is_success() {
        let (data, resp) = classify(raw(200, r#"{"id":1}"#)).unwrap();
        assert_eq!(data["id"], 1);
        assert_eq!(resp.status, StatusCode::OK);
    }

    #[test]
    fn errors_member_on_200_is_api_error() {
        let err = classify(raw(200, r#"{"errors":[{"message":"bad"}]}"#)).unwrap_err();
        match err {
            MagentoError::Api { errors, body, .. } => {
                assert_eq!(errors, serde_json::json!([{"message": "bad"}]));
                assert!(body.get("errors").is_some());
            }
            other => panic!("Expected Api error, got {other:?}"),
        }
    }

    #[test]
    fn null_errors_member_still_counts() {
        let err = classify(raw(200, r#"{"errors":null}"#)).unwrap_err();
        assert!(matches!(err, MagentoError::Api { .. }));
    }

    #[test]
    fn non_json_body_is_status_error() {
        let err = classify(raw(503, "<html>Over capacity</html>")).unwrap_err();
        assert_eq!(err.to_string(), "Status Code: 503");
        assert!(err.body().is_none());
        assert_eq!(err.status(), Some(StatusCode::SERVICE_UNAVAILABLE));
    }

    #[test]
    fn non_json_body_on_200_is_status_error() {
        let err = classify(raw(200, "not json")).unwrap_err();
        assert_eq!(err.to_string(), "Status Code: 200");
    }

    #[test]
    fn json_with_non_200_status_keeps_body() {
        let err = classify(raw(404, r#"{"detail":"missing"}"#)).unwrap_err();
        assert_eq!(err.to_string(), "Status Code: 404");
        assert_eq!(err.body().unwrap()["detail"], "missing");
        assert_eq!(err.response().unwrap().body.as_ref(), br#"{"detail":"missing"}"#);
    }

    #[test]
    fn created_is_not_success() {
        let err = classify(raw(201, r#"{"id":1}"#)).unwrap_err();
        assert!(matches!(err, MagentoError::Status { .. }));
    }
}
