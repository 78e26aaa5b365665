use reqwest::header::AUTHORIZATION;
use reqwest::multipart::{Form, Part};

use crate::auth::Authorizer;
use crate::config::{Config, MagentoConfig};
use crate::endpoint::Base;
use crate::error::{MagentoError, classify};
use crate::stream::{StreamOptions, StreamReceiver};
use crate::types::params::MEDIA_PARAM;
use crate::types::{ApiResponse, Method, ParamValue, Params, Payload, PreparedRequest, RawResponse};

/// Magento API client
///
/// The client is generic over a [`Config`] implementation that provides
/// headers, endpoint resolution and the authentication mode. The mode is
/// turned into an [`Authorizer`] once, at construction.
#[derive(Debug, Clone)]
pub struct Client<C: Config> {
    http: reqwest::Client,
    config: C,
    authorizer: Authorizer,
}

impl Client<MagentoConfig> {
    /// Creates a client with the default configuration
    ///
    /// Credentials come from the `MAGENTO_*` environment variables, see
    /// [`MagentoConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`MagentoError::Config`] if the bearer token is not a valid
    /// header value.
    pub fn new() -> Result<Self, MagentoError> {
        Self::with_config(MagentoConfig::new())
    }
}

impl<C: Config> Client<C> {
    /// Creates a client with the given configuration.
    ///
    /// No overall timeout is set on the HTTP client so that streams can stay
    /// open; one-shot calls use [`Config::request_timeout`].
    ///
    /// # Errors
    ///
    /// Returns [`MagentoError::Config`] if the bearer token is not a valid
    /// header value.
    ///
    /// # Panics
    ///
    /// Panics if the reqwest client cannot be built.
    pub fn with_config(config: C) -> Result<Self, MagentoError> {
        let authorizer = Authorizer::new(config.auth_mode())?;
        Ok(Self {
            http: reqwest::Client::builder()
                .connect_timeout(std::time::Duration::from_secs(10))
                .build()
                .expect("reqwest client"),
            config,
            authorizer,
        })
    }

    /// Replaces the HTTP client with a custom one
    ///
    /// Useful for setting proxies or other HTTP configuration.
    #[must_use]
    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    /// Returns a reference to the client's configuration
    #[must_use]
    pub const fn config(&self) -> &C {
        &self.config
    }

    /// Resolves a one-shot call without sending it
    ///
    /// The `base` parameter, if present, selects the base URL and is removed.
    /// GET parameters become the query string; POST parameters become a form
    /// body, or a multipart body when a `media` parameter is present. File
    /// parameters outside a multipart body are dropped.
    #[must_use]
    pub fn prepare(&self, method: Method, path: &str, mut params: Params) -> PreparedRequest {
        let base = params
            .take_base()
            .unwrap_or_else(|| Base::Rest.name().to_string());
        let streaming = Base::is_streaming_name(&base);
        let url = self.config.url(path, &base);

        let payload = match method {
            Method::Get => Payload::Query(text_only(&params, "query")),
            Method::Post if params.contains_key(MEDIA_PARAM) => Payload::Multipart(params),
            Method::Post => Payload::Form(text_only(&params, "form")),
        };

        PreparedRequest {
            method,
            url,
            base,
            streaming,
            payload,
        }
    }

    /// Authorizes and sends a prepared request
    ///
    /// A body with a top-level `errors` member fails with
    /// [`MagentoError::Api`] whatever the status; any other status than 200
    /// fails with [`MagentoError::Status`].
    #[tracing::instrument(
        skip_all,
        fields(method = %prepared.method, url = %prepared.url, base = %prepared.base)
    )]
    pub async fn execute(&self, prepared: PreparedRequest) -> Result<ApiResponse, MagentoError> {
        tracing::debug!(streaming = prepared.streaming, "Dispatching request");

        let headers = self.config.headers()?;
        let auth = self.authorizer.authorize(
            prepared.method.as_str(),
            &prepared.url,
            prepared.payload.signature_params(),
        )?;

        let mut request = self
            .http
            .request(prepared.method.into(), &prepared.url)
            .headers(headers)
            .header(AUTHORIZATION, auth);
        if let Some(timeout) = self.config.request_timeout() {
            request = request.timeout(timeout);
        }

        request = match prepared.payload {
            Payload::Query(query) => request.query(&query),
            Payload::Form(form) => request.form(&form),
            Payload::Multipart(params) => request.multipart(multipart_form(params)?),
        };

        let response = request.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?;
        tracing::debug!(status = status.as_u16(), len = body.len(), "Response received");

        let (data, response) = classify(RawResponse {
            status,
            headers,
            body,
        })?;
        Ok(ApiResponse { data, response })
    }

    /// Prepares and sends a one-shot call
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        params: Params,
    ) -> Result<ApiResponse, MagentoError> {
        self.execute(self.prepare(method, path, params)).await
    }

    /// `GET path` with `params` as the query string
    pub async fn get(&self, path: &str, params: Params) -> Result<ApiResponse, MagentoError> {
        self.request(Method::Get, path, params).await
    }

    /// `POST path` with `params` as the body
    pub async fn post(&self, path: &str, params: Params) -> Result<ApiResponse, MagentoError> {
        self.request(Method::Post, path, params).await
    }

    /// Opens a stream with `\r\n`-delimited messages
    ///
    /// See [`stream_with`](Self::stream_with).
    pub fn stream(&self, method: &str, params: Params) -> Result<StreamReceiver, MagentoError> {
        self.stream_with(method, params, StreamOptions::default())
    }

    /// Opens a long-lived stream
    ///
    /// `user` and `site` open the user and site streams; any other method is
    /// resolved against the public stream base. Parameters are sent as the
    /// query string of a GET, authorized like one-shot calls. Connection
    /// failures are delivered on the receiver, not returned here.
    ///
    /// # Errors
    ///
    /// Returns an error if the headers or the authorization cannot be built.
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime.
    #[tracing::instrument(skip(self, params, options))]
    pub fn stream_with(
        &self,
        method: &str,
        params: Params,
        options: StreamOptions,
    ) -> Result<StreamReceiver, MagentoError> {
        let base = Base::for_stream(method);
        let url = self.config.url(method, base.name());
        let query = text_only(&params, "query");

        let headers = self.config.headers()?;
        let auth = self
            .authorizer
            .authorize(Method::Get.as_str(), &url, &query)?;

        tracing::debug!(%url, %base, "Opening stream");
        let request = self
            .http
            .get(&url)
            .headers(headers)
            .header(AUTHORIZATION, auth)
            .query(&query);

        Ok(StreamReceiver::spawn(request, options))
    }
}

/// Text pairs of `params`; file parts cannot travel in a `target` and are dropped
fn text_only(params: &Params, target: &'static str) -> Vec<(String, String)> {
    let (pairs, files) = params.text_pairs();
    if !files.is_empty() {
        tracing::warn!(?files, target, "Dropping file parameters outside a multipart body");
    }
    pairs
}

fn multipart_form(params: Params) -> Result<Form, MagentoError> {
    let mut form = Form::new();
    for (key, value) in params {
        form = match value {
            ParamValue::Text(text) => form.text(key, text),
            ParamValue::File(file) => {
                let mut part = Part::bytes(file.bytes.to_vec());
                if let Some(name) = file.file_name {
                    part = part.file_name(name);
                }
                if let Some(mime) = file.mime {
                    part = part.mime_str(&mime)?;
                }
                form.part(key, part)
            }
        };
    }
    Ok(form)
}
