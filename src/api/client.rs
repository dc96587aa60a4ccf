//! HTTP client for the bot backend.
//!
//! Every endpoint decodes into an explicit response type; a body that does
//! not match is an error, never silently replaced.

use std::time::Duration;

use reqwest::{Method, RequestBuilder, StatusCode, Url};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::config::ApiConfig;
use crate::error::ApiError;

/// Authenticated REST client.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    timeout: Duration,
    token: RwLock<Option<SecretString>>,
}

impl ApiClient {
    pub fn new(config: ApiConfig) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ApiError::InvalidRequest(format!("HTTP client setup failed: {e}")))?;
        Ok(Self {
            http,
            base_url: config.base_url,
            timeout: config.timeout,
            token: RwLock::new(config.token),
        })
    }

    /// Replace (or clear) the bearer token used for later requests.
    pub async fn set_token(&self, token: Option<SecretString>) {
        *self.token.write().await = token;
    }

    pub async fn has_token(&self) -> bool {
        self.token.read().await.is_some()
    }

    /// Absolute URL for an endpoint path such as `/workflows`.
    ///
    /// Each segment is percent-encoded, so segments may contain spaces or `#`.
    pub fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        self.build_url(path, None)
    }

    /// Absolute URL for one item of a collection, e.g. `/workflows/{id}`.
    ///
    /// The id is always a single segment, even when it contains `/`.
    pub fn item_endpoint(&self, collection: &str, id: &str) -> Result<Url, ApiError> {
        self.build_url(collection, Some(id))
    }

    fn build_url(&self, path: &str, id: Option<&str>) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                ApiError::InvalidRequest(format!("base URL cannot take path {path}"))
            })?;
            segments
                .pop_if_empty()
                .extend(path.split('/').filter(|s| !s.is_empty()));
            if let Some(id) = id {
                segments.push(id);
            }
        }
        Ok(url)
    }

    /// Start a request to `path` with the bearer token attached.
    pub(crate) async fn request(
        &self,
        method: Method,
        path: &str,
    ) -> Result<RequestBuilder, ApiError> {
        let url = self.endpoint(path)?;
        Ok(self.authorized(method, url).await)
    }

    /// Start a request to one item of `collection` with the bearer token attached.
    pub(crate) async fn request_item(
        &self,
        method: Method,
        collection: &str,
        id: &str,
    ) -> Result<RequestBuilder, ApiError> {
        let url = self.item_endpoint(collection, id)?;
        Ok(self.authorized(method, url).await)
    }

    async fn authorized(&self, method: Method, url: Url) -> RequestBuilder {
        let mut builder = self.http.request(method, url);
        if let Some(token) = self.token.read().await.as_ref() {
            builder = builder.bearer_auth(token.expose_secret());
        }
        builder
    }

    /// Start a request to an absolute URL outside the backend (no token).
    pub(crate) fn external(&self, method: Method, url: &str) -> Result<RequestBuilder, ApiError> {
        let url = Url::parse(url)
            .map_err(|e| ApiError::InvalidRequest(format!("bad URL {url}: {e}")))?;
        Ok(self.http.request(method, url))
    }

    /// Send and decode a JSON response body into `T`.
    pub(crate) async fn send_json<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        method: &Method,
        path: &str,
    ) -> Result<T, ApiError> {
        let body = self.send_raw(builder, method, path).await?;
        serde_json::from_str(&body).map_err(|e| {
            warn!(path, error = %e, "Response did not match the expected schema");
            ApiError::InvalidResponse {
                path: path.to_string(),
                reason: e.to_string(),
            }
        })
    }

    /// Send and ignore the response body.
    pub(crate) async fn send_empty(
        &self,
        builder: RequestBuilder,
        method: &Method,
        path: &str,
    ) -> Result<(), ApiError> {
        self.send_raw(builder, method, path).await.map(|_| ())
    }

    async fn send_raw(
        &self,
        builder: RequestBuilder,
        method: &Method,
        path: &str,
    ) -> Result<String, ApiError> {
        debug!(%method, path, "API request");

        let resp = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                ApiError::Timeout {
                    path: path.to_string(),
                    timeout: self.timeout,
                }
            } else {
                ApiError::RequestFailed {
                    method: method.to_string(),
                    path: path.to_string(),
                    reason: e.to_string(),
                }
            }
        })?;

        let status = resp.status();
        let body = resp.text().await.map_err(|e| ApiError::RequestFailed {
            method: method.to_string(),
            path: path.to_string(),
            reason: e.to_string(),
        })?;

        if status == StatusCode::UNAUTHORIZED {
            return Err(ApiError::Unauthorized {
                method: method.to_string(),
                path: path.to_string(),
            });
        }
        if !status.is_success() {
            warn!(%method, path, status = status.as_u16(), "API request failed");
            return Err(ApiError::Status {
                method: method.to_string(),
                path: path.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        debug!(%method, path, status = status.as_u16(), bytes = body.len(), "API response");
        Ok(body)
    }
}
