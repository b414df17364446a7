//! REST client module.
//!
//! Wraps the backend's HTTP surface. Each resource lives in its own file as an
//! `impl ApiClient` block; this module owns the transport and response handling.

mod notes;
mod papers;
mod search;
mod tags;

pub use papers::{validate_pdf, validate_pdf_name};

use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;

use crate::config::Config;
use crate::errors::ClientError;

/// Connect timeout applied to every request.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP client for the paper backend.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base: Url,
}

impl ApiClient {
    /// Build a client from configuration.
    pub fn new(config: &Config) -> Result<Self, ClientError> {
        Self::with_timeout(&config.api_url, config.request_timeout)
    }

    /// Build a client for a base URL with an explicit request timeout.
    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let base = Url::parse(base_url.trim())
            .map_err(|e| ClientError::Validation(format!("Invalid API URL {:?}: {}", base_url, e)))?;

        if !matches!(base.scheme(), "http" | "https") || base.cannot_be_a_base() {
            return Err(ClientError::Validation(format!(
                "API URL must be an http(s) URL: {}",
                base_url
            )));
        }

        let http = Client::builder()
            .timeout(timeout)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;

        Ok(Self { http, base })
    }

    /// The configured backend base URL.
    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Build an endpoint URL from path segments, percent-encoding each one.
    ///
    /// Paper identifiers are OpenAlex URLs, so they must never be spliced into
    /// the path unescaped.
    pub(crate) fn endpoint(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::Validation(format!("Invalid API URL: {}", self.base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Send a request and turn non-success statuses into errors.
    async fn execute(&self, request: RequestBuilder) -> Result<Response, ClientError> {
        let response = request.send().await?;
        let status = response.status();

        tracing::debug!(%status, url = %response.url(), "Backend responded");

        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let err = ClientError::from_status(status, &body);
        tracing::warn!("Backend returned {}: {}", status, err.message());
        Err(err)
    }

    /// Send a request and decode its JSON body.
    async fn fetch_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ClientError> {
        let response = self.execute(request).await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Send a request whose response body is irrelevant.
    async fn fetch_empty(&self, request: RequestBuilder) -> Result<(), ClientError> {
        self.execute(request).await?;
        Ok(())
    }
}
