use anyhow::{Context, Result};
use reqwest::{Client, Request, Response};
use std::time::Duration;

use crate::error::TransformError;
use crate::resolver::Provider;

/// HTTP client for the upstream AI providers
///
/// Transformations are never retried: one request, one outcome.
pub struct ProviderHttpClient {
    /// Shared HTTP client with connection pooling
    client: Client,
}

impl ProviderHttpClient {
    /// Create a new HTTP client
    pub fn new(connect_timeout: u64, request_timeout: u64) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(connect_timeout))
            .timeout(Duration::from_secs(request_timeout))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client })
    }

    /// Execute a request exactly once
    ///
    /// Any HTTP status is returned as `Ok`; only transport failures are errors.
    pub async fn send(&self, provider: Provider, request: Request) -> Result<Response, TransformError> {
        let method = request.method().clone();
        let url = redact_query(request.url());
        tracing::debug!(
            provider = %provider,
            method = %method,
            url = %url,
            "Sending HTTP request"
        );

        match self.client.execute(request).await {
            Ok(response) => {
                let status = response.status();
                if status.is_success() {
                    tracing::debug!(status = %status, "Request successful");
                } else {
                    tracing::warn!(
                        provider = %provider,
                        status = %status,
                        url = %url,
                        "Received error response"
                    );
                }
                Ok(response)
            }
            Err(e) => {
                let error_kind = error_kind(&e);
                tracing::error!(
                    provider = %provider,
                    error_kind = error_kind,
                    error = %e,
                    url = %url,
                    "HTTP request failed"
                );
                Err(TransformError::Transport {
                    provider,
                    kind: error_kind,
                    message: e.without_url().to_string(),
                })
            }
        }
    }

    /// Get the underlying HTTP client
    pub fn client(&self) -> &Client {
        &self.client
    }
}

/// Categorize a reqwest error for logs and messages
pub fn error_kind(e: &reqwest::Error) -> &'static str {
    if e.is_timeout() {
        "timeout"
    } else if e.is_connect() {
        "connection_failed"
    } else if e.is_request() {
        "request_error"
    } else if e.is_body() {
        "body_error"
    } else if e.is_decode() {
        "decode_error"
    } else {
        "unknown"
    }
}

/// URL without its query string; Google passes the API key there
fn redact_query(url: &reqwest::Url) -> String {
    let mut url = url.clone();
    if url.query().is_some() {
        url.set_query(Some("key=***"));
    }
    url.to_string()
}
