//! HTTP client with built-in retry logic and error handling.

use anyhow::{Context, Result};
use log::{debug, warn};
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;

use super::retry::{MAX_RETRIES, NonRetryableError, RETRY_DELAY_MS, check_retryable};

/// HTTP client with built-in retry logic for network operations.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Creates a new HTTP client wrapping the given reqwest Client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Fetches `url` and decodes the body as JSON.
    ///
    /// Transport failures and 5xx responses are retried. Client errors and
    /// bodies that are not the expected document fail on the first attempt.
    #[tracing::instrument(skip(self))]
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        debug!("Fetching {}", url);

        let body = self
            .with_retry(url, || async {
                let response = self
                    .client
                    .get(url)
                    .send()
                    .await
                    .context("Failed to reach the registry")?
                    .error_for_status()
                    .map_err(check_retryable)?;

                response
                    .bytes()
                    .await
                    .context("Failed to read the registry response")
            })
            .await?;

        serde_json::from_slice(&body).map_err(|e| {
            NonRetryableError::InvalidDocument(format!("{} ({} bytes): {}", url, body.len(), e))
                .into()
        })
    }

    /// Runs `request` up to [`MAX_RETRIES`] times, stopping early on a
    /// [`NonRetryableError`].
    async fn with_retry<F, Fut, T>(&self, label: &str, request: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let mut attempt = 1;
        loop {
            let err = match request().await {
                Ok(value) => return Ok(value),
                Err(e) => e,
            };

            if !is_retryable_error(&err) || attempt >= MAX_RETRIES {
                debug!("{}: giving up after attempt {}: {}", label, attempt, err);
                return Err(err);
            }

            warn!(
                "{}: attempt {}/{} failed ({}), retrying in {}ms",
                label, attempt, MAX_RETRIES, err, RETRY_DELAY_MS
            );
            tokio::time::sleep(Duration::from_millis(RETRY_DELAY_MS)).await;
            attempt += 1;
        }
    }
}

fn is_retryable_error(e: &anyhow::Error) -> bool {
    e.downcast_ref::<NonRetryableError>().is_none()
}
