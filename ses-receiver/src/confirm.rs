//! SNS subscription confirmation - fetching the `SubscribeURL`.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use tracing::{error, info};
use url::Url;

use crate::error::ConfirmationError;

/// Maximum number of response body bytes kept in failure reports.
const MAX_BODY_PREVIEW: usize = 512;

/// Status and body of an outbound GET.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

/// Outbound HTTP client used only for subscription confirmation.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ConfirmationClient: Send + Sync {
    /// Issue a GET to `url`. Transport failures, including timeouts, are
    /// reported as [`ConfirmationError::Transport`].
    async fn get(&self, url: &str) -> Result<HttpResponse, ConfirmationError>;
}

/// [`ConfirmationClient`] backed by a shared reqwest client.
#[derive(Debug, Clone)]
pub struct ReqwestConfirmationClient {
    client: Client,
    timeout: Duration,
}

impl ReqwestConfirmationClient {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder()
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self::with_client(client, timeout))
    }

    pub fn with_client(client: Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }
}

#[async_trait]
impl ConfirmationClient for ReqwestConfirmationClient {
    async fn get(&self, url: &str) -> Result<HttpResponse, ConfirmationError> {
        info!(
            url = url,
            timeout_seconds = self.timeout.as_secs_f64(),
            "subscribe_url_fetch_starting"
        );

        let response = match self.client.get(url).timeout(self.timeout).send().await {
            Ok(resp) => resp,
            Err(e) => {
                if e.is_timeout() {
                    error!(
                        url = url,
                        timeout_seconds = self.timeout.as_secs_f64(),
                        error = %e,
                        "subscribe_url_fetch_timeout"
                    );
                } else {
                    error!(url = url, error = %e, "subscribe_url_fetch_error");
                }
                return Err(ConfirmationError::Transport(e.to_string()));
            }
        };

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| ConfirmationError::Transport(e.to_string()))?;

        info!(url = url, status_code = status, "subscribe_url_fetch_complete");

        Ok(HttpResponse { status, body })
    }
}

/// Confirm a subscription by fetching its `SubscribeURL`.
///
/// Only HTTP 200 counts as confirmed. Nothing is retried; SNS re-sends the
/// confirmation if the subscription stays pending.
pub async fn confirm_subscription(
    client: &dyn ConfirmationClient,
    subscribe_url: &str,
) -> Result<(), ConfirmationError> {
    validate_subscribe_url(subscribe_url)?;

    let response = client.get(subscribe_url).await?;

    if response.status == 200 {
        return Ok(());
    }

    Err(ConfirmationError::UnexpectedStatus {
        status: response.status,
        body: truncate_body(&response.body, MAX_BODY_PREVIEW),
    })
}

/// Reject anything that is not an absolute http(s) URL before issuing a GET.
fn validate_subscribe_url(subscribe_url: &str) -> Result<(), ConfirmationError> {
    let parsed = Url::parse(subscribe_url).map_err(|e| ConfirmationError::InvalidUrl {
        url: subscribe_url.to_string(),
        reason: e.to_string(),
    })?;

    match parsed.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(ConfirmationError::InvalidUrl {
            url: subscribe_url.to_string(),
            reason: format!("unsupported scheme '{}'", scheme),
        }),
    }
}

fn truncate_body(body: &str, max: usize) -> String {
    if body.len() <= max {
        return body.to_string();
    }

    let mut end = max;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}
