//! Host Tools channel adapter.
//!
//! Delivers host replies and scheduled template messages to the guest thread
//! of a reservation through the Host Tools REST API:
//! `POST {base}/sendmessage/{reservation_id}` with `{"message": body}`,
//! authenticated by an `authToken` header.

use async_trait::async_trait;
use innkeep_config::HostToolsConfig;
use innkeep_core::channel::MessageSender;
use innkeep_core::error::ChannelError;
use std::time::Duration;
use tracing::{debug, warn};

const CHANNEL: &str = "hosttools";

/// Host Tools REST client.
pub struct HostToolsClient {
    base_url: String,
    auth_token: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for HostToolsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostToolsClient")
            .field("base_url", &self.base_url)
            .field("auth_token", &"[REDACTED]")
            .finish()
    }
}

impl HostToolsClient {
    pub fn new(
        base_url: impl Into<String>,
        auth_token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ChannelError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ChannelError::NotConfigured(format!("HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            auth_token: auth_token.into(),
            client,
        })
    }

    /// Build from configuration. Fails when no auth token is set.
    pub fn from_config(config: &HostToolsConfig) -> Result<Self, ChannelError> {
        let token = config.auth_token.as_deref().ok_or_else(|| {
            ChannelError::NotConfigured(
                "hosttools.auth_token is not set (HOSTTOOLS_AUTH_TOKEN)".into(),
            )
        })?;
        Self::new(&config.api_url, token, Duration::from_secs(config.timeout_secs))
    }
}

#[async_trait]
impl MessageSender for HostToolsClient {
    fn name(&self) -> &str {
        CHANNEL
    }

    async fn send_message(
        &self,
        reservation_external_id: &str,
        body: &str,
    ) -> Result<(), ChannelError> {
        let url = format!("{}/sendmessage/{}", self.base_url, reservation_external_id);
        debug!(
            reservation = %reservation_external_id,
            len = body.len(),
            "Sending Host Tools message"
        );

        let response = self
            .client
            .post(&url)
            .header("authToken", &self.auth_token)
            .json(&serde_json::json!({ "message": body }))
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() || e.is_timeout() {
                    ChannelError::ConnectionLost(e.to_string())
                } else {
                    ChannelError::DeliveryFailed {
                        channel: CHANNEL.into(),
                        reason: e.to_string(),
                    }
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), body = %error_body, "Host Tools rejected message");
            return Err(ChannelError::DeliveryFailed {
                channel: CHANNEL.into(),
                reason: format!("HTTP {}: {}", status.as_u16(), error_body),
            });
        }

        Ok(())
    }
}
