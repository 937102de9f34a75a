use std::time::Duration;

use reqwest::{header, Client, StatusCode};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_tracing::TracingMiddleware;

use super::{EmailNotification, NotificationChannel, NotifyError, NotifyResult};

/// Maximum number of idle connections to maintain per host
const MAX_IDLE_CONNECTIONS_PER_HOST: usize = 10;

/// Connection settings for the notification service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifyConfig {
    /// Service base URL, without a trailing slash
    pub base_url: String,
    /// API key sent as a bearer token
    pub api_key: String,
    /// Per-request timeout
    pub request_timeout: Duration,
}

/// HTTP client for the notification service's email endpoint
pub struct NotifyClient {
    base_url: String,
    api_key: String,
    http_client: ClientWithMiddleware,
}

impl NotifyClient {
    /// Creates a new notification client
    ///
    /// # Errors
    ///
    /// Returns `NotifyError::Upstream` if the HTTP client cannot be built
    pub fn new(config: NotifyConfig) -> NotifyResult<Self> {
        let reqwest_client = Client::builder()
            .timeout(config.request_timeout)
            .pool_max_idle_per_host(MAX_IDLE_CONNECTIONS_PER_HOST)
            .build()
            .map_err(|e| NotifyError::Upstream(format!("Failed to create HTTP client: {e}")))?;

        let http_client = ClientBuilder::new(reqwest_client)
            .with(TracingMiddleware::default())
            .build();

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key,
            http_client,
        })
    }
}

#[async_trait::async_trait]
impl NotificationChannel for NotifyClient {
    async fn send_email(&self, notification: EmailNotification) -> NotifyResult<()> {
        let url = format!("{}/v2/notifications/email", self.base_url);
        let json_body = serde_json::to_string(&notification)?;

        let response = self
            .http_client
            .post(url)
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::AUTHORIZATION, format!("Bearer {}", self.api_key))
            .body(json_body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            tracing::debug!(reference = %notification.reference, "Email accepted");
            return Ok(());
        }

        if matches!(
            status,
            StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT
        ) {
            return Err(NotifyError::Timeout);
        }

        let message = response.text().await.unwrap_or_default();
        if status.is_client_error() {
            Err(NotifyError::Rejected {
                status: status.as_u16(),
                message,
            })
        } else {
            Err(NotifyError::Upstream(format!("status {status}: {message}")))
        }
    }
}
