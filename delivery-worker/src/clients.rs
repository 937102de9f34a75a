//! Process-wide AWS clients

use std::{sync::Arc, time::Duration};

use aws_config::{retry::RetryConfig, timeout::TimeoutConfig, BehaviorVersion, SdkConfig};
use aws_sdk_s3::Client as S3Client;
use aws_sdk_sqs::Client as SqsClient;
use tracing::info;

use crate::types::Environment;

const MAX_ATTEMPTS: u32 = 3;
const INITIAL_BACKOFF: Duration = Duration::from_millis(50);
const OPERATION_TIMEOUT: Duration = Duration::from_secs(30);

/// AWS clients shared by every component of the worker
///
/// Built once at startup with [`AwsClients::init`] and released once with
/// [`AwsClients::teardown`] after the poller has stopped.
#[derive(Clone)]
pub struct AwsClients {
    /// Queue client
    pub sqs: Arc<SqsClient>,
    /// Object storage client
    pub s3: Arc<S3Client>,
}

impl AwsClients {
    /// Builds the clients for `env` from one shared SDK configuration
    pub async fn init(env: &Environment) -> Self {
        let shared = load_sdk_config(env.override_aws_endpoint_url()).await;

        let sqs = Arc::new(SqsClient::new(&shared));
        let s3 = Arc::new(S3Client::from_conf(
            aws_sdk_s3::config::Builder::from(&shared)
                .force_path_style(env.s3_force_path_style())
                .build(),
        ));

        info!("✅ Initialized AWS clients");

        Self { sqs, s3 }
    }

    /// Releases the clients
    ///
    /// Connection pools close once the last handle is dropped, so any clone
    /// still held elsewhere keeps them alive until it goes away too.
    pub fn teardown(self) {
        let sqs_handles = Arc::strong_count(&self.sqs);
        let s3_handles = Arc::strong_count(&self.s3);
        drop(self);

        info!(sqs_handles, s3_handles, "AWS clients released");
    }
}

/// Standard retries and an operation timeout, against `endpoint_url` when set
async fn load_sdk_config(endpoint_url: Option<&str>) -> SdkConfig {
    let loader = aws_config::defaults(BehaviorVersion::latest())
        .retry_config(
            RetryConfig::standard()
                .with_max_attempts(MAX_ATTEMPTS)
                .with_initial_backoff(INITIAL_BACKOFF),
        )
        .timeout_config(
            TimeoutConfig::builder()
                .operation_timeout(OPERATION_TIMEOUT)
                .build(),
        );

    match endpoint_url {
        Some(url) => loader.endpoint_url(url),
        None => loader,
    }
    .load()
    .await
}
