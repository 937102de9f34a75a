use std::sync::Arc;

use compression::CompressionPipeline;
use delivery_worker::{
    clients::AwsClients,
    health,
    notify::NotifyClient,
    orchestrator::DeliveryOrchestrator,
    poller::SubmissionPoller,
    types::Environment,
};
use metrics_exporter_dogstatsd::DogStatsDBuilder;
use submission_storage::{
    bucket::{S3AttachmentStore, S3DocumentStore},
    queue::{SqsTransport, SubmissionQueue},
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env = Environment::from_env();

    // JSON logs for staging/production (Datadog), plain logs for development
    if env.json_logs() {
        fmt()
            .json()
            .with_env_filter(EnvFilter::from_default_env())
            .init();
    } else {
        fmt().with_env_filter(EnvFilter::from_default_env()).init();
    }

    info!("Starting Delivery Worker in {} environment", env);

    if let Some(address) = env.dogstatsd_address() {
        DogStatsDBuilder::default()
            .with_remote_address(&address)?
            .install()?;
        info!("✅ Initialized DogStatsD metrics");
    }

    let clients = AwsClients::init(&env).await;

    let queue = Arc::new(SubmissionQueue::new(
        Arc::new(SqsTransport::new(clients.sqs.clone())),
        env.submission_queue_config(),
    ));

    let orchestrator = Arc::new(DeliveryOrchestrator::new(
        Arc::new(S3AttachmentStore::new(
            clients.s3.clone(),
            env.attachment_bucket(),
        )),
        Arc::new(S3DocumentStore::new(clients.s3.clone(), env.document_bucket())),
        Arc::new(NotifyClient::new(env.notify_config())?),
        Arc::new(CompressionPipeline::with_defaults(
            env.pdf_compression_options(),
        )),
        env.delivery_settings(),
    ));

    info!("✅ Initialized delivery pipeline");

    // Single shutdown token for everything
    let shutdown_token = CancellationToken::new();

    let signal_token = shutdown_token.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received Ctrl+C, initiating graceful shutdown...");
                signal_token.cancel();
            }
            Err(e) => {
                error!("Failed to listen for Ctrl+C: {}", e);
            }
        }
    });

    let health_port = env.health_port();
    let health_token = shutdown_token.clone();
    let health_handle = tokio::spawn(async move {
        if let Err(e) = health::start_health_server(health_port, health_token).await {
            error!("Health server error: {}", e);
        }
    });

    // Blocks until shutdown; the batch in flight is finished first
    SubmissionPoller::new(queue, orchestrator, env.poller_config(), shutdown_token.clone())
        .run(None)
        .await;

    shutdown_token.cancel();
    health_handle.await.ok();

    clients.teardown();

    info!("✅ Delivery Worker shutdown complete");
    Ok(())
}
