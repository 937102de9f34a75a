use std::{sync::Arc, time::Duration};

use anyhow::Context;
use futures::future::join_all;
use metrics::counter;
use rand::Rng;
use submission_storage::queue::{QueueError, QueuedSubmission, ReceivedMessage, SubmissionQueue};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument};

use crate::types::{DeliveryErrorCode, DeliveryOutcome};

/// Poller timing settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollerConfig {
    /// Visibility timeout before jitter is added
    pub base_visibility_timeout_seconds: i32,
    /// Upper bound of the random jitter added to each receive call
    pub visibility_jitter_seconds: i32,
    /// Delay before retrying after a failed poll cycle
    pub error_backoff: Duration,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            base_visibility_timeout_seconds: 120,
            visibility_jitter_seconds: 60,
            error_backoff: Duration::from_secs(5),
        }
    }
}

impl PollerConfig {
    /// Visibility timeout for one receive call, `base + uniform(0..=jitter)`
    ///
    /// The jitter keeps independent consumers from timing out in lockstep.
    #[must_use]
    pub fn visibility_timeout(&self) -> i32 {
        let jitter = rand::thread_rng().gen_range(0..=self.visibility_jitter_seconds.max(0));
        self.base_visibility_timeout_seconds + jitter
    }
}

/// Processes one submission taken off the queue
#[async_trait::async_trait]
pub trait SubmissionProcessor: Send + Sync {
    /// Runs the delivery for `submission`
    ///
    /// Only [`DeliveryOutcome::Ok`] leads to the message being acknowledged.
    async fn process_submission(&self, submission: &QueuedSubmission) -> DeliveryOutcome;
}

/// What happened to a single message of a batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageOutcome {
    /// The message had no body and was left alone
    Empty {
        /// Message ID
        message_id: String,
    },
    /// The body was not a submission; the message is left for redelivery
    ParseFailed {
        /// Message ID
        message_id: String,
    },
    /// Delivery failed; the message is left for redelivery
    ProcessingFailed {
        /// Submission reference
        reference: String,
        /// Error code returned by the processor
        code: DeliveryErrorCode,
        /// HTTP-like status returned by the processor
        status: u16,
    },
    /// Processing panicked; the message is left for redelivery
    Panicked {
        /// Message ID
        message_id: String,
    },
    /// Delivery succeeded
    Delivered {
        /// Submission reference
        reference: String,
        /// Whether the message was deleted from the queue
        acknowledged: bool,
    },
}

/// Aggregate of one poll cycle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollSummary {
    /// Visibility timeout the batch was received with
    pub visibility_timeout_seconds: i32,
    /// One outcome per received message, in receive order
    pub outcomes: Vec<MessageOutcome>,
}

impl PollSummary {
    /// Number of messages received
    #[must_use]
    pub fn received(&self) -> usize {
        self.outcomes.len()
    }

    /// Number of messages delivered, acknowledged or not
    #[must_use]
    pub fn delivered(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, MessageOutcome::Delivered { .. }))
            .count()
    }

    /// Number of messages left on the queue for redelivery after a failure
    #[must_use]
    pub fn failed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| {
                matches!(
                    o,
                    MessageOutcome::ParseFailed { .. }
                        | MessageOutcome::ProcessingFailed { .. }
                        | MessageOutcome::Panicked { .. }
                )
            })
            .count()
    }
}

/// Long-running consumer of the submission queue
pub struct SubmissionPoller {
    queue: Arc<SubmissionQueue>,
    processor: Arc<dyn SubmissionProcessor>,
    config: PollerConfig,
    shutdown: CancellationToken,
}

impl SubmissionPoller {
    /// Creates a new `SubmissionPoller`
    #[must_use]
    pub const fn new(
        queue: Arc<SubmissionQueue>,
        processor: Arc<dyn SubmissionProcessor>,
        config: PollerConfig,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            queue,
            processor,
            config,
            shutdown,
        }
    }

    /// Polls until shutdown, or for at most `limit` cycles
    ///
    /// A failed cycle is logged and followed by the configured backoff before
    /// the next one. The shutdown token is only observed between cycles and
    /// during the backoff, so a batch that has been received always finishes.
    ///
    /// Returns the number of cycles run.
    pub async fn run(&self, limit: Option<usize>) -> usize {
        info!("Starting SubmissionPoller");

        let mut cycles = 0;
        let mut backoff = false;

        while limit.is_none_or(|limit| cycles < limit) {
            if backoff {
                tokio::select! {
                    biased;
                    () = self.shutdown.cancelled() => break,
                    () = tokio::time::sleep(self.config.error_backoff) => {}
                }
            }

            if self.shutdown.is_cancelled() {
                break;
            }

            cycles += 1;
            backoff = match self.poll_once().await {
                Ok(summary) => {
                    if summary.received() > 0 {
                        info!(
                            received = summary.received(),
                            delivered = summary.delivered(),
                            failed = summary.failed(),
                            "Processed submission batch"
                        );
                    }
                    false
                }
                Err(e) => {
                    let upstream = e
                        .downcast_ref::<QueueError>()
                        .is_some_and(QueueError::is_upstream_error);
                    counter!("queue_poll_failed").increment(1);
                    error!(
                        event = "poll-error",
                        upstream,
                        error = ?e,
                        "Failed to poll submissions"
                    );
                    true
                }
            };
        }

        info!(cycles, "SubmissionPoller stopped");
        cycles
    }

    /// Receives one batch and processes every message in it concurrently
    ///
    /// Per-message failures are reported in the summary and never abort the
    /// rest of the batch.
    ///
    /// # Errors
    ///
    /// Returns an error if the receive call itself fails
    pub async fn poll_once(&self) -> anyhow::Result<PollSummary> {
        let visibility_timeout_seconds = self.config.visibility_timeout();

        let messages = self
            .queue
            .receive(visibility_timeout_seconds)
            .await
            .context("Failed to receive submissions")?;

        // Each message runs on its own task, a panic comes back as a `JoinError`
        let tasks = messages.into_iter().map(|message| {
            let message_id = message.message_id.clone();
            let handle = tokio::spawn(process_and_ack(
                self.queue.clone(),
                self.processor.clone(),
                message,
                visibility_timeout_seconds,
            ));

            async move {
                handle.await.unwrap_or_else(|e| {
                    counter!("submission_failed", "code" => "PANICKED", "permanent" => "false")
                        .increment(1);
                    error!(
                        event = "processing-error",
                        message_id = %message_id,
                        error = %e,
                        "Submission processing panicked, leaving it for redelivery"
                    );
                    MessageOutcome::Panicked { message_id }
                })
            }
        });

        let outcomes = join_all(tasks).await;

        Ok(PollSummary {
            visibility_timeout_seconds,
            outcomes,
        })
    }
}

#[instrument(skip_all, fields(message_id = %message.message_id))]
async fn process_and_ack(
    queue: Arc<SubmissionQueue>,
    processor: Arc<dyn SubmissionProcessor>,
    message: ReceivedMessage,
    visibility_timeout_seconds: i32,
) -> MessageOutcome {
    let message_id = message.message_id.clone();

    let parsed = match message.parse::<QueuedSubmission>(visibility_timeout_seconds) {
        Ok(Some(parsed)) => parsed,
        Ok(None) => {
            debug!("Message has no body, skipping");
            return MessageOutcome::Empty { message_id };
        }
        Err(e) => {
            counter!(
                "submission_failed",
                "code" => "UNPARSEABLE_MESSAGE",
                "permanent" => "true"
            )
            .increment(1);
            error!(
                event = "processing-error",
                error = ?e,
                "Message body is not a submission, leaving it for redelivery"
            );
            return MessageOutcome::ParseFailed { message_id };
        }
    };

    let reference = parsed.body.reference.clone();

    let outcome = processor.process_submission(&parsed.body).await;
    let permanent = outcome.is_permanent();

    if let DeliveryOutcome::Failed { code, status } = outcome {
        counter!(
            "submission_failed",
            "code" => code.to_string(),
            "permanent" => permanent.to_string()
        )
        .increment(1);
        error!(
            event = "processing-error",
            reference = %reference,
            code = %code,
            status,
            permanent,
            "Failed to process submission, leaving it for redelivery"
        );
        return MessageOutcome::ProcessingFailed {
            reference,
            code,
            status,
        };
    }

    counter!("submission_delivered").increment(1);

    // Delivery side effects have already happened. If the delete fails the
    // message comes back after its visibility timeout and is delivered again.
    let acknowledged = match queue.ack(&parsed.receipt_handle).await {
        Ok(()) => true,
        Err(e) => {
            counter!("submission_ack_failed").increment(1);
            error!(
                event = "deletion-error",
                reference = %reference,
                upstream = e.is_upstream_error(),
                error = ?e,
                "Failed to delete delivered submission, it will be delivered again"
            );
            false
        }
    };

    MessageOutcome::Delivered {
        reference,
        acknowledged,
    }
}
