//! Submission queue operations
//!
//! The producer side enqueues accepted applications; the consumer side
//! receives and acknowledges them through the same handle.

use crate::queue::{
    error::QueueResult,
    transport::QueueTransport,
    types::{QueueConfig, QueuedSubmission, ReceiveRequest, ReceivedMessage},
};
use std::sync::Arc;

/// Queue of submissions awaiting delivery
pub struct SubmissionQueue {
    transport: Arc<dyn QueueTransport>,
    config: QueueConfig,
}

impl SubmissionQueue {
    /// Creates a new submission queue
    ///
    /// # Arguments
    ///
    /// * `transport` - Transport the queue talks through
    /// * `config` - Queue configuration including URL and default parameters
    #[must_use]
    pub fn new(transport: Arc<dyn QueueTransport>, config: QueueConfig) -> Self {
        Self { transport, config }
    }

    /// Enqueues a submission for asynchronous delivery
    ///
    /// No idempotency key is attached: retrying after a timeout may enqueue
    /// the same submission twice.
    ///
    /// # Returns
    ///
    /// The message ID if successful or an empty string
    ///
    /// # Errors
    ///
    /// Returns `QueueError` if serialization or the send operation fails
    pub async fn enqueue(&self, submission: &QueuedSubmission) -> QueueResult<String> {
        let body = serde_json::to_string(submission)?;

        let message_id = self.transport.send(&self.config.queue_url, body).await?;

        tracing::debug!(
            reference = %submission.reference,
            message_id = %message_id,
            "Enqueued submission"
        );

        Ok(message_id)
    }

    /// Receives a batch of raw messages with the given visibility timeout
    ///
    /// # Errors
    ///
    /// Returns `QueueError` if the receive operation fails
    pub async fn receive(
        &self,
        visibility_timeout_seconds: i32,
    ) -> QueueResult<Vec<ReceivedMessage>> {
        self.transport
            .receive(
                &self.config.queue_url,
                ReceiveRequest {
                    max_messages: self.config.default_max_messages,
                    wait_time_seconds: self.config.default_wait_time_seconds,
                    visibility_timeout_seconds,
                },
            )
            .await
    }

    /// Acknowledges receipt of a message by deleting it from the queue
    ///
    /// # Arguments
    ///
    /// * `receipt_handle` - The receipt handle from the received message
    ///
    /// # Errors
    ///
    /// Returns `QueueError` if the acknowledgment fails
    pub async fn ack(&self, receipt_handle: &str) -> QueueResult<()> {
        self.transport
            .delete(&self.config.queue_url, receipt_handle)
            .await
    }
}
