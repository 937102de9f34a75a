//! Queue transport
//!
//! The transport is the narrow seam between the submission queue and the
//! message broker: receive, delete and send on a queue URL.

use crate::queue::{
    error::QueueResult,
    types::{ReceiveRequest, ReceivedMessage},
};
use async_trait::async_trait;
use aws_sdk_sqs::Client as SqsClient;
use std::sync::Arc;

/// Visibility-timeout message queue transport
#[async_trait]
pub trait QueueTransport: Send + Sync {
    /// Receives up to `request.max_messages` messages, hiding them for
    /// `request.visibility_timeout_seconds`
    async fn receive(
        &self,
        queue_url: &str,
        request: ReceiveRequest,
    ) -> QueueResult<Vec<ReceivedMessage>>;

    /// Deletes a message using the receipt handle of its current delivery
    async fn delete(&self, queue_url: &str, receipt_handle: &str) -> QueueResult<()>;

    /// Sends a raw message body, returning the message ID
    async fn send(&self, queue_url: &str, body: String) -> QueueResult<String>;
}

/// SQS-backed transport for standard queues
pub struct SqsTransport {
    sqs_client: Arc<SqsClient>,
}

impl SqsTransport {
    /// Creates a new SQS transport
    ///
    /// # Arguments
    ///
    /// * `sqs_client` - Pre-configured SQS client
    #[must_use]
    pub const fn new(sqs_client: Arc<SqsClient>) -> Self {
        Self { sqs_client }
    }
}

#[async_trait]
impl QueueTransport for SqsTransport {
    async fn receive(
        &self,
        queue_url: &str,
        request: ReceiveRequest,
    ) -> QueueResult<Vec<ReceivedMessage>> {
        let result = self
            .sqs_client
            .receive_message()
            .queue_url(queue_url)
            .max_number_of_messages(request.max_messages)
            .visibility_timeout(request.visibility_timeout_seconds)
            .wait_time_seconds(request.wait_time_seconds)
            .send()
            .await?;

        let messages = result
            .messages()
            .iter()
            .filter_map(|msg| {
                let Some(receipt_handle) = msg.receipt_handle() else {
                    tracing::warn!(
                        message_id = ?msg.message_id(),
                        "Received message without receipt handle, skipping"
                    );
                    return None;
                };

                Some(ReceivedMessage {
                    message_id: msg.message_id().unwrap_or_default().to_string(),
                    receipt_handle: receipt_handle.to_string(),
                    body: msg.body().map(ToString::to_string),
                })
            })
            .collect();

        Ok(messages)
    }

    async fn delete(&self, queue_url: &str, receipt_handle: &str) -> QueueResult<()> {
        self.sqs_client
            .delete_message()
            .queue_url(queue_url)
            .receipt_handle(receipt_handle)
            .send()
            .await?;

        Ok(())
    }

    async fn send(&self, queue_url: &str, body: String) -> QueueResult<String> {
        let result = self
            .sqs_client
            .send_message()
            .queue_url(queue_url)
            .message_body(body)
            .send()
            .await?;

        Ok(result
            .message_id()
            .map(std::string::ToString::to_string)
            .unwrap_or_default())
    }
}
