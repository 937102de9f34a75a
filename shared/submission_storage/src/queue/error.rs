use aws_sdk_sqs::{
    error::SdkError,
    operation::{
        delete_message::DeleteMessageError, receive_message::ReceiveMessageError,
        send_message::SendMessageError,
    },
};
use thiserror::Error;

/// Result type alias for queue operations
pub type QueueResult<T> = Result<T, QueueError>;

/// Errors from the submission queue
#[derive(Error, Debug)]
pub enum QueueError {
    /// A receive call failed
    #[error("Failed to receive submissions: {0}")]
    Receive(#[from] SdkError<ReceiveMessageError>),

    /// A send call failed
    #[error("Failed to enqueue submission: {0}")]
    Send(#[from] SdkError<SendMessageError>),

    /// A delete call failed; the message will be redelivered
    #[error("Failed to acknowledge submission: {0}")]
    Delete(#[from] SdkError<DeleteMessageError>),

    /// The submission could not be encoded as a message body
    #[error("Failed to serialize submission: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A message body could not be decoded
    #[error("Failed to deserialize message body: {0}")]
    Deserialization(String),

    /// The receipt handle does not belong to a message in flight
    #[error("Unknown receipt handle: {0}")]
    UnknownReceipt(String),

    /// The queue service is unavailable
    #[error("Queue service unavailable")]
    Unavailable,
}

impl QueueError {
    /// Whether the queue service answered with a 5xx or was unavailable
    #[must_use]
    pub fn is_upstream_error(&self) -> bool {
        match self {
            Self::Receive(e) => server_side(e),
            Self::Send(e) => server_side(e),
            Self::Delete(e) => server_side(e),
            Self::Unavailable => true,
            Self::Serialization(_) | Self::Deserialization(_) | Self::UnknownReceipt(_) => false,
        }
    }
}

fn server_side<E>(err: &SdkError<E>) -> bool {
    matches!(err, SdkError::ServiceError(service) if service.raw().status().is_server_error())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_errors_are_not_upstream() {
        assert!(!QueueError::Deserialization("expected value".to_string()).is_upstream_error());
        assert!(!QueueError::UnknownReceipt("receipt-1".to_string()).is_upstream_error());
    }

    #[test]
    fn test_unavailable_is_upstream() {
        assert!(QueueError::Unavailable.is_upstream_error());
    }
}
