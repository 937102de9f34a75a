//! Queue operations for submission delivery
//!
//! This module provides the transport abstraction over AWS SQS standard
//! queues and the submission queue built on top of it.

/// Error types for queue operations
pub mod error;
/// Submission producer and consumer-side queue handle
pub mod submission_queue;
/// SQS transport
pub mod transport;
/// Common types for queue operations
pub mod types;

/// In-memory transport for tests
#[cfg(any(test, feature = "test-utils"))]
pub mod mock;

pub use error::{QueueError, QueueResult};
pub use submission_queue::SubmissionQueue;
pub use transport::{QueueTransport, SqsTransport};
pub use types::{QueueConfig, QueueMessage, QueuedSubmission, ReceiveRequest, ReceivedMessage};
