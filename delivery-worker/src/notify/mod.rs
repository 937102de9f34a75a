//! Notification channel used to hand submissions to caseworkers by email

mod client;
mod error;

use serde::Serialize;

pub use client::{NotifyClient, NotifyConfig};
pub use error::{NotifyError, NotifyResult};

/// A file attached to an email as a time-limited download link
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkToFile {
    /// Base64-encoded file contents
    pub file: String,
    /// File name shown to the recipient
    pub filename: String,
    /// Whether the recipient must confirm their email before downloading
    pub confirm_email_before_download: bool,
    /// How long the link stays valid, e.g. `26 weeks`
    pub retention_period: String,
}

/// Email sent to the case-handling mailbox
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmailNotification {
    /// Recipient address
    pub email_address: String,
    /// Template to render
    pub template_id: String,
    /// Template placeholders
    pub personalisation: serde_json::Map<String, serde_json::Value>,
    /// Submission reference, recorded by the service against the email
    pub reference: String,
}

/// Trait for the notification channel
#[async_trait::async_trait]
pub trait NotificationChannel: Send + Sync {
    /// Sends an email
    ///
    /// Timeouts are reported as [`NotifyError::Timeout`] so callers can tell
    /// them apart from rejected payloads.
    async fn send_email(&self, notification: EmailNotification) -> NotifyResult<()>;
}

#[cfg(any(test, feature = "test-utils"))]
pub mod mock {
    use std::sync::Mutex;

    use super::{EmailNotification, NotificationChannel, NotifyError, NotifyResult};

    /// Failure the mock channel should return
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum MockFailure {
        /// Behave as if the request timed out
        Timeout,
        /// Reject the payload with a 400
        Rejected,
    }

    /// Notification channel recording every email it is asked to send
    #[derive(Default)]
    pub struct MockNotificationChannel {
        sent: Mutex<Vec<EmailNotification>>,
        failure: Option<MockFailure>,
    }

    impl MockNotificationChannel {
        /// Channel that accepts every email
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Channel that fails every email
        #[must_use]
        pub fn failing(failure: MockFailure) -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                failure: Some(failure),
            }
        }

        /// Emails accepted so far
        ///
        /// # Panics
        ///
        /// Panics if the internal lock is poisoned
        #[must_use]
        pub fn sent(&self) -> Vec<EmailNotification> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl NotificationChannel for MockNotificationChannel {
        async fn send_email(&self, notification: EmailNotification) -> NotifyResult<()> {
            match self.failure {
                Some(MockFailure::Timeout) => Err(NotifyError::Timeout),
                Some(MockFailure::Rejected) => Err(NotifyError::Rejected {
                    status: 400,
                    message: "BadRequestError".to_string(),
                }),
                None => {
                    self.sent.lock().unwrap().push(notification);
                    Ok(())
                }
            }
        }
    }
}
