use thiserror::Error;

/// Result type for notification calls
pub type NotifyResult<T> = Result<T, NotifyError>;

/// Errors returned by the notification channel
#[derive(Error, Debug)]
pub enum NotifyError {
    /// The service did not answer in time
    #[error("Notification request timed out")]
    Timeout,

    /// The service rejected the payload (4xx)
    #[error("Notification rejected with status {status}: {message}")]
    Rejected {
        /// HTTP status returned by the service
        status: u16,
        /// Response body
        message: String,
    },

    /// Transport failure or 5xx from the service
    #[error("Notification service error: {0}")]
    Upstream(String),

    /// Request could not be serialized
    #[error("Failed to serialize notification: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<reqwest_middleware::Error> for NotifyError {
    fn from(err: reqwest_middleware::Error) -> Self {
        match err {
            reqwest_middleware::Error::Reqwest(e) if e.is_timeout() => Self::Timeout,
            other => Self::Upstream(other.to_string()),
        }
    }
}
