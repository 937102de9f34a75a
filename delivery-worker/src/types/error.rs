//! Delivery outcome and error taxonomy

use std::fmt;

/// Machine-readable reason a submission was not delivered
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryErrorCode {
    /// Payload is not a JSON object or the attachment reference is malformed
    InvalidPayload,
    /// Attachment exceeds the hard cap before compression
    FileTooLarge,
    /// Attachment still exceeds the delivery cap after compression
    FileCannotBeDelivered,
    /// Attachment could not be read from storage
    FileFetchFailed,
    /// External compressor failed
    FileCompressionFailed,
    /// Uploading the named artifact to the document store failed
    FileUploadFailed(Artifact),
    /// Notification channel rejected the email or failed
    NotificationFailed,
    /// Notification channel timed out
    NotificationTimeout,
}

/// Artifacts written to the document store for each submission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Artifact {
    /// The submitted application document
    Application,
    /// The (possibly compressed) attachment
    Attachment,
}

impl Artifact {
    /// Upper-case tag used in error codes
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Application => "APPLICATION",
            Self::Attachment => "ATTACHMENT",
        }
    }
}

impl DeliveryErrorCode {
    /// HTTP-like status for this code
    #[must_use]
    pub const fn status(&self) -> u16 {
        match self {
            Self::InvalidPayload => 400,
            Self::FileTooLarge | Self::FileCannotBeDelivered => 413,
            Self::NotificationTimeout => 504,
            Self::FileFetchFailed
            | Self::FileCompressionFailed
            | Self::FileUploadFailed(_)
            | Self::NotificationFailed => 500,
        }
    }
}

impl fmt::Display for DeliveryErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidPayload => f.write_str("INVALID_PAYLOAD"),
            Self::FileTooLarge => f.write_str("FILE_TOO_LARGE"),
            Self::FileCannotBeDelivered => f.write_str("FILE_CANNOT_BE_DELIVERED"),
            Self::FileFetchFailed => f.write_str("FILE_FETCH_FAILED"),
            Self::FileCompressionFailed => f.write_str("FILE_COMPRESSION_FAILED"),
            Self::FileUploadFailed(artifact) => write!(f, "FILE_UPLOAD_FAILED__{}", artifact.tag()),
            Self::NotificationFailed => f.write_str("NOTIFICATION_FAILED"),
            Self::NotificationTimeout => f.write_str("NOTIFICATION_TIMEOUT"),
        }
    }
}

/// Result of delivering one submission
///
/// Returned as a value rather than an error so callers can tell a
/// permanently invalid submission from a transient failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// Every required delivery step completed
    Ok,
    /// Delivery stopped at the step named by `code`
    Failed {
        /// Error code
        code: DeliveryErrorCode,
        /// HTTP-like status
        status: u16,
    },
}

impl DeliveryOutcome {
    /// Failed outcome with the status belonging to `code`
    #[must_use]
    pub const fn failed(code: DeliveryErrorCode) -> Self {
        let status = code.status();
        Self::Failed { code, status }
    }

    /// Whether the failure is a validation failure that redelivery cannot fix
    #[must_use]
    pub const fn is_permanent(&self) -> bool {
        matches!(self, Self::Failed { status, .. } if *status >= 400 && *status < 500)
    }
}
