use aws_sdk_s3::{
    error::SdkError,
    operation::{get_object::GetObjectError, put_object::PutObjectError},
    primitives::ByteStreamError,
};
use thiserror::Error;

/// Result type for bucket operations
pub type BucketResult<T> = Result<T, BucketError>;

/// Errors that can occur during bucket operations
#[derive(Error, Debug)]
pub enum BucketError {
    /// S3 service error
    #[error("S3 service error: {0}")]
    S3Error(String),

    /// Object does not exist
    #[error("Object not found: {0}")]
    NotFound(String),

    /// Object body could not be read
    #[error("Failed to read object body: {0}")]
    BodyError(String),

    /// Upstream service error (5xx from S3)
    #[error("Upstream service error: {0}")]
    UpstreamError(String),

    /// Invalid input provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl BucketError {
    /// Whether retrying the same call later may succeed
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::UpstreamError(_) | Self::BodyError(_))
    }
}

impl From<SdkError<GetObjectError>> for BucketError {
    fn from(error: SdkError<GetObjectError>) -> Self {
        match error {
            SdkError::ServiceError(err) => match err.err() {
                GetObjectError::NoSuchKey(_) => Self::NotFound(format!("{:?}", err.err())),
                _ if err.raw().status().as_u16() >= 500 => {
                    Self::UpstreamError(format!("{:?}", err.err()))
                }
                _ => Self::S3Error(format!("{:?}", err.err())),
            },
            _ => Self::UpstreamError(error.to_string()),
        }
    }
}

impl From<SdkError<PutObjectError>> for BucketError {
    fn from(error: SdkError<PutObjectError>) -> Self {
        match error {
            SdkError::ServiceError(err) if err.raw().status().as_u16() >= 500 => {
                Self::UpstreamError(format!("{:?}", err.err()))
            }
            SdkError::ServiceError(err) => Self::S3Error(format!("{:?}", err.err())),
            _ => Self::UpstreamError(error.to_string()),
        }
    }
}

impl From<ByteStreamError> for BucketError {
    fn from(error: ByteStreamError) -> Self {
        Self::BodyError(error.to_string())
    }
}
