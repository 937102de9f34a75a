use thiserror::Error;

/// Result type alias for compression operations
pub type CompressResult<T> = Result<T, CompressionError>;

/// Error types for compression operations
#[derive(Error, Debug)]
pub enum CompressionError {
    /// The input could not be decoded as an image
    #[error("Failed to decode image: {0}")]
    Decode(String),

    /// Re-encoding the image failed
    #[error("Failed to encode image: {0}")]
    Encode(String),

    /// The external compressor could not be run or exited unsuccessfully
    #[error("External compressor failed: {0}")]
    ExternalTool(String),

    /// Scratch file handling failed
    #[error("I/O error during compression: {0}")]
    Io(#[from] std::io::Error),

    /// A blocking compression task panicked or was cancelled
    #[error("Compression task failed: {0}")]
    Task(String),
}

impl From<tokio::task::JoinError> for CompressionError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Task(err.to_string())
    }
}
