use std::time::Duration;

use crate::size_metrics::{bytes_to_mb, file_size_reduction_percent};

/// Content type produced by the raster image strategy
pub const JPEG_CONTENT_TYPE: &str = "image/jpeg";
/// Content type handled by the PDF strategy
pub const PDF_CONTENT_TYPE: &str = "application/pdf";

/// Raw attachment bytes with their content type
///
/// The size is always derived from `bytes`, never taken from upstream metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    /// File contents
    pub bytes: Vec<u8>,
    /// MIME type reported by the store
    pub content_type: String,
}

impl Attachment {
    /// Creates an attachment from fetched bytes
    #[must_use]
    pub fn new(bytes: Vec<u8>, content_type: impl Into<String>) -> Self {
        Self {
            bytes,
            content_type: content_type.into(),
        }
    }

    /// Size in bytes
    #[must_use]
    pub fn size_in_bytes(&self) -> usize {
        self.bytes.len()
    }

    /// Size in megabytes, recomputed from the bytes
    #[must_use]
    pub fn size_in_mb(&self) -> f64 {
        bytes_to_mb(self.bytes.len())
    }
}

/// Output of a compression strategy
#[derive(Debug, Clone)]
pub struct CompressionResult {
    /// Compressed (or untouched) bytes
    pub bytes: Vec<u8>,
    /// Wall-clock time spent compressing, in milliseconds
    pub duration_ms: u128,
    /// `100 - final * 100 / original`; `NaN` for an empty original
    pub reduction_percent: f64,
    /// Content type of `bytes`
    pub content_type: String,
}

impl CompressionResult {
    /// Builds a result, deriving the reduction from the two sizes
    #[must_use]
    pub fn new(
        original_size: usize,
        bytes: Vec<u8>,
        content_type: impl Into<String>,
        elapsed: Duration,
    ) -> Self {
        let reduction_percent = file_size_reduction_percent(original_size, bytes.len());
        Self {
            bytes,
            duration_ms: elapsed.as_millis(),
            reduction_percent,
            content_type: content_type.into(),
        }
    }

    /// Result for an input that was deliberately left alone
    #[must_use]
    pub fn unchanged(attachment: Attachment) -> Self {
        Self::new(
            attachment.bytes.len(),
            attachment.bytes,
            attachment.content_type,
            Duration::ZERO,
        )
    }

    /// Size of the output in megabytes
    #[must_use]
    pub fn size_in_mb(&self) -> f64 {
        bytes_to_mb(self.bytes.len())
    }

    /// Converts the result back into an attachment for delivery
    #[must_use]
    pub fn into_attachment(self) -> Attachment {
        Attachment::new(self.bytes, self.content_type)
    }
}
