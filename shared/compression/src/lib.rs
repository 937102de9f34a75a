//! Size-bounded attachment compression
//!
//! Dispatches attachments to a raster image strategy or a PDF strategy by
//! content type. Both strategies report a uniform [`CompressionResult`].

#![deny(clippy::all, clippy::pedantic, clippy::nursery, dead_code)]

/// Error types for compression
pub mod error;
/// PDF strategy
pub mod pdf;
/// Raster image strategy
pub mod raster;
/// Byte/megabyte helpers
pub mod size_metrics;
/// Shared data types
pub mod types;

#[cfg(any(test, feature = "test-utils"))]
pub mod mock;

use std::sync::Arc;

pub use error::{CompressResult, CompressionError};
pub use pdf::{
    GhostscriptCompressor, PdfCompressionOptions, PdfCompressionSettings, PdfCompressor,
    PdfStrategy,
};
pub use raster::{
    ImageCompressionSettings, ImageEncoder, ImageStrategy, RasterEncoder, ResizeBounds,
};
pub use types::{Attachment, CompressionResult};

/// Which strategy applies to a content type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionStrategy {
    /// Raster image target-size compression
    Image,
    /// Conditional PDF compression
    Pdf,
    /// No strategy, the bytes are passed through
    Passthrough,
}

impl CompressionStrategy {
    /// Selects the strategy for a MIME type
    #[must_use]
    pub fn for_content_type(content_type: &str) -> Self {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        match essence.as_str() {
            "image/jpeg" | "image/jpg" | "image/png" | "image/webp" | "image/gif"
            | "image/bmp" | "image/tiff" => Self::Image,
            "application/pdf" => Self::Pdf,
            _ => Self::Passthrough,
        }
    }
}

/// Compression pipeline selecting a strategy per attachment
pub struct CompressionPipeline {
    image: ImageStrategy,
    pdf: PdfStrategy,
}

impl CompressionPipeline {
    /// Creates a pipeline from its two strategies
    #[must_use]
    pub const fn new(image: ImageStrategy, pdf: PdfStrategy) -> Self {
        Self { image, pdf }
    }

    /// Pipeline backed by the `image` crate and Ghostscript
    #[must_use]
    pub fn with_defaults(pdf_options: PdfCompressionOptions) -> Self {
        Self::new(
            ImageStrategy::new(Arc::new(RasterEncoder), ImageCompressionSettings::default()),
            PdfStrategy::new(
                Arc::new(GhostscriptCompressor),
                PdfCompressionSettings {
                    options: pdf_options,
                    ..PdfCompressionSettings::default()
                },
            ),
        )
    }

    /// Compresses an attachment with the strategy for its content type
    ///
    /// # Errors
    ///
    /// Returns `CompressionError` if the selected strategy fails
    pub async fn compress(&self, attachment: Attachment) -> CompressResult<CompressionResult> {
        match CompressionStrategy::for_content_type(&attachment.content_type) {
            CompressionStrategy::Image => self.image.compress(attachment).await,
            CompressionStrategy::Pdf => self.pdf.compress(attachment).await,
            CompressionStrategy::Passthrough => {
                tracing::debug!(
                    content_type = %attachment.content_type,
                    "No compression strategy for content type"
                );
                Ok(CompressionResult::unchanged(attachment))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_for_content_type() {
        assert_eq!(
            CompressionStrategy::for_content_type("image/png"),
            CompressionStrategy::Image
        );
        assert_eq!(
            CompressionStrategy::for_content_type("IMAGE/JPEG"),
            CompressionStrategy::Image
        );
        assert_eq!(
            CompressionStrategy::for_content_type("application/pdf; charset=binary"),
            CompressionStrategy::Pdf
        );
        assert_eq!(
            CompressionStrategy::for_content_type("image/svg+xml"),
            CompressionStrategy::Passthrough
        );
        assert_eq!(
            CompressionStrategy::for_content_type(
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            ),
            CompressionStrategy::Passthrough
        );
    }
}
