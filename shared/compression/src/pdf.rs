//! Conditional PDF compression through an external tool
//!
//! Only PDFs strictly between the lower and upper size bounds are compressed.
//! Smaller files do not need it and larger ones are rejected further up before
//! the external tool would spend time on them.

use std::{
    path::{Path, PathBuf},
    process::Stdio,
    sync::Arc,
    time::Instant,
};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::{
    error::{CompressResult, CompressionError},
    size_metrics::{bytes_to_mb, mb_to_bytes},
    types::{Attachment, CompressionResult},
};

/// Options handed to the external PDF compressor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfCompressionOptions {
    /// Path to the compressor executable
    pub external_tool_path: PathBuf,
    /// PDF compatibility level to target, e.g. `1.4`
    pub compatibility_level: String,
}

impl Default for PdfCompressionOptions {
    fn default() -> Self {
        Self {
            external_tool_path: PathBuf::from("gs"),
            compatibility_level: "1.4".to_string(),
        }
    }
}

/// External PDF compressor
#[async_trait]
pub trait PdfCompressor: Send + Sync {
    /// Compresses `bytes` in a single pass
    async fn compress(
        &self,
        bytes: Vec<u8>,
        options: &PdfCompressionOptions,
    ) -> CompressResult<Vec<u8>>;
}

/// Ghostscript `pdfwrite` compressor
#[derive(Debug, Clone, Copy, Default)]
pub struct GhostscriptCompressor;

#[async_trait]
impl PdfCompressor for GhostscriptCompressor {
    async fn compress(
        &self,
        bytes: Vec<u8>,
        options: &PdfCompressionOptions,
    ) -> CompressResult<Vec<u8>> {
        let scratch = tempfile::tempdir()?;
        let input_path = scratch.path().join("input.pdf");
        let output_path = scratch.path().join("output.pdf");
        tokio::fs::write(&input_path, &bytes).await?;

        let output = Command::new(&options.external_tool_path)
            .args(ghostscript_args(
                &options.compatibility_level,
                &input_path,
                &output_path,
            ))
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| {
                CompressionError::ExternalTool(format!(
                    "failed to run {}: {e}",
                    options.external_tool_path.display()
                ))
            })?;

        if !output.status.success() {
            return Err(CompressionError::ExternalTool(format!(
                "{} exited with {}: {}",
                options.external_tool_path.display(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(tokio::fs::read(&output_path).await?)
    }
}

fn ghostscript_args(compatibility_level: &str, input: &Path, output: &Path) -> Vec<String> {
    vec![
        "-sDEVICE=pdfwrite".to_string(),
        format!("-dCompatibilityLevel={compatibility_level}"),
        "-dPDFSETTINGS=/ebook".to_string(),
        "-dNOPAUSE".to_string(),
        "-dQUIET".to_string(),
        "-dBATCH".to_string(),
        format!("-sOutputFile={}", output.display()),
        input.display().to_string(),
    ]
}

/// Size band in which PDFs are compressed
#[derive(Debug, Clone)]
pub struct PdfCompressionSettings {
    /// Exclusive lower bound, in bytes
    pub min_size_bytes: usize,
    /// Exclusive upper bound, in bytes
    pub max_size_bytes: usize,
    /// Options passed to the compressor
    pub options: PdfCompressionOptions,
}

impl Default for PdfCompressionSettings {
    fn default() -> Self {
        Self {
            min_size_bytes: mb_to_bytes(2.0),
            max_size_bytes: mb_to_bytes(10.0),
            options: PdfCompressionOptions::default(),
        }
    }
}

impl PdfCompressionSettings {
    /// Whether a PDF of `size` bytes is in the compression band
    #[must_use]
    pub const fn should_compress(&self, size: usize) -> bool {
        size > self.min_size_bytes && size < self.max_size_bytes
    }
}

/// PDF strategy
pub struct PdfStrategy {
    compressor: Arc<dyn PdfCompressor>,
    settings: PdfCompressionSettings,
}

impl PdfStrategy {
    /// Creates a new PDF strategy
    #[must_use]
    pub fn new(compressor: Arc<dyn PdfCompressor>, settings: PdfCompressionSettings) -> Self {
        Self {
            compressor,
            settings,
        }
    }

    /// Compresses the PDF if its size is inside the compression band,
    /// otherwise returns it unchanged
    ///
    /// # Errors
    ///
    /// Returns `CompressionError` if the external compressor fails
    pub async fn compress(&self, attachment: Attachment) -> CompressResult<CompressionResult> {
        let original_size = attachment.bytes.len();
        if !self.settings.should_compress(original_size) {
            debug!(
                size_mb = bytes_to_mb(original_size),
                "PDF outside compression band, skipping"
            );
            return Ok(CompressionResult::unchanged(attachment));
        }

        let started = Instant::now();
        let compressed = self
            .compressor
            .compress(attachment.bytes.clone(), &self.settings.options)
            .await?;

        let result = if compressed.len() > original_size {
            warn!(
                original_size,
                compressed_size = compressed.len(),
                "Compressed PDF is larger than the original, keeping the original"
            );
            CompressionResult::new(
                original_size,
                attachment.bytes,
                attachment.content_type,
                started.elapsed(),
            )
        } else {
            CompressionResult::new(
                original_size,
                compressed,
                attachment.content_type,
                started.elapsed(),
            )
        };

        info!(
            original_mb = bytes_to_mb(original_size),
            final_mb = result.size_in_mb(),
            reduction_percent = result.reduction_percent,
            duration_ms = result.duration_ms,
            "PDF compressed"
        );

        Ok(result)
    }
}
