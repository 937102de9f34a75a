//! Target-size compression for raster images
//!
//! Images are scaled down once to fit a long/short edge bound and re-encoded
//! as progressive JPEG. When the result is still above the target size the JPEG quality is
//! binary searched until the output lands in `[lower_threshold, target]`.

use std::{sync::Arc, time::Instant};

use async_trait::async_trait;
use image::{imageops::FilterType, DynamicImage, RgbImage};
use jpeg_encoder::{ColorType, Encoder};
use tokio::task;
use tracing::{debug, info};

use crate::{
    error::{CompressResult, CompressionError},
    size_metrics::{bytes_to_mb, mb_to_bytes},
    types::{Attachment, CompressionResult, JPEG_CONTENT_TYPE},
};

/// Quality used for the first resize-and-encode pass
pub const DEFAULT_QUALITY: u8 = 80;
const MIN_QUALITY: u8 = 1;
const MAX_QUALITY: u8 = 100;

/// Long/short edge bound an image is scaled down to fit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResizeBounds {
    /// Maximum length of the longer edge
    pub long_edge: u32,
    /// Maximum length of the shorter edge
    pub short_edge: u32,
}

impl Default for ResizeBounds {
    fn default() -> Self {
        Self {
            long_edge: 1920,
            short_edge: 1080,
        }
    }
}

impl ResizeBounds {
    /// Returns the `(max_width, max_height)` box for an image of the given
    /// dimensions, placing the long edge along the image's own long side
    #[must_use]
    pub const fn box_for(&self, width: u32, height: u32) -> (u32, u32) {
        if width >= height {
            (self.long_edge, self.short_edge)
        } else {
            (self.short_edge, self.long_edge)
        }
    }

    /// Whether an image of the given dimensions already fits
    #[must_use]
    pub const fn fits(&self, width: u32, height: u32) -> bool {
        let (max_width, max_height) = self.box_for(width, height);
        width <= max_width && height <= max_height
    }
}

/// Resize and re-encode primitives used by the image strategy
///
/// The strategy resizes once and then re-encodes the same pixels at as many
/// qualities as the search needs.
#[async_trait]
pub trait ImageEncoder: Send + Sync {
    /// Decodes `source` and scales it down to fit `bounds` (no-op if it
    /// already fits)
    async fn resize(
        &self,
        source: Arc<[u8]>,
        bounds: ResizeBounds,
    ) -> CompressResult<Arc<RgbImage>>;

    /// Encodes already resized pixels as JPEG at `quality` (1..=100)
    async fn encode(&self, image: Arc<RgbImage>, quality: u8) -> CompressResult<Vec<u8>>;
}

/// Progressive JPEG encoder
///
/// Decoding and scaling use the `image` crate, encoding uses `jpeg-encoder`.
/// Both run on the blocking pool.
#[derive(Debug, Clone, Copy, Default)]
pub struct RasterEncoder;

#[async_trait]
impl ImageEncoder for RasterEncoder {
    async fn resize(
        &self,
        source: Arc<[u8]>,
        bounds: ResizeBounds,
    ) -> CompressResult<Arc<RgbImage>> {
        task::spawn_blocking(move || {
            let img = image::load_from_memory(&source)
                .map_err(|e| CompressionError::Decode(e.to_string()))?;
            Ok(Arc::new(fit_within(img, bounds).into_rgb8()))
        })
        .await?
    }

    async fn encode(&self, image: Arc<RgbImage>, quality: u8) -> CompressResult<Vec<u8>> {
        task::spawn_blocking(move || encode_progressive_jpeg(&image, quality)).await?
    }
}

fn fit_within(img: DynamicImage, bounds: ResizeBounds) -> DynamicImage {
    let (width, height) = (img.width(), img.height());
    if bounds.fits(width, height) {
        return img;
    }

    let (max_width, max_height) = bounds.box_for(width, height);
    img.resize(max_width, max_height, FilterType::Lanczos3)
}

fn encode_progressive_jpeg(image: &RgbImage, quality: u8) -> CompressResult<Vec<u8>> {
    let too_large = |_| {
        CompressionError::Encode(format!(
            "{}x{} exceeds the JPEG dimension limit",
            image.width(),
            image.height()
        ))
    };
    let width = u16::try_from(image.width()).map_err(too_large)?;
    let height = u16::try_from(image.height()).map_err(too_large)?;

    let mut output = Vec::new();
    let mut encoder = Encoder::new(&mut output, quality.clamp(MIN_QUALITY, MAX_QUALITY));
    encoder.set_progressive(true);
    encoder
        .encode(image.as_raw(), width, height, ColorType::Rgb)
        .map_err(|e| CompressionError::Encode(e.to_string()))?;
    Ok(output)
}

/// Tuning for the image strategy
#[derive(Debug, Clone, Copy)]
pub struct ImageCompressionSettings {
    /// Upper bound of the acceptance band, in bytes
    pub target_size_bytes: usize,
    /// Lower bound of the band as a fraction of the target
    pub lower_threshold_ratio: f64,
    /// Resize bound applied before encoding
    pub bounds: ResizeBounds,
}

impl Default for ImageCompressionSettings {
    fn default() -> Self {
        Self {
            target_size_bytes: mb_to_bytes(2.0),
            lower_threshold_ratio: 0.95,
            bounds: ResizeBounds::default(),
        }
    }
}

impl ImageCompressionSettings {
    /// Lower bound of the acceptance band, in bytes
    #[must_use]
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn lower_threshold_bytes(&self) -> usize {
        (self.target_size_bytes as f64 * self.lower_threshold_ratio).floor() as usize
    }
}

/// Outcome of the quality search
#[derive(Debug, Clone)]
pub struct QualitySearch {
    /// Chosen buffer
    pub bytes: Vec<u8>,
    /// Quality the chosen buffer was encoded at
    pub quality: u8,
    /// Number of encodes performed by the search
    pub iterations: u32,
    /// Whether the chosen buffer is inside the acceptance band
    pub within_band: bool,
}

/// Raster image strategy
pub struct ImageStrategy {
    encoder: Arc<dyn ImageEncoder>,
    settings: ImageCompressionSettings,
}

impl ImageStrategy {
    /// Creates a new image strategy
    #[must_use]
    pub fn new(encoder: Arc<dyn ImageEncoder>, settings: ImageCompressionSettings) -> Self {
        Self { encoder, settings }
    }

    /// Compresses an image towards the target size
    ///
    /// If re-encoding makes the image larger than it was, the original is
    /// returned untouched so sizes never grow across stages.
    ///
    /// # Errors
    ///
    /// Returns `CompressionError` if the image cannot be decoded or encoded
    pub async fn compress(&self, attachment: Attachment) -> CompressResult<CompressionResult> {
        let started = Instant::now();
        let original_size = attachment.bytes.len();
        let source: Arc<[u8]> = Arc::from(attachment.bytes.as_slice());

        let resized = self.encoder.resize(source, self.settings.bounds).await?;
        let first_pass = self.encoder.encode(resized.clone(), DEFAULT_QUALITY).await?;

        let compressed = if first_pass.len() > self.settings.target_size_bytes {
            let search = self.search_quality(resized).await?;
            debug!(
                quality = search.quality,
                iterations = search.iterations,
                within_band = search.within_band,
                "Image quality search finished"
            );
            search.bytes
        } else {
            first_pass
        };

        let result = if compressed.len() > original_size {
            debug!("Re-encoded image is larger than the original, keeping the original");
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
                JPEG_CONTENT_TYPE,
                started.elapsed(),
            )
        };

        info!(
            original_mb = bytes_to_mb(original_size),
            final_mb = result.size_in_mb(),
            reduction_percent = result.reduction_percent,
            duration_ms = result.duration_ms,
            "Image compressed"
        );

        Ok(result)
    }

    /// Binary searches the encoder quality for a buffer inside
    /// `[lower_threshold, target]`, re-encoding the already resized `image`
    ///
    /// Candidates under the band raise the lower bound and are kept as the
    /// best so far; candidates over the target lower the upper bound. If the
    /// range is exhausted without hitting the band, the best under-target
    /// candidate is returned, or failing that the smallest buffer produced.
    ///
    /// # Errors
    ///
    /// Returns `CompressionError` if any encode fails
    pub async fn search_quality(&self, image: Arc<RgbImage>) -> CompressResult<QualitySearch> {
        let target = self.settings.target_size_bytes;
        let lower = self.settings.lower_threshold_bytes();

        let mut low = MIN_QUALITY;
        let mut high = MAX_QUALITY;
        let mut iterations = 0;
        let mut best_under: Option<(u8, Vec<u8>)> = None;
        let mut smallest: Option<(u8, Vec<u8>)> = None;

        while low <= high {
            let mid = low + (high - low) / 2;
            let candidate = self.encoder.encode(image.clone(), mid).await?;
            iterations += 1;

            let size = candidate.len();
            if (lower..=target).contains(&size) {
                return Ok(QualitySearch {
                    bytes: candidate,
                    quality: mid,
                    iterations,
                    within_band: true,
                });
            }

            if size < lower {
                best_under = Some((mid, candidate));
                low = mid + 1;
            } else {
                if smallest.as_ref().is_none_or(|(_, s)| size < s.len()) {
                    smallest = Some((mid, candidate));
                }
                // `mid` is at least 1, so this cannot underflow
                high = mid - 1;
            }
        }

        let (quality, bytes) = best_under.or(smallest).ok_or_else(|| {
            CompressionError::Encode("quality search produced no candidate".into())
        })?;

        Ok(QualitySearch {
            bytes,
            quality,
            iterations,
            within_band: false,
        })
    }
}
