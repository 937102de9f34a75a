//! Scripted encoders for tests

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};

use async_trait::async_trait;
use image::RgbImage;

use crate::{
    error::{CompressResult, CompressionError},
    pdf::{PdfCompressionOptions, PdfCompressor},
    raster::{ImageEncoder, ResizeBounds},
};

type SizeFn = dyn Fn(u8) -> usize + Send + Sync;

/// Image encoder whose output size is a function of the quality
///
/// Resizing yields a 1x1 image and is only counted.
pub struct ScriptedImageEncoder {
    size_for_quality: Box<SizeFn>,
    qualities: Mutex<Vec<u8>>,
    resizes: AtomicUsize,
}

impl ScriptedImageEncoder {
    /// Creates an encoder producing `size_for_quality(quality)` bytes per call
    pub fn new(size_for_quality: impl Fn(u8) -> usize + Send + Sync + 'static) -> Self {
        Self {
            size_for_quality: Box::new(size_for_quality),
            qualities: Mutex::new(Vec::new()),
            resizes: AtomicUsize::new(0),
        }
    }

    /// Qualities requested so far, in call order
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned
    pub fn qualities(&self) -> Vec<u8> {
        self.qualities.lock().unwrap().clone()
    }

    /// Number of encode calls so far
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned
    pub fn calls(&self) -> usize {
        self.qualities.lock().unwrap().len()
    }

    /// Number of resize calls so far
    pub fn resizes(&self) -> usize {
        self.resizes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ImageEncoder for ScriptedImageEncoder {
    async fn resize(
        &self,
        _source: Arc<[u8]>,
        _bounds: ResizeBounds,
    ) -> CompressResult<Arc<RgbImage>> {
        self.resizes.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(RgbImage::new(1, 1)))
    }

    async fn encode(&self, _image: Arc<RgbImage>, quality: u8) -> CompressResult<Vec<u8>> {
        self.qualities.lock().unwrap().push(quality);
        Ok(vec![0xFF; (self.size_for_quality)(quality)])
    }
}

/// PDF compressor returning a fixed-size output or failing
pub struct StubPdfCompressor {
    output_size: Option<usize>,
    calls: AtomicUsize,
}

impl StubPdfCompressor {
    /// Compressor that always produces `output_size` bytes
    #[must_use]
    pub const fn producing(output_size: usize) -> Self {
        Self {
            output_size: Some(output_size),
            calls: AtomicUsize::new(0),
        }
    }

    /// Compressor that always fails as if the tool crashed
    #[must_use]
    pub const fn failing() -> Self {
        Self {
            output_size: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of compress calls so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PdfCompressor for StubPdfCompressor {
    async fn compress(
        &self,
        _bytes: Vec<u8>,
        _options: &PdfCompressionOptions,
    ) -> CompressResult<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.output_size.map_or_else(
            || Err(CompressionError::ExternalTool("gs exited with 1".to_string())),
            |size| Ok(vec![b'%'; size]),
        )
    }
}
