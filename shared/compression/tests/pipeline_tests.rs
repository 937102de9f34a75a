//! Tests for strategy dispatch and the PDF strategy

use std::sync::Arc;

use compression::{
    mock::{ScriptedImageEncoder, StubPdfCompressor},
    size_metrics::mb_to_bytes,
    types::{JPEG_CONTENT_TYPE, PDF_CONTENT_TYPE},
    Attachment, CompressionError, CompressionPipeline, ImageCompressionSettings, ImageStrategy,
    PdfCompressionSettings, PdfStrategy,
};
use pretty_assertions::assert_eq;

struct Harness {
    encoder: Arc<ScriptedImageEncoder>,
    pdf: Arc<StubPdfCompressor>,
    pipeline: CompressionPipeline,
}

fn harness(pdf: StubPdfCompressor) -> Harness {
    let encoder = Arc::new(ScriptedImageEncoder::new(|_| 1_000));
    let pdf = Arc::new(pdf);
    let pipeline = CompressionPipeline::new(
        ImageStrategy::new(encoder.clone(), ImageCompressionSettings::default()),
        PdfStrategy::new(pdf.clone(), PdfCompressionSettings::default()),
    );

    Harness {
        encoder,
        pdf,
        pipeline,
    }
}

fn pdf_of(size: usize) -> Attachment {
    Attachment::new(vec![b'p'; size], PDF_CONTENT_TYPE)
}

#[tokio::test]
async fn test_pdf_outside_band_is_returned_unchanged() {
    let h = harness(StubPdfCompressor::producing(10));

    for size in [
        0,
        mb_to_bytes(1.0),
        mb_to_bytes(2.0),
        mb_to_bytes(10.0),
        mb_to_bytes(12.0),
    ] {
        let result = h.pipeline.compress(pdf_of(size)).await.unwrap();
        assert_eq!(result.bytes, vec![b'p'; size]);
        assert_eq!(result.content_type, PDF_CONTENT_TYPE);
    }

    assert_eq!(h.pdf.calls(), 0);
}

#[tokio::test]
async fn test_pdf_inside_band_is_compressed_once() {
    let h = harness(StubPdfCompressor::producing(mb_to_bytes(1.5)));

    let result = h.pipeline.compress(pdf_of(mb_to_bytes(5.0))).await.unwrap();

    assert_eq!(h.pdf.calls(), 1);
    assert_eq!(result.bytes.len(), mb_to_bytes(1.5));
    assert_eq!(result.content_type, PDF_CONTENT_TYPE);
    assert!((result.reduction_percent - 70.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_pdf_result_accepted_even_above_target() {
    let h = harness(StubPdfCompressor::producing(mb_to_bytes(3.0)));

    let result = h.pipeline.compress(pdf_of(mb_to_bytes(5.0))).await.unwrap();

    assert_eq!(h.pdf.calls(), 1);
    assert_eq!(result.bytes.len(), mb_to_bytes(3.0));
}

#[tokio::test]
async fn test_pdf_tool_failure_is_an_error() {
    let h = harness(StubPdfCompressor::failing());

    let result = h.pipeline.compress(pdf_of(mb_to_bytes(4.0))).await;

    assert!(matches!(result, Err(CompressionError::ExternalTool(_))));
}

#[tokio::test]
async fn test_image_goes_to_image_strategy() {
    let h = harness(StubPdfCompressor::producing(10));

    let result = h
        .pipeline
        .compress(Attachment::new(vec![1; mb_to_bytes(3.0)], "image/png"))
        .await
        .unwrap();

    assert_eq!(h.encoder.calls(), 1);
    assert_eq!(h.pdf.calls(), 0);
    assert_eq!(result.content_type, JPEG_CONTENT_TYPE);
    assert_eq!(result.bytes.len(), 1_000);
}

#[tokio::test]
async fn test_unknown_type_passes_through() {
    let h = harness(StubPdfCompressor::producing(10));
    let attachment = Attachment::new(vec![3; 4096], "application/zip");

    let result = h.pipeline.compress(attachment.clone()).await.unwrap();

    assert_eq!(h.encoder.calls(), 0);
    assert_eq!(h.pdf.calls(), 0);
    assert_eq!(result.into_attachment(), attachment);
}
