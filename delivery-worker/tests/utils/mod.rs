#![allow(dead_code)]

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};

use compression::{
    mock::{ScriptedImageEncoder, StubPdfCompressor},
    CompressionPipeline, ImageCompressionSettings, ImageStrategy, PdfCompressionSettings,
    PdfStrategy,
};
use delivery_worker::{
    journey::NotifyTemplates,
    notify::mock::MockNotificationChannel,
    orchestrator::{DeliveryOrchestrator, DeliverySettings},
    poller::{PollerConfig, SubmissionPoller, SubmissionProcessor},
    types::{DeliveryErrorCode, DeliveryOutcome},
};
use serde_json::{json, Value};
use submission_storage::{
    bucket::mock::{InMemoryAttachmentStore, InMemoryDocumentStore},
    queue::{mock::InMemoryTransport, QueueConfig, QueuedSubmission, SubmissionQueue},
};
use tokio_util::sync::CancellationToken;
use tracing::subscriber::DefaultGuard;
use tracing_subscriber::fmt::MakeWriter;

pub const CASEWORK_EMAIL: &str = "casework@example.com";

/// Initialise tracing for tests
pub fn setup_test_env() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init()
        .ok();
}

#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl std::io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogBuffer {
    type Writer = Self;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Collects the log lines emitted on the current thread while alive
///
/// Only meaningful on the current-thread runtime, where spawned tasks run on
/// the test's own thread.
pub struct CapturedLogs {
    buffer: LogBuffer,
    _guard: DefaultGuard,
}

impl CapturedLogs {
    pub fn install() -> Self {
        let buffer = LogBuffer::default();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(buffer.clone())
            .finish();

        Self {
            buffer,
            _guard: tracing::subscriber::set_default(subscriber),
        }
    }

    pub fn lines(&self) -> Vec<String> {
        String::from_utf8_lossy(&self.buffer.0.lock().unwrap())
            .lines()
            .map(str::to_string)
            .collect()
    }

    /// Whether a single line contains every one of `needles`
    pub fn has_line_with(&self, needles: &[&str]) -> bool {
        self.lines()
            .iter()
            .any(|line| needles.iter().all(|needle| line.contains(needle)))
    }
}

pub fn templates() -> NotifyTemplates {
    NotifyTemplates {
        standard: "template-standard".to_string(),
        appeal: "template-appeal".to_string(),
        renewal: "template-renewal".to_string(),
    }
}

pub fn settings() -> DeliverySettings {
    DeliverySettings {
        casework_email: CASEWORK_EMAIL.to_string(),
        templates: templates(),
        ..DeliverySettings::default()
    }
}

pub fn submission(reference: &str, payload: Value) -> QueuedSubmission {
    QueuedSubmission {
        application_payload: payload,
        reference: reference.to_string(),
    }
}

pub fn payload_with_attachment(path: &str, filename: &str) -> Value {
    json!({
        "journeyId": "apply",
        "attachment": {"path": path, "filename": filename},
        "answers": [{"question": "Full name", "answer": "A. Applicant"}]
    })
}

/// Orchestrator wired to in-memory collaborators
pub struct DeliveryContext {
    pub attachments: Arc<InMemoryAttachmentStore>,
    pub documents: Arc<InMemoryDocumentStore>,
    pub notifications: Arc<MockNotificationChannel>,
    pub image_encoder: Arc<ScriptedImageEncoder>,
    pub pdf_compressor: Arc<StubPdfCompressor>,
    pub orchestrator: DeliveryOrchestrator,
}

impl DeliveryContext {
    /// Context whose PDF compressor produces `pdf_output_size` bytes and whose
    /// image encoder produces `image_output_size` bytes at every quality
    pub fn new(pdf_output_size: usize, image_output_size: usize) -> Self {
        Self::build(
            StubPdfCompressor::producing(pdf_output_size),
            image_output_size,
            MockNotificationChannel::new(),
        )
    }

    pub fn with_pdf_compressor(pdf_compressor: StubPdfCompressor) -> Self {
        Self::build(pdf_compressor, 1_000, MockNotificationChannel::new())
    }

    pub fn with_notifications(notifications: MockNotificationChannel) -> Self {
        Self::build(StubPdfCompressor::producing(1_000), 1_000, notifications)
    }

    fn build(
        pdf_compressor: StubPdfCompressor,
        image_output_size: usize,
        notifications: MockNotificationChannel,
    ) -> Self {
        setup_test_env();

        let attachments = Arc::new(InMemoryAttachmentStore::new());
        let documents = Arc::new(InMemoryDocumentStore::new());
        let notifications = Arc::new(notifications);
        let image_encoder = Arc::new(ScriptedImageEncoder::new(move |_| image_output_size));
        let pdf_compressor = Arc::new(pdf_compressor);

        let pipeline = CompressionPipeline::new(
            ImageStrategy::new(image_encoder.clone(), ImageCompressionSettings::default()),
            PdfStrategy::new(pdf_compressor.clone(), PdfCompressionSettings::default()),
        );

        let orchestrator = DeliveryOrchestrator::new(
            attachments.clone(),
            documents.clone(),
            notifications.clone(),
            Arc::new(pipeline),
            settings(),
        );

        Self {
            attachments,
            documents,
            notifications,
            image_encoder,
            pdf_compressor,
            orchestrator,
        }
    }

    pub fn compression_calls(&self) -> usize {
        self.image_encoder.calls() + self.pdf_compressor.calls()
    }
}

/// Processor returning a fixed outcome and recording the references it saw
pub struct RecordingProcessor {
    outcome_for: Box<dyn Fn(&QueuedSubmission) -> DeliveryOutcome + Send + Sync>,
    seen: Mutex<Vec<String>>,
    calls: AtomicUsize,
}

impl RecordingProcessor {
    pub fn succeeding() -> Self {
        Self::with(|_| DeliveryOutcome::Ok)
    }

    pub fn failing(code: DeliveryErrorCode) -> Self {
        Self::with(move |_| DeliveryOutcome::failed(code.clone()))
    }

    pub fn with(
        outcome_for: impl Fn(&QueuedSubmission) -> DeliveryOutcome + Send + Sync + 'static,
    ) -> Self {
        Self {
            outcome_for: Box::new(outcome_for),
            seen: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl SubmissionProcessor for RecordingProcessor {
    async fn process_submission(&self, submission: &QueuedSubmission) -> DeliveryOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(submission.reference.clone());
        (self.outcome_for)(submission)
    }
}

/// Poller wired to an in-memory queue
pub struct PollerContext {
    pub transport: Arc<InMemoryTransport>,
    pub queue: Arc<SubmissionQueue>,
    pub processor: Arc<RecordingProcessor>,
    pub shutdown: CancellationToken,
    pub poller: SubmissionPoller,
}

impl PollerContext {
    pub fn new(processor: RecordingProcessor) -> Self {
        setup_test_env();

        let transport = Arc::new(InMemoryTransport::new());
        let queue = Arc::new(SubmissionQueue::new(
            transport.clone(),
            QueueConfig {
                queue_url: "http://localhost:4566/000000000000/submission-queue".to_string(),
                default_max_messages: 10,
                default_wait_time_seconds: 0, // No wait for tests
            },
        ));
        let processor = Arc::new(processor);
        let shutdown = CancellationToken::new();

        let poller = SubmissionPoller::new(
            queue.clone(),
            processor.clone(),
            PollerConfig::default(),
            shutdown.clone(),
        );

        Self {
            transport,
            queue,
            processor,
            shutdown,
            poller,
        }
    }

    pub async fn enqueue(&self, reference: &str) -> String {
        self.queue
            .enqueue(&submission(reference, json!({"journeyId": "apply"})))
            .await
            .unwrap()
    }
}
