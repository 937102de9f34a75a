//! Per-submission delivery sequence
//!
//! Fetches the attachment, enforces the size caps, compresses when needed and
//! hands the result to the document store and the casework mailbox. Every
//! failure is reported as a [`DeliveryOutcome`] so the poller can decide
//! whether to acknowledge the message.

mod payload;

use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use compression::{
    size_metrics::mb_to_bytes, types::JPEG_CONTENT_TYPE, Attachment, CompressionPipeline,
};
use serde_json::{json, Map, Value};
use submission_storage::{
    bucket::{AttachmentStore, DocumentStore, UploadRequest},
    queue::QueuedSubmission,
};
use tracing::{info, instrument, warn};

pub use payload::{AttachmentRef, PayloadView};

use crate::{
    journey::{Journey, NotifyTemplates},
    notify::{EmailNotification, LinkToFile, NotificationChannel, NotifyError},
    poller::SubmissionProcessor,
    types::{Artifact, DeliveryErrorCode, DeliveryOutcome},
};

/// File name the submitted payload is stored under
pub const APPLICATION_FILENAME: &str = "application.json";

const APPLICATION_CONTENT_TYPE: &str = "application/json";

/// Delivery settings
#[derive(Debug, Clone, PartialEq)]
pub struct DeliverySettings {
    /// Case-handling mailbox the notification is sent to
    pub casework_email: String,
    /// Template ids per journey
    pub templates: NotifyTemplates,
    /// How long delivered files stay available, e.g. `26 weeks`
    pub retention_period: String,
    /// Attachments above this size are rejected without compression
    pub hard_cap_bytes: usize,
    /// Largest attachment that can be delivered; larger ones are compressed first
    pub delivery_cap_bytes: usize,
}

impl Default for DeliverySettings {
    fn default() -> Self {
        Self {
            casework_email: String::new(),
            templates: NotifyTemplates::default(),
            retention_period: "26 weeks".to_string(),
            hard_cap_bytes: mb_to_bytes(10.0),
            delivery_cap_bytes: mb_to_bytes(2.0),
        }
    }
}

/// Attachment ready to be handed to the delivery collaborators
#[derive(Debug)]
struct PreparedAttachment {
    filename: String,
    attachment: Attachment,
}

/// Runs the delivery sequence for one submission at a time
pub struct DeliveryOrchestrator {
    attachments: Arc<dyn AttachmentStore>,
    documents: Arc<dyn DocumentStore>,
    notifications: Arc<dyn NotificationChannel>,
    compression: Arc<CompressionPipeline>,
    settings: DeliverySettings,
}

impl DeliveryOrchestrator {
    /// Creates a new orchestrator
    #[must_use]
    pub const fn new(
        attachments: Arc<dyn AttachmentStore>,
        documents: Arc<dyn DocumentStore>,
        notifications: Arc<dyn NotificationChannel>,
        compression: Arc<CompressionPipeline>,
        settings: DeliverySettings,
    ) -> Self {
        Self {
            attachments,
            documents,
            notifications,
            compression,
            settings,
        }
    }

    /// Delivers a submission
    ///
    /// Steps run strictly in order and the first failure stops the sequence.
    /// Artifacts uploaded before a later failure are not rolled back.
    #[instrument(skip_all, fields(reference = %submission.reference))]
    pub async fn deliver(&self, submission: &QueuedSubmission) -> DeliveryOutcome {
        match self.try_deliver(submission).await {
            Ok(()) => DeliveryOutcome::Ok,
            Err(code) => {
                warn!(code = %code, status = code.status(), "Delivery failed");
                DeliveryOutcome::failed(code)
            }
        }
    }

    async fn try_deliver(&self, submission: &QueuedSubmission) -> Result<(), DeliveryErrorCode> {
        let view = PayloadView::from_payload(&submission.application_payload)
            .ok_or(DeliveryErrorCode::InvalidPayload)?;
        let journey = Journey::from_id(view.journey_id.as_deref());

        let prepared = match &view.attachment {
            Some(attachment_ref) => Some(self.prepare_attachment(attachment_ref).await?),
            None => None,
        };

        self.upload_application(submission).await?;

        if let Some(prepared) = &prepared {
            self.upload_attachment(&submission.reference, prepared).await?;
        }

        self.send_notification(submission, journey, prepared.as_ref())
            .await?;

        info!(
            journey = journey.as_str(),
            has_attachment = prepared.is_some(),
            "Submission delivered"
        );
        Ok(())
    }

    /// Fetches the attachment and brings it under the delivery cap
    async fn prepare_attachment(
        &self,
        attachment_ref: &AttachmentRef,
    ) -> Result<PreparedAttachment, DeliveryErrorCode> {
        let fetched = self
            .attachments
            .fetch(&attachment_ref.path)
            .await
            .map_err(|e| {
                warn!(
                    path = %attachment_ref.path,
                    retryable = e.is_retryable(),
                    error = ?e,
                    "Failed to fetch attachment"
                );
                DeliveryErrorCode::FileFetchFailed
            })?;

        let original = Attachment::new(fetched.bytes, fetched.content_type);
        let original_size = original.size_in_bytes();

        if original_size > self.settings.hard_cap_bytes {
            info!(size_mb = original.size_in_mb(), "Attachment exceeds hard cap");
            return Err(DeliveryErrorCode::FileTooLarge);
        }

        let attachment = if original_size > self.settings.delivery_cap_bytes {
            let compressed = self.compression.compress(original).await.map_err(|e| {
                warn!(error = ?e, "Attachment compression failed");
                DeliveryErrorCode::FileCompressionFailed
            })?;

            if compressed.bytes.len() > self.settings.delivery_cap_bytes {
                info!(
                    size_mb = compressed.size_in_mb(),
                    "Attachment still exceeds delivery cap after compression"
                );
                return Err(DeliveryErrorCode::FileCannotBeDelivered);
            }

            compressed.into_attachment()
        } else {
            original
        };

        Ok(PreparedAttachment {
            filename: delivered_filename(&attachment_ref.filename(), &attachment.content_type),
            attachment,
        })
    }

    async fn upload_application(
        &self,
        submission: &QueuedSubmission,
    ) -> Result<(), DeliveryErrorCode> {
        let bytes = serde_json::to_vec_pretty(&submission.application_payload)
            .map_err(|_| DeliveryErrorCode::InvalidPayload)?;

        self.upload(
            UploadRequest {
                reference: submission.reference.clone(),
                filename: APPLICATION_FILENAME.to_string(),
                content_type: APPLICATION_CONTENT_TYPE.to_string(),
                bytes,
                retention_period: self.settings.retention_period.clone(),
            },
            Artifact::Application,
        )
        .await
    }

    async fn upload_attachment(
        &self,
        reference: &str,
        prepared: &PreparedAttachment,
    ) -> Result<(), DeliveryErrorCode> {
        self.upload(
            UploadRequest {
                reference: reference.to_string(),
                filename: prepared.filename.clone(),
                content_type: prepared.attachment.content_type.clone(),
                bytes: prepared.attachment.bytes.clone(),
                retention_period: self.settings.retention_period.clone(),
            },
            Artifact::Attachment,
        )
        .await
    }

    async fn upload(
        &self,
        request: UploadRequest,
        artifact: Artifact,
    ) -> Result<(), DeliveryErrorCode> {
        let filename = request.filename.clone();
        self.documents.upload(request).await.map_or_else(
            |e| {
                warn!(
                    filename = %filename,
                    retryable = e.is_retryable(),
                    error = ?e,
                    "Document upload failed"
                );
                Err(DeliveryErrorCode::FileUploadFailed(artifact))
            },
            |stored| {
                info!(key = %stored.key, "Document uploaded");
                Ok(())
            },
        )
    }

    async fn send_notification(
        &self,
        submission: &QueuedSubmission,
        journey: Journey,
        prepared: Option<&PreparedAttachment>,
    ) -> Result<(), DeliveryErrorCode> {
        let notification = EmailNotification {
            email_address: self.settings.casework_email.clone(),
            template_id: self.settings.templates.for_journey(journey).to_string(),
            personalisation: self.personalisation(&submission.reference, journey, prepared),
            reference: submission.reference.clone(),
        };

        self.notifications
            .send_email(notification)
            .await
            .map_err(|e| match e {
                NotifyError::Timeout => {
                    warn!("Notification timed out");
                    DeliveryErrorCode::NotificationTimeout
                }
                other => {
                    warn!(error = ?other, "Notification failed");
                    DeliveryErrorCode::NotificationFailed
                }
            })
    }

    fn personalisation(
        &self,
        reference: &str,
        journey: Journey,
        prepared: Option<&PreparedAttachment>,
    ) -> Map<String, Value> {
        let link_to_file = prepared.map_or_else(
            || Value::String(String::new()),
            |prepared| {
                let link = LinkToFile {
                    file: STANDARD.encode(&prepared.attachment.bytes),
                    filename: prepared.filename.clone(),
                    confirm_email_before_download: true,
                    retention_period: self.settings.retention_period.clone(),
                };
                json!(link)
            },
        );

        let mut personalisation = Map::new();
        personalisation.insert("reference".to_string(), json!(reference));
        personalisation.insert("journey".to_string(), json!(journey.as_str()));
        personalisation.insert(
            "has_attachment".to_string(),
            json!(if prepared.is_some() { "yes" } else { "no" }),
        );
        personalisation.insert("link_to_file".to_string(), link_to_file);
        personalisation
    }
}

#[async_trait::async_trait]
impl SubmissionProcessor for DeliveryOrchestrator {
    async fn process_submission(&self, submission: &QueuedSubmission) -> DeliveryOutcome {
        self.deliver(submission).await
    }
}

/// Rewrites the extension to `.jpg` when the attachment was re-encoded to JPEG
fn delivered_filename(filename: &str, content_type: &str) -> String {
    if content_type != JPEG_CONTENT_TYPE {
        return filename.to_string();
    }

    let (stem, extension) = filename
        .rsplit_once('.')
        .filter(|(stem, _)| !stem.is_empty())
        .unwrap_or((filename, ""));

    if extension.eq_ignore_ascii_case("jpg") || extension.eq_ignore_ascii_case("jpeg") {
        filename.to_string()
    } else {
        format!("{stem}.jpg")
    }
}
