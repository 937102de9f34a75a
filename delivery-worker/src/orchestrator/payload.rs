use serde::Deserialize;
use serde_json::Value;

/// The parts of a submitted payload the delivery pipeline reads
///
/// Everything else in the payload is opaque and forwarded untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayloadView {
    /// Journey the application came through
    pub journey_id: Option<String>,
    /// Uploaded attachment, if the applicant provided one
    pub attachment: Option<AttachmentRef>,
}

/// Pointer to an uploaded attachment
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AttachmentRef {
    /// Location in the attachment store
    pub path: String,
    /// Original file name
    pub filename: Option<String>,
}

impl PayloadView {
    /// Reads the view from a payload
    ///
    /// Returns `None` if the payload is not a JSON object or its known fields
    /// have the wrong shape.
    #[must_use]
    pub fn from_payload(payload: &Value) -> Option<Self> {
        if !payload.is_object() {
            return None;
        }

        Self::deserialize(payload).ok()
    }
}

impl AttachmentRef {
    /// File name to deliver the attachment under
    #[must_use]
    pub fn filename(&self) -> String {
        self.filename
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .or_else(|| self.path.rsplit('/').find(|segment| !segment.is_empty()))
            .unwrap_or("attachment")
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_reads_known_fields_and_ignores_the_rest() {
        let view = PayloadView::from_payload(&json!({
            "journeyId": "appeal",
            "attachment": {"path": "uploads/abc/evidence.pdf", "filename": "Evidence.pdf"},
            "answers": [{"question": "Reason", "answer": "..."}]
        }))
        .unwrap();

        assert_eq!(view.journey_id.as_deref(), Some("appeal"));
        let attachment = view.attachment.unwrap();
        assert_eq!(attachment.path, "uploads/abc/evidence.pdf");
        assert_eq!(attachment.filename(), "Evidence.pdf");
    }

    #[test]
    fn test_missing_fields_are_none() {
        let view = PayloadView::from_payload(&json!({"answers": []})).unwrap();
        assert_eq!(view, PayloadView::default());
    }

    #[test]
    fn test_rejects_non_objects_and_malformed_attachments() {
        assert!(PayloadView::from_payload(&json!([null, null])).is_none());
        assert!(PayloadView::from_payload(&json!("text")).is_none());
        assert!(PayloadView::from_payload(&json!({"attachment": "uploads/a.pdf"})).is_none());
        assert!(PayloadView::from_payload(&json!({"attachment": {"filename": "a.pdf"}})).is_none());
    }

    #[test]
    fn test_filename_falls_back_to_path() {
        let with_path = |path: &str, filename: Option<&str>| AttachmentRef {
            path: path.to_string(),
            filename: filename.map(str::to_string),
        };

        assert_eq!(with_path("uploads/x/scan.png", None).filename(), "scan.png");
        assert_eq!(with_path("uploads/x/scan.png", Some("  ")).filename(), "scan.png");
        assert_eq!(with_path("", None).filename(), "attachment");
    }
}
