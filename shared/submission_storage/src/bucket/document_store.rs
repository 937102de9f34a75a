use std::sync::Arc;

use async_trait::async_trait;
use aws_sdk_s3::{primitives::ByteStream, Client as S3Client};

use super::error::{BucketError, BucketResult};

/// A delivered artifact to write to the document store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    /// Submission the artifact belongs to
    pub reference: String,
    /// File name within the submission's folder
    pub filename: String,
    /// MIME type of `bytes`
    pub content_type: String,
    /// File contents
    pub bytes: Vec<u8>,
    /// How long the document is retained, e.g. `26 weeks`
    pub retention_period: String,
}

impl UploadRequest {
    /// Object key for this artifact
    ///
    /// Keyed by submission reference so a redelivered submission overwrites
    /// its own artifacts instead of creating new ones.
    #[must_use]
    pub fn object_key(&self) -> String {
        format!("submissions/{}/{}", self.reference, self.filename)
    }
}

/// Location of a stored document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredDocument {
    /// Object key the document was written to
    pub key: String,
}

/// Case-handling document store
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Writes an artifact, replacing any earlier copy under the same key
    async fn upload(&self, request: UploadRequest) -> BucketResult<StoredDocument>;
}

/// Document store backed by an S3 bucket
pub struct S3DocumentStore {
    s3_client: Arc<S3Client>,
    bucket_name: String,
}

impl S3DocumentStore {
    /// Creates a new document store
    ///
    /// # Arguments
    ///
    /// * `s3_client` - Pre-configured S3 client
    /// * `bucket_name` - Bucket delivered documents are written to
    #[must_use]
    pub const fn new(s3_client: Arc<S3Client>, bucket_name: String) -> Self {
        Self {
            s3_client,
            bucket_name,
        }
    }
}

#[async_trait]
impl DocumentStore for S3DocumentStore {
    async fn upload(&self, request: UploadRequest) -> BucketResult<StoredDocument> {
        if request.reference.is_empty() || request.filename.is_empty() {
            return Err(BucketError::InvalidInput(
                "reference and filename are required".to_string(),
            ));
        }

        let key = request.object_key();
        self.s3_client
            .put_object()
            .bucket(&self.bucket_name)
            .key(&key)
            .content_type(&request.content_type)
            .metadata("reference", &request.reference)
            .metadata("retention-period", &request.retention_period)
            .body(ByteStream::from(request.bytes))
            .send()
            .await?;

        tracing::info!(key = %key, "Uploaded document");

        Ok(StoredDocument { key })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_key_is_stable_per_reference() {
        let request = UploadRequest {
            reference: "HMCTS-0001".to_string(),
            filename: "application.json".to_string(),
            content_type: "application/json".to_string(),
            bytes: b"{}".to_vec(),
            retention_period: "26 weeks".to_string(),
        };

        assert_eq!(request.object_key(), "submissions/HMCTS-0001/application.json");
        assert_eq!(request.clone().object_key(), request.object_key());
    }
}
