use std::sync::Arc;

use async_trait::async_trait;
use aws_sdk_s3::Client as S3Client;

use super::error::{BucketError, BucketResult};

/// Content type used when the store does not report one
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Raw object bytes with their content type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedObject {
    /// Object contents
    pub bytes: Vec<u8>,
    /// Content type reported by the store
    pub content_type: String,
}

/// Store that holds uploaded attachments
#[async_trait]
pub trait AttachmentStore: Send + Sync {
    /// Fetches the object at `path`
    async fn fetch(&self, path: &str) -> BucketResult<FetchedObject>;
}

/// Attachment store backed by an S3 bucket
pub struct S3AttachmentStore {
    s3_client: Arc<S3Client>,
    bucket_name: String,
}

impl S3AttachmentStore {
    /// Creates a new attachment store
    ///
    /// # Arguments
    ///
    /// * `s3_client` - Pre-configured S3 client
    /// * `bucket_name` - Bucket the attachments were uploaded to
    #[must_use]
    pub const fn new(s3_client: Arc<S3Client>, bucket_name: String) -> Self {
        Self {
            s3_client,
            bucket_name,
        }
    }
}

#[async_trait]
impl AttachmentStore for S3AttachmentStore {
    /// # Errors
    ///
    /// Returns `BucketError::NotFound` if the key does not exist
    /// Returns `BucketError::UpstreamError` for 5xx errors
    async fn fetch(&self, path: &str) -> BucketResult<FetchedObject> {
        let key = path.trim_start_matches('/');
        if key.is_empty() {
            return Err(BucketError::InvalidInput("empty attachment path".to_string()));
        }

        let output = self
            .s3_client
            .get_object()
            .bucket(&self.bucket_name)
            .key(key)
            .send()
            .await?;

        let content_type = output
            .content_type()
            .unwrap_or(DEFAULT_CONTENT_TYPE)
            .to_string();
        let bytes = output.body.collect().await?.into_bytes().to_vec();

        tracing::debug!(
            key,
            content_type = %content_type,
            size = bytes.len(),
            "Fetched attachment"
        );

        Ok(FetchedObject {
            bytes,
            content_type,
        })
    }
}
