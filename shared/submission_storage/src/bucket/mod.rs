//! S3-backed object stores
//!
//! Attachments are fetched from the upload bucket; delivered artifacts are
//! written to the document bucket.

/// Attachment fetching
pub mod attachment_store;
/// Document upload
pub mod document_store;
/// Error types for bucket operations
pub mod error;

/// In-memory stores for tests
#[cfg(any(test, feature = "test-utils"))]
pub mod mock;

pub use attachment_store::{AttachmentStore, FetchedObject, S3AttachmentStore};
pub use document_store::{DocumentStore, S3DocumentStore, StoredDocument, UploadRequest};
pub use error::{BucketError, BucketResult};
