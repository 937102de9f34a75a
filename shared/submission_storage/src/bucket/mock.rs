use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
};

use async_trait::async_trait;

use super::{
    attachment_store::{AttachmentStore, FetchedObject},
    document_store::{DocumentStore, StoredDocument, UploadRequest},
    error::{BucketError, BucketResult},
};

/// Attachment store serving objects from memory
#[derive(Default)]
pub struct InMemoryAttachmentStore {
    objects: Mutex<HashMap<String, FetchedObject>>,
    fetch_calls: AtomicUsize,
}

impl InMemoryAttachmentStore {
    /// Creates an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores an object under `path`
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned
    pub fn insert(&self, path: &str, bytes: Vec<u8>, content_type: &str) {
        self.objects.lock().unwrap().insert(
            path.to_string(),
            FetchedObject {
                bytes,
                content_type: content_type.to_string(),
            },
        );
    }

    /// Number of fetch calls made
    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AttachmentStore for InMemoryAttachmentStore {
    async fn fetch(&self, path: &str) -> BucketResult<FetchedObject> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        self.objects
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| BucketError::NotFound(path.to_string()))
    }
}

/// Document store recording uploads in memory
#[derive(Default)]
pub struct InMemoryDocumentStore {
    uploads: Mutex<Vec<UploadRequest>>,
    failing_filename: Mutex<Option<String>>,
}

impl InMemoryDocumentStore {
    /// Creates an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes uploads of `filename` fail with an upstream error
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned
    pub fn fail_uploads_of(&self, filename: &str) {
        *self.failing_filename.lock().unwrap() = Some(filename.to_string());
    }

    /// Successful uploads, in order
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned
    pub fn uploads(&self) -> Vec<UploadRequest> {
        self.uploads.lock().unwrap().clone()
    }

    /// Successful upload stored under `filename`, if any
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned
    pub fn upload_named(&self, filename: &str) -> Option<UploadRequest> {
        self.uploads
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.filename == filename)
            .cloned()
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn upload(&self, request: UploadRequest) -> BucketResult<StoredDocument> {
        if self.failing_filename.lock().unwrap().as_deref() == Some(request.filename.as_str()) {
            return Err(BucketError::UpstreamError(format!(
                "simulated failure uploading {}",
                request.filename
            )));
        }

        let key = request.object_key();
        self.uploads.lock().unwrap().push(request);
        Ok(StoredDocument { key })
    }
}
