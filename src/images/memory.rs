//! In-process image host. Keeps uploaded objects in memory and can be told to
//! fail, which is how the upload pipeline's cleanup paths are exercised.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{Derivative, HostedImage, ImageHost};
use crate::error::ImageHostError;

const URL_PREFIX: &str = "https://images.invalid/";

#[derive(Debug, Clone)]
pub struct StoredObject {
    pub derivative: Derivative,
    pub size: usize,
}

pub struct MemoryImageHost {
    folder: String,
    objects: Mutex<HashMap<String, StoredObject>>,
    uploads: AtomicUsize,
    /// Uploads beyond this many successful ones are rejected.
    upload_budget: AtomicUsize,
    fail_destroy: AtomicBool,
}

impl MemoryImageHost {
    pub fn new(folder: impl Into<String>) -> Self {
        Self {
            folder: folder.into(),
            objects: Mutex::new(HashMap::new()),
            uploads: AtomicUsize::new(0),
            upload_budget: AtomicUsize::new(usize::MAX),
            fail_destroy: AtomicBool::new(false),
        }
    }

    /// Let `successful` more uploads through, then reject every later one.
    pub fn fail_uploads_after(&self, successful: usize) {
        let done = self.uploads.load(Ordering::SeqCst);
        self.upload_budget
            .store(done.saturating_add(successful), Ordering::SeqCst);
    }

    pub fn fail_destroys(&self, fail: bool) {
        self.fail_destroy.store(fail, Ordering::SeqCst);
    }

    pub async fn contains(&self, public_id: &str) -> bool {
        self.objects.lock().await.contains_key(public_id)
    }

    pub async fn len(&self) -> usize {
        self.objects.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    async fn store(&self, derivative: Derivative, size: usize) -> Result<HostedImage, ImageHostError> {
        let attempt = self.uploads.fetch_add(1, Ordering::SeqCst);
        if attempt >= self.upload_budget.load(Ordering::SeqCst) {
            return Err(ImageHostError::Rejected {
                status: 503,
                message: "upload refused".to_string(),
            });
        }

        let public_id = format!("{}/{}", derivative.folder(&self.folder), Uuid::new_v4());
        let url = format!("{URL_PREFIX}{public_id}");
        self.objects
            .lock()
            .await
            .insert(public_id.clone(), StoredObject { derivative, size });

        Ok(HostedImage { url, public_id })
    }
}

#[async_trait]
impl ImageHost for MemoryImageHost {
    async fn upload(
        &self,
        bytes: Vec<u8>,
        _filename: &str,
        derivative: Derivative,
    ) -> Result<HostedImage, ImageHostError> {
        self.store(derivative, bytes.len()).await
    }

    async fn upload_from_url(
        &self,
        url: &str,
        derivative: Derivative,
    ) -> Result<HostedImage, ImageHostError> {
        if !url.starts_with(URL_PREFIX) {
            return Err(ImageHostError::Protocol(format!("unknown source {url}")));
        }
        self.store(derivative, 0).await
    }

    async fn destroy(&self, public_id: &str) -> Result<(), ImageHostError> {
        if self.fail_destroy.load(Ordering::SeqCst) {
            return Err(ImageHostError::Rejected {
                status: 500,
                message: "destroy refused".to_string(),
            });
        }
        self.objects.lock().await.remove(public_id);
        Ok(())
    }

    fn public_id_from_url(&self, url: &str) -> Option<String> {
        url.strip_prefix(URL_PREFIX).map(str::to_string)
    }
}
