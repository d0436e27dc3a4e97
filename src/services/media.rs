use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use thiserror::Error;
use uuid::Uuid;

use crate::config::{env_string, env_u64};
use crate::models::{Link, MediaKind};

const DEFAULT_TIMEOUT_MS: u64 = 30_000;
const MEMORY_PUBLIC_URL: &str = "memory://";

#[derive(Debug, Clone)]
pub struct MediaConfig {
    pub endpoint: Option<String>,
    pub token: Option<String>,
    pub public_url: String,
    pub words_bucket: String,
    pub speech_bucket: String,
    pub timeout: Duration,
}

impl MediaConfig {
    pub fn from_env() -> Self {
        let endpoint =
            env_string("MEDIA_ENDPOINT").map(|v| v.trim().trim_end_matches('/').to_string());
        let public_url = env_string("MEDIA_PUBLIC_URL")
            .or_else(|| endpoint.as_ref().map(|e| format!("{e}/")))
            .unwrap_or_else(|| MEMORY_PUBLIC_URL.to_string());

        Self {
            endpoint,
            token: env_string("MEDIA_TOKEN"),
            public_url,
            words_bucket: env_string("MEDIA_WORDS_BUCKET").unwrap_or_else(|| "words".to_string()),
            speech_bucket: env_string("MEDIA_SPEECH_BUCKET")
                .unwrap_or_else(|| "speech".to_string()),
            timeout: Duration::from_millis(env_u64("MEDIA_TIMEOUT").unwrap_or(DEFAULT_TIMEOUT_MS)),
        }
    }
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            token: None,
            public_url: MEMORY_PUBLIC_URL.to_string(),
            words_bucket: "words".to_string(),
            speech_bucket: "speech".to_string(),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
        }
    }
}

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("HTTP {status}: {body}")]
    HttpStatus {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("media store unavailable: {0}")]
    Unavailable(String),
}

/// Blob store reached through plain put/delete calls.
#[async_trait]
pub trait MediaStore: Send + Sync {
    async fn put(&self, bucket: &str, key: &str, bytes: Bytes) -> Result<(), MediaError>;

    async fn delete(&self, bucket: &str, key: &str) -> Result<(), MediaError>;
}

/// S3-compatible object store addressed path-style: `{endpoint}/{bucket}/{key}`.
#[derive(Clone)]
pub struct HttpMediaStore {
    endpoint: String,
    token: Option<String>,
    client: reqwest::Client,
}

impl HttpMediaStore {
    pub fn new(endpoint: impl Into<String>, token: Option<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            endpoint: endpoint.into(),
            token,
            client,
        }
    }

    fn object_url(&self, bucket: &str, key: &str) -> String {
        format!("{}/{}/{}", self.endpoint, bucket, urlencoding::encode(key))
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.token.as_deref() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

#[async_trait]
impl MediaStore for HttpMediaStore {
    async fn put(&self, bucket: &str, key: &str, bytes: Bytes) -> Result<(), MediaError> {
        let request = self
            .client
            .put(self.object_url(bucket, key))
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(bytes);
        let resp = self.authorize(request).send().await?;

        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }
        let body = resp.text().await.unwrap_or_default();
        Err(MediaError::HttpStatus { status, body })
    }

    async fn delete(&self, bucket: &str, key: &str) -> Result<(), MediaError> {
        let request = self.client.delete(self.object_url(bucket, key));
        let resp = self.authorize(request).send().await?;

        let status = resp.status();
        // An already-missing object counts as deleted.
        if status.is_success() || status == reqwest::StatusCode::NOT_FOUND {
            return Ok(());
        }
        let body = resp.text().await.unwrap_or_default();
        Err(MediaError::HttpStatus { status, body })
    }
}

/// In-process blob store used when no endpoint is configured, and by tests.
#[derive(Default)]
pub struct MemoryMediaStore {
    objects: Mutex<HashMap<(String, String), Bytes>>,
    deleted: AtomicUsize,
    failing: AtomicBool,
}

impl MemoryMediaStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent call fail, to simulate an unreachable store.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::Relaxed);
    }

    pub fn contains(&self, bucket: &str, key: &str) -> bool {
        self.objects
            .lock()
            .contains_key(&(bucket.to_string(), key.to_string()))
    }

    pub fn object_count(&self) -> usize {
        self.objects.lock().len()
    }

    /// Delete calls served so far, including ones for missing objects.
    pub fn deletion_count(&self) -> usize {
        self.deleted.load(Ordering::Relaxed)
    }

    fn check_available(&self) -> Result<(), MediaError> {
        if self.failing.load(Ordering::Relaxed) {
            return Err(MediaError::Unavailable("memory store set to fail".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl MediaStore for MemoryMediaStore {
    async fn put(&self, bucket: &str, key: &str, bytes: Bytes) -> Result<(), MediaError> {
        self.check_available()?;
        self.objects
            .lock()
            .insert((bucket.to_string(), key.to_string()), bytes);
        Ok(())
    }

    async fn delete(&self, bucket: &str, key: &str) -> Result<(), MediaError> {
        self.check_available()?;
        self.objects
            .lock()
            .remove(&(bucket.to_string(), key.to_string()));
        self.deleted.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

/// Bucket routing and naming on top of a [`MediaStore`].
#[derive(Clone)]
pub struct MediaLibrary {
    store: Arc<dyn MediaStore>,
    public_url: String,
    words_bucket: String,
    speech_bucket: String,
}

impl MediaLibrary {
    pub fn new(store: Arc<dyn MediaStore>, config: &MediaConfig) -> Self {
        Self {
            store,
            public_url: config.public_url.clone(),
            words_bucket: config.words_bucket.clone(),
            speech_bucket: config.speech_bucket.clone(),
        }
    }

    pub fn from_config(config: &MediaConfig) -> Self {
        let store: Arc<dyn MediaStore> = match config.endpoint.as_deref() {
            Some(endpoint) => Arc::new(HttpMediaStore::new(
                endpoint,
                config.token.clone(),
                config.timeout,
            )),
            None => {
                tracing::warn!("MEDIA_ENDPOINT not set, using in-memory media store");
                Arc::new(MemoryMediaStore::new())
            }
        };
        Self::new(store, config)
    }

    pub fn bucket(&self, kind: MediaKind) -> &str {
        match kind {
            MediaKind::Image => &self.words_bucket,
            MediaKind::Speech => &self.speech_bucket,
        }
    }

    pub fn link(&self, kind: MediaKind, key: String) -> Link {
        let url = format!("{}{}/{}", self.public_url, self.bucket(kind), urlencoding::encode(&key));
        Link { key, url }
    }

    /// Uploads under `{user}-{name}-{time-ordered suffix}` and returns the link.
    pub async fn store(
        &self,
        kind: MediaKind,
        user: &str,
        name: &str,
        bytes: Bytes,
    ) -> Result<Link, MediaError> {
        let key = blob_key(user, name);
        self.store.put(self.bucket(kind), &key, bytes).await?;
        tracing::debug!(bucket = self.bucket(kind), key = %key, "blob stored");
        Ok(self.link(kind, key))
    }

    pub async fn remove(&self, kind: MediaKind, link: &Link) -> Result<(), MediaError> {
        self.store.delete(self.bucket(kind), &link.key).await?;
        tracing::debug!(bucket = self.bucket(kind), key = %link.key, "blob deleted");
        Ok(())
    }

    /// Removes a blob this call just uploaded; failures are only logged
    /// since the blob is an orphan either way.
    pub async fn discard(&self, kind: MediaKind, link: &Link) {
        if let Err(err) = self.remove(kind, link).await {
            tracing::warn!(error = %err, key = %link.key, "failed to discard orphaned blob");
        }
    }
}

pub fn blob_key(user: &str, name: &str) -> String {
    format!("{user}-{name}-{}", Uuid::now_v7())
}
