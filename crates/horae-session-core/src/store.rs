//! Object storage for uploaded recordings

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use tracing::{debug, error, instrument};

use crate::error::SessionError;

/// Location of a stored object
#[derive(Debug, Clone)]
pub struct StoredObject {
    /// Stable URL the object can be fetched from
    pub url: String,
    /// Stored size in bytes
    pub size_bytes: i64,
}

/// Abstracts audio storage so the pipeline does not care which backend
/// holds the bytes
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `body` under `key`, overwriting any previous object
    async fn put(
        &self,
        key: &str,
        content_type: &str,
        body: Bytes,
    ) -> Result<StoredObject, SessionError>;
}

/// Object store client speaking plain HTTP PUT against an S3-compatible
/// gateway
#[derive(Clone)]
pub struct HttpObjectStore {
    client: reqwest::Client,
    base_url: String,
}

impl HttpObjectStore {
    /// Create a store client for the given gateway base URL
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .tcp_nodelay(true)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self::with_client(base_url, client)
    }

    /// Create a store client sharing an existing HTTP client
    pub fn with_client(base_url: impl Into<String>, client: reqwest::Client) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self { client, base_url }
    }

    fn object_url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url, key)
    }
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    #[instrument(skip(self, body), fields(size = body.len()))]
    async fn put(
        &self,
        key: &str,
        content_type: &str,
        body: Bytes,
    ) -> Result<StoredObject, SessionError> {
        let url = self.object_url(key);
        let size_bytes = body.len() as i64;

        let response = self
            .client
            .put(&url)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(body)
            .send()
            .await
            .map_err(|e| {
                error!(key = %key, error = %e, "Object upload request failed");
                SessionError::StoreError("upload request failed".to_string())
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            error!(key = %key, status = %status, detail = %detail, "Object store rejected upload");
            return Err(SessionError::StoreError(format!(
                "object store returned {status}"
            )));
        }

        debug!(key = %key, size_bytes, "Object stored");
        Ok(StoredObject { url, size_bytes })
    }
}

/// In-memory object store for tests and single-node development
///
/// Clones share storage.
#[derive(Default, Clone)]
pub struct MemoryObjectStore {
    objects: std::sync::Arc<DashMap<String, Bytes>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch a stored object by key
    pub fn get(&self, key: &str) -> Option<Bytes> {
        self.objects.get(key).map(|r| r.value().clone())
    }

    /// Number of stored objects
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put(
        &self,
        key: &str,
        _content_type: &str,
        body: Bytes,
    ) -> Result<StoredObject, SessionError> {
        let size_bytes = body.len() as i64;
        self.objects.insert(key.to_string(), body);
        Ok(StoredObject {
            url: format!("memory://{key}"),
            size_bytes,
        })
    }
}
