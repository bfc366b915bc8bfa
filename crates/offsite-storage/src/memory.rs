//! In-memory object backend for tests and local development.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::RwLock;

use crate::traits::{FetchedObject, ObjectAcl, ObjectBackend, StorageError, StorageResult};

const DEFAULT_REGION: &str = "us-east-1";

/// Object held in memory, with enough metadata to assert on in tests.
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub data: Bytes,
    pub content_type: Option<String>,
    pub acl: ObjectAcl,
}

#[derive(Debug, Default)]
struct Inner {
    buckets: HashSet<String>,
    objects: HashMap<(String, String), StoredObject>,
}

/// Backend that keeps every object in process memory.
#[derive(Debug)]
pub struct MemoryBackend {
    region: String,
    inner: RwLock<Inner>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::with_region(DEFAULT_REGION)
    }

    pub fn with_region(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            inner: RwLock::new(Inner::default()),
        }
    }

    /// Backend pre-seeded with existing buckets.
    pub fn with_buckets<I, S>(buckets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut inner = Inner::default();
        inner.buckets.extend(buckets.into_iter().map(Into::into));
        Self {
            region: DEFAULT_REGION.to_string(),
            inner: RwLock::new(inner),
        }
    }

    /// Stored object at `bucket`/`key`, if present.
    pub async fn object(&self, bucket: &str, key: &str) -> Option<StoredObject> {
        let inner = self.inner.read().await;
        inner
            .objects
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    pub async fn object_count(&self) -> usize {
        self.inner.read().await.objects.len()
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ObjectBackend for MemoryBackend {
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        data: Bytes,
        content_type: Option<&str>,
        acl: ObjectAcl,
    ) -> StorageResult<()> {
        let mut inner = self.inner.write().await;
        if !inner.buckets.contains(bucket) {
            return Err(StorageError::UploadFailed {
                bucket: bucket.to_string(),
                key: key.to_string(),
                message: "no such bucket".to_string(),
            });
        }
        inner.objects.insert(
            (bucket.to_string(), key.to_string()),
            StoredObject {
                data,
                content_type: content_type.map(str::to_string),
                acl,
            },
        );
        Ok(())
    }

    async fn get_object(&self, bucket: &str, key: &str) -> StorageResult<FetchedObject> {
        let inner = self.inner.read().await;
        let stored = inner
            .objects
            .get(&(bucket.to_string(), key.to_string()))
            .ok_or_else(|| StorageError::NotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            })?;
        Ok(FetchedObject {
            bytes: stored.data.clone(),
            content_type: stored
                .content_type
                .clone()
                .unwrap_or_else(|| "application/octet-stream".to_string()),
        })
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> StorageResult<()> {
        let mut inner = self.inner.write().await;
        inner.objects.remove(&(bucket.to_string(), key.to_string()));
        Ok(())
    }

    async fn create_bucket(&self, bucket: &str) -> StorageResult<()> {
        let mut inner = self.inner.write().await;
        inner.buckets.insert(bucket.to_string());
        Ok(())
    }

    async fn delete_bucket(&self, bucket: &str) -> StorageResult<()> {
        let mut inner = self.inner.write().await;
        if inner.objects.keys().any(|(b, _)| b == bucket) {
            return Err(StorageError::BucketOperation {
                bucket: bucket.to_string(),
                message: "bucket is not empty".to_string(),
            });
        }
        inner.buckets.remove(bucket);
        Ok(())
    }

    async fn list_buckets(&self) -> StorageResult<Vec<String>> {
        let inner = self.inner.read().await;
        let mut names: Vec<String> = inner.buckets.iter().cloned().collect();
        names.sort();
        Ok(names)
    }

    fn region(&self) -> &str {
        &self.region
    }
}
