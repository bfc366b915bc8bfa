//! High-level storage operations over a backend and the bucket registry.

use std::sync::Arc;

use bytes::Bytes;
use offsite_core::Visibility;

use crate::keys;
use crate::registry::BucketRegistry;
use crate::traits::{FetchedObject, ObjectAcl, ObjectBackend, StorageError, StorageResult};

/// Result of a completed upload.
#[derive(Debug, Clone)]
pub struct UploadedObject {
    pub url: String,
    pub key: String,
    pub bucket: String,
}

/// Outcome of a size check against the bucket limits.
#[derive(Debug, Clone, Copy)]
pub struct SizeCheck {
    pub exceeds: bool,
    pub limit_kb: u64,
    pub size_kb: f64,
}

/// Entry point for object storage: key construction, bucket routing,
/// ACL mapping, and URL generation live here, everything below goes
/// through the [`ObjectBackend`].
pub struct StorageGateway {
    backend: Arc<dyn ObjectBackend>,
    registry: BucketRegistry,
}

impl std::fmt::Debug for StorageGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageGateway")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

impl StorageGateway {
    pub fn new(backend: Arc<dyn ObjectBackend>, registry: BucketRegistry) -> Self {
        Self { backend, registry }
    }

    pub fn registry(&self) -> &BucketRegistry {
        &self.registry
    }

    /// Upload `data` into `bucket` under a freshly generated key.
    ///
    /// The key keeps the original filename's extension and lands under
    /// the bucket's base folder, nested under `folder` when given.
    /// Public uploads get a public-read ACL.
    pub async fn upload(
        &self,
        data: Bytes,
        file_name: &str,
        bucket: &str,
        visibility: Visibility,
        folder: Option<&str>,
    ) -> StorageResult<UploadedObject> {
        let key = keys::object_key(self.registry.default_folder(bucket), folder, file_name);
        let size = data.len() as u64;

        self.backend
            .put_object(bucket, &key, data, None, ObjectAcl::from(visibility))
            .await?;

        tracing::info!(
            bucket = %bucket,
            key = %key,
            size_bytes = size,
            visibility = %visibility,
            "object uploaded"
        );

        Ok(UploadedObject {
            url: self.object_url(bucket, &key),
            key,
            bucket: bucket.to_string(),
        })
    }

    /// Upload into the configured default public bucket.
    pub async fn upload_to_default_public(
        &self,
        data: Bytes,
        file_name: &str,
        folder: Option<&str>,
    ) -> StorageResult<UploadedObject> {
        self.upload_to_default(data, file_name, Visibility::Public, folder)
            .await
    }

    /// Upload into the configured default private bucket.
    pub async fn upload_to_default_private(
        &self,
        data: Bytes,
        file_name: &str,
        folder: Option<&str>,
    ) -> StorageResult<UploadedObject> {
        self.upload_to_default(data, file_name, Visibility::Private, folder)
            .await
    }

    async fn upload_to_default(
        &self,
        data: Bytes,
        file_name: &str,
        visibility: Visibility,
        folder: Option<&str>,
    ) -> StorageResult<UploadedObject> {
        let bucket = self
            .registry
            .default_bucket_for(visibility)
            .ok_or_else(|| {
                StorageError::Config(format!("no default {visibility} bucket configured"))
            })?;
        self.upload(data, file_name, bucket, visibility, folder).await
    }

    pub async fn download(&self, bucket: &str, key: &str) -> StorageResult<FetchedObject> {
        self.backend.get_object(bucket, key).await
    }

    /// Overwrite the object at `bucket`/`key` in place, keeping the key
    /// and therefore the public URL stable.
    pub async fn replace(
        &self,
        data: Bytes,
        bucket: &str,
        key: &str,
        make_public: bool,
    ) -> StorageResult<()> {
        let acl = if make_public {
            ObjectAcl::PublicRead
        } else {
            ObjectAcl::Private
        };
        self.backend.put_object(bucket, key, data, None, acl).await
    }

    /// Delete the object at `bucket`/`key`. Deleting a missing object
    /// succeeds.
    pub async fn delete(&self, bucket: &str, key: &str) -> StorageResult<()> {
        self.backend.delete_object(bucket, key).await?;
        tracing::info!(bucket = %bucket, key = %key, "object deleted");
        Ok(())
    }

    /// Check `byte_length` against the bucket limit for the extension.
    /// Limits are compared in fractional KB, so 1025 bytes exceeds a
    /// 1 KB limit.
    pub fn validate_size(
        &self,
        byte_length: u64,
        bucket: &str,
        extension: &str,
        _visibility: Visibility,
    ) -> StorageResult<SizeCheck> {
        let limit_kb = self.registry.size_limit_kb(bucket, extension)?;
        let size_kb = byte_length as f64 / 1024.0;
        Ok(SizeCheck {
            exceeds: size_kb > limit_kb as f64,
            limit_kb,
            size_kb,
        })
    }

    pub async fn create_bucket(&self, bucket: &str) -> StorageResult<()> {
        self.backend.create_bucket(bucket).await
    }

    pub async fn delete_bucket(&self, bucket: &str) -> StorageResult<()> {
        self.backend.delete_bucket(bucket).await
    }

    pub async fn list_buckets(&self) -> StorageResult<Vec<String>> {
        self.backend.list_buckets().await
    }

    fn object_url(&self, bucket: &str, key: &str) -> String {
        format!(
            "https://{}.s3.dualstack.{}.amazonaws.com/{}",
            bucket,
            self.backend.region(),
            key
        )
    }
}
