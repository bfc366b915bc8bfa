//! Storage backend trait and shared storage types

use async_trait::async_trait;
use bytes::Bytes;
use offsite_core::Visibility;
use thiserror::Error;

/// Access control applied to an uploaded object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectAcl {
    PublicRead,
    Private,
}

impl From<Visibility> for ObjectAcl {
    fn from(visibility: Visibility) -> Self {
        match visibility {
            Visibility::Public => ObjectAcl::PublicRead,
            Visibility::Private => ObjectAcl::Private,
        }
    }
}

/// Bytes and content type fetched from a backend.
#[derive(Debug, Clone)]
pub struct FetchedObject {
    pub bytes: Bytes,
    pub content_type: String,
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed for {bucket}/{key}: {message}")]
    UploadFailed {
        bucket: String,
        key: String,
        message: String,
    },

    #[error("Download failed for {bucket}/{key}: {message}")]
    DownloadFailed {
        bucket: String,
        key: String,
        message: String,
    },

    #[error("Delete failed for {bucket}/{key}: {message}")]
    DeleteFailed {
        bucket: String,
        key: String,
        message: String,
    },

    #[error("Object not found: {bucket}/{key}")]
    NotFound { bucket: String, key: String },

    #[error("Unknown bucket: {0}")]
    UnknownBucket(String),

    #[error("File too large: {size_kb:.1} KB exceeds the {limit_kb} KB limit")]
    FileTooLarge { size_kb: f64, limit_kb: u64 },

    #[error("Bucket operation failed for {bucket}: {message}")]
    BucketOperation { bucket: String, message: String },

    #[error("Invalid bucket configuration: {}", .violations.join("; "))]
    InvalidBucketConfig { violations: Vec<String> },

    #[error("Storage configuration error: {0}")]
    Config(String),

    #[error("Storage backend error: {0}")]
    Backend(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Object-storage backend contract.
///
/// Implementations handle raw object I/O only; key construction, ACL
/// mapping, and URL generation live in the gateway.
#[async_trait]
pub trait ObjectBackend: Send + Sync {
    /// Store an object, overwriting any existing object at the key.
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        data: Bytes,
        content_type: Option<&str>,
        acl: ObjectAcl,
    ) -> StorageResult<()>;

    /// Fetch an object's bytes and content type.
    async fn get_object(&self, bucket: &str, key: &str) -> StorageResult<FetchedObject>;

    /// Delete an object. Deleting a missing object is not an error.
    async fn delete_object(&self, bucket: &str, key: &str) -> StorageResult<()>;

    async fn create_bucket(&self, bucket: &str) -> StorageResult<()>;

    async fn delete_bucket(&self, bucket: &str) -> StorageResult<()>;

    async fn list_buckets(&self) -> StorageResult<Vec<String>>;

    /// Region this backend is connected to, used for deterministic URLs.
    fn region(&self) -> &str;
}
