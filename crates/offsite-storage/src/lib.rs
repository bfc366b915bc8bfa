//! Offsite Storage Library
//!
//! Object-storage plumbing for the offsite workspace. It provides the
//! `ObjectBackend` trait with S3 and in-memory implementations, the
//! validated `BucketRegistry`, and the `StorageGateway` that owns key
//! construction, ACL mapping, deterministic URLs, and size checks.
//!
//! # Object key format
//!
//! All uploads share one key layout so all backends stay consistent and
//! retried uploads never collide:
//!
//! - **Without a caller folder**: `{default_folder}/{uuid}.{ext}`
//! - **With one**: `{default_folder}/{folder}/{uuid}.{ext}`
//!
//! The uuid component is freshly generated per call; the extension is
//! carried over from the original filename and omitted when the filename
//! has none. Key generation is centralized in the `keys` module.

#[cfg(feature = "storage-s3")]
pub mod factory;
pub mod gateway;
pub mod keys;
pub mod memory;
pub mod registry;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
#[cfg(feature = "storage-s3")]
pub use factory::connect;
pub use gateway::{SizeCheck, StorageGateway, UploadedObject};
pub use memory::MemoryBackend;
pub use registry::BucketRegistry;
#[cfg(feature = "storage-s3")]
pub use s3::S3Backend;
pub use traits::{FetchedObject, ObjectAcl, ObjectBackend, StorageError, StorageResult};
