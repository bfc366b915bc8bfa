//! Persistence seams between the workers and the host application.
//!
//! The host owns the actual tables; these traits cover exactly the reads
//! and writes the workers need.

use async_trait::async_trait;
use offsite_core::{
    FileRecord, NewFileRecord, OptimizationDetail, OptimizationJob, OwnerRef, RemoteLocation,
    StoreError,
};
use uuid::Uuid;

/// Access to the host's file records.
#[async_trait]
pub trait FileStore: Send + Sync {
    /// Records flagged for object storage that are not migrated yet.
    async fn due_for_migration(&self) -> Result<Vec<FileRecord>, StoreError>;

    async fn get(&self, id: Uuid) -> Result<Option<FileRecord>, StoreError>;

    /// Persist a record for bytes that went straight to object storage.
    async fn create(&self, record: NewFileRecord) -> Result<FileRecord, StoreError>;

    /// Record where the file now lives remotely.
    async fn set_remote_location(
        &self,
        id: Uuid,
        location: &RemoteLocation,
    ) -> Result<(), StoreError>;

    /// Write the remote URL into the owning record's field.
    async fn propagate_owner_url(&self, owner: &OwnerRef, url: &str) -> Result<(), StoreError>;

    async fn delete(&self, id: Uuid) -> Result<(), StoreError>;
}

/// Access to the host's optimization jobs.
#[async_trait]
pub trait JobStore: Send + Sync {
    async fn pending(&self) -> Result<Vec<OptimizationJob>, StoreError>;

    async fn mark_processing(&self, id: Uuid) -> Result<(), StoreError>;

    async fn complete(&self, id: Uuid, details: &[OptimizationDetail]) -> Result<(), StoreError>;

    async fn fail(
        &self,
        id: Uuid,
        details: &[OptimizationDetail],
        error_ref: Option<&str>,
    ) -> Result<(), StoreError>;
}

/// Hook into the host's error tracker. `capture` may return a reference
/// to the stored report, which failed jobs carry for later lookup.
pub trait ErrorSink: Send + Sync {
    fn capture(&self, title: &str, detail: &str) -> Option<String>;
}

/// Sink that drops every report.
pub struct NullErrorSink;

impl ErrorSink for NullErrorSink {
    fn capture(&self, _title: &str, _detail: &str) -> Option<String> {
        None
    }
}
