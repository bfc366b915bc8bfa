//! In-memory store implementations for tests and embedded use.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use offsite_core::{
    FileRecord, JobStatus, NewFileRecord, OptimizationDetail, OptimizationJob, OwnerRef,
    RemoteLocation, StoreError,
};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::records::{ErrorSink, FileStore, JobStore};

#[derive(Debug, Default)]
pub struct MemoryFileStore {
    files: RwLock<HashMap<Uuid, FileRecord>>,
    owner_urls: RwLock<HashMap<(String, String, String), String>>,
}

impl MemoryFileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record as-is, returning its id.
    pub async fn insert(&self, record: FileRecord) -> Uuid {
        let id = record.id;
        self.files.write().await.insert(id, record);
        id
    }

    /// URL last propagated to this owner, if any.
    pub async fn owner_url(&self, owner: &OwnerRef) -> Option<String> {
        self.owner_urls.read().await.get(&owner_key(owner)).cloned()
    }

    pub async fn contains(&self, id: Uuid) -> bool {
        self.files.read().await.contains_key(&id)
    }
}

fn owner_key(owner: &OwnerRef) -> (String, String, String) {
    (
        owner.owner_type.clone(),
        owner.owner_id.clone(),
        owner.owner_field.clone(),
    )
}

#[async_trait]
impl FileStore for MemoryFileStore {
    async fn due_for_migration(&self) -> Result<Vec<FileRecord>, StoreError> {
        let files = self.files.read().await;
        let mut due: Vec<FileRecord> = files
            .values()
            .filter(|record| record.use_object_storage && !record.is_migrated())
            .cloned()
            .collect();
        due.sort_by_key(|record| record.id);
        Ok(due)
    }

    async fn get(&self, id: Uuid) -> Result<Option<FileRecord>, StoreError> {
        Ok(self.files.read().await.get(&id).cloned())
    }

    async fn create(&self, record: NewFileRecord) -> Result<FileRecord, StoreError> {
        let record = FileRecord {
            id: Uuid::new_v4(),
            file_name: record.file_name,
            local_path: None,
            size_bytes: record.size_bytes,
            visibility: record.visibility,
            use_object_storage: true,
            remote_url: Some(record.remote.url),
            remote_key: Some(record.remote.key),
            remote_bucket: Some(record.remote.bucket),
            owner: record.owner,
        };
        self.files.write().await.insert(record.id, record.clone());
        Ok(record)
    }

    async fn set_remote_location(
        &self,
        id: Uuid,
        location: &RemoteLocation,
    ) -> Result<(), StoreError> {
        let mut files = self.files.write().await;
        let record = files.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        record.remote_url = Some(location.url.clone());
        record.remote_key = Some(location.key.clone());
        record.remote_bucket = Some(location.bucket.clone());
        Ok(())
    }

    async fn propagate_owner_url(&self, owner: &OwnerRef, url: &str) -> Result<(), StoreError> {
        self.owner_urls
            .write()
            .await
            .insert(owner_key(owner), url.to_string());
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        self.files
            .write()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound(id))
    }
}

#[derive(Debug, Default)]
pub struct MemoryJobStore {
    jobs: RwLock<HashMap<Uuid, OptimizationJob>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, job: OptimizationJob) -> Uuid {
        let id = job.id;
        self.jobs.write().await.insert(id, job);
        id
    }

    pub async fn get(&self, id: Uuid) -> Option<OptimizationJob> {
        self.jobs.read().await.get(&id).cloned()
    }

    async fn transition(
        &self,
        id: Uuid,
        next: JobStatus,
        details: Option<&[OptimizationDetail]>,
        error_ref: Option<&str>,
    ) -> Result<(), StoreError> {
        let mut jobs = self.jobs.write().await;
        let job = jobs.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        if !job.status.can_advance_to(next) {
            return Err(StoreError::InvalidTransition {
                from: job.status,
                to: next,
            });
        }
        job.status = next;
        if let Some(details) = details {
            job.details = details.to_vec();
        }
        if let Some(error_ref) = error_ref {
            job.error_ref = Some(error_ref.to_string());
        }
        Ok(())
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn pending(&self) -> Result<Vec<OptimizationJob>, StoreError> {
        let jobs = self.jobs.read().await;
        let mut pending: Vec<OptimizationJob> = jobs
            .values()
            .filter(|job| job.status == JobStatus::Pending)
            .cloned()
            .collect();
        pending.sort_by_key(|job| job.created_at);
        Ok(pending)
    }

    async fn mark_processing(&self, id: Uuid) -> Result<(), StoreError> {
        self.transition(id, JobStatus::Processing, None, None).await
    }

    async fn complete(&self, id: Uuid, details: &[OptimizationDetail]) -> Result<(), StoreError> {
        self.transition(id, JobStatus::Success, Some(details), None)
            .await
    }

    async fn fail(
        &self,
        id: Uuid,
        details: &[OptimizationDetail],
        error_ref: Option<&str>,
    ) -> Result<(), StoreError> {
        self.transition(id, JobStatus::Failed, Some(details), error_ref)
            .await
    }
}

/// Sink that remembers every report and hands out sequential references.
#[derive(Debug, Default)]
pub struct RecordingErrorSink {
    reports: Mutex<Vec<(String, String)>>,
}

impl RecordingErrorSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reports(&self) -> Vec<(String, String)> {
        match self.reports.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl ErrorSink for RecordingErrorSink {
    fn capture(&self, title: &str, detail: &str) -> Option<String> {
        let mut reports = match self.reports.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        reports.push((title.to_string(), detail.to_string()));
        Some(format!("error-report-{}", reports.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use offsite_core::Visibility;

    fn unmigrated(file_name: &str) -> FileRecord {
        FileRecord {
            id: Uuid::new_v4(),
            file_name: file_name.to_string(),
            local_path: Some(format!("/tmp/{file_name}").into()),
            size_bytes: 100,
            visibility: Visibility::Public,
            use_object_storage: true,
            remote_url: None,
            remote_key: None,
            remote_bucket: None,
            owner: None,
        }
    }

    #[tokio::test]
    async fn test_due_for_migration_filters() {
        let store = MemoryFileStore::new();

        let due_id = store.insert(unmigrated("due.jpg")).await;

        let mut done = unmigrated("done.jpg");
        done.remote_key = Some("uploads/abc.jpg".to_string());
        store.insert(done).await;

        let mut local_only = unmigrated("local.jpg");
        local_only.use_object_storage = false;
        store.insert(local_only).await;

        let due = store.due_for_migration().await.unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].id, due_id);
    }

    #[tokio::test]
    async fn test_create_sets_remote_fields() {
        let store = MemoryFileStore::new();
        let record = store
            .create(NewFileRecord {
                file_name: "a.png".to_string(),
                size_bytes: 42,
                visibility: Visibility::Private,
                remote: RemoteLocation {
                    url: "https://b.example/k".to_string(),
                    key: "uploads/k.png".to_string(),
                    bucket: "b".to_string(),
                },
                owner: None,
            })
            .await
            .unwrap();

        assert!(record.is_migrated());
        assert_eq!(record.remote_location(), Some(("b", "uploads/k.png")));
        assert_eq!(record.local_path, None);
        assert!(record.use_object_storage);
    }

    #[tokio::test]
    async fn test_job_transitions_are_guarded() {
        let store = MemoryJobStore::new();
        let job = OptimizationJob::for_files("article", "7", &[Uuid::new_v4()]).unwrap();
        let id = store.insert(job).await;

        // Completing a pending job skips processing and must fail.
        let err = store.complete(id, &[]).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidTransition { .. }));

        store.mark_processing(id).await.unwrap();
        store.complete(id, &[]).await.unwrap();
        assert_eq!(store.get(id).await.unwrap().status, JobStatus::Success);

        // Terminal states accept no further transitions.
        let err = store.fail(id, &[], None).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn test_pending_lists_only_pending() {
        let store = MemoryJobStore::new();
        let first = OptimizationJob::for_files("article", "1", &[Uuid::new_v4()]).unwrap();
        let first_id = store.insert(first).await;
        let second = OptimizationJob::for_files("article", "2", &[Uuid::new_v4()]).unwrap();
        let second_id = store.insert(second).await;

        store.mark_processing(first_id).await.unwrap();

        let pending = store.pending().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, second_id);
    }

    #[test]
    fn test_recording_sink_hands_out_references() {
        let sink = RecordingErrorSink::new();
        assert_eq!(
            sink.capture("first", "detail"),
            Some("error-report-1".to_string())
        );
        assert_eq!(
            sink.capture("second", "detail"),
            Some("error-report-2".to_string())
        );
        assert_eq!(sink.reports().len(), 2);
    }
}
