//! Background migration of local files into object storage.
//!
//! Each batch picks up every record flagged for object storage without a
//! remote key, uploads the local bytes to the default bucket for the
//! record's visibility, stores the remote location, and removes the local
//! copy. One broken record never stops the rest of the batch.

use std::sync::Arc;

use anyhow::Context;
use bytes::Bytes;
use offsite_core::{FileRecord, RemoteLocation, StoreError, Visibility};
use offsite_storage::StorageGateway;

use crate::records::{ErrorSink, FileStore};

/// Counts from one migration batch.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MigrationReport {
    pub migrated: usize,
    pub skipped: usize,
    pub failed: usize,
}

enum MigrationOutcome {
    Migrated,
    Skipped,
}

pub struct MigrationScheduler {
    gateway: Arc<StorageGateway>,
    files: Arc<dyn FileStore>,
    errors: Arc<dyn ErrorSink>,
    disabled: bool,
}

impl MigrationScheduler {
    pub fn new(
        gateway: Arc<StorageGateway>,
        files: Arc<dyn FileStore>,
        errors: Arc<dyn ErrorSink>,
        disabled: bool,
    ) -> Self {
        Self {
            gateway,
            files,
            errors,
            disabled,
        }
    }

    /// Migrate every due record once. Failures are isolated per record.
    #[tracing::instrument(skip(self))]
    pub async fn run_batch(&self) -> Result<MigrationReport, StoreError> {
        if self.disabled {
            tracing::debug!("offload operations are disabled, skipping migration batch");
            return Ok(MigrationReport::default());
        }

        let due = self.files.due_for_migration().await?;
        let mut report = MigrationReport::default();

        for record in due {
            let id = record.id;
            match self.migrate_file(&record).await {
                Ok(MigrationOutcome::Migrated) => report.migrated += 1,
                Ok(MigrationOutcome::Skipped) => report.skipped += 1,
                Err(e) => {
                    report.failed += 1;
                    tracing::error!(error = %e, file_id = %id, "Failed to migrate file");
                    self.errors
                        .capture(&format!("migration of file {id}"), &format!("{e:#}"));
                }
            }
        }

        tracing::info!(
            migrated = report.migrated,
            skipped = report.skipped,
            failed = report.failed,
            "Migration batch completed"
        );

        Ok(report)
    }

    async fn migrate_file(&self, record: &FileRecord) -> Result<MigrationOutcome, anyhow::Error> {
        // Re-read in case another worker migrated it after the batch was
        // listed.
        let current = self
            .files
            .get(record.id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("record disappeared before migration"))?;
        if current.is_migrated() {
            tracing::debug!(file_id = %current.id, "already migrated, skipping");
            return Ok(MigrationOutcome::Skipped);
        }

        let Some(local_path) = current.local_path.clone() else {
            tracing::warn!(file_id = %current.id, "record has no local path, skipping");
            return Ok(MigrationOutcome::Skipped);
        };

        let data = match tokio::fs::read(&local_path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    file_id = %current.id,
                    path = %local_path.display(),
                    "local file is missing, skipping"
                );
                return Ok(MigrationOutcome::Skipped);
            }
            Err(e) => return Err(e).context("reading local file"),
        };

        let data = Bytes::from(data);
        let uploaded = match current.visibility {
            Visibility::Public => {
                self.gateway
                    .upload_to_default_public(data, &current.file_name, None)
                    .await
            }
            Visibility::Private => {
                self.gateway
                    .upload_to_default_private(data, &current.file_name, None)
                    .await
            }
        }
        .context("uploading to object storage")?;

        let location = RemoteLocation {
            url: uploaded.url.clone(),
            key: uploaded.key.clone(),
            bucket: uploaded.bucket.clone(),
        };
        self.files.set_remote_location(current.id, &location).await?;

        if let Some(ref owner) = current.owner {
            self.files.propagate_owner_url(owner, &uploaded.url).await?;
        }

        // The local copy is redundant now; its removal is best-effort.
        if let Err(e) = tokio::fs::remove_file(&local_path).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(
                    error = %e,
                    file_id = %current.id,
                    path = %local_path.display(),
                    "failed to remove local file after migration"
                );
            }
        }

        tracing::info!(
            file_id = %current.id,
            bucket = %uploaded.bucket,
            key = %uploaded.key,
            "file migrated to object storage"
        );

        Ok(MigrationOutcome::Migrated)
    }
}
