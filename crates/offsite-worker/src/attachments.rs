//! Direct attachment uploads and removals.
//!
//! Unlike migration, which lifts existing local files, attachments go
//! straight to object storage and never touch the local disk.

use std::sync::Arc;

use bytes::Bytes;
use offsite_core::{FileRecord, NewFileRecord, OwnerRef, RemoteLocation, StoreError, Visibility};
use offsite_storage::keys;
use offsite_storage::{StorageError, StorageGateway};
use thiserror::Error;
use uuid::Uuid;

use crate::records::FileStore;

#[derive(Debug, Error)]
pub enum AttachmentError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Attachment not found: {0}")]
    NotFound(Uuid),
}

pub struct AttachmentService {
    gateway: Arc<StorageGateway>,
    files: Arc<dyn FileStore>,
}

impl AttachmentService {
    pub fn new(gateway: Arc<StorageGateway>, files: Arc<dyn FileStore>) -> Self {
        Self { gateway, files }
    }

    /// Upload `data` into the default bucket for `visibility` and record
    /// it. Files over the bucket's size limit are rejected before any
    /// bytes leave the process.
    pub async fn attach(
        &self,
        data: Bytes,
        file_name: &str,
        visibility: Visibility,
        folder: Option<&str>,
        owner: Option<OwnerRef>,
    ) -> Result<FileRecord, AttachmentError> {
        let bucket = self
            .gateway
            .registry()
            .default_bucket_for(visibility)
            .ok_or_else(|| {
                StorageError::Config(format!("no default {visibility} bucket configured"))
            })?;

        let extension = keys::file_extension(file_name).unwrap_or_default();
        let check = self
            .gateway
            .validate_size(data.len() as u64, bucket, extension, visibility)?;
        if check.exceeds {
            return Err(StorageError::FileTooLarge {
                size_kb: check.size_kb,
                limit_kb: check.limit_kb,
            }
            .into());
        }

        let size_bytes = data.len() as u64;
        let uploaded = match visibility {
            Visibility::Public => {
                self.gateway
                    .upload_to_default_public(data, file_name, folder)
                    .await?
            }
            Visibility::Private => {
                self.gateway
                    .upload_to_default_private(data, file_name, folder)
                    .await?
            }
        };

        tracing::info!(
            bucket = %uploaded.bucket,
            key = %uploaded.key,
            size_bytes,
            "attachment stored"
        );

        let record = self
            .files
            .create(NewFileRecord {
                file_name: file_name.to_string(),
                size_bytes,
                visibility,
                remote: RemoteLocation {
                    url: uploaded.url,
                    key: uploaded.key,
                    bucket: uploaded.bucket,
                },
                owner,
            })
            .await?;

        Ok(record)
    }

    /// Delete the stored object and drop the record. A failed backend
    /// delete leaves the record in place so the object is not orphaned.
    pub async fn remove(&self, file_id: Uuid) -> Result<(), AttachmentError> {
        let record = self
            .files
            .get(file_id)
            .await?
            .ok_or(AttachmentError::NotFound(file_id))?;

        if let Some((bucket, key)) = record.remote_location() {
            self.gateway.delete(bucket, key).await?;
        }

        self.files.delete(file_id).await?;
        tracing::info!(file_id = %file_id, "attachment removed");

        Ok(())
    }
}
