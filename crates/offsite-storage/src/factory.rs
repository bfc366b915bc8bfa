use std::sync::Arc;

use offsite_core::StorageSettings;

use crate::gateway::StorageGateway;
use crate::registry::BucketRegistry;
use crate::s3::S3Backend;
use crate::traits::StorageResult;

/// Build a gateway from configuration: validate the bucket list, then
/// connect the S3 backend.
pub async fn connect(settings: &StorageSettings) -> StorageResult<StorageGateway> {
    let registry = BucketRegistry::load(settings.buckets.clone())?;
    let backend = S3Backend::connect(settings).await?;
    Ok(StorageGateway::new(Arc::new(backend), registry))
}
