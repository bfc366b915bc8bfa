//! Optimization job pipeline.
//!
//! Each pending job walks its file entries: download the stored bytes,
//! optimize, and overwrite the object under its existing key so URLs
//! stay valid. Entries for vanished records are skipped; entries for
//! unmigrated records pass through with unchanged sizes. The first
//! unrecovered error fails the whole job, keeping the details gathered
//! so far.

use std::sync::Arc;

use anyhow::Context;
use offsite_core::{OptimizationDetail, OptimizationJob, OptimizationSettings, StoreError, Visibility};
use offsite_processing::ImageOptimizer;
use offsite_storage::StorageGateway;

use crate::records::{ErrorSink, FileStore, JobStore};

/// Counts from one optimization batch.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct OptimizationReport {
    pub succeeded: usize,
    pub failed: usize,
}

pub struct OptimizationPipeline {
    gateway: Arc<StorageGateway>,
    files: Arc<dyn FileStore>,
    jobs: Arc<dyn JobStore>,
    errors: Arc<dyn ErrorSink>,
    optimizer: ImageOptimizer,
    enabled: bool,
}

impl OptimizationPipeline {
    pub fn new(
        gateway: Arc<StorageGateway>,
        files: Arc<dyn FileStore>,
        jobs: Arc<dyn JobStore>,
        errors: Arc<dyn ErrorSink>,
        settings: OptimizationSettings,
    ) -> Self {
        let enabled = settings.enabled;
        Self {
            gateway,
            files,
            jobs,
            errors,
            optimizer: ImageOptimizer::new(settings),
            enabled,
        }
    }

    /// Process every pending job once.
    #[tracing::instrument(skip(self))]
    pub async fn run_batch(&self) -> Result<OptimizationReport, StoreError> {
        if !self.enabled {
            tracing::debug!("image optimization is disabled, skipping batch");
            return Ok(OptimizationReport::default());
        }

        let pending = self.jobs.pending().await?;
        let mut report = OptimizationReport::default();

        for job in pending {
            let id = job.id;
            match self.process_job(job).await {
                Ok(true) => report.succeeded += 1,
                Ok(false) => report.failed += 1,
                Err(e) => {
                    report.failed += 1;
                    tracing::error!(error = %e, job_id = %id, "Optimization job left unfinished");
                }
            }
        }

        tracing::info!(
            succeeded = report.succeeded,
            failed = report.failed,
            "Optimization batch completed"
        );

        Ok(report)
    }

    /// Run one job to a terminal status. `Ok(true)` means the job
    /// succeeded, `Ok(false)` that it was marked failed; `Err` means a
    /// store write failed and the job may be stuck mid-flight.
    async fn process_job(&self, job: OptimizationJob) -> Result<bool, StoreError> {
        self.jobs.mark_processing(job.id).await?;

        let mut details = Vec::new();
        match self.optimize_entries(&job, &mut details).await {
            Ok(()) => {
                self.jobs.complete(job.id, &details).await?;
                tracing::info!(
                    job_id = %job.id,
                    files = details.len(),
                    "Optimization job completed"
                );
                Ok(true)
            }
            Err(e) => {
                tracing::error!(error = %e, job_id = %job.id, "Optimization job failed");
                let error_ref = self
                    .errors
                    .capture(&format!("optimization job {}", job.id), &format!("{e:#}"));
                self.jobs.fail(job.id, &details, error_ref.as_deref()).await?;
                Ok(false)
            }
        }
    }

    async fn optimize_entries(
        &self,
        job: &OptimizationJob,
        details: &mut Vec<OptimizationDetail>,
    ) -> Result<(), anyhow::Error> {
        for entry in &job.details {
            let file_id = entry.file_id;
            let Some(record) = self.files.get(file_id).await? else {
                tracing::warn!(
                    job_id = %job.id,
                    file_id = %file_id,
                    "file record is gone, skipping entry"
                );
                continue;
            };

            let Some((bucket, key)) = record.remote_location() else {
                // Nothing stored remotely yet; record the current size so
                // the entry still reads as processed.
                let mut detail = OptimizationDetail::new(file_id);
                detail.before_size_bytes = Some(record.size_bytes);
                detail.after_size_bytes = Some(record.size_bytes);
                details.push(detail);
                continue;
            };

            let fetched = self
                .gateway
                .download(bucket, key)
                .await
                .with_context(|| format!("downloading {}/{}", bucket, key))?;

            let before = fetched.bytes.len() as u64;
            let optimized = self.optimizer.optimize(&fetched.bytes, &fetched.content_type);
            let after = optimized.len() as u64;

            self.gateway
                .replace(
                    optimized,
                    bucket,
                    key,
                    record.visibility == Visibility::Public,
                )
                .await
                .with_context(|| format!("replacing {}/{}", bucket, key))?;

            tracing::debug!(
                job_id = %job.id,
                file_id = %file_id,
                before_size_bytes = before,
                after_size_bytes = after,
                "optimized file entry"
            );

            let mut detail = OptimizationDetail::new(file_id);
            detail.before_size_bytes = Some(before);
            detail.after_size_bytes = Some(after);
            details.push(detail);
        }

        Ok(())
    }
}
