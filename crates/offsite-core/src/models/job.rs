use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use uuid::Uuid;

/// Lifecycle of an optimization job. Status only moves forward:
/// `Pending -> Processing -> Success | Failed`, never back.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Processing,
    Success,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Success | JobStatus::Failed)
    }

    /// Whether `next` is a legal forward step from this status.
    pub fn can_advance_to(self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Pending, JobStatus::Processing)
                | (JobStatus::Processing, JobStatus::Success)
                | (JobStatus::Processing, JobStatus::Failed)
        )
    }
}

impl Display for JobStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            JobStatus::Pending => write!(f, "pending"),
            JobStatus::Processing => write!(f, "processing"),
            JobStatus::Success => write!(f, "success"),
            JobStatus::Failed => write!(f, "failed"),
        }
    }
}

impl FromStr for JobStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(JobStatus::Pending),
            "processing" => Ok(JobStatus::Processing),
            "success" => Ok(JobStatus::Success),
            "failed" => Ok(JobStatus::Failed),
            _ => Err(anyhow::anyhow!("Invalid job status: {}", s)),
        }
    }
}

/// Per-file row of an optimization job. Sizes stay unset until the
/// pipeline has processed the entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OptimizationDetail {
    pub file_id: Uuid,
    pub before_size_bytes: Option<u64>,
    pub after_size_bytes: Option<u64>,
}

impl OptimizationDetail {
    pub fn new(file_id: Uuid) -> Self {
        OptimizationDetail {
            file_id,
            before_size_bytes: None,
            after_size_bytes: None,
        }
    }
}

/// A batch of files whose stored bytes should be re-encoded, tracked
/// through the `JobStatus` lifecycle. Status, details, and the error
/// reference are the only fields the pipeline mutates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationJob {
    pub id: Uuid,
    /// Type and id of the host record this batch was created for.
    pub reference_type: String,
    pub reference_id: String,
    pub status: JobStatus,
    /// Reference into the host's error-record store, set when the job fails.
    pub error_ref: Option<String>,
    pub details: Vec<OptimizationDetail>,
    pub created_at: DateTime<Utc>,
}

impl OptimizationJob {
    /// Build a pending job covering `file_ids`; `None` for an empty list,
    /// since a job without entries has nothing to do.
    pub fn for_files(
        reference_type: impl Into<String>,
        reference_id: impl Into<String>,
        file_ids: &[Uuid],
    ) -> Option<Self> {
        if file_ids.is_empty() {
            return None;
        }
        Some(OptimizationJob {
            id: Uuid::new_v4(),
            reference_type: reference_type.into(),
            reference_id: reference_id.into(),
            status: JobStatus::Pending,
            error_ref: None,
            details: file_ids
                .iter()
                .copied()
                .map(OptimizationDetail::new)
                .collect(),
            created_at: Utc::now(),
        })
    }
}
