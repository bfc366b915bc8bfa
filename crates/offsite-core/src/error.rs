//! Error types module
//!
//! Errors surfaced by the host's record-store implementations. Storage and
//! processing errors live in their own crates; this is only the persistence
//! seam the schedulers talk through.

use uuid::Uuid;

use crate::models::JobStatus;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Record not found: {0}")]
    NotFound(Uuid),

    #[error("Illegal job status transition: {from} -> {to}")]
    InvalidTransition { from: JobStatus, to: JobStatus },

    #[error("Record store error: {0}")]
    Backend(String),
}
