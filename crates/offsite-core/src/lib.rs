//! Offsite Core Library
//!
//! Shared configuration, error, and domain model types for the offsite
//! workspace: bucket and optimization settings, host-owned file records,
//! and the optimization job state machine. This crate performs no I/O of
//! its own beyond reading environment variables in the config loaders.

pub mod config;
pub mod error;
pub mod models;

// Re-export commonly used types
pub use config::{BucketConfig, OptimizationSettings, StorageSettings, DEFAULT_UPLOAD_FOLDER};
pub use error::StoreError;
pub use models::{
    FileRecord, JobStatus, NewFileRecord, OptimizationDetail, OptimizationJob, OwnerRef,
    RemoteLocation, Visibility,
};
