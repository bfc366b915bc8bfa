//! Background services that move host-owned files into object storage
//! and shrink stored images.
//!
//! The host application wires these up with its own [`records::FileStore`]
//! and [`records::JobStore`] implementations; `memory` holds in-process
//! stores for tests and small embedded deployments.

pub mod attachments;
pub mod memory;
pub mod migration;
pub mod optimization;
pub mod records;

pub use attachments::{AttachmentError, AttachmentService};
pub use migration::{MigrationReport, MigrationScheduler};
pub use optimization::{OptimizationPipeline, OptimizationReport};
pub use records::{ErrorSink, FileStore, JobStore, NullErrorSink};
