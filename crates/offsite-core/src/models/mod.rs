pub mod file;
pub mod job;

pub use file::{FileRecord, NewFileRecord, OwnerRef, RemoteLocation, Visibility};
pub use job::{JobStatus, OptimizationDetail, OptimizationJob};
