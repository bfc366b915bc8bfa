//! Image optimization for offloaded files
//!
//! Re-encodes images at a reduced quality and scales oversized ones down
//! to a bounding box, keeping EXIF metadata intact. Optimization is
//! best-effort throughout: anything that cannot be decoded, resized, or
//! re-encoded comes back unchanged.

pub mod format;
pub mod optimizer;

pub use optimizer::ImageOptimizer;
