//! # CloudCrate Algorithms
//!
//! CPU algorithms for point cloud downsampling and outlier removal.
//!
//! This crate provides voxel, uniform and index-based downsampling, radius and
//! statistical outlier filters, and the k-d tree neighbor search they are built
//! on. Work is spread over the rayon thread pool.

pub mod nearest_neighbor;
pub mod reduction;
pub mod downsampling;
pub mod filtering;
pub mod point_cloud_ops;

// Re-export commonly used items
pub use nearest_neighbor::*;
pub use reduction::*;
pub use downsampling::*;
pub use filtering::*;
pub use point_cloud_ops::*;
