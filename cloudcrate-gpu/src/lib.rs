//! # CloudCrate GPU
//!
//! GPU-accelerated point cloud downsampling and outlier removal using WGPU.
//!
//! The per-point work (voxel keys, brute-force kNN and radius search) runs as
//! compute shaders. Grouping, statistics and selection are shared with
//! `cloudcrate-algorithms`, so both backends keep the same points.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use cloudcrate_gpu::{gpu_voxel_down_sample, GpuContext};
//! use cloudcrate_core::{PointCloud, Point3f};
//!
//! async fn example() -> cloudcrate_core::Result<()> {
//!     let gpu_context = GpuContext::new().await?;
//!
//!     let cloud = PointCloud::from_points(vec![Point3f::new(0.0, 0.0, 0.0)]);
//!     // ... populate point cloud
//!
//!     let downsampled = gpu_voxel_down_sample(&gpu_context, &cloud, 0.05).await?;
//!     Ok(())
//! }
//! ```

pub mod device;
pub mod downsampling;
pub mod filtering;
pub mod nearest_neighbor;
pub mod utils;

// Re-export commonly used items
pub use device::GpuContext;
pub use downsampling::gpu_voxel_down_sample;
pub use filtering::{gpu_remove_radius_outliers, gpu_remove_statistical_outliers};
pub use nearest_neighbor::{gpu_search_knn, gpu_search_radius};
