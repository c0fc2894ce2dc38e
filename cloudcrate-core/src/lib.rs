//! Core data structures and traits for cloudcrate
//!
//! This crate provides the point cloud container, bounding boxes, voxel keys
//! and the neighbor-row types shared by the CPU and GPU algorithm crates.

pub mod point;
pub mod point_cloud;
pub mod bounding_box;
pub mod neighbors;
pub mod voxel;
pub mod traits;
pub mod error;

pub use point::*;
pub use point_cloud::*;
pub use bounding_box::*;
pub use neighbors::*;
pub use voxel::*;
pub use traits::*;
pub use error::*;

/// Re-export commonly used types from nalgebra
pub use nalgebra::{Point3, Vector3};
