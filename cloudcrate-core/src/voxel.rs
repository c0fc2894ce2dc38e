//! Voxel grid addressing

use crate::{AxisAlignedBoundingBox, Error, Point3f, Result};
use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

/// Integer coordinates of a cubic voxel.
///
/// Keys order lexicographically by `(x, y, z)`, which is the order the
/// key reduction groups voxels in.
#[repr(C)]
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Pod, Zeroable,
)]
pub struct VoxelKey {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl VoxelKey {
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }
}

/// A regular grid of cubic voxels anchored at `origin`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VoxelGrid {
    pub origin: Point3f,
    pub voxel_size: f32,
}

impl VoxelGrid {
    /// Build the grid covering `bounds`, padded by half a voxel on every side
    /// so points on the box faces do not sit exactly on a voxel boundary.
    ///
    /// Fails when `voxel_size` is not a positive finite number, or when the
    /// number of voxels along an axis does not fit in an `i32` key.
    pub fn covering(bounds: &AxisAlignedBoundingBox, voxel_size: f32) -> Result<Self> {
        if !(voxel_size.is_finite() && voxel_size > 0.0) {
            return Err(Error::InvalidParameter(format!(
                "voxel_size must be positive, got {}",
                voxel_size
            )));
        }

        let extent = bounds.max_bound - bounds.min_bound;
        for axis in 0..3 {
            let cells = (extent[axis] + voxel_size) / voxel_size;
            if !cells.is_finite() || cells >= i32::MAX as f32 {
                return Err(Error::InvalidParameter(format!(
                    "voxel_size {} is too small for an extent of {} along axis {}",
                    voxel_size, extent[axis], axis
                )));
            }
        }

        let half = voxel_size * 0.5;
        Ok(Self {
            origin: Point3f::new(
                bounds.min_bound.x - half,
                bounds.min_bound.y - half,
                bounds.min_bound.z - half,
            ),
            voxel_size,
        })
    }

    /// Key of the voxel containing `point`
    #[inline]
    pub fn key_of(&self, point: &Point3f) -> VoxelKey {
        let rel = (point - self.origin) / self.voxel_size;
        VoxelKey::new(
            rel.x.floor() as i32,
            rel.y.floor() as i32,
            rel.z.floor() as i32,
        )
    }
}
