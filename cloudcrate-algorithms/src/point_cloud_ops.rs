//! Point cloud operations as methods on [`PointCloud`]

use crate::downsampling::{select_down_sample, uniform_down_sample, voxel_down_sample};
use crate::filtering::{remove_radius_outliers, remove_statistical_outliers};
use cloudcrate_core::{AxisAlignedBoundingBox, Color3f, PointCloud, Result};
use rayon::prelude::*;
use tracing::debug;

/// Extension trait for PointCloud to add downsampling and filtering
///
/// # Example
/// ```rust
/// use cloudcrate_core::{PointCloud, Point3f};
/// use cloudcrate_algorithms::point_cloud_ops::PointCloudOps;
///
/// let cloud = PointCloud::from_points(vec![
///     Point3f::new(0.0, 0.0, 0.0),
///     Point3f::new(0.05, 0.0, 0.0),
///     Point3f::new(1.0, 0.0, 0.0),
/// ]);
///
/// let downsampled = cloud.voxel_down_sample(0.5).unwrap();
/// assert_eq!(downsampled.len(), 2);
/// ```
pub trait PointCloudOps {
    fn voxel_down_sample(&self, voxel_size: f32) -> Result<PointCloud>;

    fn uniform_down_sample(&self, every_k_points: usize) -> Result<PointCloud>;

    fn select_down_sample(&self, indices: &[usize], invert: bool) -> Result<PointCloud>;

    fn remove_radius_outliers(&self, nb_points: usize, radius: f32) -> Result<(PointCloud, Vec<usize>)>;

    fn remove_statistical_outliers(&self, nb_neighbors: usize, std_ratio: f32) -> Result<(PointCloud, Vec<usize>)>;

    /// Keep the points inside `bbox`, faces included
    fn crop(&self, bbox: &AxisAlignedBoundingBox) -> Result<(PointCloud, Vec<usize>)>;

    /// Drop points with NaN and/or infinite coordinates
    fn remove_non_finite_points(&self, remove_nan: bool, remove_infinite: bool) -> Result<(PointCloud, Vec<usize>)>;

    /// Rescale every normal to unit length; zero normals are left as they are
    fn normalize_normals(&mut self);

    /// Set every point's color, creating the color array if absent
    fn paint_uniform_color(&mut self, color: Color3f);
}

impl PointCloudOps for PointCloud {
    fn voxel_down_sample(&self, voxel_size: f32) -> Result<PointCloud> {
        voxel_down_sample(self, voxel_size)
    }

    fn uniform_down_sample(&self, every_k_points: usize) -> Result<PointCloud> {
        uniform_down_sample(self, every_k_points)
    }

    fn select_down_sample(&self, indices: &[usize], invert: bool) -> Result<PointCloud> {
        select_down_sample(self, indices, invert)
    }

    fn remove_radius_outliers(&self, nb_points: usize, radius: f32) -> Result<(PointCloud, Vec<usize>)> {
        remove_radius_outliers(self, nb_points, radius)
    }

    fn remove_statistical_outliers(&self, nb_neighbors: usize, std_ratio: f32) -> Result<(PointCloud, Vec<usize>)> {
        remove_statistical_outliers(self, nb_neighbors, std_ratio)
    }

    fn crop(&self, bbox: &AxisAlignedBoundingBox) -> Result<(PointCloud, Vec<usize>)> {
        let indices: Vec<usize> = (0..self.len())
            .into_par_iter()
            .filter(|&i| bbox.contains(&self.points[i]))
            .collect();
        let cropped = select_down_sample(self, &indices, false)?;
        Ok((cropped, indices))
    }

    fn remove_non_finite_points(&self, remove_nan: bool, remove_infinite: bool) -> Result<(PointCloud, Vec<usize>)> {
        let indices: Vec<usize> = (0..self.len())
            .into_par_iter()
            .filter(|&i| {
                let p = &self.points[i];
                let has_nan = p.coords.iter().any(|v| v.is_nan());
                let has_inf = p.coords.iter().any(|v| v.is_infinite());
                !(remove_nan && has_nan) && !(remove_infinite && has_inf)
            })
            .collect();
        let kept = select_down_sample(self, &indices, false)?;

        debug!(
            "removed {} non-finite points of {}",
            self.len() - kept.len(),
            self.len()
        );
        Ok((kept, indices))
    }

    fn normalize_normals(&mut self) {
        self.normals.par_iter_mut().for_each(|n| {
            if let Some(unit) = n.try_normalize(0.0) {
                *n = unit;
            }
        });
    }

    fn paint_uniform_color(&mut self, color: Color3f) {
        self.colors = vec![color; self.points.len()];
    }
}
