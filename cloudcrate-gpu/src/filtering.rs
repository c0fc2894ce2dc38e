//! GPU-accelerated outlier removal
//!
//! Neighbor rows come from the GPU search; thresholding and selection share
//! the CPU helpers so both paths keep exactly the same points.

use crate::GpuContext;
use cloudcrate_algorithms::{
    radius_inliers, radius_search_capacity, select_down_sample, statistical_inliers,
    validate_radius_parameters, validate_statistical_parameters,
};
use cloudcrate_core::{PointCloud, Result};
use tracing::debug;

/// GPU-accelerated radius outlier removal
///
/// Keeps the points with more than `nb_points` neighbors within `radius`,
/// the point itself included, and returns them with their ascending source
/// indices. Rows hold at most `NUM_MAX_NN` neighbors, so `nb_points >=
/// NUM_MAX_NN` keeps nothing.
pub async fn gpu_remove_radius_outliers(
    gpu_context: &GpuContext,
    cloud: &PointCloud,
    nb_points: usize,
    radius: f32,
) -> Result<(PointCloud, Vec<usize>)> {
    validate_radius_parameters(nb_points, radius)?;
    cloud.validate()?;

    if cloud.is_empty() {
        return Ok((PointCloud::new(), Vec::new()));
    }

    let neighbors = gpu_context
        .search_radius(&cloud.points, &cloud.points, radius, radius_search_capacity(nb_points))
        .await?;
    let indices = radius_inliers(&neighbors, nb_points);
    let filtered = select_down_sample(cloud, &indices, false)?;

    debug!(
        "GPU radius outlier removal kept {} of {} points",
        filtered.len(),
        cloud.len()
    );
    Ok((filtered, indices))
}

/// GPU-accelerated statistical outlier removal
///
/// Keeps the points whose mean distance to their `nb_neighbors` nearest
/// neighbors lies in `(0, mean + std_ratio * stddev)`.
pub async fn gpu_remove_statistical_outliers(
    gpu_context: &GpuContext,
    cloud: &PointCloud,
    nb_neighbors: usize,
    std_ratio: f32,
) -> Result<(PointCloud, Vec<usize>)> {
    validate_statistical_parameters(nb_neighbors, std_ratio)?;
    cloud.validate()?;

    if cloud.is_empty() {
        return Ok((PointCloud::new(), Vec::new()));
    }

    let neighbors = gpu_context
        .search_knn(&cloud.points, &cloud.points, nb_neighbors)
        .await?;
    let indices = statistical_inliers(&neighbors, std_ratio);
    let filtered = select_down_sample(cloud, &indices, false)?;

    debug!(
        "GPU statistical outlier removal kept {} of {} points",
        filtered.len(),
        cloud.len()
    );
    Ok((filtered, indices))
}
