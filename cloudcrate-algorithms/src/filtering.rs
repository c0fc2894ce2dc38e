//! Outlier removal filters
//!
//! Both filters return the filtered cloud together with the ascending source
//! indices of the retained points, so callers can subselect any other
//! per-point data with [`select_down_sample`].

use crate::downsampling::select_down_sample;
use crate::nearest_neighbor::{search_knn, search_radius, KdTree};
use cloudcrate_core::{Error, NeighborResult, PointCloud, Result, NUM_MAX_NN};
use rayon::prelude::*;
use tracing::debug;

/// Radius outlier removal filter
///
/// Keeps the points that have more than `nb_points` neighbors within
/// `radius`, the point itself included. A point is therefore kept when at
/// least `nb_points` *other* points lie within the radius. Neighbor rows hold
/// at most `NUM_MAX_NN` entries, so `nb_points >= NUM_MAX_NN` keeps nothing.
///
/// # Arguments
/// * `cloud` - Input point cloud
/// * `nb_points` - Neighbor count a point must exceed, at least 1
/// * `radius` - Search radius for neighbor counting
///
/// # Returns
/// * `Result<(PointCloud, Vec<usize>)>` - Filtered cloud and retained source indices
///
/// # Example
/// ```rust
/// use cloudcrate_core::{PointCloud, Point3f};
/// use cloudcrate_algorithms::remove_radius_outliers;
///
/// fn main() -> cloudcrate_core::Result<()> {
///     let cloud = PointCloud::from_points(vec![
///         Point3f::new(0.0, 0.0, 0.0),
///         Point3f::new(0.1, 0.0, 0.0),
///         Point3f::new(0.0, 0.1, 0.0),
///         Point3f::new(10.0, 10.0, 10.0), // outlier
///     ]);
///
///     let (filtered, indices) = remove_radius_outliers(&cloud, 2, 0.5)?;
///     assert_eq!(indices, vec![0, 1, 2]);
///     assert_eq!(filtered.len(), 3);
///     Ok(())
/// }
/// ```
pub fn remove_radius_outliers(
    cloud: &PointCloud,
    nb_points: usize,
    radius: f32,
) -> Result<(PointCloud, Vec<usize>)> {
    validate_radius_parameters(nb_points, radius)?;
    cloud.validate()?;

    if cloud.is_empty() {
        return Ok((PointCloud::new(), Vec::new()));
    }

    let tree = KdTree::new(&cloud.points)?;
    let neighbors = search_radius(&tree, &cloud.points, radius, radius_search_capacity(nb_points))?;
    let indices = radius_inliers(&neighbors, nb_points);
    let filtered = select_down_sample(cloud, &indices, false)?;

    debug!(
        "radius outlier removal kept {} of {} points (nb_points={}, radius={})",
        filtered.len(),
        cloud.len(),
        nb_points,
        radius
    );
    Ok((filtered, indices))
}

/// Statistical outlier removal filter
///
/// For every point, computes the mean distance to its `nb_neighbors` nearest
/// neighbors (the point itself is its own nearest neighbor). Points whose
/// mean lies in `(0, mean + std_ratio * stddev)` of all means are kept,
/// where the standard deviation uses Bessel's correction.
///
/// # Arguments
/// * `cloud` - Input point cloud
/// * `nb_neighbors` - Number of nearest neighbors per point, in `1..=NUM_MAX_NN`
/// * `std_ratio` - Standard deviation multiplier for outlier detection
///
/// # Returns
/// * `Result<(PointCloud, Vec<usize>)>` - Filtered cloud and retained source indices
///
/// # Example
/// ```rust
/// use cloudcrate_core::{PointCloud, Point3f};
/// use cloudcrate_algorithms::remove_statistical_outliers;
///
/// fn main() -> cloudcrate_core::Result<()> {
///     let mut points = Vec::new();
///     for i in 0..5 {
///         for j in 0..5 {
///             points.push(Point3f::new(i as f32 * 0.1, j as f32 * 0.1, 0.0));
///         }
///     }
///     points.push(Point3f::new(10.0, 10.0, 10.0)); // outlier
///     let cloud = PointCloud::from_points(points);
///
///     let (filtered, indices) = remove_statistical_outliers(&cloud, 4, 1.0)?;
///     assert!(!indices.contains(&25));
///     assert_eq!(filtered.len(), indices.len());
///     Ok(())
/// }
/// ```
pub fn remove_statistical_outliers(
    cloud: &PointCloud,
    nb_neighbors: usize,
    std_ratio: f32,
) -> Result<(PointCloud, Vec<usize>)> {
    validate_statistical_parameters(nb_neighbors, std_ratio)?;
    cloud.validate()?;

    if cloud.is_empty() {
        return Ok((PointCloud::new(), Vec::new()));
    }

    let tree = KdTree::new(&cloud.points)?;
    let neighbors = search_knn(&tree, &cloud.points, nb_neighbors)?;
    let indices = statistical_inliers(&neighbors, std_ratio);
    let filtered = select_down_sample(cloud, &indices, false)?;

    debug!(
        "statistical outlier removal kept {} of {} points (nb_neighbors={}, std_ratio={})",
        filtered.len(),
        cloud.len(),
        nb_neighbors,
        std_ratio
    );
    Ok((filtered, indices))
}

pub fn validate_radius_parameters(nb_points: usize, radius: f32) -> Result<()> {
    if nb_points == 0 {
        return Err(Error::InvalidParameter(
            "nb_points must be at least 1".to_string(),
        ));
    }
    if radius.is_nan() || radius <= 0.0 {
        return Err(Error::InvalidParameter(format!(
            "radius must be positive, got {}",
            radius
        )));
    }
    Ok(())
}

/// Row capacity for the radius filter's search: `nb_points + 1` slots decide
/// `count > nb_points`, capped at `NUM_MAX_NN`
pub fn radius_search_capacity(nb_points: usize) -> usize {
    nb_points.saturating_add(1).min(NUM_MAX_NN)
}

pub fn validate_statistical_parameters(nb_neighbors: usize, std_ratio: f32) -> Result<()> {
    if nb_neighbors == 0 || nb_neighbors > NUM_MAX_NN {
        return Err(Error::InvalidParameter(format!(
            "nb_neighbors must be in 1..={}, got {}",
            NUM_MAX_NN, nb_neighbors
        )));
    }
    if std_ratio.is_nan() || std_ratio <= 0.0 {
        return Err(Error::InvalidParameter(format!(
            "std_ratio must be positive, got {}",
            std_ratio
        )));
    }
    Ok(())
}

/// Queries whose neighbor count strictly exceeds `nb_points`
pub fn radius_inliers(neighbors: &NeighborResult, nb_points: usize) -> Vec<usize> {
    (0..neighbors.num_queries())
        .into_par_iter()
        .filter(|&q| neighbors.count(q) > nb_points)
        .collect()
}

/// Mean distance over the found neighbors of every query; `None` for a
/// query without neighbors
pub fn mean_neighbor_distances(neighbors: &NeighborResult) -> Vec<Option<f32>> {
    (0..neighbors.num_queries())
        .into_par_iter()
        .map(|q| {
            let (sum, count) = neighbors
                .neighbors(q)
                .fold((0.0f32, 0usize), |(sum, count), n| (sum + n.distance, count + 1));
            (count > 0).then(|| sum / count as f32)
        })
        .collect()
}

/// Queries whose mean neighbor distance lies in
/// `(0, mean + std_ratio * stddev)`
pub fn statistical_inliers(neighbors: &NeighborResult, std_ratio: f32) -> Vec<usize> {
    let means = mean_neighbor_distances(neighbors);

    let valid: Vec<f64> = means.iter().flatten().map(|&d| d as f64).collect();
    if valid.len() < 2 {
        debug!(
            "statistical outlier removal needs two points with neighbors, found {}",
            valid.len()
        );
        return Vec::new();
    }

    let n = valid.len() as f64;
    let mean = valid.iter().sum::<f64>() / n;
    let variance = valid.iter().map(|d| (d - mean).powi(2)).sum::<f64>() / (n - 1.0);
    let threshold = mean + std_ratio as f64 * variance.sqrt();
    debug!("mean distance {:.6}, threshold {:.6}", mean, threshold);

    (0..means.len())
        .into_par_iter()
        .filter(|&q| matches!(means[q], Some(d) if d > 0.0 && (d as f64) < threshold))
        .collect()
}
