//! Downsampling: voxel grid averaging, uniform striding and index selection

use crate::reduction::KeyReduction;
use cloudcrate_core::{Bounded, Error, Point3f, PointCloud, Result, VoxelGrid, VoxelKey};
use rayon::prelude::*;
use std::borrow::Cow;
use tracing::{debug, warn};

/// Voxel grid downsampling
///
/// Buckets the points into cubic voxels of edge `voxel_size` and replaces the
/// points of every occupied voxel by their mean. Normals and colors, when
/// present, are averaged with the same grouping; averaged normals are
/// rescaled to unit length unless they cancel to zero. Points with a NaN or
/// infinite coordinate are left out.
///
/// A non-positive `voxel_size`, or one so small that the voxel indices would
/// overflow, is logged and yields an empty cloud.
///
/// # Example
/// ```rust
/// use cloudcrate_core::{PointCloud, Point3f};
/// use cloudcrate_algorithms::voxel_down_sample;
///
/// fn main() -> cloudcrate_core::Result<()> {
///     let cloud = PointCloud::from_points(vec![
///         Point3f::new(0.0, 0.0, 0.0),
///         Point3f::new(0.1, 0.0, 0.0),
///         Point3f::new(5.0, 5.0, 5.0),
///     ]);
///
///     let downsampled = voxel_down_sample(&cloud, 1.0)?;
///     assert_eq!(downsampled.len(), 2);
///     Ok(())
/// }
/// ```
pub fn voxel_down_sample(cloud: &PointCloud, voxel_size: f32) -> Result<PointCloud> {
    cloud.validate()?;
    let finite = finite_points(cloud)?;

    let grid = match VoxelGrid::covering(&finite.bounding_box(), voxel_size) {
        Ok(grid) => grid,
        Err(e) => {
            warn!("voxel downsampling skipped: {}", e);
            return Ok(PointCloud::new());
        }
    };

    if finite.is_empty() {
        return Ok(PointCloud::new());
    }

    let keys: Vec<VoxelKey> = finite.points.par_iter().map(|p| grid.key_of(p)).collect();
    let downsampled = down_sample_by_keys(&finite, &keys)?;

    debug!(
        "voxel downsampled {} points to {} (voxel_size={})",
        cloud.len(),
        downsampled.len(),
        voxel_size
    );
    Ok(downsampled)
}

/// `cloud` without the points that have a NaN or infinite coordinate.
///
/// Borrows `cloud` when every point is finite.
pub fn finite_points(cloud: &PointCloud) -> Result<Cow<'_, PointCloud>> {
    let is_finite = |p: &Point3f| p.iter().all(|v| v.is_finite());
    if cloud.points.par_iter().all(is_finite) {
        return Ok(Cow::Borrowed(cloud));
    }

    let indices: Vec<usize> = (0..cloud.len())
        .into_par_iter()
        .filter(|&i| is_finite(&cloud.points[i]))
        .collect();
    debug!("skipping {} non-finite points", cloud.len() - indices.len());
    Ok(Cow::Owned(select_down_sample(cloud, &indices, false)?))
}

/// Average every attribute of `cloud` over the points sharing a key.
///
/// `keys[i]` is the voxel of point `i`. Output points are in ascending key
/// order. Mean normals are rescaled to unit length, except where the normals
/// of a voxel cancel out exactly: that voxel keeps a zero normal.
pub fn down_sample_by_keys(cloud: &PointCloud, keys: &[VoxelKey]) -> Result<PointCloud> {
    if keys.len() != cloud.len() {
        return Err(Error::InvalidData(format!(
            "{} voxel keys for {} points",
            keys.len(),
            cloud.len()
        )));
    }

    let reduction = KeyReduction::new(keys);

    let points = reduction.mean(&cloud.points)?;
    let normals = if cloud.has_normals() {
        let mut normals = reduction.mean(&cloud.normals)?;
        normals.par_iter_mut().for_each(|n| {
            if let Some(unit) = n.try_normalize(0.0) {
                *n = unit;
            }
        });
        normals
    } else {
        Vec::new()
    };
    let colors = if cloud.has_colors() {
        reduction.mean(&cloud.colors)?
    } else {
        Vec::new()
    };

    Ok(PointCloud {
        points,
        normals,
        colors,
    })
}

/// Keep every `every_k_points`-th point, starting with the first
pub fn uniform_down_sample(cloud: &PointCloud, every_k_points: usize) -> Result<PointCloud> {
    if every_k_points == 0 {
        return Err(Error::InvalidParameter(
            "every_k_points must be greater than 0".to_string(),
        ));
    }

    let indices: Vec<usize> = (0..cloud.len()).step_by(every_k_points).collect();
    let downsampled = select_down_sample(cloud, &indices, false)?;

    debug!(
        "uniform downsampled {} points to {} (every_k_points={})",
        cloud.len(),
        downsampled.len(),
        every_k_points
    );
    Ok(downsampled)
}

/// Gather the points at `indices`, with their normals and colors.
///
/// With `invert` set, gathers every point *not* listed instead, in ascending
/// index order.
pub fn select_down_sample(cloud: &PointCloud, indices: &[usize], invert: bool) -> Result<PointCloud> {
    cloud.validate()?;

    if let Some(&bad) = indices.iter().find(|&&i| i >= cloud.len()) {
        return Err(Error::InvalidParameter(format!(
            "index {} out of range for a cloud of {} points",
            bad,
            cloud.len()
        )));
    }

    if invert {
        let mut keep = vec![true; cloud.len()];
        for &i in indices {
            keep[i] = false;
        }
        let complement: Vec<usize> = (0..cloud.len()).filter(|&i| keep[i]).collect();
        return Ok(gather(cloud, &complement));
    }

    Ok(gather(cloud, indices))
}

fn gather(cloud: &PointCloud, indices: &[usize]) -> PointCloud {
    let points = indices.par_iter().map(|&i| cloud.points[i]).collect();
    let normals = if cloud.has_normals() {
        indices.par_iter().map(|&i| cloud.normals[i]).collect()
    } else {
        Vec::new()
    };
    let colors = if cloud.has_colors() {
        indices.par_iter().map(|&i| cloud.colors[i]).collect()
    } else {
        Vec::new()
    };

    PointCloud {
        points,
        normals,
        colors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use cloudcrate_core::{Color3f, Point3f, Vector3f};

    #[test]
    fn test_voxel_down_sample_empty_cloud() {
        let result = voxel_down_sample(&PointCloud::new(), 0.1).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn test_voxel_down_sample_collapses_to_centroid() {
        let mut points = vec![Point3f::new(0.2, 0.3, 0.4); 5];
        points.push(Point3f::new(10.0, 10.0, 10.0));
        let cloud = PointCloud::from_points(points);

        let result = voxel_down_sample(&cloud, 1.0).unwrap();
        assert_eq!(result.len(), 2);
        assert_relative_eq!(result.points[0], Point3f::new(0.2, 0.3, 0.4), epsilon = 1e-6);
        assert_relative_eq!(result.points[1], Point3f::new(10.0, 10.0, 10.0), epsilon = 1e-6);
    }

    #[test]
    fn test_voxel_down_sample_averages_mixed_points() {
        let cloud = PointCloud::from_points(vec![
            Point3f::new(0.0, 0.0, 0.0),
            Point3f::new(0.2, 0.0, 0.0),
            Point3f::new(0.0, 0.4, 0.0),
            Point3f::new(0.2, 0.2, 0.0),
        ]);

        let result = voxel_down_sample(&cloud, 1.0).unwrap();
        assert_eq!(result.len(), 1);
        assert_relative_eq!(result.points[0], Point3f::new(0.1, 0.15, 0.0), epsilon = 1e-6);
    }

    #[test]
    fn test_voxel_down_sample_renormalizes_normals() {
        let cloud = PointCloud::from_points(vec![
            Point3f::new(0.0, 0.0, 0.0),
            Point3f::new(0.1, 0.0, 0.0),
            Point3f::new(3.0, 0.0, 0.0),
        ])
        .with_normals(vec![
            Vector3f::x(),
            Vector3f::y(),
            Vector3f::new(0.0, 0.6, 0.8),
        ])
        .unwrap();

        let result = voxel_down_sample(&cloud, 1.0).unwrap();
        assert_eq!(result.len(), 2);
        assert!(result.has_normals());
        for n in &result.normals {
            assert_relative_eq!(n.norm(), 1.0, epsilon = 1e-5);
        }
        let s = std::f32::consts::FRAC_1_SQRT_2;
        assert_relative_eq!(result.normals[0], Vector3f::new(s, s, 0.0), epsilon = 1e-6);
    }

    #[test]
    fn test_voxel_down_sample_opposite_normals_stay_zero() {
        let cloud = PointCloud::from_points(vec![
            Point3f::new(0.0, 0.0, 0.0),
            Point3f::new(0.1, 0.0, 0.0),
            Point3f::new(3.0, 0.0, 0.0),
        ])
        .with_normals(vec![Vector3f::z(), -Vector3f::z(), Vector3f::new(0.0, 3.0, 4.0)])
        .unwrap();

        let result = voxel_down_sample(&cloud, 1.0).unwrap();
        assert_eq!(result.normals[0], Vector3f::zeros());
        assert_relative_eq!(result.normals[1], Vector3f::new(0.0, 0.6, 0.8));
    }

    #[test]
    fn test_voxel_down_sample_skips_non_finite_points() {
        let cloud = PointCloud::from_points(vec![
            Point3f::new(f32::NAN, 0.0, 0.0),
            Point3f::new(0.0, 0.0, 0.0),
            Point3f::new(0.1, 0.0, 0.0),
            Point3f::new(5.0, 5.0, 5.0),
            Point3f::new(0.0, f32::INFINITY, 0.0),
        ])
        .with_colors(vec![Color3f::new(1.0, 1.0, 1.0); 5])
        .unwrap();

        let result = voxel_down_sample(&cloud, 1.0).unwrap();
        assert_eq!(result.len(), 2);
        assert_relative_eq!(result.points[0], Point3f::new(0.05, 0.0, 0.0), epsilon = 1e-6);
        assert_eq!(result.points[1], Point3f::new(5.0, 5.0, 5.0));
        assert_eq!(result.colors.len(), 2);

        let only_nan = PointCloud::from_points(vec![Point3f::new(f32::NAN, 1.0, 1.0)]);
        assert!(voxel_down_sample(&only_nan, 1.0).unwrap().is_empty());
    }

    #[test]
    fn test_finite_points_borrows_clean_cloud() {
        let cloud = PointCloud::from_points(vec![Point3f::origin()]);
        assert!(matches!(finite_points(&cloud).unwrap(), Cow::Borrowed(_)));
    }

    #[test]
    fn test_voxel_down_sample_averages_colors() {
        let cloud = PointCloud::from_points(vec![
            Point3f::new(0.0, 0.0, 0.0),
            Point3f::new(0.1, 0.1, 0.1),
        ])
        .with_colors(vec![Color3f::new(1.0, 0.0, 0.0), Color3f::new(0.0, 0.0, 1.0)])
        .unwrap();

        let result = voxel_down_sample(&cloud, 1.0).unwrap();
        assert_eq!(result.len(), 1);
        assert!(!result.has_normals());
        assert_relative_eq!(result.colors[0], Color3f::new(0.5, 0.0, 0.5));
    }

    #[test]
    fn test_voxel_down_sample_invalid_voxel_size_is_empty() {
        let cloud = PointCloud::from_points(vec![Point3f::new(0.0, 0.0, 0.0)]);
        assert!(voxel_down_sample(&cloud, 0.0).unwrap().is_empty());
        assert!(voxel_down_sample(&cloud, -1.0).unwrap().is_empty());
    }

    #[test]
    fn test_voxel_down_sample_key_overflow_is_empty() {
        let cloud = PointCloud::from_points(vec![
            Point3f::new(0.0, 0.0, 0.0),
            Point3f::new(1.0e6, 0.0, 0.0),
        ]);
        assert!(voxel_down_sample(&cloud, 1.0e-5).unwrap().is_empty());
    }

    #[test]
    fn test_voxel_down_sample_rejects_mismatched_attributes() {
        let mut cloud = PointCloud::from_points(vec![Point3f::origin(), Point3f::new(1.0, 0.0, 0.0)]);
        cloud.normals = vec![Vector3f::z()];
        assert!(voxel_down_sample(&cloud, 0.5).is_err());
    }

    #[test]
    fn test_down_sample_by_keys_requires_one_key_per_point() {
        let cloud = PointCloud::from_points(vec![Point3f::origin(), Point3f::new(1.0, 0.0, 0.0)]);
        assert!(down_sample_by_keys(&cloud, &[VoxelKey::default()]).is_err());
    }

    #[test]
    fn test_uniform_down_sample() {
        let points: Vec<Point3f> = (0..10).map(|i| Point3f::new(i as f32, 0.0, 0.0)).collect();
        let colors: Vec<Color3f> = (0..10).map(|i| Color3f::new(i as f32 / 10.0, 0.0, 0.0)).collect();
        let cloud = PointCloud::from_points(points).with_colors(colors).unwrap();

        let result = uniform_down_sample(&cloud, 3).unwrap();
        assert_eq!(result.len(), 4);
        assert_eq!(result.points[1], Point3f::new(3.0, 0.0, 0.0));
        assert!(result.has_colors());
        assert!(result.normals.is_empty());
        assert_relative_eq!(result.colors[3], Color3f::new(0.9, 0.0, 0.0));
    }

    #[test]
    fn test_uniform_down_sample_invalid_k() {
        let cloud = PointCloud::from_points(vec![Point3f::origin()]);
        assert!(uniform_down_sample(&cloud, 0).is_err());
        assert!(uniform_down_sample(&PointCloud::new(), 2).unwrap().is_empty());
    }

    #[test]
    fn test_select_down_sample() {
        let cloud = PointCloud::from_points(vec![
            Point3f::new(0.0, 0.0, 0.0),
            Point3f::new(1.0, 0.0, 0.0),
            Point3f::new(2.0, 0.0, 0.0),
            Point3f::new(3.0, 0.0, 0.0),
        ])
        .with_normals(vec![Vector3f::x(), Vector3f::y(), Vector3f::z(), Vector3f::x()])
        .unwrap();

        let selected = select_down_sample(&cloud, &[3, 1], false).unwrap();
        assert_eq!(selected.len(), 2);
        assert_eq!(selected.points[0], Point3f::new(3.0, 0.0, 0.0));
        assert_eq!(selected.normals[1], Vector3f::y());

        let inverted = select_down_sample(&cloud, &[3, 1], true).unwrap();
        assert_eq!(
            inverted.points,
            vec![Point3f::new(0.0, 0.0, 0.0), Point3f::new(2.0, 0.0, 0.0)]
        );
        assert_eq!(inverted.normals, vec![Vector3f::x(), Vector3f::z()]);
    }

    #[test]
    fn test_select_down_sample_out_of_range() {
        let cloud = PointCloud::from_points(vec![Point3f::origin()]);
        assert!(select_down_sample(&cloud, &[1], false).is_err());
        assert!(select_down_sample(&cloud, &[], false).unwrap().is_empty());
    }
}
