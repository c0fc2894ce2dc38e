//! Integration tests for cloudcrate-algorithms
//!
//! These tests exercise downsampling and outlier removal end to end through
//! the public API and check the properties callers rely on.

use approx::assert_relative_eq;
use cloudcrate_algorithms::*;
use cloudcrate_core::{Color3f, Point3f, PointCloud, Vector3f};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Points jittered around every integer position of an n x n x n lattice
fn create_lattice_clusters(n: usize, per_cluster: usize, seed: u64) -> PointCloud {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut points = Vec::new();
    for x in 0..n {
        for y in 0..n {
            for z in 0..n {
                for _ in 0..per_cluster {
                    points.push(Point3f::new(
                        x as f32 + rng.gen_range(-0.1..0.1),
                        y as f32 + rng.gen_range(-0.1..0.1),
                        z as f32 + rng.gen_range(-0.1..0.1),
                    ));
                }
            }
        }
    }
    PointCloud::from_points(points)
}

fn create_grid(n: usize, spacing: f32) -> PointCloud {
    let mut points = Vec::with_capacity(n * n * n);
    for x in 0..n {
        for y in 0..n {
            for z in 0..n {
                points.push(Point3f::new(x as f32, y as f32, z as f32) * spacing);
            }
        }
    }
    PointCloud::from_points(points)
}

fn random_unit_normals(count: usize, seed: u64) -> Vec<Vector3f> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|_| {
            Vector3f::new(
                rng.gen_range(-1.0..1.0),
                rng.gen_range(-1.0..1.0),
                rng.gen_range(-1.0..1.0),
            )
            .try_normalize(1e-3)
            .unwrap_or_else(Vector3f::z)
        })
        .collect()
}

#[test]
fn test_voxel_down_sample_is_idempotent() {
    let cloud = create_lattice_clusters(4, 8, 7);

    let once = voxel_down_sample(&cloud, 1.0).unwrap();
    assert_eq!(once.len(), 64);

    let twice = voxel_down_sample(&once, 1.0).unwrap();
    assert_eq!(twice.len(), once.len());
    assert_eq!(twice.points, once.points);
}

#[test]
fn test_cardinality_never_grows() {
    let cloud = create_lattice_clusters(3, 5, 11);

    for voxel_size in [0.05, 0.5, 1.0, 3.0] {
        let downsampled = voxel_down_sample(&cloud, voxel_size).unwrap();
        assert!(downsampled.len() <= cloud.len());
        assert!(!downsampled.is_empty());
    }

    let (radius_filtered, _) = remove_radius_outliers(&cloud, 4, 0.3).unwrap();
    assert!(radius_filtered.len() <= cloud.len());

    let (stat_filtered, _) = remove_statistical_outliers(&cloud, 10, 1.0).unwrap();
    assert!(stat_filtered.len() <= cloud.len());

    let indices = vec![3, 1, 4, 1, 5];
    let selected = select_down_sample(&cloud, &indices, false).unwrap();
    assert_eq!(selected.len(), indices.len());
}

#[test]
fn test_coincident_points_collapse_to_centroid() {
    let k = 7;
    let mut points = vec![Point3f::new(0.3, 0.3, 0.3); k];
    points.push(Point3f::new(10.0, 10.0, 10.0));
    let cloud = PointCloud::from_points(points);

    let downsampled = voxel_down_sample(&cloud, 1.0).unwrap();
    assert_eq!(downsampled.len(), 2);

    let centroid = downsampled
        .points
        .iter()
        .find(|p| p.x < 5.0)
        .copied()
        .unwrap();
    assert_relative_eq!(centroid, Point3f::new(0.3, 0.3, 0.3), epsilon = 1e-6);
}

#[test]
fn test_down_sampled_normals_are_unit_length() {
    let cloud = create_lattice_clusters(3, 6, 23);
    let normals = random_unit_normals(cloud.len(), 5);
    let cloud = cloud.with_normals(normals).unwrap();

    let downsampled = voxel_down_sample(&cloud, 1.0).unwrap();
    assert!(downsampled.has_normals());
    for normal in &downsampled.normals {
        assert_relative_eq!(normal.norm(), 1.0, epsilon = 1e-5);
    }
}

#[test]
fn test_down_sampled_colors_are_averaged() {
    let cloud = PointCloud::from_points(vec![
        Point3f::new(0.1, 0.1, 0.1),
        Point3f::new(0.2, 0.2, 0.2),
        Point3f::new(5.0, 5.0, 5.0),
    ])
    .with_colors(vec![
        Color3f::new(1.0, 0.0, 0.0),
        Color3f::new(0.0, 0.0, 1.0),
        Color3f::new(0.0, 1.0, 0.0),
    ])
    .unwrap();

    let downsampled = voxel_down_sample(&cloud, 1.0).unwrap();
    assert_eq!(downsampled.len(), 2);
    assert!(!downsampled.has_normals());
    assert_relative_eq!(downsampled.colors[0], Color3f::new(0.5, 0.0, 0.5));
    assert_relative_eq!(downsampled.colors[1], Color3f::new(0.0, 1.0, 0.0));
}

#[test]
fn test_radius_filter_boundary() {
    // Center point has exactly three neighbors at distance 1.
    let cloud = PointCloud::from_points(vec![
        Point3f::new(0.0, 0.0, 0.0),
        Point3f::new(1.0, 0.0, 0.0),
        Point3f::new(0.0, 1.0, 0.0),
        Point3f::new(0.0, 0.0, 1.0),
    ]);

    let (_, kept) = remove_radius_outliers(&cloud, 3, 1.0).unwrap();
    assert_eq!(kept, vec![0]);

    let (_, kept) = remove_radius_outliers(&cloud, 4, 1.0).unwrap();
    assert!(kept.is_empty());
}

#[test]
fn test_statistical_filter_on_uniform_grid() {
    let cloud = create_grid(6, 0.2);

    let (all, _) = remove_statistical_outliers(&cloud, 8, 100.0).unwrap();
    assert_eq!(all.len(), cloud.len());

    let (some, indices) = remove_statistical_outliers(&cloud, 8, 0.01).unwrap();
    assert!(some.len() < cloud.len());
    assert!(!some.is_empty());
    assert_eq!(some.len(), indices.len());
}

#[test]
fn test_statistical_filter_needs_two_points() {
    let cloud = PointCloud::from_points(vec![Point3f::new(1.0, 2.0, 3.0)]);
    let (filtered, indices) = remove_statistical_outliers(&cloud, 3, 2.0).unwrap();
    assert!(filtered.is_empty());
    assert!(indices.is_empty());
}

#[test]
fn test_empty_inputs() {
    let empty = PointCloud::new();

    assert!(voxel_down_sample(&empty, 0.5).unwrap().is_empty());
    assert!(uniform_down_sample(&empty, 3).unwrap().is_empty());

    let (filtered, indices) = remove_radius_outliers(&empty, 2, 0.5).unwrap();
    assert!(filtered.is_empty() && indices.is_empty());

    let (filtered, indices) = remove_statistical_outliers(&empty, 5, 1.0).unwrap();
    assert!(filtered.is_empty() && indices.is_empty());
}

#[test]
fn test_invalid_parameters_are_rejected() {
    let cloud = create_grid(3, 1.0);

    // Non-positive voxel sizes are a logged no-op.
    assert!(voxel_down_sample(&cloud, 0.0).unwrap().is_empty());
    assert!(voxel_down_sample(&cloud, -1.0).unwrap().is_empty());
    assert!(remove_radius_outliers(&cloud, 0, 1.0).is_err());
    assert!(remove_radius_outliers(&cloud, 2, 0.0).is_err());
    assert!(remove_statistical_outliers(&cloud, 0, 1.0).is_err());
    assert!(remove_statistical_outliers(&cloud, 4, -1.0).is_err());
}

#[test]
fn test_retained_indices_select_attributes() {
    let mut cloud = create_lattice_clusters(2, 10, 3);
    cloud.points.push(Point3f::new(50.0, 50.0, 50.0));
    let colors: Vec<Color3f> = (0..cloud.len())
        .map(|i| Color3f::new(i as f32 / cloud.len() as f32, 0.0, 0.0))
        .collect();
    let cloud = cloud.with_colors(colors).unwrap();

    let (filtered, indices) = remove_radius_outliers(&cloud, 3, 0.5).unwrap();
    assert!(!indices.contains(&(cloud.len() - 1)));
    assert!(indices.windows(2).all(|w| w[0] < w[1]));

    let reselected = select_down_sample(&cloud, &indices, false).unwrap();
    assert_eq!(reselected.points, filtered.points);
    assert_eq!(reselected.colors, filtered.colors);

    let removed = select_down_sample(&cloud, &indices, true).unwrap();
    assert_eq!(removed.len() + filtered.len(), cloud.len());
}

#[test]
fn test_pipeline_through_extension_trait() {
    let mut cloud = create_lattice_clusters(3, 4, 17);
    cloud.points.push(Point3f::new(f32::NAN, 0.0, 0.0));
    cloud.points.push(Point3f::new(40.0, 40.0, 40.0));

    let (finite, _) = cloud.remove_non_finite_points(true, true).unwrap();
    assert_eq!(finite.len(), cloud.len() - 1);

    let (clean, _) = finite.remove_statistical_outliers(4, 2.0).unwrap();
    assert!(clean.points.iter().all(|p| p.x < 10.0));

    let mut downsampled = clean.voxel_down_sample(1.0).unwrap();
    assert_eq!(downsampled.len(), 27);

    downsampled.paint_uniform_color(Color3f::new(0.2, 0.4, 0.6));
    assert_eq!(downsampled.colors.len(), downsampled.len());
}
