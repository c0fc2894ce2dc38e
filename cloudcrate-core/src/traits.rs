//! Core traits for cloudcrate

use crate::{AxisAlignedBoundingBox, Neighbor, Point3f, PointCloud};

/// Trait for nearest neighbor search functionality
pub trait NearestNeighborSearch {
    /// Find the `k` nearest neighbors of `query`, ordered by `(distance, index)`
    fn search_knn(&self, query: &Point3f, k: usize) -> Vec<Neighbor>;

    /// Find the neighbors of `query` within `radius`, keeping at most the
    /// `max_nn` nearest, ordered by `(distance, index)`
    fn search_radius(&self, query: &Point3f, radius: f32, max_nn: usize) -> Vec<Neighbor>;

    /// Number of points in the indexed set
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Trait for objects with an axis-aligned extent
pub trait Bounded {
    /// Get the bounding box of the object
    fn bounding_box(&self) -> AxisAlignedBoundingBox;

    fn min_bound(&self) -> Point3f {
        self.bounding_box().min_bound
    }

    fn max_bound(&self) -> Point3f {
        self.bounding_box().max_bound
    }

    /// Get the center point of the object
    fn center(&self) -> Point3f {
        self.bounding_box().center()
    }
}

impl Bounded for PointCloud {
    fn bounding_box(&self) -> AxisAlignedBoundingBox {
        AxisAlignedBoundingBox::from_points(&self.points)
    }
}
