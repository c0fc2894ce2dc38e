//! Axis-aligned bounding boxes

use crate::Point3f;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// An axis-aligned box given by its minimum and maximum corners
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisAlignedBoundingBox {
    pub min_bound: Point3f,
    pub max_bound: Point3f,
}

impl AxisAlignedBoundingBox {
    pub fn new(min_bound: Point3f, max_bound: Point3f) -> Self {
        Self { min_bound, max_bound }
    }

    /// Tightest box around the finite `points`; the degenerate box at the
    /// origin when there are none
    pub fn from_points(points: &[Point3f]) -> Self {
        let mut finite = points.iter().filter(|p| p.iter().all(|v| v.is_finite()));
        let Some(first) = finite.next() else {
            return Self::new(Point3f::origin(), Point3f::origin());
        };

        let (min, max) = finite.fold((*first, *first), |(min, max), p| (min.inf(p), max.sup(p)));
        Self::new(min, max)
    }

    pub fn extent(&self) -> Vector3<f32> {
        self.max_bound - self.min_bound
    }

    pub fn center(&self) -> Point3f {
        nalgebra::center(&self.min_bound, &self.max_bound)
    }

    /// Whether `point` lies inside the box, faces included
    pub fn contains(&self, point: &Point3f) -> bool {
        (0..3).all(|i| point[i] >= self.min_bound[i] && point[i] <= self.max_bound[i])
    }
}
