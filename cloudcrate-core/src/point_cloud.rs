//! Point cloud data structures and functionality

use crate::point::*;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::ops::Index;

/// A point cloud with optional per-point normals and colors.
///
/// `normals` and `colors` are either empty (attribute absent) or exactly as
/// long as `points`, with index `i` of every array describing the same point.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PointCloud {
    pub points: Vec<Point3f>,
    pub normals: Vec<Vector3f>,
    pub colors: Vec<Color3f>,
}

impl PointCloud {
    /// Create a new empty point cloud
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new point cloud with specified capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            points: Vec::with_capacity(capacity),
            normals: Vec::new(),
            colors: Vec::new(),
        }
    }

    /// Create a point cloud from a vector of points
    pub fn from_points(points: Vec<Point3f>) -> Self {
        Self {
            points,
            normals: Vec::new(),
            colors: Vec::new(),
        }
    }

    /// Attach normals, one per point
    pub fn with_normals(mut self, normals: Vec<Vector3f>) -> Result<Self> {
        self.normals = normals;
        self.validate()?;
        Ok(self)
    }

    /// Attach colors, one per point
    pub fn with_colors(mut self, colors: Vec<Color3f>) -> Result<Self> {
        self.colors = colors;
        self.validate()?;
        Ok(self)
    }

    /// Get the number of points in the cloud
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Check if the point cloud is empty
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn has_normals(&self) -> bool {
        !self.points.is_empty() && self.normals.len() == self.points.len()
    }

    pub fn has_colors(&self) -> bool {
        !self.points.is_empty() && self.colors.len() == self.points.len()
    }

    /// Check that every present attribute array matches the point count
    pub fn validate(&self) -> Result<()> {
        if !self.normals.is_empty() && self.normals.len() != self.points.len() {
            return Err(Error::InvalidData(format!(
                "cloud has {} points but {} normals",
                self.points.len(),
                self.normals.len()
            )));
        }
        if !self.colors.is_empty() && self.colors.len() != self.points.len() {
            return Err(Error::InvalidData(format!(
                "cloud has {} points but {} colors",
                self.points.len(),
                self.colors.len()
            )));
        }
        Ok(())
    }

    /// Get an iterator over the points
    pub fn iter(&self) -> std::slice::Iter<'_, Point3f> {
        self.points.iter()
    }

    /// Clear all points and attributes from the cloud
    pub fn clear(&mut self) {
        self.points.clear();
        self.normals.clear();
        self.colors.clear();
    }
}

impl Index<usize> for PointCloud {
    type Output = Point3f;

    fn index(&self, index: usize) -> &Self::Output {
        &self.points[index]
    }
}

impl<'a> IntoIterator for &'a PointCloud {
    type Item = &'a Point3f;
    type IntoIter = std::slice::Iter<'a, Point3f>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}

impl FromIterator<Point3f> for PointCloud {
    fn from_iter<I: IntoIterator<Item = Point3f>>(iter: I) -> Self {
        Self::from_points(Vec::from_iter(iter))
    }
}
