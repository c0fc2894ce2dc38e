//! Nearest neighbor search implementations

use cloudcrate_core::{
    Error, NearestNeighborSearch, Neighbor, NeighborResult, Point3f, Result, NUM_MAX_NN,
};
use kiddo::float::distance::SquaredEuclidean;
use kiddo::immutable::float::kdtree::ImmutableKdTree;
use rayon::prelude::*;
use std::cmp::Ordering;
use std::num::NonZero;

/// Candidate neighbor ordered by `(squared distance, index)`
#[derive(Debug, Clone, Copy)]
struct Candidate {
    dist_sq: f32,
    index: usize,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.dist_sq
            .total_cmp(&other.dist_sq)
            .then(self.index.cmp(&other.index))
    }
}

/// KD-Tree over a fixed point set.
///
/// Built on kiddo's `ImmutableKdTree`, which stays balanced however many
/// points share a coordinate. Only finite points are indexed. Results match
/// [`BruteForceSearch`] including the `(distance, index)` tie order.
#[derive(Debug, Clone)]
pub struct KdTree {
    tree: Option<ImmutableKdTree<f32, u32, 3, 32>>,
    points: Vec<Point3f>,
    /// Source index of every tree item
    indexed: Vec<usize>,
}

impl KdTree {
    pub fn new(points: &[Point3f]) -> Result<Self> {
        let indexed: Vec<usize> = (0..points.len())
            .filter(|&i| is_finite(&points[i]))
            .collect();
        if indexed.len() > u32::MAX as usize {
            return Err(Error::InvalidData(format!(
                "{} points exceed the k-d tree capacity",
                indexed.len()
            )));
        }

        let coords: Vec<[f32; 3]> = indexed
            .iter()
            .map(|&i| [points[i].x, points[i].y, points[i].z])
            .collect();
        let tree = (!coords.is_empty()).then(|| ImmutableKdTree::new_from_slice(&coords));

        Ok(Self {
            tree,
            points: points.to_vec(),
            indexed,
        })
    }

    pub fn points(&self) -> &[Point3f] {
        &self.points
    }

    /// Exact candidates for tree items, sorted by `(distance, index)`
    fn rank<I>(&self, query: &Point3f, items: I, radius_sq: f32) -> Vec<Candidate>
    where
        I: IntoIterator<Item = u32>,
    {
        let mut candidates: Vec<Candidate> = items
            .into_iter()
            .map(|item| {
                let index = self.indexed[item as usize];
                Candidate {
                    dist_sq: (self.points[index] - query).norm_squared(),
                    index,
                }
            })
            .filter(|c| c.dist_sq.is_finite() && c.dist_sq <= radius_sq)
            .collect();
        candidates.sort_unstable();
        candidates
    }

    /// Every indexed point with squared distance at most `radius_sq`
    fn within(&self, tree: &ImmutableKdTree<f32, u32, 3, 32>, query: &Point3f, radius_sq: f32) -> Vec<Candidate> {
        // kiddo's bound is strict, so widen it and filter exactly afterwards.
        let bound = radius_sq + f32::EPSILON * radius_sq.max(1.0);
        let hits = tree.within_unsorted::<SquaredEuclidean>(&[query.x, query.y, query.z], bound);
        self.rank(query, hits.into_iter().map(|nn| nn.item), radius_sq)
    }

    fn knn(&self, query: &Point3f, k: usize) -> Vec<Candidate> {
        let Some(tree) = self.tree.as_ref() else {
            return Vec::new();
        };
        if k == 0 || !is_finite(query) {
            return Vec::new();
        }

        // One extra neighbor tells whether the k-th distance is tied.
        let Some(qty) = NonZero::new(k + 1) else {
            return Vec::new();
        };
        let nearest = tree.nearest_n::<SquaredEuclidean>(&[query.x, query.y, query.z], qty);
        let mut candidates = self.rank(query, nearest.into_iter().map(|nn| nn.item), f32::INFINITY);

        if candidates.len() > k && candidates[k].dist_sq <= candidates[k - 1].dist_sq {
            candidates = self.within(tree, query, candidates[k - 1].dist_sq);
        }
        candidates.truncate(k);
        candidates
    }

    fn radius(&self, query: &Point3f, radius_sq: f32, max_nn: usize) -> Vec<Candidate> {
        let Some(tree) = self.tree.as_ref() else {
            return Vec::new();
        };
        if max_nn == 0 || !is_finite(query) {
            return Vec::new();
        }

        let mut candidates = self.within(tree, query, radius_sq);
        candidates.truncate(max_nn);
        candidates
    }
}

fn into_neighbors(candidates: Vec<Candidate>) -> Vec<Neighbor> {
    candidates
        .into_iter()
        .map(|c| Neighbor::new(c.index, c.dist_sq.sqrt()))
        .collect()
}

fn is_finite(p: &Point3f) -> bool {
    p.iter().all(|v| v.is_finite())
}

impl NearestNeighborSearch for KdTree {
    fn search_knn(&self, query: &Point3f, k: usize) -> Vec<Neighbor> {
        into_neighbors(self.knn(query, k))
    }

    fn search_radius(&self, query: &Point3f, radius: f32, max_nn: usize) -> Vec<Neighbor> {
        if radius.is_nan() || radius < 0.0 {
            return Vec::new();
        }
        into_neighbors(self.radius(query, radius * radius, max_nn))
    }

    fn len(&self) -> usize {
        self.indexed.len()
    }
}

/// Simple brute force nearest neighbor search for small datasets
pub struct BruteForceSearch {
    points: Vec<Point3f>,
}

impl BruteForceSearch {
    pub fn new(points: &[Point3f]) -> Self {
        Self {
            points: points.to_vec(),
        }
    }

    fn query(&self, query: &Point3f, capacity: usize, radius_sq: f32) -> Vec<Neighbor> {
        if capacity == 0 || !is_finite(query) {
            return Vec::new();
        }

        let mut candidates: Vec<Candidate> = self
            .points
            .iter()
            .enumerate()
            .map(|(index, point)| Candidate {
                dist_sq: (point - query).norm_squared(),
                index,
            })
            .filter(|c| c.dist_sq.is_finite() && c.dist_sq <= radius_sq)
            .collect();

        candidates.sort();
        candidates.truncate(capacity);
        candidates
            .into_iter()
            .map(|c| Neighbor::new(c.index, c.dist_sq.sqrt()))
            .collect()
    }
}

impl NearestNeighborSearch for BruteForceSearch {
    fn search_knn(&self, query: &Point3f, k: usize) -> Vec<Neighbor> {
        self.query(query, k, f32::INFINITY)
    }

    fn search_radius(&self, query: &Point3f, radius: f32, max_nn: usize) -> Vec<Neighbor> {
        if radius.is_nan() || radius < 0.0 {
            return Vec::new();
        }
        self.query(query, max_nn, radius * radius)
    }

    fn len(&self) -> usize {
        self.points.len()
    }
}

/// Find the `k` nearest indexed points of every query, in parallel.
///
/// Rows are `k` slots wide. An empty index yields rows with no neighbors.
pub fn search_knn<S>(index: &S, queries: &[Point3f], k: usize) -> Result<NeighborResult>
where
    S: NearestNeighborSearch + Sync,
{
    if k == 0 || k > NUM_MAX_NN {
        return Err(Error::InvalidParameter(format!(
            "k must be in 1..={}, got {}",
            NUM_MAX_NN, k
        )));
    }

    let rows: Vec<Vec<Neighbor>> = queries
        .par_iter()
        .map(|query| index.search_knn(query, k))
        .collect();

    Ok(NeighborResult::from_rows(rows, k))
}

/// Find up to `max_nn` indexed points within `radius` of every query, in parallel.
///
/// Rows are `max_nn` slots wide. An empty index yields rows with no neighbors.
pub fn search_radius<S>(
    index: &S,
    queries: &[Point3f],
    radius: f32,
    max_nn: usize,
) -> Result<NeighborResult>
where
    S: NearestNeighborSearch + Sync,
{
    if radius.is_nan() || radius <= 0.0 {
        return Err(Error::InvalidParameter(format!(
            "radius must be positive, got {}",
            radius
        )));
    }
    if max_nn == 0 || max_nn > NUM_MAX_NN {
        return Err(Error::InvalidParameter(format!(
            "max_nn must be in 1..={}, got {}",
            NUM_MAX_NN, max_nn
        )));
    }

    let rows: Vec<Vec<Neighbor>> = queries
        .par_iter()
        .map(|query| index.search_radius(query, radius, max_nn))
        .collect();

    Ok(NeighborResult::from_rows(rows, max_nn))
}
