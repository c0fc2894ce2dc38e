//! Group-by-key reduction over parallel attribute arrays
//!
//! Voxel downsampling averages every attribute of the points sharing a voxel.
//! [`KeyReduction`] sorts the keys once and records the run boundaries of
//! equal keys; every attribute array is then reduced against that single
//! grouping, so positions, normals and colors can never be grouped
//! differently.

use cloudcrate_core::{Error, Point3f, Result, Vector3f};
use rayon::prelude::*;

/// A per-point value that can be summed and divided by a count
pub trait Attribute: Copy + Send + Sync {
    fn zero() -> Self;

    fn accumulate(self, other: Self) -> Self;

    fn divide(self, count: f32) -> Self;
}

impl Attribute for Vector3f {
    fn zero() -> Self {
        Vector3f::zeros()
    }

    fn accumulate(self, other: Self) -> Self {
        self + other
    }

    fn divide(self, count: f32) -> Self {
        self / count
    }
}

impl Attribute for Point3f {
    fn zero() -> Self {
        Point3f::origin()
    }

    fn accumulate(self, other: Self) -> Self {
        Point3f::from(self.coords + other.coords)
    }

    fn divide(self, count: f32) -> Self {
        Point3f::from(self.coords / count)
    }
}

impl Attribute for f32 {
    fn zero() -> Self {
        0.0
    }

    fn accumulate(self, other: Self) -> Self {
        self + other
    }

    fn divide(self, count: f32) -> Self {
        self / count
    }
}

/// The grouping of `n` keyed records into runs of equal keys.
#[derive(Debug, Clone)]
pub struct KeyReduction<K> {
    keys: Vec<K>,
    order: Vec<usize>,
    offsets: Vec<usize>,
}

impl<K> KeyReduction<K>
where
    K: Ord + Copy + Send + Sync,
{
    /// Stable parallel sort of the record indices by key, followed by a
    /// parallel scan for the first record of every run.
    pub fn new(keys: &[K]) -> Self {
        let mut order: Vec<usize> = (0..keys.len()).collect();
        order.par_sort_by_key(|&i| keys[i]);

        let mut offsets: Vec<usize> = (0..order.len())
            .into_par_iter()
            .filter(|&i| i == 0 || keys[order[i]] != keys[order[i - 1]])
            .collect();
        let group_keys = offsets.par_iter().map(|&start| keys[order[start]]).collect();
        offsets.push(order.len());

        Self {
            keys: group_keys,
            order,
            offsets,
        }
    }

    /// Number of distinct keys
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Number of records the grouping was built from
    pub fn source_len(&self) -> usize {
        self.order.len()
    }

    /// Distinct keys in ascending order
    pub fn keys(&self) -> &[K] {
        &self.keys
    }

    /// Record count of every group
    pub fn counts(&self) -> Vec<usize> {
        self.offsets.windows(2).map(|w| w[1] - w[0]).collect()
    }

    /// Source indices of every group, ascending within a group
    pub fn groups(&self) -> impl Iterator<Item = &[usize]> + '_ {
        self.offsets.windows(2).map(move |w| &self.order[w[0]..w[1]])
    }

    /// Per-group sums of `values`, where `values[i]` belongs to record `i`
    pub fn sum<V: Attribute>(&self, values: &[V]) -> Result<Vec<V>> {
        self.check_len(values.len())?;

        Ok(self
            .offsets
            .par_windows(2)
            .map(|w| {
                self.order[w[0]..w[1]]
                    .iter()
                    .fold(V::zero(), |acc, &i| acc.accumulate(values[i]))
            })
            .collect())
    }

    /// Per-group means of `values`
    pub fn mean<V: Attribute>(&self, values: &[V]) -> Result<Vec<V>> {
        let sums = self.sum(values)?;

        Ok(sums
            .into_par_iter()
            .zip(self.offsets.par_windows(2))
            .map(|(sum, w)| sum.divide((w[1] - w[0]) as f32))
            .collect())
    }

    fn check_len(&self, len: usize) -> Result<()> {
        if len != self.order.len() {
            return Err(Error::InvalidData(format!(
                "attribute has {} values but the grouping covers {} records",
                len,
                self.order.len()
            )));
        }
        Ok(())
    }
}

/// Average `values` per distinct key.
///
/// Returns the distinct keys in ascending order, the mean value of each key
/// and the number of records behind each mean.
pub fn reduce_by_key<K, V>(keys: &[K], values: &[V]) -> Result<(Vec<K>, Vec<V>, Vec<usize>)>
where
    K: Ord + Copy + Send + Sync,
    V: Attribute,
{
    let reduction = KeyReduction::new(keys);
    let means = reduction.mean(values)?;
    let counts = reduction.counts();
    Ok((reduction.keys, means, counts))
}
