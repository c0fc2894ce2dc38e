//! Fixed-capacity neighbor rows returned by spatial queries

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Maximum number of neighbors a single query row can hold
pub const NUM_MAX_NN: usize = 100;

/// A single neighbor of a query point
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Neighbor {
    /// Index into the indexed point set
    pub index: usize,
    /// Euclidean distance to the query point
    pub distance: f32,
}

impl Neighbor {
    pub fn new(index: usize, distance: f32) -> Self {
        Self { index, distance }
    }

    /// Decode a sentinel-encoded slot as written by device kernels.
    ///
    /// A negative index, a negative distance or an infinite distance marks
    /// an unused slot.
    pub fn from_raw(index: i32, distance: f32) -> Option<Self> {
        if index < 0 || distance < 0.0 || distance.is_infinite() {
            None
        } else {
            Some(Self::new(index as usize, distance))
        }
    }
}

/// Neighbor rows for a batch of queries.
///
/// Every row has exactly `max_nn` slots. Found neighbors fill a row from the
/// front in ascending `(distance, index)` order; the remaining slots are
/// `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeighborResult {
    num_queries: usize,
    max_nn: usize,
    slots: Vec<Option<Neighbor>>,
}

impl NeighborResult {
    /// A result with every slot empty
    pub fn new(num_queries: usize, max_nn: usize) -> Self {
        Self {
            num_queries,
            max_nn,
            slots: vec![None; num_queries * max_nn],
        }
    }

    /// Pack per-query neighbor lists, truncating each to `max_nn`
    pub fn from_rows<I>(rows: I, max_nn: usize) -> Self
    where
        I: IntoIterator<Item = Vec<Neighbor>>,
    {
        let mut slots = Vec::new();
        let mut num_queries = 0;
        for row in rows {
            let found = row.len().min(max_nn);
            slots.extend(row.into_iter().take(max_nn).map(Some));
            slots.extend(std::iter::repeat(None).take(max_nn - found));
            num_queries += 1;
        }

        Self {
            num_queries,
            max_nn,
            slots,
        }
    }

    /// Decode row-major sentinel arrays (`-1` index, negative or infinite
    /// distance for unused slots)
    pub fn from_raw(indices: &[i32], distances: &[f32], max_nn: usize) -> Result<Self> {
        if indices.len() != distances.len() {
            return Err(Error::InvalidData(format!(
                "neighbor index count {} does not match distance count {}",
                indices.len(),
                distances.len()
            )));
        }
        if max_nn == 0 || indices.len() % max_nn != 0 {
            return Err(Error::InvalidData(format!(
                "{} neighbor slots cannot be split into rows of {}",
                indices.len(),
                max_nn
            )));
        }

        let slots = indices
            .iter()
            .zip(distances)
            .map(|(&i, &d)| Neighbor::from_raw(i, d))
            .collect();

        Ok(Self {
            num_queries: indices.len() / max_nn,
            max_nn,
            slots,
        })
    }

    pub fn num_queries(&self) -> usize {
        self.num_queries
    }

    pub fn max_nn(&self) -> usize {
        self.max_nn
    }

    pub fn is_empty(&self) -> bool {
        self.num_queries == 0
    }

    /// All `max_nn` slots of query `query`
    pub fn row(&self, query: usize) -> &[Option<Neighbor>] {
        &self.slots[query * self.max_nn..(query + 1) * self.max_nn]
    }

    /// The neighbors found for query `query`
    pub fn neighbors(&self, query: usize) -> impl Iterator<Item = &Neighbor> + '_ {
        self.row(query).iter().flatten()
    }

    /// Number of neighbors found for query `query`
    pub fn count(&self, query: usize) -> usize {
        self.row(query).iter().filter(|slot| slot.is_some()).count()
    }

    pub fn rows(&self) -> impl Iterator<Item = &[Option<Neighbor>]> + '_ {
        (0..self.num_queries).map(move |q| self.row(q))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_rows_pads_and_truncates() {
        let result = NeighborResult::from_rows(
            vec![
                vec![Neighbor::new(0, 0.0), Neighbor::new(3, 1.0)],
                vec![],
                vec![Neighbor::new(1, 0.0), Neighbor::new(2, 0.5), Neighbor::new(4, 0.7)],
            ],
            2,
        );

        assert_eq!(result.num_queries(), 3);
        assert_eq!(result.count(0), 2);
        assert_eq!(result.count(1), 0);
        assert_eq!(result.row(1), &[None, None]);
        assert_eq!(result.count(2), 2);
        let kept: Vec<usize> = result.neighbors(2).map(|n| n.index).collect();
        assert_eq!(kept, vec![1, 2]);
    }

    #[test]
    fn test_raw_sentinels_are_invalid() {
        assert!(Neighbor::from_raw(-1, 0.5).is_none());
        assert!(Neighbor::from_raw(2, -1.0).is_none());
        assert!(Neighbor::from_raw(2, f32::INFINITY).is_none());
        assert_eq!(Neighbor::from_raw(2, 0.0), Some(Neighbor::new(2, 0.0)));
    }

    #[test]
    fn test_from_raw_rows() {
        let result = NeighborResult::from_raw(
            &[0, 1, -1, 2, -1, -1],
            &[0.0, 0.3, -1.0, 0.0, -1.0, f32::INFINITY],
            3,
        )
        .unwrap();

        assert_eq!(result.num_queries(), 2);
        assert_eq!(result.count(0), 2);
        assert_eq!(result.count(1), 1);
    }

    #[test]
    fn test_from_raw_rejects_ragged_input() {
        assert!(NeighborResult::from_raw(&[0, 1], &[0.0], 1).is_err());
        assert!(NeighborResult::from_raw(&[0, 1, 2], &[0.0, 0.0, 0.0], 2).is_err());
        assert!(NeighborResult::from_raw(&[0], &[0.0], 0).is_err());
    }
}
