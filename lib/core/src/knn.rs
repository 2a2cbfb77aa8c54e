//! Nearest-neighbor search over reviewer publication vectors.
//!
//! Similarity is the inner product; vectors are expected to be unit length so
//! this equals cosine similarity. Results are ordered by score descending, then
//! by insertion index, and a cut at `k` keeps every entry tied with the k-th.

use crate::hnsw::{HnswIndex, HnswParams};
use crate::ranker::truncate_with_ties;
use crate::{Error, Result, Vector};
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    /// Insertion index of the matched vector
    pub idx: usize,
    pub score: f32,
}

/// Descending score, ascending index
#[inline]
pub fn neighbor_order(a: &Neighbor, b: &Neighbor) -> Ordering {
    b.score.total_cmp(&a.score).then(a.idx.cmp(&b.idx))
}

pub trait NearestNeighborIndex: Send + Sync {
    fn dim(&self) -> usize;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Top `k` neighbors of `query`, plus any entries tied with the k-th.
    fn search(&self, query: &[f32], k: usize) -> Vec<Neighbor>;
}

/// Which index the dense backend builds
#[derive(Debug, Clone, PartialEq)]
pub enum IndexKind {
    Exact,
    Hnsw(HnswParams),
}

impl IndexKind {
    pub fn build(&self, dim: usize, vectors: &[Vector]) -> Result<Box<dyn NearestNeighborIndex>> {
        match self {
            IndexKind::Exact => Ok(Box::new(ExactIndex::build(dim, vectors)?)),
            IndexKind::Hnsw(params) => Ok(Box::new(HnswIndex::build(dim, vectors, params.clone())?)),
        }
    }
}

/// Brute-force inner product over contiguous storage
#[derive(Debug, Clone)]
pub struct ExactIndex {
    vectors: Vec<f32>,
    dim: usize,
    len: usize,
}

impl ExactIndex {
    pub fn build(dim: usize, vectors: &[Vector]) -> Result<Self> {
        let mut storage = Vec::with_capacity(dim * vectors.len());
        for vector in vectors {
            if vector.dim() != dim {
                return Err(Error::InvalidDimension {
                    expected: dim,
                    actual: vector.dim(),
                });
            }
            storage.extend_from_slice(vector.as_slice());
        }
        Ok(Self {
            vectors: storage,
            dim,
            len: vectors.len(),
        })
    }

    #[inline(always)]
    fn get_vector(&self, idx: usize) -> &[f32] {
        let start = idx * self.dim;
        &self.vectors[start..start + self.dim]
    }
}

impl NearestNeighborIndex for ExactIndex {
    fn dim(&self) -> usize {
        self.dim
    }

    fn len(&self) -> usize {
        self.len
    }

    fn search(&self, query: &[f32], k: usize) -> Vec<Neighbor> {
        if k == 0 || self.len == 0 {
            return Vec::new();
        }

        let mut neighbors: Vec<Neighbor> = (0..self.len)
            .map(|idx| Neighbor {
                idx,
                score: crate::simd::dot_product_simd(query, self.get_vector(idx)),
            })
            .collect();

        // Partial selection first, full sort only on the survivors
        if neighbors.len() > k {
            neighbors.select_nth_unstable_by(k - 1, neighbor_order);
            let kth = neighbors[k - 1].score;
            neighbors.retain(|n| n.score >= kth);
        }
        neighbors.sort_unstable_by(neighbor_order);
        truncate_with_ties(&mut neighbors, k, |n| n.score);
        neighbors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(data: Vec<f32>) -> Vector {
        Vector::new(data).normalized()
    }

    #[test]
    fn test_exact_search_order() {
        let vectors = vec![
            unit(vec![1.0, 0.0]),
            unit(vec![0.0, 1.0]),
            unit(vec![1.0, 1.0]),
        ];
        let index = ExactIndex::build(2, &vectors).unwrap();
        let results = index.search(&[1.0, 0.0], 2);
        assert_eq!(results.iter().map(|n| n.idx).collect::<Vec<_>>(), vec![0, 2]);
    }

    #[test]
    fn test_fewer_than_k_returns_all() {
        let vectors = vec![unit(vec![1.0, 0.0]), unit(vec![0.0, 1.0])];
        let index = ExactIndex::build(2, &vectors).unwrap();
        assert_eq!(index.search(&[1.0, 0.0], 10).len(), 2);
        assert!(index.search(&[1.0, 0.0], 0).is_empty());
    }

    #[test]
    fn test_ties_at_cut_are_kept() {
        let vectors = vec![
            unit(vec![1.0, 0.0]),
            unit(vec![0.0, 1.0]),
            unit(vec![0.0, 1.0]),
            unit(vec![0.0, 1.0]),
            unit(vec![-1.0, 0.0]),
        ];
        let index = ExactIndex::build(2, &vectors).unwrap();
        let results = index.search(&[0.0, 1.0], 2);
        assert_eq!(results.iter().map(|n| n.idx).collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn test_dimension_mismatch_rejected() {
        let vectors = vec![Vector::new(vec![1.0, 0.0, 0.0])];
        assert!(matches!(
            ExactIndex::build(2, &vectors),
            Err(Error::InvalidDimension { expected: 2, actual: 3 })
        ));
    }
}
