use crate::knn::{neighbor_order, NearestNeighborIndex, Neighbor};
use crate::ranker::truncate_with_ties;
use crate::{Error, Result, Vector};
use ordered_float::OrderedFloat;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// Bit vector for visited node tracking
/// Much faster than HashSet for dense integer sets
struct VisitedSet {
    bits: Vec<u64>,
}

impl VisitedSet {
    #[inline]
    fn new(capacity: usize) -> Self {
        Self {
            bits: vec![0; capacity.div_ceil(64)],
        }
    }

    /// Returns true if `idx` was not yet visited
    #[inline]
    fn insert(&mut self, idx: usize) -> bool {
        let word = idx / 64;
        let mask = 1u64 << (idx % 64);
        if word >= self.bits.len() {
            self.bits.resize(word + 1, 0);
        }
        let fresh = self.bits[word] & mask == 0;
        self.bits[word] |= mask;
        fresh
    }

    #[inline]
    fn contains(&self, idx: usize) -> bool {
        let word = idx / 64;
        word < self.bits.len() && self.bits[word] & (1u64 << (idx % 64)) != 0
    }
}

// (distance, idx); distance is the negated inner product so the score can be
// recovered exactly
type Scored = (OrderedFloat<f32>, usize);

#[derive(Debug, Clone, PartialEq)]
pub struct HnswParams {
    /// Links per node on upper layers; layer 0 keeps twice as many
    pub m: usize,
    pub ef_construction: usize,
    pub ef_search: usize,
    pub max_layers: usize,
    /// Seed for level assignment
    pub seed: u64,
}

impl Default for HnswParams {
    fn default() -> Self {
        Self {
            m: 16,
            ef_construction: 200,
            ef_search: 64,
            max_layers: 16,
            seed: 9,
        }
    }
}

#[derive(Debug, Clone)]
struct HnswNode {
    layers: Vec<Vec<usize>>,
}

/// HNSW index for approximate nearest neighbor search.
///
/// Level assignment draws from a seeded RNG and all heap ties break on node
/// index, so the same vectors inserted in the same order with the same params
/// give the same graph and the same answers.
#[derive(Debug, Clone)]
pub struct HnswIndex {
    nodes: Vec<HnswNode>,
    /// Contiguous storage for all vectors (cache-friendly)
    vectors: Vec<f32>,
    dim: usize,
    entry_point: Option<usize>,
    top_layer: usize,
    params: HnswParams,
    rng: StdRng,
}

impl HnswIndex {
    pub fn new(dim: usize, params: HnswParams) -> Result<Self> {
        if params.m == 0 || params.max_layers == 0 {
            return Err(Error::InvalidConfig("hnsw m and max_layers must be positive".to_string()));
        }
        let rng = StdRng::seed_from_u64(params.seed);
        Ok(Self {
            nodes: Vec::new(),
            vectors: Vec::new(),
            dim,
            entry_point: None,
            top_layer: 0,
            params,
            rng,
        })
    }

    pub fn build(dim: usize, vectors: &[Vector], params: HnswParams) -> Result<Self> {
        let mut index = Self::new(dim, params)?;
        for vector in vectors {
            index.insert(vector)?;
        }
        Ok(index)
    }

    #[inline(always)]
    fn get_vector(&self, node_idx: usize) -> &[f32] {
        let start = node_idx * self.dim;
        &self.vectors[start..start + self.dim]
    }

    #[inline(always)]
    fn distance_to_node(&self, query: &[f32], node_idx: usize) -> OrderedFloat<f32> {
        OrderedFloat(-crate::simd::dot_product_simd(query, self.get_vector(node_idx)))
    }

    /// Exponential decay, p = 1/2 per level
    #[inline]
    fn select_layer(&mut self) -> usize {
        let mut layer = 0;
        while layer < self.params.max_layers - 1 && self.rng.random::<f32>() < 0.5 {
            layer += 1;
        }
        layer
    }

    #[inline]
    fn capacity(&self, layer: usize) -> usize {
        if layer == 0 {
            self.params.m * 2
        } else {
            self.params.m
        }
    }

    /// Best-first search on one layer; returns up to `ef` nodes, closest first
    fn search_layer(&self, query: &[f32], entry_point: usize, ef: usize, layer: usize) -> Vec<Scored> {
        let mut visited = VisitedSet::new(self.nodes.len());
        let mut candidates: BinaryHeap<Reverse<Scored>> = BinaryHeap::with_capacity(ef * 2);
        let mut results: BinaryHeap<Scored> = BinaryHeap::with_capacity(ef + 1);

        let entry = (self.distance_to_node(query, entry_point), entry_point);
        candidates.push(Reverse(entry));
        results.push(entry);
        visited.insert(entry_point);

        while let Some(Reverse(current)) = candidates.pop() {
            // Early termination: closest candidate is worse than the worst result
            if let Some(worst) = results.peek() {
                if results.len() >= ef && current > *worst {
                    break;
                }
            }

            let Some(neighbors) = self.nodes[current.1].layers.get(layer) else {
                continue;
            };

            for &neighbor_idx in neighbors {
                if !visited.insert(neighbor_idx) {
                    continue;
                }
                let scored = (self.distance_to_node(query, neighbor_idx), neighbor_idx);
                let admit = results.len() < ef || results.peek().map_or(true, |worst| scored < *worst);
                if admit {
                    candidates.push(Reverse(scored));
                    results.push(scored);
                    if results.len() > ef {
                        results.pop();
                    }
                }
            }
        }

        let mut result_vec = results.into_vec();
        result_vec.sort_unstable();
        result_vec
    }

    /// Greedy descent through the upper layers down to `target_layer + 1`
    fn descend(&self, query: &[f32], target_layer: usize) -> Option<usize> {
        let mut entry = self.entry_point?;
        let mut layer = self.top_layer;
        while layer > target_layer {
            if let Some(&(_, closest)) = self.search_layer(query, entry, 1, layer).first() {
                entry = closest;
            }
            layer -= 1;
        }
        Some(entry)
    }

    /// Insert a vector; its node index is the current length
    pub fn insert(&mut self, vector: &Vector) -> Result<()> {
        if vector.dim() != self.dim {
            return Err(Error::InvalidDimension {
                expected: self.dim,
                actual: vector.dim(),
            });
        }

        let level = self.select_layer();
        let node_idx = self.nodes.len();
        self.vectors.extend_from_slice(vector.as_slice());
        self.nodes.push(HnswNode {
            layers: vec![Vec::new(); level + 1],
        });

        let Some(mut entry) = self.descend(vector.as_slice(), level) else {
            self.entry_point = Some(node_idx);
            self.top_layer = level;
            return Ok(());
        };

        for layer in (0..=level.min(self.top_layer)).rev() {
            let candidates = self.search_layer(vector.as_slice(), entry, self.params.ef_construction, layer);
            let neighbors: Vec<usize> = candidates
                .iter()
                .filter(|(_, idx)| *idx != node_idx)
                .take(self.capacity(layer))
                .map(|(_, idx)| *idx)
                .collect();

            for &neighbor_idx in &neighbors {
                self.link(neighbor_idx, node_idx, layer);
            }
            self.nodes[node_idx].layers[layer] = neighbors;

            if let Some(&(_, closest)) = candidates.first() {
                entry = closest;
            }
        }

        if level > self.top_layer {
            self.top_layer = level;
            self.entry_point = Some(node_idx);
        }
        Ok(())
    }

    /// Back-link `to` from `from`, pruning `from`'s list to its closest links
    fn link(&mut self, from: usize, to: usize, layer: usize) {
        let capacity = self.capacity(layer);
        let links = &mut self.nodes[from].layers[layer];
        links.push(to);
        if links.len() <= capacity {
            return;
        }

        let mut connections = std::mem::take(&mut self.nodes[from].layers[layer]);
        let anchor = self.get_vector(from).to_vec();
        let mut scored: Vec<Scored> = connections
            .iter()
            .map(|&idx| (self.distance_to_node(&anchor, idx), idx))
            .collect();
        scored.sort_unstable();
        scored.truncate(capacity);
        connections.clear();
        connections.extend(scored.into_iter().map(|(_, idx)| idx));
        self.nodes[from].layers[layer] = connections;
    }

    fn exact_scan(&self, query: &[f32], k: usize) -> Vec<Neighbor> {
        let mut all: Vec<Neighbor> = (0..self.nodes.len())
            .map(|idx| Neighbor {
                idx,
                score: crate::simd::dot_product_simd(query, self.get_vector(idx)),
            })
            .collect();
        all.sort_unstable_by(neighbor_order);
        truncate_with_ties(&mut all, k, |n| n.score);
        all
    }
}

impl NearestNeighborIndex for HnswIndex {
    fn dim(&self) -> usize {
        self.dim
    }

    fn len(&self) -> usize {
        self.nodes.len()
    }

    fn search(&self, query: &[f32], k: usize) -> Vec<Neighbor> {
        let n = self.nodes.len();
        if k == 0 || n == 0 {
            return Vec::new();
        }

        let mut ef = self.params.ef_search.max(k);
        // Small indexes: the whole graph fits in the candidate pool anyway
        if n <= ef {
            return self.exact_scan(query, k);
        }

        let Some(entry) = self.descend(query, 0) else {
            return Vec::new();
        };

        loop {
            let mut results: Vec<Neighbor> = self
                .search_layer(query, entry, ef, 0)
                .into_iter()
                .map(|(dist, idx)| Neighbor { idx, score: -dist.0 })
                .collect();
            results.sort_unstable_by(neighbor_order);

            // The pool is complete once it holds an entry strictly below the
            // k-th score; until then widen it, scanning exactly once it would
            // cover the whole index
            let past_boundary = match (results.get(k - 1), results.last()) {
                (Some(kth), Some(last)) => last.score < kth.score,
                _ => false,
            };
            if !past_boundary {
                ef = ef.saturating_mul(2);
                if ef >= n {
                    return self.exact_scan(query, k);
                }
                continue;
            }

            truncate_with_ties(&mut results, k, |nb| nb.score);
            return results;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knn::ExactIndex;

    fn random_unit_vectors(count: usize, dim: usize, seed: u64) -> Vec<Vector> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..count)
            .map(|_| {
                let data: Vec<f32> = (0..dim).map(|_| rng.random_range(-1.0f32..1.0f32)).collect();
                Vector::new(data).normalized()
            })
            .collect()
    }

    #[test]
    fn test_hnsw_insert_search() {
        let vectors = random_unit_vectors(10, 3, 1);
        let index = HnswIndex::build(3, &vectors, HnswParams::default()).unwrap();
        let results = index.search(vectors[4].as_slice(), 3);
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].idx, 4);
    }

    #[test]
    fn test_visited_set() {
        let mut vs = VisitedSet::new(100);

        assert!(!vs.contains(5));
        assert!(vs.insert(5)); // First insert returns true
        assert!(vs.contains(5));
        assert!(!vs.insert(5)); // Second insert returns false
        assert!(vs.insert(250)); // Grows past initial capacity
    }

    #[test]
    fn test_deterministic_given_seed() {
        let vectors = random_unit_vectors(400, 16, 7);
        let params = HnswParams {
            ef_search: 16,
            ..HnswParams::default()
        };
        let a = HnswIndex::build(16, &vectors, params.clone()).unwrap();
        let b = HnswIndex::build(16, &vectors, params).unwrap();
        for query in vectors.iter().take(20) {
            assert_eq!(a.search(query.as_slice(), 5), b.search(query.as_slice(), 5));
        }
    }

    #[test]
    fn test_recall_against_exact() {
        let vectors = random_unit_vectors(600, 16, 11);
        let params = HnswParams {
            ef_search: 32,
            ..HnswParams::default()
        };
        let hnsw = HnswIndex::build(16, &vectors, params).unwrap();
        let exact = ExactIndex::build(16, &vectors).unwrap();

        let mut hits = 0;
        let mut total = 0;
        for query in vectors.iter().step_by(30) {
            let truth: Vec<usize> = exact.search(query.as_slice(), 10).iter().map(|n| n.idx).collect();
            let found: Vec<usize> = hnsw.search(query.as_slice(), 10).iter().map(|n| n.idx).collect();
            hits += truth.iter().filter(|idx| found.contains(idx)).count();
            total += truth.len();
        }
        assert!(hits as f32 / total as f32 > 0.8, "recall {}/{}", hits, total);
    }

    #[test]
    fn test_small_index_returns_all_with_ties() {
        let vectors = vec![
            Vector::new(vec![0.0, 1.0]),
            Vector::new(vec![0.0, 1.0]),
            Vector::new(vec![1.0, 0.0]),
        ];
        let index = HnswIndex::build(2, &vectors, HnswParams::default()).unwrap();
        let results = index.search(&[0.0, 1.0], 1);
        assert_eq!(results.iter().map(|n| n.idx).collect::<Vec<_>>(), vec![0, 1]);
        assert_eq!(index.search(&[0.0, 1.0], 10).len(), 3);
    }

    #[test]
    fn test_ties_past_ef_search_are_complete() {
        let mut vectors = vec![Vector::new(vec![0.0, 1.0]); 100];
        vectors.extend(std::iter::repeat(Vector::new(vec![1.0, 0.0])).take(50));
        let params = HnswParams {
            ef_search: 4,
            ..HnswParams::default()
        };
        let hnsw = HnswIndex::build(2, &vectors, params).unwrap();
        let exact = ExactIndex::build(2, &vectors).unwrap();

        let found = hnsw.search(&[0.0, 1.0], 10);
        assert_eq!(found.len(), 100);
        assert_eq!(found, exact.search(&[0.0, 1.0], 10));
        assert!(found.iter().all(|n| n.idx < 100));
    }
}
