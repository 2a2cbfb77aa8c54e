//! Dense embedding backend.
//!
//! Documents are embedded in batches by an injected [`Encoder`], normalised,
//! and publications are loaded into a [`NearestNeighborIndex`]. Under max
//! aggregation each submission keeps its `nn_candidates` nearest
//! publications; a mean is taken over whole archives, so mean aggregation
//! scores every publication.
//!
//! Vectors go through an [`EmbeddingCache`] keyed by document id. With
//! `reuse_cached_vectors` set, cached vectors are used as-is and only misses
//! reach the encoder; otherwise every document is re-encoded and its cache
//! entry overwritten. The cache is never invalidated by the engine.

use crate::backend::ScoringBackend;
use crate::cache::EmbeddingCache;
use crate::config::EngineConfig;
use crate::corpus::{Document, PublicationPool, TextField};
use crate::encoder::{ensure_device, Device, Encoder};
use crate::knn::{IndexKind, NearestNeighborIndex};
use crate::ranker::Aggregation;
use crate::{Error, Result, Vector};
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq)]
pub struct DenseParams {
    pub device: Device,
    pub batch_size: usize,
    pub reuse_cached_vectors: bool,
    /// Neighbors kept per submission
    pub nn_candidates: usize,
    pub index: IndexKind,
    /// Output dimension of the built-in encoder
    pub embedding_dim: usize,
}

impl Default for DenseParams {
    fn default() -> Self {
        Self {
            device: Device::Cpu,
            batch_size: 32,
            reuse_cached_vectors: false,
            nn_candidates: 500,
            index: IndexKind::Exact,
            embedding_dim: crate::encoder::DEFAULT_HASHING_DIM,
        }
    }
}

pub struct DenseBackend {
    text_field: TextField,
    params: DenseParams,
    encoder: Arc<dyn Encoder>,
    cache: Arc<dyn EmbeddingCache>,
}

pub struct DenseState {
    index: Box<dyn NearestNeighborIndex>,
    publications: Vec<Vector>,
    submissions: Vec<Vector>,
}

impl DenseBackend {
    pub fn new(config: &EngineConfig, encoder: Arc<dyn Encoder>, cache: Arc<dyn EmbeddingCache>) -> Self {
        Self::with_params(config.text_field, config.dense.clone(), encoder, cache)
    }

    pub fn with_params(
        text_field: TextField,
        params: DenseParams,
        encoder: Arc<dyn Encoder>,
        cache: Arc<dyn EmbeddingCache>,
    ) -> Self {
        Self {
            text_field,
            params,
            encoder,
            cache,
        }
    }

    /// Unit vectors for `docs`, in order. Empty documents get the zero vector
    /// and never reach the encoder or the cache.
    pub fn embed(&self, docs: &[&Document]) -> Result<Vec<Vector>> {
        let dim = self.encoder.dim();
        let mut vectors: Vec<Option<Vector>> = vec![None; docs.len()];
        let mut pending = Vec::new();
        let mut hits = 0usize;

        for (i, doc) in docs.iter().enumerate() {
            if doc.text(self.text_field).is_empty() {
                vectors[i] = Some(Vector::zeros(dim));
                continue;
            }
            if self.params.reuse_cached_vectors {
                if let Some(cached) = self.cache.get(&doc.id)? {
                    if cached.dim() != dim {
                        return Err(Error::InvalidDimension {
                            expected: dim,
                            actual: cached.dim(),
                        });
                    }
                    vectors[i] = Some(cached);
                    hits += 1;
                    continue;
                }
            }
            pending.push(i);
        }
        info!("Embedding cache: {} hits, {} to encode", hits, pending.len());

        for chunk in pending.chunks(self.params.batch_size.max(1)) {
            let texts: Vec<&str> = chunk.iter().map(|&i| docs[i].text(self.text_field)).collect();
            let encoded = self.encoder.encode_batch(&texts)?;
            if encoded.len() != chunk.len() {
                return Err(Error::Encoder(format!(
                    "encoder returned {} vectors for {} texts",
                    encoded.len(),
                    chunk.len()
                )));
            }
            for (&i, vector) in chunk.iter().zip(encoded) {
                if vector.dim() != dim {
                    return Err(Error::InvalidDimension {
                        expected: dim,
                        actual: vector.dim(),
                    });
                }
                vectors[i] = Some(vector.normalized());
            }

            let entries: Vec<(&str, &Vector)> = chunk
                .iter()
                .filter_map(|&i| vectors[i].as_ref().map(|v| (docs[i].id.as_str(), v)))
                .collect();
            self.cache.put_many(&entries)?;
            debug!("Encoded batch of {}", chunk.len());
        }

        vectors
            .into_iter()
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| Error::Encoder("document left without a vector".to_string()))
    }
}

impl ScoringBackend for DenseBackend {
    type Prepared = DenseState;

    fn name(&self) -> &'static str {
        "dense"
    }

    fn prepare(&self, pool: &PublicationPool, submissions: &[&Document]) -> Result<DenseState> {
        ensure_device(self.encoder.as_ref(), self.params.device)?;
        info!(
            "Embedding with {} on {}, batch size {}",
            self.encoder.version(),
            self.params.device,
            self.params.batch_size
        );

        let publications: Vec<&Document> = pool.documents().iter().collect();
        let publication_vectors = self.embed(&publications)?;
        let submission_vectors = self.embed(submissions)?;

        let index = self.params.index.build(self.encoder.dim(), &publication_vectors)?;
        info!("Built {:?} index over {} publications", self.params.index, index.len());

        Ok(DenseState {
            index,
            publications: publication_vectors,
            submissions: submission_vectors,
        })
    }

    fn score_row(
        &self,
        state: &DenseState,
        sub_idx: usize,
        _submission: &Document,
        aggregation: Aggregation,
    ) -> Vec<(usize, f32)> {
        let query = &state.submissions[sub_idx];
        match aggregation {
            Aggregation::Max => state
                .index
                .search(query.as_slice(), self.params.nn_candidates)
                .into_iter()
                .map(|n| (n.idx, n.score))
                .collect(),
            Aggregation::Mean => state
                .publications
                .iter()
                .enumerate()
                .map(|(idx, publication)| (idx, query.dot(publication)))
                .collect(),
        }
    }
}
