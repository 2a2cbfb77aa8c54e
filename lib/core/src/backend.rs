//! Scoring backends.
//!
//! A backend turns the publication pool and the submissions into some
//! comparable representation once ([`ScoringBackend::prepare`]), then scores
//! one submission at a time against every candidate publication
//! ([`ScoringBackend::score_row`]). The provided [`ScoringBackend::score_all`]
//! runs rows in parallel and folds each row into per-reviewer scores straight
//! away, so the full submission x publication matrix never exists in memory.

use crate::cache::{EmbeddingCache, MemoryCache};
use crate::config::{EngineConfig, ModelKind};
use crate::corpus::{AffinityScore, Corpus, Document, PublicationPool};
use crate::dense::DenseBackend;
use crate::encoder::{Encoder, HashingEncoder};
use crate::lexical::LexicalBackend;
use crate::ranker::Aggregation;
use crate::sparse::SparseBackend;
use crate::{Error, Result};
use rayon::prelude::*;
use std::sync::Arc;
use tracing::info;

pub trait ScoringBackend: Send + Sync {
    /// Representations shared read-only by every row
    type Prepared: Send + Sync;

    fn name(&self) -> &'static str;

    /// Scoring threads; `None` runs on rayon's global pool
    fn workers(&self) -> Option<usize> {
        None
    }

    fn prepare(&self, pool: &PublicationPool, submissions: &[&Document]) -> Result<Self::Prepared>;

    /// `(publication index, score)` pairs for submission `sub_idx`. Under
    /// [`Aggregation::Max`] a row may omit publications that are not
    /// candidates; under [`Aggregation::Mean`] it must cover every
    /// publication of each reviewer it mentions.
    fn score_row(
        &self,
        prepared: &Self::Prepared,
        sub_idx: usize,
        submission: &Document,
        aggregation: Aggregation,
    ) -> Vec<(usize, f32)>;

    /// One score per (submission, reviewer with publications), grouped by
    /// submission in ascending id order.
    fn score_all(&self, corpus: &Corpus, aggregation: Aggregation) -> Result<Vec<AffinityScore>> {
        let pool = corpus.publication_pool();
        let submissions: Vec<&Document> = corpus.submissions().collect();
        info!(
            "Scoring {} submissions against {} publications of {} reviewers with {}",
            submissions.len(),
            pool.len(),
            pool.reviewers().len(),
            self.name()
        );
        if pool.is_empty() || submissions.is_empty() {
            return Ok(Vec::new());
        }

        let prepared = self.prepare(&pool, &submissions)?;
        let run_rows = || -> Vec<Vec<AffinityScore>> {
            submissions
                .par_iter()
                .enumerate()
                .map(|(sub_idx, submission)| {
                    let row = self.score_row(&prepared, sub_idx, submission, aggregation);
                    aggregation.aggregate_row(&submission.id, &pool, &row)
                })
                .collect()
        };

        let rows = match self.workers() {
            Some(workers) => rayon::ThreadPoolBuilder::new()
                .num_threads(workers)
                .build()
                .map_err(|e| Error::InvalidConfig(format!("cannot start {} workers: {}", workers, e)))?
                .install(run_rows),
            None => run_rows(),
        };

        let scores: Vec<AffinityScore> = rows.into_iter().flatten().collect();
        info!("Computed {} reviewer scores", scores.len());
        Ok(scores)
    }
}

/// The backend selected for a run
pub enum Backend {
    Lexical(LexicalBackend),
    Sparse(SparseBackend),
    Dense(DenseBackend),
}

impl Backend {
    /// Build the backend named by `config.model`. The dense backend uses the
    /// built-in [`HashingEncoder`] and, when `cache` is `None`, an in-memory
    /// cache.
    pub fn from_config(config: &EngineConfig, cache: Option<Arc<dyn EmbeddingCache>>) -> Result<Self> {
        match config.model {
            ModelKind::Lexical => Ok(Backend::Lexical(LexicalBackend::from_config(config))),
            ModelKind::Sparse => Ok(Backend::Sparse(SparseBackend::from_config(config))),
            ModelKind::Dense => {
                let encoder: Arc<dyn Encoder> = Arc::new(HashingEncoder::new(config.dense.embedding_dim)?);
                let cache = cache.unwrap_or_else(|| Arc::new(MemoryCache::new()));
                Ok(Backend::Dense(DenseBackend::new(config, encoder, cache)))
            }
        }
    }

    /// Dense backend with a caller-supplied encoder
    pub fn dense(config: &EngineConfig, encoder: Arc<dyn Encoder>, cache: Arc<dyn EmbeddingCache>) -> Self {
        Backend::Dense(DenseBackend::new(config, encoder, cache))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Backend::Lexical(b) => b.name(),
            Backend::Sparse(b) => b.name(),
            Backend::Dense(b) => b.name(),
        }
    }

    pub fn score_all(&self, corpus: &Corpus, aggregation: Aggregation) -> Result<Vec<AffinityScore>> {
        match self {
            Backend::Lexical(b) => b.score_all(corpus, aggregation),
            Backend::Sparse(b) => b.score_all(corpus, aggregation),
            Backend::Dense(b) => b.score_all(corpus, aggregation),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelConfig;

    fn engine(model: &str) -> EngineConfig {
        let raw = serde_json::json!({
            "model": model,
            "model_params": {"use_title": true, "workers": 2},
        });
        ModelConfig::from_json(&raw.to_string()).unwrap().validate().unwrap()
    }

    fn corpus() -> Corpus {
        let mut corpus = Corpus::new();
        corpus.add_publication("~A1", Document::new("a1", "graph neural networks for molecules", ""));
        corpus.add_publication("~B1", Document::new("b1", "medieval trade routes in europe", ""));
        corpus.add_reviewer("~C1");
        corpus.add_submission(Document::new("s1", "neural networks on molecule graphs", ""));
        corpus.add_submission(Document::new("s2", "trade in medieval europe", ""));
        corpus
    }

    #[test]
    fn test_every_backend_prefers_topical_reviewer() {
        for model in ["bm25", "tfidf", "dense"] {
            let backend = Backend::from_config(&engine(model), None).unwrap();
            let scores = backend.score_all(&corpus(), Aggregation::Max).unwrap();

            assert!(scores.iter().all(|s| s.reviewer_id != "~C1"), "{}", model);
            let get = |sub: &str, rev: &str| {
                scores
                    .iter()
                    .find(|s| s.submission_id == sub && s.reviewer_id == rev)
                    .map(|s| s.score)
                    .unwrap_or(f32::NEG_INFINITY)
            };
            assert!(get("s1", "~A1") > get("s1", "~B1"), "{}", model);
            assert!(get("s2", "~B1") > get("s2", "~A1"), "{}", model);
        }
    }

    #[test]
    fn test_backend_names() {
        assert_eq!(Backend::from_config(&engine("bm25"), None).unwrap().name(), "bm25");
        assert_eq!(Backend::from_config(&engine("tfidf"), None).unwrap().name(), "tfidf");
        assert_eq!(Backend::from_config(&engine("specter"), None).unwrap().name(), "dense");
    }

    #[test]
    fn test_empty_corpus_scores_nothing() {
        let backend = Backend::from_config(&engine("bm25"), None).unwrap();
        let scores = backend.score_all(&Corpus::new(), Aggregation::Max).unwrap();
        assert!(scores.is_empty());
    }
}
