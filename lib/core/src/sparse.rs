// TF-IDF keyphrase backend: cosine similarity between keyphrase vectors.
use crate::backend::ScoringBackend;
use crate::config::EngineConfig;
use crate::corpus::{Document, PublicationPool, TextField};
use crate::ranker::Aggregation;
use crate::tfidf::{SparseVector, TfidfModel, TfidfParams};
use crate::Result;
use rayon::prelude::*;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct SparseBackend {
    text_field: TextField,
    params: TfidfParams,
    workers: Option<usize>,
}

/// Keyphrase vectors for one run
#[derive(Debug)]
pub struct SparseVectors {
    publications: Vec<SparseVector>,
    submissions: Vec<SparseVector>,
}

impl SparseBackend {
    pub fn new(text_field: TextField, params: TfidfParams, workers: Option<usize>) -> Self {
        Self {
            text_field,
            params,
            workers,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.text_field, config.tfidf.clone(), config.workers)
    }
}

impl ScoringBackend for SparseBackend {
    type Prepared = SparseVectors;

    fn name(&self) -> &'static str {
        "tfidf"
    }

    fn workers(&self) -> Option<usize> {
        self.workers
    }

    fn prepare(&self, pool: &PublicationPool, submissions: &[&Document]) -> Result<SparseVectors> {
        let field = self.text_field;
        let texts = pool
            .documents()
            .iter()
            .chain(submissions.iter().copied())
            .map(|doc| doc.text(field));
        let model = TfidfModel::fit(texts, self.params.clone());
        debug!("Fitted TF-IDF vocabulary of {} terms", model.vocabulary_size());

        let publications = pool
            .documents()
            .par_iter()
            .map(|doc| model.vectorize(doc.text(field)))
            .collect();
        let submissions = submissions
            .par_iter()
            .map(|doc| model.vectorize(doc.text(field)))
            .collect();
        Ok(SparseVectors {
            publications,
            submissions,
        })
    }

    fn score_row(
        &self,
        vectors: &SparseVectors,
        sub_idx: usize,
        _submission: &Document,
        _aggregation: Aggregation,
    ) -> Vec<(usize, f32)> {
        let query = &vectors.submissions[sub_idx];
        vectors
            .publications
            .iter()
            .enumerate()
            .map(|(idx, publication)| (idx, query.dot(publication)))
            .collect()
    }
}
