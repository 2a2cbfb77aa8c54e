// BM25 backend: one inverted index over the publication pool, submissions as
// queries.
use crate::backend::ScoringBackend;
use crate::bm25::BM25Index;
use crate::config::EngineConfig;
use crate::corpus::{Document, PublicationPool, TextField};
use crate::ranker::Aggregation;
use crate::text::tokenize;
use crate::Result;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct LexicalBackend {
    text_field: TextField,
    k1: f32,
    b: f32,
    workers: Option<usize>,
}

impl LexicalBackend {
    pub fn new(text_field: TextField, k1: f32, b: f32, workers: Option<usize>) -> Self {
        Self {
            text_field,
            k1,
            b,
            workers,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.text_field, config.bm25_k1, config.bm25_b, config.workers)
    }
}

impl ScoringBackend for LexicalBackend {
    type Prepared = BM25Index;

    fn name(&self) -> &'static str {
        "bm25"
    }

    fn workers(&self) -> Option<usize> {
        self.workers
    }

    fn prepare(&self, pool: &PublicationPool, _submissions: &[&Document]) -> Result<BM25Index> {
        let index = BM25Index::build(
            pool.documents()
                .iter()
                .map(|doc| tokenize(doc.text(self.text_field), true)),
            self.k1,
            self.b,
        );
        debug!(
            "Built BM25 index: {} documents, {} terms",
            index.len(),
            index.vocabulary_size()
        );
        Ok(index)
    }

    fn score_row(
        &self,
        index: &BM25Index,
        _sub_idx: usize,
        submission: &Document,
        _aggregation: Aggregation,
    ) -> Vec<(usize, f32)> {
        let query = tokenize(submission.text(self.text_field), true);
        index.score_all(&query).into_iter().enumerate().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::Corpus;

    #[test]
    fn test_identical_publication_scores_highest() {
        let mut corpus = Corpus::new();
        corpus.add_publication("~A1", Document::new("a1", "", "sparse attention for long documents"));
        corpus.add_publication("~B1", Document::new("b1", "", "protein folding with diffusion"));
        corpus.add_submission(Document::new("s1", "", "sparse attention for long documents"));

        let backend = LexicalBackend::new(TextField::Abstract, 1.5, 0.75, Some(1));
        let scores = backend.score_all(&corpus, Aggregation::Max).unwrap();
        assert_eq!(scores.len(), 2);
        assert_eq!(scores[0].reviewer_id, "~A1");
        assert!(scores[0].score > 0.0);
        assert_eq!(scores[1].score, 0.0);
    }

    #[test]
    fn test_empty_text_scores_zero() {
        let mut corpus = Corpus::new();
        corpus.add_publication("~A1", Document::new("a1", "robust optimization", ""));
        corpus.add_submission(Document::new("s1", "   ", ""));

        let backend = LexicalBackend::new(TextField::Title, 1.5, 0.75, None);
        let scores = backend.score_all(&corpus, Aggregation::Max).unwrap();
        assert_eq!(scores.len(), 1);
        assert_eq!(scores[0].score, 0.0);
    }

    #[test]
    fn test_worker_count_does_not_change_scores() {
        let mut corpus = Corpus::new();
        for i in 0..20 {
            corpus.add_publication(
                format!("~R{}", i % 5),
                Document::new(format!("p{}", i), format!("topic {} model {}", i % 3, i % 7), ""),
            );
        }
        for i in 0..8 {
            corpus.add_submission(Document::new(format!("s{}", i), format!("model {} topic", i), ""));
        }

        let one = LexicalBackend::new(TextField::Title, 1.5, 0.75, Some(1))
            .score_all(&corpus, Aggregation::Max)
            .unwrap();
        let four = LexicalBackend::new(TextField::Title, 1.5, 0.75, Some(4))
            .score_all(&corpus, Aggregation::Max)
            .unwrap();
        assert_eq!(one, four);
    }
}
