//! TF-IDF keyphrase vectorizer for the sparse backend.
//!
//! Terms are unigrams plus adjacent bigrams, both excluding stopwords. Each
//! document keeps only its `max_num_keyphrases` heaviest terms, so a reviewer
//! publication is compared by its key topics rather than by every word in it.

use crate::text::{is_stopword, tokenize};
use ahash::{AHashMap, AHashSet};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::cmp::Ordering;

#[derive(Debug, Clone)]
pub struct TfidfParams {
    /// Minimum document frequency for a term to enter the vocabulary
    pub min_count_for_vocab: usize,
    pub max_num_keyphrases: usize,
    /// Uniformly sample the vocabulary down to this size when exceeded
    pub max_vocab_size: Option<usize>,
    pub random_seed: u64,
    pub do_lower_case: bool,
}

impl Default for TfidfParams {
    fn default() -> Self {
        Self {
            min_count_for_vocab: 1,
            max_num_keyphrases: 25,
            max_vocab_size: None,
            random_seed: 9,
            do_lower_case: true,
        }
    }
}

/// Unit-norm sparse vector, entries ascending by term index
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SparseVector {
    entries: Vec<(u32, f32)>,
}

impl SparseVector {
    #[inline]
    pub fn entries(&self) -> &[(u32, f32)] {
        &self.entries
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Dot product by merge join; equals cosine since both sides are unit norm
    pub fn dot(&self, other: &SparseVector) -> f32 {
        let (mut i, mut j) = (0, 0);
        let mut sum = 0.0f32;
        while i < self.entries.len() && j < other.entries.len() {
            let (ti, wi) = self.entries[i];
            let (tj, wj) = other.entries[j];
            match ti.cmp(&tj) {
                Ordering::Less => i += 1,
                Ordering::Greater => j += 1,
                Ordering::Equal => {
                    sum += wi * wj;
                    i += 1;
                    j += 1;
                }
            }
        }
        sum
    }
}

#[derive(Debug, Clone)]
pub struct TfidfModel {
    /// Vocabulary, lexicographically sorted; position is the term index
    terms: Vec<String>,
    index: AHashMap<String, u32>,
    idf: Vec<f32>,
    params: TfidfParams,
}

impl TfidfModel {
    /// Fit vocabulary and IDF weights over `docs`.
    pub fn fit<'a, I>(docs: I, params: TfidfParams) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut doc_freq: AHashMap<String, usize> = AHashMap::new();
        let mut num_docs = 0usize;

        for text in docs {
            num_docs += 1;
            let unique: AHashSet<String> = candidate_terms(text, params.do_lower_case).into_iter().collect();
            for term in unique {
                *doc_freq.entry(term).or_insert(0) += 1;
            }
        }

        let mut kept: Vec<(String, usize)> = doc_freq
            .into_iter()
            .filter(|(_, df)| *df >= params.min_count_for_vocab)
            .collect();
        kept.sort_by(|a, b| a.0.cmp(&b.0));

        if let Some(limit) = params.max_vocab_size {
            if kept.len() > limit {
                let mut rng = StdRng::seed_from_u64(params.random_seed);
                let mut picked = rand::seq::index::sample(&mut rng, kept.len(), limit).into_vec();
                picked.sort_unstable();
                kept = picked.into_iter().map(|i| kept[i].clone()).collect();
            }
        }

        let n = num_docs as f32;
        let mut terms = Vec::with_capacity(kept.len());
        let mut idf = Vec::with_capacity(kept.len());
        let mut index = AHashMap::with_capacity(kept.len());
        for (i, (term, df)) in kept.into_iter().enumerate() {
            // Smoothed IDF, always >= 1
            idf.push(((1.0 + n) / (1.0 + df as f32)).ln() + 1.0);
            index.insert(term.clone(), i as u32);
            terms.push(term);
        }

        Self { terms, index, idf, params }
    }

    #[inline]
    #[must_use]
    pub fn vocabulary_size(&self) -> usize {
        self.terms.len()
    }

    #[inline]
    pub fn term(&self, idx: u32) -> &str {
        &self.terms[idx as usize]
    }

    /// Top keyphrases by TF-IDF weight; ties go to the lexicographically
    /// smaller term.
    pub fn keyphrases(&self, text: &str) -> Vec<(String, f32)> {
        self.weighted_terms(text)
            .into_iter()
            .map(|(idx, w)| (self.terms[idx as usize].clone(), w))
            .collect()
    }

    /// Keyphrase vector of `text`, L2-normalised. Empty text gives an empty vector.
    pub fn vectorize(&self, text: &str) -> SparseVector {
        let mut entries = self.weighted_terms(text);
        entries.sort_unstable_by_key(|(idx, _)| *idx);

        let norm = entries.iter().map(|(_, w)| w * w).sum::<f32>().sqrt();
        if norm > 0.0 {
            for (_, w) in &mut entries {
                *w /= norm;
            }
        }
        SparseVector { entries }
    }

    fn weighted_terms(&self, text: &str) -> Vec<(u32, f32)> {
        let mut tf: AHashMap<u32, u32> = AHashMap::new();
        for term in candidate_terms(text, self.params.do_lower_case) {
            if let Some(&idx) = self.index.get(&term) {
                *tf.entry(idx).or_insert(0) += 1;
            }
        }

        let mut weighted: Vec<(u32, f32)> = tf
            .into_iter()
            .map(|(idx, count)| (idx, count as f32 * self.idf[idx as usize]))
            .collect();
        // Index order is lexicographic term order
        weighted.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        weighted.truncate(self.params.max_num_keyphrases);
        weighted
    }
}

fn candidate_terms(text: &str, lowercase: bool) -> Vec<String> {
    let tokens = tokenize(text, lowercase);
    let mut terms: Vec<String> = tokens.iter().filter(|t| !is_stopword(t)).cloned().collect();
    for pair in tokens.windows(2) {
        if !is_stopword(&pair[0]) && !is_stopword(&pair[1]) {
            terms.push(format!("{} {}", pair[0], pair[1]));
        }
    }
    terms
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOCS: [&str; 4] = [
        "Graph neural networks for molecule property prediction",
        "Convex optimization with graph regularization",
        "Neural machine translation with attention",
        "Bandit algorithms and regret bounds",
    ];

    #[test]
    fn test_fit_builds_unigrams_and_bigrams() {
        let model = TfidfModel::fit(DOCS, TfidfParams::default());
        let terms: Vec<&str> = (0..model.vocabulary_size() as u32).map(|i| model.term(i)).collect();
        assert!(terms.contains(&"graph"));
        assert!(terms.contains(&"graph neural"));
        assert!(!terms.contains(&"for"));
        assert!(terms.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_min_count_filters_rare_terms() {
        let params = TfidfParams {
            min_count_for_vocab: 2,
            ..TfidfParams::default()
        };
        let model = TfidfModel::fit(DOCS, params);
        let terms: Vec<&str> = (0..model.vocabulary_size() as u32).map(|i| model.term(i)).collect();
        assert_eq!(terms, vec!["graph", "neural"]);
    }

    #[test]
    fn test_keyphrase_cap_and_tie_break() {
        let params = TfidfParams {
            max_num_keyphrases: 2,
            ..TfidfParams::default()
        };
        let model = TfidfModel::fit(["zeta alpha", "mu"], params);
        // "alpha", "zeta" and "zeta alpha" all have tf 1 and df 1
        let phrases = model.keyphrases("zeta alpha");
        assert_eq!(phrases.len(), 2);
        assert_eq!(phrases[0].0, "alpha");
        assert_eq!(phrases[1].0, "zeta");
    }

    #[test]
    fn test_cosine_of_identical_text_is_one() {
        let model = TfidfModel::fit(DOCS, TfidfParams::default());
        let a = model.vectorize(DOCS[0]);
        let b = model.vectorize(DOCS[0]);
        assert!((a.dot(&b) - 1.0).abs() < 1e-5);

        let c = model.vectorize(DOCS[3]);
        assert_eq!(a.dot(&c), 0.0);
    }

    #[test]
    fn test_empty_text_is_zero_vector() {
        let model = TfidfModel::fit(DOCS, TfidfParams::default());
        let empty = model.vectorize("");
        assert!(empty.is_empty());
        assert_eq!(empty.dot(&model.vectorize(DOCS[1])), 0.0);
    }

    #[test]
    fn test_vocab_sampling_is_seeded() {
        let params = TfidfParams {
            max_vocab_size: Some(5),
            random_seed: 42,
            ..TfidfParams::default()
        };
        let a = TfidfModel::fit(DOCS, params.clone());
        let b = TfidfModel::fit(DOCS, params);
        assert_eq!(a.vocabulary_size(), 5);
        assert_eq!(a.terms, b.terms);
    }
}
