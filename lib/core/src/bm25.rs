// BM25 inverted index over the reviewer publication pool.
// Built once per run, then read-only and shared across scoring workers.
use ahash::AHashMap;

pub const DEFAULT_K1: f32 = 1.5;
pub const DEFAULT_B: f32 = 0.75;

#[derive(Debug, Clone, Copy)]
struct Posting {
    doc: u32,
    tf: u32,
}

#[derive(Debug, Clone)]
pub struct BM25Index {
    // term -> postings, ascending by doc
    inverted_index: AHashMap<String, Vec<Posting>>,
    doc_lengths: Vec<u32>,
    avgdl: f32,
    k1: f32, // term frequency saturation parameter
    b: f32,  // length normalization parameter
}

impl BM25Index {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::with_params(DEFAULT_K1, DEFAULT_B)
    }

    #[inline]
    #[must_use]
    pub fn with_params(k1: f32, b: f32) -> Self {
        Self {
            inverted_index: AHashMap::new(),
            doc_lengths: Vec::new(),
            avgdl: 0.0,
            k1,
            b,
        }
    }

    /// Build from pre-tokenized documents; document `i` gets index `i`.
    pub fn build<I>(docs: I, k1: f32, b: f32) -> Self
    where
        I: IntoIterator<Item = Vec<String>>,
    {
        let mut index = Self::with_params(k1, b);
        for tokens in docs {
            index.push_doc(tokens);
        }
        index.finish();
        index
    }

    fn push_doc(&mut self, tokens: Vec<String>) {
        let doc = self.doc_lengths.len() as u32;
        self.doc_lengths.push(tokens.len() as u32);

        // Count term frequencies
        let mut term_freqs: AHashMap<String, u32> = AHashMap::new();
        for token in tokens {
            *term_freqs.entry(token).or_insert(0) += 1;
        }

        for (term, tf) in term_freqs {
            self.inverted_index.entry(term).or_default().push(Posting { doc, tf });
        }
    }

    fn finish(&mut self) {
        let total: u64 = self.doc_lengths.iter().map(|&l| l as u64).sum();
        self.avgdl = if self.doc_lengths.is_empty() {
            0.0
        } else {
            total as f32 / self.doc_lengths.len() as f32
        };
    }

    /// Non-negative IDF: ln(1 + (N - df + 0.5) / (df + 0.5))
    #[inline]
    fn idf(&self, df: usize) -> f32 {
        let n = self.doc_lengths.len() as f32;
        let df = df as f32;
        (1.0 + (n - df + 0.5) / (df + 0.5)).ln()
    }

    /// Score the query against every document. Entry `i` is document `i`'s score;
    /// documents sharing no term with the query score 0.
    pub fn score_all(&self, query_terms: &[String]) -> Vec<f32> {
        let mut scores = vec![0.0f32; self.doc_lengths.len()];
        if query_terms.is_empty() || self.avgdl == 0.0 {
            return scores;
        }

        for term in query_terms {
            if let Some(postings) = self.inverted_index.get(term) {
                let idf = self.idf(postings.len());
                for posting in postings {
                    let doc_len = self.doc_lengths[posting.doc as usize];
                    scores[posting.doc as usize] += self.calculate_bm25_score(posting.tf, doc_len, idf);
                }
            }
        }

        scores
    }

    #[inline]
    fn calculate_bm25_score(&self, tf: u32, doc_len: u32, idf: f32) -> f32 {
        let tf_f32 = tf as f32;
        let doc_len_f32 = doc_len as f32;

        // BM25 formula: idf * (tf * (k1 + 1)) / (tf + k1 * (1 - b + b * (doc_len / avgdl)))
        let numerator = tf_f32 * (self.k1 + 1.0);
        let denominator = tf_f32 + self.k1 * (1.0 - self.b + self.b * (doc_len_f32 / self.avgdl));

        idf * (numerator / denominator)
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.doc_lengths.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.doc_lengths.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn vocabulary_size(&self) -> usize {
        self.inverted_index.len()
    }
}

impl Default for BM25Index {
    fn default() -> Self {
        Self::new()
    }
}
