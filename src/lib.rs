//! # affinity
//!
//! Paper-reviewer affinity scoring for conference assignment.
//!
//! Given reviewer archives and a set of submissions, affinity ranks reviewers
//! by topical fit to every submission with one of three interchangeable
//! backends, optionally blends in bids, and exports a tie-aware top-K list.
//!
//! ## Quick Start
//!
//! ### As a CLI
//!
//! ```bash
//! cargo install affinity
//! affinity config.json --data-dir ./dataset --scores ./scores.csv
//! ```
//!
//! ### As a Library
//!
//! ```rust,no_run
//! use affinity::prelude::*;
//!
//! let config = ModelConfig::from_path("config.json").unwrap().validate().unwrap();
//! let corpus = DatasetReader::new("./dataset").read().unwrap();
//! let backend = Backend::from_config(&config, None).unwrap();
//!
//! let mut run = AffinityRun::new(&corpus);
//! run.execute(&backend, &config).unwrap();
//! run.export(&mut CsvExporter::new("scores.csv")).unwrap();
//! ```
//!
//! ## Crate Structure
//!
//! - `affinity-core` - Data model, config, backends, nearest-neighbor index, bids, ranking
//! - `affinity-storage` - Dataset reader, LMDB embedding cache, CSV export
//!
//! ## Models
//!
//! - **bm25**: Okapi BM25 over the publication pool
//! - **tfidf**: Cosine similarity of TF-IDF keyphrase vectors
//! - **dense** (also `elmo`, `specter`): Embedding nearest neighbors, exact or HNSW

// Re-export core types
pub use affinity_core::{
    leave_one_out, AffinityRun, AffinityScore, Aggregation, Backend, Bid, BidAdjuster, BidScale, Corpus,
    Device, Document, EmbeddingCache, Encoder, EngineConfig, Error, HashingEncoder, IndexKind, MemoryCache,
    ModelConfig, ModelKind, Ranker, RecoveryReport, Result, RunStage, ScoreSink, ScoringBackend, TextField,
};

// Re-export storage
pub use affinity_storage::{CsvExporter, DatasetReader, LmdbEmbeddingCache};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        AffinityRun, AffinityScore, Aggregation, Backend, Corpus, CsvExporter, DatasetReader, Document,
        EngineConfig, Error, LmdbEmbeddingCache, ModelConfig, Ranker, Result, ScoreSink, TextField,
    };
}
