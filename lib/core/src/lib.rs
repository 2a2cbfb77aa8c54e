//! # affinity Core
//!
//! Core library for the affinity paper-reviewer scoring engine.
//!
//! This crate provides the data model and the scoring pipeline:
//!
//! - [`Corpus`] - Reviewer archives, submissions and bids
//! - [`ModelConfig`] - JSON run configuration, validated into [`EngineConfig`]
//! - [`Backend`] - BM25, TF-IDF keyphrase and dense embedding scoring
//! - [`HnswIndex`] / [`ExactIndex`] - Nearest-neighbor search for the dense backend
//! - [`BidAdjuster`] - Additive bid bonus and penalty
//! - [`Ranker`] - Per-submission ordering and top-K cut with ties
//! - [`AffinityRun`] - The score, adjust, rank, export state machine
//!
//! ## Example
//!
//! ```rust
//! use affinity_core::{AffinityRun, Backend, Corpus, Document, ModelConfig};
//!
//! let mut corpus = Corpus::new();
//! corpus.add_publication("~Ada_Lovelace1", Document::new("p1", "Analytical engines", ""));
//! corpus.add_submission(Document::new("s1", "Notes on the analytical engine", ""));
//!
//! let config = ModelConfig::from_json(
//!     r#"{"model": "bm25", "model_params": {"use_title": true, "knn": 10}}"#,
//! ).unwrap().validate().unwrap();
//! let backend = Backend::from_config(&config, None).unwrap();
//!
//! let mut run = AffinityRun::new(&corpus);
//! run.execute(&backend, &config).unwrap();
//! assert_eq!(run.scores()[0].reviewer_id, "~Ada_Lovelace1");
//! ```

pub mod backend;
pub mod bids;
pub mod bm25;
pub mod cache;
pub mod config;
pub mod corpus;
pub mod dense;
pub mod encoder;
pub mod error;
pub mod hnsw;
pub mod knn;
pub mod lexical;
pub mod ranker;
pub mod recovery;
pub mod run;
pub mod sparse;
pub mod text;
pub mod tfidf;
pub mod vector;

/// Portable vector kernels
///
/// Eight-lane accumulation with a fixed reduction order, so results do not
/// depend on the target's SIMD width.
pub mod simd;

pub use backend::{Backend, ScoringBackend};
pub use bids::{BidAdjuster, BidPolarity, BidScale};
pub use bm25::BM25Index;
pub use cache::{EmbeddingCache, MemoryCache};
pub use config::{DatasetConfig, EngineConfig, ModelConfig, ModelKind, ModelParams};
pub use corpus::{AffinityScore, Bid, Corpus, Document, PublicationPool, TextField};
pub use dense::{DenseBackend, DenseParams};
pub use encoder::{Device, Encoder, HashingEncoder};
pub use error::{Error, Result};
pub use hnsw::{HnswIndex, HnswParams};
pub use knn::{ExactIndex, IndexKind, NearestNeighborIndex, Neighbor};
pub use lexical::LexicalBackend;
pub use ranker::{Aggregation, Ranker};
pub use recovery::{leave_one_out, RecoveryReport};
pub use run::{AffinityRun, RunStage, ScoreSink};
pub use sparse::SparseBackend;
pub use tfidf::{SparseVector, TfidfModel, TfidfParams};
pub use vector::Vector;
