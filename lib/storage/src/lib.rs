//! # affinity Storage
//!
//! File-system glue around the scoring engine:
//!
//! - [`DatasetReader`] - Loads archives, submissions and bids into a [`affinity_core::Corpus`]
//! - [`LmdbEmbeddingCache`] - Persistent embedding cache on LMDB
//! - [`CsvExporter`] - Write-once CSV score export

pub mod dataset;
pub mod export;
pub mod lmdb_cache;

pub use dataset::DatasetReader;
pub use export::CsvExporter;
pub use lmdb_cache::LmdbEmbeddingCache;
