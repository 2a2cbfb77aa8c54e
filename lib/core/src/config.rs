//! Run configuration.
//!
//! [`ModelConfig`] mirrors the JSON config file and is deliberately loose:
//! unknown keys are ignored and most keys have defaults. [`ModelConfig::validate`]
//! turns it into a typed [`EngineConfig`] and rejects every inconsistent
//! combination before any document is scored.

use crate::bids::{BidAdjuster, BidScale, DEFAULT_BID_VALUES, DEFAULT_POSITIVE_BID_VALUES};
use crate::bm25::{DEFAULT_B, DEFAULT_K1};
use crate::corpus::TextField;
use crate::dense::DenseParams;
use crate::encoder::{Device, DEFAULT_HASHING_DIM};
use crate::hnsw::HnswParams;
use crate::knn::IndexKind;
use crate::ranker::{Aggregation, Ranker};
use crate::tfidf::TfidfParams;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Scoring strategy family selected by the `model` key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    Lexical,
    Sparse,
    Dense,
}

impl FromStr for ModelKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bm25" => Ok(ModelKind::Lexical),
            "tfidf" => Ok(ModelKind::Sparse),
            "elmo" | "specter" | "dense" => Ok(ModelKind::Dense),
            _ => Err(Error::UnknownModel(s.to_string())),
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelKind::Lexical => write!(f, "bm25"),
            ModelKind::Sparse => write!(f, "tfidf"),
            ModelKind::Dense => write!(f, "dense"),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub dataset: DatasetConfig,
    #[serde(default)]
    pub model_params: ModelParams,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetConfig {
    #[serde(default)]
    pub directory: Option<PathBuf>,
    #[serde(default = "default_bid_values")]
    pub bid_values: Vec<String>,
    #[serde(default = "default_positive_bid_values")]
    pub positive_bid_values: Vec<String>,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            directory: None,
            bid_values: default_bid_values(),
            positive_bid_values: default_positive_bid_values(),
        }
    }
}

fn default_bid_values() -> Vec<String> {
    DEFAULT_BID_VALUES.iter().map(|v| v.to_string()).collect()
}

fn default_positive_bid_values() -> Vec<String> {
    DEFAULT_POSITIVE_BID_VALUES.iter().map(|v| v.to_string()).collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelParams {
    #[serde(default)]
    pub use_title: bool,
    #[serde(default)]
    pub use_abstract: bool,
    /// Scoring threads; rayon's default when unset
    #[serde(default)]
    pub workers: Option<usize>,
    #[serde(default)]
    pub knn: Option<usize>,
    #[serde(default)]
    pub sparse_value: Option<usize>,
    #[serde(default)]
    pub average_score: bool,
    #[serde(default)]
    pub max_score: bool,

    #[serde(default = "default_bm25_k1")]
    pub bm25_k1: f32,
    #[serde(default = "default_bm25_b")]
    pub bm25_b: f32,

    #[serde(default)]
    pub use_cuda: bool,
    #[serde(default)]
    pub cuda_device: usize,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Reuse vectors already in the embedding cache
    #[serde(default, alias = "reuse_cached_vectors", alias = "skip_specter")]
    pub skip_elmo: bool,
    #[serde(default = "default_nn_candidates")]
    pub nn_candidates: usize,
    #[serde(default = "default_index")]
    pub index: String,
    #[serde(default = "default_hnsw_m")]
    pub hnsw_m: usize,
    #[serde(default = "default_hnsw_ef_construction")]
    pub hnsw_ef_construction: usize,
    #[serde(default = "default_hnsw_ef_search")]
    pub hnsw_ef_search: usize,
    #[serde(default = "default_embedding_dim")]
    pub embedding_dim: usize,
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,

    #[serde(default = "default_min_count_for_vocab")]
    pub min_count_for_vocab: usize,
    #[serde(default = "default_random_seed")]
    pub random_seed: u64,
    #[serde(default = "default_max_num_keyphrases")]
    pub max_num_keyphrases: usize,
    #[serde(default = "default_do_lower_case")]
    pub do_lower_case: bool,
    #[serde(default)]
    pub max_vocab_size: Option<usize>,

    #[serde(default)]
    pub use_bids: bool,
    #[serde(default = "default_bid_adjustment")]
    pub positive_bid_bonus: f32,
    #[serde(default = "default_bid_adjustment")]
    pub negative_bid_penalty: f32,

    #[serde(default)]
    pub scores_path: Option<PathBuf>,
}

fn default_bm25_k1() -> f32 {
    DEFAULT_K1
}

fn default_bm25_b() -> f32 {
    DEFAULT_B
}

fn default_batch_size() -> usize {
    32
}

fn default_nn_candidates() -> usize {
    500
}

fn default_index() -> String {
    "exact".to_string()
}

fn default_hnsw_m() -> usize {
    16
}

fn default_hnsw_ef_construction() -> usize {
    200
}

fn default_hnsw_ef_search() -> usize {
    64
}

fn default_embedding_dim() -> usize {
    DEFAULT_HASHING_DIM
}

fn default_min_count_for_vocab() -> usize {
    1
}

fn default_random_seed() -> u64 {
    9
}

fn default_max_num_keyphrases() -> usize {
    25
}

fn default_do_lower_case() -> bool {
    true
}

fn default_bid_adjustment() -> f32 {
    0.1
}

impl Default for ModelParams {
    fn default() -> Self {
        Self {
            use_title: false,
            use_abstract: false,
            workers: None,
            knn: None,
            sparse_value: None,
            average_score: false,
            max_score: false,
            bm25_k1: default_bm25_k1(),
            bm25_b: default_bm25_b(),
            use_cuda: false,
            cuda_device: 0,
            batch_size: default_batch_size(),
            skip_elmo: false,
            nn_candidates: default_nn_candidates(),
            index: default_index(),
            hnsw_m: default_hnsw_m(),
            hnsw_ef_construction: default_hnsw_ef_construction(),
            hnsw_ef_search: default_hnsw_ef_search(),
            embedding_dim: default_embedding_dim(),
            cache_dir: None,
            min_count_for_vocab: default_min_count_for_vocab(),
            random_seed: default_random_seed(),
            max_num_keyphrases: default_max_num_keyphrases(),
            do_lower_case: default_do_lower_case(),
            max_vocab_size: None,
            use_bids: false,
            positive_bid_bonus: default_bid_adjustment(),
            negative_bid_penalty: default_bid_adjustment(),
            scores_path: None,
        }
    }
}

/// Validated, typed configuration for one run
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub name: String,
    pub model: ModelKind,
    pub text_field: TextField,
    pub aggregation: Aggregation,
    pub knn: Option<usize>,
    pub sparse_value: Option<usize>,
    pub workers: Option<usize>,
    pub bm25_k1: f32,
    pub bm25_b: f32,
    pub tfidf: TfidfParams,
    pub dense: DenseParams,
    /// Present only when bids are enabled
    pub bids: Option<BidAdjuster>,
    pub dataset_dir: Option<PathBuf>,
    pub cache_dir: Option<PathBuf>,
    pub scores_path: Option<PathBuf>,
}

impl EngineConfig {
    #[must_use]
    pub fn ranker(&self) -> Ranker {
        Ranker::new(self.knn).with_sparse_value(self.sparse_value)
    }
}

impl ModelConfig {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn validate(&self) -> Result<EngineConfig> {
        let params = &self.model_params;
        let model: ModelKind = self.model.parse()?;

        let text_field = match (params.use_title, params.use_abstract) {
            (true, false) => TextField::Title,
            (false, true) => TextField::Abstract,
            (true, true) => {
                return Err(Error::InvalidConfig(
                    "use_title and use_abstract are mutually exclusive".to_string(),
                ))
            }
            (false, false) => {
                return Err(Error::InvalidConfig(
                    "exactly one of use_title or use_abstract must be set".to_string(),
                ))
            }
        };

        let aggregation = match (params.max_score, params.average_score) {
            (true, true) => {
                return Err(Error::InvalidConfig(
                    "max_score and average_score are mutually exclusive".to_string(),
                ))
            }
            (_, true) => Aggregation::Mean,
            _ => Aggregation::Max,
        };

        if params.workers == Some(0) {
            return Err(Error::InvalidConfig("workers must be positive".to_string()));
        }
        if params.sparse_value == Some(0) {
            return Err(Error::InvalidConfig("sparse_value must be positive".to_string()));
        }
        if !(params.bm25_k1 >= 0.0 && (0.0..=1.0).contains(&params.bm25_b)) {
            return Err(Error::InvalidConfig(
                "bm25_k1 must be non-negative and bm25_b within [0, 1]".to_string(),
            ));
        }
        if params.batch_size == 0 {
            return Err(Error::InvalidConfig("batch_size must be positive".to_string()));
        }
        if params.nn_candidates == 0 {
            return Err(Error::InvalidConfig("nn_candidates must be positive".to_string()));
        }
        if params.embedding_dim == 0 {
            return Err(Error::InvalidConfig("embedding_dim must be positive".to_string()));
        }
        if params.max_vocab_size == Some(0) {
            return Err(Error::InvalidConfig("max_vocab_size must be positive".to_string()));
        }

        let index = match params.index.trim().to_ascii_lowercase().as_str() {
            "exact" => IndexKind::Exact,
            "hnsw" => {
                if params.hnsw_m == 0 || params.hnsw_ef_construction == 0 || params.hnsw_ef_search == 0 {
                    return Err(Error::InvalidConfig(
                        "hnsw_m, hnsw_ef_construction and hnsw_ef_search must be positive".to_string(),
                    ));
                }
                IndexKind::Hnsw(HnswParams {
                    m: params.hnsw_m,
                    ef_construction: params.hnsw_ef_construction,
                    ef_search: params.hnsw_ef_search,
                    seed: params.random_seed,
                    ..HnswParams::default()
                })
            }
            other => {
                return Err(Error::InvalidConfig(format!("unknown index '{}'", other)));
            }
        };

        // Checked even when bids are off
        let scale = BidScale::new(
            self.dataset.bid_values.clone(),
            self.dataset.positive_bid_values.clone(),
        )?;
        let adjuster = BidAdjuster::new(scale, params.positive_bid_bonus, params.negative_bid_penalty)?;

        let device = if params.use_cuda {
            Device::Cuda(params.cuda_device)
        } else {
            Device::Cpu
        };

        Ok(EngineConfig {
            name: self.name.clone(),
            model,
            text_field,
            aggregation,
            knn: params.knn,
            sparse_value: params.sparse_value,
            workers: params.workers,
            bm25_k1: params.bm25_k1,
            bm25_b: params.bm25_b,
            tfidf: TfidfParams {
                min_count_for_vocab: params.min_count_for_vocab,
                max_num_keyphrases: params.max_num_keyphrases,
                max_vocab_size: params.max_vocab_size,
                random_seed: params.random_seed,
                do_lower_case: params.do_lower_case,
            },
            dense: DenseParams {
                device,
                batch_size: params.batch_size,
                reuse_cached_vectors: params.skip_elmo,
                nn_candidates: params.nn_candidates,
                index,
                embedding_dim: params.embedding_dim,
            },
            bids: params.use_bids.then_some(adjuster),
            dataset_dir: self.dataset.directory.clone(),
            cache_dir: params.cache_dir.clone(),
            scores_path: params.scores_path.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(params: serde_json::Value) -> ModelConfig {
        let raw = serde_json::json!({
            "name": "test",
            "model": "bm25",
            "model_params": params,
        });
        ModelConfig::from_json(&raw.to_string()).unwrap()
    }

    #[test]
    fn test_model_kind_parsing() {
        assert_eq!("bm25".parse::<ModelKind>().unwrap(), ModelKind::Lexical);
        assert_eq!("TFIDF".parse::<ModelKind>().unwrap(), ModelKind::Sparse);
        assert_eq!("specter".parse::<ModelKind>().unwrap(), ModelKind::Dense);
        assert_eq!("elmo".parse::<ModelKind>().unwrap(), ModelKind::Dense);
        assert!(matches!("lda".parse::<ModelKind>(), Err(Error::UnknownModel(_))));
    }

    #[test]
    fn test_defaults() {
        let engine = config(serde_json::json!({"use_title": true})).validate().unwrap();
        assert_eq!(engine.text_field, TextField::Title);
        assert_eq!(engine.aggregation, Aggregation::Max);
        assert_eq!(engine.bm25_k1, 1.5);
        assert_eq!(engine.bm25_b, 0.75);
        assert_eq!(engine.dense.nn_candidates, 500);
        assert_eq!(engine.dense.index, IndexKind::Exact);
        assert_eq!(engine.dense.device, Device::Cpu);
        assert!(engine.bids.is_none());
    }

    #[test]
    fn test_title_abstract_exclusive() {
        let both = config(serde_json::json!({"use_title": true, "use_abstract": true}));
        assert!(matches!(both.validate(), Err(Error::InvalidConfig(_))));
        let neither = config(serde_json::json!({}));
        assert!(matches!(neither.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_max_average_exclusive() {
        let both = config(serde_json::json!({"use_abstract": true, "max_score": true, "average_score": true}));
        assert!(matches!(both.validate(), Err(Error::InvalidConfig(_))));
        let mean = config(serde_json::json!({"use_abstract": true, "average_score": true}));
        assert_eq!(mean.validate().unwrap().aggregation, Aggregation::Mean);
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let cfg = config(serde_json::json!({"use_title": true, "batch_size": 0}));
        assert!(matches!(cfg.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_reuse_aliases() {
        for key in ["skip_elmo", "reuse_cached_vectors", "skip_specter"] {
            let mut params = serde_json::json!({"use_title": true});
            params[key] = serde_json::Value::Bool(true);
            let cfg = config(params);
            assert!(cfg.validate().unwrap().dense.reuse_cached_vectors, "{}", key);
        }
    }

    #[test]
    fn test_bid_scale_checked() {
        let raw = serde_json::json!({
            "model": "tfidf",
            "dataset": {"bid_values": ["Yes", "No"], "positive_bid_values": ["Absolutely"]},
            "model_params": {"use_title": true, "use_bids": true},
        });
        let cfg = ModelConfig::from_json(&raw.to_string()).unwrap();
        assert!(matches!(cfg.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_hnsw_params_carry_seed() {
        let cfg = config(serde_json::json!({
            "use_title": true, "index": "hnsw", "hnsw_m": 8, "random_seed": 42
        }));
        match cfg.validate().unwrap().dense.index {
            IndexKind::Hnsw(params) => {
                assert_eq!(params.m, 8);
                assert_eq!(params.seed, 42);
            }
            other => panic!("unexpected index {:?}", other),
        }
    }

    #[test]
    fn test_cuda_device_selected() {
        let cfg = config(serde_json::json!({"use_abstract": true, "use_cuda": true}));
        assert_eq!(cfg.validate().unwrap().dense.device, Device::Cuda(0));
    }
}
