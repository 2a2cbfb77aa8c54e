//! One scoring run, driven through its stages in order.
//!
//! ```text
//! Unscored --score--> Scored --adjust--> Adjusted
//!                       |                   |
//!                       +-------rank--------+--> Ranked --export--> Exported
//! ```
//!
//! Any other call is an [`Error::InvalidTransition`]. `Exported` is terminal.

use crate::backend::Backend;
use crate::bids::BidAdjuster;
use crate::config::EngineConfig;
use crate::corpus::{AffinityScore, Corpus};
use crate::ranker::{Aggregation, Ranker};
use crate::{Error, Result};
use std::fmt;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStage {
    Unscored,
    Scored,
    Adjusted,
    Ranked,
    Exported,
}

impl fmt::Display for RunStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunStage::Unscored => "unscored",
            RunStage::Scored => "scored",
            RunStage::Adjusted => "adjusted",
            RunStage::Ranked => "ranked",
            RunStage::Exported => "exported",
        };
        f.write_str(name)
    }
}

/// Destination for a ranked score set
pub trait ScoreSink {
    fn write_scores(&mut self, scores: &[AffinityScore]) -> Result<()>;
}

pub struct AffinityRun<'a> {
    corpus: &'a Corpus,
    stage: RunStage,
    scores: Vec<AffinityScore>,
}

impl<'a> AffinityRun<'a> {
    pub fn new(corpus: &'a Corpus) -> Self {
        Self {
            corpus,
            stage: RunStage::Unscored,
            scores: Vec::new(),
        }
    }

    #[inline]
    pub fn stage(&self) -> RunStage {
        self.stage
    }

    #[inline]
    pub fn scores(&self) -> &[AffinityScore] {
        &self.scores
    }

    pub fn into_scores(self) -> Vec<AffinityScore> {
        self.scores
    }

    fn check(&self, allowed: &[RunStage], to: RunStage) -> Result<()> {
        if allowed.contains(&self.stage) {
            Ok(())
        } else {
            Err(Error::InvalidTransition {
                from: self.stage.to_string(),
                to: to.to_string(),
            })
        }
    }

    pub fn score(&mut self, backend: &Backend, aggregation: Aggregation) -> Result<()> {
        self.check(&[RunStage::Unscored], RunStage::Scored)?;
        self.scores = backend.score_all(self.corpus, aggregation)?;
        self.stage = RunStage::Scored;
        Ok(())
    }

    pub fn adjust(&mut self, adjuster: &BidAdjuster) -> Result<()> {
        self.check(&[RunStage::Scored], RunStage::Adjusted)?;
        let scores = std::mem::take(&mut self.scores);
        self.scores = adjuster.adjust(scores, self.corpus.bids())?;
        self.stage = RunStage::Adjusted;
        Ok(())
    }

    pub fn rank(&mut self, ranker: &Ranker) -> Result<()> {
        self.check(&[RunStage::Scored, RunStage::Adjusted], RunStage::Ranked)?;
        let scores = std::mem::take(&mut self.scores);
        self.scores = ranker.rank(scores);
        info!("Ranked {} scores", self.scores.len());
        self.stage = RunStage::Ranked;
        Ok(())
    }

    pub fn export(&mut self, sink: &mut dyn ScoreSink) -> Result<()> {
        self.check(&[RunStage::Ranked], RunStage::Exported)?;
        sink.write_scores(&self.scores)?;
        self.stage = RunStage::Exported;
        Ok(())
    }

    /// Score, adjust when bids are enabled, and rank, all per `config`.
    pub fn execute(&mut self, backend: &Backend, config: &EngineConfig) -> Result<()> {
        self.score(backend, config.aggregation)?;
        if let Some(adjuster) = &config.bids {
            self.adjust(adjuster)?;
        }
        self.rank(&config.ranker())
    }
}
