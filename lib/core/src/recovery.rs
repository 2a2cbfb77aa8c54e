//! Leave-one-out author recovery.
//!
//! Each trial removes one publication from its author's archive, scores it as
//! if it were a submission, and records where the author lands in the
//! ranking. Recall@K is the share of trials whose author is within the first
//! K reviewers.

use crate::backend::Backend;
use crate::corpus::{Corpus, Document};
use crate::ranker::{Aggregation, Ranker};
use crate::Result;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecoveryReport {
    pub trials: usize,
    /// `(k, recall)` ascending by k
    pub recall_at: Vec<(usize, f32)>,
}

impl RecoveryReport {
    pub fn recall(&self, k: usize) -> Option<f32> {
        self.recall_at.iter().find(|(at, _)| *at == k).map(|(_, r)| *r)
    }
}

/// Run up to `max_trials` trials (all when `None`), taking the first
/// publication of every reviewer that owns at least two, in reviewer order.
pub fn leave_one_out(
    corpus: &Corpus,
    backend: &Backend,
    aggregation: Aggregation,
    ks: &[usize],
    max_trials: Option<usize>,
) -> Result<RecoveryReport> {
    let mut ks: Vec<usize> = ks.to_vec();
    ks.sort_unstable();
    ks.dedup();

    let held_out: Vec<(&str, &Document)> = corpus
        .archives()
        .iter()
        .filter(|(_, publications)| publications.len() >= 2)
        .map(|(reviewer_id, publications)| (reviewer_id.as_str(), &publications[0]))
        .take(max_trials.unwrap_or(usize::MAX))
        .collect();
    info!("Leave-one-out over {} held-out publications", held_out.len());

    let ranker = Ranker::default();
    let mut ranks: Vec<Option<usize>> = Vec::with_capacity(held_out.len());
    for (reviewer_id, publication) in &held_out {
        let Some((mut reduced, removed)) = corpus.without_publication(reviewer_id, &publication.id) else {
            continue;
        };
        reduced.clear_submissions();
        let pseudo_id = format!("heldout:{}", removed.id);
        reduced.add_submission(Document {
            id: pseudo_id,
            ..removed
        });

        let ranked = ranker.rank(backend.score_all(&reduced, aggregation)?);
        let rank = ranked
            .iter()
            .position(|s| s.reviewer_id == *reviewer_id)
            .map(|p| p + 1);
        debug!("{} recovered at rank {:?}", reviewer_id, rank);
        ranks.push(rank);
    }

    let trials = ranks.len();
    let recall_at = ks
        .into_iter()
        .map(|k| {
            let hits = ranks.iter().filter(|r| matches!(r, Some(rank) if *rank <= k)).count();
            let recall = if trials == 0 { 0.0 } else { hits as f32 / trials as f32 };
            (k, recall)
        })
        .collect();

    Ok(RecoveryReport { trials, recall_at })
}
