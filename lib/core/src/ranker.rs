//! Aggregation, ordering and tie-aware truncation of affinity scores.

use crate::corpus::{AffinityScore, PublicationPool};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Keep the first `k` items of a list already sorted by descending score, plus
/// every following item whose score is bit-identical to the k-th.
pub fn truncate_with_ties<T, F>(items: &mut Vec<T>, k: usize, score: F)
where
    F: Fn(&T) -> f32,
{
    if items.len() <= k {
        return;
    }
    if k == 0 {
        items.clear();
        return;
    }
    let boundary = score(&items[k - 1]).to_bits();
    let mut keep = k;
    while keep < items.len() && score(&items[keep]).to_bits() == boundary {
        keep += 1;
    }
    items.truncate(keep);
}

/// How publication-level scores collapse into one reviewer score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Aggregation {
    /// Reviewer is represented by their best-matching publication
    #[default]
    Max,
    Mean,
}

impl Aggregation {
    /// Collapse a row of (publication index, score) pairs for one submission
    /// into one score per owning reviewer, ascending by reviewer id.
    pub fn aggregate_row(&self, submission_id: &str, pool: &PublicationPool, row: &[(usize, f32)]) -> Vec<AffinityScore> {
        // reviewer idx -> (running value, count)
        let mut per_reviewer: BTreeMap<usize, (f32, u32)> = BTreeMap::new();
        for &(doc_idx, score) in row {
            for &reviewer_idx in pool.owners(doc_idx) {
                per_reviewer
                    .entry(reviewer_idx)
                    .and_modify(|(acc, count)| {
                        match self {
                            Aggregation::Max => *acc = acc.max(score),
                            Aggregation::Mean => *acc += score,
                        }
                        *count += 1;
                    })
                    .or_insert((score, 1));
            }
        }

        // Reviewer indices are assigned in ascending id order
        per_reviewer
            .into_iter()
            .map(|(reviewer_idx, (acc, count))| {
                let score = match self {
                    Aggregation::Max => acc,
                    Aggregation::Mean => acc / count as f32,
                };
                AffinityScore::new(submission_id, pool.reviewer(reviewer_idx), score)
            })
            .collect()
    }
}

/// Descending score, then ascending reviewer id
#[inline]
fn by_score(a: &AffinityScore, b: &AffinityScore) -> Ordering {
    b.score.total_cmp(&a.score).then_with(|| a.reviewer_id.cmp(&b.reviewer_id))
}

#[derive(Debug, Clone, Default)]
pub struct Ranker {
    /// Reviewers kept per submission (ties included); `None` keeps all
    pub knn: Option<usize>,
    /// Keep the union of top-N per submission and top-N per reviewer
    pub sparse_value: Option<usize>,
}

impl Ranker {
    #[inline]
    #[must_use]
    pub fn new(knn: Option<usize>) -> Self {
        Self { knn, sparse_value: None }
    }

    #[inline]
    #[must_use]
    pub fn with_sparse_value(mut self, sparse_value: Option<usize>) -> Self {
        self.sparse_value = sparse_value;
        self
    }

    /// Order by submission id, then descending score, truncating each
    /// submission to `knn` with ties. With `sparse_value` set the retained
    /// set is the sparse union and `knn` is not applied.
    pub fn rank(&self, scores: Vec<AffinityScore>) -> Vec<AffinityScore> {
        let (scores, knn) = match self.sparse_value {
            Some(n) => (sparse_union(scores, n), None),
            None => (scores, self.knn),
        };

        let mut by_submission: BTreeMap<String, Vec<AffinityScore>> = BTreeMap::new();
        for score in scores {
            by_submission.entry(score.submission_id.clone()).or_default().push(score);
        }

        let mut ranked = Vec::new();
        for (_, mut group) in by_submission {
            group.sort_by(by_score);
            if let Some(k) = knn {
                truncate_with_ties(&mut group, k, |s| s.score);
            }
            ranked.extend(group);
        }
        ranked
    }
}

fn sparse_union(scores: Vec<AffinityScore>, n: usize) -> Vec<AffinityScore> {
    let mut keep = vec![false; scores.len()];

    let mut by_submission: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    let mut by_reviewer: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (i, score) in scores.iter().enumerate() {
        by_submission.entry(score.submission_id.as_str()).or_default().push(i);
        by_reviewer.entry(score.reviewer_id.as_str()).or_default().push(i);
    }

    mark_top(&scores, by_submission, n, &mut keep, |s| s.reviewer_id.as_str());
    mark_top(&scores, by_reviewer, n, &mut keep, |s| s.submission_id.as_str());

    scores
        .into_iter()
        .zip(keep)
        .filter_map(|(score, kept)| kept.then_some(score))
        .collect()
}

fn mark_top(
    scores: &[AffinityScore],
    groups: BTreeMap<&str, Vec<usize>>,
    n: usize,
    keep: &mut [bool],
    secondary: fn(&AffinityScore) -> &str,
) {
    for (_, mut members) in groups {
        members.sort_by(|&a, &b| {
            scores[b]
                .score
                .total_cmp(&scores[a].score)
                .then_with(|| secondary(&scores[a]).cmp(secondary(&scores[b])))
        });
        truncate_with_ties(&mut members, n, |&i| scores[i].score);
        for i in members {
            keep[i] = true;
        }
    }
}
