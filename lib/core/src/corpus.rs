//! In-memory corpus: reviewer archives, submissions and bids.
//!
//! Everything is kept in `BTreeMap`s so iteration order, and therefore every
//! downstream floating point reduction, is the same on every run.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Which document field is scored. Exactly one per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextField {
    Title,
    Abstract,
}

/// A publication or submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, rename = "abstract")]
    pub abstract_text: String,
}

impl Document {
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>, title: impl Into<String>, abstract_text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            abstract_text: abstract_text.into(),
        }
    }

    /// The scored text for `field`, trimmed
    #[inline]
    pub fn text(&self, field: TextField) -> &str {
        match field {
            TextField::Title => self.title.trim(),
            TextField::Abstract => self.abstract_text.trim(),
        }
    }
}

/// A reviewer's bid on one submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bid {
    pub submission_id: String,
    pub reviewer_id: String,
    pub value: String,
}

/// Final (submission, reviewer, score) triple
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AffinityScore {
    pub submission_id: String,
    pub reviewer_id: String,
    pub score: f32,
}

impl AffinityScore {
    #[inline]
    #[must_use]
    pub fn new(submission_id: impl Into<String>, reviewer_id: impl Into<String>, score: f32) -> Self {
        Self {
            submission_id: submission_id.into(),
            reviewer_id: reviewer_id.into(),
            score,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Corpus {
    archives: BTreeMap<String, Vec<Document>>,
    submissions: BTreeMap<String, Document>,
    bids: Vec<Bid>,
}

impl Corpus {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a reviewer, possibly with an empty archive
    pub fn add_reviewer(&mut self, reviewer_id: impl Into<String>) {
        self.archives.entry(reviewer_id.into()).or_default();
    }

    pub fn add_publication(&mut self, reviewer_id: impl Into<String>, publication: Document) {
        self.archives.entry(reviewer_id.into()).or_default().push(publication);
    }

    /// Insert a submission, replacing any earlier one with the same id
    pub fn add_submission(&mut self, submission: Document) {
        self.submissions.insert(submission.id.clone(), submission);
    }

    pub fn add_bid(&mut self, bid: Bid) {
        self.bids.push(bid);
    }

    /// Drop every submission and bid, keeping the archives
    pub fn clear_submissions(&mut self) {
        self.submissions.clear();
        self.bids.clear();
    }

    #[inline]
    pub fn archives(&self) -> &BTreeMap<String, Vec<Document>> {
        &self.archives
    }

    #[inline]
    pub fn archive(&self, reviewer_id: &str) -> Option<&[Document]> {
        self.archives.get(reviewer_id).map(Vec::as_slice)
    }

    /// Submissions in ascending id order
    pub fn submissions(&self) -> impl Iterator<Item = &Document> {
        self.submissions.values()
    }

    #[inline]
    pub fn submission(&self, id: &str) -> Option<&Document> {
        self.submissions.get(id)
    }

    #[inline]
    pub fn bids(&self) -> &[Bid] {
        &self.bids
    }

    #[inline]
    #[must_use]
    pub fn num_reviewers(&self) -> usize {
        self.archives.len()
    }

    #[inline]
    #[must_use]
    pub fn num_submissions(&self) -> usize {
        self.submissions.len()
    }

    #[must_use]
    pub fn num_publications(&self) -> usize {
        self.archives.values().map(Vec::len).sum()
    }

    /// Deduplicated publications with their owning reviewers.
    pub fn publication_pool(&self) -> PublicationPool {
        PublicationPool::from_archives(&self.archives)
    }

    /// Copy of this corpus with one publication removed from a reviewer's
    /// archive. Returns `None` if the reviewer or publication is unknown.
    pub fn without_publication(&self, reviewer_id: &str, publication_id: &str) -> Option<(Corpus, Document)> {
        let archive = self.archives.get(reviewer_id)?;
        let position = archive.iter().position(|d| d.id == publication_id)?;
        let mut reduced = self.clone();
        let removed = reduced.archives.get_mut(reviewer_id)?.remove(position);
        Some((reduced, removed))
    }
}

/// Unique publications, each scored once and fanned out to every owner.
#[derive(Debug, Clone, Default)]
pub struct PublicationPool {
    documents: Vec<Document>,
    /// Per document, indices into `reviewers`
    owners: Vec<Vec<usize>>,
    /// Reviewers owning at least one publication, ascending
    reviewers: Vec<String>,
}

impl PublicationPool {
    fn from_archives(archives: &BTreeMap<String, Vec<Document>>) -> Self {
        let mut pool = PublicationPool::default();
        let mut by_id: HashMap<&str, usize> = HashMap::new();

        for (reviewer_id, publications) in archives {
            if publications.is_empty() {
                continue;
            }
            let reviewer_idx = pool.reviewers.len();
            pool.reviewers.push(reviewer_id.clone());

            for publication in publications {
                match by_id.get(publication.id.as_str()) {
                    Some(&doc_idx) => {
                        let owners = &mut pool.owners[doc_idx];
                        if owners.last() != Some(&reviewer_idx) {
                            owners.push(reviewer_idx);
                        }
                    }
                    None => {
                        by_id.insert(publication.id.as_str(), pool.documents.len());
                        pool.documents.push(publication.clone());
                        pool.owners.push(vec![reviewer_idx]);
                    }
                }
            }
        }

        pool
    }

    #[inline]
    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    #[inline]
    pub fn owners(&self, doc_idx: usize) -> &[usize] {
        &self.owners[doc_idx]
    }

    #[inline]
    pub fn reviewer(&self, reviewer_idx: usize) -> &str {
        &self.reviewers[reviewer_idx]
    }

    #[inline]
    pub fn reviewers(&self) -> &[String] {
        &self.reviewers
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_field_selection() {
        let doc = Document::new("p1", "  A Title ", "An abstract");
        assert_eq!(doc.text(TextField::Title), "A Title");
        assert_eq!(doc.text(TextField::Abstract), "An abstract");
    }

    #[test]
    fn test_pool_dedupes_shared_publications() {
        let mut corpus = Corpus::new();
        let shared = Document::new("shared", "graph neural networks", "");
        corpus.add_publication("~Alice1", shared.clone());
        corpus.add_publication("~Alice1", Document::new("a2", "kernels", ""));
        corpus.add_publication("~Bob1", shared);
        corpus.add_reviewer("~Carol1");

        let pool = corpus.publication_pool();
        assert_eq!(pool.len(), 2);
        assert_eq!(pool.reviewers(), &["~Alice1".to_string(), "~Bob1".to_string()]);
        assert_eq!(pool.owners(0), &[0, 1]);
        assert_eq!(pool.owners(1), &[0]);
        assert_eq!(corpus.num_reviewers(), 3);
    }

    #[test]
    fn test_without_publication() {
        let mut corpus = Corpus::new();
        corpus.add_publication("~Alice1", Document::new("a1", "one", ""));
        corpus.add_publication("~Alice1", Document::new("a2", "two", ""));

        let (reduced, removed) = corpus.without_publication("~Alice1", "a2").unwrap();
        assert_eq!(removed.id, "a2");
        assert_eq!(reduced.archive("~Alice1").unwrap().len(), 1);
        assert_eq!(corpus.archive("~Alice1").unwrap().len(), 2);
        assert!(corpus.without_publication("~Nobody1", "a1").is_none());
    }
}
