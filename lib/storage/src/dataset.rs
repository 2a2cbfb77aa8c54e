//! Dataset directory reader.
//!
//! ```text
//! <root>/archives/<reviewer_id>.jsonl      one publication per line
//! <root>/submissions/<submission_id>.jsonl one JSON object
//! <root>/bids/<submission_id>.jsonl        optional, one bid per line
//! ```
//!
//! Records look like `{"id": ..., "content": {"title": ..., "abstract": ...}}`.
//! Content values may be plain strings or `{"value": ...}` objects. Missing or
//! non-string content reads as empty text; everything else that fails to
//! parse aborts the read.

use affinity_core::{Bid, Corpus, Document};
use anyhow::{bail, Context, Result};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const ARCHIVES_DIR: &str = "archives";
const SUBMISSIONS_DIR: &str = "submissions";
const BIDS_DIR: &str = "bids";
const EXTENSION: &str = "jsonl";

pub struct DatasetReader {
    root: PathBuf,
}

impl DatasetReader {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    #[inline]
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn read(&self) -> Result<Corpus> {
        let mut corpus = Corpus::new();
        self.read_archives(&mut corpus)?;
        self.read_submissions(&mut corpus)?;
        self.read_bids(&mut corpus)?;
        info!(
            "Loaded dataset from {}: {} reviewers, {} publications, {} submissions, {} bids",
            self.root.display(),
            corpus.num_reviewers(),
            corpus.num_publications(),
            corpus.num_submissions(),
            corpus.bids().len()
        );
        Ok(corpus)
    }

    fn read_archives(&self, corpus: &mut Corpus) -> Result<()> {
        for (reviewer_id, path) in jsonl_files(&self.root.join(ARCHIVES_DIR))? {
            corpus.add_reviewer(reviewer_id.clone());
            for (line_no, record) in read_lines(&path)? {
                let doc = parse_document(&record, None)
                    .with_context(|| format!("{}:{}", path.display(), line_no))?;
                corpus.add_publication(reviewer_id.clone(), doc);
            }
        }
        Ok(())
    }

    fn read_submissions(&self, corpus: &mut Corpus) -> Result<()> {
        for (stem, path) in jsonl_files(&self.root.join(SUBMISSIONS_DIR))? {
            let mut records = read_lines(&path)?;
            let Some((line_no, record)) = records.pop() else {
                bail!("{}: expected one submission, found none", path.display());
            };
            if !records.is_empty() {
                bail!("{}: expected one submission, found {}", path.display(), records.len() + 1);
            }
            let doc = parse_document(&record, Some(&stem))
                .with_context(|| format!("{}:{}", path.display(), line_no))?;
            corpus.add_submission(doc);
        }
        Ok(())
    }

    fn read_bids(&self, corpus: &mut Corpus) -> Result<()> {
        let dir = self.root.join(BIDS_DIR);
        if !dir.is_dir() {
            return Ok(());
        }
        for (stem, path) in jsonl_files(&dir)? {
            for (line_no, record) in read_lines(&path)? {
                let bid = parse_bid(&record, &stem).with_context(|| format!("{}:{}", path.display(), line_no))?;
                corpus.add_bid(bid);
            }
        }
        Ok(())
    }
}

/// `(file stem, path)` of every `.jsonl` file, sorted by file name
fn jsonl_files(dir: &Path) -> Result<Vec<(String, PathBuf)>> {
    let entries = fs::read_dir(dir).with_context(|| format!("reading directory {}", dir.display()))?;
    let mut files = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
            continue;
        }
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            warn!("Skipping non UTF-8 file name {}", path.display());
            continue;
        };
        files.push((stem.to_string(), path.clone()));
    }
    files.sort_by(|a, b| a.1.file_name().cmp(&b.1.file_name()));
    Ok(files)
}

/// Non-blank lines parsed as JSON, with 1-based line numbers
fn read_lines(path: &Path) -> Result<Vec<(usize, Value)>> {
    let raw = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    raw.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            serde_json::from_str(line)
                .map(|value| (i + 1, value))
                .with_context(|| format!("{}:{}: invalid JSON", path.display(), i + 1))
        })
        .collect()
}

fn content_text(content: Option<&Value>, key: &str) -> String {
    match content.and_then(|c| c.get(key)) {
        Some(Value::String(text)) => text.clone(),
        Some(Value::Object(wrapped)) => wrapped
            .get("value")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        _ => String::new(),
    }
}

fn parse_document(record: &Value, fallback_id: Option<&str>) -> Result<Document> {
    let id = match (record.get("id").and_then(Value::as_str), fallback_id) {
        (Some(id), _) => id.to_string(),
        (None, Some(id)) => id.to_string(),
        (None, None) => bail!("record has no id"),
    };
    let content = record.get("content");
    Ok(Document::new(
        id,
        content_text(content, "title"),
        content_text(content, "abstract"),
    ))
}

fn parse_bid(record: &Value, submission_id: &str) -> Result<Bid> {
    let reviewer_id = record
        .get("signatures")
        .and_then(|s| s.get(0))
        .and_then(Value::as_str)
        .or_else(|| record.get("tail").and_then(Value::as_str));
    let value = record
        .get("tag")
        .and_then(Value::as_str)
        .or_else(|| record.get("label").and_then(Value::as_str));

    match (reviewer_id, value) {
        (Some(reviewer_id), Some(value)) => Ok(Bid {
            submission_id: record
                .get("head")
                .and_then(Value::as_str)
                .unwrap_or(submission_id)
                .to_string(),
            reviewer_id: reviewer_id.to_string(),
            value: value.to_string(),
        }),
        (None, _) => bail!("bid has no reviewer (signatures or tail)"),
        (_, None) => bail!("bid has no value (tag or label)"),
    }
}
