// Write-once CSV export of ranked scores: submission_id,reviewer_id,score
use affinity_core::{AffinityScore, Error as CoreError, Result as CoreResult, ScoreSink};
use anyhow::{bail, Context, Result};
use atomicwrites::{AtomicFile, OverwriteBehavior};
use std::borrow::Cow;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

pub struct CsvExporter {
    path: PathBuf,
    written: bool,
}

impl CsvExporter {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            written: false,
        }
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write `scores` in the given order. Fails if the file already exists
    /// or this exporter has written before; the file appears atomically.
    pub fn write(&mut self, scores: &[AffinityScore]) -> Result<()> {
        if self.written {
            bail!("scores already exported to {}", self.path.display());
        }
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating output directory {}", parent.display()))?;
        }

        let file = AtomicFile::new(&self.path, OverwriteBehavior::DisallowOverwrite);
        file.write(|f| {
            for score in scores {
                writeln!(
                    f,
                    "{},{},{}",
                    csv_field(&score.submission_id),
                    csv_field(&score.reviewer_id),
                    score.score
                )?;
            }
            f.flush()
        })
        .with_context(|| format!("writing scores to {}", self.path.display()))?;

        self.written = true;
        info!("Exported {} scores to {}", scores.len(), self.path.display());
        Ok(())
    }
}

impl ScoreSink for CsvExporter {
    fn write_scores(&mut self, scores: &[AffinityScore]) -> CoreResult<()> {
        self.write(scores).map_err(|e| CoreError::Export(format!("{:#}", e)))
    }
}

/// Quote fields holding a separator, quote or line break
fn csv_field(field: &str) -> Cow<'_, str> {
    if field.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_writes_rows_in_order() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out/scores.csv");
        let mut exporter = CsvExporter::new(&path);
        exporter
            .write(&[
                AffinityScore::new("s1", "~A1", 0.75),
                AffinityScore::new("s1", "~B1", 0.1),
                AffinityScore::new("s2", "~A1", 1.0),
            ])
            .unwrap();
        let csv = std::fs::read_to_string(&path).unwrap();
        assert_eq!(csv, "s1,~A1,0.75\ns1,~B1,0.1\ns2,~A1,1\n");
    }

    #[test]
    fn test_refuses_to_overwrite() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("scores.csv");
        std::fs::write(&path, "existing").unwrap();

        let mut exporter = CsvExporter::new(&path);
        let err = exporter.write_scores(&[AffinityScore::new("s1", "~A1", 0.5)]).unwrap_err();
        assert!(matches!(err, CoreError::Export(_)));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "existing");
    }

    #[test]
    fn test_second_write_rejected() {
        let dir = tempdir().unwrap();
        let mut exporter = CsvExporter::new(dir.path().join("scores.csv"));
        exporter.write(&[]).unwrap();
        assert!(exporter.write(&[]).is_err());
    }

    #[test]
    fn test_quotes_awkward_ids() {
        assert_eq!(csv_field("~A1"), "~A1");
        assert_eq!(csv_field("a,b"), "\"a,b\"");
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
    }
}
