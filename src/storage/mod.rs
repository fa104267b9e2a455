//! Slugged output namespaces and atomic artifact writes.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::HarvestError;
use crate::models::{ArticleRecord, PmcId};

/// Filesystem-safe namespace for a query: lowercased, whitespace runs
/// collapsed to single underscores, every other non-alphanumeric dropped.
/// A pure function of the query text, stable across runs.
pub fn slugify(query: &str) -> String {
    let mut slug = String::with_capacity(query.len());
    let mut pending_sep = false;

    for ch in query.trim().to_lowercase().chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_sep && !slug.is_empty() {
                slug.push('_');
            }
            pending_sep = false;
            slug.push(ch);
        } else if ch.is_whitespace() || ch == '_' {
            pending_sep = true;
        }
    }

    if slug.is_empty() {
        "query".to_string()
    } else {
        slug
    }
}

/// Writes one JSON artifact per record, grouped under a query namespace.
///
/// A visible artifact is always complete: content is materialized in a
/// temporary file inside the target directory and only reaches its final
/// name through an atomic rename, so a crash mid-write never leaves a
/// partial artifact that [`OutputWriter::exists`] would report as present.
#[derive(Debug, Clone)]
pub struct OutputWriter {
    root: PathBuf,
}

impl OutputWriter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding one namespace's artifacts.
    pub fn namespace_dir(&self, namespace: &str) -> PathBuf {
        self.root.join(namespace)
    }

    /// Final path of one record's artifact.
    pub fn artifact_path(&self, namespace: &str, id: &PmcId) -> PathBuf {
        self.namespace_dir(namespace)
            .join(format!("{}.json", id.accession()))
    }

    /// The sole idempotency gate: a present artifact is treated as a
    /// complete, valid prior download and is never re-validated.
    pub fn exists(&self, namespace: &str, id: &PmcId) -> bool {
        self.artifact_path(namespace, id).is_file()
    }

    /// Persist `record` atomically, creating the namespace on demand.
    pub fn write(
        &self,
        namespace: &str,
        record: &ArticleRecord,
    ) -> Result<PathBuf, HarvestError> {
        let dir = self.namespace_dir(namespace);
        fs::create_dir_all(&dir)?;

        let id = PmcId::parse(&record.pmcid);
        let path = self.artifact_path(namespace, &id);

        let tmp = NamedTempFile::new_in(&dir)?;
        serde_json::to_writer_pretty(tmp.as_file(), record)
            .map_err(|e| HarvestError::Io(std::io::Error::other(e)))?;
        tmp.persist(&path).map_err(|e| HarvestError::Io(e.error))?;

        debug!("wrote {}", path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ArticleMetadata;

    #[test]
    fn slug_is_stable_and_safe() {
        assert_eq!(slugify("frailty cytokines"), "frailty_cytokines");
        assert_eq!(slugify("  Frailty   Cytokines  "), "frailty_cytokines");
        assert_eq!(slugify("IL-6 (serum)"), "il6_serum");
        assert_eq!(slugify("gut/brain axis"), "gutbrain_axis");
        assert_eq!(slugify("a_b c"), "a_b_c");
        assert_eq!(slugify("???"), "query");
        assert_eq!(slugify(""), "query");

        // Pure function: same input, same slug.
        assert_eq!(slugify("COVID-19 vaccine"), slugify("COVID-19 vaccine"));
    }

    #[test]
    fn write_then_exists_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let writer = OutputWriter::new(dir.path());
        let id = PmcId::parse("123");

        assert!(!writer.exists("test_ns", &id));

        let record = ArticleRecord::new(&id, ArticleMetadata::default())
            .with_text("body text".to_string());
        let path = writer.write("test_ns", &record).unwrap();

        assert!(writer.exists("test_ns", &id));
        assert_eq!(path, dir.path().join("test_ns/PMC123.json"));

        let raw = std::fs::read_to_string(&path).unwrap();
        let parsed: ArticleRecord = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed.pmcid, "PMC123");
        assert_eq!(parsed.source, "PMC");
        assert_eq!(parsed.text.as_deref(), Some("body text"));
    }

    #[test]
    fn write_leaves_no_temp_files_behind() {
        let dir = tempfile::tempdir().unwrap();
        let writer = OutputWriter::new(dir.path());
        let id = PmcId::parse("7");

        let record = ArticleRecord::new(&id, ArticleMetadata::default());
        writer.write("ns", &record).unwrap();

        let entries: Vec<_> = std::fs::read_dir(dir.path().join("ns"))
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries, vec!["PMC7.json"]);
    }

    #[test]
    fn namespaces_are_isolated() {
        let dir = tempfile::tempdir().unwrap();
        let writer = OutputWriter::new(dir.path());
        let id = PmcId::parse("5");

        let record = ArticleRecord::new(&id, ArticleMetadata::default());
        writer.write("first", &record).unwrap();

        assert!(writer.exists("first", &id));
        assert!(!writer.exists("second", &id));
    }
}
