//! File-based tag source.
//!
//! Reads a JSON array of tags (the `GET /tags` response format) from disk.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tagwatch_types::{now_ms, Sample, Tag, TagId};

use crate::{collect_samples, SourceError, TagFilter, TagSource};

/// A tag source backed by a JSON file.
///
/// The file is re-read on every call, so a process that rewrites it
/// periodically acts as a live source. A missing or unreadable file looks
/// like an unreachable upstream.
#[derive(Debug)]
pub struct FileTagSource {
    path: PathBuf,
    description: String,
}

impl FileTagSource {
    /// Create a new file source for the given path.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let description = format!("file: {}", path.display());
        Self { path, description }
    }

    /// Returns the path being read.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_tags(&self) -> Result<Vec<Tag>, SourceError> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| SourceError::Unreachable(format!("Read error: {e}")))?;

        let tags: Vec<Tag> =
            serde_json::from_str(&content).map_err(|e| SourceError::Parse(e.to_string()))?;
        tracing::trace!(path = %self.path.display(), tag_count = tags.len(), "Read tag file");
        Ok(tags)
    }
}

#[async_trait]
impl TagSource for FileTagSource {
    async fn list_tags(&self, filter: &TagFilter) -> Result<Vec<Tag>, SourceError> {
        let tags = self.read_tags().await?;
        Ok(tags.into_iter().filter(|t| filter.matches(t)).collect())
    }

    async fn fetch_values(
        &self,
        ids: &BTreeSet<TagId>,
    ) -> Result<BTreeMap<TagId, Sample>, SourceError> {
        let tags = self.read_tags().await?;
        let captured = now_ms();
        collect_samples(ids, tags.iter().map(|t| Sample::of_tag(t, captured)))
    }

    fn description(&self) -> &str {
        &self.description
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tagwatch_types::{TagValue, ValueKind};
    use tempfile::NamedTempFile;

    fn sample_json() -> &'static str {
        r#"[
            { "id": "t1", "name": "Start button", "address": 0, "type": "Bit",
              "kind": "Input", "value": true, "openCircuit": false,
              "shortCircuit": false, "isForced": false, "forcedValue": false },
            { "id": "t2", "name": "Belt speed", "address": 1, "type": "Float",
              "kind": "Output", "value": 4.5, "openCircuit": false,
              "shortCircuit": false, "isForced": false, "forcedValue": 0 }
        ]"#
    }

    fn ids(list: &[&str]) -> BTreeSet<TagId> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_file_source_new() {
        let source = FileTagSource::new("/tmp/tags.json");
        assert_eq!(source.path(), Path::new("/tmp/tags.json"));
        assert_eq!(source.description(), "file: /tmp/tags.json");
    }

    #[tokio::test]
    async fn test_list_tags_applies_filter() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{}", sample_json()).unwrap();
        let source = FileTagSource::new(file.path());

        let all = source.list_tags(&TagFilter::default()).await.unwrap();
        assert_eq!(all.len(), 2);

        let floats = source
            .list_tags(&TagFilter::default().kind(ValueKind::Float))
            .await
            .unwrap();
        assert_eq!(floats.len(), 1);
        assert_eq!(floats[0].name, "Belt speed");
    }

    #[tokio::test]
    async fn test_fetch_values() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{}", sample_json()).unwrap();
        let source = FileTagSource::new(file.path());

        let samples = source.fetch_values(&ids(&["t1", "t2"])).await.unwrap();
        assert_eq!(samples["t1"].value, TagValue::Bool(true));
        assert_eq!(samples["t2"].value, TagValue::Number(4.5));
        assert!(!samples["t1"].overrides.unwrap().is_forced);
    }

    #[tokio::test]
    async fn test_fetch_values_partial() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{}", sample_json()).unwrap();
        let source = FileTagSource::new(file.path());

        let err = source.fetch_values(&ids(&["t1", "gone"])).await.unwrap_err();
        match err {
            SourceError::PartialResult { samples, missing } => {
                assert!(samples.contains_key("t1"));
                assert_eq!(missing, vec!["gone".to_string()]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_file_is_unreachable() {
        let source = FileTagSource::new("/nonexistent/path/tags.json");
        let err = source.fetch_values(&ids(&["t1"])).await.unwrap_err();
        assert!(err.is_unreachable());
        assert!(err.to_string().contains("Read error"));
    }

    #[tokio::test]
    async fn test_invalid_json() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "not valid json").unwrap();
        let source = FileTagSource::new(file.path());

        let err = source.list_tags(&TagFilter::default()).await.unwrap_err();
        assert!(matches!(err, SourceError::Parse(_)));
    }
}
