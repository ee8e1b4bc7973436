//! Snapshot export to CSV and JSON.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use tagwatch_types::MonitoringSnapshot;

/// Column headers of the CSV export, in order.
pub const CSV_HEADER: [&str; 5] = ["Tag Name", "ID", "Value", "Active", "Timestamp"];

/// Export destination for a snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Export {
    /// One CSV row per monitored tag.
    Csv(PathBuf),
    /// The whole snapshot as pretty-printed JSON.
    Json(PathBuf),
}

impl Export {
    pub fn csv(path: impl Into<PathBuf>) -> Self {
        Export::Csv(path.into())
    }

    pub fn json(path: impl Into<PathBuf>) -> Self {
        Export::Json(path.into())
    }

    /// Pick the format from the file extension; anything other than `.json` is CSV.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Export::Json(path)
        } else {
            Export::Csv(path)
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            Export::Csv(path) | Export::Json(path) => path,
        }
    }

    /// Write `snapshot` to this destination, overwriting the file.
    pub async fn write(&self, snapshot: &MonitoringSnapshot) -> std::io::Result<()> {
        let content = match self {
            Export::Csv(_) => to_csv(snapshot),
            Export::Json(_) => to_json(snapshot)?,
        };
        tokio::fs::write(self.path(), content).await?;
        tracing::info!(path = %self.path().display(), tag_count = snapshot.len(), "Exported snapshot");
        Ok(())
    }
}

/// Render the monitored tags of a snapshot as CSV, ordered by tag id.
///
/// `Active` comes from the tag's latest history entry and `Timestamp` is the
/// snapshot time in Unix milliseconds.
pub fn to_csv(snapshot: &MonitoringSnapshot) -> String {
    let mut out = CSV_HEADER.join(",");
    out.push('\n');

    for (id, tag) in &snapshot.tags {
        let active = snapshot.latest_entry(id).is_some_and(|e| e.active);
        let _ = writeln!(
            out,
            "{},{},{},{},{}",
            csv_field(&tag.name),
            csv_field(id),
            csv_field(&tag.value.to_string()),
            active,
            snapshot.timestamp_ms
        );
    }
    out
}

pub fn to_json(snapshot: &MonitoringSnapshot) -> serde_json::Result<String> {
    serde_json::to_string_pretty(snapshot)
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tagwatch_types::{HistoryEntry, Tag, TagValue};
    use tempfile::tempdir;

    fn snapshot() -> MonitoringSnapshot {
        MonitoringSnapshot::builder()
            .timestamp_ms(1_700_000_000_000)
            .tag(Tag::builder("2").name("Belt, main").float(1.5).build())
            .tag(Tag::builder("1").name("Start \"green\"").bit(true).build())
            .history(
                "1",
                vec![
                    HistoryEntry::new(1, TagValue::Bool(false), false),
                    HistoryEntry::new(2, TagValue::Bool(true), true),
                ],
            )
            .build()
    }

    #[test]
    fn csv_has_fixed_header_and_rows_by_id() {
        let csv = to_csv(&snapshot());
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines[0], "Tag Name,ID,Value,Active,Timestamp");
        assert_eq!(lines[1], "\"Start \"\"green\"\"\",1,true,true,1700000000000");
        assert_eq!(lines[2], "\"Belt, main\",2,1.5,false,1700000000000");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn empty_snapshot_is_header_only() {
        let csv = to_csv(&MonitoringSnapshot::default());
        assert_eq!(csv, "Tag Name,ID,Value,Active,Timestamp\n");
    }

    #[test]
    fn from_path_picks_format() {
        assert!(matches!(Export::from_path("out.JSON"), Export::Json(_)));
        assert!(matches!(Export::from_path("out.csv"), Export::Csv(_)));
        assert!(matches!(Export::from_path("out"), Export::Csv(_)));
    }

    #[tokio::test]
    async fn write_csv_and_json() {
        let dir = tempdir().unwrap();
        let snapshot = snapshot();

        let csv_path = dir.path().join("tags.csv");
        Export::csv(&csv_path).write(&snapshot).await.unwrap();
        let csv = std::fs::read_to_string(&csv_path).unwrap();
        assert!(csv.starts_with("Tag Name,ID"));

        let json_path = dir.path().join("tags.json");
        Export::json(&json_path).write(&snapshot).await.unwrap();
        let parsed: MonitoringSnapshot =
            serde_json::from_str(&std::fs::read_to_string(&json_path).unwrap()).unwrap();
        assert_eq!(parsed, snapshot);
    }
}
