//! CSV report writer. Reports land in one directory and are fetched back by
//! their generated filename.

use deskbot_core::{
    error::DeskbotError,
    message::{Record, ReportArtifact},
    traits::ReportWriter,
};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::info;
use uuid::Uuid;

pub struct CsvReportWriter {
    dir: PathBuf,
}

impl CsvReportWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

/// Column set: every key seen, in order of first appearance.
fn columns(records: &[Record]) -> Vec<String> {
    let mut cols: Vec<String> = Vec::new();
    for record in records {
        for key in record.keys() {
            if !cols.iter().any(|c| c == key) {
                cols.push(key.clone());
            }
        }
    }
    cols
}

fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Only plain `report-*.csv`-style names: no separators, no parent refs.
fn is_safe_filename(name: &str) -> bool {
    !name.is_empty()
        && !name.contains(['/', '\\'])
        && !name.contains("..")
        && !name.starts_with('.')
}

impl ReportWriter for CsvReportWriter {
    fn write_report(&self, records: &[Record]) -> Result<ReportArtifact, DeskbotError> {
        if records.is_empty() {
            return Err(DeskbotError::NoData(
                "No data available for report generation.".to_string(),
            ));
        }
        let cols = columns(records);
        if cols.is_empty() {
            return Err(DeskbotError::NoData("No valid records found.".to_string()));
        }

        std::fs::create_dir_all(&self.dir)?;
        let filename = format!("report-{}.csv", Uuid::new_v4());
        let path = self.dir.join(&filename);

        let mut writer = csv::Writer::from_path(&path)
            .map_err(|e| DeskbotError::Report(format!("cannot create {}: {e}", path.display())))?;
        writer
            .write_record(&cols)
            .map_err(|e| DeskbotError::Report(e.to_string()))?;
        for record in records {
            let row: Vec<String> = cols.iter().map(|c| cell(record.get(c))).collect();
            writer
                .write_record(&row)
                .map_err(|e| DeskbotError::Report(e.to_string()))?;
        }
        writer.flush()?;

        info!(
            "report generated: {} ({} rows)",
            path.display(),
            records.len()
        );
        Ok(ReportArtifact {
            filename,
            path,
            row_count: records.len(),
        })
    }

    fn locate(&self, filename: &str) -> Option<PathBuf> {
        if !is_safe_filename(filename) {
            return None;
        }
        let path = self.dir.join(filename);
        path.is_file().then_some(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            _ => panic!("record must be an object"),
        }
    }

    #[test]
    fn test_write_report_union_of_columns() {
        let tmp = tempfile::tempdir().unwrap();
        let writer = CsvReportWriter::new(tmp.path());
        let records = vec![
            record(json!({"drug": "aspirin", "tier": 1})),
            record(json!({"drug": "ibuprofen", "note": "otc"})),
        ];

        let artifact = writer.write_report(&records).unwrap();
        assert_eq!(artifact.row_count, 2);
        assert!(artifact.filename.starts_with("report-"));
        assert!(artifact.filename.ends_with(".csv"));

        let content = std::fs::read_to_string(&artifact.path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "drug,tier,note");
        assert_eq!(lines[1], "aspirin,1,");
        assert_eq!(lines[2], "ibuprofen,,otc");
    }

    #[test]
    fn test_empty_records_is_no_data() {
        let tmp = tempfile::tempdir().unwrap();
        let writer = CsvReportWriter::new(tmp.path());
        let err = writer.write_report(&[]).unwrap_err();
        assert!(matches!(err, DeskbotError::NoData(_)));
        assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_columnless_records_is_no_data() {
        let tmp = tempfile::tempdir().unwrap();
        let writer = CsvReportWriter::new(tmp.path());
        let err = writer
            .write_report(&[Record::new(), Record::new()])
            .unwrap_err();
        assert!(matches!(err, DeskbotError::NoData(ref m) if m == "No valid records found."));
    }

    #[test]
    fn test_locate_roundtrip_and_missing() {
        let tmp = tempfile::tempdir().unwrap();
        let writer = CsvReportWriter::new(tmp.path());
        let artifact = writer
            .write_report(&[record(json!({"a": "b"}))])
            .unwrap();
        assert_eq!(writer.locate(&artifact.filename), Some(artifact.path));
        assert_eq!(writer.locate("report-missing.csv"), None);
    }

    #[test]
    fn test_locate_rejects_traversal() {
        let tmp = tempfile::tempdir().unwrap();
        let writer = CsvReportWriter::new(tmp.path().join("reports"));
        std::fs::write(tmp.path().join("secret.csv"), "x").unwrap();
        assert_eq!(writer.locate("../secret.csv"), None);
        assert_eq!(writer.locate("a/b.csv"), None);
        assert_eq!(writer.locate(""), None);
    }
}
