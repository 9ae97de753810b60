//! The aggregate table and the files written from it.
//!
//! Every row must carry the same column set. Output is `aggregate.csv`
//! plus `aggregate_manifest.json` describing which runs went in.

use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{AggregateError, Result};

pub const CSV_FILE_NAME: &str = "aggregate.csv";
pub const MANIFEST_FILE_NAME: &str = "aggregate_manifest.json";

/// A derived per-run value.
///
/// Rendering matches the existing analysis scripts' CSV input: booleans are
/// `True`/`False` and unset first-occurrence fields are `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Int(i64),
    Bool(bool),
    Unset,
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(s) => f.write_str(s),
            FieldValue::Int(n) => write!(f, "{}", n),
            FieldValue::Bool(true) => f.write_str("True"),
            FieldValue::Bool(false) => f.write_str("False"),
            FieldValue::Unset => f.write_str("None"),
        }
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl From<usize> for FieldValue {
    fn from(value: usize) -> Self {
        FieldValue::Int(value as i64)
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<Option<String>> for FieldValue {
    fn from(value: Option<String>) -> Self {
        value.map(FieldValue::Text).unwrap_or(FieldValue::Unset)
    }
}

/// Derived fields of one run keyed by column name.
pub type RunInfo = BTreeMap<String, FieldValue>;

/// One flattened run: configuration columns followed by derived columns.
#[derive(Debug, Clone, Serialize)]
pub struct SummaryRow {
    pub run_id: String,
    pub params: BTreeMap<String, String>,
    pub info: RunInfo,
}

impl SummaryRow {
    /// Sorted parameter names, then sorted derived names.
    pub fn header(&self) -> Vec<&str> {
        self.params
            .keys()
            .chain(self.info.keys())
            .map(String::as_str)
            .collect()
    }

    pub fn values(&self) -> Vec<String> {
        self.params
            .values()
            .cloned()
            .chain(self.info.values().map(|v| v.to_string()))
            .collect()
    }
}

#[derive(Debug, Default)]
pub struct SummaryTable {
    header: Option<Vec<String>>,
    rows: Vec<SummaryRow>,
}

impl SummaryTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a row. The first row fixes the header.
    pub fn push(&mut self, row: SummaryRow) -> Result<()> {
        let header: Vec<String> = row.header().into_iter().map(str::to_string).collect();
        match &self.header {
            None => self.header = Some(header),
            Some(expected) if *expected != header => {
                return Err(AggregateError::HeaderMismatch {
                    run: row.run_id.clone(),
                    expected: column_diff(expected, &header),
                    found: column_diff(&header, expected),
                });
            }
            Some(_) => {}
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn header(&self) -> Option<&[String]> {
        self.header.as_deref()
    }

    pub fn rows(&self) -> &[SummaryRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Header line plus one line per row, no trailing newline.
    pub fn to_csv(&self) -> Result<String> {
        let header = self.header.as_ref().ok_or(AggregateError::NoRuns)?;
        let mut lines = Vec::with_capacity(self.rows.len() + 1);
        lines.push(header.join(","));
        for row in &self.rows {
            lines.push(row.values().join(","));
        }
        Ok(lines.join("\n"))
    }
}

/// Columns of `left` absent from `right`, or the full list when the sets
/// agree and only order differs.
fn column_diff(left: &[String], right: &[String]) -> String {
    let missing: Vec<&str> = left
        .iter()
        .filter(|c| !right.contains(c))
        .map(String::as_str)
        .collect();
    if missing.is_empty() {
        left.join(",")
    } else {
        missing.join(",")
    }
}

/// A run left out under lenient strictness.
#[derive(Debug, Clone, Serialize)]
pub struct FailedRun {
    pub run: String,
    pub error: String,
}

#[derive(Debug, Clone)]
pub struct OutputPaths {
    pub csv: PathBuf,
    pub manifest: PathBuf,
}

/// Write `aggregate.csv` and its manifest into `dump_dir`.
///
/// Both files are staged before either is renamed into place. The CSV is
/// renamed last so it only appears once its manifest is present.
pub fn write_outputs(
    table: &SummaryTable,
    skipped: &[String],
    failed: &[FailedRun],
    dump_dir: &Path,
) -> Result<OutputPaths> {
    let csv = table.to_csv()?;
    let paths = OutputPaths {
        csv: dump_dir.join(CSV_FILE_NAME),
        manifest: dump_dir.join(MANIFEST_FILE_NAME),
    };

    let run_ids: Vec<&str> = table.rows().iter().map(|r| r.run_id.as_str()).collect();
    let manifest = json!({
        "schema_version": "aggregate_manifest_v1",
        "csv": CSV_FILE_NAME,
        "runs": run_ids,
        "skipped_runs": skipped,
        "failed_runs": failed,
        "columns": table.header().map(|h| h.len()).unwrap_or(0),
        "generated_at": Utc::now().to_rfc3339(),
    });
    let manifest_bytes = serde_json::to_vec_pretty(&manifest)?;

    let staged_manifest = stage_bytes(&paths.manifest, &manifest_bytes)?;
    let staged_csv = match stage_bytes(&paths.csv, csv.as_bytes()) {
        Ok(tmp) => tmp,
        Err(err) => {
            let _ = fs::remove_file(&staged_manifest);
            return Err(err);
        }
    };
    let published = fs::rename(&staged_manifest, &paths.manifest)
        .and_then(|_| fs::rename(&staged_csv, &paths.csv));
    if let Err(err) = published {
        let _ = fs::remove_file(&staged_manifest);
        let _ = fs::remove_file(&staged_csv);
        return Err(err.into());
    }
    Ok(paths)
}

/// Write `bytes` to a synced sibling tmp file of `path` and return its path.
fn stage_bytes(path: &Path, bytes: &[u8]) -> Result<PathBuf> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let ts = Utc::now().timestamp_micros();
    let pid = std::process::id();
    let name = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("tmpfile");
    let tmp = path.with_file_name(format!(".{}.tmp.{}.{}", name, pid, ts));
    let written = fs::File::create(&tmp).and_then(|mut file| {
        file.write_all(bytes)?;
        file.sync_all()
    });
    if let Err(err) = written {
        let _ = fs::remove_file(&tmp);
        return Err(err.into());
    }
    Ok(tmp)
}
