//! Reader for legend-delimited `.dat` files.
//!
//! Two layouts show up in run directories. Analysis detail files open the
//! legend with a `# Legend:` sentinel line; time-series files have no
//! sentinel and the legend begins at the first `#  1:` column header. In both
//! cases the legend runs until the first blank line and every following
//! non-blank line is a space-separated data row.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::error::{AggregateError, Result};

const DETAIL_SENTINEL: &str = "# Legend:";
const COLUMN_HEADER: &str = "#  1:";

/// How the legend of a file was located.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LegendMarker {
    /// `# Legend:` line; the legend starts on the next line.
    DetailSentinel,
    /// First line containing `#  1:`; the legend starts on that line.
    ColumnHeader,
}

impl LegendMarker {
    /// Detection order applied to every line.
    const PRECEDENCE: [LegendMarker; 2] = [LegendMarker::DetailSentinel, LegendMarker::ColumnHeader];

    fn legend_start(self, line_i: usize, line: &str) -> Option<usize> {
        match self {
            LegendMarker::DetailSentinel => (line == DETAIL_SENTINEL).then_some(line_i + 1),
            LegendMarker::ColumnHeader => line.contains(COLUMN_HEADER).then_some(line_i),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LegendStart {
    pub marker: Option<LegendMarker>,
    pub line: usize,
}

/// Scan trimmed lines top to bottom for the first legend trigger.
///
/// Falls back to line 0 with no marker when neither trigger is present.
pub fn detect_legend(lines: &[&str]) -> LegendStart {
    for (line_i, line) in lines.iter().enumerate() {
        for marker in LegendMarker::PRECEDENCE {
            if let Some(start) = marker.legend_start(line_i, line) {
                return LegendStart {
                    marker: Some(marker),
                    line: start,
                };
            }
        }
    }
    LegendStart {
        marker: None,
        line: 0,
    }
}

/// `#  3: Average Generation` -> `average_generation`
pub fn normalize_field_name(legend_line: &str) -> String {
    legend_line
        .rsplit(':')
        .next()
        .unwrap_or(legend_line)
        .trim()
        .to_lowercase()
        .replace(' ', "_")
}

/// One data row keyed by normalized legend field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DataRecord {
    values: BTreeMap<String, String>,
}

impl DataRecord {
    pub fn get(&self, field: &str) -> Result<&str> {
        self.values
            .get(field)
            .map(String::as_str)
            .ok_or_else(|| AggregateError::MissingField {
                field: field.to_string(),
            })
    }

    pub fn get_int(&self, field: &str) -> Result<i64> {
        let raw = self.get(field)?;
        raw.parse::<i64>()
            .map_err(|_| AggregateError::InvalidInteger {
                field: field.to_string(),
                value: raw.to_string(),
            })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for DataRecord {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// A parsed `.dat` file.
#[derive(Debug, Clone, Serialize)]
pub struct DatFile {
    pub source: String,
    pub marker: Option<LegendMarker>,
    pub fields: Vec<String>,
    pub records: Vec<DataRecord>,
}

impl DatFile {
    /// Parse file content. `source` only labels diagnostics.
    pub fn parse(source: &str, content: &str) -> Result<Self> {
        let lines: Vec<&str> = content.trim().split('\n').map(str::trim).collect();
        let legend = detect_legend(&lines);

        let mut fields = Vec::new();
        let mut legend_end = 0;
        for (line_i, line) in lines.iter().enumerate().skip(legend.line) {
            if line.is_empty() {
                legend_end = line_i;
                break;
            }
            fields.push(normalize_field_name(line));
        }

        let mut records = Vec::new();
        for line in lines.iter().skip(legend_end) {
            if line.is_empty() {
                continue;
            }
            let tokens: Vec<&str> = line.split(' ').collect();
            if tokens.len() != fields.len() {
                return Err(AggregateError::ParseSchema {
                    path: source.to_string(),
                    fields: fields.clone(),
                    tokens: tokens.iter().map(|t| t.to_string()).collect(),
                });
            }
            records.push(
                fields
                    .iter()
                    .zip(tokens)
                    .map(|(f, t)| (f.as_str(), t))
                    .collect(),
            );
        }

        Ok(DatFile {
            source: source.to_string(),
            marker: legend.marker,
            fields,
            records,
        })
    }

    pub fn read(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let parsed = Self::parse(&path.display().to_string(), &content)?;
        tracing::debug!(
            path = %path.display(),
            fields = parsed.fields.len(),
            records = parsed.records.len(),
            "parsed dat file"
        );
        Ok(parsed)
    }
}

/// Records of the file at `path`, in line order.
pub fn read_dat_file(path: &Path) -> Result<Vec<DataRecord>> {
    Ok(DatFile::read(path)?.records)
}
