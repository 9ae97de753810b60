//! Run-directory discovery under a data directory.

use anyhow::Result;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::AggregateConfig;
use crate::error::AggregateError;

#[derive(Debug, Clone)]
pub struct RunDir {
    pub name: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone, Default)]
pub struct Discovered {
    /// Sorted by directory name.
    pub runs: Vec<RunDir>,
    /// Names matched by the run identifier but excluded by `skip_runs`.
    pub skipped: Vec<String>,
}

/// Immediate sub-directories of `data_dir` whose name carries the run
/// identifier.
pub fn discover_runs(data_dir: &Path, config: &AggregateConfig) -> Result<Discovered> {
    if !data_dir.is_dir() {
        return Err(AggregateError::DataDirMissing {
            path: data_dir.to_path_buf(),
        }
        .into());
    }
    let mut found = Discovered::default();
    let walker = WalkDir::new(data_dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name();
    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        if !name.contains(config.run_identifier.as_str()) {
            continue;
        }
        if config.is_skipped(&name) {
            tracing::info!(run = %name, "skipping excluded run");
            found.skipped.push(name);
            continue;
        }
        found.runs.push(RunDir {
            name,
            path: entry.path().to_path_buf(),
        });
    }
    tracing::info!(
        data_dir = %data_dir.display(),
        runs = found.runs.len(),
        skipped = found.skipped.len(),
        "found run directories"
    );
    Ok(found)
}
