//! Aggregates phased-environment evolution runs into one summary table.
//!
//! Each run directory is reduced to a single row: its command-line
//! configuration plus phenotype facts about the dominant genotype at the end
//! of each phase and first-occurrence updates along its lineage.

pub mod cmd_log;
pub mod config;
pub mod dat;
pub mod discover;
pub mod error;
pub mod lineage;
pub mod phenotype;
pub mod population;
pub mod reconcile;
pub mod run;
pub mod summary;

#[cfg(test)]
pub(crate) mod test_support;

use anyhow::Result;
use std::path::{Path, PathBuf};

pub use config::{AggregateConfig, Strictness};
pub use error::AggregateError;
pub use summary::{FailedRun, FieldValue, SummaryRow, SummaryTable};

#[derive(Debug, Clone)]
pub struct AggregateReport {
    pub runs: Vec<String>,
    pub skipped: Vec<String>,
    pub failed: Vec<FailedRun>,
    pub columns: usize,
    pub csv_path: PathBuf,
    pub manifest_path: PathBuf,
}

/// Aggregate every run under `data_dir` into `<dump_dir>/aggregate.csv`.
///
/// Nothing is written unless every included run was reduced and all rows
/// share one header.
pub fn aggregate_runs(
    data_dir: &Path,
    dump_dir: &Path,
    config: &AggregateConfig,
) -> Result<AggregateReport> {
    let discovered = discover::discover_runs(data_dir, config)?;
    let encoder = config.encoder();

    let mut table = SummaryTable::new();
    let mut failed = Vec::new();
    for run_dir in &discovered.runs {
        let row = match run::process_run(run_dir, config, &encoder) {
            Ok(row) => row,
            Err(err) if config.strictness == Strictness::Lenient => {
                let error = format!("{:#}", err);
                tracing::warn!(run = %run_dir.name, error = %error, "leaving out failed run");
                failed.push(FailedRun {
                    run: run_dir.name.clone(),
                    error,
                });
                continue;
            }
            Err(err) => return Err(err.context(format!("run {} failed", run_dir.name))),
        };
        table.push(row)?;
    }

    let paths = summary::write_outputs(&table, &discovered.skipped, &failed, dump_dir)?;
    tracing::info!(
        rows = table.len(),
        csv = %paths.csv.display(),
        "wrote aggregate"
    );
    Ok(AggregateReport {
        runs: table.rows().iter().map(|r| r.run_id.clone()).collect(),
        skipped: discovered.skipped,
        failed,
        columns: table.header().map(|h| h.len()).unwrap_or(0),
        csv_path: paths.csv,
        manifest_path: paths.manifest,
    })
}
