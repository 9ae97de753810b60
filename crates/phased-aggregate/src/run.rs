//! Reduction of one run directory to a summary row.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::cmd_log::read_cmd_log;
use crate::config::AggregateConfig;
use crate::dat::{read_dat_file, DataRecord};
use crate::discover::RunDir;
use crate::lineage::{reduce_lineage, LineageSummary};
use crate::phenotype::PhenotypeEncoder;
use crate::population::{average_generation, pop_equals};
use crate::reconcile::{reconcile_phases, sort_by_update_born, EnvTriple, Environment};
use crate::summary::{RunInfo, SummaryRow};

/// Where a run directory keeps each input file.
#[derive(Debug, Clone)]
pub struct RunLayout {
    root: PathBuf,
}

impl RunLayout {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn cmd_log(&self) -> PathBuf {
        self.root.join("cmd.log")
    }

    fn data_dir(&self) -> PathBuf {
        self.root.join("data")
    }

    pub fn time_dat(&self) -> PathBuf {
        self.data_dir().join("time.dat")
    }

    pub fn tasks_dat(&self) -> PathBuf {
        self.data_dir().join("tasks.dat")
    }

    fn analysis_dir(&self, env: Environment) -> PathBuf {
        self.data_dir().join("analysis").join(env.dir_name())
    }

    pub fn final_dominant(&self, env: Environment) -> PathBuf {
        self.analysis_dir(env).join("final_dominant.dat")
    }

    pub fn lineage_tasks(&self, env: Environment) -> PathBuf {
        self.analysis_dir(env).join("lineage_tasks.dat")
    }
}

fn read_records(path: &Path) -> Result<Vec<DataRecord>> {
    read_dat_file(path).with_context(|| format!("failed to read {}", path.display()))
}

/// Dominant genotypes per environment, each sorted by `update_born`.
pub fn load_snapshots(layout: &RunLayout) -> Result<EnvTriple<Vec<DataRecord>>> {
    EnvTriple::try_from_fn(|env| -> Result<Vec<DataRecord>> {
        let path = layout.final_dominant(env);
        let mut records = read_records(&path)?;
        sort_by_update_born(&mut records)
            .with_context(|| format!("failed to sort {}", path.display()))?;
        Ok(records)
    })
}

pub fn load_lineage(layout: &RunLayout) -> Result<EnvTriple<Vec<DataRecord>>> {
    EnvTriple::try_from_fn(|env| -> Result<Vec<DataRecord>> {
        read_records(&layout.lineage_tasks(env))
    })
}

pub fn lineage_summary(layout: &RunLayout, encoder: &PhenotypeEncoder) -> Result<LineageSummary> {
    let lineage = load_lineage(layout)?;
    reduce_lineage(&lineage, encoder)
        .with_context(|| format!("failed to reduce lineage in {}", layout.root().display()))
}

/// Flatten one run directory into a summary row.
pub fn process_run(
    run: &RunDir,
    config: &AggregateConfig,
    encoder: &PhenotypeEncoder,
) -> Result<SummaryRow> {
    let layout = RunLayout::new(&run.path);
    tracing::info!(run = %run.name, "processing run");

    let cmd_log = layout.cmd_log();
    let params = read_cmd_log(&cmd_log)
        .with_context(|| format!("failed to read {}", cmd_log.display()))?;

    let mut info = RunInfo::new();
    let boundary = config.phase_boundary_update.as_str();
    let time = read_records(&layout.time_dat())?;
    average_generation(&time, boundary, &mut info)
        .with_context(|| format!("in {}", layout.time_dat().display()))?;
    let tasks = read_records(&layout.tasks_dat())?;
    pop_equals(&tasks, boundary, &mut info)
        .with_context(|| format!("in {}", layout.tasks_dat().display()))?;

    let snapshots = load_snapshots(&layout)?;
    let phases = reconcile_phases(&snapshots, encoder)
        .with_context(|| format!("in final_dominant data of {}", run.name))?;
    for phase in &phases {
        phase.write_into(&mut info);
    }

    let lineage = lineage_summary(&layout, encoder)?;
    lineage.write_into(&mut info);

    tracing::debug!(
        run = %run.name,
        phases = phases.len(),
        lineage_length = lineage.length,
        "derived run summary"
    );
    Ok(SummaryRow {
        run_id: run.name.clone(),
        params: params.into_columns(),
        info,
    })
}
