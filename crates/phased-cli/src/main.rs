use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use phased_aggregate::cmd_log::read_cmd_log;
use phased_aggregate::dat::DatFile;
use phased_aggregate::lineage::LineageSummary;
use phased_aggregate::run::{lineage_summary, RunLayout};
use phased_aggregate::{aggregate_runs, AggregateConfig, AggregateError, AggregateReport, Strictness};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "phased",
    version,
    about = "Aggregate phased-environment evolution runs"
)]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    Aggregate {
        #[arg(long)]
        data_dir: PathBuf,
        #[arg(long, default_value = ".")]
        dump: PathBuf,
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long)]
        lenient: bool,
        #[arg(long)]
        json: bool,
    },
    InspectDat {
        file: PathBuf,
        #[arg(long)]
        json: bool,
    },
    CmdParams {
        file: PathBuf,
        #[arg(long)]
        json: bool,
    },
    InspectLineage {
        run_dir: PathBuf,
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let json_mode = command_json_mode(&cli.command);
    let result = run_command(cli.command);
    match result {
        Ok(Some(payload)) => {
            emit_json(&payload);
            Ok(())
        }
        Ok(None) => Ok(()),
        Err(err) => {
            if json_mode {
                emit_json(&json_error(error_code(&err), format!("{:#}", err), json!({})));
                std::process::exit(1);
            }
            Err(err)
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn run_command(command: Commands) -> Result<Option<Value>> {
    match command {
        Commands::Aggregate {
            data_dir,
            dump,
            config,
            lenient,
            json,
        } => {
            let mut config = AggregateConfig::load_or_default(config.as_deref())?;
            if lenient {
                config.strictness = Strictness::Lenient;
            }
            tracing::debug!(
                data_dir = %data_dir.display(),
                dump = %dump.display(),
                strictness = config.strictness.as_str(),
                "resolved aggregate configuration"
            );
            let report = aggregate_runs(&data_dir, &dump, &config)?;
            if json {
                return Ok(Some(json!({
                    "ok": true,
                    "command": "aggregate",
                    "data_dir": data_dir.display().to_string(),
                    "strictness": config.strictness.as_str(),
                    "report": report_to_json(&report)
                })));
            }
            print_report(&report);
        }
        Commands::InspectDat { file, json } => {
            let dat = DatFile::read(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            if json {
                return Ok(Some(json!({
                    "ok": true,
                    "command": "inspect-dat",
                    "file": dat.source,
                    "marker": dat.marker,
                    "fields": dat.fields,
                    "records": dat.records
                })));
            }
            println!("file: {}", dat.source);
            match dat.marker {
                Some(marker) => println!("legend: {:?}", marker),
                None => println!("legend: none (first line)"),
            }
            println!("fields: {}", dat.fields.len());
            for (i, field) in dat.fields.iter().enumerate() {
                println!("  {:>3}: {}", i + 1, field);
            }
            println!("records: {}", dat.records.len());
        }
        Commands::CmdParams { file, json } => {
            let params = read_cmd_log(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let columns = params.into_columns();
            if json {
                return Ok(Some(json!({
                    "ok": true,
                    "command": "cmd-params",
                    "file": file.display().to_string(),
                    "params": columns
                })));
            }
            for (key, value) in &columns {
                println!("{}: {}", key, value);
            }
        }
        Commands::InspectLineage {
            run_dir,
            config,
            json,
        } => {
            let config = AggregateConfig::load_or_default(config.as_deref())?;
            let summary = lineage_summary(&RunLayout::new(&run_dir), &config.encoder())?;
            if json {
                return Ok(Some(json!({
                    "ok": true,
                    "command": "inspect-lineage",
                    "run_dir": run_dir.display().to_string(),
                    "lineage": summary
                })));
            }
            print_lineage(&run_dir, &summary);
        }
    }
    Ok(None)
}

fn report_to_json(report: &AggregateReport) -> Value {
    json!({
        "runs": report.runs,
        "skipped_runs": report.skipped,
        "failed_runs": report.failed,
        "columns": report.columns,
        "csv": report.csv_path.display().to_string(),
        "manifest": report.manifest_path.display().to_string()
    })
}

fn print_report(report: &AggregateReport) {
    println!("runs: {}", report.runs.len());
    println!("columns: {}", report.columns);
    if !report.skipped.is_empty() {
        println!("skipped: {}", report.skipped.join(", "));
    }
    for failed in &report.failed {
        println!("failed: {} ({})", failed.run, failed.error);
    }
    println!("csv: {}", report.csv_path.display());
    println!("manifest: {}", report.manifest_path.display());
}

fn print_lineage(run_dir: &Path, summary: &LineageSummary) {
    let show = |update: &Option<String>| update.clone().unwrap_or_else(|| "None".to_string());
    println!("run_dir: {}", run_dir.display());
    println!("lineage_length: {}", summary.length);
    println!("equals_odd_even_update: {}", show(&summary.first.equals_odd_even_update));
    println!("equals_all_update: {}", show(&summary.first.equals_all_update));
    println!("equals_any_update: {}", show(&summary.first.equals_any_update));
    println!("plastic_odd_even_update: {}", show(&summary.first.plastic_odd_even_update));
    println!("update_born even odd plastic equals_odd_even equals_any score_odd_even");
    for step in &summary.steps {
        println!(
            "{} {} {} {} {} {} {}",
            step.update_born,
            step.phenotype_even,
            step.phenotype_odd,
            step.plastic_odd_even,
            step.equals_odd_even,
            step.equals_any,
            step.match_score_odd_even
        );
    }
}

fn error_code(err: &anyhow::Error) -> &'static str {
    let Some(err) = err.chain().find_map(|e| e.downcast_ref::<AggregateError>()) else {
        return "command_failed";
    };
    match err {
        AggregateError::DataDirMissing { .. } => "data_dir_missing",
        AggregateError::ParseSchema { .. } => "parse_schema",
        AggregateError::LengthMismatch { .. } | AggregateError::RecordCountMismatch { .. } => {
            "length_mismatch"
        }
        AggregateError::HeaderMismatch { .. } => "header_mismatch",
        AggregateError::NoRuns => "no_runs",
        _ => "command_failed",
    }
}

fn emit_json(value: &Value) {
    match serde_json::to_string(value) {
        Ok(s) => println!("{}", s),
        Err(_) => println!(
            "{{\"ok\":false,\"error\":{{\"code\":\"serialization_error\",\"message\":\"failed to serialize JSON payload\",\"details\":{{}}}}}}"
        ),
    }
}

fn json_error(code: &str, message: String, details: Value) -> Value {
    json!({
        "ok": false,
        "error": {
            "code": code,
            "message": message,
            "details": details
        }
    })
}

fn command_json_mode(command: &Commands) -> bool {
    match command {
        Commands::Aggregate { json, .. }
        | Commands::InspectDat { json, .. }
        | Commands::CmdParams { json, .. }
        | Commands::InspectLineage { json, .. } => *json,
    }
}
