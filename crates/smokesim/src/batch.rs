//! Batch execution of parameter files
//!
//! Each parameter file is an independent cohort run. A file that fails to
//! load, validate or simulate is logged and skipped; the batch continues
//! with the next file.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use color_eyre::eyre::{WrapErr, eyre};
use smokesim_core::run_cohort;

use crate::loader::{discover_parameter_files, load_config};
use crate::report::{JsonReport, render_report};
use crate::util::io::atomic_write;

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Directory for output files; defaults to the input file's directory
    pub output_dir: Option<PathBuf>,
    /// Also write a JSON dump of the summaries and monthly records
    pub json: bool,
}

/// Files produced for one parameter file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    pub report: PathBuf,
    pub trace: PathBuf,
    pub json: Option<PathBuf>,
}

impl OutputPaths {
    pub fn for_input(input: &Path, options: &RunOptions) -> color_eyre::Result<Self> {
        let stem = input
            .file_stem()
            .ok_or_else(|| eyre!("{} has no file name", input.display()))?;
        let dir = match &options.output_dir {
            Some(dir) => dir.clone(),
            None => input.parent().map(Path::to_path_buf).unwrap_or_default(),
        };
        let stem = stem.to_string_lossy();
        let output = |ext: &str| dir.join(format!("{stem}.{ext}"));
        Ok(Self {
            report: output("smout"),
            trace: output("smtrace"),
            json: options.json.then(|| output("json")),
        })
    }
}

/// Load, run and write the outputs for one parameter file
pub fn run_file(input: &Path, options: &RunOptions) -> color_eyre::Result<OutputPaths> {
    let config = load_config(input)?;
    let outputs = OutputPaths::for_input(input, options)?;
    if let Some(dir) = &options.output_dir {
        fs::create_dir_all(dir)
            .wrap_err_with(|| format!("failed to create {}", dir.display()))?;
    }

    let started = Instant::now();
    let result = run_cohort(&config)
        .wrap_err_with(|| format!("simulation of {} failed", input.display()))?;

    let report = render_report(&config, &result)?;
    atomic_write(&outputs.report, &report)
        .wrap_err_with(|| format!("failed to write {}", outputs.report.display()))?;
    atomic_write(&outputs.trace, &result.trace_text())
        .wrap_err_with(|| format!("failed to write {}", outputs.trace.display()))?;
    if let Some(path) = &outputs.json {
        let json = serde_json::to_string_pretty(&JsonReport::new(&result))?;
        atomic_write(path, &json)
            .wrap_err_with(|| format!("failed to write {}", path.display()))?;
    }

    tracing::info!(
        input = %input.display(),
        report = %outputs.report.display(),
        patients = result.metrics.patients,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Parameter file complete"
    );
    Ok(outputs)
}

/// Outcome of a batch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub completed: Vec<OutputPaths>,
    pub failed: Vec<PathBuf>,
}

/// Run every parameter file found under `paths`
pub fn run_batch(paths: &[PathBuf], options: &RunOptions) -> BatchSummary {
    let files = discover_parameter_files(paths);
    tracing::info!(files = files.len(), "Starting batch");

    let mut summary = BatchSummary::default();
    for file in files {
        match run_file(&file, options) {
            Ok(outputs) => summary.completed.push(outputs),
            Err(e) => {
                tracing::warn!(file = %file.display(), error = %e, "Parameter file failed");
                summary.failed.push(file);
            }
        }
    }

    tracing::info!(
        completed = summary.completed.len(),
        failed = summary.failed.len(),
        "Batch complete"
    );
    summary
}
