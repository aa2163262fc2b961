use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{WrapErr, bail};
use smokesim::loader::template_yaml;
use smokesim::util::io::atomic_write;
use smokesim::{RunOptions, init_logging, run_batch};

#[derive(Parser, Debug)]
#[command(name = "smokesim")]
#[command(about = "Monthly smoking and chronic disease cohort microsimulation")]
struct Args {
    /// Log level (debug, info, warn, error)
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    /// Append logs to this file instead of stderr
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run every parameter file given, or found in the given directories
    Run {
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Write outputs here instead of next to each parameter file
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Also write a JSON dump of the results
        #[arg(long)]
        json: bool,
    },
    /// Write a template parameter file
    Template { path: PathBuf },
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let args = Args::parse();
    init_logging(&args.log_level, args.log_file.as_deref())?;

    match args.command {
        Command::Run {
            paths,
            output_dir,
            json,
        } => {
            let summary = run_batch(&paths, &RunOptions { output_dir, json });
            for outputs in &summary.completed {
                println!("{}", outputs.report.display());
            }
            if summary.completed.is_empty() && !summary.failed.is_empty() {
                bail!("all {} parameter files failed", summary.failed.len());
            }
        }
        Command::Template { path } => {
            let yaml = template_yaml()?;
            atomic_write(&path, &yaml)
                .wrap_err_with(|| format!("failed to write {}", path.display()))?;
            tracing::info!(path = %path.display(), "Template written");
        }
    }

    Ok(())
}
