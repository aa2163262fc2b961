//! Command-line front end for the smokesim cohort simulator
//!
//! Discovers YAML parameter files, runs each as an independent cohort and
//! writes a text report (`.smout`), a patient trace (`.smtrace`) and
//! optionally a JSON dump beside it.

pub mod batch;
pub mod loader;
pub mod logging;
pub mod report;
pub mod util;

pub use batch::{BatchSummary, OutputPaths, RunOptions, run_batch, run_file};
pub use logging::init_logging;
