//! Cohort runner
//!
//! Each patient is an independent unit of work with its own random number
//! generator. Patients share only the read-only configuration and the
//! month-indexed [`MonthlyOutputs`]; everything else a patient produces is
//! returned by value and stored by patient id.
//!
//! With the `parallel` feature (default) patients run on the rayon pool;
//! without it they run one after another. Given a fixed seed both paths
//! produce identical results.

use std::time::Instant;

use rand::SeedableRng;
use rand::rngs::SmallRng;
#[cfg(feature = "parallel")]
use rayon::iter::{IntoParallelIterator, ParallelIterator};
use serde::Serialize;

use crate::accumulators::{MonthLayout, MonthSummary, MonthlyOutputs};
use crate::config::SimulationConfig;
use crate::error::Result;
use crate::metrics::RunMetrics;
use crate::model::PatientId;
use crate::patient::{Patient, PatientRun};
use crate::summary::{CohortTotals, PopulationSummary};

/// Everything a finished cohort run produces
#[derive(Debug, Clone, Serialize)]
pub struct CohortResult {
    /// Per-patient results, indexed by patient id
    pub patients: Vec<PatientRun>,
    /// One summary per simulated month, starting at month zero
    pub monthly: Vec<MonthSummary>,
    pub layout: MonthLayout,
    pub metrics: RunMetrics,
}

impl CohortResult {
    pub fn patient(&self, id: PatientId) -> Option<&PatientRun> {
        self.patients.get(id.index())
    }

    /// Trace buffers of traced patients, concatenated in ascending id order
    #[must_use]
    pub fn trace_text(&self) -> String {
        self.patients
            .iter()
            .filter_map(|run| run.trace.as_deref())
            .collect()
    }

    #[must_use]
    pub fn summary(&self) -> PopulationSummary {
        PopulationSummary::from_runs(&self.patients)
    }

    #[must_use]
    pub fn totals(&self) -> CohortTotals {
        CohortTotals::from_runs(&self.patients, self.layout)
    }
}

fn patient_rng(config: &SimulationConfig, id: PatientId) -> SmallRng {
    if config.run.fixed_seed {
        SmallRng::seed_from_u64(u64::from(id.0))
    } else {
        SmallRng::from_rng(&mut rand::rng())
    }
}

/// Simulate one patient from initialisation to death
///
/// The configuration is assumed valid; [`run_cohort`] validates it once
/// before any patient starts.
pub fn simulate_patient(
    config: &SimulationConfig,
    id: PatientId,
    monthly: &MonthlyOutputs,
) -> Result<PatientRun> {
    let mut rng = patient_rng(config, id);
    let result = Patient::new(config, id, &mut rng)
        .and_then(|patient| patient.run_until_death(monthly, &mut rng));
    if let Err(e) = &result {
        tracing::error!(patient = id.0, error = %e, "Patient simulation failed");
    }
    result
}

#[cfg(feature = "parallel")]
fn simulate_all(config: &SimulationConfig, monthly: &MonthlyOutputs) -> Result<Vec<PatientRun>> {
    (0..config.run.run_size)
        .into_par_iter()
        .map(|i| simulate_patient(config, PatientId(i), monthly))
        .collect()
}

#[cfg(not(feature = "parallel"))]
fn simulate_all(config: &SimulationConfig, monthly: &MonthlyOutputs) -> Result<Vec<PatientRun>> {
    (0..config.run.run_size)
        .map(|i| simulate_patient(config, PatientId(i), monthly))
        .collect()
}

/// Validate the configuration and simulate the whole cohort
///
/// Fails fast: the first patient error aborts the run and is returned.
pub fn run_cohort(config: &SimulationConfig) -> Result<CohortResult> {
    config.validate()?;

    let layout = MonthLayout::new(
        config.events.len(),
        config.interventions.len(),
        config.prophylaxes.len(),
    );
    tracing::info!(
        run_size = config.run.run_size,
        events = layout.events,
        interventions = layout.interventions,
        prophylaxes = layout.prophylaxes,
        fixed_seed = config.run.fixed_seed,
        "Starting cohort run"
    );
    let started = Instant::now();

    let monthly = MonthlyOutputs::new(layout);
    let patients = simulate_all(config, &monthly)?;

    let mut metrics = RunMetrics::new();
    for run in &patients {
        metrics.record_patient(run);
    }
    metrics.cohort_months = monthly.len() as u64;

    tracing::info!(
        patients = metrics.patients,
        patient_months = metrics.patient_months,
        longest_lifetime_months = metrics.longest_lifetime_months,
        cohort_months = metrics.cohort_months,
        traced_patients = metrics.traced_patients,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Cohort run complete"
    );

    Ok(CohortResult {
        patients,
        monthly: monthly.summaries(),
        layout,
        metrics,
    })
}
