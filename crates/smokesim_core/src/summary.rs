//! Population summaries
//!
//! Reductions over a finished cohort. [`PopulationSummary`] holds the
//! headline per-patient statistics; [`CohortTotals`] folds every patient's
//! tallies and ledgers into cohort sums for reporting.
//!
//! Standard deviations are population standard deviations (divide by `n`).

use serde::{Deserialize, Serialize};

use crate::accumulators::{
    ByBracketGender, MonthLayout, STATUS_INTENSITY_COUNT, ValueLedger, status_intensity_index,
};
use crate::model::{DeathCause, Gender};
use crate::patient::PatientRun;

// ============================================================================
// Statistics helpers
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MeanStd {
    pub mean: f64,
    pub std_dev: f64,
}

impl MeanStd {
    /// `None` for an empty sample
    pub fn of(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        Some(Self {
            mean,
            std_dev: variance.sqrt(),
        })
    }
}

/// Location and spread of a sample, for durations that need more than a mean
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Distribution {
    pub mean: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    /// Interquartile range using linear interpolation between order statistics
    pub iqr: f64,
}

impl Distribution {
    pub fn of(values: &[f64]) -> Option<Self> {
        let MeanStd { mean, std_dev } = MeanStd::of(values)?;
        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);
        Some(Self {
            mean,
            std_dev,
            min: sorted[0],
            max: sorted[sorted.len() - 1],
            iqr: percentile(&sorted, 0.75) - percentile(&sorted, 0.25),
        })
    }
}

/// Percentile of a non-empty sorted sample, `q` in [0, 1]
fn percentile(sorted: &[f64], q: f64) -> f64 {
    let position = q * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * fraction
}

/// Mean over the non-zero entries only; zero when every entry is zero
fn mean_nonzero(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, n) = values
        .filter(|v| *v != 0.0)
        .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 { 0.0 } else { sum / n as f64 }
}

// ============================================================================
// Population summary
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ValueSummary {
    pub costs: MeanStd,
    pub life_months: MeanStd,
    pub qalms: MeanStd,
}

impl ValueSummary {
    fn from_ledgers<'a>(ledgers: impl Iterator<Item = &'a ValueLedger> + Clone) -> Self {
        let collect = |f: fn(&ValueLedger) -> f64| {
            let values: Vec<f64> = ledgers.clone().map(f).collect();
            MeanStd::of(&values).unwrap_or_default()
        };
        Self {
            costs: collect(ValueLedger::total_costs),
            life_months: collect(ValueLedger::total_life_months),
            qalms: collect(ValueLedger::total_qalms),
        }
    }
}

/// Headline statistics across the cohort
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PopulationSummary {
    pub patients: usize,
    pub discounted: ValueSummary,
    pub undiscounted: ValueSummary,
    /// Initial age in years
    pub initial_age_years: MeanStd,
    /// Months abstinent before each relapse, over all relapses
    pub quit_duration_months: Option<Distribution>,
    /// Age in years at each quit, over all quits
    pub age_at_quit_years: Option<MeanStd>,
}

impl PopulationSummary {
    pub fn from_runs(runs: &[PatientRun]) -> Self {
        let ages: Vec<f64> = runs
            .iter()
            .map(|r| r.outcomes.initial.age_months as f64 / 12.0)
            .collect();
        let durations: Vec<f64> = runs
            .iter()
            .flat_map(|r| r.outcomes.quit_durations.iter().map(|&m| m as f64))
            .collect();
        let ages_at_quit: Vec<f64> = runs
            .iter()
            .flat_map(|r| r.outcomes.ages_at_quit.iter().map(|&m| m as f64 / 12.0))
            .collect();

        Self {
            patients: runs.len(),
            discounted: ValueSummary::from_ledgers(runs.iter().map(|r| &r.values.discounted)),
            undiscounted: ValueSummary::from_ledgers(runs.iter().map(|r| &r.values.undiscounted)),
            initial_age_years: MeanStd::of(&ages).unwrap_or_default(),
            quit_duration_months: Distribution::of(&durations),
            age_at_quit_years: MeanStd::of(&ages_at_quit),
        }
    }
}

// ============================================================================
// Cohort totals
// ============================================================================

/// Per-event cohort totals
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventTotals {
    pub prevalent: u64,
    pub incident: u64,
    /// Mean months with the full event among patients who had it
    pub mean_months_with_event: f64,
    pub pre_event_incident: u64,
    /// Mean months with the pre-event among patients who had it
    pub mean_pre_event_months: f64,
    pub complications: u64,
}

/// Sums of every patient's tallies and ledgers
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CohortTotals {
    pub patients: u64,
    pub initial_status_intensity: Vec<u64>,
    pub initial_gender: [u64; Gender::COUNT],
    pub death_status_intensity: Vec<u64>,
    /// Indexed by [`DeathCause::index`]
    pub death_causes: Vec<u64>,
    pub events: Vec<EventTotals>,
    pub smoking_starts: u64,
    pub quits: ByBracketGender<u64>,
    pub relapses: ByBracketGender<u64>,
    pub ever_quit: u64,
    pub ever_relapse: u64,
    pub ever_started_intervention: u64,
    pub intervention_starts: Vec<u64>,
    pub intervention_toxicities: Vec<u64>,
    pub prophylaxis_toxicities: Vec<u64>,
    pub discounted: ValueLedger,
    pub undiscounted: ValueLedger,
}

fn sum_into(target: &mut [u64], source: &[u32]) {
    for (t, s) in target.iter_mut().zip(source) {
        *t += u64::from(*s);
    }
}

impl CohortTotals {
    pub fn from_runs(runs: &[PatientRun], layout: MonthLayout) -> Self {
        let mut totals = Self {
            patients: runs.len() as u64,
            initial_status_intensity: vec![0; STATUS_INTENSITY_COUNT],
            death_status_intensity: vec![0; STATUS_INTENSITY_COUNT],
            death_causes: vec![0; DeathCause::count(layout.events)],
            events: vec![EventTotals::default(); layout.events],
            intervention_starts: vec![0; layout.interventions],
            intervention_toxicities: vec![0; layout.interventions],
            prophylaxis_toxicities: vec![0; layout.prophylaxes],
            discounted: ValueLedger::new(layout.events, layout.interventions, layout.prophylaxes),
            undiscounted: ValueLedger::new(layout.events, layout.interventions, layout.prophylaxes),
            ..Self::default()
        };

        for run in runs {
            let out = &run.outcomes;
            let initial = out.initial;
            totals.initial_status_intensity
                [status_intensity_index(initial.status, initial.intensity)] += 1;
            totals.initial_gender[initial.gender.index()] += 1;
            if let Some(death) = out.death {
                totals.death_status_intensity
                    [status_intensity_index(death.status, death.intensity)] += 1;
                totals.death_causes[death.cause.index(layout.events)] += 1;
            }

            for (e, event) in totals.events.iter_mut().enumerate() {
                event.prevalent += u64::from(out.events_prevalent[e]);
                event.incident += u64::from(out.events_incident[e]);
                event.pre_event_incident += u64::from(out.pre_events_incident[e]);
                event.complications += u64::from(out.complications[e]);
            }

            totals.smoking_starts += u64::from(out.smoking_starts);
            for (t, s) in totals.quits.0.iter_mut().flatten().zip(out.quits.values()) {
                *t += u64::from(*s);
            }
            for (t, s) in totals.relapses.0.iter_mut().flatten().zip(out.relapses.values()) {
                *t += u64::from(*s);
            }
            totals.ever_quit += u64::from(out.ever_quit);
            totals.ever_relapse += u64::from(out.ever_relapse);
            totals.ever_started_intervention += u64::from(out.ever_started_intervention);

            sum_into(&mut totals.intervention_starts, &out.intervention_starts);
            sum_into(&mut totals.intervention_toxicities, &out.intervention_toxicities);
            sum_into(&mut totals.prophylaxis_toxicities, &out.prophylaxis_toxicities);

            totals.discounted.accumulate(&run.values.discounted);
            totals.undiscounted.accumulate(&run.values.undiscounted);
        }

        for (e, event) in totals.events.iter_mut().enumerate() {
            event.mean_months_with_event =
                mean_nonzero(runs.iter().map(|r| r.outcomes.event_months[e] as f64));
            event.mean_pre_event_months =
                mean_nonzero(runs.iter().map(|r| f64::from(r.outcomes.pre_event_months[e])));
        }
        totals
    }

    /// Cohort sum divided by the number of patients
    pub fn per_patient(&self, total: f64) -> f64 {
        if self.patients == 0 {
            0.0
        } else {
            total / self.patients as f64
        }
    }
}
