//! Run metrics for profiling and logging
//!
//! Collected by the cohort runner after every patient has finished, so the
//! numbers do not depend on the order in which patients completed.

use serde::{Deserialize, Serialize};

use crate::patient::PatientRun;

/// Counters describing the size of a finished cohort run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunMetrics {
    /// Number of patients simulated
    pub patients: u64,
    /// Sum over patients of months simulated, including the month of death
    pub patient_months: u64,
    /// Longest single lifetime in months
    pub longest_lifetime_months: u64,
    /// Number of months held in the cohort-level monthly record
    pub cohort_months: u64,
    /// Patients that kept a trace
    pub traced_patients: u64,
}

impl RunMetrics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_patient(&mut self, run: &PatientRun) {
        let months = u64::try_from(run.months_lived()).unwrap_or(0);
        self.patients += 1;
        self.patient_months += months;
        self.longest_lifetime_months = self.longest_lifetime_months.max(months);
        if run.trace.is_some() {
            self.traced_patients += 1;
        }
    }

    /// Average months simulated per patient
    #[must_use]
    pub fn mean_lifetime_months(&self) -> f64 {
        if self.patients == 0 {
            0.0
        } else {
            self.patient_months as f64 / self.patients as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_metrics() {
        let metrics = RunMetrics::new();
        assert_eq!(metrics.patients, 0);
        assert_eq!(metrics.mean_lifetime_months(), 0.0);
    }
}
