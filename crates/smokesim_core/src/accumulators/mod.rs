//! Output accumulators
//!
//! Three collaborating structures receive every write the state machine
//! makes:
//!
//! - [`PatientOutcomes`]: undiscounted tallies owned by one patient
//! - [`DiscountedOutcomes`]: a pair of [`ValueLedger`]s, discounted and
//!   undiscounted, owned by one patient
//! - [`MonthlyOutputs`]: cohort totals per simulated month, shared by every
//!   patient in the run
//!
//! Per-patient structures are returned by value when the patient dies, so
//! only the monthly accumulator needs synchronisation.

mod ledger;
mod monthly;
mod outcomes;

pub use ledger::{DiscountedOutcomes, ValueLedger};
pub use monthly::{MonthLayout, MonthRecord, MonthSummary, MonthlyOutputs};
pub use outcomes::{DeathRecord, InitialState, PatientOutcomes};

use serde::{Deserialize, Serialize};

use crate::model::{
    AgeBracket, EventId, Gender, InterventionId, ProphylaxisId, SmokingIntensity, SmokingStatus,
};

/// Demographic cell most outputs are broken down by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Stratum {
    pub status: SmokingStatus,
    pub bracket: AgeBracket,
    pub gender: Gender,
}

impl Stratum {
    pub const COUNT: usize = SmokingStatus::COUNT * AgeBracket::COUNT * Gender::COUNT;

    pub fn new(status: SmokingStatus, bracket: AgeBracket, gender: Gender) -> Self {
        Self {
            status,
            bracket,
            gender,
        }
    }

    /// Dense index in status-major order
    pub fn index(self) -> usize {
        (self.status.index() * AgeBracket::COUNT + self.bracket.index()) * Gender::COUNT
            + self.gender.index()
    }

    pub fn all() -> impl Iterator<Item = Stratum> {
        SmokingStatus::ALL.into_iter().flat_map(|status| {
            AgeBracket::all().flat_map(move |bracket| {
                Gender::ALL
                    .into_iter()
                    .map(move |gender| Stratum::new(status, bracket, gender))
            })
        })
    }
}

/// Values by smoking status, age bracket and gender
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ByStratum<T>(pub [[[T; Gender::COUNT]; AgeBracket::COUNT]; SmokingStatus::COUNT]);

impl<T> ByStratum<T> {
    pub fn get(&self, s: Stratum) -> &T {
        &self.0[s.status.index()][s.bracket.index()][s.gender.index()]
    }

    pub fn get_mut(&mut self, s: Stratum) -> &mut T {
        &mut self.0[s.status.index()][s.bracket.index()][s.gender.index()]
    }

    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.0.iter().flatten().flatten()
    }
}

impl ByStratum<f64> {
    pub fn total(&self) -> f64 {
        self.values().sum()
    }

    pub fn accumulate(&mut self, other: &Self) {
        for s in Stratum::all() {
            *self.get_mut(s) += other.get(s);
        }
    }
}

/// Tallies by age bracket and gender
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ByBracketGender<T>(pub [[T; Gender::COUNT]; AgeBracket::COUNT]);

impl<T> ByBracketGender<T> {
    pub fn get(&self, bracket: AgeBracket, gender: Gender) -> &T {
        &self.0[bracket.index()][gender.index()]
    }

    pub fn get_mut(&mut self, bracket: AgeBracket, gender: Gender) -> &mut T {
        &mut self.0[bracket.index()][gender.index()]
    }

    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.0.iter().flatten()
    }
}

/// Where a cost is booked, alongside the overall total
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CostCategory {
    Event(EventId),
    Complication(EventId),
    Screening(EventId),
    Prophylaxis(ProphylaxisId),
    Intervention(InterventionId),
    Background,
}

/// Status and intensity pair used by the alive/death tallies
pub fn status_intensity_index(status: SmokingStatus, intensity: SmokingIntensity) -> usize {
    status.index() * SmokingIntensity::COUNT + intensity.index()
}

pub const STATUS_INTENSITY_COUNT: usize = SmokingStatus::COUNT * SmokingIntensity::COUNT;
