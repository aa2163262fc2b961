//! Unique identifiers for simulation entities
//!
//! Each entity type has its own ID type to provide type safety and prevent
//! mixing up different kinds of identifiers. All of them are dense indices
//! into the corresponding parameter or output vectors.

use serde::{Deserialize, Serialize};

/// Index of a patient within a cohort run
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PatientId(pub u32);

/// Index of a disease event within `SimulationConfig::events`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EventId(pub u16);

/// Index of an intervention within `SimulationConfig::interventions`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct InterventionId(pub u16);

/// Index of a prophylaxis within `SimulationConfig::prophylaxes`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProphylaxisId(pub u16);

impl PatientId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl EventId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl InterventionId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl ProphylaxisId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}
