//! Error types for configuration and simulation
//!
//! Configuration errors are detected once, when a parameter set is
//! validated. Simulation errors are model-construction faults detected while
//! a patient is being simulated; any one of them aborts the whole run.

use thiserror::Error;

use crate::model::{EventId, EventStage, PatientId};

/// A parameter set that cannot be simulated
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("{field} must be a probability in [0, 1], got {value}")]
    InvalidProbability { field: String, value: f64 },

    #[error("{field} must be finite and non-negative, got {value}")]
    NegativeValue { field: String, value: f64 },

    #[error("{field} must be positive")]
    NonPositive { field: String },

    #[error("{field}: transition window lower bound {lower} exceeds upper bound {upper}")]
    InvalidTransitionWindow {
        field: String,
        lower: i64,
        upper: i64,
    },

    #[error("{field} has {len} entries but at least {required} are needed")]
    TableTooShort {
        field: String,
        len: usize,
        required: usize,
    },

    #[error("{field} has {len} entries, expected {expected}")]
    LengthMismatch {
        field: String,
        len: usize,
        expected: usize,
    },

    #[error("{field} refers to unknown {kind} #{index}")]
    UnknownTreatment {
        field: String,
        kind: &'static str,
        index: usize,
    },

    #[error("{field} is not a valid truncated normal distribution")]
    InvalidDistribution { field: String },

    #[error("{field} has no positive weight to draw from")]
    InvalidWeights { field: String },

    #[error("duplicate {kind} name '{name}'")]
    DuplicateName { kind: &'static str, name: String },

    #[error("no {kind} named '{name}'")]
    UnknownName { kind: &'static str, name: String },
}

/// A fault inside the patient state machine
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimulationError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("patient {patient:?} reached the death draw in month {month} with no mortality risks")]
    EmptyRiskSet { patient: PatientId, month: i64 },

    #[error("patient {patient:?}: event {event:?} cannot leave the full stage (to {to:?}) in month {month}")]
    StageReversal {
        patient: PatientId,
        event: EventId,
        to: EventStage,
        month: i64,
    },
}

pub type Result<T> = std::result::Result<T, SimulationError>;
