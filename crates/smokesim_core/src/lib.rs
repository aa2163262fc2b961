//! Smoking and chronic disease cohort microsimulation
//!
//! This crate simulates a cohort of synthetic patients month by month from
//! an initial age until death. It supports:
//! - Smoking initiation, quitting and relapse with age-dependent rates
//! - Disease events with an optional pre-event stage, screening and
//!   confirmatory testing
//! - Complications, smoking-adjusted incidence and natural-history mortality
//! - Cessation interventions and disease prophylaxes with toxicity
//! - Discounted and undiscounted costs, life months and quality-adjusted life
//!   months, per patient and per simulated month
//!
//! # Builder DSL
//!
//! ```ignore
//! use smokesim_core::config::{EventBuilder, SimulationBuilder};
//! use smokesim_core::model::{SmokingIntensity, SmokingStatus};
//! use smokesim_core::simulation::run_cohort;
//!
//! let config = SimulationBuilder::new()
//!     .run_size(1_000)
//!     .initial_age_years(40.0)
//!     .smoking(SmokingStatus::Current, SmokingIntensity::Heavy)
//!     .quit_probability(0.005)
//!     .event(EventBuilder::new("Lung Cancer")
//!         .incidence(0.0005)
//!         .death_probability(0.1))
//!     .build()?;
//!
//! let result = run_cohort(&config)?;
//! println!("{:?}", result.summary().discounted);
//! ```

#![warn(clippy::all)]

// ============================================================================
// Core modules
// ============================================================================

pub mod accumulators;
pub mod error;
pub mod metrics;
pub mod mortality;
pub mod patient;
pub mod sampling;
pub mod simulation;
pub mod summary;
pub mod transition;

// ============================================================================
// Type definition modules
// ============================================================================

pub mod config;
pub mod model;

// ============================================================================
// Test modules
// ============================================================================

#[cfg(test)]
mod tests;

// ============================================================================
// Public re-exports for convenience
// ============================================================================

pub use config::{EventBuilder, SimulationBuilder, SimulationConfig, TreatmentBuilder};
pub use error::{ConfigError, Result, SimulationError};
pub use simulation::{CohortResult, run_cohort, simulate_patient};
pub use summary::{CohortTotals, PopulationSummary};
