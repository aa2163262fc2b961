//! Scenario tests for the smokesim cohort engine
//!
//! Tests are organized by topic:
//! - `scenarios` - Whole-lifetime runs with closed-form expectations
//! - `determinism` - Fixed-seed reproducibility and trace ordering
//! - `screening` - Screening, confirmatory testing and detection
//! - `treatments` - Intervention and prophylaxis start, stop and toxicity

mod scenarios;
mod screening;
