//! Simulation Builder
//!
//! The SimulationBuilder starts from a quiescent parameter set and layers
//! scenario settings on top. Events and treatments are registered by name
//! and cross-references between them are resolved when `build()` is called,
//! after which the finished configuration is validated.
//!
//! # Example
//!
//! ```ignore
//! use smokesim_core::config::{EventBuilder, SimulationBuilder, TreatmentBuilder};
//! use smokesim_core::model::{Gender, SmokingIntensity, SmokingStatus};
//!
//! let config = SimulationBuilder::new()
//!     .run_size(1000)
//!     .discount_rate(0.03)
//!     .initial_age_years(45.0)
//!     .smoking(SmokingStatus::Current, SmokingIntensity::Heavy)
//!     .quit_probability(0.01)
//!     .event(EventBuilder::new("CHD").incidence(0.001).death_probability(0.1))
//!     .prophylaxis(TreatmentBuilder::new("Statin").monthly_start(0.01).event_efficacy("CHD", 0.7))
//!     .build()?;
//! ```

use std::collections::HashMap;

use super::event_builder::EventBuilder;
use super::treatment_builder::TreatmentBuilder;
use super::{
    LIFETABLE_YEARS, NaturalHistory, QualityOfLife, RelapseCurve, SimulationConfig,
};
use crate::error::ConfigError;
use crate::model::{
    AgeBracket, ByGender, ByIntensity, ByStatus, EventId, Gender, InterventionId, ProphylaxisId,
    SmokingIntensity, SmokingStatus,
};
use crate::sampling::TruncatedNormal;

/// Builder for simulations with name-based event and treatment references
#[derive(Debug, Clone)]
pub struct SimulationBuilder {
    config: SimulationConfig,
    pending_events: Vec<EventBuilder>,
    pending_interventions: Vec<TreatmentBuilder>,
    pending_prophylaxes: Vec<TreatmentBuilder>,
}

impl Default for SimulationBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn flat_table(probability: f64) -> ByGender<Vec<f64>> {
    ByGender::uniform(vec![probability; LIFETABLE_YEARS])
}

impl SimulationBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: SimulationConfig::default(),
            pending_events: Vec::new(),
            pending_interventions: Vec::new(),
            pending_prophylaxes: Vec::new(),
        }
    }

    /// Start from an existing parameter set
    #[must_use]
    pub fn from_config(config: SimulationConfig) -> Self {
        Self {
            config,
            ..Self::new()
        }
    }

    // =========================================================================
    // Run settings
    // =========================================================================

    #[must_use]
    pub fn run_size(mut self, patients: u32) -> Self {
        self.config.run.run_size = patients;
        self
    }

    #[must_use]
    pub fn discount_rate(mut self, annual_rate: f64) -> Self {
        self.config.run.discount_rate_annual = annual_rate;
        self
    }

    #[must_use]
    pub fn fixed_seed(mut self, fixed: bool) -> Self {
        self.config.run.fixed_seed = fixed;
        self
    }

    #[must_use]
    pub fn max_age(mut self, years: u32) -> Self {
        self.config.run.max_age_years = years;
        self
    }

    #[must_use]
    pub fn enable_qol(mut self, enabled: bool) -> Self {
        self.config.run.enable_qol = enabled;
        self
    }

    #[must_use]
    pub fn trace_patients(mut self, patients: u32) -> Self {
        self.config.run.trace_patients = patients;
        self
    }

    // =========================================================================
    // Initial population
    // =========================================================================

    #[must_use]
    pub fn initial_age(mut self, age_months: TruncatedNormal) -> Self {
        self.config.init.age_months = age_months;
        self
    }

    /// Every patient starts at exactly this age
    #[must_use]
    pub fn initial_age_years(self, years: f64) -> Self {
        self.initial_age(TruncatedNormal::fixed(years * 12.0))
    }

    /// Every patient has this gender
    #[must_use]
    pub fn gender(mut self, gender: Gender) -> Self {
        let mut weights = ByGender::uniform(0.0);
        *weights.get_mut(gender) = 1.0;
        self.config.init.gender_weights = weights;
        self
    }

    /// Every patient starts with this smoking status and intensity
    #[must_use]
    pub fn smoking(mut self, status: SmokingStatus, intensity: SmokingIntensity) -> Self {
        let ones = [1.0; AgeBracket::COUNT];
        let zeros = [0.0; AgeBracket::COUNT];

        let mut statuses = ByStatus::uniform(zeros);
        *statuses.get_mut(status) = ones;
        let mut intensities = ByIntensity::uniform(zeros);
        *intensities.get_mut(intensity) = ones;

        self.config.init.smoking_status = ByGender::uniform(statuses);
        self.config.init.smoking_intensity = ByGender::uniform(intensities);
        self
    }

    #[must_use]
    pub fn months_since_quit(mut self, months: TruncatedNormal) -> Self {
        self.config.init.months_since_quit = months;
        self
    }

    // =========================================================================
    // Natural history and smoking behaviour
    // =========================================================================

    /// Constant monthly never-smoker mortality at every age
    #[must_use]
    pub fn never_smoker_mortality(mut self, probability: f64) -> Self {
        self.config.natural_history.never_smoker_lifetable = flat_table(probability);
        self
    }

    #[must_use]
    pub fn natural_history(mut self, natural_history: NaturalHistory) -> Self {
        self.config.natural_history = natural_history;
        self
    }

    #[must_use]
    pub fn start_probability(mut self, probability: f64) -> Self {
        self.config.smoking.start_probability = flat_table(probability);
        self
    }

    #[must_use]
    pub fn quit_probability(mut self, probability: f64) -> Self {
        self.config.smoking.quit_probability = flat_table(probability);
        self
    }

    /// Same relapse curve for every intensity and age bracket
    #[must_use]
    pub fn relapse(mut self, curve: RelapseCurve) -> Self {
        self.config.smoking.relapse = ByIntensity::uniform([curve; AgeBracket::COUNT]);
        self
    }

    #[must_use]
    pub fn background_cost(mut self, monthly: f64) -> Self {
        self.config.background.monthly_cost =
            ByGender::uniform(ByStatus::uniform([monthly; AgeBracket::COUNT]));
        self
    }

    #[must_use]
    pub fn quality_of_life(mut self, qol: QualityOfLife) -> Self {
        self.config.quality_of_life = qol;
        self
    }

    // =========================================================================
    // Events and treatments
    // =========================================================================

    #[must_use]
    pub fn event(mut self, builder: EventBuilder) -> Self {
        self.pending_events.push(builder);
        self
    }

    #[must_use]
    pub fn intervention(mut self, builder: TreatmentBuilder) -> Self {
        self.pending_interventions.push(builder);
        self
    }

    #[must_use]
    pub fn prophylaxis(mut self, builder: TreatmentBuilder) -> Self {
        self.pending_prophylaxes.push(builder);
        self
    }

    /// Resolve name references and validate the finished configuration
    pub fn build(self) -> Result<SimulationConfig, ConfigError> {
        let mut config = self.config;

        let base_events = config.events.len();
        let event_ids: HashMap<String, EventId> = config
            .events
            .iter()
            .map(|e| e.name.clone())
            .chain(self.pending_events.iter().map(|b| b.name().to_string()))
            .enumerate()
            .map(|(i, name)| (name, EventId(i as u16)))
            .collect();
        let num_events = base_events + self.pending_events.len();
        let lookup = |name: &str| event_ids.get(name).copied();
        let unknown_event = |name: String| ConfigError::UnknownName {
            kind: "event",
            name,
        };

        let intervention_ids: HashMap<String, InterventionId> = config
            .interventions
            .iter()
            .map(|t| t.name.clone())
            .chain(self.pending_interventions.iter().map(|b| b.name.clone()))
            .enumerate()
            .map(|(i, name)| (name, InterventionId(i as u16)))
            .collect();
        let prophylaxis_ids: HashMap<String, ProphylaxisId> = config
            .prophylaxes
            .iter()
            .map(|t| t.name.clone())
            .chain(self.pending_prophylaxes.iter().map(|b| b.name.clone()))
            .enumerate()
            .map(|(i, name)| (name, ProphylaxisId(i as u16)))
            .collect();

        for builder in self.pending_events {
            let mut definition = builder.definition;
            if let Some(name) = builder.start_prophylaxis {
                let id = prophylaxis_ids
                    .get(&name)
                    .copied()
                    .ok_or(ConfigError::UnknownName {
                        kind: "prophylaxis",
                        name,
                    })?;
                definition.screening.outcome.start_prophylaxis = Some(id);
            }
            if let Some(name) = builder.start_intervention {
                let id = intervention_ids
                    .get(&name)
                    .copied()
                    .ok_or(ConfigError::UnknownName {
                        kind: "intervention",
                        name,
                    })?;
                definition.screening.outcome.start_intervention = Some(id);
            }
            config.events.push(definition);
        }

        for builder in self.pending_interventions {
            let definition = builder
                .into_intervention(num_events, &lookup)
                .map_err(unknown_event)?;
            config.interventions.push(definition);
        }
        for builder in self.pending_prophylaxes {
            let definition = builder
                .into_prophylaxis(num_events, &lookup)
                .map_err(unknown_event)?;
            config.prophylaxes.push(definition);
        }

        config.validate()?;
        Ok(config)
    }
}
