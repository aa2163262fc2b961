//! Event Builder DSL
//!
//! Fluent construction of a disease event. Treatments started on detection
//! are referenced by name and resolved by [`super::SimulationBuilder::build`].
//!
//! ```ignore
//! use smokesim_core::config::EventBuilder;
//!
//! let lung = EventBuilder::new("Lung Cancer")
//!     .pre_event_incidence(0.0005)
//!     .pre_event_progression(0.02)
//!     .regular_screening(55, 12, 20)
//!     .confirmatory_test(2, 0.001)
//!     .on_detection_start_prophylaxis("Chemoprevention")
//!     .incidence(0.0002)
//!     .death_probability(0.3);
//! ```

use super::{EventCosts, EventDefinition, EventQol, QuitBoost, SmokingAdjustedRate};
use crate::model::{AgeBracket, ByGender, ByIntensity, ByStatus, SmokingStatus};

/// Builder for a single disease event
#[derive(Debug, Clone)]
pub struct EventBuilder {
    pub(crate) definition: EventDefinition,
    pub(crate) start_prophylaxis: Option<String>,
    pub(crate) start_intervention: Option<String>,
}

impl EventBuilder {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            definition: EventDefinition::named(name),
            start_prophylaxis: None,
            start_intervention: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.definition.name
    }

    // =========================================================================
    // Prevalence and incidence
    // =========================================================================

    /// Same prevalence for every gender, smoking state and age
    #[must_use]
    pub fn prevalence(mut self, probability: f64) -> Self {
        self.definition.prevalence =
            ByGender::uniform(ByStatus::uniform(ByIntensity::uniform(
                [probability; AgeBracket::COUNT],
            )));
        self
    }

    /// Prevalence for one smoking status, leaving the others unchanged
    #[must_use]
    pub fn prevalence_for(mut self, status: SmokingStatus, probability: f64) -> Self {
        for gender in [
            &mut self.definition.prevalence.female,
            &mut self.definition.prevalence.male,
        ] {
            *gender.get_mut(status) = ByIntensity::uniform([probability; AgeBracket::COUNT]);
        }
        self
    }

    #[must_use]
    pub fn incidence(mut self, probability: f64) -> Self {
        self.definition.incidence = SmokingAdjustedRate::flat(probability);
        self
    }

    #[must_use]
    pub fn incidence_rate(mut self, rate: SmokingAdjustedRate) -> Self {
        self.definition.incidence = rate;
        self
    }

    #[must_use]
    pub fn death_probability(mut self, probability: f64) -> Self {
        self.definition.death_probability = probability;
        self
    }

    #[must_use]
    pub fn complication(mut self, probability: f64) -> Self {
        self.definition.complication = SmokingAdjustedRate::flat(probability);
        self
    }

    #[must_use]
    pub fn complication_rate(mut self, rate: SmokingAdjustedRate) -> Self {
        self.definition.complication = rate;
        self
    }

    #[must_use]
    pub fn complication_death_probability(mut self, probability: f64) -> Self {
        self.definition.complication_death_probability = probability;
        self
    }

    // =========================================================================
    // Pre-event
    // =========================================================================

    #[must_use]
    pub fn pre_event_incidence(mut self, probability: f64) -> Self {
        self.definition.pre_event.incidence = SmokingAdjustedRate::flat(probability);
        self
    }

    #[must_use]
    pub fn pre_event_incidence_rate(mut self, rate: SmokingAdjustedRate) -> Self {
        self.definition.pre_event.incidence = rate;
        self
    }

    #[must_use]
    pub fn pre_event_progression(mut self, probability: f64) -> Self {
        self.definition.pre_event.progression =
            ByGender::uniform([probability; AgeBracket::COUNT]);
        self
    }

    #[must_use]
    pub fn pre_event_mortality_multiplier(mut self, multiplier: f64) -> Self {
        self.definition.pre_event.mortality_multiplier =
            ByGender::uniform([multiplier; AgeBracket::COUNT]);
        self
    }

    // =========================================================================
    // Screening
    // =========================================================================

    #[must_use]
    pub fn sensitivity(mut self, probability: f64) -> Self {
        self.definition.screening.sensitivity = ByGender::uniform(probability);
        self
    }

    #[must_use]
    pub fn specificity(mut self, probability: f64) -> Self {
        self.definition.screening.specificity = ByGender::uniform(probability);
        self
    }

    #[must_use]
    pub fn background_screening(mut self, probability: f64) -> Self {
        self.definition.screening.background_probability =
            ByGender::uniform([probability; AgeBracket::COUNT]);
        self
    }

    /// Regular screening from `start_age_years` for every smoking status
    #[must_use]
    pub fn regular_screening(
        mut self,
        start_age_years: u32,
        interval_months: i64,
        max_screens: u32,
    ) -> Self {
        let regular = &mut self.definition.screening.regular;
        regular.start_age_years = ByStatus::uniform(Some(start_age_years));
        regular.interval_months = interval_months;
        regular.max_screens = max_screens;
        self
    }

    /// Restrict or change the regular screening start age for one status
    #[must_use]
    pub fn regular_screening_start(mut self, status: SmokingStatus, age_years: Option<u32>) -> Self {
        *self
            .definition
            .screening
            .regular
            .start_age_years
            .get_mut(status) = age_years;
        self
    }

    #[must_use]
    pub fn screening_skip_probability(mut self, probability: f64) -> Self {
        self.definition.screening.regular.skip_probability = probability;
        self
    }

    #[must_use]
    pub fn confirmatory_test(mut self, delay_months: i64, mortality: f64) -> Self {
        self.definition.screening.confirmatory.delay_months = delay_months;
        self.definition.screening.confirmatory.mortality = mortality;
        self
    }

    #[must_use]
    pub fn cure_probability(mut self, probability: f64) -> Self {
        self.definition.screening.outcome.cure_probability = probability;
        self
    }

    #[must_use]
    pub fn detected_progression_multiplier(mut self, multiplier: f64) -> Self {
        self.definition.screening.outcome.progression_multiplier = multiplier;
        self
    }

    #[must_use]
    pub fn detected_mortality_multiplier(mut self, multiplier: f64) -> Self {
        self.definition.screening.outcome.mortality_multiplier = multiplier;
        self
    }

    /// Start the named prophylaxis when a pre-event is confirmed
    #[must_use]
    pub fn on_detection_start_prophylaxis(mut self, name: impl Into<String>) -> Self {
        self.start_prophylaxis = Some(name.into());
        self
    }

    /// Start the named intervention when a pre-event is confirmed
    #[must_use]
    pub fn on_detection_start_intervention(mut self, name: impl Into<String>) -> Self {
        self.start_intervention = Some(name.into());
        self
    }

    // =========================================================================
    // Smoking response, costs and quality of life
    // =========================================================================

    #[must_use]
    pub fn quit_after_event(mut self, probability: f64, window_months: i64) -> Self {
        self.definition.quit_after_event = Some(QuitBoost {
            probability,
            window_months,
        });
        self
    }

    #[must_use]
    pub fn quit_after_complication(mut self, probability: f64, window_months: i64) -> Self {
        self.definition.quit_after_complication = Some(QuitBoost {
            probability,
            window_months,
        });
        self
    }

    #[must_use]
    pub fn costs(mut self, costs: EventCosts) -> Self {
        self.definition.costs = costs;
        self
    }

    #[must_use]
    pub fn qol(mut self, qol: EventQol) -> Self {
        self.definition.qol = qol;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Gender, SmokingIntensity};

    #[test]
    fn test_prevalence_for_one_status() {
        let event = EventBuilder::new("COPD")
            .prevalence(0.01)
            .prevalence_for(SmokingStatus::Current, 0.05)
            .definition;
        let bracket = AgeBracket::from_age_months(720);
        assert_eq!(
            event.prevalence(
                Gender::Male,
                SmokingStatus::Current,
                SmokingIntensity::Heavy,
                bracket
            ),
            0.05
        );
        assert_eq!(
            event.prevalence(
                Gender::Female,
                SmokingStatus::Never,
                SmokingIntensity::Light,
                bracket
            ),
            0.01
        );
    }

    #[test]
    fn test_regular_screening_schedule() {
        let event = EventBuilder::new("Lung Cancer")
            .regular_screening(55, 12, 20)
            .regular_screening_start(SmokingStatus::Never, None)
            .definition;
        let regular = &event.screening.regular;
        assert_eq!(*regular.start_age_years.get(SmokingStatus::Current), Some(55));
        assert_eq!(*regular.start_age_years.get(SmokingStatus::Never), None);
        assert_eq!(regular.max_screens, 20);
    }
}
