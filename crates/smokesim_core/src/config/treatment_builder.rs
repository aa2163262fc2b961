//! Treatment Builder DSL
//!
//! One builder covers both interventions and prophylaxes; the simulation
//! builder decides which definition it becomes. Options that only apply to
//! one kind are ignored by the other.
//!
//! ```ignore
//! use smokesim_core::config::TreatmentBuilder;
//!
//! let varenicline = TreatmentBuilder::new("Varenicline")
//!     .monthly_start(0.02)
//!     .max_duration(3)
//!     .stop_on_quit()
//!     .quit_multiplier(2.5)
//!     .monthly_cost(150.0);
//!
//! let statin = TreatmentBuilder::new("Statin")
//!     .monthly_start(0.01)
//!     .event_efficacy("CHD", 0.7);
//! ```

use super::{
    InterventionDefinition, ProphylaxisDefinition, StartRule, Toxicity, TreatmentCosts,
};
use crate::model::{AgeBracket, ByGender, ByIntensity, ByStatus, EventId, SmokingStatus};

/// Builder for an intervention or a prophylaxis
#[derive(Debug, Clone)]
pub struct TreatmentBuilder {
    pub(crate) name: String,
    start: StartRule,
    stop_probability: ByIntensity<ByGender<f64>>,
    toxicity: Toxicity,
    costs: TreatmentCosts,

    // Intervention only
    stop_after_abstinence_months: Option<i64>,
    max_duration_months: Option<i64>,
    stop_on_quit: bool,
    quit_multiplier: f64,
    relapse_multiplier: f64,

    // Prophylaxis only
    status_multiplier: ByGender<ByStatus<f64>>,

    // Resolved against event names at build time
    pub(crate) history_multipliers: Vec<(String, f64)>,
    pub(crate) event_efficacy: Vec<(String, f64)>,
    pub(crate) complication_efficacy: Vec<(String, f64)>,
}

impl TreatmentBuilder {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            start: StartRule::default(),
            stop_probability: ByIntensity::default(),
            toxicity: Toxicity::default(),
            costs: TreatmentCosts::default(),
            stop_after_abstinence_months: None,
            max_duration_months: None,
            stop_on_quit: false,
            quit_multiplier: 1.0,
            relapse_multiplier: 1.0,
            status_multiplier: ByGender::uniform(ByStatus::uniform(1.0)),
            history_multipliers: Vec::new(),
            event_efficacy: Vec::new(),
            complication_efficacy: Vec::new(),
        }
    }

    // =========================================================================
    // Start and stop
    // =========================================================================

    #[must_use]
    pub fn monthly_start(mut self, probability: f64) -> Self {
        self.start.monthly = ByIntensity::uniform(ByGender::uniform(probability));
        self
    }

    /// Probability of being on treatment when the patient is created
    #[must_use]
    pub fn initial_start(mut self, probability: f64) -> Self {
        self.start.initial = ByIntensity::uniform(ByGender::uniform(probability));
        self
    }

    #[must_use]
    pub fn age_multiplier(mut self, multiplier: f64) -> Self {
        self.start.age_multiplier = ByGender::uniform([multiplier; AgeBracket::COUNT]);
        self
    }

    /// Scale the start probability while the named event is at the full stage
    #[must_use]
    pub fn event_history_multiplier(mut self, event: impl Into<String>, multiplier: f64) -> Self {
        self.history_multipliers.push((event.into(), multiplier));
        self
    }

    #[must_use]
    pub fn stop_probability(mut self, probability: f64) -> Self {
        self.stop_probability = ByIntensity::uniform(ByGender::uniform(probability));
        self
    }

    #[must_use]
    pub fn toxicity(mut self, toxicity: Toxicity) -> Self {
        self.toxicity = toxicity;
        self
    }

    #[must_use]
    pub fn start_cost(mut self, cost: f64) -> Self {
        self.costs.start = cost;
        self
    }

    #[must_use]
    pub fn monthly_cost(mut self, cost: f64) -> Self {
        self.costs.monthly = cost;
        self
    }

    // =========================================================================
    // Intervention options
    // =========================================================================

    #[must_use]
    pub fn stop_after_abstinence(mut self, months: i64) -> Self {
        self.stop_after_abstinence_months = Some(months);
        self
    }

    #[must_use]
    pub fn max_duration(mut self, months: i64) -> Self {
        self.max_duration_months = Some(months);
        self
    }

    #[must_use]
    pub fn stop_on_quit(mut self) -> Self {
        self.stop_on_quit = true;
        self
    }

    #[must_use]
    pub fn quit_multiplier(mut self, multiplier: f64) -> Self {
        self.quit_multiplier = multiplier;
        self
    }

    #[must_use]
    pub fn relapse_multiplier(mut self, multiplier: f64) -> Self {
        self.relapse_multiplier = multiplier;
        self
    }

    // =========================================================================
    // Prophylaxis options
    // =========================================================================

    #[must_use]
    pub fn status_multiplier(mut self, status: SmokingStatus, multiplier: f64) -> Self {
        *self.status_multiplier.female.get_mut(status) = multiplier;
        *self.status_multiplier.male.get_mut(status) = multiplier;
        self
    }

    #[must_use]
    pub fn event_efficacy(mut self, event: impl Into<String>, multiplier: f64) -> Self {
        self.event_efficacy.push((event.into(), multiplier));
        self
    }

    #[must_use]
    pub fn complication_efficacy(mut self, event: impl Into<String>, multiplier: f64) -> Self {
        self.complication_efficacy.push((event.into(), multiplier));
        self
    }

    // =========================================================================
    // Resolution
    // =========================================================================

    /// `lookup` maps an event name to its id
    fn per_event(
        entries: &[(String, f64)],
        num_events: usize,
        lookup: &impl Fn(&str) -> Option<EventId>,
    ) -> Result<Vec<f64>, String> {
        if entries.is_empty() {
            return Ok(Vec::new());
        }
        let mut table = vec![1.0; num_events];
        for (name, value) in entries {
            let id = lookup(name).ok_or_else(|| name.clone())?;
            table[id.index()] = *value;
        }
        Ok(table)
    }

    fn resolved_start(
        &self,
        num_events: usize,
        lookup: &impl Fn(&str) -> Option<EventId>,
    ) -> Result<StartRule, String> {
        let history = Self::per_event(&self.history_multipliers, num_events, lookup)?;
        Ok(StartRule {
            event_history_multiplier: ByGender::uniform(history),
            ..self.start.clone()
        })
    }

    pub(crate) fn into_intervention(
        self,
        num_events: usize,
        lookup: &impl Fn(&str) -> Option<EventId>,
    ) -> Result<InterventionDefinition, String> {
        Ok(InterventionDefinition {
            start: self.resolved_start(num_events, lookup)?,
            name: self.name,
            stop_probability: self.stop_probability,
            stop_after_abstinence_months: self.stop_after_abstinence_months,
            max_duration_months: self.max_duration_months,
            stop_on_quit: self.stop_on_quit,
            quit_multiplier: self.quit_multiplier,
            relapse_multiplier: self.relapse_multiplier,
            toxicity: self.toxicity,
            costs: self.costs,
        })
    }

    pub(crate) fn into_prophylaxis(
        self,
        num_events: usize,
        lookup: &impl Fn(&str) -> Option<EventId>,
    ) -> Result<ProphylaxisDefinition, String> {
        Ok(ProphylaxisDefinition {
            start: self.resolved_start(num_events, lookup)?,
            event_efficacy: Self::per_event(&self.event_efficacy, num_events, lookup)?,
            complication_efficacy: Self::per_event(&self.complication_efficacy, num_events, lookup)?,
            name: self.name,
            stop_probability: self.stop_probability,
            status_multiplier: self.status_multiplier,
            toxicity: self.toxicity,
            costs: self.costs,
        })
    }
}
