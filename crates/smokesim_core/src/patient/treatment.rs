//! Intervention and prophylaxis updates
//!
//! Both kinds of treatment share one monthly structure: evaluate stop rules
//! for an active treatment, evaluate the start rule for an inactive one, then
//! roll toxicity for whatever is active. Start and toxicity may both fire in
//! the same month.

use rand::Rng;

use super::{Patient, SmokingState};
use crate::accumulators::{CostCategory, MonthRecord};
use crate::config::{InterventionDefinition, ProphylaxisDefinition, StartRule};
use crate::model::{
    AgeCurve, ByGender, ByIntensity, DeathCause, InterventionId, ProphylaxisId, by_bracket,
};
use crate::sampling::fires;

impl Patient<'_> {
    pub(super) fn update_interventions<R: Rng + ?Sized>(
        &mut self,
        record: &MonthRecord,
        rng: &mut R,
    ) {
        if self.smoking == SmokingState::Never {
            return;
        }

        let config = self.config;
        for id in config.intervention_ids() {
            let def = config.intervention(id);

            if self.interventions[id.index()].active && self.intervention_stops(def, id, rng) {
                self.stop_intervention(record, id);
            }

            let state = self.interventions[id.index()];
            if self.smoking == SmokingState::Current
                && !state.active
                && (!state.had_toxicity || def.toxicity.allow_restart)
            {
                let probability = self.start_base(&def.start.monthly, &def.start.age_multiplier)
                    * self.max_history_multiplier(&def.start);
                if fires(rng, probability) {
                    self.start_intervention(record, id);
                }
            }

            if self.interventions[id.index()].active && fires(rng, def.toxicity.probability) {
                self.intervention_toxicity(id, def);
                self.risks
                    .add(DeathCause::InterventionToxicity, def.toxicity.death_probability);
                if def.toxicity.stop_on_toxicity {
                    self.stop_intervention(record, id);
                }
            }
        }
    }

    /// Abstinence, then duration, then the monthly stochastic stop
    fn intervention_stops<R: Rng + ?Sized>(
        &self,
        def: &InterventionDefinition,
        id: InterventionId,
        rng: &mut R,
    ) -> bool {
        if let (Some(limit), Some(abstinent)) = (
            def.stop_after_abstinence_months,
            self.smoking.months_since_quit(self.month),
        ) && abstinent >= limit
        {
            return true;
        }

        if let (Some(limit), Some(start)) = (
            def.max_duration_months,
            self.interventions[id.index()].start_month,
        ) && self.month - start >= limit
        {
            return true;
        }

        fires(rng, self.by_intensity_gender(&def.stop_probability))
    }

    pub(super) fn update_prophylaxes<R: Rng + ?Sized>(
        &mut self,
        record: &MonthRecord,
        rng: &mut R,
    ) {
        let config = self.config;
        let status = self.smoking.status();
        for id in config.prophylaxis_ids() {
            let def = config.prophylaxis(id);

            if self.prophylaxes[id.index()].active
                && fires(rng, self.by_intensity_gender(&def.stop_probability))
            {
                self.stop_prophylaxis(record, id);
            }

            let state = self.prophylaxes[id.index()];
            if !state.active && (!state.had_toxicity || def.toxicity.allow_restart) {
                let probability = self.start_base(&def.start.monthly, &def.start.age_multiplier)
                    * self.max_history_multiplier(&def.start)
                    * def.status_multiplier.get(self.gender).get(status);
                if fires(rng, probability) {
                    self.start_prophylaxis(record, id);
                }
            }

            if self.prophylaxes[id.index()].active && fires(rng, def.toxicity.probability) {
                self.prophylaxis_toxicity(id, def);
                self.risks
                    .add(DeathCause::ProphylaxisToxicity, def.toxicity.death_probability);
                if def.toxicity.stop_on_toxicity {
                    self.stop_prophylaxis(record, id);
                }
            }
        }
    }

    // ========================================================================
    // Start probabilities
    // ========================================================================

    pub(super) fn start_base(
        &self,
        rates: &ByIntensity<ByGender<f64>>,
        age_multiplier: &ByGender<AgeCurve>,
    ) -> f64 {
        self.by_intensity_gender(rates) * by_bracket(age_multiplier.get(self.gender), self.bracket)
    }

    /// Largest history multiplier among full events; 1 with no full events
    pub(super) fn max_history_multiplier(&self, rule: &StartRule) -> f64 {
        self.full_events()
            .map(|e| rule.history_multiplier(self.gender, e))
            .reduce(f64::max)
            .unwrap_or(1.0)
    }

    pub(super) fn product_history_multiplier(&self, rule: &StartRule) -> f64 {
        self.full_events()
            .map(|e| rule.history_multiplier(self.gender, e))
            .product()
    }

    /// Largest value of `f` over active interventions
    pub(super) fn max_active_intervention(
        &self,
        f: impl Fn(&InterventionDefinition) -> f64,
    ) -> Option<f64> {
        let config = self.config;
        config
            .intervention_ids()
            .filter(|i| self.interventions[i.index()].active)
            .map(|i| f(config.intervention(i)))
            .reduce(f64::max)
    }

    /// Product of `f` over active prophylaxes
    pub(super) fn active_prophylaxis_product(
        &self,
        f: impl Fn(&ProphylaxisDefinition) -> f64,
    ) -> f64 {
        let config = self.config;
        config
            .prophylaxis_ids()
            .filter(|p| self.prophylaxes[p.index()].active)
            .map(|p| f(config.prophylaxis(p)))
            .product()
    }

    // ========================================================================
    // Transitions
    // ========================================================================

    /// Mark an intervention active without cost or tallies
    pub(super) fn activate_intervention(&mut self, id: InterventionId) {
        let state = &mut self.interventions[id.index()];
        state.active = true;
        state.start_month = Some(self.month);
        self.outcomes.ever_started_intervention = true;
    }

    pub(super) fn start_intervention(&mut self, record: &MonthRecord, id: InterventionId) {
        self.activate_intervention(id);
        let config = self.config;
        let def = config.intervention(id);
        self.add_cost(record, CostCategory::Intervention(id), def.costs.start);
        self.outcomes.record_intervention_start(id);
        record.record_intervention_start(id);

        let (month, name) = (self.month, def.name.as_str());
        self.trace(|| format!("\n**{month} Starting Intervention: {name}"));
    }

    pub(super) fn stop_intervention(&mut self, record: &MonthRecord, id: InterventionId) {
        self.interventions[id.index()].active = false;
        record.record_intervention_stop(id);

        let config = self.config;
        let (month, name) = (self.month, config.intervention(id).name.as_str());
        self.trace(|| format!("\n**{month} Stopping Intervention: {name}"));
    }

    fn intervention_toxicity(&mut self, id: InterventionId, def: &InterventionDefinition) {
        self.interventions[id.index()].had_toxicity = true;
        self.apply_qol(def.toxicity.qol_multiplier);
        self.outcomes.record_intervention_toxicity(id);

        let (month, name) = (self.month, def.name.as_str());
        self.trace(|| format!("\n**{month} Toxicity Intervention: {name}"));
    }

    pub(super) fn start_prophylaxis(&mut self, record: &MonthRecord, id: ProphylaxisId) {
        self.prophylaxes[id.index()].active = true;
        self.prophylaxes[id.index()].start_month = Some(self.month);
        let config = self.config;
        let def = config.prophylaxis(id);
        self.add_cost(record, CostCategory::Prophylaxis(id), def.costs.start);
        record.record_prophylaxis_start(id);

        let (month, name) = (self.month, def.name.as_str());
        self.trace(|| format!("\n**{month} Starting Proph: {name}"));
    }

    fn stop_prophylaxis(&mut self, record: &MonthRecord, id: ProphylaxisId) {
        self.prophylaxes[id.index()].active = false;
        record.record_prophylaxis_stop(id);

        let config = self.config;
        let (month, name) = (self.month, config.prophylaxis(id).name.as_str());
        self.trace(|| format!("\n**{month} Stopping Proph: {name}"));
    }

    fn prophylaxis_toxicity(&mut self, id: ProphylaxisId, def: &ProphylaxisDefinition) {
        self.prophylaxes[id.index()].had_toxicity = true;
        self.apply_qol(def.toxicity.qol_multiplier);
        self.outcomes.record_prophylaxis_toxicity(id);

        let (month, name) = (self.month, def.name.as_str());
        self.trace(|| format!("\n**{month} Toxicity Proph: {name}"));
    }
}
