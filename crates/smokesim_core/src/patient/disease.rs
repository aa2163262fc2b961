//! Disease events and natural-history mortality

use rand::Rng;

use super::{Patient, SmokingState};
use crate::accumulators::{CostCategory, MonthRecord};
use crate::config::{CurrentSmokerMortality, FormerSmokerMortality};
use crate::error::{Result, SimulationError};
use crate::model::{DeathCause, EventId, EventStage, by_bracket, by_year};
use crate::sampling::fires;

impl Patient<'_> {
    /// Roll pre-event incidence for events still at the `none` stage
    pub(super) fn update_pre_events<R: Rng + ?Sized>(
        &mut self,
        record: &MonthRecord,
        rng: &mut R,
    ) -> Result<()> {
        let config = self.config;
        for e in config.event_ids() {
            if self.events[e.index()].stage != EventStage::None {
                continue;
            }
            let p = config
                .event(e)
                .pre_event
                .incidence
                .probability(self.gender, self.bracket, self.exposure());
            if fires(rng, p) {
                self.enter_pre_event(record, e)?;
            }
        }

        for e in config.event_ids() {
            if self.events[e.index()].stage == EventStage::Pre {
                self.outcomes.record_pre_event_month(e);
            }
        }
        Ok(())
    }

    /// Complications for full events, progression for pre-events, then
    /// direct incidence for events still at `none`
    pub(super) fn update_events<R: Rng + ?Sized>(
        &mut self,
        record: &MonthRecord,
        rng: &mut R,
    ) -> Result<()> {
        let config = self.config;

        for e in config.event_ids() {
            if self.events[e.index()].stage != EventStage::Full {
                continue;
            }
            let def = config.event(e);
            self.add_cost(record, CostCategory::Event(e), def.costs.monthly);
            self.apply_qol(def.qol.monthly);

            let p = def
                .complication
                .probability(self.gender, self.bracket, self.exposure())
                * self.active_prophylaxis_product(|proph| proph.complication_efficacy(e));
            if fires(rng, p) {
                self.complication(record, e);
                self.risks
                    .add(DeathCause::Complication(e), def.complication_death_probability);
            }
        }

        for e in config.event_ids() {
            let state = &self.events[e.index()];
            if state.stage != EventStage::Pre {
                continue;
            }
            let def = config.event(e);
            let mut p = by_bracket(def.pre_event.progression.get(self.gender), self.bracket);
            if state.detected {
                p *= def.screening.outcome.progression_multiplier;
            }
            if fires(rng, p) {
                self.event_onset(record, e)?;
            }
        }

        for e in config.event_ids() {
            if self.events[e.index()].stage != EventStage::None {
                continue;
            }
            let def = config.event(e);
            let p = def
                .incidence
                .probability(self.gender, self.bracket, self.exposure())
                * self.active_prophylaxis_product(|proph| proph.event_efficacy(e));
            if fires(rng, p) {
                self.event_onset(record, e)?;
                self.risks.add(DeathCause::Event(e), def.death_probability);
            }
        }
        Ok(())
    }

    /// Add this month's natural-history hazard to the risk set
    pub(super) fn update_natural_history(&mut self) {
        let config = self.config;
        let nh = &config.natural_history;
        let (gender, intensity, bracket, age) =
            (self.gender, self.intensity, self.bracket, self.age_months);

        let pre_event_multiplier: f64 = config
            .event_ids()
            .filter(|e| self.events[e.index()].stage == EventStage::Pre)
            .map(|e| {
                let def = config.event(e);
                let m = by_bracket(def.pre_event.mortality_multiplier.get(gender), bracket);
                if self.events[e.index()].detected {
                    m * def.screening.outcome.mortality_multiplier
                } else {
                    m
                }
            })
            .product();

        let never = by_year(nh.never_smoker_lifetable.get(gender), age);
        let current = || match &nh.current_smoker {
            CurrentSmokerMortality::Multiplier { multipliers } => {
                never * by_bracket(multipliers.get(intensity).get(gender), bracket)
            }
            CurrentSmokerMortality::Lifetable { lifetable } => {
                by_year(lifetable.get(intensity).get(gender), age)
            }
        };

        let hazard = match self.smoking {
            SmokingState::Never => never,
            SmokingState::Current => current(),
            SmokingState::Former {
                quit_month,
                quit_bracket,
            } => {
                let ex = match &nh.former_smoker {
                    FormerSmokerMortality::Multiplier { multipliers } => {
                        never * by_bracket(multipliers.get(intensity).get(gender), bracket)
                    }
                    FormerSmokerMortality::Lifetable {
                        age_at_quit_multipliers,
                        lifetable,
                    } => {
                        by_bracket(
                            age_at_quit_multipliers.get(intensity).get(gender),
                            quit_bracket,
                        ) * by_year(lifetable.get(intensity).get(gender), age)
                    }
                };
                nh.transition.blend(self.month - quit_month, current(), ex)
            }
        };

        self.risks
            .add(DeathCause::NaturalHistory, hazard * pre_event_multiplier);
    }

    // ========================================================================
    // Stage transitions
    // ========================================================================

    /// Move an event to a new stage. A full event never leaves the full stage.
    pub(super) fn set_stage(&mut self, e: EventId, to: EventStage) -> Result<()> {
        let state = &mut self.events[e.index()];
        if state.stage == EventStage::Full && to != EventStage::Full {
            return Err(SimulationError::StageReversal {
                patient: self.id,
                event: e,
                to,
                month: self.month,
            });
        }
        state.stage = to;
        state.entered_month = Some(self.month);
        Ok(())
    }

    /// Full stage without onset cost or tallies; used for prevalent events
    pub(super) fn enter_full_stage(&mut self, e: EventId) -> Result<()> {
        self.set_stage(e, EventStage::Full)?;
        self.events[e.index()].confirmatory_month = None;
        Ok(())
    }

    fn event_onset(&mut self, record: &MonthRecord, e: EventId) -> Result<()> {
        self.enter_full_stage(e)?;
        let config = self.config;
        let def = config.event(e);
        self.add_cost(record, CostCategory::Event(e), def.costs.onset);
        self.apply_qol(def.qol.onset);
        self.outcomes.record_incident(e);
        record.record_event_incidence(e, self.stratum());

        let (month, name) = (self.month, def.name.as_str());
        self.trace(|| format!("\n**{month} Event {name}"));
        Ok(())
    }

    fn enter_pre_event(&mut self, record: &MonthRecord, e: EventId) -> Result<()> {
        self.set_stage(e, EventStage::Pre)?;
        self.outcomes.record_pre_event(e);
        record.record_pre_event_incidence(e, self.stratum());

        let config = self.config;
        let (month, name) = (self.month, config.event(e).name.as_str());
        self.trace(|| format!("\n**{month} Pre-event {name}"));
        Ok(())
    }

    pub(super) fn cure_pre_event(&mut self, e: EventId) -> Result<()> {
        self.set_stage(e, EventStage::None)?;
        self.events[e.index()].detected = false;

        let config = self.config;
        let (month, name) = (self.month, config.event(e).name.as_str());
        self.trace(|| format!("\n**{month} Pre-event {name} Cured"));
        Ok(())
    }

    fn complication(&mut self, record: &MonthRecord, e: EventId) {
        self.events[e.index()].complication_month = Some(self.month);
        let config = self.config;
        let def = config.event(e);
        self.add_cost(record, CostCategory::Complication(e), def.costs.complication);
        self.apply_qol(def.qol.complication);
        self.outcomes.record_complication(e);
        record.record_complication(e, self.stratum());

        let (month, name) = (self.month, def.name.as_str());
        self.trace(|| format!("\n**{month} Event {name} Complication"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EventBuilder, SimulationBuilder};
    use crate::model::PatientId;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    #[test]
    fn test_full_stage_cannot_revert() {
        let config = SimulationBuilder::new()
            .event(EventBuilder::new("COPD").prevalence(1.0))
            .build()
            .unwrap();
        let mut rng = SmallRng::seed_from_u64(0);
        let mut patient = Patient::new(&config, PatientId(0), &mut rng).unwrap();
        assert_eq!(patient.event(EventId(0)).stage(), EventStage::Full);
        assert_eq!(patient.outcomes().events_prevalent, vec![1]);

        let err = patient.set_stage(EventId(0), EventStage::None).unwrap_err();
        assert!(matches!(
            err,
            SimulationError::StageReversal {
                to: EventStage::None,
                ..
            }
        ));
        assert!(patient.cure_pre_event(EventId(0)).is_err());
        assert_eq!(patient.event(EventId(0)).stage(), EventStage::Full);
    }

    #[test]
    fn test_pre_event_multiplier_scales_natural_history() {
        let config = SimulationBuilder::new()
            .never_smoker_mortality(0.01)
            .event(
                EventBuilder::new("Lung Cancer")
                    .pre_event_incidence(1.0)
                    .pre_event_mortality_multiplier(3.0),
            )
            .build()
            .unwrap();
        let outputs = crate::accumulators::MonthlyOutputs::new(
            crate::accumulators::MonthLayout::new(1, 0, 0),
        );
        let mut rng = SmallRng::seed_from_u64(0);
        let mut patient = Patient::new(&config, PatientId(0), &mut rng).unwrap();
        let record = patient.start_month(&outputs);
        patient.update_pre_events(&record, &mut rng).unwrap();
        patient.update_natural_history();

        let risks: Vec<_> = patient.risks.iter().copied().collect();
        assert_eq!(risks.len(), 1);
        assert_eq!(risks[0].0, DeathCause::NaturalHistory);
        assert!((risks[0].1 - 0.03).abs() < 1e-15);
    }
}
