//! Screening sub-machine
//!
//! Per event and month, exactly one of these applies while a confirmatory
//! test is not pending: a scheduled regular screen (attended or skipped), or
//! a background opportunistic screen roll. A positive observed result books
//! a confirmatory test `delay_months` later. The confirmatory test is what
//! marks a true pre-event as detected.

use rand::Rng;

use super::Patient;
use crate::accumulators::{CostCategory, MonthRecord};
use crate::error::Result;
use crate::model::{DeathCause, EventId, EventStage, ScreeningKind, by_bracket};
use crate::sampling::fires;

fn result_label(positive: bool) -> &'static str {
    if positive { "Positive" } else { "Negative" }
}

impl Patient<'_> {
    pub(super) fn update_screening<R: Rng + ?Sized>(
        &mut self,
        record: &MonthRecord,
        rng: &mut R,
    ) -> Result<()> {
        let config = self.config;
        for e in config.event_ids() {
            let i = e.index();
            if self.events[i].stage == EventStage::Full {
                continue;
            }
            let def = config.event(e);
            let screening = &def.screening;

            if self.events[i].confirmatory_month.is_none() {
                let mut screened = false;
                if let Some(due) = self.events[i].next_screen_month
                    && self.month >= due
                {
                    if !fires(rng, screening.regular.skip_probability) {
                        self.screen(record, rng, e, ScreeningKind::Regular);
                        self.events[i].screens += 1;
                        screened = true;
                    }
                    let state = &mut self.events[i];
                    state.next_screen_month = if state.screens < screening.regular.max_screens {
                        Some(self.month + screening.regular.interval_months)
                    } else {
                        None
                    };
                }

                let background =
                    by_bracket(screening.background_probability.get(self.gender), self.bracket);
                if !screened && fires(rng, background) {
                    self.screen(record, rng, e, ScreeningKind::Background);
                }
            }

            if let Some(due) = self.events[i].confirmatory_month {
                self.apply_qol(def.qol.awaiting_confirmation);
                if self.month == due {
                    self.confirmatory_test(record, rng, e)?;
                }
            }

            if self.events[i].stage == EventStage::Pre {
                if self.events[i].detected {
                    self.add_cost(record, CostCategory::Screening(e), def.costs.detected_monthly);
                    self.apply_qol(def.qol.detected);
                } else {
                    self.apply_qol(def.qol.undetected);
                }
            }
        }
        Ok(())
    }

    fn screen<R: Rng + ?Sized>(
        &mut self,
        record: &MonthRecord,
        rng: &mut R,
        e: EventId,
        kind: ScreeningKind,
    ) {
        let config = self.config;
        let def = config.event(e);
        self.add_cost(record, CostCategory::Screening(e), def.costs.screen);
        self.apply_qol(def.qol.screen);

        let truth = self.events[e.index()].stage == EventStage::Pre;
        let accuracy = if truth {
            def.screening.sensitivity.get(self.gender)
        } else {
            def.screening.specificity.get(self.gender)
        };
        let observed = if fires(rng, *accuracy) { truth } else { !truth };
        record.record_screen(e, truth, observed);

        let (month, name) = (self.month, def.name.as_str());
        self.trace(|| {
            format!(
                "\n**{month} Pre-event {name} {} Screening, Result: {}, Status: {}",
                kind.label(),
                result_label(observed),
                result_label(truth)
            )
        });

        if observed {
            self.events[e.index()].confirmatory_month =
                Some(self.month + def.screening.confirmatory.delay_months);
            self.add_cost(record, CostCategory::Screening(e), def.costs.screen_positive);
        } else {
            self.add_cost(record, CostCategory::Screening(e), def.costs.screen_negative);
        }
    }

    fn confirmatory_test<R: Rng + ?Sized>(
        &mut self,
        record: &MonthRecord,
        rng: &mut R,
        e: EventId,
    ) -> Result<()> {
        let config = self.config;
        let def = config.event(e);
        self.events[e.index()].confirmatory_month = None;
        self.add_cost(record, CostCategory::Screening(e), def.costs.confirmatory);
        record.record_confirmatory_test(e);
        self.apply_qol(def.qol.confirmatory);
        self.risks
            .add(DeathCause::ConfirmatoryTest, def.screening.confirmatory.mortality);

        let (month, name) = (self.month, def.name.as_str());
        self.trace(|| format!("\n**{month} Pre-event {name} Confirmatory Test"));

        if self.events[e.index()].stage != EventStage::Pre {
            return Ok(());
        }

        let outcome = &def.screening.outcome;
        self.events[e.index()].detected = true;
        if fires(rng, outcome.cure_probability) {
            self.cure_pre_event(e)?;
        }
        if let Some(p) = outcome.start_prophylaxis
            && !self.prophylaxes[p.index()].active
        {
            self.start_prophylaxis(record, p);
        }
        if let Some(i) = outcome.start_intervention
            && !self.interventions[i.index()].active
        {
            self.start_intervention(record, i);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accumulators::{MonthLayout, MonthlyOutputs};
    use crate::config::{EventBuilder, SimulationBuilder};
    use crate::model::PatientId;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    #[test]
    fn test_skipped_regular_screen_is_rescheduled() {
        let config = SimulationBuilder::new()
            .event(
                EventBuilder::new("Lung Cancer")
                    .regular_screening(40, 12, 3)
                    .screening_skip_probability(1.0),
            )
            .build()
            .unwrap();
        let outputs = MonthlyOutputs::new(MonthLayout::new(1, 0, 0));
        let mut rng = SmallRng::seed_from_u64(2);
        let mut patient = Patient::new(&config, PatientId(0), &mut rng).unwrap();
        assert_eq!(patient.event(EventId(0)).next_screen_month(), Some(0));

        let record = patient.start_month(&outputs);
        patient.update_screening(&record, &mut rng).unwrap();
        let state = patient.event(EventId(0));
        assert_eq!(state.screens(), 0);
        assert_eq!(state.next_screen_month(), Some(12));
        assert_eq!(record.summary().screen_result(EventId(0), false, false), 0);
    }
}
