use super::{Patient, SmokingState};
use crate::accumulators::{CostCategory, MonthRecord};
use crate::model::{DeathCause, EventStage, SmokingStatus, by_bracket};

impl Patient<'_> {
    /// Book the month's background cost, quality of life and life month,
    /// enforce the maximum age and advance the clock.
    pub(super) fn end_month(&mut self, record: &MonthRecord) {
        let config = self.config;

        let costing_status = match self.smoking {
            SmokingState::Former { quit_month, .. }
                if self.month - quit_month < config.background.former_as_current_months =>
            {
                SmokingStatus::Current
            }
            other => other.status(),
        };
        let background = by_bracket(
            config.background.monthly_cost.get(self.gender).get(costing_status),
            self.bracket,
        );
        self.add_cost(record, CostCategory::Background, background);

        let qol = &config.quality_of_life;
        let mut base = *qol.base.get(self.intensity).get(self.smoking.status());
        if let Some(since) = self.smoking.months_since_quit(self.month)
            && since <= *qol.quit_bonus_months.get(self.intensity)
        {
            base *= qol.quit_bonus.get(self.intensity);
        }
        self.apply_qol(base);

        let stratum = self.stratum();
        self.values
            .add_life_month(stratum, self.intensity, self.qol, self.discount_factor);

        for i in config.intervention_ids() {
            if self.interventions[i.index()].active {
                self.add_cost(
                    record,
                    CostCategory::Intervention(i),
                    config.intervention(i).costs.monthly,
                );
                record.record_intervention_on(i);
            }
        }
        for p in config.prophylaxis_ids() {
            if self.prophylaxes[p.index()].active {
                self.add_cost(
                    record,
                    CostCategory::Prophylaxis(p),
                    config.prophylaxis(p).costs.monthly,
                );
                record.record_prophylaxis_on(p);
            }
        }

        for e in config.event_ids() {
            if self.events[e.index()].stage == EventStage::Full {
                record.record_event_with(e, stratum);
            } else {
                record.record_event_without(e);
            }
        }

        // The month just simulated is the last one before reaching the maximum age
        let max_age_months = i64::from(config.run.max_age_years) * 12;
        if self.is_alive() && self.age_months + 1 >= max_age_months {
            self.kill(record, DeathCause::OldAge);
        }

        let status = self.smoking.status();
        if self.is_alive() {
            record.record_alive(status, self.intensity);
            self.month += 1;
            self.age_months += 1;
            self.discount_factor /= self.discount_multiplier;
        } else {
            record.record_death(status, self.intensity);
        }
    }
}
