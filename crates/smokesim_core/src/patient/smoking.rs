use rand::Rng;

use super::{Patient, SmokingState};
use crate::accumulators::MonthRecord;
use crate::model::{EventStage, by_year};
use crate::sampling::fires;

impl Patient<'_> {
    pub(super) fn update_smoking_start<R: Rng + ?Sized>(
        &mut self,
        record: &MonthRecord,
        rng: &mut R,
    ) {
        if self.smoking != SmokingState::Never {
            return;
        }
        let table = self.config.smoking.start_probability.get(self.gender);
        if fires(rng, by_year(table, self.age_months)) {
            self.start_smoking(record);
        }
    }

    pub(super) fn update_smoking_quit<R: Rng + ?Sized>(
        &mut self,
        record: &MonthRecord,
        rng: &mut R,
    ) {
        if let Some(p) = self.quit_probability()
            && fires(rng, p)
        {
            self.quit_smoking(record);
        }
    }

    pub(super) fn update_relapse<R: Rng + ?Sized>(&mut self, record: &MonthRecord, rng: &mut R) {
        let Some(since) = self.smoking.months_since_quit(self.month) else {
            return;
        };
        if let Some(p) = self.relapse_probability()
            && fires(rng, p)
        {
            self.relapse(record, since);
        }
    }

    /// This month's quit probability; `None` unless a current smoker.
    ///
    /// A quit boost from a recent event or complication replaces the baseline,
    /// then the largest active intervention quit multiplier scales the result.
    pub fn quit_probability(&self) -> Option<f64> {
        if self.smoking != SmokingState::Current {
            return None;
        }
        let mut probability = self.boosted_quit_probability().unwrap_or_else(|| {
            by_year(
                self.config.smoking.quit_probability.get(self.gender),
                self.age_months,
            )
        });
        if let Some(m) = self.max_active_intervention(|def| def.quit_multiplier) {
            probability *= m;
        }
        Some(probability)
    }

    /// This month's relapse probability; `None` unless a former smoker
    pub fn relapse_probability(&self) -> Option<f64> {
        let since = self.smoking.months_since_quit(self.month)?;
        let curve = self.config.smoking.relapse.get(self.intensity)[self.bracket.index()];
        let mut probability = curve.probability(since);
        if let Some(m) = self.max_active_intervention(|def| def.relapse_multiplier) {
            probability *= m;
        }
        Some(probability)
    }

    /// Largest quit boost from a recent full event or complication
    fn boosted_quit_probability(&self) -> Option<f64> {
        let config = self.config;
        config
            .event_ids()
            .flat_map(|e| {
                let def = config.event(e);
                let state = &self.events[e.index()];
                let after_event = def.quit_after_event.filter(|boost| {
                    state.stage == EventStage::Full
                        && state
                            .entered_month
                            .is_some_and(|onset| boost.applies(self.month - onset))
                });
                let after_complication = def.quit_after_complication.filter(|boost| {
                    state
                        .complication_month
                        .is_some_and(|m| boost.applies(self.month - m))
                });
                after_event
                    .into_iter()
                    .chain(after_complication)
                    .map(|boost| boost.probability)
            })
            .reduce(f64::max)
    }

    fn start_smoking(&mut self, record: &MonthRecord) {
        self.smoking = SmokingState::Current;
        self.outcomes.smoking_starts += 1;
        record.record_smoking_start();

        let month = self.month;
        self.trace(|| format!("\n**{month} Smoking Start"));
    }

    fn quit_smoking(&mut self, record: &MonthRecord) {
        self.smoking = SmokingState::Former {
            quit_month: self.month,
            quit_bracket: self.bracket,
        };
        let month = self.month;
        self.trace(|| format!("\n**{month} Smoking Quit"));

        // Only checked at the moment of quitting, never while abstinent
        let config = self.config;
        for i in config.intervention_ids() {
            if self.interventions[i.index()].active && config.intervention(i).stop_on_quit {
                self.stop_intervention(record, i);
            }
        }

        self.outcomes
            .record_quit(self.bracket, self.gender, self.age_months);
        record.record_quit(self.bracket, self.gender);
    }

    fn relapse(&mut self, record: &MonthRecord, months_abstinent: i64) {
        self.smoking = SmokingState::Current;
        self.outcomes
            .record_relapse(self.bracket, self.gender, months_abstinent);
        record.record_relapse(self.bracket, self.gender);

        let month = self.month;
        self.trace(|| format!("\n**{month} Smoking Relapse"));
    }
}
