//! Cohort totals per simulated month
//!
//! Patients reach month `k` at different wall-clock times, so the record
//! list grows on demand under a write lock and every cell is an atomic.
//! Money is held in fixed-point micro-units: integer addition commutes, so
//! totals do not depend on the order in which patients finish.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Serialize};

use super::{CostCategory, STATUS_INTENSITY_COUNT, Stratum, status_intensity_index};
use crate::model::{
    AgeBracket, DeathCause, EventId, Gender, InterventionId, ProphylaxisId, SmokingIntensity,
    SmokingStatus,
};

const MICROS_PER_UNIT: f64 = 1_000_000.0;
const BRACKET_GENDER_COUNT: usize = AgeBracket::COUNT * Gender::COUNT;

fn bracket_gender_index(bracket: AgeBracket, gender: Gender) -> usize {
    bracket.index() * Gender::COUNT + gender.index()
}

/// Dimensions of a month record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthLayout {
    pub events: usize,
    pub interventions: usize,
    pub prophylaxes: usize,
}

impl MonthLayout {
    pub fn new(events: usize, interventions: usize, prophylaxes: usize) -> Self {
        Self {
            events,
            interventions,
            prophylaxes,
        }
    }

    fn death_causes(&self) -> usize {
        DeathCause::count(self.events)
    }
}

#[derive(Debug)]
struct Counters(Box<[AtomicU64]>);

impl Counters {
    fn new(len: usize) -> Self {
        Self((0..len).map(|_| AtomicU64::new(0)).collect())
    }

    #[inline]
    fn bump(&self, index: usize) {
        self.0[index].fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> Vec<u64> {
        self.0.iter().map(|c| c.load(Ordering::Relaxed)).collect()
    }
}

#[derive(Debug)]
struct Money(Box<[AtomicI64]>);

impl Money {
    fn new(len: usize) -> Self {
        Self((0..len).map(|_| AtomicI64::new(0)).collect())
    }

    #[inline]
    fn add(&self, index: usize, amount: f64) {
        let micros = (amount * MICROS_PER_UNIT).round() as i64;
        self.0[index].fetch_add(micros, Ordering::Relaxed);
    }

    fn snapshot(&self) -> Vec<f64> {
        self.0
            .iter()
            .map(|c| c.load(Ordering::Relaxed) as f64 / MICROS_PER_UNIT)
            .collect()
    }
}

/// Shared accumulator slot for one simulated month
#[derive(Debug)]
pub struct MonthRecord {
    layout: MonthLayout,
    alive: Counters,
    deaths: Counters,
    death_causes: Counters,
    costs_discounted: Money,
    event_costs: Money,
    complication_costs: Money,
    screening_costs: Money,
    prophylaxis_costs: Money,
    intervention_costs: Money,
    background_costs: Money,
    event_with: Counters,
    event_without: Counters,
    event_incidence: Counters,
    pre_event_incidence: Counters,
    complication_incidence: Counters,
    screen_results: Counters,
    confirmatory_tests: Counters,
    smoking_starts: Counters,
    quits: Counters,
    relapses: Counters,
    prophylaxis_on: Counters,
    prophylaxis_starts: Counters,
    prophylaxis_stops: Counters,
    intervention_on: Counters,
    intervention_starts: Counters,
    intervention_stops: Counters,
}

impl MonthRecord {
    pub fn new(layout: MonthLayout) -> Self {
        let events = layout.events;
        Self {
            layout,
            alive: Counters::new(STATUS_INTENSITY_COUNT),
            deaths: Counters::new(STATUS_INTENSITY_COUNT),
            death_causes: Counters::new(layout.death_causes()),
            costs_discounted: Money::new(1),
            event_costs: Money::new(events),
            complication_costs: Money::new(events),
            screening_costs: Money::new(events),
            prophylaxis_costs: Money::new(layout.prophylaxes),
            intervention_costs: Money::new(layout.interventions),
            background_costs: Money::new(1),
            event_with: Counters::new(events * Stratum::COUNT),
            event_without: Counters::new(events),
            event_incidence: Counters::new(events * Stratum::COUNT),
            pre_event_incidence: Counters::new(events * Stratum::COUNT),
            complication_incidence: Counters::new(events * Stratum::COUNT),
            screen_results: Counters::new(events * 4),
            confirmatory_tests: Counters::new(events),
            smoking_starts: Counters::new(1),
            quits: Counters::new(BRACKET_GENDER_COUNT),
            relapses: Counters::new(BRACKET_GENDER_COUNT),
            prophylaxis_on: Counters::new(layout.prophylaxes),
            prophylaxis_starts: Counters::new(layout.prophylaxes),
            prophylaxis_stops: Counters::new(layout.prophylaxes),
            intervention_on: Counters::new(layout.interventions),
            intervention_starts: Counters::new(layout.interventions),
            intervention_stops: Counters::new(layout.interventions),
        }
    }

    fn event_stratum(event: EventId, stratum: Stratum) -> usize {
        event.index() * Stratum::COUNT + stratum.index()
    }

    pub fn record_alive(&self, status: SmokingStatus, intensity: SmokingIntensity) {
        self.alive.bump(status_intensity_index(status, intensity));
    }

    pub fn record_death(&self, status: SmokingStatus, intensity: SmokingIntensity) {
        self.deaths.bump(status_intensity_index(status, intensity));
    }

    pub fn record_death_cause(&self, cause: DeathCause) {
        self.death_causes.bump(cause.index(self.layout.events));
    }

    /// Add an already-discounted cost to the month total and its category
    pub fn add_cost(&self, category: CostCategory, discounted: f64) {
        self.costs_discounted.add(0, discounted);
        match category {
            CostCategory::Event(e) => self.event_costs.add(e.index(), discounted),
            CostCategory::Complication(e) => self.complication_costs.add(e.index(), discounted),
            CostCategory::Screening(e) => self.screening_costs.add(e.index(), discounted),
            CostCategory::Prophylaxis(p) => self.prophylaxis_costs.add(p.index(), discounted),
            CostCategory::Intervention(i) => self.intervention_costs.add(i.index(), discounted),
            CostCategory::Background => self.background_costs.add(0, discounted),
        }
    }

    pub fn record_event_with(&self, event: EventId, stratum: Stratum) {
        self.event_with.bump(Self::event_stratum(event, stratum));
    }

    pub fn record_event_without(&self, event: EventId) {
        self.event_without.bump(event.index());
    }

    pub fn record_event_incidence(&self, event: EventId, stratum: Stratum) {
        self.event_incidence
            .bump(Self::event_stratum(event, stratum));
    }

    pub fn record_pre_event_incidence(&self, event: EventId, stratum: Stratum) {
        self.pre_event_incidence
            .bump(Self::event_stratum(event, stratum));
    }

    pub fn record_complication(&self, event: EventId, stratum: Stratum) {
        self.complication_incidence
            .bump(Self::event_stratum(event, stratum));
    }

    /// Tally a screening result by true and observed status
    pub fn record_screen(&self, event: EventId, truth: bool, observed: bool) {
        self.screen_results
            .bump(event.index() * 4 + usize::from(truth) * 2 + usize::from(observed));
    }

    pub fn record_confirmatory_test(&self, event: EventId) {
        self.confirmatory_tests.bump(event.index());
    }

    pub fn record_smoking_start(&self) {
        self.smoking_starts.bump(0);
    }

    pub fn record_quit(&self, bracket: AgeBracket, gender: Gender) {
        self.quits.bump(bracket_gender_index(bracket, gender));
    }

    pub fn record_relapse(&self, bracket: AgeBracket, gender: Gender) {
        self.relapses.bump(bracket_gender_index(bracket, gender));
    }

    pub fn record_prophylaxis_on(&self, p: ProphylaxisId) {
        self.prophylaxis_on.bump(p.index());
    }

    pub fn record_prophylaxis_start(&self, p: ProphylaxisId) {
        self.prophylaxis_starts.bump(p.index());
    }

    pub fn record_prophylaxis_stop(&self, p: ProphylaxisId) {
        self.prophylaxis_stops.bump(p.index());
    }

    pub fn record_intervention_on(&self, i: InterventionId) {
        self.intervention_on.bump(i.index());
    }

    pub fn record_intervention_start(&self, i: InterventionId) {
        self.intervention_starts.bump(i.index());
    }

    pub fn record_intervention_stop(&self, i: InterventionId) {
        self.intervention_stops.bump(i.index());
    }

    pub fn summary(&self) -> MonthSummary {
        MonthSummary {
            layout: self.layout,
            alive: self.alive.snapshot(),
            deaths: self.deaths.snapshot(),
            death_causes: self.death_causes.snapshot(),
            costs_discounted: self.costs_discounted.snapshot()[0],
            event_costs: self.event_costs.snapshot(),
            complication_costs: self.complication_costs.snapshot(),
            screening_costs: self.screening_costs.snapshot(),
            prophylaxis_costs: self.prophylaxis_costs.snapshot(),
            intervention_costs: self.intervention_costs.snapshot(),
            background_costs: self.background_costs.snapshot()[0],
            event_with: self.event_with.snapshot(),
            event_without: self.event_without.snapshot(),
            event_incidence: self.event_incidence.snapshot(),
            pre_event_incidence: self.pre_event_incidence.snapshot(),
            complication_incidence: self.complication_incidence.snapshot(),
            screen_results: self.screen_results.snapshot(),
            confirmatory_tests: self.confirmatory_tests.snapshot(),
            smoking_starts: self.smoking_starts.snapshot()[0],
            quits: self.quits.snapshot(),
            relapses: self.relapses.snapshot(),
            prophylaxis_on: self.prophylaxis_on.snapshot(),
            prophylaxis_starts: self.prophylaxis_starts.snapshot(),
            prophylaxis_stops: self.prophylaxis_stops.snapshot(),
            intervention_on: self.intervention_on.snapshot(),
            intervention_starts: self.intervention_starts.snapshot(),
            intervention_stops: self.intervention_stops.snapshot(),
        }
    }
}

/// Plain snapshot of a month record, read once all patients are done
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthSummary {
    pub layout: MonthLayout,
    pub alive: Vec<u64>,
    pub deaths: Vec<u64>,
    pub death_causes: Vec<u64>,
    pub costs_discounted: f64,
    pub event_costs: Vec<f64>,
    pub complication_costs: Vec<f64>,
    pub screening_costs: Vec<f64>,
    pub prophylaxis_costs: Vec<f64>,
    pub intervention_costs: Vec<f64>,
    pub background_costs: f64,
    pub event_with: Vec<u64>,
    pub event_without: Vec<u64>,
    pub event_incidence: Vec<u64>,
    pub pre_event_incidence: Vec<u64>,
    pub complication_incidence: Vec<u64>,
    pub screen_results: Vec<u64>,
    pub confirmatory_tests: Vec<u64>,
    pub smoking_starts: u64,
    pub quits: Vec<u64>,
    pub relapses: Vec<u64>,
    pub prophylaxis_on: Vec<u64>,
    pub prophylaxis_starts: Vec<u64>,
    pub prophylaxis_stops: Vec<u64>,
    pub intervention_on: Vec<u64>,
    pub intervention_starts: Vec<u64>,
    pub intervention_stops: Vec<u64>,
}

impl MonthSummary {
    pub fn alive_total(&self) -> u64 {
        self.alive.iter().sum()
    }

    pub fn deaths_total(&self) -> u64 {
        self.deaths.iter().sum()
    }

    pub fn alive(&self, status: SmokingStatus, intensity: SmokingIntensity) -> u64 {
        self.alive[status_intensity_index(status, intensity)]
    }

    pub fn deaths(&self, status: SmokingStatus, intensity: SmokingIntensity) -> u64 {
        self.deaths[status_intensity_index(status, intensity)]
    }

    pub fn death_cause(&self, cause: DeathCause) -> u64 {
        self.death_causes[cause.index(self.layout.events)]
    }

    fn event_strata(cells: &[u64], event: EventId) -> &[u64] {
        let start = event.index() * Stratum::COUNT;
        &cells[start..start + Stratum::COUNT]
    }

    /// Patients alive with the full event, by stratum
    pub fn event_with(&self, event: EventId) -> &[u64] {
        Self::event_strata(&self.event_with, event)
    }

    pub fn event_incidence(&self, event: EventId) -> &[u64] {
        Self::event_strata(&self.event_incidence, event)
    }

    pub fn pre_event_incidence(&self, event: EventId) -> &[u64] {
        Self::event_strata(&self.pre_event_incidence, event)
    }

    pub fn complication_incidence(&self, event: EventId) -> &[u64] {
        Self::event_strata(&self.complication_incidence, event)
    }

    pub fn screen_result(&self, event: EventId, truth: bool, observed: bool) -> u64 {
        self.screen_results[event.index() * 4 + usize::from(truth) * 2 + usize::from(observed)]
    }

    pub fn quits(&self, bracket: AgeBracket, gender: Gender) -> u64 {
        self.quits[bracket_gender_index(bracket, gender)]
    }

    pub fn relapses(&self, bracket: AgeBracket, gender: Gender) -> u64 {
        self.relapses[bracket_gender_index(bracket, gender)]
    }

    pub fn total_quits(&self) -> u64 {
        self.quits.iter().sum()
    }

    pub fn total_relapses(&self) -> u64 {
        self.relapses.iter().sum()
    }
}

/// Month-indexed cohort accumulator shared by every patient in a run
#[derive(Debug)]
pub struct MonthlyOutputs {
    layout: MonthLayout,
    months: RwLock<Vec<Arc<MonthRecord>>>,
}

impl MonthlyOutputs {
    pub fn new(layout: MonthLayout) -> Self {
        Self {
            layout,
            months: RwLock::new(Vec::new()),
        }
    }

    pub fn layout(&self) -> MonthLayout {
        self.layout
    }

    /// Record for simulated month `index`, appending records up to it if needed.
    ///
    /// Growth happens only under the write lock and re-checks the length, so
    /// each index is created exactly once however many patients race for it.
    pub fn month(&self, index: usize) -> Arc<MonthRecord> {
        {
            let months = self.months.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(record) = months.get(index) {
                return Arc::clone(record);
            }
        }

        let mut months = self.months.write().unwrap_or_else(PoisonError::into_inner);
        while months.len() <= index {
            months.push(Arc::new(MonthRecord::new(self.layout)));
        }
        Arc::clone(&months[index])
    }

    pub fn len(&self) -> usize {
        self.months
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn summaries(&self) -> Vec<MonthSummary> {
        self.months
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|m| m.summary())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_concurrent_growth_creates_each_month_once() {
        let outputs = Arc::new(MonthlyOutputs::new(MonthLayout::new(1, 0, 0)));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let outputs = Arc::clone(&outputs);
                thread::spawn(move || {
                    for m in 0..200 {
                        outputs
                            .month(m)
                            .record_alive(SmokingStatus::Never, SmokingIntensity::Light);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let summaries = outputs.summaries();
        assert_eq!(summaries.len(), 200);
        for s in &summaries {
            assert_eq!(s.alive_total(), 8);
            assert_eq!(s.alive(SmokingStatus::Never, SmokingIntensity::Light), 8);
        }
    }

    #[test]
    fn test_money_is_order_independent() {
        let layout = MonthLayout::new(1, 0, 0);
        let a = MonthRecord::new(layout);
        let b = MonthRecord::new(layout);
        let amounts = [0.1, 1e9 / 7.0, 0.2, 1234.5678, 0.3];

        for x in amounts {
            a.add_cost(CostCategory::Event(EventId(0)), x);
        }
        for x in amounts.iter().rev() {
            b.add_cost(CostCategory::Event(EventId(0)), *x);
        }
        assert_eq!(a.summary(), b.summary());
        assert!((a.summary().costs_discounted - amounts.iter().sum::<f64>()).abs() < 1e-5);
    }

    #[test]
    fn test_screen_results_by_truth_and_observation() {
        let record = MonthRecord::new(MonthLayout::new(2, 0, 0));
        record.record_screen(EventId(1), true, true);
        record.record_screen(EventId(1), false, true);
        record.record_screen(EventId(1), false, true);
        let s = record.summary();
        assert_eq!(s.screen_result(EventId(1), true, true), 1);
        assert_eq!(s.screen_result(EventId(1), false, true), 2);
        assert_eq!(s.screen_result(EventId(0), false, true), 0);
    }

    #[test]
    fn test_sparse_request_fills_gap() {
        let outputs = MonthlyOutputs::new(MonthLayout::new(0, 1, 1));
        outputs.month(5).record_intervention_start(InterventionId(0));
        assert_eq!(outputs.len(), 6);
        assert_eq!(outputs.summaries()[5].intervention_starts, vec![1]);
    }
}
