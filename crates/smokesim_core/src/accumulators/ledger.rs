use serde::{Deserialize, Serialize};

use super::{ByStratum, CostCategory, Stratum};
use crate::model::{ByIntensity, SmokingIntensity};

/// Life months, quality-adjusted life months and costs for one patient
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValueLedger {
    pub life_months: ByStratum<f64>,
    pub life_months_by_intensity: ByIntensity<f64>,
    pub qalms: ByStratum<f64>,
    pub overall_costs: ByStratum<f64>,
    pub event_costs: Vec<f64>,
    pub complication_costs: Vec<f64>,
    pub screening_costs: Vec<f64>,
    pub prophylaxis_costs: Vec<f64>,
    pub intervention_costs: Vec<f64>,
    pub background_costs: f64,
}

impl ValueLedger {
    pub fn new(num_events: usize, num_interventions: usize, num_prophylaxes: usize) -> Self {
        Self {
            event_costs: vec![0.0; num_events],
            complication_costs: vec![0.0; num_events],
            screening_costs: vec![0.0; num_events],
            prophylaxis_costs: vec![0.0; num_prophylaxes],
            intervention_costs: vec![0.0; num_interventions],
            ..Self::default()
        }
    }

    fn category_mut(&mut self, category: CostCategory) -> &mut f64 {
        match category {
            CostCategory::Event(e) => &mut self.event_costs[e.index()],
            CostCategory::Complication(e) => &mut self.complication_costs[e.index()],
            CostCategory::Screening(e) => &mut self.screening_costs[e.index()],
            CostCategory::Prophylaxis(p) => &mut self.prophylaxis_costs[p.index()],
            CostCategory::Intervention(i) => &mut self.intervention_costs[i.index()],
            CostCategory::Background => &mut self.background_costs,
        }
    }

    pub fn add_cost(&mut self, category: CostCategory, stratum: Stratum, amount: f64) {
        *self.overall_costs.get_mut(stratum) += amount;
        *self.category_mut(category) += amount;
    }

    pub fn add_life_month(
        &mut self,
        stratum: Stratum,
        intensity: SmokingIntensity,
        qol: f64,
        weight: f64,
    ) {
        *self.life_months.get_mut(stratum) += weight;
        *self.life_months_by_intensity.get_mut(intensity) += weight;
        *self.qalms.get_mut(stratum) += qol * weight;
    }

    /// Add another ledger of the same shape into this one
    pub fn accumulate(&mut self, other: &ValueLedger) {
        self.life_months.accumulate(&other.life_months);
        for intensity in SmokingIntensity::ALL {
            *self.life_months_by_intensity.get_mut(intensity) +=
                other.life_months_by_intensity.get(intensity);
        }
        self.qalms.accumulate(&other.qalms);
        self.overall_costs.accumulate(&other.overall_costs);
        add_into(&mut self.event_costs, &other.event_costs);
        add_into(&mut self.complication_costs, &other.complication_costs);
        add_into(&mut self.screening_costs, &other.screening_costs);
        add_into(&mut self.prophylaxis_costs, &other.prophylaxis_costs);
        add_into(&mut self.intervention_costs, &other.intervention_costs);
        self.background_costs += other.background_costs;
    }

    pub fn total_life_months(&self) -> f64 {
        self.life_months.total()
    }

    pub fn total_qalms(&self) -> f64 {
        self.qalms.total()
    }

    pub fn total_costs(&self) -> f64 {
        self.overall_costs.total()
    }
}

fn add_into(target: &mut Vec<f64>, source: &[f64]) {
    if target.len() < source.len() {
        target.resize(source.len(), 0.0);
    }
    for (t, s) in target.iter_mut().zip(source) {
        *t += s;
    }
}

/// Discounted and undiscounted ledgers with identical shape
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiscountedOutcomes {
    pub discounted: ValueLedger,
    pub undiscounted: ValueLedger,
}

impl DiscountedOutcomes {
    pub fn new(num_events: usize, num_interventions: usize, num_prophylaxes: usize) -> Self {
        let ledger = ValueLedger::new(num_events, num_interventions, num_prophylaxes);
        Self {
            discounted: ledger.clone(),
            undiscounted: ledger,
        }
    }

    /// Book a cost; the discounted half receives `amount * discount_factor`
    pub fn add_cost(
        &mut self,
        category: CostCategory,
        stratum: Stratum,
        amount: f64,
        discount_factor: f64,
    ) {
        self.undiscounted.add_cost(category, stratum, amount);
        self.discounted
            .add_cost(category, stratum, amount * discount_factor);
    }

    pub fn add_life_month(
        &mut self,
        stratum: Stratum,
        intensity: SmokingIntensity,
        qol: f64,
        discount_factor: f64,
    ) {
        self.undiscounted.add_life_month(stratum, intensity, qol, 1.0);
        self.discounted
            .add_life_month(stratum, intensity, qol, discount_factor);
    }
}
