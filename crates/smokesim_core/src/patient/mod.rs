//! Patient state machine
//!
//! A [`Patient`] owns one synthetic person's mutable state and runs the
//! ordered monthly pipeline until death. Each month it:
//!
//! 1. Clears the mortality risk set and resolves the month's cohort record
//! 2. Updates interventions, then smoking start, quit and relapse
//! 3. Updates prophylaxes
//! 4. Rolls pre-event incidence, then screening and confirmatory testing
//! 5. Rolls complications, pre-event progression and full-event incidence
//! 6. Adds the natural-history hazard and draws for death
//! 7. Books background cost, quality of life and life months, then ages
//!
//! Later phases read state written earlier in the same month, so the order
//! is part of the model.

use std::sync::Arc;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::accumulators::{
    CostCategory, DeathRecord, DiscountedOutcomes, InitialState, MonthRecord, MonthlyOutputs,
    PatientOutcomes, Stratum,
};
use crate::config::SimulationConfig;
use crate::error::{ConfigError, Result, SimulationError};
use crate::model::{
    AgeBracket, AgeCurve, ByGender, ByIntensity, DeathCause, EventId, EventStage, Gender,
    InterventionId, PatientId, ProphylaxisId, SmokingIntensity, SmokingStatus, by_bracket,
};
use crate::mortality::RiskSet;
use crate::sampling::{draw_weighted, fires};
use crate::transition::Exposure;

mod accounting;
mod disease;
mod screening;
mod smoking;
mod treatment;

// ============================================================================
// Per-patient state
// ============================================================================

/// Smoking status, with the quit month carried only by former smokers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmokingState {
    Never,
    Current,
    Former {
        /// Simulated month of quitting; negative for patients who start as former smokers
        quit_month: i64,
        quit_bracket: AgeBracket,
    },
}

impl SmokingState {
    pub fn status(self) -> SmokingStatus {
        match self {
            SmokingState::Never => SmokingStatus::Never,
            SmokingState::Current => SmokingStatus::Current,
            SmokingState::Former { .. } => SmokingStatus::Former,
        }
    }

    pub fn months_since_quit(self, month: i64) -> Option<i64> {
        match self {
            SmokingState::Former { quit_month, .. } => Some(month - quit_month),
            _ => None,
        }
    }
}

/// Stage and screening state for one disease event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventState {
    stage: EventStage,
    /// Month the current stage was entered
    entered_month: Option<i64>,
    complication_month: Option<i64>,
    detected: bool,
    confirmatory_month: Option<i64>,
    next_screen_month: Option<i64>,
    screens: u32,
}

impl Default for EventState {
    fn default() -> Self {
        Self {
            stage: EventStage::None,
            entered_month: None,
            complication_month: None,
            detected: false,
            confirmatory_month: None,
            next_screen_month: None,
            screens: 0,
        }
    }
}

impl EventState {
    pub fn stage(&self) -> EventStage {
        self.stage
    }

    pub fn entered_month(&self) -> Option<i64> {
        self.entered_month
    }

    pub fn complication_month(&self) -> Option<i64> {
        self.complication_month
    }

    pub fn is_detected(&self) -> bool {
        self.detected
    }

    /// Month of the pending confirmatory test, if one is scheduled
    pub fn confirmatory_month(&self) -> Option<i64> {
        self.confirmatory_month
    }

    pub fn next_screen_month(&self) -> Option<i64> {
        self.next_screen_month
    }

    pub fn screens(&self) -> u32 {
        self.screens
    }
}

/// Activation state shared by interventions and prophylaxes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TreatmentState {
    pub active: bool,
    pub start_month: Option<i64>,
    pub had_toxicity: bool,
}

/// Everything a finished patient hands back to the cohort runner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientRun {
    pub outcomes: PatientOutcomes,
    pub values: DiscountedOutcomes,
    pub trace: Option<String>,
}

impl PatientRun {
    /// Months simulated, including the month of death
    pub fn months_lived(&self) -> i64 {
        self.outcomes.death.map_or(0, |d| d.month + 1)
    }
}

// ============================================================================
// Patient
// ============================================================================

#[derive(Debug)]
pub struct Patient<'a> {
    config: &'a SimulationConfig,
    id: PatientId,
    gender: Gender,
    intensity: SmokingIntensity,
    smoking: SmokingState,
    age_months: i64,
    month: i64,
    bracket: AgeBracket,
    events: Vec<EventState>,
    interventions: Vec<TreatmentState>,
    prophylaxes: Vec<TreatmentState>,
    discount_factor: f64,
    discount_multiplier: f64,
    qol: f64,
    risks: RiskSet,
    outcomes: PatientOutcomes,
    values: DiscountedOutcomes,
    trace: Option<String>,
}

fn draw_index<R: Rng + ?Sized>(rng: &mut R, weights: &[f64], field: &str) -> Result<usize> {
    draw_weighted(rng, weights).ok_or_else(|| {
        SimulationError::Config(ConfigError::InvalidWeights {
            field: field.to_string(),
        })
    })
}

fn curve_weights<const N: usize>(
    curves: [&AgeCurve; N],
    bracket: AgeBracket,
) -> [f64; N] {
    curves.map(|c| by_bracket(c, bracket))
}

impl<'a> Patient<'a> {
    /// Draw a new patient's demographics, smoking history, prevalent events
    /// and initial treatments.
    pub fn new<R: Rng + ?Sized>(
        config: &'a SimulationConfig,
        id: PatientId,
        rng: &mut R,
    ) -> Result<Self> {
        let init = &config.init;

        let genders = [init.gender_weights.female, init.gender_weights.male];
        let gender = Gender::ALL[draw_index(rng, &genders, "init.gender_weights")?];

        let age_months = init.age_months.sample(rng).round().max(0.0) as i64;
        let bracket = AgeBracket::from_age_months(age_months);

        let statuses = init.smoking_status.get(gender);
        let status_weights = curve_weights(
            [&statuses.never, &statuses.former, &statuses.current],
            bracket,
        );
        let status = SmokingStatus::ALL[draw_index(rng, &status_weights, "init.smoking_status")?];

        let intensities = init.smoking_intensity.get(gender);
        let intensity_weights = curve_weights(
            [&intensities.light, &intensities.moderate, &intensities.heavy],
            bracket,
        );
        let intensity =
            SmokingIntensity::ALL[draw_index(rng, &intensity_weights, "init.smoking_intensity")?];

        let smoking = match status {
            SmokingStatus::Never => SmokingState::Never,
            SmokingStatus::Current => SmokingState::Current,
            SmokingStatus::Former => {
                let since = init
                    .months_since_quit
                    .bounded(0.0, age_months as f64)
                    .sample(rng)
                    .round() as i64;
                SmokingState::Former {
                    quit_month: -since,
                    quit_bracket: AgeBracket::from_age_months(age_months - since),
                }
            }
        };

        let initial = InitialState {
            gender,
            age_months,
            status,
            intensity,
        };
        let (ne, ni, np) = (
            config.events.len(),
            config.interventions.len(),
            config.prophylaxes.len(),
        );

        let mut patient = Self {
            config,
            id,
            gender,
            intensity,
            smoking,
            age_months,
            month: 0,
            bracket,
            events: vec![EventState::default(); ne],
            interventions: vec![TreatmentState::default(); ni],
            prophylaxes: vec![TreatmentState::default(); np],
            discount_factor: 1.0,
            discount_multiplier: config.monthly_discount_multiplier(),
            qol: 1.0,
            risks: RiskSet::new(),
            outcomes: PatientOutcomes::new(id, initial, ne, ni, np),
            values: DiscountedOutcomes::new(ne, ni, np),
            trace: (id.0 < config.run.trace_patients).then(String::new),
        };

        patient.draw_prevalence(rng)?;
        patient.draw_initial_treatments(rng);
        patient.schedule_regular_screening();
        patient.trace_header();
        Ok(patient)
    }

    fn draw_prevalence<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<()> {
        let config = self.config;
        let status = self.smoking.status();
        for e in config.event_ids() {
            let p = config
                .event(e)
                .prevalence(self.gender, status, self.intensity, self.bracket);
            if fires(rng, p) {
                self.enter_full_stage(e)?;
                self.outcomes.record_prevalent(e);
            }
        }
        Ok(())
    }

    fn draw_initial_treatments<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let config = self.config;
        let status = self.smoking.status();

        for p in config.prophylaxis_ids() {
            let def = config.prophylaxis(p);
            let probability = self.start_base(&def.start.initial, &def.start.age_multiplier)
                * self.product_history_multiplier(&def.start)
                * def.status_multiplier.get(self.gender).get(status);
            if fires(rng, probability) {
                self.prophylaxes[p.index()].active = true;
            }
        }

        for i in config.intervention_ids() {
            let def = config.intervention(i);
            let probability = self.start_base(&def.start.initial, &def.start.age_multiplier)
                * self.max_history_multiplier(&def.start);
            if fires(rng, probability) {
                self.activate_intervention(i);
            }
        }
    }

    fn schedule_regular_screening(&mut self) {
        let config = self.config;
        let status = self.smoking.status();
        for e in config.event_ids() {
            let regular = &config.event(e).screening.regular;
            if regular.max_screens == 0 {
                continue;
            }
            if let Some(years) = *regular.start_age_years.get(status) {
                self.events[e.index()].next_screen_month =
                    Some(i64::from(years) * 12 - self.age_months);
            }
        }
    }

    // ========================================================================
    // Monthly pipeline
    // ========================================================================

    /// Simulate one month. Does nothing once the patient has died.
    pub fn step<R: Rng + ?Sized>(&mut self, monthly: &MonthlyOutputs, rng: &mut R) -> Result<()> {
        if !self.is_alive() {
            return Ok(());
        }

        let record = self.start_month(monthly);
        self.update_interventions(&record, rng);
        self.update_smoking_start(&record, rng);
        self.update_smoking_quit(&record, rng);
        self.update_relapse(&record, rng);
        self.update_prophylaxes(&record, rng);
        self.update_pre_events(&record, rng)?;
        self.update_screening(&record, rng)?;
        self.update_events(&record, rng)?;
        self.update_natural_history();
        self.update_mortality(&record, rng)?;
        self.end_month(&record);
        Ok(())
    }

    /// Run month after month until the patient dies
    pub fn run_until_death<R: Rng + ?Sized>(
        mut self,
        monthly: &MonthlyOutputs,
        rng: &mut R,
    ) -> Result<PatientRun> {
        while self.is_alive() {
            self.step(monthly, rng)?;
        }
        Ok(self.finish())
    }

    pub fn finish(self) -> PatientRun {
        PatientRun {
            outcomes: self.outcomes,
            values: self.values,
            trace: self.trace,
        }
    }

    fn start_month(&mut self, monthly: &MonthlyOutputs) -> Arc<MonthRecord> {
        self.risks.clear();
        self.bracket = AgeBracket::from_age_months(self.age_months);
        self.qol = 1.0;
        monthly.month(self.month as usize)
    }

    fn update_mortality<R: Rng + ?Sized>(&mut self, record: &MonthRecord, rng: &mut R) -> Result<()> {
        if self.risks.is_empty() {
            return Err(SimulationError::EmptyRiskSet {
                patient: self.id,
                month: self.month,
            });
        }
        if let Some(cause) = self.risks.draw(rng) {
            self.kill(record, cause);
        }
        Ok(())
    }

    // ========================================================================
    // Shared helpers
    // ========================================================================

    fn exposure(&self) -> Exposure {
        match self.smoking {
            SmokingState::Never => Exposure::Never,
            SmokingState::Current => Exposure::Current {
                intensity: self.intensity,
            },
            SmokingState::Former {
                quit_month,
                quit_bracket,
            } => Exposure::Former {
                intensity: self.intensity,
                months_since_quit: self.month - quit_month,
                quit_bracket,
            },
        }
    }

    fn stratum(&self) -> Stratum {
        Stratum::new(self.smoking.status(), self.bracket, self.gender)
    }

    fn by_intensity_gender(&self, table: &ByIntensity<ByGender<f64>>) -> f64 {
        *table.get(self.intensity).get(self.gender)
    }

    fn full_events(&self) -> impl Iterator<Item = EventId> + '_ {
        self.config
            .event_ids()
            .filter(|e| self.events[e.index()].stage == EventStage::Full)
    }

    fn add_cost(&mut self, record: &MonthRecord, category: CostCategory, amount: f64) {
        let stratum = self.stratum();
        self.values
            .add_cost(category, stratum, amount, self.discount_factor);
        record.add_cost(category, amount * self.discount_factor);
    }

    fn apply_qol(&mut self, multiplier: f64) {
        if self.config.run.enable_qol {
            self.qol *= multiplier;
        }
    }

    fn kill(&mut self, record: &MonthRecord, cause: DeathCause) {
        self.outcomes.death = Some(DeathRecord {
            cause,
            status: self.smoking.status(),
            intensity: self.intensity,
            month: self.month,
            age_months: self.age_months,
        });
        for (i, state) in self.events.iter().enumerate() {
            if let (EventStage::Full, Some(onset)) = (state.stage, state.entered_month) {
                self.outcomes.event_months[i] += self.month - onset;
            }
        }
        record.record_death_cause(cause);

        let (month, id) = (self.month, self.id.0);
        let label = cause.label(&self.config.event_names());
        self.trace(|| format!("\n**{month} DEATH {label}"));
        self.trace_plain(|| format!("\nEND PATIENT {id}"));
    }

    /// Append a trace line followed by the running discounted totals
    fn trace(&mut self, line: impl FnOnce() -> String) {
        if let Some(buf) = self.trace.as_mut() {
            let totals = &self.values.discounted;
            buf.push_str(&line());
            buf.push_str(&format!(
                ", LM {:.2}, QA {:.2}, $ {:.2}",
                totals.total_life_months(),
                totals.total_qalms(),
                totals.total_costs()
            ));
        }
    }

    fn trace_plain(&mut self, line: impl FnOnce() -> String) {
        if let Some(buf) = self.trace.as_mut() {
            buf.push_str(&line());
        }
    }

    fn trace_header(&mut self) {
        if self.trace.is_none() {
            return;
        }
        let config = self.config;
        let names = |active: Vec<&str>| active.join(",");
        let events = names(
            self.full_events()
                .map(|e| config.event(e).name.as_str())
                .collect(),
        );
        let interventions = names(
            config
                .intervention_ids()
                .filter(|i| self.interventions[i.index()].active)
                .map(|i| config.intervention(i).name.as_str())
                .collect(),
        );
        let prophylaxes = names(
            config
                .prophylaxis_ids()
                .filter(|p| self.prophylaxes[p.index()].active)
                .map(|p| config.prophylaxis(p).name.as_str())
                .collect(),
        );

        let (id, gender, age) = (self.id.0, self.gender.label(), self.age_months);
        let (status, intensity) = (self.smoking.status().label(), self.intensity.label());
        self.trace_plain(|| format!("\n\nBEGIN PATIENT {id}"));
        self.trace_plain(|| format!("\n\tgender: {gender}, init age: {age} mths"));
        self.trace_plain(|| {
            format!("\n\tsmoking status: {status}, smoking intensity: {intensity}")
        });
        if let SmokingState::Former { quit_month, .. } = self.smoking {
            self.trace(|| format!("\n\tmonth of quit: {quit_month}"));
        }
        self.trace_plain(|| format!("\n\tevents: {events}"));
        self.trace_plain(|| format!("\n\tinterventions: {interventions}"));
        self.trace_plain(|| format!("\n\tprophs: {prophylaxes}"));
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn id(&self) -> PatientId {
        self.id
    }

    pub fn gender(&self) -> Gender {
        self.gender
    }

    pub fn intensity(&self) -> SmokingIntensity {
        self.intensity
    }

    pub fn smoking(&self) -> SmokingState {
        self.smoking
    }

    pub fn age_months(&self) -> i64 {
        self.age_months
    }

    /// Simulated month counter, starting at zero
    pub fn month(&self) -> i64 {
        self.month
    }

    pub fn event(&self, id: EventId) -> &EventState {
        &self.events[id.index()]
    }

    pub fn intervention(&self, id: InterventionId) -> TreatmentState {
        self.interventions[id.index()]
    }

    pub fn prophylaxis(&self, id: ProphylaxisId) -> TreatmentState {
        self.prophylaxes[id.index()]
    }

    pub fn discount_factor(&self) -> f64 {
        self.discount_factor
    }

    /// Quality-of-life multiplier accumulated so far this month
    pub fn qol(&self) -> f64 {
        self.qol
    }

    /// Death risks added so far this month
    pub fn risks(&self) -> &RiskSet {
        &self.risks
    }

    pub fn is_alive(&self) -> bool {
        self.outcomes.death.is_none()
    }

    pub fn outcomes(&self) -> &PatientOutcomes {
        &self.outcomes
    }

    pub fn values(&self) -> &DiscountedOutcomes {
        &self.values
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accumulators::MonthLayout;
    use crate::config::SimulationBuilder;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    fn monthly(config: &SimulationConfig) -> MonthlyOutputs {
        MonthlyOutputs::new(MonthLayout::new(
            config.events.len(),
            config.interventions.len(),
            config.prophylaxes.len(),
        ))
    }

    #[test]
    fn test_empty_risk_set_is_fatal() {
        let config = SimulationBuilder::new().build().unwrap();
        let outputs = monthly(&config);
        let mut rng = SmallRng::seed_from_u64(0);
        let mut patient = Patient::new(&config, PatientId(4), &mut rng).unwrap();
        let record = patient.start_month(&outputs);

        let err = patient.update_mortality(&record, &mut rng).unwrap_err();
        assert_eq!(
            err,
            SimulationError::EmptyRiskSet {
                patient: PatientId(4),
                month: 0
            }
        );
    }

    #[test]
    fn test_former_smoker_quit_month_is_not_after_start() {
        let config = SimulationBuilder::new()
            .initial_age_years(50.0)
            .smoking(SmokingStatus::Former, SmokingIntensity::Heavy)
            .months_since_quit(crate::sampling::TruncatedNormal::new(36.0, 24.0, None, None))
            .build()
            .unwrap();
        let mut rng = SmallRng::seed_from_u64(8);
        for id in 0..200 {
            let patient = Patient::new(&config, PatientId(id), &mut rng).unwrap();
            let SmokingState::Former {
                quit_month,
                quit_bracket,
            } = patient.smoking()
            else {
                panic!("expected a former smoker");
            };
            assert!(quit_month <= 0);
            assert!(-quit_month <= patient.age_months());
            assert_eq!(
                quit_bracket,
                AgeBracket::from_age_months(patient.age_months() + quit_month)
            );
        }
    }

    #[test]
    fn test_trace_only_for_low_ids() {
        let config = SimulationBuilder::new().trace_patients(2).build().unwrap();
        let mut rng = SmallRng::seed_from_u64(1);
        let traced = Patient::new(&config, PatientId(1), &mut rng).unwrap();
        let untraced = Patient::new(&config, PatientId(2), &mut rng).unwrap();

        let text = traced.finish().trace.unwrap();
        assert!(text.starts_with("\n\nBEGIN PATIENT 1"));
        assert!(text.contains("smoking status: Never"));
        assert!(untraced.finish().trace.is_none());
    }
}
