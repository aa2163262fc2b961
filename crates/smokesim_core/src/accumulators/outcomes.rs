use serde::{Deserialize, Serialize};

use super::ByBracketGender;
use crate::model::{
    AgeBracket, DeathCause, EventId, Gender, InterventionId, PatientId, ProphylaxisId,
    SmokingIntensity, SmokingStatus,
};

/// Demographics drawn when the patient is created
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InitialState {
    pub gender: Gender,
    pub age_months: i64,
    pub status: SmokingStatus,
    pub intensity: SmokingIntensity,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeathRecord {
    pub cause: DeathCause,
    pub status: SmokingStatus,
    pub intensity: SmokingIntensity,
    /// Simulated month of death, counted from zero
    pub month: i64,
    pub age_months: i64,
}

/// Undiscounted lifetime tallies for one patient
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientOutcomes {
    pub id: PatientId,
    pub initial: InitialState,
    pub death: Option<DeathRecord>,

    pub events_prevalent: Vec<u32>,
    pub events_incident: Vec<u32>,
    /// Months lived with each full event, recorded at death
    pub event_months: Vec<i64>,
    pub pre_events_incident: Vec<u32>,
    pub pre_event_months: Vec<u32>,
    pub complications: Vec<u32>,

    pub intervention_starts: Vec<u32>,
    pub intervention_toxicities: Vec<u32>,
    pub prophylaxis_toxicities: Vec<u32>,

    pub smoking_starts: u32,
    pub quits: ByBracketGender<u32>,
    pub relapses: ByBracketGender<u32>,
    pub ever_quit: bool,
    pub ever_relapse: bool,
    pub ever_started_intervention: bool,
    /// Months abstinent before each relapse
    pub quit_durations: Vec<i64>,
    /// Age in months at each quit
    pub ages_at_quit: Vec<i64>,
}

impl PatientOutcomes {
    pub fn new(
        id: PatientId,
        initial: InitialState,
        num_events: usize,
        num_interventions: usize,
        num_prophylaxes: usize,
    ) -> Self {
        Self {
            id,
            initial,
            death: None,
            events_prevalent: vec![0; num_events],
            events_incident: vec![0; num_events],
            event_months: vec![0; num_events],
            pre_events_incident: vec![0; num_events],
            pre_event_months: vec![0; num_events],
            complications: vec![0; num_events],
            intervention_starts: vec![0; num_interventions],
            intervention_toxicities: vec![0; num_interventions],
            prophylaxis_toxicities: vec![0; num_prophylaxes],
            smoking_starts: 0,
            quits: ByBracketGender::default(),
            relapses: ByBracketGender::default(),
            ever_quit: false,
            ever_relapse: false,
            ever_started_intervention: false,
            quit_durations: Vec::new(),
            ages_at_quit: Vec::new(),
        }
    }

    pub fn record_prevalent(&mut self, event: EventId) {
        self.events_prevalent[event.index()] += 1;
    }

    pub fn record_incident(&mut self, event: EventId) {
        self.events_incident[event.index()] += 1;
    }

    pub fn record_pre_event(&mut self, event: EventId) {
        self.pre_events_incident[event.index()] += 1;
    }

    pub fn record_pre_event_month(&mut self, event: EventId) {
        self.pre_event_months[event.index()] += 1;
    }

    pub fn record_complication(&mut self, event: EventId) {
        self.complications[event.index()] += 1;
    }

    pub fn record_intervention_start(&mut self, intervention: InterventionId) {
        self.intervention_starts[intervention.index()] += 1;
    }

    pub fn record_intervention_toxicity(&mut self, intervention: InterventionId) {
        self.intervention_toxicities[intervention.index()] += 1;
    }

    pub fn record_prophylaxis_toxicity(&mut self, prophylaxis: ProphylaxisId) {
        self.prophylaxis_toxicities[prophylaxis.index()] += 1;
    }

    pub fn record_quit(&mut self, bracket: AgeBracket, gender: Gender, age_months: i64) {
        *self.quits.get_mut(bracket, gender) += 1;
        self.ever_quit = true;
        self.ages_at_quit.push(age_months);
    }

    pub fn record_relapse(&mut self, bracket: AgeBracket, gender: Gender, quit_duration: i64) {
        *self.relapses.get_mut(bracket, gender) += 1;
        self.ever_relapse = true;
        self.quit_durations.push(quit_duration);
    }

    pub fn total_quits(&self) -> u32 {
        self.quits.values().sum()
    }

    pub fn total_relapses(&self) -> u32 {
        self.relapses.values().sum()
    }

    pub fn is_dead(&self) -> bool {
        self.death.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcomes() -> PatientOutcomes {
        PatientOutcomes::new(
            PatientId(3),
            InitialState {
                gender: Gender::Female,
                age_months: 400,
                status: SmokingStatus::Current,
                intensity: SmokingIntensity::Light,
            },
            2,
            1,
            0,
        )
    }

    #[test]
    fn test_quit_and_relapse_tallies() {
        let mut out = outcomes();
        let bracket = AgeBracket::from_age_months(400);
        out.record_quit(bracket, Gender::Female, 400);
        out.record_relapse(bracket, Gender::Female, 7);
        out.record_quit(bracket, Gender::Female, 410);

        assert_eq!(out.total_quits(), 2);
        assert_eq!(out.total_relapses(), 1);
        assert_eq!(*out.quits.get(bracket, Gender::Female), 2);
        assert_eq!(out.quit_durations, vec![7]);
        assert_eq!(out.ages_at_quit, vec![400, 410]);
        assert!(out.ever_quit && out.ever_relapse);
    }

    #[test]
    fn test_sized_by_dimensions() {
        let out = outcomes();
        assert_eq!(out.events_incident.len(), 2);
        assert_eq!(out.intervention_starts.len(), 1);
        assert!(out.prophylaxis_toxicities.is_empty());
        assert!(!out.is_dead());
    }
}
