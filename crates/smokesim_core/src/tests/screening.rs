//! Screening, confirmatory testing and detection

use rand::SeedableRng;
use rand::rngs::SmallRng;

use crate::accumulators::{MonthLayout, MonthlyOutputs};
use crate::config::{
    EventBuilder, EventCosts, EventQol, SimulationBuilder, SimulationConfig, TreatmentBuilder,
};
use crate::model::{EventId, EventStage, PatientId, ProphylaxisId};
use crate::patient::Patient;

const LUNG: EventId = EventId(0);

fn perfect_screening(delay_months: i64) -> EventBuilder {
    EventBuilder::new("Lung Cancer")
        .pre_event_incidence(1.0)
        .background_screening(1.0)
        .sensitivity(1.0)
        .specificity(1.0)
        .confirmatory_test(delay_months, 0.0)
}

fn build(event: EventBuilder) -> SimulationConfig {
    SimulationBuilder::new()
        .initial_age_years(55.0)
        .event(event)
        .build()
        .unwrap()
}

/// A perfect positive screen leads to a confirmatory test exactly `delay` months later
#[test]
fn test_confirmatory_test_after_delay() {
    let config = build(perfect_screening(3));
    let outputs = MonthlyOutputs::new(MonthLayout::new(1, 0, 0));
    let mut rng = SmallRng::seed_from_u64(11);
    let mut patient = Patient::new(&config, PatientId(0), &mut rng).unwrap();

    patient.step(&outputs, &mut rng).unwrap();
    let state = patient.event(LUNG);
    assert_eq!(state.stage(), EventStage::Pre);
    assert_eq!(state.confirmatory_month(), Some(3));
    assert!(!state.is_detected());

    let month0 = outputs.month(0).summary();
    assert_eq!(month0.screen_result(LUNG, true, true), 1);
    assert_eq!(month0.confirmatory_tests, vec![0]);

    for _ in 1..3 {
        patient.step(&outputs, &mut rng).unwrap();
        assert_eq!(patient.event(LUNG).confirmatory_month(), Some(3));
        assert!(!patient.event(LUNG).is_detected());
    }

    patient.step(&outputs, &mut rng).unwrap();
    let state = patient.event(LUNG);
    assert!(state.is_detected());
    assert_eq!(state.confirmatory_month(), None);
    assert_eq!(outputs.month(3).summary().confirmatory_tests, vec![1]);

    // No new screens while the pending test is outstanding
    for month in 1..3 {
        let summary = outputs.month(month).summary();
        assert_eq!(summary.screen_result(LUNG, true, true), 0);
    }
}

/// Without a pre-event a perfectly specific screen is negative and books nothing
#[test]
fn test_true_negative_screen() {
    let event = EventBuilder::new("Lung Cancer")
        .background_screening(1.0)
        .specificity(1.0)
        .confirmatory_test(2, 0.0);
    let config = build(event);
    let outputs = MonthlyOutputs::new(MonthLayout::new(1, 0, 0));
    let mut rng = SmallRng::seed_from_u64(3);
    let mut patient = Patient::new(&config, PatientId(0), &mut rng).unwrap();

    for _ in 0..6 {
        patient.step(&outputs, &mut rng).unwrap();
        assert_eq!(patient.event(LUNG).confirmatory_month(), None);
    }
    let negatives: u64 = outputs
        .summaries()
        .iter()
        .map(|m| m.screen_result(LUNG, false, false))
        .sum();
    assert_eq!(negatives, 6);
}

/// Certain cure at confirmation returns the event to the `none` stage
#[test]
fn test_cure_on_detection() {
    let event = perfect_screening(0).cure_probability(1.0);
    let config = build(event);
    let outputs = MonthlyOutputs::new(MonthLayout::new(1, 0, 0));
    let mut rng = SmallRng::seed_from_u64(5);
    let mut patient = Patient::new(&config, PatientId(0), &mut rng).unwrap();

    patient.step(&outputs, &mut rng).unwrap();
    let state = patient.event(LUNG);
    assert_eq!(state.stage(), EventStage::None);
    assert!(!state.is_detected());
    assert_eq!(patient.outcomes().pre_events_incident, vec![1]);
}

/// Confirmation starts the linked prophylaxis
#[test]
fn test_detection_starts_prophylaxis() {
    let config = SimulationBuilder::new()
        .initial_age_years(60.0)
        .event(perfect_screening(1).on_detection_start_prophylaxis("Chemoprevention"))
        .prophylaxis(TreatmentBuilder::new("Chemoprevention").start_cost(500.0))
        .build()
        .unwrap();
    let outputs = MonthlyOutputs::new(MonthLayout::new(1, 0, 1));
    let mut rng = SmallRng::seed_from_u64(8);
    let mut patient = Patient::new(&config, PatientId(0), &mut rng).unwrap();

    patient.step(&outputs, &mut rng).unwrap();
    assert!(!patient.prophylaxis(ProphylaxisId(0)).active);
    patient.step(&outputs, &mut rng).unwrap();
    assert!(patient.event(LUNG).is_detected());
    assert!(patient.prophylaxis(ProphylaxisId(0)).active);
    assert_eq!(patient.values().undiscounted.prophylaxis_costs, vec![500.0]);
    assert_eq!(outputs.month(1).summary().prophylaxis_starts, vec![1]);
}

/// Waiting for confirmation and the detection status each scale quality of
/// life; only a detected pre-event carries the monthly detected cost
#[test]
fn test_pre_event_quality_of_life_and_detected_cost() {
    let event = perfect_screening(2)
        .qol(EventQol {
            awaiting_confirmation: 0.5,
            undetected: 0.9,
            detected: 0.8,
            ..EventQol::default()
        })
        .costs(EventCosts {
            detected_monthly: 7.0,
            ..EventCosts::default()
        });
    let config = build(event);
    let outputs = MonthlyOutputs::new(MonthLayout::new(1, 0, 0));
    let mut rng = SmallRng::seed_from_u64(13);
    let mut patient = Patient::new(&config, PatientId(0), &mut rng).unwrap();

    // Months 0-1 await confirmation undetected; month 2 confirms; month 3
    // screens positive again and waits while detected
    let mut previous = 0.0;
    for (month, expected) in [0.45, 0.45, 0.40, 0.40].into_iter().enumerate() {
        patient.step(&outputs, &mut rng).unwrap();
        let qalms = patient.values().undiscounted.total_qalms();
        assert!(
            (qalms - previous - expected).abs() < 1e-12,
            "month {month}: {}",
            qalms - previous
        );
        previous = qalms;
        assert_eq!(patient.event(LUNG).is_detected(), month >= 2);
    }
    assert_eq!(patient.values().undiscounted.screening_costs, vec![14.0]);
}
