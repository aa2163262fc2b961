//! Whole-lifetime scenarios with exact expected outcomes

use rand::SeedableRng;
use rand::rngs::SmallRng;

use crate::accumulators::{MonthLayout, MonthlyOutputs};
use crate::config::{
    CurrentSmokerMortality, EventBuilder, FormerSmokerMortality, LIFETABLE_YEARS, NaturalHistory,
    RelapseCurve, SimulationBuilder, SimulationConfig, TreatmentBuilder,
};
use crate::model::{
    AgeBracket, AgeCurve, ByGender, ByIntensity, DeathCause, EventId, EventStage, PatientId,
    SmokingIntensity, SmokingStatus,
};
use crate::patient::{Patient, SmokingState};
use crate::sampling::TruncatedNormal;
use crate::simulation::{run_cohort, simulate_patient};
use crate::transition::TransitionWindow;

fn assert_close(actual: f64, expected: f64) {
    assert!((actual - expected).abs() < 1e-12, "{actual} vs {expected}");
}

fn lifetable(probability: f64) -> ByIntensity<ByGender<Vec<f64>>> {
    ByIntensity::uniform(ByGender::uniform(vec![probability; LIFETABLE_YEARS]))
}

fn curves(curve: AgeCurve) -> ByIntensity<ByGender<AgeCurve>> {
    ByIntensity::uniform(ByGender::uniform(curve))
}

fn new_patient(config: &SimulationConfig) -> (Patient<'_>, MonthlyOutputs, SmallRng) {
    let outputs = MonthlyOutputs::new(MonthLayout::new(
        config.events.len(),
        config.interventions.len(),
        config.prophylaxes.len(),
    ));
    let mut rng = SmallRng::seed_from_u64(3);
    let patient = Patient::new(config, PatientId(0), &mut rng).unwrap();
    (patient, outputs, rng)
}

/// The only death risk in a quiet month is the natural-history hazard
fn natural_history_hazard(config: &SimulationConfig) -> f64 {
    let (mut patient, outputs, mut rng) = new_patient(config);
    patient.step(&outputs, &mut rng).unwrap();
    assert_eq!(patient.risks().len(), 1);
    let (cause, hazard) = *patient.risks().iter().next().unwrap();
    assert_eq!(cause, DeathCause::NaturalHistory);
    hazard
}

/// A never smoker with no mortality lives from 20 until the maximum age of 85.
///
/// Death is booked in the month starting at `85*12 - 1`; the 85th birthday
/// falls at the end of that last booked month, giving `(85-20)*12` life months.
#[test]
fn test_old_age_death_at_max_age() {
    let config = SimulationBuilder::new()
        .run_size(4)
        .initial_age_years(20.0)
        .max_age(85)
        .discount_rate(0.0)
        .enable_qol(false)
        .build()
        .unwrap();

    let result = run_cohort(&config).unwrap();
    assert_eq!(result.patients.len(), 4);
    for run in &result.patients {
        let death = run.outcomes.death.unwrap();
        assert_eq!(death.cause, DeathCause::OldAge);
        assert_eq!(death.month, 779);
        assert_eq!(death.age_months, 85 * 12 - 1);
        assert_eq!(run.values.undiscounted.total_life_months(), 780.0);
        assert_eq!(run.values.undiscounted.total_qalms(), 780.0);
        assert_eq!(run.values.discounted.total_life_months(), 780.0);
        assert_eq!(run.months_lived(), 780);
    }

    assert_eq!(result.monthly.len(), 780);
    assert_eq!(result.monthly[0].alive_total(), 4);
    assert_eq!(result.monthly[778].alive_total(), 4);
    assert_eq!(result.monthly[779].deaths_total(), 4);
    assert_eq!(result.monthly[779].death_cause(DeathCause::OldAge), 4);

    assert_eq!(result.metrics.patients, 4);
    assert_eq!(result.metrics.patient_months, 4 * 780);
    assert_eq!(result.metrics.longest_lifetime_months, 780);
    assert_eq!(result.metrics.cohort_months, 780);

    let summary = result.summary();
    assert_eq!(summary.undiscounted.life_months.mean, 780.0);
    assert_eq!(summary.undiscounted.life_months.std_dev, 0.0);
    assert_eq!(summary.initial_age_years.mean, 20.0);
}

/// The discount factor falls by the annual rate every twelve months
#[test]
fn test_discount_factor_by_year() {
    let config = SimulationBuilder::new()
        .initial_age_years(30.0)
        .discount_rate(0.03)
        .build()
        .unwrap();
    let outputs = MonthlyOutputs::new(MonthLayout::new(0, 0, 0));
    let mut rng = SmallRng::seed_from_u64(0);
    let mut patient = Patient::new(&config, PatientId(0), &mut rng).unwrap();
    assert_eq!(patient.discount_factor(), 1.0);

    for year in 1..=3 {
        for _ in 0..12 {
            patient.step(&outputs, &mut rng).unwrap();
        }
        let expected = 1.03_f64.powi(-year);
        assert!(
            (patient.discount_factor() - expected).abs() < 1e-12,
            "year {year}: {} vs {expected}",
            patient.discount_factor()
        );
    }
    assert_eq!(patient.month(), 36);
    assert_eq!(patient.age_months(), 30 * 12 + 36);
}

/// Certain quitting with no relapse gives exactly one quit
#[test]
fn test_single_quit_without_relapse() {
    let config = SimulationBuilder::new()
        .initial_age_years(50.0)
        .max_age(60)
        .smoking(SmokingStatus::Current, SmokingIntensity::Moderate)
        .quit_probability(1.0)
        .relapse(RelapseCurve::new(0.0, 0.0))
        .build()
        .unwrap();
    let outputs = MonthlyOutputs::new(MonthLayout::new(0, 0, 0));

    let run = simulate_patient(&config, PatientId(0), &outputs).unwrap();
    assert_eq!(run.outcomes.total_quits(), 1);
    assert_eq!(run.outcomes.total_relapses(), 0);
    assert!(run.outcomes.ever_quit);
    assert!(!run.outcomes.ever_relapse);
    assert_eq!(run.outcomes.ages_at_quit, vec![600]);
    assert!(run.outcomes.quit_durations.is_empty());
    assert_eq!(run.outcomes.death.unwrap().status, SmokingStatus::Former);

    let month0 = outputs.month(0).summary();
    assert_eq!(month0.total_quits(), 1);
    let later: u64 = outputs.summaries()[1..].iter().map(|m| m.total_quits()).sum();
    assert_eq!(later, 0);
}

/// Quitting records the quit month and age-at-quit bracket in the former state
#[test]
fn test_quit_sets_former_state() {
    let config = SimulationBuilder::new()
        .initial_age_years(45.0)
        .smoking(SmokingStatus::Current, SmokingIntensity::Light)
        .quit_probability(1.0)
        .build()
        .unwrap();
    let outputs = MonthlyOutputs::new(MonthLayout::new(0, 0, 0));
    let mut rng = SmallRng::seed_from_u64(9);
    let mut patient = Patient::new(&config, PatientId(0), &mut rng).unwrap();

    for _ in 0..4 {
        patient.step(&outputs, &mut rng).unwrap();
    }
    match patient.smoking() {
        SmokingState::Former { quit_month, .. } => assert_eq!(quit_month, 0),
        other => panic!("expected former smoker, got {other:?}"),
    }
    assert_eq!(patient.smoking().months_since_quit(patient.month()), Some(4));
}

/// A full event never returns to an earlier stage over a lifetime
#[test]
fn test_full_event_persists_until_death() {
    let config = SimulationBuilder::new()
        .initial_age_years(70.0)
        .max_age(75)
        .event(EventBuilder::new("COPD").incidence(1.0))
        .build()
        .unwrap();
    let outputs = MonthlyOutputs::new(MonthLayout::new(1, 0, 0));
    let mut rng = SmallRng::seed_from_u64(4);
    let mut patient = Patient::new(&config, PatientId(0), &mut rng).unwrap();

    while patient.is_alive() {
        patient.step(&outputs, &mut rng).unwrap();
        assert_eq!(patient.event(EventId(0)).stage(), EventStage::Full);
    }
    let outcomes = patient.outcomes();
    assert_eq!(outcomes.events_incident, vec![1]);
    assert_eq!(outcomes.event_months, vec![59]);

    let summaries = outputs.summaries();
    assert_eq!(summaries[0].event_incidence(EventId(0)).iter().sum::<u64>(), 1);
    assert_eq!(summaries[59].event_with(EventId(0)).iter().sum::<u64>(), 1);
}

/// Event death risk competes with natural history in the month of onset
#[test]
fn test_certain_event_death() {
    let config = SimulationBuilder::new()
        .run_size(10)
        .event(EventBuilder::new("Stroke").incidence(1.0).death_probability(1.0))
        .build()
        .unwrap();

    let result = run_cohort(&config).unwrap();
    for run in &result.patients {
        let death = run.outcomes.death.unwrap();
        assert_eq!(death.cause, DeathCause::Event(EventId(0)));
        assert_eq!(death.month, 0);
    }
    assert_eq!(result.monthly.len(), 1);
    assert_eq!(result.monthly[0].death_cause(DeathCause::Event(EventId(0))), 10);

    let totals = result.totals();
    assert_eq!(totals.events[0].incident, 10);
    assert_eq!(totals.death_causes[DeathCause::Event(EventId(0)).index(1)], 10);
}

// ============================================================================
// Natural-history mortality
// ============================================================================

/// The current-smoker method selects a scaled never-smoker hazard or a tabulated one
#[test]
fn test_current_smoker_mortality_method() {
    let smoker = |current_smoker| {
        SimulationBuilder::new()
            .initial_age_years(50.0)
            .smoking(SmokingStatus::Current, SmokingIntensity::Heavy)
            .natural_history(NaturalHistory {
                current_smoker,
                ..NaturalHistory::default()
            })
            .never_smoker_mortality(0.01)
            .build()
            .unwrap()
    };

    let multiplier = smoker(CurrentSmokerMortality::Multiplier {
        multipliers: curves([3.0; AgeBracket::COUNT]),
    });
    assert_close(natural_history_hazard(&multiplier), 0.03);

    let tabulated = smoker(CurrentSmokerMortality::Lifetable {
        lifetable: lifetable(0.05),
    });
    assert_eq!(natural_history_hazard(&tabulated), 0.05);
}

/// A former smoker's hazard moves linearly from the current to the ex-smoker value
#[test]
fn test_former_smoker_hazard_blends_across_window() {
    let former = |months_since_quit: f64| {
        SimulationBuilder::new()
            .initial_age_years(50.0)
            .smoking(SmokingStatus::Former, SmokingIntensity::Heavy)
            .months_since_quit(TruncatedNormal::fixed(months_since_quit))
            .natural_history(NaturalHistory {
                current_smoker: CurrentSmokerMortality::Lifetable {
                    lifetable: lifetable(0.05),
                },
                former_smoker: FormerSmokerMortality::Multiplier {
                    multipliers: curves([2.0; AgeBracket::COUNT]),
                },
                transition: TransitionWindow::new(0, 10),
                ..NaturalHistory::default()
            })
            .never_smoker_mortality(0.01)
            .build()
            .unwrap()
    };

    for (since, expected) in [(0.0, 0.05), (5.0, 0.035), (10.0, 0.02), (30.0, 0.02)] {
        assert_close(natural_history_hazard(&former(since)), expected);
    }
}

/// The ex-smoker lifetable multiplier is taken from the bracket at quitting
#[test]
fn test_former_smoker_lifetable_uses_age_at_quit() {
    let quit_bracket = AgeBracket::from_age_months(40 * 12);
    let current_bracket = AgeBracket::from_age_months(60 * 12);
    assert_ne!(quit_bracket, current_bracket);

    let mut multipliers = [1.0; AgeBracket::COUNT];
    multipliers[quit_bracket.index()] = 1.5;
    multipliers[current_bracket.index()] = 4.0;

    let config = SimulationBuilder::new()
        .initial_age_years(60.0)
        .smoking(SmokingStatus::Former, SmokingIntensity::Moderate)
        .months_since_quit(TruncatedNormal::fixed(240.0))
        .natural_history(NaturalHistory {
            former_smoker: FormerSmokerMortality::Lifetable {
                age_at_quit_multipliers: curves(multipliers),
                lifetable: lifetable(0.01),
            },
            ..NaturalHistory::default()
        })
        .build()
        .unwrap();

    assert_close(natural_history_hazard(&config), 0.015);
}

// ============================================================================
// Quit boosts and relapse
// ============================================================================

/// A recent full event replaces the baseline quit probability with its boost
#[test]
fn test_quit_boost_after_event() {
    let config = SimulationBuilder::new()
        .smoking(SmokingStatus::Current, SmokingIntensity::Heavy)
        .quit_probability(0.01)
        .event(EventBuilder::new("CHD").prevalence(1.0).quit_after_event(0.3, 6))
        .build()
        .unwrap();
    let (patient, _, _) = new_patient(&config);
    assert_eq!(patient.quit_probability(), Some(0.3));

    let certain = SimulationBuilder::new()
        .smoking(SmokingStatus::Current, SmokingIntensity::Heavy)
        .event(EventBuilder::new("CHD").prevalence(1.0).quit_after_event(1.0, 0))
        .build()
        .unwrap();
    let (mut patient, outputs, mut rng) = new_patient(&certain);
    patient.step(&outputs, &mut rng).unwrap();
    assert_eq!(patient.outcomes().total_quits(), 1);
    assert_eq!(outputs.month(0).summary().total_quits(), 1);
}

/// A complication opens its own quit window from the month it happens
#[test]
fn test_quit_boost_after_complication() {
    let config = SimulationBuilder::new()
        .smoking(SmokingStatus::Current, SmokingIntensity::Moderate)
        .event(
            EventBuilder::new("COPD")
                .prevalence(1.0)
                .complication(1.0)
                .quit_after_complication(0.4, 6),
        )
        .build()
        .unwrap();
    let (mut patient, outputs, mut rng) = new_patient(&config);
    assert_eq!(patient.quit_probability(), Some(0.0));

    patient.step(&outputs, &mut rng).unwrap();
    assert_eq!(patient.event(EventId(0)).complication_month(), Some(0));
    assert_eq!(patient.outcomes().total_quits(), 0);
    assert_eq!(patient.quit_probability(), Some(0.4));
}

/// Month of quitting under a certain post-event boost, while an intervention
/// with a zero quit multiplier blocks quitting for the first three months
fn quit_month_with_boost_window(window_months: i64) -> Option<i64> {
    let config = SimulationBuilder::new()
        .smoking(SmokingStatus::Current, SmokingIntensity::Light)
        .event(
            EventBuilder::new("Stroke")
                .prevalence(1.0)
                .quit_after_event(1.0, window_months),
        )
        .intervention(
            TreatmentBuilder::new("Counselling")
                .initial_start(1.0)
                .max_duration(3)
                .quit_multiplier(0.0),
        )
        .build()
        .unwrap();
    let (mut patient, outputs, mut rng) = new_patient(&config);
    for _ in 0..12 {
        patient.step(&outputs, &mut rng).unwrap();
        if let SmokingState::Former { quit_month, .. } = patient.smoking() {
            return Some(quit_month);
        }
    }
    None
}

/// The boost window includes its last month and nothing after it
#[test]
fn test_quit_boost_window_edge() {
    assert_eq!(quit_month_with_boost_window(3), Some(3));
    assert_eq!(quit_month_with_boost_window(2), None);
}

/// Relapse follows `c * exp(b * t)` scaled by the largest active multiplier
#[test]
fn test_relapse_probability_follows_curve() {
    let config = SimulationBuilder::new()
        .smoking(SmokingStatus::Former, SmokingIntensity::Heavy)
        .months_since_quit(TruncatedNormal::fixed(3.0))
        .relapse(RelapseCurve::new(0.01, 0.2))
        .intervention(
            TreatmentBuilder::new("Nicotine Patch")
                .initial_start(1.0)
                .relapse_multiplier(1.5),
        )
        .intervention(
            TreatmentBuilder::new("Counselling")
                .initial_start(1.0)
                .relapse_multiplier(1.2),
        )
        .build()
        .unwrap();
    let (patient, _, _) = new_patient(&config);
    let expected = 0.01 * (0.2_f64 * 3.0).exp() * 1.5;
    assert_close(patient.relapse_probability().unwrap(), expected);
}

/// Relapse is impossible in the month of quitting and certain once doubled to one
#[test]
fn test_relapse_multiplier_makes_relapse_certain() {
    let former = |multiplier: Option<f64>| {
        let mut builder = SimulationBuilder::new()
            .smoking(SmokingStatus::Former, SmokingIntensity::Light)
            .months_since_quit(TruncatedNormal::fixed(0.0))
            .relapse(RelapseCurve::new(0.5, 0.0));
        if let Some(m) = multiplier {
            builder = builder.intervention(
                TreatmentBuilder::new("Counselling")
                    .initial_start(1.0)
                    .relapse_multiplier(m),
            );
        }
        builder.build().unwrap()
    };

    let control = former(None);
    let (patient, _, _) = new_patient(&control);
    assert_eq!(patient.relapse_probability(), Some(0.0));

    let treated = former(Some(2.0));
    let (mut patient, outputs, mut rng) = new_patient(&treated);
    patient.step(&outputs, &mut rng).unwrap();
    assert_eq!(patient.smoking().status(), SmokingStatus::Former);
    assert_eq!(patient.relapse_probability(), Some(1.0));

    patient.step(&outputs, &mut rng).unwrap();
    assert_eq!(patient.smoking(), SmokingState::Current);
    assert_eq!(patient.outcomes().quit_durations, vec![1]);
    assert_eq!(patient.outcomes().total_relapses(), 1);
}
