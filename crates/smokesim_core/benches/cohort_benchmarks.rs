//! Criterion benchmarks for the smokesim cohort runner
//!
//! Run with: cargo bench -p smokesim_core

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use smokesim_core::accumulators::{MonthLayout, MonthlyOutputs};
use smokesim_core::config::{
    EventBuilder, RelapseCurve, SimulationBuilder, SimulationConfig, TreatmentBuilder,
};
use smokesim_core::model::{PatientId, SmokingIntensity, SmokingStatus};
use smokesim_core::sampling::TruncatedNormal;
use smokesim_core::simulation::{run_cohort, simulate_patient};

fn create_smoker_config(run_size: u32) -> SimulationConfig {
    SimulationBuilder::new()
        .run_size(run_size)
        .trace_patients(0)
        .initial_age(TruncatedNormal::new(480.0, 120.0, Some(216.0), Some(960.0)))
        .smoking(SmokingStatus::Current, SmokingIntensity::Moderate)
        .never_smoker_mortality(0.001)
        .quit_probability(0.01)
        .relapse(RelapseCurve::new(0.04, -0.05))
        .background_cost(120.0)
        .event(
            EventBuilder::new("Lung Cancer")
                .pre_event_incidence(0.002)
                .pre_event_progression(0.03)
                .background_screening(0.01)
                .sensitivity(0.85)
                .specificity(0.9)
                .confirmatory_test(2, 0.002)
                .incidence(0.0005)
                .death_probability(0.2),
        )
        .event(
            EventBuilder::new("CHD")
                .prevalence(0.05)
                .incidence(0.001)
                .death_probability(0.1)
                .complication(0.01)
                .complication_death_probability(0.05),
        )
        .intervention(
            TreatmentBuilder::new("Counselling")
                .monthly_start(0.02)
                .stop_probability(0.25)
                .quit_multiplier(1.8)
                .monthly_cost(50.0),
        )
        .prophylaxis(
            TreatmentBuilder::new("Statin")
                .monthly_start(0.01)
                .event_efficacy("CHD", 0.7)
                .monthly_cost(15.0),
        )
        .build()
        .expect("benchmark configuration is valid")
}

fn bench_single_patient(c: &mut Criterion) {
    let config = create_smoker_config(1);
    let layout = MonthLayout::new(2, 1, 1);

    c.bench_function("single_patient_lifetime", |b| {
        b.iter(|| {
            let outputs = MonthlyOutputs::new(layout);
            simulate_patient(black_box(&config), black_box(PatientId(7)), &outputs)
        })
    });
}

fn bench_cohort(c: &mut Criterion) {
    let mut group = c.benchmark_group("cohort");

    for run_size in [100u32, 500, 1000].iter() {
        let config = create_smoker_config(*run_size);
        group.bench_with_input(BenchmarkId::new("patients", run_size), run_size, |b, _| {
            b.iter(|| run_cohort(black_box(&config)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_single_patient, bench_cohort);
criterion_main!(benches);
