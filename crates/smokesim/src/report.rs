//! Text report for a finished cohort run
//!
//! The report is written in fixed sections: population summary, initial
//! distributions, deaths, events, smoking, interventions, prophylaxes,
//! costs, then one cohort summary per simulated month. Per-patient values
//! are cohort means unless a heading says otherwise.

use std::fmt::{self, Write};

use serde::Serialize;
use smokesim_core::accumulators::{MonthSummary, ValueLedger};
use smokesim_core::metrics::RunMetrics;
use smokesim_core::model::{
    AgeBracket, DeathCause, EventId, Gender, SmokingIntensity, SmokingStatus,
};
use smokesim_core::summary::{CohortTotals, MeanStd, PopulationSummary};
use smokesim_core::{CohortResult, SimulationConfig};

const RULE: &str = "==========================================================================";

fn heading(out: &mut String, title: &str) -> fmt::Result {
    writeln!(out)?;
    writeln!(out, "{RULE}")?;
    writeln!(out, "{title}")?;
    writeln!(out, "{RULE}")
}

fn status_intensity_table(out: &mut String, cells: &[u64]) -> fmt::Result {
    write!(out, "{:<10}", "")?;
    for intensity in SmokingIntensity::ALL {
        write!(out, "{:>12}", intensity.label())?;
    }
    writeln!(out)?;
    for status in SmokingStatus::ALL {
        write!(out, "{:<10}", status.label())?;
        for intensity in SmokingIntensity::ALL {
            let i = status.index() * SmokingIntensity::COUNT + intensity.index();
            write!(out, "{:>12}", cells[i])?;
        }
        writeln!(out)?;
    }
    Ok(())
}

fn bracket_gender_table(
    out: &mut String,
    title: &str,
    value: impl Fn(AgeBracket, Gender) -> u64,
) -> fmt::Result {
    writeln!(out, "{title}")?;
    write!(out, "{:<10}", "Age")?;
    for gender in Gender::ALL {
        write!(out, "{:>10}", gender.label())?;
    }
    writeln!(out)?;
    for bracket in AgeBracket::all() {
        write!(out, "{:<10}", bracket.label())?;
        for gender in Gender::ALL {
            write!(out, "{:>10}", value(bracket, gender))?;
        }
        writeln!(out)?;
    }
    Ok(())
}

fn mean_std_or_dash(stats: Option<MeanStd>) -> String {
    stats.map_or_else(
        || "--".to_string(),
        |s| format!("{:.2} (std {:.2})", s.mean, s.std_dev),
    )
}

// ============================================================================
// Sections
// ============================================================================

fn population_summary(
    out: &mut String,
    config: &SimulationConfig,
    summary: &PopulationSummary,
) -> fmt::Result {
    heading(out, "POPULATION SUMMARY MEASURES")?;
    writeln!(out, "Run Size: {}", summary.patients)?;
    writeln!(out, "Disc Rate: {}", config.run.discount_rate_annual)?;
    writeln!(out)?;
    writeln!(
        out,
        "{:<14}{:>16}{:>16}{:>16}{:>16}",
        "", "Disc Mean", "Disc Std", "Undisc Mean", "Undisc Std"
    )?;
    let (d, u) = (&summary.discounted, &summary.undiscounted);
    for (label, disc, undisc) in [
        ("Costs", d.costs, u.costs),
        ("Life Months", d.life_months, u.life_months),
        ("QALMs", d.qalms, u.qalms),
    ] {
        writeln!(
            out,
            "{label:<14}{:>16.2}{:>16.2}{:>16.2}{:>16.2}",
            disc.mean, disc.std_dev, undisc.mean, undisc.std_dev
        )?;
    }
    Ok(())
}

fn initial_distributions(
    out: &mut String,
    totals: &CohortTotals,
    summary: &PopulationSummary,
) -> fmt::Result {
    heading(out, "INITIAL DISTRIBUTIONS")?;
    writeln!(out, "Smoking status by intensity")?;
    status_intensity_table(out, &totals.initial_status_intensity)?;
    writeln!(out)?;
    for gender in Gender::ALL {
        writeln!(
            out,
            "{:<10}{:>12}",
            gender.label(),
            totals.initial_gender[gender.index()]
        )?;
    }
    writeln!(
        out,
        "Initial age (years): {:.2} (std {:.2})",
        summary.initial_age_years.mean, summary.initial_age_years.std_dev
    )
}

fn death_distributions(
    out: &mut String,
    config: &SimulationConfig,
    totals: &CohortTotals,
) -> fmt::Result {
    heading(out, "DEATH DISTRIBUTIONS")?;
    writeln!(out, "Smoking status by intensity at death")?;
    status_intensity_table(out, &totals.death_status_intensity)?;
    writeln!(out)?;
    writeln!(out, "Cause of death")?;
    let names = config.event_names();
    for cause in DeathCause::all(config.events.len()) {
        writeln!(
            out,
            "{:<36}{:>12}",
            cause.label(&names),
            totals.death_causes[cause.index(config.events.len())]
        )?;
    }
    Ok(())
}

fn events(out: &mut String, config: &SimulationConfig, totals: &CohortTotals) -> fmt::Result {
    heading(out, "EVENTS")?;
    writeln!(
        out,
        "{:<20}{:>14}{:>12}{:>12}{:>14}{:>12}{:>14}",
        "Event", "Mean Months", "Prevalent", "Incident", "Pre Months", "Pre Inc", "Complications"
    )?;
    for (def, e) in config.events.iter().zip(&totals.events) {
        writeln!(
            out,
            "{:<20}{:>14.2}{:>12}{:>12}{:>14.2}{:>12}{:>14}",
            def.name,
            e.mean_months_with_event,
            e.prevalent,
            e.incident,
            e.mean_pre_event_months,
            e.pre_event_incident,
            e.complications
        )?;
    }
    Ok(())
}

fn smoking(out: &mut String, totals: &CohortTotals, summary: &PopulationSummary) -> fmt::Result {
    heading(out, "SMOKING")?;
    writeln!(out, "Smoking starts: {}", totals.smoking_starts)?;
    writeln!(out, "Patients ever quit: {}", totals.ever_quit)?;
    writeln!(out, "Patients ever relapsed: {}", totals.ever_relapse)?;
    writeln!(
        out,
        "Patients ever on an intervention: {}",
        totals.ever_started_intervention
    )?;
    writeln!(out)?;
    bracket_gender_table(out, "Quits", |b, g| *totals.quits.get(b, g))?;
    writeln!(out)?;
    bracket_gender_table(out, "Relapses", |b, g| *totals.relapses.get(b, g))?;
    writeln!(out)?;

    match summary.quit_duration_months {
        Some(d) => writeln!(
            out,
            "Quit duration before relapse (months): mean {:.2}, std {:.2}, min {}, max {}, IQR {:.2}",
            d.mean, d.std_dev, d.min, d.max, d.iqr
        )?,
        None => writeln!(out, "Quit duration before relapse (months): --")?,
    }
    writeln!(
        out,
        "Age at quit (years): {}",
        mean_std_or_dash(summary.age_at_quit_years)
    )
}

fn interventions(
    out: &mut String,
    config: &SimulationConfig,
    totals: &CohortTotals,
) -> fmt::Result {
    heading(out, "INTERVENTIONS")?;
    writeln!(
        out,
        "{:<24}{:>12}{:>12}{:>16}",
        "Intervention", "Starts", "Toxicities", "Disc Cost/Pt"
    )?;
    for (i, def) in config.interventions.iter().enumerate() {
        writeln!(
            out,
            "{:<24}{:>12}{:>12}{:>16.2}",
            def.name,
            totals.intervention_starts[i],
            totals.intervention_toxicities[i],
            totals.per_patient(totals.discounted.intervention_costs[i])
        )?;
    }
    Ok(())
}

fn prophylaxes(
    out: &mut String,
    config: &SimulationConfig,
    totals: &CohortTotals,
) -> fmt::Result {
    heading(out, "PROPHS")?;
    writeln!(out, "{:<24}{:>12}{:>16}", "Prophylaxis", "Toxicities", "Disc Cost/Pt")?;
    for (p, def) in config.prophylaxes.iter().enumerate() {
        writeln!(
            out,
            "{:<24}{:>12}{:>16.2}",
            def.name,
            totals.prophylaxis_toxicities[p],
            totals.per_patient(totals.discounted.prophylaxis_costs[p])
        )?;
    }
    Ok(())
}

fn cost_rows(config: &SimulationConfig, ledger: &ValueLedger) -> Vec<(String, f64)> {
    let mut rows = vec![("Background".to_string(), ledger.background_costs)];
    for (e, def) in config.events.iter().enumerate() {
        rows.push((format!("{} Event", def.name), ledger.event_costs[e]));
        rows.push((format!("{} Complication", def.name), ledger.complication_costs[e]));
        rows.push((format!("{} Screening", def.name), ledger.screening_costs[e]));
    }
    for (p, def) in config.prophylaxes.iter().enumerate() {
        rows.push((def.name.clone(), ledger.prophylaxis_costs[p]));
    }
    for (i, def) in config.interventions.iter().enumerate() {
        rows.push((def.name.clone(), ledger.intervention_costs[i]));
    }
    rows.push(("Total".to_string(), ledger.total_costs()));
    rows
}

fn costs(out: &mut String, config: &SimulationConfig, totals: &CohortTotals) -> fmt::Result {
    heading(out, "COSTS")?;
    writeln!(out, "{:<36}{:>16}{:>16}", "Mean per patient", "Discounted", "Undiscounted")?;
    let discounted = cost_rows(config, &totals.discounted);
    let undiscounted = cost_rows(config, &totals.undiscounted);
    for ((label, disc), (_, undisc)) in discounted.iter().zip(&undiscounted) {
        writeln!(
            out,
            "{label:<36}{:>16.2}{:>16.2}",
            totals.per_patient(*disc),
            totals.per_patient(*undisc)
        )?;
    }
    writeln!(out)?;
    writeln!(out, "{:<36}{:>16}{:>16}", "Life months by intensity", "Discounted", "Undiscounted")?;
    for intensity in SmokingIntensity::ALL {
        writeln!(
            out,
            "{:<36}{:>16.2}{:>16.2}",
            intensity.label(),
            totals.per_patient(*totals.discounted.life_months_by_intensity.get(intensity)),
            totals.per_patient(*totals.undiscounted.life_months_by_intensity.get(intensity))
        )?;
    }
    Ok(())
}

fn month_summary(
    out: &mut String,
    config: &SimulationConfig,
    index: usize,
    month: &MonthSummary,
) -> fmt::Result {
    writeln!(out)?;
    writeln!(out, "Cohort Summary for Month {index}")?;
    writeln!(
        out,
        "  Alive: {}, Deaths: {}, Disc Costs: {:.2}",
        month.alive_total(),
        month.deaths_total(),
        month.costs_discounted
    )?;
    writeln!(
        out,
        "  Smoking starts: {}, Quits: {}, Relapses: {}",
        month.smoking_starts,
        month.total_quits(),
        month.total_relapses()
    )?;

    let names = config.event_names();
    let causes: Vec<String> = DeathCause::all(config.events.len())
        .into_iter()
        .filter_map(|cause| {
            let n = month.death_cause(cause);
            (n > 0).then(|| format!("{} {n}", cause.label(&names)))
        })
        .collect();
    if !causes.is_empty() {
        writeln!(out, "  Deaths by cause: {}", causes.join(", "))?;
    }

    for (e, name) in names.iter().enumerate() {
        let id = EventId(e as u16);
        let sum = |cells: &[u64]| cells.iter().sum::<u64>();
        writeln!(
            out,
            "  {name}: with {}, incident {}, pre-event incident {}, complications {}, \
             screens +/+ {} +/- {} -/+ {} -/- {}, confirmatory {}",
            sum(month.event_with(id)),
            sum(month.event_incidence(id)),
            sum(month.pre_event_incidence(id)),
            sum(month.complication_incidence(id)),
            month.screen_result(id, true, true),
            month.screen_result(id, true, false),
            month.screen_result(id, false, true),
            month.screen_result(id, false, false),
            month.confirmatory_tests[e]
        )?;
    }
    for (i, def) in config.interventions.iter().enumerate() {
        writeln!(
            out,
            "  {}: on {}, starts {}, stops {}",
            def.name,
            month.intervention_on[i],
            month.intervention_starts[i],
            month.intervention_stops[i]
        )?;
    }
    for (p, def) in config.prophylaxes.iter().enumerate() {
        writeln!(
            out,
            "  {}: on {}, starts {}, stops {}",
            def.name,
            month.prophylaxis_on[p],
            month.prophylaxis_starts[p],
            month.prophylaxis_stops[p]
        )?;
    }
    Ok(())
}

/// Render the complete text report
pub fn render_report(
    config: &SimulationConfig,
    result: &CohortResult,
) -> Result<String, fmt::Error> {
    let summary = result.summary();
    let totals = result.totals();
    let mut out = String::new();

    population_summary(&mut out, config, &summary)?;
    initial_distributions(&mut out, &totals, &summary)?;
    death_distributions(&mut out, config, &totals)?;
    events(&mut out, config, &totals)?;
    smoking(&mut out, &totals, &summary)?;
    interventions(&mut out, config, &totals)?;
    prophylaxes(&mut out, config, &totals)?;
    costs(&mut out, config, &totals)?;

    heading(&mut out, "MONTHLY COHORT SUMMARIES")?;
    for (index, month) in result.monthly.iter().enumerate() {
        month_summary(&mut out, config, index, month)?;
    }
    Ok(out)
}

/// Machine-readable dump written alongside the text report
#[derive(Debug, Serialize)]
pub struct JsonReport<'a> {
    pub summary: PopulationSummary,
    pub totals: CohortTotals,
    pub metrics: &'a RunMetrics,
    pub monthly: &'a [MonthSummary],
}

impl<'a> JsonReport<'a> {
    pub fn new(result: &'a CohortResult) -> Self {
        Self {
            summary: result.summary(),
            totals: result.totals(),
            metrics: &result.metrics,
            monthly: &result.monthly,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smokesim_core::config::{EventBuilder, SimulationBuilder, TreatmentBuilder};
    use smokesim_core::run_cohort;

    fn small_run() -> (SimulationConfig, CohortResult) {
        let config = SimulationBuilder::new()
            .run_size(3)
            .initial_age_years(80.0)
            .max_age(82)
            .event(EventBuilder::new("COPD").prevalence(1.0))
            .intervention(TreatmentBuilder::new("Counselling"))
            .prophylaxis(TreatmentBuilder::new("Inhaler").initial_start(1.0).monthly_cost(10.0))
            .build()
            .unwrap();
        let result = run_cohort(&config).unwrap();
        (config, result)
    }

    #[test]
    fn test_report_sections_in_order() {
        let (config, result) = small_run();
        let report = render_report(&config, &result).unwrap();

        let sections = [
            "POPULATION SUMMARY MEASURES",
            "INITIAL DISTRIBUTIONS",
            "DEATH DISTRIBUTIONS",
            "EVENTS",
            "SMOKING",
            "INTERVENTIONS",
            "PROPHS",
            "COSTS",
            "MONTHLY COHORT SUMMARIES",
        ];
        let positions: Vec<usize> = sections
            .iter()
            .map(|s| report.find(&format!("{s}\n")).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));

        assert!(report.contains("Run Size: 3"));
        assert!(report.contains("Cohort Summary for Month 0"));
        assert!(report.contains("Cohort Summary for Month 23"));
        assert!(!report.contains("Cohort Summary for Month 24"));
        assert!(report.contains("Quit duration before relapse (months): --"));
        assert!(report.contains("Age at quit (years): --"));
    }

    #[test]
    fn test_json_report_serializes() {
        let (_, result) = small_run();
        let json = serde_json::to_value(JsonReport::new(&result)).unwrap();
        assert_eq!(json["summary"]["patients"], 3);
        assert_eq!(json["monthly"].as_array().unwrap().len(), 24);
        assert_eq!(json["totals"]["events"][0]["prevalent"], 3);
    }
}
