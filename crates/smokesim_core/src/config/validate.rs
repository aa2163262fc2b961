//! Load-time validation of a parameter set
//!
//! The state machine draws against probabilities without clamping, so every
//! range is checked here once.

use std::collections::HashSet;

use super::{
    CurrentSmokerMortality, EventDefinition, FormerSmokerMortality, InterventionDefinition,
    ProphylaxisDefinition, SimulationConfig, SmokingAdjustedRate, StartRule, Toxicity,
    TreatmentCosts,
};
use crate::error::ConfigError;
use crate::model::{AgeBracket, AgeCurve, ByGender, ByIntensity};
use crate::sampling::TruncatedNormal;
use crate::transition::TransitionWindow;

type Result = std::result::Result<(), ConfigError>;

fn probability(field: &str, value: f64) -> Result {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::InvalidProbability {
            field: field.to_string(),
            value,
        })
    }
}

fn probabilities<'a>(field: &str, values: impl IntoIterator<Item = &'a f64>) -> Result {
    values.into_iter().try_for_each(|v| probability(field, *v))
}

fn non_negative(field: &str, value: f64) -> Result {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NegativeValue {
            field: field.to_string(),
            value,
        })
    }
}

fn non_negatives<'a>(field: &str, values: impl IntoIterator<Item = &'a f64>) -> Result {
    values.into_iter().try_for_each(|v| non_negative(field, *v))
}

fn months(field: &str, value: i64) -> Result {
    non_negative(field, value as f64)
}

fn window(field: &str, window: &TransitionWindow) -> Result {
    if window.is_valid() {
        Ok(())
    } else {
        Err(ConfigError::InvalidTransitionWindow {
            field: field.to_string(),
            lower: window.lower_months,
            upper: window.upper_months,
        })
    }
}

fn min_len(field: &str, len: usize, required: usize) -> Result {
    if len >= required {
        Ok(())
    } else {
        Err(ConfigError::TableTooShort {
            field: field.to_string(),
            len,
            required,
        })
    }
}

/// Per-event tables are either empty (no effect) or one entry per event
fn per_event_len(field: &str, len: usize, num_events: usize) -> Result {
    if len == 0 || len == num_events {
        Ok(())
    } else {
        Err(ConfigError::LengthMismatch {
            field: field.to_string(),
            len,
            expected: num_events,
        })
    }
}

fn distribution(field: &str, dist: &TruncatedNormal) -> Result {
    if dist.is_valid() {
        Ok(())
    } else {
        Err(ConfigError::InvalidDistribution {
            field: field.to_string(),
        })
    }
}

fn weights<'a>(field: &str, values: impl IntoIterator<Item = &'a f64>) -> Result {
    let mut total = 0.0;
    for v in values {
        non_negative(field, *v)?;
        total += v;
    }
    if total > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidWeights {
            field: field.to_string(),
        })
    }
}

fn curves<'a>(table: &'a ByGender<AgeCurve>) -> impl Iterator<Item = &'a f64> {
    table.iter().flat_map(|(_, c)| c.iter())
}

fn lifetables(field: &str, table: &ByGender<Vec<f64>>, required: usize) -> Result {
    for (gender, t) in table.iter() {
        let field = format!("{field}.{}", gender.label().to_lowercase());
        min_len(&field, t.len(), required)?;
        probabilities(&field, t)?;
    }
    Ok(())
}

fn by_intensity_gender<'a>(table: &'a ByIntensity<ByGender<f64>>) -> impl Iterator<Item = &'a f64> {
    table.iter().flat_map(|(_, g)| g.iter().map(|(_, v)| v))
}

fn unique_names<'a>(kind: &'static str, names: impl IntoIterator<Item = &'a str>) -> Result {
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name) {
            return Err(ConfigError::DuplicateName {
                kind,
                name: name.to_string(),
            });
        }
    }
    Ok(())
}

impl SimulationConfig {
    /// Check every parameter range the state machine relies on
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        self.validate_run()?;
        self.validate_init()?;
        self.validate_natural_history()?;
        self.validate_smoking()?;

        for (gender, by_status) in self.background.monthly_cost.iter() {
            for (_, curve) in by_status.iter() {
                non_negatives(
                    &format!("background.monthly_cost.{}", gender.label().to_lowercase()),
                    curve,
                )?;
            }
        }
        months(
            "background.former_as_current_months",
            self.background.former_as_current_months,
        )?;

        let qol = &self.quality_of_life;
        for (_, by_status) in qol.base.iter() {
            non_negatives("quality_of_life.base", by_status.iter().map(|(_, v)| v))?;
        }
        non_negatives("quality_of_life.quit_bonus", qol.quit_bonus.iter().map(|(_, v)| v))?;
        for (_, m) in qol.quit_bonus_months.iter() {
            months("quality_of_life.quit_bonus_months", *m)?;
        }

        unique_names("event", self.events.iter().map(|e| e.name.as_str()))?;
        unique_names(
            "intervention",
            self.interventions.iter().map(|i| i.name.as_str()),
        )?;
        unique_names(
            "prophylaxis",
            self.prophylaxes.iter().map(|p| p.name.as_str()),
        )?;

        for (i, event) in self.events.iter().enumerate() {
            self.validate_event(&format!("events[{i}]"), event)?;
        }
        for (i, intervention) in self.interventions.iter().enumerate() {
            self.validate_intervention(&format!("interventions[{i}]"), intervention)?;
        }
        for (i, prophylaxis) in self.prophylaxes.iter().enumerate() {
            self.validate_prophylaxis(&format!("prophylaxes[{i}]"), prophylaxis)?;
        }
        Ok(())
    }

    fn required_years(&self) -> usize {
        self.run.max_age_years as usize
    }

    fn validate_run(&self) -> Result {
        if self.run.run_size == 0 {
            return Err(ConfigError::NonPositive {
                field: "run.run_size".into(),
            });
        }
        if self.run.max_age_years == 0 {
            return Err(ConfigError::NonPositive {
                field: "run.max_age_years".into(),
            });
        }
        non_negative("run.discount_rate_annual", self.run.discount_rate_annual)
    }

    fn validate_init(&self) -> Result {
        let init = &self.init;
        distribution("init.age_months", &init.age_months)?;
        distribution("init.months_since_quit", &init.months_since_quit)?;
        weights(
            "init.gender_weights",
            init.gender_weights.iter().map(|(_, w)| w),
        )?;

        for (gender, by_status) in init.smoking_status.iter() {
            for bracket in AgeBracket::all() {
                weights(
                    &format!(
                        "init.smoking_status.{}[{}]",
                        gender.label().to_lowercase(),
                        bracket.label()
                    ),
                    by_status.iter().map(|(_, c)| &c[bracket.index()]),
                )?;
            }
        }
        for (gender, by_intensity) in init.smoking_intensity.iter() {
            for bracket in AgeBracket::all() {
                weights(
                    &format!(
                        "init.smoking_intensity.{}[{}]",
                        gender.label().to_lowercase(),
                        bracket.label()
                    ),
                    by_intensity.iter().map(|(_, c)| &c[bracket.index()]),
                )?;
            }
        }
        Ok(())
    }

    fn validate_natural_history(&self) -> Result {
        let nh = &self.natural_history;
        let years = self.required_years();
        lifetables(
            "natural_history.never_smoker_lifetable",
            &nh.never_smoker_lifetable,
            years,
        )?;
        window("natural_history.transition", &nh.transition)?;

        match &nh.current_smoker {
            CurrentSmokerMortality::Multiplier { multipliers } => {
                for (_, by_gender) in multipliers.iter() {
                    non_negatives("natural_history.current_smoker.multipliers", curves(by_gender))?;
                }
            }
            CurrentSmokerMortality::Lifetable { lifetable } => {
                for (intensity, by_gender) in lifetable.iter() {
                    lifetables(
                        &format!(
                            "natural_history.current_smoker.lifetable.{}",
                            intensity.label().to_lowercase()
                        ),
                        by_gender,
                        years,
                    )?;
                }
            }
        }

        match &nh.former_smoker {
            FormerSmokerMortality::Multiplier { multipliers } => {
                for (_, by_gender) in multipliers.iter() {
                    non_negatives("natural_history.former_smoker.multipliers", curves(by_gender))?;
                }
            }
            FormerSmokerMortality::Lifetable {
                age_at_quit_multipliers,
                lifetable,
            } => {
                for (_, by_gender) in age_at_quit_multipliers.iter() {
                    non_negatives(
                        "natural_history.former_smoker.age_at_quit_multipliers",
                        curves(by_gender),
                    )?;
                }
                for (intensity, by_gender) in lifetable.iter() {
                    lifetables(
                        &format!(
                            "natural_history.former_smoker.lifetable.{}",
                            intensity.label().to_lowercase()
                        ),
                        by_gender,
                        years,
                    )?;
                }
            }
        }
        Ok(())
    }

    fn validate_smoking(&self) -> Result {
        let smoking = &self.smoking;
        let years = self.required_years();
        lifetables("smoking.start_probability", &smoking.start_probability, years)?;
        lifetables("smoking.quit_probability", &smoking.quit_probability, years)?;
        for (_, by_bracket) in smoking.relapse.iter() {
            for curve in by_bracket {
                probability("smoking.relapse.scale", curve.scale)?;
                if !curve.rate.is_finite() {
                    return Err(ConfigError::InvalidDistribution {
                        field: "smoking.relapse.rate".into(),
                    });
                }
            }
        }
        Ok(())
    }

    fn validate_rate(&self, field: &str, rate: &SmokingAdjustedRate) -> Result {
        probabilities(&format!("{field}.baseline"), curves(&rate.baseline))?;
        non_negatives(
            &format!("{field}.current_multiplier"),
            rate.current_multiplier.iter().map(|(_, v)| v),
        )?;
        for (_, curve) in rate.former_multiplier.iter() {
            non_negatives(&format!("{field}.former_multiplier"), curve)?;
        }
        window(&format!("{field}.transition"), &rate.transition)
    }

    fn validate_event(&self, field: &str, event: &EventDefinition) -> Result {
        for (_, by_status) in event.prevalence.iter() {
            for (_, by_intensity) in by_status.iter() {
                for (_, curve) in by_intensity.iter() {
                    probabilities(&format!("{field}.prevalence"), curve)?;
                }
            }
        }

        let pre = &event.pre_event;
        self.validate_rate(&format!("{field}.pre_event.incidence"), &pre.incidence)?;
        non_negatives(
            &format!("{field}.pre_event.mortality_multiplier"),
            curves(&pre.mortality_multiplier),
        )?;
        probabilities(
            &format!("{field}.pre_event.progression"),
            curves(&pre.progression),
        )?;

        let screening = &event.screening;
        probabilities(
            &format!("{field}.screening.background_probability"),
            curves(&screening.background_probability),
        )?;
        probabilities(
            &format!("{field}.screening.sensitivity"),
            screening.sensitivity.iter().map(|(_, v)| v),
        )?;
        probabilities(
            &format!("{field}.screening.specificity"),
            screening.specificity.iter().map(|(_, v)| v),
        )?;
        months(
            &format!("{field}.screening.regular.interval_months"),
            screening.regular.interval_months,
        )?;
        probability(
            &format!("{field}.screening.regular.skip_probability"),
            screening.regular.skip_probability,
        )?;
        months(
            &format!("{field}.screening.confirmatory.delay_months"),
            screening.confirmatory.delay_months,
        )?;
        probability(
            &format!("{field}.screening.confirmatory.mortality"),
            screening.confirmatory.mortality,
        )?;

        let outcome = &screening.outcome;
        probability(
            &format!("{field}.screening.outcome.cure_probability"),
            outcome.cure_probability,
        )?;
        non_negative(
            &format!("{field}.screening.outcome.progression_multiplier"),
            outcome.progression_multiplier,
        )?;
        non_negative(
            &format!("{field}.screening.outcome.mortality_multiplier"),
            outcome.mortality_multiplier,
        )?;
        if let Some(id) = outcome.start_prophylaxis
            && id.index() >= self.prophylaxes.len()
        {
            return Err(ConfigError::UnknownTreatment {
                field: format!("{field}.screening.outcome.start_prophylaxis"),
                kind: "prophylaxis",
                index: id.index(),
            });
        }
        if let Some(id) = outcome.start_intervention
            && id.index() >= self.interventions.len()
        {
            return Err(ConfigError::UnknownTreatment {
                field: format!("{field}.screening.outcome.start_intervention"),
                kind: "intervention",
                index: id.index(),
            });
        }

        self.validate_rate(&format!("{field}.incidence"), &event.incidence)?;
        probability(
            &format!("{field}.death_probability"),
            event.death_probability,
        )?;
        self.validate_rate(&format!("{field}.complication"), &event.complication)?;
        probability(
            &format!("{field}.complication_death_probability"),
            event.complication_death_probability,
        )?;

        for (name, boost) in [
            ("quit_after_event", &event.quit_after_event),
            ("quit_after_complication", &event.quit_after_complication),
        ] {
            if let Some(boost) = boost {
                probability(&format!("{field}.{name}.probability"), boost.probability)?;
                months(&format!("{field}.{name}.window_months"), boost.window_months)?;
            }
        }

        let c = &event.costs;
        non_negatives(
            &format!("{field}.costs"),
            [
                &c.onset,
                &c.monthly,
                &c.complication,
                &c.screen,
                &c.screen_positive,
                &c.screen_negative,
                &c.confirmatory,
                &c.detected_monthly,
            ],
        )?;
        let q = &event.qol;
        non_negatives(
            &format!("{field}.qol"),
            [
                &q.onset,
                &q.monthly,
                &q.complication,
                &q.screen,
                &q.awaiting_confirmation,
                &q.confirmatory,
                &q.detected,
                &q.undetected,
            ],
        )
    }

    fn validate_treatment(
        &self,
        field: &str,
        start: &StartRule,
        stop_probability: &ByIntensity<ByGender<f64>>,
        toxicity: &Toxicity,
        costs: &TreatmentCosts,
    ) -> Result {
        probabilities(
            &format!("{field}.start.monthly"),
            by_intensity_gender(&start.monthly),
        )?;
        probabilities(
            &format!("{field}.start.initial"),
            by_intensity_gender(&start.initial),
        )?;
        non_negatives(
            &format!("{field}.start.age_multiplier"),
            curves(&start.age_multiplier),
        )?;
        for (gender, mults) in start.event_history_multiplier.iter() {
            let f = format!(
                "{field}.start.event_history_multiplier.{}",
                gender.label().to_lowercase()
            );
            per_event_len(&f, mults.len(), self.events.len())?;
            non_negatives(&f, mults)?;
        }
        probabilities(
            &format!("{field}.stop_probability"),
            by_intensity_gender(stop_probability),
        )?;
        probability(
            &format!("{field}.toxicity.probability"),
            toxicity.probability,
        )?;
        probability(
            &format!("{field}.toxicity.death_probability"),
            toxicity.death_probability,
        )?;
        non_negative(
            &format!("{field}.toxicity.qol_multiplier"),
            toxicity.qol_multiplier,
        )?;
        non_negatives(&format!("{field}.costs"), [&costs.start, &costs.monthly])
    }

    fn validate_intervention(&self, field: &str, intervention: &InterventionDefinition) -> Result {
        self.validate_treatment(
            field,
            &intervention.start,
            &intervention.stop_probability,
            &intervention.toxicity,
            &intervention.costs,
        )?;
        if let Some(m) = intervention.stop_after_abstinence_months {
            months(&format!("{field}.stop_after_abstinence_months"), m)?;
        }
        if let Some(m) = intervention.max_duration_months {
            months(&format!("{field}.max_duration_months"), m)?;
        }
        non_negative(
            &format!("{field}.quit_multiplier"),
            intervention.quit_multiplier,
        )?;
        non_negative(
            &format!("{field}.relapse_multiplier"),
            intervention.relapse_multiplier,
        )
    }

    fn validate_prophylaxis(&self, field: &str, prophylaxis: &ProphylaxisDefinition) -> Result {
        self.validate_treatment(
            field,
            &prophylaxis.start,
            &prophylaxis.stop_probability,
            &prophylaxis.toxicity,
            &prophylaxis.costs,
        )?;
        for (_, by_status) in prophylaxis.status_multiplier.iter() {
            non_negatives(
                &format!("{field}.status_multiplier"),
                by_status.iter().map(|(_, v)| v),
            )?;
        }
        for (name, table) in [
            ("event_efficacy", &prophylaxis.event_efficacy),
            ("complication_efficacy", &prophylaxis.complication_efficacy),
        ] {
            let f = format!("{field}.{name}");
            per_event_len(&f, table.len(), self.events.len())?;
            non_negatives(&f, table)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EventDefinition, QuitBoost};
    use crate::model::{InterventionId, ProphylaxisId};

    fn with_event(event: EventDefinition) -> SimulationConfig {
        SimulationConfig {
            events: vec![event],
            ..SimulationConfig::default()
        }
    }

    #[test]
    fn test_rejects_out_of_range_probability() {
        let config = with_event(EventDefinition {
            death_probability: 1.2,
            ..EventDefinition::named("Stroke")
        });
        let err = config.validate().unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidProbability {
                field: "events[0].death_probability".into(),
                value: 1.2
            }
        );
    }

    #[test]
    fn test_rejects_inverted_window() {
        let mut event = EventDefinition::named("COPD");
        event.incidence.transition = TransitionWindow::new(48, 12);
        let err = with_event(event).validate().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidTransitionWindow { .. }));
    }

    #[test]
    fn test_rejects_short_lifetable() {
        let mut config = SimulationConfig::default();
        config.natural_history.never_smoker_lifetable.male = vec![0.01; 40];
        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::TableTooShort {
                len: 40,
                required: 100,
                ..
            }
        ));
    }

    #[test]
    fn test_rejects_unknown_treatment_reference() {
        let mut event = EventDefinition::named("Lung Cancer");
        event.screening.outcome.start_prophylaxis = Some(ProphylaxisId(0));
        assert!(matches!(
            with_event(event.clone()).validate(),
            Err(ConfigError::UnknownTreatment {
                kind: "prophylaxis",
                ..
            })
        ));

        event.screening.outcome.start_prophylaxis = None;
        event.screening.outcome.start_intervention = Some(InterventionId(2));
        assert!(matches!(
            with_event(event).validate(),
            Err(ConfigError::UnknownTreatment {
                kind: "intervention",
                index: 2,
                ..
            })
        ));
    }

    #[test]
    fn test_rejects_mismatched_efficacy_table() {
        let mut config = with_event(EventDefinition::named("CHD"));
        config.prophylaxes.push(ProphylaxisDefinition {
            name: "Statin".into(),
            event_efficacy: vec![0.7, 0.8],
            ..ProphylaxisDefinition::default()
        });
        assert!(matches!(
            config.validate(),
            Err(ConfigError::LengthMismatch {
                len: 2,
                expected: 1,
                ..
            })
        ));
    }

    #[test]
    fn test_rejects_zero_weights_and_bad_distribution() {
        let mut config = SimulationConfig::default();
        config.init.gender_weights = ByGender::uniform(0.0);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidWeights { .. })
        ));

        let mut config = SimulationConfig::default();
        config.init.age_months = TruncatedNormal::new(400.0, -1.0, None, None);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidDistribution { .. })
        ));
    }

    #[test]
    fn test_rejects_duplicates_and_bad_boost() {
        let mut config = with_event(EventDefinition::named("A"));
        config.events.push(EventDefinition::named("A"));
        assert!(matches!(
            config.validate(),
            Err(ConfigError::DuplicateName { kind: "event", .. })
        ));

        let config = with_event(EventDefinition {
            quit_after_event: Some(QuitBoost {
                probability: 0.5,
                window_months: -1,
            }),
            ..EventDefinition::named("A")
        });
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NegativeValue { .. })
        ));
    }

    #[test]
    fn test_rejects_zero_run_size() {
        let mut config = SimulationConfig::default();
        config.run.run_size = 0;
        assert_eq!(
            config.validate(),
            Err(ConfigError::NonPositive {
                field: "run.run_size".into()
            })
        );
    }
}
