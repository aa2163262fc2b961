//! Simulation configuration
//!
//! `SimulationConfig` is the fully resolved, read-only parameter set consumed
//! by the patient state machine. Every table is keyed by the enumerated
//! dimensions in [`crate::model`]; nothing is looked up by name at run time.
//!
//! Defaults are quiescent: probabilities are 0, multipliers 1 and costs 0,
//! so a default configuration simulates a cohort of never smokers who die of
//! old age.
//!
//! # Builder DSL
//!
//! ```ignore
//! use smokesim_core::config::{EventBuilder, SimulationBuilder, TreatmentBuilder};
//!
//! let config = SimulationBuilder::new()
//!     .run_size(500)
//!     .discount_rate(0.03)
//!     .max_age(100)
//!     .event(EventBuilder::new("Lung Cancer").incidence(0.001).death_probability(0.2))
//!     .intervention(TreatmentBuilder::new("Counselling").monthly_start(0.01).quit_multiplier(2.0))
//!     .build()?;
//! ```

use serde::{Deserialize, Serialize};

use crate::model::{
    AgeBracket, AgeCurve, ByGender, ByIntensity, ByStatus, EventId, Gender, InterventionId,
    ProphylaxisId, SmokingIntensity, SmokingStatus, by_bracket,
};
use crate::sampling::TruncatedNormal;
use crate::transition::{Exposure, TransitionWindow};

pub mod builder;
pub mod event_builder;
pub mod treatment_builder;
mod validate;

pub use builder::SimulationBuilder;
pub use event_builder::EventBuilder;
pub use treatment_builder::TreatmentBuilder;

/// Length of a default year-of-age table (ages 0 through 100)
pub const LIFETABLE_YEARS: usize = 101;

const ZEROS: AgeCurve = [0.0; AgeBracket::COUNT];
const ONES: AgeCurve = [1.0; AgeBracket::COUNT];

fn zero_lifetable() -> Vec<f64> {
    vec![0.0; LIFETABLE_YEARS]
}

/// Complete parameter set for one cohort run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    #[serde(default)]
    pub run: RunSettings,
    #[serde(default)]
    pub init: InitialPopulation,
    #[serde(default)]
    pub natural_history: NaturalHistory,
    #[serde(default)]
    pub smoking: SmokingBehavior,
    #[serde(default)]
    pub background: BackgroundCare,
    #[serde(default)]
    pub quality_of_life: QualityOfLife,
    #[serde(default)]
    pub events: Vec<EventDefinition>,
    #[serde(default)]
    pub interventions: Vec<InterventionDefinition>,
    #[serde(default)]
    pub prophylaxes: Vec<ProphylaxisDefinition>,
}

impl SimulationConfig {
    pub fn num_events(&self) -> usize {
        self.events.len()
    }

    pub fn event(&self, id: EventId) -> &EventDefinition {
        &self.events[id.index()]
    }

    pub fn intervention(&self, id: InterventionId) -> &InterventionDefinition {
        &self.interventions[id.index()]
    }

    pub fn prophylaxis(&self, id: ProphylaxisId) -> &ProphylaxisDefinition {
        &self.prophylaxes[id.index()]
    }

    pub fn event_ids(&self) -> impl Iterator<Item = EventId> + use<> {
        (0..self.events.len()).map(|i| EventId(i as u16))
    }

    pub fn intervention_ids(&self) -> impl Iterator<Item = InterventionId> + use<> {
        (0..self.interventions.len()).map(|i| InterventionId(i as u16))
    }

    pub fn prophylaxis_ids(&self) -> impl Iterator<Item = ProphylaxisId> + use<> {
        (0..self.prophylaxes.len()).map(|i| ProphylaxisId(i as u16))
    }

    pub fn event_names(&self) -> Vec<&str> {
        self.events.iter().map(|e| e.name.as_str()).collect()
    }

    /// Monthly discount multiplier derived from the annual rate
    pub fn monthly_discount_multiplier(&self) -> f64 {
        (1.0 + self.run.discount_rate_annual).powf(1.0 / 12.0)
    }
}

// ============================================================================
// Run settings
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunSettings {
    pub run_size: u32,
    pub discount_rate_annual: f64,
    /// Seed each patient's generator with its index
    pub fixed_seed: bool,
    pub max_age_years: u32,
    pub enable_qol: bool,
    /// Patients with an id below this keep a trace
    pub trace_patients: u32,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            run_size: 1000,
            discount_rate_annual: 0.03,
            fixed_seed: true,
            max_age_years: 100,
            enable_qol: true,
            trace_patients: 50,
        }
    }
}

// ============================================================================
// Initial population
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InitialPopulation {
    /// Initial age in months
    pub age_months: TruncatedNormal,
    pub gender_weights: ByGender<f64>,
    /// Smoking status weights per gender and age bracket
    pub smoking_status: ByGender<ByStatus<AgeCurve>>,
    /// Smoking intensity weights per gender and age bracket
    pub smoking_intensity: ByGender<ByIntensity<AgeCurve>>,
    /// Months since quitting, for patients who start as former smokers
    pub months_since_quit: TruncatedNormal,
}

impl Default for InitialPopulation {
    fn default() -> Self {
        Self {
            age_months: TruncatedNormal::fixed(480.0),
            gender_weights: ByGender::uniform(0.5),
            smoking_status: ByGender::uniform(ByStatus::new(ONES, ZEROS, ZEROS)),
            smoking_intensity: ByGender::uniform(ByIntensity::new(ONES, ZEROS, ZEROS)),
            months_since_quit: TruncatedNormal::fixed(60.0),
        }
    }
}

// ============================================================================
// Natural history mortality
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NaturalHistory {
    /// Monthly mortality by completed year of age
    pub never_smoker_lifetable: ByGender<Vec<f64>>,
    pub current_smoker: CurrentSmokerMortality,
    pub former_smoker: FormerSmokerMortality,
    pub transition: TransitionWindow,
}

impl Default for NaturalHistory {
    fn default() -> Self {
        Self {
            never_smoker_lifetable: ByGender::uniform(zero_lifetable()),
            current_smoker: CurrentSmokerMortality::Multiplier {
                multipliers: ByIntensity::uniform(ByGender::uniform(ONES)),
            },
            former_smoker: FormerSmokerMortality::Multiplier {
                multipliers: ByIntensity::uniform(ByGender::uniform(ONES)),
            },
            transition: TransitionWindow::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum CurrentSmokerMortality {
    /// Never-smoker lifetable scaled by a multiplier per age bracket
    Multiplier {
        multipliers: ByIntensity<ByGender<AgeCurve>>,
    },
    /// Tabulated current-smoker lifetable by year of age
    Lifetable {
        lifetable: ByIntensity<ByGender<Vec<f64>>>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum FormerSmokerMortality {
    Multiplier {
        multipliers: ByIntensity<ByGender<AgeCurve>>,
    },
    /// Ex-smoker lifetable scaled by a multiplier for the age-at-quit bracket.
    ///
    /// The multiplier is looked up by the bracket at quitting, not the
    /// patient's current bracket.
    Lifetable {
        age_at_quit_multipliers: ByIntensity<ByGender<AgeCurve>>,
        lifetable: ByIntensity<ByGender<Vec<f64>>>,
    },
}

// ============================================================================
// Smoking behaviour
// ============================================================================

/// Relapse hazard `scale * exp(rate * months_since_quit)`
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RelapseCurve {
    pub scale: f64,
    pub rate: f64,
}

impl RelapseCurve {
    pub fn new(scale: f64, rate: f64) -> Self {
        Self { scale, rate }
    }

    /// Relapse probability this month. Zero in the month of quitting.
    pub fn probability(&self, months_since_quit: i64) -> f64 {
        if months_since_quit == 0 {
            0.0
        } else {
            self.scale * (self.rate * months_since_quit as f64).exp()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmokingBehavior {
    /// Monthly start probability for never smokers by year of age
    pub start_probability: ByGender<Vec<f64>>,
    /// Baseline monthly quit probability for current smokers by year of age
    pub quit_probability: ByGender<Vec<f64>>,
    /// Relapse curve by intensity and current age bracket
    pub relapse: ByIntensity<[RelapseCurve; AgeBracket::COUNT]>,
}

impl Default for SmokingBehavior {
    fn default() -> Self {
        Self {
            start_probability: ByGender::uniform(zero_lifetable()),
            quit_probability: ByGender::uniform(zero_lifetable()),
            relapse: ByIntensity::default(),
        }
    }
}

// ============================================================================
// Background care and quality of life
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackgroundCare {
    pub monthly_cost: ByGender<ByStatus<AgeCurve>>,
    /// Former smokers are costed as current smokers for this many months after quitting
    pub former_as_current_months: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityOfLife {
    pub base: ByIntensity<ByStatus<f64>>,
    /// Multiplier applied to former smokers within `quit_bonus_months` of quitting
    pub quit_bonus: ByIntensity<f64>,
    pub quit_bonus_months: ByIntensity<i64>,
}

impl Default for QualityOfLife {
    fn default() -> Self {
        Self {
            base: ByIntensity::uniform(ByStatus::uniform(1.0)),
            quit_bonus: ByIntensity::uniform(1.0),
            quit_bonus_months: ByIntensity::default(),
        }
    }
}

// ============================================================================
// Smoking-adjusted rates
// ============================================================================

/// A monthly rate with a smoking multiplier
///
/// Current smokers scale the baseline by their intensity's multiplier.
/// Former smokers blend from that multiplier to the ex-smoker multiplier for
/// their age-at-quit bracket across the transition window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmokingAdjustedRate {
    pub baseline: ByGender<AgeCurve>,
    pub current_multiplier: ByIntensity<f64>,
    /// Indexed by the age bracket at quitting
    pub former_multiplier: ByIntensity<AgeCurve>,
    pub transition: TransitionWindow,
}

impl Default for SmokingAdjustedRate {
    fn default() -> Self {
        Self {
            baseline: ByGender::uniform(ZEROS),
            current_multiplier: ByIntensity::uniform(1.0),
            former_multiplier: ByIntensity::uniform(ONES),
            transition: TransitionWindow::default(),
        }
    }
}

impl SmokingAdjustedRate {
    /// Same baseline for every gender and age, no smoking effect
    pub fn flat(probability: f64) -> Self {
        Self {
            baseline: ByGender::uniform([probability; AgeBracket::COUNT]),
            ..Self::default()
        }
    }

    pub fn multiplier(&self, exposure: Exposure) -> f64 {
        match exposure {
            Exposure::Never => 1.0,
            Exposure::Current { intensity } => *self.current_multiplier.get(intensity),
            Exposure::Former {
                intensity,
                months_since_quit,
                quit_bracket,
            } => self.transition.blend(
                months_since_quit,
                *self.current_multiplier.get(intensity),
                by_bracket(self.former_multiplier.get(intensity), quit_bracket),
            ),
        }
    }

    pub fn probability(&self, gender: Gender, bracket: AgeBracket, exposure: Exposure) -> f64 {
        by_bracket(self.baseline.get(gender), bracket) * self.multiplier(exposure)
    }
}

// ============================================================================
// Disease events
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventDefinition {
    pub name: String,
    /// Probability of entering the simulation with the full event
    pub prevalence: ByGender<ByStatus<ByIntensity<AgeCurve>>>,
    pub pre_event: PreEventParams,
    pub screening: ScreeningParams,
    /// Direct incidence of the full event from the `none` stage
    pub incidence: SmokingAdjustedRate,
    pub death_probability: f64,
    pub complication: SmokingAdjustedRate,
    pub complication_death_probability: f64,
    pub quit_after_event: Option<QuitBoost>,
    pub quit_after_complication: Option<QuitBoost>,
    pub costs: EventCosts,
    pub qol: EventQol,
}

impl EventDefinition {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn prevalence(
        &self,
        gender: Gender,
        status: SmokingStatus,
        intensity: SmokingIntensity,
        bracket: AgeBracket,
    ) -> f64 {
        by_bracket(
            self.prevalence.get(gender).get(status).get(intensity),
            bracket,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreEventParams {
    pub incidence: SmokingAdjustedRate,
    /// Natural-history mortality multiplier while the pre-event is present
    pub mortality_multiplier: ByGender<AgeCurve>,
    /// Monthly probability of progressing from pre-event to full event
    pub progression: ByGender<AgeCurve>,
}

impl Default for PreEventParams {
    fn default() -> Self {
        Self {
            incidence: SmokingAdjustedRate::default(),
            mortality_multiplier: ByGender::uniform(ONES),
            progression: ByGender::uniform(ZEROS),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreeningParams {
    /// Monthly probability of an opportunistic screen
    pub background_probability: ByGender<AgeCurve>,
    pub sensitivity: ByGender<f64>,
    pub specificity: ByGender<f64>,
    pub regular: RegularScreening,
    pub confirmatory: ConfirmatoryTest,
    pub outcome: DetectionOutcome,
}

impl Default for ScreeningParams {
    fn default() -> Self {
        Self {
            background_probability: ByGender::uniform(ZEROS),
            sensitivity: ByGender::uniform(1.0),
            specificity: ByGender::uniform(1.0),
            regular: RegularScreening::default(),
            confirmatory: ConfirmatoryTest::default(),
            outcome: DetectionOutcome::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegularScreening {
    /// Age at the first regular screen; `None` disables regular screening for that status
    pub start_age_years: ByStatus<Option<u32>>,
    pub interval_months: i64,
    /// Zero disables regular screening
    pub max_screens: u32,
    pub skip_probability: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfirmatoryTest {
    pub delay_months: i64,
    pub mortality: f64,
}

/// What a confirmed pre-event leads to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionOutcome {
    pub cure_probability: f64,
    /// Scales pre-event progression once detected
    pub progression_multiplier: f64,
    /// Scales the pre-event mortality multiplier once detected
    pub mortality_multiplier: f64,
    pub start_prophylaxis: Option<ProphylaxisId>,
    pub start_intervention: Option<InterventionId>,
}

impl Default for DetectionOutcome {
    fn default() -> Self {
        Self {
            cure_probability: 0.0,
            progression_multiplier: 1.0,
            mortality_multiplier: 1.0,
            start_prophylaxis: None,
            start_intervention: None,
        }
    }
}

/// Fixed quit probability for a window after an event or complication
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuitBoost {
    pub probability: f64,
    pub window_months: i64,
}

impl QuitBoost {
    pub fn applies(&self, months_since: i64) -> bool {
        months_since <= self.window_months
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventCosts {
    pub onset: f64,
    pub monthly: f64,
    pub complication: f64,
    pub screen: f64,
    pub screen_positive: f64,
    pub screen_negative: f64,
    pub confirmatory: f64,
    /// Monthly cost of a detected pre-event
    pub detected_monthly: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventQol {
    pub onset: f64,
    pub monthly: f64,
    pub complication: f64,
    pub screen: f64,
    pub awaiting_confirmation: f64,
    pub confirmatory: f64,
    pub detected: f64,
    pub undetected: f64,
}

impl Default for EventQol {
    fn default() -> Self {
        Self {
            onset: 1.0,
            monthly: 1.0,
            complication: 1.0,
            screen: 1.0,
            awaiting_confirmation: 1.0,
            confirmatory: 1.0,
            detected: 1.0,
            undetected: 1.0,
        }
    }
}

// ============================================================================
// Interventions and prophylaxes
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StartRule {
    pub monthly: ByIntensity<ByGender<f64>>,
    /// Probability of already being on treatment when the patient is created
    pub initial: ByIntensity<ByGender<f64>>,
    pub age_multiplier: ByGender<AgeCurve>,
    /// One multiplier per event, applied when that event is at the full stage.
    /// An empty table means no history effect.
    pub event_history_multiplier: ByGender<Vec<f64>>,
}

impl Default for StartRule {
    fn default() -> Self {
        Self {
            monthly: ByIntensity::default(),
            initial: ByIntensity::default(),
            age_multiplier: ByGender::uniform(ONES),
            event_history_multiplier: ByGender::default(),
        }
    }
}

impl StartRule {
    pub fn history_multiplier(&self, gender: Gender, event: EventId) -> f64 {
        self.event_history_multiplier
            .get(gender)
            .get(event.index())
            .copied()
            .unwrap_or(1.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Toxicity {
    pub probability: f64,
    pub death_probability: f64,
    pub stop_on_toxicity: bool,
    /// Allow starting again after a toxicity
    pub allow_restart: bool,
    pub qol_multiplier: f64,
}

impl Default for Toxicity {
    fn default() -> Self {
        Self {
            probability: 0.0,
            death_probability: 0.0,
            stop_on_toxicity: false,
            allow_restart: false,
            qol_multiplier: 1.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreatmentCosts {
    pub start: f64,
    pub monthly: f64,
}

/// Smoking-cessation intervention
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterventionDefinition {
    pub name: String,
    pub start: StartRule,
    pub stop_probability: ByIntensity<ByGender<f64>>,
    /// Stop once a former smoker has been abstinent this long
    pub stop_after_abstinence_months: Option<i64>,
    pub max_duration_months: Option<i64>,
    /// Stop at the moment of quitting
    pub stop_on_quit: bool,
    pub quit_multiplier: f64,
    pub relapse_multiplier: f64,
    pub toxicity: Toxicity,
    pub costs: TreatmentCosts,
}

impl Default for InterventionDefinition {
    fn default() -> Self {
        Self {
            name: String::new(),
            start: StartRule::default(),
            stop_probability: ByIntensity::default(),
            stop_after_abstinence_months: None,
            max_duration_months: None,
            stop_on_quit: false,
            quit_multiplier: 1.0,
            relapse_multiplier: 1.0,
            toxicity: Toxicity::default(),
            costs: TreatmentCosts::default(),
        }
    }
}

/// Disease prophylaxis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProphylaxisDefinition {
    pub name: String,
    pub start: StartRule,
    pub stop_probability: ByIntensity<ByGender<f64>>,
    pub status_multiplier: ByGender<ByStatus<f64>>,
    /// Full-event incidence multiplier per event; empty means no effect
    pub event_efficacy: Vec<f64>,
    /// Complication multiplier per event; empty means no effect
    pub complication_efficacy: Vec<f64>,
    pub toxicity: Toxicity,
    pub costs: TreatmentCosts,
}

impl Default for ProphylaxisDefinition {
    fn default() -> Self {
        Self {
            name: String::new(),
            start: StartRule::default(),
            stop_probability: ByIntensity::default(),
            status_multiplier: ByGender::uniform(ByStatus::uniform(1.0)),
            event_efficacy: Vec::new(),
            complication_efficacy: Vec::new(),
            toxicity: Toxicity::default(),
            costs: TreatmentCosts::default(),
        }
    }
}

impl ProphylaxisDefinition {
    pub fn event_efficacy(&self, event: EventId) -> f64 {
        self.event_efficacy.get(event.index()).copied().unwrap_or(1.0)
    }

    pub fn complication_efficacy(&self, event: EventId) -> f64 {
        self.complication_efficacy
            .get(event.index())
            .copied()
            .unwrap_or(1.0)
    }
}
