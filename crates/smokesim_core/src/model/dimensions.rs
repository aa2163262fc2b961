//! Enumerated dimensions that index parameter tables and outputs

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Female,
    Male,
}

impl Gender {
    pub const ALL: [Gender; 2] = [Gender::Female, Gender::Male];
    pub const COUNT: usize = 2;

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn label(self) -> &'static str {
        match self {
            Gender::Female => "Female",
            Gender::Male => "Male",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SmokingStatus {
    Never,
    Former,
    Current,
}

impl SmokingStatus {
    pub const ALL: [SmokingStatus; 3] = [
        SmokingStatus::Never,
        SmokingStatus::Former,
        SmokingStatus::Current,
    ];
    pub const COUNT: usize = 3;

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn label(self) -> &'static str {
        match self {
            SmokingStatus::Never => "Never",
            SmokingStatus::Former => "Former",
            SmokingStatus::Current => "Current",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SmokingIntensity {
    Light,
    Moderate,
    Heavy,
}

impl SmokingIntensity {
    pub const ALL: [SmokingIntensity; 3] = [
        SmokingIntensity::Light,
        SmokingIntensity::Moderate,
        SmokingIntensity::Heavy,
    ];
    pub const COUNT: usize = 3;

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn label(self) -> &'static str {
        match self {
            SmokingIntensity::Light => "Light",
            SmokingIntensity::Moderate => "Moderate",
            SmokingIntensity::Heavy => "Heavy",
        }
    }
}

/// Five-year age bracket: `<20`, `20-24`, ..., `80-84`, `85+`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AgeBracket(u8);

const BRACKET_LABELS: [&str; AgeBracket::COUNT] = [
    "<20", "20-24", "25-29", "30-34", "35-39", "40-44", "45-49", "50-54", "55-59", "60-64",
    "65-69", "70-74", "75-79", "80-84", "85+",
];

impl AgeBracket {
    pub const COUNT: usize = 15;

    /// Bracket for an age given in months. Negative ages fall in the first bracket.
    pub fn from_age_months(age_months: i64) -> Self {
        let years = age_months.max(0) / 12;
        let index = if years < 20 {
            0
        } else {
            ((years - 20) / 5 + 1).min(Self::COUNT as i64 - 1)
        };
        AgeBracket(index as u8)
    }

    /// Bracket at a raw index; panics on an out-of-range index.
    pub fn from_index(index: usize) -> Self {
        assert!(index < Self::COUNT, "age bracket index {index} out of range");
        AgeBracket(index as u8)
    }

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub fn label(self) -> &'static str {
        BRACKET_LABELS[self.index()]
    }

    pub fn all() -> impl Iterator<Item = AgeBracket> {
        (0..Self::COUNT).map(|i| AgeBracket(i as u8))
    }
}

/// Per-event disease stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStage {
    None,
    Pre,
    Full,
}

/// How a pre-event screening test came about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScreeningKind {
    Regular,
    Background,
}

impl ScreeningKind {
    pub fn label(self) -> &'static str {
        match self {
            ScreeningKind::Regular => "Regular",
            ScreeningKind::Background => "Background",
        }
    }
}
