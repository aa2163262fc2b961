//! Former-smoker transition window
//!
//! After quitting, a former smoker's risk moves linearly from the
//! current-smoker value to the ex-smoker value over a window measured in
//! months since the quit. At or below the lower bound the current-smoker
//! value applies; at or above the upper bound the ex-smoker value applies.

use serde::{Deserialize, Serialize};

use crate::model::{AgeBracket, SmokingIntensity, SmokingStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TransitionWindow {
    pub lower_months: i64,
    pub upper_months: i64,
}

impl TransitionWindow {
    pub fn new(lower_months: i64, upper_months: i64) -> Self {
        Self {
            lower_months,
            upper_months,
        }
    }

    /// Blend between the current-smoker and ex-smoker values.
    ///
    /// The upper bound is checked first so a zero-width window switches
    /// straight to the ex-smoker value.
    pub fn blend(&self, months_since_quit: i64, current: f64, ex: f64) -> f64 {
        if months_since_quit >= self.upper_months {
            ex
        } else if months_since_quit <= self.lower_months {
            current
        } else {
            let span = (self.upper_months - self.lower_months) as f64;
            let t = (months_since_quit - self.lower_months) as f64 / span;
            current + (ex - current) * t
        }
    }

    pub fn is_valid(&self) -> bool {
        self.lower_months <= self.upper_months
    }
}

/// A patient's smoking exposure as seen by the risk tables this month
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Exposure {
    Never,
    Current {
        intensity: SmokingIntensity,
    },
    Former {
        intensity: SmokingIntensity,
        months_since_quit: i64,
        quit_bracket: AgeBracket,
    },
}

impl Exposure {
    pub fn status(&self) -> SmokingStatus {
        match self {
            Exposure::Never => SmokingStatus::Never,
            Exposure::Current { .. } => SmokingStatus::Current,
            Exposure::Former { .. } => SmokingStatus::Former,
        }
    }
}
