//! Random draws used by the patient state machine
//!
//! Every stochastic decision in the model is a single uniform draw compared
//! against a probability. Weighted draws select among unnormalised weights.

use rand::{Rng, distr::Distribution};
use serde::{Deserialize, Serialize};

const MAX_REJECTION_ATTEMPTS: usize = 1_000;

/// Draw once against `probability`. Probability 0 never fires and 1 always fires.
#[inline]
pub fn fires<R: Rng + ?Sized>(rng: &mut R, probability: f64) -> bool {
    rng.random::<f64>() < probability
}

/// Pick an index with probability proportional to its weight.
///
/// Returns `None` when no weight is positive.
pub fn draw_weighted<R: Rng + ?Sized>(rng: &mut R, weights: &[f64]) -> Option<usize> {
    let total: f64 = weights.iter().filter(|w| **w > 0.0).sum();
    if total <= 0.0 {
        return None;
    }

    let target = rng.random::<f64>() * total;
    let mut cumulative = 0.0;
    for (i, w) in weights.iter().enumerate() {
        if *w <= 0.0 {
            continue;
        }
        cumulative += w;
        if target < cumulative {
            return Some(i);
        }
    }

    // Rounding can leave `target` a hair above the final cumulative sum
    weights.iter().rposition(|w| *w > 0.0)
}

/// Normal distribution truncated to an optional `[min, max]` range
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TruncatedNormal {
    pub mean: f64,
    pub std_dev: f64,
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
}

impl TruncatedNormal {
    pub fn fixed(value: f64) -> Self {
        Self {
            mean: value,
            std_dev: 0.0,
            min: None,
            max: None,
        }
    }

    pub fn new(mean: f64, std_dev: f64, min: Option<f64>, max: Option<f64>) -> Self {
        Self {
            mean,
            std_dev,
            min,
            max,
        }
    }

    /// Narrow the range further, keeping the tighter of each bound
    #[must_use]
    pub fn bounded(&self, min: f64, max: f64) -> Self {
        Self {
            min: Some(self.min.map_or(min, |m| m.max(min))),
            max: Some(self.max.map_or(max, |m| m.min(max))),
            ..*self
        }
    }

    fn clamp(&self, value: f64) -> f64 {
        let lo = self.min.unwrap_or(f64::NEG_INFINITY);
        let hi = self.max.unwrap_or(f64::INFINITY);
        value.max(lo).min(hi)
    }

    fn contains(&self, value: f64) -> bool {
        self.min.is_none_or(|lo| value >= lo) && self.max.is_none_or(|hi| value <= hi)
    }

    pub fn is_valid(&self) -> bool {
        self.mean.is_finite()
            && self.std_dev.is_finite()
            && self.std_dev >= 0.0
            && match (self.min, self.max) {
                (Some(lo), Some(hi)) => lo <= hi,
                _ => true,
            }
    }

    /// Sample by rejection, falling back to clamping the mean-centred draw
    /// when the accepted region is too far in the tail.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        if self.std_dev == 0.0 {
            return self.clamp(self.mean);
        }
        let Ok(normal) = rand_distr::Normal::new(self.mean, self.std_dev) else {
            return self.clamp(self.mean);
        };

        let mut last = self.mean;
        for _ in 0..MAX_REJECTION_ATTEMPTS {
            last = normal.sample(rng);
            if self.contains(last) {
                return last;
            }
        }
        self.clamp(last)
    }
}
