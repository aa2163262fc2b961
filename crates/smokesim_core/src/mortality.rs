//! Competing-risk mortality
//!
//! Every subsystem that can kill a patient adds a `(cause, probability)`
//! contribution to the month's [`RiskSet`]. At the end of the month a single
//! draw decides whether the patient dies, and a second draw weighted by the
//! individual probabilities picks the cause.

use rand::Rng;

use crate::model::DeathCause;
use crate::sampling::{draw_weighted, fires};

#[derive(Debug, Clone, Default)]
pub struct RiskSet {
    risks: Vec<(DeathCause, f64)>,
    weights: Vec<f64>,
}

impl RiskSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.risks.clear();
    }

    pub fn add(&mut self, cause: DeathCause, probability: f64) {
        self.risks.push((cause, probability));
    }

    pub fn is_empty(&self) -> bool {
        self.risks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.risks.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(DeathCause, f64)> {
        self.risks.iter()
    }

    /// Probability that at least one risk fires: `1 - prod(1 - p)`.
    ///
    /// Folded as `a + p - a*p` so a single risk reproduces `p` exactly.
    pub fn aggregate(&self) -> f64 {
        self.risks
            .iter()
            .fold(0.0, |acc, (_, p)| acc + p - acc * p)
    }

    /// Draw for death; returns the cause if the patient dies this month.
    ///
    /// The caller is responsible for rejecting an empty set.
    pub fn draw<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<DeathCause> {
        if !fires(rng, self.aggregate()) {
            return None;
        }

        self.weights.clear();
        self.weights.extend(self.risks.iter().map(|(_, p)| *p));
        let chosen = draw_weighted(rng, &self.weights).unwrap_or(self.risks.len().saturating_sub(1));
        self.risks.get(chosen).map(|(cause, _)| *cause)
    }
}
