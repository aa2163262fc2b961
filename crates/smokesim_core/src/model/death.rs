use serde::{Deserialize, Serialize};

use super::ids::EventId;

/// Cause of death recorded for a patient
///
/// Causes are laid out in a fixed order for output indexing: the five
/// model-wide causes first, then one cause per event, then one complication
/// cause per event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeathCause {
    NaturalHistory,
    OldAge,
    ProphylaxisToxicity,
    InterventionToxicity,
    ConfirmatoryTest,
    Event(EventId),
    Complication(EventId),
}

const FIXED_CAUSES: usize = 5;

impl DeathCause {
    /// Number of distinct causes for a model with `num_events` events
    pub fn count(num_events: usize) -> usize {
        FIXED_CAUSES + 2 * num_events
    }

    pub fn index(self, num_events: usize) -> usize {
        match self {
            DeathCause::NaturalHistory => 0,
            DeathCause::OldAge => 1,
            DeathCause::ProphylaxisToxicity => 2,
            DeathCause::InterventionToxicity => 3,
            DeathCause::ConfirmatoryTest => 4,
            DeathCause::Event(e) => FIXED_CAUSES + e.index(),
            DeathCause::Complication(e) => FIXED_CAUSES + num_events + e.index(),
        }
    }

    /// All causes in output order
    pub fn all(num_events: usize) -> Vec<DeathCause> {
        let mut causes = vec![
            DeathCause::NaturalHistory,
            DeathCause::OldAge,
            DeathCause::ProphylaxisToxicity,
            DeathCause::InterventionToxicity,
            DeathCause::ConfirmatoryTest,
        ];
        causes.extend((0..num_events).map(|e| DeathCause::Event(EventId(e as u16))));
        causes.extend((0..num_events).map(|e| DeathCause::Complication(EventId(e as u16))));
        causes
    }

    /// Human-readable label, using the configured event names
    pub fn label<S: AsRef<str>>(self, event_names: &[S]) -> String {
        let name = |e: EventId| {
            event_names
                .get(e.index())
                .map_or_else(|| format!("Event {}", e.0), |n| n.as_ref().to_string())
        };
        match self {
            DeathCause::NaturalHistory => "Nat Hist".to_string(),
            DeathCause::OldAge => "Old Age".to_string(),
            DeathCause::ProphylaxisToxicity => "Proph Tox".to_string(),
            DeathCause::InterventionToxicity => "Intervention Tox".to_string(),
            DeathCause::ConfirmatoryTest => "Confirmatory Test".to_string(),
            DeathCause::Event(e) => name(e),
            DeathCause::Complication(e) => format!("{} Complication", name(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cause_indices_are_dense() {
        let n = 3;
        let all = DeathCause::all(n);
        assert_eq!(all.len(), DeathCause::count(n));
        for (i, cause) in all.iter().enumerate() {
            assert_eq!(cause.index(n), i);
        }
    }

    #[test]
    fn test_cause_labels() {
        let names = ["Lung Cancer", "COPD"];
        assert_eq!(DeathCause::OldAge.label(&names), "Old Age");
        assert_eq!(DeathCause::Event(EventId(1)).label(&names), "COPD");
        assert_eq!(
            DeathCause::Complication(EventId(0)).label(&names),
            "Lung Cancer Complication"
        );
    }
}
