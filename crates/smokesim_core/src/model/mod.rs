mod death;
mod dimensions;
mod ids;
mod tables;

pub use death::DeathCause;
pub use dimensions::{
    AgeBracket, EventStage, Gender, ScreeningKind, SmokingIntensity, SmokingStatus,
};
pub use ids::{EventId, InterventionId, PatientId, ProphylaxisId};
pub use tables::{AgeCurve, ByGender, ByIntensity, ByStatus, by_bracket, by_year};
