pub mod phase;
pub mod stimulus;
pub mod trial;

pub use phase::ExperimentState;
pub use stimulus::{Appearance, GridPosition, PlacedShape, StimulusLayout};
pub use trial::{
    DifferenceType, LOG_HEADER, ObjectCount, ParseObjectCountError, SetKey, TrialOutcome,
    TrialParameters, TrialRow,
};
