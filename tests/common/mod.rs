mod fixtures;
pub use fixtures::*;

// Re-export commonly used types from boltmark for tests
pub use boltmark::core::db::{InspectionDb, InspectionRecord, InspectionRepository, NewInspection};
pub use boltmark::{
    AlignmentPolicy, HoughParams, InspectError, InspectionResult, Inspector, Label, StrategyConfig,
};
