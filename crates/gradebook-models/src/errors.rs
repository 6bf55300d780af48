//! Domain validation errors.
//!
//! Entities in this crate can only be built through constructors returning
//! `Result<_, ValidationError>`, so an out-of-range score or a config whose
//! weights do not add up never exists as a value.

use thiserror::Error;

use crate::component::Component;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("{component} note must be between 0 and 20")]
    ScoreOutOfRange { component: Component, value: f64 },

    #[error("Final note must be between 0 and 20")]
    FinalGradeOutOfRange { value: f64 },

    #[error("{component} percentage must be between 0 and 100")]
    PercentageOutOfRange { component: Component, value: f64 },

    #[error("Percentages must sum to 100, got {total}")]
    WeightSum { total: f64 },

    #[error("Valid {entity} ID is required")]
    InvalidId { entity: &'static str },

    #[error("At least one note update is required")]
    EmptyUpdate,
}
