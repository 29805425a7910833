//! Survey presentation order and submission validation.

mod plan;
mod validation;

pub use plan::SurveyPlan;
pub use validation::{collect_responses, SurveyValidationError};
