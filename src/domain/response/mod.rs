//! Participant answers and the payloads submitted with an advance.

mod answer;
mod payload;

pub use answer::{Answer, SurveyAnswers};
pub use payload::{EvaluationScore, QuestionResponse, ResponsePayload};
