//! Required-answer gate, answer type checks and response collection.

use thiserror::Error;

use crate::domain::flow::{InputType, Question, QuestionType};
use crate::domain::response::{Answer, QuestionResponse, SurveyAnswers};

/// First problem found in a survey submission.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SurveyValidationError {
    #[error("Please answer the required question: {question_text}")]
    MissingRequired {
        question_id: String,
        question_text: String,
    },

    #[error("{question_text}: please enter a number of 0 or more")]
    InvalidNumber {
        question_id: String,
        question_text: String,
    },

    #[error("{question_text}: choose a value between {min} and {max}")]
    OutOfRange {
        question_id: String,
        question_text: String,
        min: i64,
        max: i64,
    },

    #[error("{question_text}: `{value}` is not one of the options")]
    UnknownOption {
        question_id: String,
        question_text: String,
        value: String,
    },

    #[error("{question_text}: expected a {expected} answer")]
    TypeMismatch {
        question_id: String,
        question_text: String,
        expected: QuestionType,
    },
}

impl SurveyValidationError {
    /// Id of the offending question, for inline display.
    pub fn question_id(&self) -> &str {
        match self {
            SurveyValidationError::MissingRequired { question_id, .. }
            | SurveyValidationError::InvalidNumber { question_id, .. }
            | SurveyValidationError::OutOfRange { question_id, .. }
            | SurveyValidationError::UnknownOption { question_id, .. }
            | SurveyValidationError::TypeMismatch { question_id, .. } => question_id,
        }
    }
}

/// Validates `answers` against questions in presented order and collects
/// the submission.
///
/// Fail-fast: the required pass runs over every question first, then the
/// per-type checks. Choice questions without options cannot be answered,
/// so they never block and are submitted with a null answer.
pub fn collect_responses(
    presented: &[&Question],
    answers: &SurveyAnswers,
) -> Result<Vec<QuestionResponse>, SurveyValidationError> {
    for question in presented {
        if question.required
            && !question.is_misconfigured()
            && answers.get(&question.question_id).map_or(true, Answer::is_blank)
        {
            return Err(SurveyValidationError::MissingRequired {
                question_id: question.question_id.clone(),
                question_text: question.question_text.clone(),
            });
        }
    }

    let mut responses = Vec::with_capacity(presented.len());
    for question in presented {
        let answer = if question.is_misconfigured() {
            None
        } else {
            check_answer(question, answers.get(&question.question_id))?
        };
        responses.push(QuestionResponse::new(
            question.question_id.clone(),
            question.question_text.clone(),
            question.question_type,
            answer,
        ));
    }
    Ok(responses)
}

fn check_answer(
    question: &Question,
    answer: Option<&Answer>,
) -> Result<Option<Answer>, SurveyValidationError> {
    let mismatch = || SurveyValidationError::TypeMismatch {
        question_id: question.question_id.clone(),
        question_text: question.question_text.clone(),
        expected: question.question_type,
    };

    match (question.question_type, answer) {
        (QuestionType::Likert, None) => Ok(None),
        (QuestionType::Likert, Some(Answer::Integer(value))) => {
            let max = i64::from(question.scale_points());
            if (1..=max).contains(value) {
                Ok(Some(Answer::Integer(*value)))
            } else {
                Err(SurveyValidationError::OutOfRange {
                    question_id: question.question_id.clone(),
                    question_text: question.question_text.clone(),
                    min: 1,
                    max,
                })
            }
        }

        (QuestionType::Radio, None) => Ok(None),
        (QuestionType::Radio, Some(Answer::Text(value))) if value.is_empty() => Ok(None),
        (QuestionType::Radio, Some(Answer::Text(value))) => {
            ensure_option(question, value)?;
            Ok(Some(Answer::Text(value.clone())))
        }

        (QuestionType::Checkbox, None) => Ok(Some(Answer::Choices(Vec::new()))),
        (QuestionType::Checkbox, Some(Answer::Choices(values))) => {
            for value in values {
                ensure_option(question, value)?;
            }
            Ok(Some(Answer::Choices(values.clone())))
        }

        (QuestionType::Text | QuestionType::Textarea, None) => {
            Ok(Some(Answer::Text(String::new())))
        }
        (QuestionType::Text, Some(Answer::Text(value))) => {
            if question.input_type() == InputType::Number && !value.trim().is_empty() {
                ensure_non_negative_number(question, value)?;
            }
            Ok(Some(Answer::Text(value.clone())))
        }
        (QuestionType::Textarea, Some(Answer::Text(value))) => Ok(Some(Answer::Text(value.clone()))),

        _ => Err(mismatch()),
    }
}

fn ensure_option(question: &Question, value: &str) -> Result<(), SurveyValidationError> {
    if question.options.iter().any(|option| option == value) {
        Ok(())
    } else {
        Err(SurveyValidationError::UnknownOption {
            question_id: question.question_id.clone(),
            question_text: question.question_text.clone(),
            value: value.to_string(),
        })
    }
}

fn ensure_non_negative_number(question: &Question, value: &str) -> Result<(), SurveyValidationError> {
    match value.trim().parse::<f64>() {
        Ok(number) if number.is_finite() && number >= 0.0 => Ok(()),
        _ => Err(SurveyValidationError::InvalidNumber {
            question_id: question.question_id.clone(),
            question_text: question.question_text.clone(),
        }),
    }
}
