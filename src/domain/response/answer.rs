use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A participant's answer to one question.
///
/// Likert answers are integers, radio and text answers are strings, and
/// checkbox answers are string lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Answer {
    Integer(i64),
    Text(String),
    Choices(Vec<String>),
}

impl Answer {
    pub fn text(value: impl Into<String>) -> Self {
        Answer::Text(value.into())
    }

    pub fn choices<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Answer::Choices(values.into_iter().map(Into::into).collect())
    }

    /// True when the answer carries no participant input.
    pub fn is_blank(&self) -> bool {
        match self {
            Answer::Integer(_) => false,
            Answer::Text(text) => text.trim().is_empty(),
            Answer::Choices(values) => values.is_empty(),
        }
    }
}

/// Answers collected by the renderer, keyed by `question_id`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SurveyAnswers(HashMap<String, Answer>);

impl SurveyAnswers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, question_id: impl Into<String>, answer: Answer) -> Self {
        self.insert(question_id, answer);
        self
    }

    pub fn insert(&mut self, question_id: impl Into<String>, answer: Answer) {
        self.0.insert(question_id.into(), answer);
    }

    pub fn get(&self, question_id: &str) -> Option<&Answer> {
        self.0.get(question_id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, Answer)> for SurveyAnswers {
    fn from_iter<T: IntoIterator<Item = (String, Answer)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}
