//! Survey and evaluation questions.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of Likert points used when a question does not configure `scale`.
pub const DEFAULT_LIKERT_SCALE: u32 = 5;

/// Kind of answer control a question asks for.
///
/// Legacy spellings are accepted on input (`scale`, `single_choice`,
/// `choice`, `multiple_choice`); anything unrecognised falls back to a
/// free-text area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum QuestionType {
    Likert,
    Radio,
    Checkbox,
    Text,
    Textarea,
}

impl QuestionType {
    /// Canonical wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::Likert => "likert",
            QuestionType::Radio => "radio",
            QuestionType::Checkbox => "checkbox",
            QuestionType::Text => "text",
            QuestionType::Textarea => "textarea",
        }
    }

    /// Returns true for question types answered from a fixed option set.
    pub fn is_choice(&self) -> bool {
        matches!(self, QuestionType::Radio | QuestionType::Checkbox)
    }
}

impl From<String> for QuestionType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "likert" | "scale" => QuestionType::Likert,
            "radio" | "single_choice" | "choice" => QuestionType::Radio,
            "checkbox" | "multiple_choice" => QuestionType::Checkbox,
            "text" => QuestionType::Text,
            _ => QuestionType::Textarea,
        }
    }
}

impl From<QuestionType> for String {
    fn from(value: QuestionType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// HTML input hint for single-line text questions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum InputType {
    #[default]
    Text,
    Number,
    Email,
    Tel,
    Url,
}

impl InputType {
    pub fn as_str(&self) -> &'static str {
        match self {
            InputType::Text => "text",
            InputType::Number => "number",
            InputType::Email => "email",
            InputType::Tel => "tel",
            InputType::Url => "url",
        }
    }
}

impl From<String> for InputType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "number" => InputType::Number,
            "email" => InputType::Email,
            "tel" => InputType::Tel,
            "url" => InputType::Url,
            _ => InputType::Text,
        }
    }
}

impl From<InputType> for String {
    fn from(value: InputType) -> Self {
        value.as_str().to_string()
    }
}

/// One question inside a survey or an AI evaluation step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub question_id: String,

    #[serde(default)]
    pub question_text: String,

    pub question_type: QuestionType,

    #[serde(default)]
    pub required: bool,

    /// Likert point count.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<u32>,

    /// Options for radio/checkbox questions.
    #[serde(default, alias = "choices", skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_type: Option<InputType>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_label: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_label: Option<String>,
}

impl Question {
    /// Creates a question with no type-specific settings.
    pub fn new(
        question_id: impl Into<String>,
        question_text: impl Into<String>,
        question_type: QuestionType,
    ) -> Self {
        Self {
            question_id: question_id.into(),
            question_text: question_text.into(),
            question_type,
            required: false,
            scale: None,
            options: Vec::new(),
            input_type: None,
            placeholder: None,
            max_length: None,
            min_label: None,
            max_label: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_scale(mut self, scale: u32) -> Self {
        self.scale = Some(scale);
        self
    }

    pub fn with_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = options.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_input_type(mut self, input_type: InputType) -> Self {
        self.input_type = Some(input_type);
        self
    }

    /// Likert point count, defaulting to [`DEFAULT_LIKERT_SCALE`].
    pub fn scale_points(&self) -> u32 {
        self.scale
            .filter(|points| *points > 0)
            .unwrap_or(DEFAULT_LIKERT_SCALE)
    }

    /// Input hint for text questions.
    pub fn input_type(&self) -> InputType {
        self.input_type.unwrap_or_default()
    }

    /// A choice question with no options cannot be answered.
    pub fn is_misconfigured(&self) -> bool {
        self.question_type.is_choice() && self.options.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_question_types_are_normalised() {
        let cases = [
            ("likert", QuestionType::Likert),
            ("scale", QuestionType::Likert),
            ("single_choice", QuestionType::Radio),
            ("choice", QuestionType::Radio),
            ("multiple_choice", QuestionType::Checkbox),
            ("text", QuestionType::Text),
            ("textarea", QuestionType::Textarea),
            ("something_else", QuestionType::Textarea),
        ];
        for (raw, expected) in cases {
            assert_eq!(QuestionType::from(raw.to_string()), expected, "{raw}");
        }
    }

    #[test]
    fn question_type_serializes_canonically() {
        let q: Question = serde_json::from_str(
            r#"{"question_id":"q1","question_text":"Pick","question_type":"single_choice","options":["a"]}"#,
        )
        .unwrap();
        let json = serde_json::to_value(&q).unwrap();
        assert_eq!(json["question_type"], "radio");
    }

    #[test]
    fn choices_alias_populates_options() {
        let q: Question = serde_json::from_str(
            r#"{"question_id":"q1","question_type":"radio","choices":["yes","no"]}"#,
        )
        .unwrap();
        assert_eq!(q.options, vec!["yes", "no"]);
    }

    #[test]
    fn scale_defaults_to_five_points() {
        let q = Question::new("q1", "How much?", QuestionType::Likert);
        assert_eq!(q.scale_points(), 5);
        assert_eq!(q.clone().with_scale(7).scale_points(), 7);
        assert_eq!(q.with_scale(0).scale_points(), 5);
    }

    #[test]
    fn unknown_input_type_falls_back_to_text() {
        assert_eq!(InputType::from("date".to_string()), InputType::Text);
        assert_eq!(InputType::from("number".to_string()), InputType::Number);
    }

    #[test]
    fn choice_without_options_is_misconfigured() {
        let radio = Question::new("q1", "Pick", QuestionType::Radio);
        assert!(radio.is_misconfigured());
        assert!(!radio.with_options(["a"]).is_misconfigured());
        assert!(!Question::new("q2", "Say", QuestionType::Text).is_misconfigured());
    }
}
