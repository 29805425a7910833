//! The step tagged union and the per-type step bodies.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::branch::BranchStep;
use super::chat::ChatStep;
use super::question::Question;
use super::randomizer::RandomizerStep;

pub(crate) fn default_required() -> bool {
    true
}

/// Discriminant of a [`Step`], used in descriptors and log fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    Consent,
    Instruction,
    Survey,
    SurveyRandomizer,
    Chat,
    AiEvaluation,
    Branch,
    Debriefing,
}

impl StepKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepKind::Consent => "consent",
            StepKind::Instruction => "instruction",
            StepKind::Survey => "survey",
            StepKind::SurveyRandomizer => "survey_randomizer",
            StepKind::Chat => "chat",
            StepKind::AiEvaluation => "ai_evaluation",
            StepKind::Branch => "branch",
            StepKind::Debriefing => "debriefing",
        }
    }
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One unit of a flow, tagged by `step_type` on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "step_type", rename_all = "snake_case")]
pub enum Step {
    Consent(ContentStep),
    Instruction(InstructionStep),
    Survey(SurveyStep),
    SurveyRandomizer(RandomizerStep),
    Chat(ChatStep),
    AiEvaluation(AiEvaluationStep),
    Branch(BranchStep),
    Debriefing(ContentStep),
}

impl Step {
    pub fn kind(&self) -> StepKind {
        match self {
            Step::Consent(_) => StepKind::Consent,
            Step::Instruction(_) => StepKind::Instruction,
            Step::Survey(_) => StepKind::Survey,
            Step::SurveyRandomizer(_) => StepKind::SurveyRandomizer,
            Step::Chat(_) => StepKind::Chat,
            Step::AiEvaluation(_) => StepKind::AiEvaluation,
            Step::Branch(_) => StepKind::Branch,
            Step::Debriefing(_) => StepKind::Debriefing,
        }
    }

    pub fn step_id(&self) -> &str {
        match self {
            Step::Consent(s) | Step::Debriefing(s) => &s.step_id,
            Step::Instruction(s) => &s.step_id,
            Step::Survey(s) => &s.step_id,
            Step::SurveyRandomizer(s) => &s.step_id,
            Step::Chat(s) => &s.step_id,
            Step::AiEvaluation(s) => &s.step_id,
            Step::Branch(s) => &s.step_id,
        }
    }

    fn configured_title(&self) -> Option<&str> {
        let title = match self {
            Step::Consent(s) | Step::Debriefing(s) => s.title.as_deref(),
            Step::Instruction(s) => s.title.as_deref(),
            Step::Survey(s) => s.title.as_deref(),
            Step::SurveyRandomizer(s) => s.title.as_deref(),
            Step::Chat(s) => s.title.as_deref(),
            Step::AiEvaluation(s) => s.title.as_deref(),
            Step::Branch(s) => s.title.as_deref(),
        };
        title.filter(|t| !t.trim().is_empty())
    }

    /// Title shown to the participant, falling back to a per-type default.
    pub fn display_title(&self) -> &str {
        self.configured_title().unwrap_or(match self {
            Step::Consent(_) => "Research Consent",
            Step::Instruction(_) => "Instructions",
            Step::Survey(_) => "Survey",
            Step::SurveyRandomizer(_) => "Survey",
            Step::Chat(_) => "Chat Session",
            Step::AiEvaluation(_) => "AI Evaluation",
            Step::Branch(_) => "Branch",
            Step::Debriefing(_) => "Thank you for participating",
        })
    }

    /// Effective required flag. Debriefing steps are always required.
    pub fn required(&self) -> bool {
        match self {
            Step::Debriefing(_) => true,
            Step::Consent(s) => s.required,
            Step::Instruction(s) => s.required,
            Step::Survey(s) => s.required,
            Step::SurveyRandomizer(s) => s.required,
            Step::Chat(s) => s.required,
            Step::AiEvaluation(s) => s.required,
            Step::Branch(s) => s.required,
        }
    }

    pub fn is_chat(&self) -> bool {
        matches!(self, Step::Chat(_))
    }
}

fn text_or<'a>(value: &'a Option<String>, fallback: &'a str) -> &'a str {
    value
        .as_deref()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or(fallback)
}

/// Body shared by consent and debriefing steps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentStep {
    #[serde(default)]
    pub step_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default = "default_required")]
    pub required: bool,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub button_text: Option<String>,
}

impl ContentStep {
    pub fn new(step_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            step_id: step_id.into(),
            title: None,
            required: true,
            content: content.into(),
            button_text: None,
        }
    }

    pub fn button_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        text_or(&self.button_text, fallback)
    }
}

/// Instruction step with an optional dwell-time gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstructionStep {
    #[serde(default)]
    pub step_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default = "default_required")]
    pub required: bool,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub button_text: Option<String>,
    /// Seconds the advance control stays hidden after the step is shown.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_display_seconds: Option<u32>,
    #[serde(default)]
    pub show_timer: bool,
}

impl InstructionStep {
    pub fn new(step_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            step_id: step_id.into(),
            title: None,
            required: true,
            content: content.into(),
            button_text: None,
            min_display_seconds: None,
            show_timer: false,
        }
    }

    pub fn with_dwell(mut self, seconds: u32, show_timer: bool) -> Self {
        self.min_display_seconds = Some(seconds);
        self.show_timer = show_timer;
        self
    }

    /// Dwell seconds, `None` when no gate applies.
    pub fn dwell_seconds(&self) -> Option<u32> {
        self.min_display_seconds.filter(|s| *s > 0)
    }

    pub fn button_label(&self) -> &str {
        text_or(&self.button_text, "Next")
    }
}

/// Survey step: an ordered set of questions submitted together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurveyStep {
    #[serde(default, alias = "survey_id")]
    pub step_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default = "default_required")]
    pub required: bool,
    #[serde(default)]
    pub survey_description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub button_text: Option<String>,
    #[serde(default)]
    pub randomize_questions: bool,
    #[serde(default, alias = "questions")]
    pub survey_questions: Vec<Question>,
}

impl SurveyStep {
    pub fn new(step_id: impl Into<String>, questions: Vec<Question>) -> Self {
        Self {
            step_id: step_id.into(),
            title: None,
            required: true,
            survey_description: String::new(),
            button_text: None,
            randomize_questions: false,
            survey_questions: questions,
        }
    }

    pub fn randomized(mut self) -> Self {
        self.randomize_questions = true;
        self
    }

    pub fn button_label(&self) -> &str {
        text_or(&self.button_text, "Submit")
    }
}

/// Slot reserved for scoring a prior chat transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiEvaluationStep {
    #[serde(default)]
    pub step_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default = "default_required")]
    pub required: bool,
    #[serde(default = "default_evaluation_model")]
    pub evaluation_model: String,
    #[serde(default)]
    pub context_prompt: String,
    #[serde(default)]
    pub evaluation_questions: Vec<Question>,
}

fn default_evaluation_model() -> String {
    "gemma2:9b".to_string()
}

impl AiEvaluationStep {
    pub fn new(step_id: impl Into<String>, questions: Vec<Question>) -> Self {
        Self {
            step_id: step_id.into(),
            title: None,
            required: true,
            evaluation_model: default_evaluation_model(),
            context_prompt: String::new(),
            evaluation_questions: questions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::flow::QuestionType;

    #[test]
    fn consent_step_deserializes_with_defaults() {
        let step: Step = serde_json::from_str(
            r#"{"step_type":"consent","step_id":"c1","content":"Line one\nLine two"}"#,
        )
        .unwrap();
        assert_eq!(step.kind(), StepKind::Consent);
        assert_eq!(step.step_id(), "c1");
        assert_eq!(step.display_title(), "Research Consent");
        assert!(step.required());
        match step {
            Step::Consent(c) => assert_eq!(c.button_or("I Agree"), "I Agree"),
            other => panic!("unexpected step {other:?}"),
        }
    }

    #[test]
    fn debriefing_is_always_required() {
        let step: Step = serde_json::from_str(
            r#"{"step_type":"debriefing","step_id":"d1","required":false,"content":"Thanks"}"#,
        )
        .unwrap();
        assert!(step.required());
    }

    #[test]
    fn instruction_dwell_ignores_zero() {
        let step = InstructionStep::new("i1", "Read").with_dwell(0, true);
        assert_eq!(step.dwell_seconds(), None);
        assert_eq!(
            InstructionStep::new("i1", "Read").with_dwell(5, true).dwell_seconds(),
            Some(5)
        );
    }

    #[test]
    fn survey_accepts_legacy_question_key() {
        let step: Step = serde_json::from_str(
            r#"{"step_type":"survey","survey_id":"s1","questions":[
                {"question_id":"q1","question_text":"Mood","question_type":"scale"}
            ]}"#,
        )
        .unwrap();
        match step {
            Step::Survey(s) => {
                assert_eq!(s.step_id, "s1");
                assert_eq!(s.survey_questions[0].question_type, QuestionType::Likert);
                assert_eq!(s.button_label(), "Submit");
            }
            other => panic!("unexpected step {other:?}"),
        }
    }

    #[test]
    fn blank_title_falls_back_to_default() {
        let step = Step::Instruction(InstructionStep {
            title: Some("  ".to_string()),
            ..InstructionStep::new("i1", "Read")
        });
        assert_eq!(step.display_title(), "Instructions");
    }

    #[test]
    fn ai_evaluation_defaults_model() {
        let step: Step =
            serde_json::from_str(r#"{"step_type":"ai_evaluation","step_id":"e1"}"#).unwrap();
        match step {
            Step::AiEvaluation(e) => assert_eq!(e.evaluation_model, "gemma2:9b"),
            other => panic!("unexpected step {other:?}"),
        }
    }

    #[test]
    fn step_serializes_with_type_tag() {
        let step = Step::Consent(ContentStep::new("c1", "Agree?"));
        let json = serde_json::to_value(&step).unwrap();
        assert_eq!(json["step_type"], "consent");
        assert_eq!(json["step_id"], "c1");
    }
}
