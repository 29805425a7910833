//! Plain rendering contract between the engine and a UI layer.

use serde::Serialize;

use super::dwell_gate::DwellGate;
use super::instance::{ActiveStep, AiEvaluationMode, EvaluationAttempts, StepRuntime};
use super::progress::Progress;
use super::randomizer_run::{ItemRuntime, RandomizerRun};
use crate::domain::flow::{
    InputType, InstructionStep, Question, QuestionType, RandomizerItem, RandomizerStep, Step,
    StepKind, SurveyStep,
};
use crate::domain::survey::SurveyPlan;

pub const NO_OPTIONS_NOTICE: &str = "No options configured for this question.";

/// Everything a renderer needs to display the current screen.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepDescriptor {
    /// `None` for terminal notices.
    pub step_id: Option<String>,
    pub kind: Option<StepKind>,
    pub title: String,
    pub progress: Option<String>,
    pub body: DescriptorBody,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DescriptorBody {
    /// Consent, instruction, debriefing and randomizer instruction items.
    Document {
        lines: Vec<String>,
        button_text: String,
        control: AdvanceControl,
    },
    Survey {
        description: String,
        questions: Vec<QuestionView>,
        button_text: String,
    },
    Chat {
        bot_name: String,
        time_limit_minutes: Option<u32>,
        /// The chat is over and only the advance remains.
        time_limit_reached: bool,
    },
    AiEvaluation(AiEvaluationView),
    /// A step that advances on its own could not be committed.
    AdvancePending {
        lines: Vec<String>,
        button_text: String,
    },
    AlreadyCompleted { lines: Vec<String> },
    AllCompleted { lines: Vec<String> },
}

/// Visibility of the single advance control.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum AdvanceControl {
    Visible,
    Hidden { countdown: Option<String> },
}

impl AdvanceControl {
    fn for_gate(gate: Option<&DwellGate>) -> Self {
        match gate {
            Some(gate) if !gate.is_open() => AdvanceControl::Hidden {
                countdown: gate.countdown_text(),
            },
            _ => AdvanceControl::Visible,
        }
    }

    pub fn is_visible(&self) -> bool {
        matches!(self, AdvanceControl::Visible)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionView {
    pub question_id: String,
    pub question_text: String,
    pub required: bool,
    pub control: QuestionControl,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QuestionControl {
    /// Single-select points numbered `1..=points`.
    Likert {
        points: u32,
        min_label: Option<String>,
        max_label: Option<String>,
    },
    SingleChoice { options: Vec<String> },
    MultiChoice { options: Vec<String> },
    Text {
        input_type: InputType,
        placeholder: Option<String>,
        max_length: Option<u32>,
    },
    Textarea {
        placeholder: Option<String>,
        max_length: Option<u32>,
    },
    /// A choice question with no options. Shown as a notice.
    NotConfigured { notice: String },
}

impl QuestionView {
    pub fn from_question(question: &Question) -> Self {
        let control = if question.is_misconfigured() {
            QuestionControl::NotConfigured {
                notice: NO_OPTIONS_NOTICE.to_string(),
            }
        } else {
            match question.question_type {
                QuestionType::Likert => QuestionControl::Likert {
                    points: question.scale_points(),
                    min_label: question.min_label.clone(),
                    max_label: question.max_label.clone(),
                },
                QuestionType::Radio => QuestionControl::SingleChoice {
                    options: question.options.clone(),
                },
                QuestionType::Checkbox => QuestionControl::MultiChoice {
                    options: question.options.clone(),
                },
                QuestionType::Text => QuestionControl::Text {
                    input_type: question.input_type(),
                    placeholder: question.placeholder.clone(),
                    max_length: question.max_length,
                },
                QuestionType::Textarea => QuestionControl::Textarea {
                    placeholder: question.placeholder.clone(),
                    max_length: question.max_length,
                },
            }
        };
        Self {
            question_id: question.question_id.clone(),
            question_text: question.question_text.clone(),
            required: question.required,
            control,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum AiEvaluationView {
    Placeholder {
        lines: Vec<String>,
        button_text: String,
    },
    Scoring {
        questions: Vec<String>,
        failures: u32,
        max_attempts: u32,
        last_error: Option<String>,
        can_retry: bool,
        can_skip: bool,
    },
}

/// Content lines with newlines preserved.
fn content_lines(content: &str) -> Vec<String> {
    content.lines().map(str::to_string).collect()
}

impl StepDescriptor {
    pub fn already_completed() -> Self {
        Self {
            step_id: None,
            kind: None,
            title: "Experiment Already Completed".to_string(),
            progress: None,
            body: DescriptorBody::AlreadyCompleted {
                lines: vec![
                    "You have already completed this experiment.".to_string(),
                    "You cannot participate again.".to_string(),
                    "Thank you for your participation.".to_string(),
                ],
            },
        }
    }

    pub fn all_completed() -> Self {
        Self {
            step_id: None,
            kind: None,
            title: "Experiment Complete".to_string(),
            progress: None,
            body: DescriptorBody::AllCompleted {
                lines: vec![
                    "All steps are complete.".to_string(),
                    "Thank you for your participation.".to_string(),
                ],
            },
        }
    }

    /// Shown on a branch or exhausted randomizer whose automatic advance
    /// failed, so the participant can trigger it again.
    pub fn advance_pending(active: &ActiveStep, total_steps: usize) -> Self {
        Self {
            step_id: Some(active.step.step_id().to_string()),
            kind: Some(active.step.kind()),
            title: "Connection Problem".to_string(),
            progress: Some(Progress::new(active.index, total_steps).to_string()),
            body: DescriptorBody::AdvancePending {
                lines: vec![
                    "We could not continue to the next step.".to_string(),
                    "Please check your connection and try again.".to_string(),
                ],
                button_text: "Try Again".to_string(),
            },
        }
    }

    /// Describes the active step. Branches and exhausted randomizers have
    /// nothing to show.
    pub fn for_active(active: &ActiveStep, total_steps: usize) -> Option<Self> {
        let progress = Progress::new(active.index, total_steps);
        let step = &active.step;
        let base = |title: String, progress: Progress, body: DescriptorBody| Self {
            step_id: Some(step.step_id().to_string()),
            kind: Some(step.kind()),
            title,
            progress: Some(progress.to_string()),
            body,
        };
        let title = step.display_title().to_string();

        let body = match (step, &active.runtime) {
            (Step::Consent(content), _) => DescriptorBody::Document {
                lines: content_lines(&content.content),
                button_text: content.button_or("I Agree").to_string(),
                control: AdvanceControl::Visible,
            },
            (Step::Debriefing(content), _) => DescriptorBody::Document {
                lines: content_lines(&content.content),
                button_text: content.button_or("Finish").to_string(),
                control: AdvanceControl::Visible,
            },
            (Step::Instruction(instruction), StepRuntime::Instruction(gate)) => {
                instruction_body(instruction, gate.as_ref())
            }
            (Step::Survey(survey), StepRuntime::Survey(plan)) => {
                survey_body(survey, plan, survey.button_label())
            }
            (Step::SurveyRandomizer(randomizer), StepRuntime::Randomizer(run)) => {
                return randomizer_item(randomizer, run, progress).map(|(title, progress, body)| {
                    base(title, progress, body)
                });
            }
            (Step::Chat(chat), _) => DescriptorBody::Chat {
                bot_name: chat.bot_name().to_string(),
                time_limit_minutes: chat.time_limit_minutes.filter(|m| *m > 0),
                time_limit_reached: active.chat_time_limit_reached(),
            },
            (Step::AiEvaluation(evaluation), StepRuntime::AiEvaluation(attempts)) => {
                DescriptorBody::AiEvaluation(evaluation_view(
                    attempts,
                    evaluation
                        .evaluation_questions
                        .iter()
                        .map(|q| q.question_text.clone())
                        .collect(),
                ))
            }
            _ => return None,
        };
        Some(base(title, progress, body))
    }
}

fn instruction_body(instruction: &InstructionStep, gate: Option<&DwellGate>) -> DescriptorBody {
    DescriptorBody::Document {
        lines: content_lines(&instruction.content),
        button_text: instruction.button_label().to_string(),
        control: AdvanceControl::for_gate(gate),
    }
}

fn survey_body(survey: &SurveyStep, plan: &SurveyPlan, button_text: &str) -> DescriptorBody {
    DescriptorBody::Survey {
        description: survey.survey_description.clone(),
        questions: plan
            .presented(&survey.survey_questions)
            .map(QuestionView::from_question)
            .collect(),
        button_text: button_text.to_string(),
    }
}

fn randomizer_item(
    randomizer: &RandomizerStep,
    run: &RandomizerRun,
    progress: Progress,
) -> Option<(String, Progress, DescriptorBody)> {
    let (position, count) = run.position();
    let progress = progress.with_item(position, count);
    let item = run.current_item(randomizer)?;
    match (item, run.current_runtime()?) {
        (RandomizerItem::Survey(survey), ItemRuntime::Survey(plan)) => {
            let title = configured_or(&survey.title, format!("Survey ({position}/{count})"));
            let button = survey
                .button_text
                .as_deref()
                .filter(|b| !b.trim().is_empty())
                .unwrap_or("Next");
            Some((title, progress, survey_body(survey, plan, button)))
        }
        (RandomizerItem::Instruction(instruction), ItemRuntime::Instruction(gate)) => {
            let title = configured_or(
                &instruction.title,
                format!("Instructions ({position}/{count})"),
            );
            Some((title, progress, instruction_body(instruction, gate.as_ref())))
        }
        _ => None,
    }
}

fn configured_or(title: &Option<String>, fallback: String) -> String {
    title
        .as_deref()
        .filter(|t| !t.trim().is_empty())
        .map(str::to_string)
        .unwrap_or(fallback)
}

fn evaluation_view(attempts: &EvaluationAttempts, questions: Vec<String>) -> AiEvaluationView {
    match attempts.mode {
        AiEvaluationMode::Placeholder => AiEvaluationView::Placeholder {
            lines: vec![
                "This step is currently a placeholder.".to_string(),
                "Automatic AI evaluation is not performed yet.".to_string(),
            ],
            button_text: "Next".to_string(),
        },
        AiEvaluationMode::Scoring => AiEvaluationView::Scoring {
            questions,
            failures: attempts.failures(),
            max_attempts: attempts.max_attempts(),
            last_error: attempts.last_error().map(str::to_string),
            can_retry: attempts.can_retry(),
            can_skip: attempts.can_skip(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::flow::{BranchStep, ContentStep};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn active(step: Step, index: usize) -> ActiveStep {
        ActiveStep::enter(step, index, AiEvaluationMode::Placeholder, 3, &mut StdRng::seed_from_u64(9))
    }

    #[test]
    fn consent_preserves_lines_and_default_button() {
        let descriptor = StepDescriptor::for_active(
            &active(Step::Consent(ContentStep::new("c1", "First\nSecond")), 0),
            3,
        )
        .unwrap();
        assert_eq!(descriptor.title, "Research Consent");
        assert_eq!(descriptor.progress.as_deref(), Some("Step 1 / 3"));
        assert_eq!(
            descriptor.body,
            DescriptorBody::Document {
                lines: vec!["First".to_string(), "Second".to_string()],
                button_text: "I Agree".to_string(),
                control: AdvanceControl::Visible,
            }
        );
    }

    #[test]
    fn gated_instruction_hides_control_with_countdown() {
        let step = Step::Instruction(InstructionStep::new("i1", "Read").with_dwell(5, true));
        let descriptor = StepDescriptor::for_active(&active(step, 1), 3).unwrap();
        match descriptor.body {
            DescriptorBody::Document { control, .. } => assert_eq!(
                control,
                AdvanceControl::Hidden {
                    countdown: Some("The button will appear in 5 seconds...".to_string())
                }
            ),
            other => panic!("unexpected body {other:?}"),
        }
    }

    #[test]
    fn choice_question_without_options_shows_notice() {
        let survey = SurveyStep::new("s1", vec![Question::new("q1", "Pick", QuestionType::Radio)]);
        let descriptor = StepDescriptor::for_active(&active(Step::Survey(survey), 0), 1).unwrap();
        let DescriptorBody::Survey { questions, .. } = descriptor.body else {
            panic!("expected survey body");
        };
        assert_eq!(
            questions[0].control,
            QuestionControl::NotConfigured {
                notice: NO_OPTIONS_NOTICE.to_string()
            }
        );
    }

    #[test]
    fn randomizer_item_has_numbered_title_and_progress() {
        let randomizer = RandomizerStep::new(
            "r1",
            vec![
                RandomizerItem::Instruction(InstructionStep::new("a", "A")),
                RandomizerItem::Instruction(InstructionStep::new("b", "B")),
            ],
        );
        let descriptor =
            StepDescriptor::for_active(&active(Step::SurveyRandomizer(randomizer), 2), 4).unwrap();
        assert_eq!(descriptor.title, "Instructions (1/2)");
        assert_eq!(descriptor.progress.as_deref(), Some("Step 3 / 4 (1/2)"));
    }

    #[test]
    fn branch_has_no_descriptor() {
        let step = Step::Branch(BranchStep::new("b1", vec![]));
        assert!(StepDescriptor::for_active(&active(step, 0), 2).is_none());
    }

    #[test]
    fn pending_branch_offers_a_retry() {
        let step = Step::Branch(BranchStep::new("b1", vec![]));
        let descriptor = StepDescriptor::advance_pending(&active(step, 1), 4);
        assert_eq!(descriptor.step_id.as_deref(), Some("b1"));
        assert_eq!(descriptor.progress.as_deref(), Some("Step 2 / 4"));
        assert!(matches!(
            descriptor.body,
            DescriptorBody::AdvancePending { ref button_text, .. } if button_text == "Try Again"
        ));
    }

    #[test]
    fn chat_reports_a_reached_time_limit() {
        let mut chat = active(
            Step::Chat(crate::domain::flow::ChatStep::new("chat1").with_time_limit(2)),
            0,
        );
        chat.mark_chat_time_limit_reached();
        let descriptor = StepDescriptor::for_active(&chat, 1).unwrap();
        assert!(matches!(
            descriptor.body,
            DescriptorBody::Chat {
                time_limit_minutes: Some(2),
                time_limit_reached: true,
                ..
            }
        ));
    }

    #[test]
    fn placeholder_evaluation_offers_next() {
        let step = Step::AiEvaluation(crate::domain::flow::AiEvaluationStep::new("e1", vec![]));
        let descriptor = StepDescriptor::for_active(&active(step, 0), 1).unwrap();
        assert!(matches!(
            descriptor.body,
            DescriptorBody::AiEvaluation(AiEvaluationView::Placeholder { .. })
        ));
    }
}
