//! Flow definitions: loading and authoring checks.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::branch::ConditionType;
use super::question::{Question, QuestionType};
use super::randomizer::RandomizerItem;
use super::step::Step;
use crate::domain::foundation::{DomainError, ErrorCode};

/// Errors raised while reading a flow definition.
#[derive(Debug, Error)]
pub enum FlowDefinitionError {
    #[error("Failed to read flow file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON flow definition: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid YAML flow definition: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Unsupported flow file extension: {0}")]
    UnsupportedFormat(String),
}

/// An ordered sequence of steps authored for one experiment condition.
///
/// Accepts either `{"steps": [...]}` or a bare step array on input.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FlowDefinition {
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl FlowDefinition {
    pub fn new(steps: Vec<Step>) -> Self {
        Self { steps }
    }

    /// Number of steps used as the initial progress denominator.
    pub fn top_level_step_count(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn from_json_str(input: &str) -> Result<Self, FlowDefinitionError> {
        let value: Value = serde_json::from_str(input)?;
        Ok(Self::from_value(value)?)
    }

    pub fn from_yaml_str(input: &str) -> Result<Self, FlowDefinitionError> {
        let value: Value = serde_yaml::from_str(input)?;
        Ok(Self::from_value(value)?)
    }

    /// Loads a `.json`, `.yaml` or `.yml` flow file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, FlowDefinitionError> {
        let path = path.as_ref();
        let input = std::fs::read_to_string(path).map_err(|source| FlowDefinitionError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        match extension.as_str() {
            "json" => Self::from_json_str(&input),
            "yaml" | "yml" => Self::from_yaml_str(&input),
            other => Err(FlowDefinitionError::UnsupportedFormat(other.to_string())),
        }
    }

    fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        match value {
            Value::Array(steps) => Ok(Self {
                steps: serde_json::from_value(Value::Array(steps))?,
            }),
            other => serde_json::from_value(other),
        }
    }

    /// Authoring problems, in tree order.
    pub fn issues(&self) -> Vec<DefinitionIssue> {
        let mut checker = Checker::default();
        checker.walk_steps(&self.steps, "steps");
        checker.issues
    }

    /// Rejects definitions with blocking issues.
    pub fn validate(&self) -> Result<(), DomainError> {
        let issues = self.issues();
        let Some(first) = issues.iter().find(|i| i.severity == IssueSeverity::Error) else {
            return Ok(());
        };
        let code = match first.kind {
            IssueKind::DuplicateStepId => ErrorCode::DuplicateStepId,
            _ => ErrorCode::InvalidFlowDefinition,
        };
        Err(DomainError::new(code, first.message.clone()).with_detail("path", first.path.clone()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueSeverity {
    Error,
    Warning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueKind {
    MissingStepId,
    DuplicateStepId,
    DuplicateQuestionId,
    ChoiceWithoutOptions,
    ScaleTooSmall,
    NonLikertEvaluationQuestion,
    EmptyRandomizer,
    UnsupportedRandomizerItem,
    BranchWithoutPaths,
    MissingConditionValue,
}

impl IssueKind {
    pub fn severity(&self) -> IssueSeverity {
        match self {
            IssueKind::MissingStepId | IssueKind::DuplicateStepId => IssueSeverity::Error,
            _ => IssueSeverity::Warning,
        }
    }
}

/// One authoring problem, located by its path in the definition tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefinitionIssue {
    pub kind: IssueKind,
    pub severity: IssueSeverity,
    pub path: String,
    pub message: String,
}

impl fmt::Display for DefinitionIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.severity {
            IssueSeverity::Error => "error",
            IssueSeverity::Warning => "warning",
        };
        write!(f, "{level} at {}: {}", self.path, self.message)
    }
}

#[derive(Default)]
struct Checker {
    seen_step_ids: HashMap<String, String>,
    issues: Vec<DefinitionIssue>,
}

impl Checker {
    fn push(&mut self, kind: IssueKind, path: &str, message: String) {
        self.issues.push(DefinitionIssue {
            kind,
            severity: kind.severity(),
            path: path.to_string(),
            message,
        });
    }

    fn register_id(&mut self, step_id: &str, path: &str) {
        if let Some(first) = self.seen_step_ids.get(step_id) {
            let message = format!("duplicate step_id `{step_id}` (first used at {first})");
            self.push(IssueKind::DuplicateStepId, path, message);
        } else {
            self.seen_step_ids
                .insert(step_id.to_string(), path.to_string());
        }
    }

    fn walk_steps(&mut self, steps: &[Step], prefix: &str) {
        for (index, step) in steps.iter().enumerate() {
            let path = format!("{prefix}[{index}]");
            if step.step_id().trim().is_empty() {
                self.push(
                    IssueKind::MissingStepId,
                    &path,
                    format!("{} step has no step_id", step.kind()),
                );
            } else {
                self.register_id(step.step_id(), &path);
            }

            match step {
                Step::Survey(survey) => self.check_questions(&survey.survey_questions, &path),
                Step::AiEvaluation(evaluation) => {
                    self.check_questions(&evaluation.evaluation_questions, &path);
                    for (qi, question) in evaluation.evaluation_questions.iter().enumerate() {
                        if question.question_type != QuestionType::Likert {
                            self.push(
                                IssueKind::NonLikertEvaluationQuestion,
                                &format!("{path}.evaluation_questions[{qi}]"),
                                format!(
                                    "evaluation question `{}` must be likert, found {}",
                                    question.question_id, question.question_type
                                ),
                            );
                        }
                    }
                }
                Step::SurveyRandomizer(randomizer) => {
                    if randomizer.steps.is_empty() {
                        self.push(
                            IssueKind::EmptyRandomizer,
                            &path,
                            "randomizer has no items".to_string(),
                        );
                    }
                    for (ii, item) in randomizer.steps.iter().enumerate() {
                        let item_path = format!("{path}.steps[{ii}]");
                        match item {
                            RandomizerItem::Survey(survey) => {
                                if !survey.step_id.is_empty() {
                                    self.register_id(&survey.step_id, &item_path);
                                }
                                self.check_questions(&survey.survey_questions, &item_path);
                            }
                            RandomizerItem::Instruction(instruction) => {
                                if !instruction.step_id.is_empty() {
                                    self.register_id(&instruction.step_id, &item_path);
                                }
                            }
                            RandomizerItem::Unsupported(_) => self.push(
                                IssueKind::UnsupportedRandomizerItem,
                                &item_path,
                                format!(
                                    "randomizer item type `{}` will be skipped",
                                    item.item_type()
                                ),
                            ),
                        }
                    }
                }
                Step::Branch(branch) => {
                    if branch.branches.is_empty() {
                        self.push(
                            IssueKind::BranchWithoutPaths,
                            &path,
                            "branch has no paths".to_string(),
                        );
                    }
                    for (bi, path_def) in branch.branches.iter().enumerate() {
                        let branch_path = format!("{path}.branches[{bi}]");
                        if path_def.condition_type == ConditionType::ConditionId
                            && path_def.condition_value.trim().is_empty()
                        {
                            self.push(
                                IssueKind::MissingConditionValue,
                                &branch_path,
                                format!(
                                    "branch `{}` matches on condition_id but has no condition_value",
                                    path_def.branch_id
                                ),
                            );
                        }
                        self.walk_steps(&path_def.steps, &format!("{branch_path}.steps"));
                    }
                }
                _ => {}
            }
        }
    }

    fn check_questions(&mut self, questions: &[Question], path: &str) {
        let mut seen: HashMap<&str, usize> = HashMap::new();
        for (qi, question) in questions.iter().enumerate() {
            let question_path = format!("{path}.questions[{qi}]");
            if let Some(first) = seen.insert(question.question_id.as_str(), qi) {
                self.push(
                    IssueKind::DuplicateQuestionId,
                    &question_path,
                    format!(
                        "duplicate question_id `{}` (first at index {first})",
                        question.question_id
                    ),
                );
            }
            if question.is_misconfigured() {
                self.push(
                    IssueKind::ChoiceWithoutOptions,
                    &question_path,
                    format!("question `{}` has no options configured", question.question_id),
                );
            }
            if question.question_type == QuestionType::Likert && question.scale_points() < 2 {
                self.push(
                    IssueKind::ScaleTooSmall,
                    &question_path,
                    format!(
                        "likert question `{}` needs at least 2 points",
                        question.question_id
                    ),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::flow::{
        Branch, BranchStep, ContentStep, InstructionStep, RandomizerStep, SurveyStep,
    };
    use std::io::Write;

    fn consent(id: &str) -> Step {
        Step::Consent(ContentStep::new(id, "Please agree"))
    }

    #[test]
    fn bare_array_and_wrapped_forms_both_load() {
        let bare = FlowDefinition::from_json_str(
            r#"[{"step_type":"consent","step_id":"c1","content":"x"}]"#,
        )
        .unwrap();
        let wrapped = FlowDefinition::from_json_str(
            r#"{"steps":[{"step_type":"consent","step_id":"c1","content":"x"}]}"#,
        )
        .unwrap();
        assert_eq!(bare, wrapped);
        assert_eq!(bare.top_level_step_count(), 1);
    }

    #[test]
    fn yaml_definition_loads() {
        let flow = FlowDefinition::from_yaml_str(
            "steps:\n  - step_type: instruction\n    step_id: i1\n    content: Read this\n    min_display_seconds: 5\n    show_timer: true\n",
        )
        .unwrap();
        match &flow.steps[0] {
            Step::Instruction(i) => assert_eq!(i.dwell_seconds(), Some(5)),
            other => panic!("unexpected step {other:?}"),
        }
    }

    #[test]
    fn from_path_dispatches_on_extension() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(
            file,
            r#"{{"steps":[{{"step_type":"debriefing","step_id":"d1","content":"bye"}}]}}"#
        )
        .unwrap();
        let flow = FlowDefinition::from_path(file.path()).unwrap();
        assert_eq!(flow.steps[0].step_id(), "d1");

        let other = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        assert!(matches!(
            FlowDefinition::from_path(other.path()),
            Err(FlowDefinitionError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = FlowDefinition::from_path("/nonexistent/flow.json").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/flow.json"));
    }

    #[test]
    fn duplicate_step_ids_inside_branches_block_validation() {
        let flow = FlowDefinition::new(vec![
            consent("c1"),
            Step::Branch(BranchStep::new(
                "b1",
                vec![Branch::random("a", 1, vec![consent("c1")])],
            )),
        ]);
        let issues = flow.issues();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].kind, IssueKind::DuplicateStepId);
        assert_eq!(issues[0].path, "steps[1].branches[0].steps[0]");

        let err = flow.validate().unwrap_err();
        assert_eq!(err.code, ErrorCode::DuplicateStepId);
    }

    #[test]
    fn randomizer_item_ids_share_the_namespace() {
        let flow = FlowDefinition::new(vec![
            Step::Instruction(InstructionStep::new("intro", "hi")),
            Step::SurveyRandomizer(RandomizerStep::new(
                "r1",
                vec![RandomizerItem::Instruction(InstructionStep::new("intro", "again"))],
            )),
        ]);
        assert!(flow
            .issues()
            .iter()
            .any(|i| i.kind == IssueKind::DuplicateStepId));
    }

    #[test]
    fn warnings_do_not_block_validation() {
        let survey = SurveyStep::new(
            "s1",
            vec![
                Question::new("q1", "Pick", QuestionType::Radio),
                Question::new("q1", "Rate", QuestionType::Likert).with_scale(1),
            ],
        );
        let flow = FlowDefinition::new(vec![
            Step::Survey(survey),
            Step::SurveyRandomizer(RandomizerStep::new("r1", vec![])),
            Step::Branch(BranchStep::new(
                "b1",
                vec![Branch::for_condition("ctrl", "", vec![])],
            )),
            Step::Branch(BranchStep::new("b2", vec![])),
        ]);
        let kinds: Vec<IssueKind> = flow.issues().iter().map(|i| i.kind).collect();
        assert_eq!(
            kinds,
            vec![
                IssueKind::ChoiceWithoutOptions,
                IssueKind::DuplicateQuestionId,
                IssueKind::ScaleTooSmall,
                IssueKind::EmptyRandomizer,
                IssueKind::MissingConditionValue,
                IssueKind::BranchWithoutPaths,
            ]
        );
        assert!(flow.validate().is_ok());
    }

    #[test]
    fn missing_step_id_is_an_error() {
        let flow = FlowDefinition::new(vec![consent("")]);
        let err = flow.validate().unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidFlowDefinition);
        assert_eq!(err.details.get("path").map(String::as_str), Some("steps[0]"));
    }
}
