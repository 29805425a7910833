//! Step Definition Model.
//!
//! A flow is an ordered sequence of typed steps. Branch steps hold named
//! sub-sequences, and randomizer steps hold survey and instruction items
//! that are presented in one shuffled order.

mod branch;
mod chat;
mod definition;
mod question;
mod randomizer;
mod step;

pub use branch::{Branch, BranchStep, ConditionType};
pub use chat::{ChatConfiguration, ChatDefaults, ChatStep};
pub use definition::{
    DefinitionIssue, FlowDefinition, FlowDefinitionError, IssueKind, IssueSeverity,
};
pub use question::{InputType, Question, QuestionType, DEFAULT_LIKERT_SCALE};
pub use randomizer::{RandomizerItem, RandomizerStep};
pub use step::{AiEvaluationStep, ContentStep, InstructionStep, Step, StepKind, SurveyStep};
