//! Runtime state of the step the participant is on.

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::dwell_gate::DwellGate;
use super::randomizer_run::RandomizerRun;
use crate::domain::flow::Step;
use crate::domain::survey::SurveyPlan;

/// How `ai_evaluation` steps behave.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AiEvaluationMode {
    /// Static notice with a manual "Next" control. No scoring happens.
    #[default]
    Placeholder,
    /// Scores through the gateway with bounded retry and explicit skip.
    Scoring,
}

/// Scoring attempts of one evaluation step instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluationAttempts {
    pub mode: AiEvaluationMode,
    failures: u32,
    max_attempts: u32,
    last_error: Option<String>,
}

impl EvaluationAttempts {
    pub fn new(mode: AiEvaluationMode, max_attempts: u32) -> Self {
        Self {
            mode,
            failures: 0,
            max_attempts,
            last_error: None,
        }
    }

    pub fn record_failure(&mut self, error: impl Into<String>) {
        self.failures += 1;
        self.last_error = Some(error.into());
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Skipping is only offered once every attempt has failed.
    pub fn can_skip(&self) -> bool {
        self.failures >= self.max_attempts
    }

    pub fn can_retry(&self) -> bool {
        self.failures < self.max_attempts
    }
}

/// Type-specific runtime of the active step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepRuntime {
    Document,
    Instruction(Option<DwellGate>),
    Survey(SurveyPlan),
    Randomizer(RandomizerRun),
    /// Set once the time limit fired. The advance it started may still be
    /// outstanding.
    Chat { time_limit_reached: bool },
    AiEvaluation(EvaluationAttempts),
    Branch,
}

/// The current step together with its server index and runtime state.
///
/// Created once per step instance. Randomized orders live here and are
/// never regenerated while the instance exists.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveStep {
    pub step: Step,
    pub index: usize,
    pub runtime: StepRuntime,
}

impl ActiveStep {
    pub fn enter<R: Rng + ?Sized>(
        step: Step,
        index: usize,
        evaluation_mode: AiEvaluationMode,
        max_attempts: u32,
        rng: &mut R,
    ) -> Self {
        let runtime = match &step {
            Step::Consent(_) | Step::Debriefing(_) => StepRuntime::Document,
            Step::Instruction(instruction) => StepRuntime::Instruction(
                instruction
                    .dwell_seconds()
                    .map(|seconds| DwellGate::new(seconds, instruction.show_timer)),
            ),
            Step::Survey(survey) => StepRuntime::Survey(SurveyPlan::new(
                survey.survey_questions.len(),
                survey.randomize_questions,
                rng,
            )),
            Step::SurveyRandomizer(randomizer) => {
                StepRuntime::Randomizer(RandomizerRun::start(randomizer, rng))
            }
            Step::Chat(_) => StepRuntime::Chat {
                time_limit_reached: false,
            },
            Step::AiEvaluation(_) => {
                StepRuntime::AiEvaluation(EvaluationAttempts::new(evaluation_mode, max_attempts))
            }
            Step::Branch(_) => StepRuntime::Branch,
        };
        Self {
            step,
            index,
            runtime,
        }
    }

    /// Gate of the instruction currently displayed, if any.
    pub fn dwell_gate(&self) -> Option<&DwellGate> {
        match &self.runtime {
            StepRuntime::Instruction(gate) => gate.as_ref(),
            StepRuntime::Randomizer(run) => run.dwell_gate(),
            _ => None,
        }
    }

    pub fn dwell_gate_mut(&mut self) -> Option<&mut DwellGate> {
        match &mut self.runtime {
            StepRuntime::Instruction(gate) => gate.as_mut(),
            StepRuntime::Randomizer(run) => run.dwell_gate_mut(),
            _ => None,
        }
    }

    pub fn chat_time_limit_reached(&self) -> bool {
        matches!(
            self.runtime,
            StepRuntime::Chat {
                time_limit_reached: true
            }
        )
    }

    /// Records that the chat time limit fired. Returns false when it had
    /// already been recorded or the step is not a chat.
    pub fn mark_chat_time_limit_reached(&mut self) -> bool {
        match &mut self.runtime {
            StepRuntime::Chat { time_limit_reached } if !*time_limit_reached => {
                *time_limit_reached = true;
                true
            }
            _ => false,
        }
    }

    /// Steps that advance without participant input: branches and
    /// randomizers with nothing left to present.
    pub fn needs_auto_advance(&self) -> bool {
        match &self.runtime {
            StepRuntime::Branch => true,
            StepRuntime::Randomizer(run) => run.is_exhausted(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::flow::{
        BranchStep, ChatStep, InstructionStep, RandomizerStep, SurveyStep,
    };
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn enter(step: Step) -> ActiveStep {
        ActiveStep::enter(step, 0, AiEvaluationMode::Placeholder, 3, &mut StdRng::seed_from_u64(1))
    }

    #[test]
    fn instruction_with_dwell_gets_a_closed_gate() {
        let active = enter(Step::Instruction(InstructionStep::new("i", "x").with_dwell(5, true)));
        assert_eq!(active.dwell_gate().map(|g| g.is_open()), Some(false));
    }

    #[test]
    fn branches_and_empty_randomizers_auto_advance() {
        assert!(enter(Step::Branch(BranchStep::new("b", vec![]))).needs_auto_advance());
        assert!(enter(Step::SurveyRandomizer(RandomizerStep::new("r", vec![]))).needs_auto_advance());
        assert!(!enter(Step::Survey(SurveyStep::new("s", vec![]))).needs_auto_advance());
    }

    #[test]
    fn chat_time_limit_is_recorded_once() {
        let mut active = enter(Step::Chat(ChatStep::new("chat").with_time_limit(1)));
        assert!(!active.chat_time_limit_reached());
        assert!(active.mark_chat_time_limit_reached());
        assert!(!active.mark_chat_time_limit_reached());
        assert!(active.chat_time_limit_reached());
        assert!(!active.needs_auto_advance());
    }

    #[test]
    fn evaluation_skip_needs_exhausted_attempts() {
        let mut attempts = EvaluationAttempts::new(AiEvaluationMode::Scoring, 2);
        assert!(!attempts.can_skip());
        attempts.record_failure("timeout");
        assert!(attempts.can_retry());
        attempts.record_failure("timeout");
        assert!(attempts.can_skip());
        assert!(!attempts.can_retry());
        assert_eq!(attempts.last_error(), Some("timeout"));
    }
}
