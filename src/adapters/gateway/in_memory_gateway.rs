//! In-memory Flow Gateway - server reference implementation.
//!
//! Holds flow definitions per session and one progress record per
//! participant. Progress is a resolved path: it starts as the top-level
//! steps, and when a participant advances past a branch step the selected
//! path's steps are spliced in right after it.
//!
//! Used by integration tests and by the runner's local mode.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

use crate::domain::flow::{ChatConfiguration, FlowDefinition, Step};
use crate::domain::foundation::{DomainError, ParticipantId, ParticipantSession, SessionId};
use crate::domain::randomization::{entropy_rng, select_branch, FlowRng};
use crate::domain::response::{EvaluationScore, ResponsePayload};
use crate::ports::{
    AdvanceOutcome, AdvanceRequest, CurrentStepOutcome, EvaluationRequest, FlowGateway,
    GatewayError,
};

/// A response stored when a participant left a step.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedResponse {
    pub participant_id: ParticipantId,
    pub step_id: String,
    pub step_index: usize,
    pub response: Option<ResponsePayload>,
    pub recorded_at: DateTime<Utc>,
}

/// A branch path chosen for a participant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchAssignment {
    pub participant_id: ParticipantId,
    pub step_id: String,
    pub branch_id: String,
}

#[derive(Debug)]
struct Progress {
    path: Vec<Step>,
    index: usize,
    finished: bool,
}

#[derive(Default)]
struct State {
    flows: HashMap<SessionId, FlowDefinition>,
    conditions: HashMap<ParticipantSession, String>,
    progress: HashMap<ParticipantSession, Progress>,
    responses: HashMap<SessionId, Vec<RecordedResponse>>,
    assignments: HashMap<SessionId, Vec<BranchAssignment>>,
    chat_configurations: Vec<(SessionId, ChatConfiguration)>,
    evaluations: VecDeque<Result<Vec<EvaluationScore>, GatewayError>>,
}

pub struct InMemoryFlowGateway {
    state: Mutex<State>,
    rng: Mutex<FlowRng>,
}

impl Default for InMemoryFlowGateway {
    fn default() -> Self {
        Self::new()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl InMemoryFlowGateway {
    pub fn new() -> Self {
        Self::with_rng(entropy_rng())
    }

    /// Uses `rng` for branch assignment.
    pub fn with_rng(rng: FlowRng) -> Self {
        Self {
            state: Mutex::new(State::default()),
            rng: Mutex::new(rng),
        }
    }

    /// Registers the flow for a session. Definitions with blocking
    /// authoring issues are refused.
    pub fn register_flow(
        &self,
        session_id: SessionId,
        flow: FlowDefinition,
    ) -> Result<(), DomainError> {
        flow.validate()?;
        for issue in flow.issues() {
            tracing::warn!(session_id = %session_id, issue = %issue, "Flow definition issue");
        }
        lock(&self.state).flows.insert(session_id, flow);
        Ok(())
    }

    /// Sets the experimental condition used by `condition_id` branches.
    pub fn assign_condition(&self, session: &ParticipantSession, condition: impl Into<String>) {
        lock(&self.state)
            .conditions
            .insert(session.clone(), condition.into());
    }

    /// Queues the result of the next `evaluate` call.
    pub fn script_evaluation(&self, result: Result<Vec<EvaluationScore>, GatewayError>) {
        lock(&self.state).evaluations.push_back(result);
    }

    pub fn responses(&self, session_id: &SessionId) -> Vec<RecordedResponse> {
        lock(&self.state)
            .responses
            .get(session_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn branch_assignments(&self, session_id: &SessionId) -> Vec<BranchAssignment> {
        lock(&self.state)
            .assignments
            .get(session_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn chat_configurations(&self) -> Vec<(SessionId, ChatConfiguration)> {
        lock(&self.state).chat_configurations.clone()
    }

    /// Server-side position of a participant: `(index, path length, finished)`.
    pub fn position(&self, session: &ParticipantSession) -> Option<(usize, usize, bool)> {
        lock(&self.state)
            .progress
            .get(session)
            .map(|p| (p.index, p.path.len(), p.finished))
    }
}

impl State {
    fn progress_for(&mut self, session: &ParticipantSession) -> Option<&mut Progress> {
        let flow = self.flows.get(&session.session_id)?;
        let progress = self
            .progress
            .entry(session.clone())
            .or_insert_with(|| Progress {
                path: flow.steps.clone(),
                index: 0,
                finished: false,
            });
        Some(progress)
    }
}

#[async_trait]
impl FlowGateway for InMemoryFlowGateway {
    async fn current_step(
        &self,
        session: &ParticipantSession,
    ) -> Result<CurrentStepOutcome, GatewayError> {
        let mut state = lock(&self.state);
        let Some(progress) = state.progress_for(session) else {
            return Ok(CurrentStepOutcome::NoFlow);
        };
        if progress.finished {
            return Ok(CurrentStepOutcome::AlreadyCompleted);
        }
        match progress.path.get(progress.index) {
            Some(step) => Ok(CurrentStepOutcome::Active {
                step: step.clone(),
                current_step_index: progress.index,
                total_steps: progress.path.len(),
            }),
            None => Ok(CurrentStepOutcome::Completed),
        }
    }

    async fn advance(
        &self,
        session: &ParticipantSession,
        request: AdvanceRequest,
    ) -> Result<AdvanceOutcome, GatewayError> {
        let mut guard = lock(&self.state);
        let state = &mut *guard;
        let condition = state.conditions.get(session).cloned();
        let progress = state.progress_for(session).ok_or_else(|| {
            GatewayError::NotFound(format!("no flow for session {}", session.session_id))
        })?;

        if progress.finished {
            return Err(GatewayError::Conflict(
                "participant has already completed the flow".to_string(),
            ));
        }
        let Some(current) = progress.path.get(progress.index).cloned() else {
            progress.finished = true;
            return Ok(AdvanceOutcome::Completed);
        };
        if let Some(step_id) = &request.step_id {
            if step_id != current.step_id() {
                return Err(GatewayError::Conflict(format!(
                    "step `{}` is not the current step `{}`",
                    step_id,
                    current.step_id()
                )));
            }
        }

        let mut assignment = None;
        if let Step::Branch(branch) = &current {
            let mut rng = lock(&self.rng);
            match select_branch(&branch.branches, condition.as_deref(), &mut *rng) {
                Some(selected) => {
                    let path = &branch.branches[selected];
                    let at = progress.index + 1;
                    progress.path.splice(at..at, path.steps.iter().cloned());
                    tracing::info!(
                        session_id = %session.session_id,
                        participant_id = %session.participant_id,
                        step_id = %current.step_id(),
                        branch_id = %path.branch_id,
                        "Branch path assigned"
                    );
                    assignment = Some(BranchAssignment {
                        participant_id: session.participant_id.clone(),
                        step_id: current.step_id().to_string(),
                        branch_id: path.branch_id.clone(),
                    });
                }
                None => tracing::warn!(
                    session_id = %session.session_id,
                    step_id = %current.step_id(),
                    "Branch has no selectable path, continuing past it"
                ),
            }
        }

        let left_index = progress.index;
        progress.index += 1;
        let outcome = match progress.path.get(progress.index) {
            Some(next) => AdvanceOutcome::Next {
                next_step: next.clone(),
                current_step_index: progress.index,
                total_steps: Some(progress.path.len()),
            },
            None => {
                progress.finished = true;
                AdvanceOutcome::Completed
            }
        };

        let record = RecordedResponse {
            participant_id: session.participant_id.clone(),
            step_id: current.step_id().to_string(),
            step_index: left_index,
            response: request.response,
            recorded_at: Utc::now(),
        };
        state
            .responses
            .entry(session.session_id.clone())
            .or_default()
            .push(record);
        if let Some(assignment) = assignment {
            state
                .assignments
                .entry(session.session_id.clone())
                .or_default()
                .push(assignment);
        }
        Ok(outcome)
    }

    async fn configure_chat(
        &self,
        session_id: &SessionId,
        configuration: &ChatConfiguration,
    ) -> Result<(), GatewayError> {
        lock(&self.state)
            .chat_configurations
            .push((session_id.clone(), configuration.clone()));
        Ok(())
    }

    async fn evaluate(
        &self,
        _session: &ParticipantSession,
        request: EvaluationRequest,
    ) -> Result<Vec<EvaluationScore>, GatewayError> {
        lock(&self.state).evaluations.pop_front().unwrap_or_else(|| {
            Err(GatewayError::Unavailable(format!(
                "no scorer configured for {}",
                request.step_id
            )))
        })
    }
}
