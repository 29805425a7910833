//! Flow Execution Engine.
//!
//! Owns one participant's current step and drives the advance protocol
//! against the [`FlowGateway`]. The server decides what comes next; the
//! engine only walks items inside a randomizer on its own.
//!
//! Operations take `&mut self`, so a participant can never have two
//! advance calls in flight at once.

use std::sync::Arc;
use tokio::sync::mpsc;

use super::errors::FlowError;
use super::events::{FlowEvent, FlowEventKind, FlowEventReceiver, FlowEventSender};
use super::timers::TimerSet;
use crate::domain::execution::{
    ActiveStep, AiEvaluationMode, FlowState, ItemRuntime, StepDescriptor, StepRuntime, Surface,
};
use crate::domain::flow::{ChatDefaults, Question, RandomizerItem, Step};
use crate::domain::foundation::ParticipantSession;
use crate::domain::randomization::{entropy_rng, FlowRng};
use crate::domain::response::{QuestionResponse, ResponsePayload, SurveyAnswers};
use crate::domain::survey::collect_responses;
use crate::ports::{
    AdvanceOutcome, AdvanceRequest, ChatSurface, CurrentStepOutcome, EvaluationRequest,
    FlowGateway, ParticipantShell,
};

/// External collaborators of the engine.
pub struct EngineDeps {
    pub gateway: Arc<dyn FlowGateway>,
    pub shell: Arc<dyn ParticipantShell>,
    pub chat: Arc<dyn ChatSurface>,
    pub rng: FlowRng,
}

impl EngineDeps {
    pub fn new(
        gateway: Arc<dyn FlowGateway>,
        shell: Arc<dyn ParticipantShell>,
        chat: Arc<dyn ChatSurface>,
    ) -> Self {
        Self {
            gateway,
            shell,
            chat,
            rng: entropy_rng(),
        }
    }

    pub fn with_rng(mut self, rng: FlowRng) -> Self {
        self.rng = rng;
        self
    }
}

/// Tunables of the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineOptions {
    /// Bound on consecutive advances that need no participant action.
    pub max_auto_advances: u32,
    pub ai_evaluation: AiEvaluationMode,
    pub ai_evaluation_max_attempts: u32,
    pub chat_defaults: ChatDefaults,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            max_auto_advances: 32,
            ai_evaluation: AiEvaluationMode::Placeholder,
            ai_evaluation_max_attempts: 3,
            chat_defaults: ChatDefaults::default(),
        }
    }
}

/// What a participant action on the current step resolves to.
enum StepAction {
    Advance(Option<ResponsePayload>),
    NextItem(Vec<QuestionResponse>),
}

pub struct FlowEngine {
    session: ParticipantSession,
    gateway: Arc<dyn FlowGateway>,
    shell: Arc<dyn ParticipantShell>,
    chat: Arc<dyn ChatSurface>,
    rng: FlowRng,
    options: EngineOptions,
    state: FlowState,
    active: Option<ActiveStep>,
    total_steps: usize,
    surface: Surface,
    epoch: u64,
    timers: TimerSet,
    events: FlowEventSender,
}

impl FlowEngine {
    /// Creates an engine for one participant session. Timer events arrive
    /// on the returned receiver and are fed back through
    /// [`FlowEngine::handle_event`].
    pub fn new(
        session: ParticipantSession,
        deps: EngineDeps,
        options: EngineOptions,
    ) -> (Self, FlowEventReceiver) {
        let (events, receiver) = mpsc::unbounded_channel();
        let engine = Self {
            session,
            gateway: deps.gateway,
            shell: deps.shell,
            chat: deps.chat,
            rng: deps.rng,
            options,
            state: FlowState::Uninitialized,
            active: None,
            total_steps: 0,
            surface: Surface::Flow,
            epoch: 0,
            timers: TimerSet::new(),
            events,
        };
        (engine, receiver)
    }

    pub fn session(&self) -> &ParticipantSession {
        &self.session
    }

    pub fn state(&self) -> FlowState {
        self.state
    }

    /// 0-based server index of the current step.
    pub fn current_step_index(&self) -> Option<usize> {
        self.active.as_ref().map(|active| active.index)
    }

    pub fn total_steps(&self) -> usize {
        self.total_steps
    }

    pub fn surface(&self) -> Surface {
        self.surface
    }

    pub fn active_step(&self) -> Option<&ActiveStep> {
        self.active.as_ref()
    }

    /// Resolves where the participant is from the server.
    ///
    /// A transport failure is not surfaced: the engine falls back to
    /// [`FlowState::NoFlow`] and logs the failure.
    pub async fn initialize(&mut self) -> Result<FlowState, FlowError> {
        if self.state.is_terminal() {
            return Err(FlowError::Terminal);
        }
        self.leave_step();
        self.active = None;

        let outcome = match self.gateway.current_step(&self.session).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(
                    session_id = %self.session.session_id,
                    participant_id = %self.session.participant_id,
                    error = %e,
                    "Failed to load current step, falling back to no flow"
                );
                self.state = FlowState::NoFlow;
                return Ok(self.state);
            }
        };

        match outcome {
            CurrentStepOutcome::NoFlow => {
                tracing::info!(session_id = %self.session.session_id, "No flow configured for session");
                self.state = FlowState::NoFlow;
            }
            CurrentStepOutcome::AlreadyCompleted => {
                tracing::info!(
                    session_id = %self.session.session_id,
                    participant_id = %self.session.participant_id,
                    "Participant already completed the flow"
                );
                self.state = FlowState::AlreadyCompleted;
                self.set_surface(Surface::Flow);
            }
            CurrentStepOutcome::Completed => self.finish(),
            CurrentStepOutcome::Active {
                step,
                current_step_index,
                total_steps,
            } => {
                self.total_steps = total_steps;
                self.enter_step(step, current_step_index).await;
                self.settle().await?;
            }
        }
        Ok(self.state)
    }

    /// Descriptor of what the participant should see now. States without
    /// a screen produce `None`.
    ///
    /// A branch or exhausted randomizer is only still current when its
    /// automatic advance failed; it is described as a pending advance.
    pub fn show_current_step(&self) -> Option<StepDescriptor> {
        match self.state {
            FlowState::AlreadyCompleted => Some(StepDescriptor::already_completed()),
            FlowState::AllCompleted => Some(StepDescriptor::all_completed()),
            FlowState::Active => self.active.as_ref().and_then(|active| {
                if active.needs_auto_advance() {
                    Some(StepDescriptor::advance_pending(active, self.total_steps))
                } else {
                    StepDescriptor::for_active(active, self.total_steps)
                }
            }),
            FlowState::Uninitialized | FlowState::NoFlow => None,
        }
    }

    /// Commits the current step with `response` and moves to whatever the
    /// server returns.
    pub async fn advance_to_next_step(
        &mut self,
        response: Option<ResponsePayload>,
    ) -> Result<FlowState, FlowError> {
        self.ensure_active()?;
        self.commit(response).await?;
        self.settle().await?;
        Ok(self.state)
    }

    /// The single advance control of document-like screens.
    ///
    /// Also retries an advance that did not go through without participant
    /// input: the automatic advance of a branch or exhausted randomizer, and
    /// the advance of a chat whose time limit has fired.
    pub async fn acknowledge(&mut self) -> Result<FlowState, FlowError> {
        self.ensure_active()?;
        let active = self.active.as_ref().ok_or(FlowError::NotActive)?;
        if active.needs_auto_advance() {
            tracing::info!(step_id = %active.step.step_id(), "Retrying automatic advance");
            self.settle().await?;
            return Ok(self.state);
        }
        if let Some(gate) = active.dwell_gate() {
            if !gate.is_open() {
                return Err(FlowError::DwellGateClosed {
                    remaining: gate.remaining_seconds(),
                });
            }
        }

        let action = match (&active.step, &active.runtime) {
            (Step::Consent(_) | Step::Instruction(_) | Step::Debriefing(_), _) => {
                StepAction::Advance(None)
            }
            (Step::AiEvaluation(_), StepRuntime::AiEvaluation(attempts))
                if attempts.mode == AiEvaluationMode::Placeholder =>
            {
                StepAction::Advance(None)
            }
            (Step::Chat(_), _) if active.chat_time_limit_reached() => {
                tracing::info!(step_id = %active.step.step_id(), "Retrying chat advance");
                StepAction::Advance(None)
            }
            (Step::SurveyRandomizer(randomizer), StepRuntime::Randomizer(run))
                if matches!(run.current_runtime(), Some(ItemRuntime::Instruction(_))) =>
            {
                if run.is_last_item(randomizer) {
                    StepAction::Advance(Some(run.completion_payload(&[])))
                } else {
                    StepAction::NextItem(Vec::new())
                }
            }
            (step, _) => {
                return Err(FlowError::InvalidOperation {
                    operation: "acknowledge",
                    kind: step.kind(),
                })
            }
        };
        self.perform(action).await
    }

    /// Validates and submits the current survey, or the current survey
    /// item of a randomizer.
    pub async fn submit_survey(&mut self, answers: &SurveyAnswers) -> Result<FlowState, FlowError> {
        self.ensure_active()?;
        let active = self.active.as_ref().ok_or(FlowError::NotActive)?;

        let action = match (&active.step, &active.runtime) {
            (Step::Survey(survey), StepRuntime::Survey(plan)) => {
                let presented: Vec<&Question> = plan.presented(&survey.survey_questions).collect();
                let survey_responses = validated(&presented, answers, &active.step)?;
                StepAction::Advance(Some(ResponsePayload::Survey {
                    survey_responses,
                    question_order: plan.question_order(&survey.survey_questions),
                }))
            }
            (Step::SurveyRandomizer(randomizer), StepRuntime::Randomizer(run)) => {
                match (run.current_item(randomizer), run.current_runtime()) {
                    (Some(RandomizerItem::Survey(survey)), Some(ItemRuntime::Survey(plan))) => {
                        let presented: Vec<&Question> =
                            plan.presented(&survey.survey_questions).collect();
                        let responses = validated(&presented, answers, &active.step)?;
                        let tagged = run.tag_responses(randomizer, responses);
                        if run.is_last_item(randomizer) {
                            StepAction::Advance(Some(run.completion_payload(&tagged)))
                        } else {
                            StepAction::NextItem(tagged)
                        }
                    }
                    _ => {
                        return Err(FlowError::InvalidOperation {
                            operation: "submit_survey",
                            kind: active.step.kind(),
                        })
                    }
                }
            }
            (step, _) => {
                return Err(FlowError::InvalidOperation {
                    operation: "submit_survey",
                    kind: step.kind(),
                })
            }
        };
        self.perform(action).await
    }

    /// Scores the current evaluation step through the gateway.
    ///
    /// A failure is recorded against the step's attempt budget and returned.
    /// No score is ever invented.
    pub async fn run_ai_evaluation(&mut self) -> Result<FlowState, FlowError> {
        self.ensure_active()?;
        let active = self.active.as_ref().ok_or(FlowError::NotActive)?;
        let request = match (&active.step, &active.runtime) {
            (Step::AiEvaluation(evaluation), StepRuntime::AiEvaluation(attempts))
                if attempts.mode == AiEvaluationMode::Scoring =>
            {
                if !attempts.can_retry() {
                    return Err(FlowError::AttemptsExhausted {
                        max_attempts: attempts.max_attempts(),
                    });
                }
                EvaluationRequest {
                    step_id: evaluation.step_id.clone(),
                    evaluation_model: evaluation.evaluation_model.clone(),
                    context_prompt: evaluation.context_prompt.clone(),
                    questions: evaluation.evaluation_questions.clone(),
                }
            }
            (step, _) => {
                return Err(FlowError::InvalidOperation {
                    operation: "run_ai_evaluation",
                    kind: step.kind(),
                })
            }
        };

        let step_id = request.step_id.clone();
        match self.gateway.evaluate(&self.session, request).await {
            Ok(scores) => {
                tracing::info!(step_id = %step_id, scores = scores.len(), "AI evaluation scored");
                self.advance_to_next_step(Some(ResponsePayload::AiEvaluation {
                    ai_evaluation: scores,
                    ai_evaluation_skipped: false,
                }))
                .await
            }
            Err(e) => {
                if let Some(ActiveStep {
                    runtime: StepRuntime::AiEvaluation(attempts),
                    ..
                }) = self.active.as_mut()
                {
                    attempts.record_failure(e.to_string());
                    tracing::warn!(
                        step_id = %step_id,
                        failures = attempts.failures(),
                        max_attempts = attempts.max_attempts(),
                        error = %e,
                        "AI evaluation failed"
                    );
                }
                Err(FlowError::Gateway(e))
            }
        }
    }

    /// Leaves an evaluation step without scores once every attempt failed.
    /// The skip is recorded in the submitted payload.
    pub async fn skip_ai_evaluation(&mut self) -> Result<FlowState, FlowError> {
        self.ensure_active()?;
        let active = self.active.as_ref().ok_or(FlowError::NotActive)?;
        match (&active.step, &active.runtime) {
            (Step::AiEvaluation(_), StepRuntime::AiEvaluation(attempts))
                if attempts.mode == AiEvaluationMode::Scoring =>
            {
                if !attempts.can_skip() {
                    return Err(FlowError::SkipNotAllowed {
                        failures: attempts.failures(),
                        max_attempts: attempts.max_attempts(),
                    });
                }
                tracing::warn!(
                    step_id = %active.step.step_id(),
                    failures = attempts.failures(),
                    "AI evaluation skipped after failed attempts"
                );
            }
            (step, _) => {
                return Err(FlowError::InvalidOperation {
                    operation: "skip_ai_evaluation",
                    kind: step.kind(),
                })
            }
        }
        self.advance_to_next_step(Some(ResponsePayload::AiEvaluation {
            ai_evaluation: Vec::new(),
            ai_evaluation_skipped: true,
        }))
        .await
    }

    /// Applies a timer event. Returns true when the screen changed.
    ///
    /// Events from a step instance that has since been left are ignored.
    pub async fn handle_event(&mut self, event: FlowEvent) -> Result<bool, FlowError> {
        if event.epoch != self.epoch || self.state != FlowState::Active {
            tracing::debug!(epoch = event.epoch, current = self.epoch, "Ignoring stale timer event");
            return Ok(false);
        }

        match event.kind {
            FlowEventKind::DwellTick => {
                let Some(gate) = self.active.as_mut().and_then(ActiveStep::dwell_gate_mut) else {
                    return Ok(false);
                };
                if gate.tick() {
                    tracing::debug!("Dwell gate opened");
                }
                Ok(true)
            }
            FlowEventKind::ChatTimeLimitReached => {
                let Some(active) = self.active.as_mut() else {
                    return Ok(false);
                };
                let minutes = match &active.step {
                    Step::Chat(chat) => chat.time_limit_minutes.unwrap_or_default(),
                    _ => return Ok(false),
                };
                if !active.mark_chat_time_limit_reached() {
                    return Ok(false);
                }
                tracing::info!(minutes, "Chat time limit reached");
                self.chat.show_system_notice(&format!(
                    "Time limit reached ({} minutes). Moving to next step...",
                    minutes
                ));
                self.chat.close_transport();
                self.advance_to_next_step(None).await?;
                Ok(true)
            }
        }
    }

    fn ensure_active(&self) -> Result<(), FlowError> {
        match self.state {
            FlowState::Active => Ok(()),
            state if state.is_terminal() => Err(FlowError::Terminal),
            _ => Err(FlowError::NotActive),
        }
    }

    async fn perform(&mut self, action: StepAction) -> Result<FlowState, FlowError> {
        match action {
            StepAction::Advance(response) => self.advance_to_next_step(response).await,
            StepAction::NextItem(responses) => {
                self.next_randomizer_item(responses);
                self.settle().await?;
                Ok(self.state)
            }
        }
    }

    /// One advance round trip. Local state changes only after the server
    /// accepted the transition.
    async fn commit(&mut self, response: Option<ResponsePayload>) -> Result<(), FlowError> {
        let active = self.active.as_ref().ok_or(FlowError::NotActive)?;
        let step_id = active.step.step_id().to_string();
        let from_index = active.index;
        let payload = response.as_ref().map_or("none", ResponsePayload::label);

        let outcome = self
            .gateway
            .advance(&self.session, AdvanceRequest::new(step_id.clone(), response))
            .await
            .map_err(|e| {
                tracing::warn!(step_id = %step_id, step_index = from_index, error = %e, "Advance failed");
                e
            })?;

        match outcome {
            AdvanceOutcome::Completed => {
                tracing::info!(step_id = %step_id, payload, "Final step committed");
                self.finish();
            }
            AdvanceOutcome::Next {
                next_step,
                current_step_index,
                total_steps,
            } => {
                if current_step_index <= from_index {
                    tracing::error!(
                        step_index = from_index,
                        returned = current_step_index,
                        "Server returned a non-increasing step index"
                    );
                    return Err(FlowError::ProtocolViolation(format!(
                        "step index went from {} to {}",
                        from_index, current_step_index
                    )));
                }
                tracing::info!(
                    step_id = %step_id,
                    step_index = from_index,
                    next_index = current_step_index,
                    payload,
                    "Step committed"
                );
                self.total_steps = total_steps
                    .unwrap_or(self.total_steps)
                    .max(current_step_index + 1);
                self.enter_step(next_step, current_step_index).await;
            }
        }
        Ok(())
    }

    /// Advances through steps that need no participant action.
    async fn settle(&mut self) -> Result<(), FlowError> {
        let mut hops = 0;
        loop {
            let response = match self.active.as_ref() {
                Some(active) if self.state == FlowState::Active && active.needs_auto_advance() => {
                    match (&active.step, &active.runtime) {
                        (Step::SurveyRandomizer(_), StepRuntime::Randomizer(run)) => {
                            Some(run.completion_payload(&[]))
                        }
                        _ => None,
                    }
                }
                _ => return Ok(()),
            };
            if hops >= self.options.max_auto_advances {
                return Err(FlowError::ProtocolViolation(format!(
                    "more than {} consecutive automatic advances",
                    self.options.max_auto_advances
                )));
            }
            hops += 1;
            tracing::debug!(hops, "Auto-advancing");
            self.commit(response).await?;
        }
    }

    async fn enter_step(&mut self, step: Step, index: usize) {
        self.leave_step();

        let chat_setup = match &step {
            Step::Chat(chat) => Some((
                chat.chat_configuration(&self.options.chat_defaults),
                chat.banner().map(str::to_string),
                chat.time_limit(),
            )),
            _ => None,
        };

        let active = ActiveStep::enter(
            step,
            index,
            self.options.ai_evaluation,
            self.options.ai_evaluation_max_attempts,
            &mut self.rng,
        );
        tracing::info!(
            step_id = %active.step.step_id(),
            step_type = %active.step.kind(),
            step_index = index,
            total_steps = self.total_steps,
            "Entered step"
        );
        self.active = Some(active);
        self.state = FlowState::Active;
        self.log_skipped_items();

        match chat_setup {
            Some((configuration, banner, limit)) => {
                self.set_surface(Surface::Chat);
                if let Err(e) = self
                    .gateway
                    .configure_chat(&self.session.session_id, &configuration)
                    .await
                {
                    tracing::error!(error = %e, model = %configuration.bot_model, "Failed to configure chat");
                }
                if let Some(banner) = banner {
                    self.chat.show_banner(&banner);
                }
                if let Some(limit) = limit {
                    self.timers
                        .start_chat_limit(self.events.clone(), self.epoch, limit);
                }
            }
            None => self.set_surface(Surface::Flow),
        }
        self.start_dwell_countdown();
    }

    fn next_randomizer_item(&mut self, responses: Vec<QuestionResponse>) {
        self.leave_step();
        if let Some(ActiveStep {
            step: Step::SurveyRandomizer(randomizer),
            runtime: StepRuntime::Randomizer(run),
            ..
        }) = self.active.as_mut()
        {
            run.complete_item(randomizer, responses, &mut self.rng);
            let (position, count) = run.position();
            tracing::debug!(position, count, "Next randomizer item");
        }
        self.log_skipped_items();
        self.start_dwell_countdown();
    }

    fn log_skipped_items(&mut self) {
        if let Some(ActiveStep {
            step,
            runtime: StepRuntime::Randomizer(run),
            ..
        }) = self.active.as_mut()
        {
            for item_id in run.take_skipped() {
                tracing::warn!(
                    step_id = %step.step_id(),
                    item_id = %item_id,
                    "Skipping unsupported randomizer item"
                );
            }
        }
    }

    fn start_dwell_countdown(&mut self) {
        let remaining = self
            .active
            .as_ref()
            .and_then(ActiveStep::dwell_gate)
            .filter(|gate| !gate.is_open())
            .map(|gate| gate.remaining_seconds());
        if let Some(seconds) = remaining {
            self.timers
                .start_dwell_countdown(self.events.clone(), self.epoch, seconds);
        }
    }

    /// Cancels the timers of the current screen and invalidates their
    /// pending events.
    fn leave_step(&mut self) {
        self.timers.cancel_all();
        self.epoch += 1;
    }

    fn finish(&mut self) {
        self.leave_step();
        self.active = None;
        self.state = FlowState::AllCompleted;
        tracing::info!(
            session_id = %self.session.session_id,
            participant_id = %self.session.participant_id,
            "Flow completed"
        );
        self.set_surface(Surface::Flow);
        self.shell.clear_local_state();
        self.shell.exit_experiment();
    }

    fn set_surface(&mut self, surface: Surface) {
        self.surface = surface;
        self.shell.set_surface(surface);
    }
}

fn validated(
    presented: &[&Question],
    answers: &SurveyAnswers,
    step: &Step,
) -> Result<Vec<QuestionResponse>, FlowError> {
    collect_responses(presented, answers).map_err(|e| {
        tracing::debug!(step_id = %step.step_id(), question_id = %e.question_id(), "Survey validation failed");
        FlowError::Validation(e)
    })
}
