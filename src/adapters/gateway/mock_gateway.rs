//! Mock Flow Gateway for testing.
//!
//! Scripted outcomes are consumed in order, one queue per operation.
//! Every call is recorded so tests can assert on exactly what the engine
//! sent to the server.
//!
//! # Example
//!
//! ```ignore
//! let gateway = MockFlowGateway::new()
//!     .with_current_step(CurrentStepOutcome::Completed);
//!
//! engine.initialize().await?;
//! assert_eq!(gateway.call_count(), 1);
//! ```

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::domain::flow::ChatConfiguration;
use crate::domain::foundation::{ParticipantSession, SessionId};
use crate::domain::response::EvaluationScore;
use crate::ports::{
    AdvanceOutcome, AdvanceRequest, CurrentStepOutcome, EvaluationRequest, FlowGateway,
    GatewayError,
};

/// A recorded gateway call.
#[derive(Debug, Clone, PartialEq)]
pub enum GatewayCall {
    CurrentStep,
    Advance(AdvanceRequest),
    ConfigureChat(ChatConfiguration),
    Evaluate(EvaluationRequest),
}

#[derive(Debug, Default)]
struct Script {
    current: VecDeque<Result<CurrentStepOutcome, GatewayError>>,
    advances: VecDeque<Result<AdvanceOutcome, GatewayError>>,
    configures: VecDeque<Result<(), GatewayError>>,
    evaluations: VecDeque<Result<Vec<EvaluationScore>, GatewayError>>,
}

/// Mock gateway with scripted responses and call tracking.
#[derive(Debug, Clone, Default)]
pub struct MockFlowGateway {
    script: Arc<Mutex<Script>>,
    calls: Arc<Mutex<Vec<GatewayCall>>>,
    delay: Duration,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MockFlowGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_current_step(self, outcome: CurrentStepOutcome) -> Self {
        lock(&self.script).current.push_back(Ok(outcome));
        self
    }

    pub fn with_current_step_error(self, error: GatewayError) -> Self {
        lock(&self.script).current.push_back(Err(error));
        self
    }

    pub fn with_advance(self, outcome: AdvanceOutcome) -> Self {
        lock(&self.script).advances.push_back(Ok(outcome));
        self
    }

    pub fn with_advance_error(self, error: GatewayError) -> Self {
        lock(&self.script).advances.push_back(Err(error));
        self
    }

    pub fn with_configure_error(self, error: GatewayError) -> Self {
        lock(&self.script).configures.push_back(Err(error));
        self
    }

    pub fn with_scores(self, scores: Vec<EvaluationScore>) -> Self {
        lock(&self.script).evaluations.push_back(Ok(scores));
        self
    }

    pub fn with_evaluation_error(self, error: GatewayError) -> Self {
        lock(&self.script).evaluations.push_back(Err(error));
        self
    }

    /// Simulated latency per call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> Vec<GatewayCall> {
        lock(&self.calls).clone()
    }

    pub fn advance_calls(&self) -> Vec<AdvanceRequest> {
        lock(&self.calls)
            .iter()
            .filter_map(|call| match call {
                GatewayCall::Advance(request) => Some(request.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }

    fn record(&self, call: GatewayCall) {
        lock(&self.calls).push(call);
    }

    async fn simulate_latency(&self) {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }
}

fn unscripted(operation: &str) -> GatewayError {
    GatewayError::Unavailable(format!("no scripted {} response", operation))
}

#[async_trait]
impl FlowGateway for MockFlowGateway {
    async fn current_step(
        &self,
        _session: &ParticipantSession,
    ) -> Result<CurrentStepOutcome, GatewayError> {
        self.record(GatewayCall::CurrentStep);
        self.simulate_latency().await;
        let next = lock(&self.script).current.pop_front();
        next.unwrap_or_else(|| Err(unscripted("current_step")))
    }

    async fn advance(
        &self,
        _session: &ParticipantSession,
        request: AdvanceRequest,
    ) -> Result<AdvanceOutcome, GatewayError> {
        self.record(GatewayCall::Advance(request));
        self.simulate_latency().await;
        let next = lock(&self.script).advances.pop_front();
        next.unwrap_or_else(|| Err(unscripted("advance")))
    }

    async fn configure_chat(
        &self,
        _session_id: &SessionId,
        configuration: &ChatConfiguration,
    ) -> Result<(), GatewayError> {
        self.record(GatewayCall::ConfigureChat(configuration.clone()));
        self.simulate_latency().await;
        let next = lock(&self.script).configures.pop_front();
        next.unwrap_or(Ok(()))
    }

    async fn evaluate(
        &self,
        _session: &ParticipantSession,
        request: EvaluationRequest,
    ) -> Result<Vec<EvaluationScore>, GatewayError> {
        self.record(GatewayCall::Evaluate(request));
        self.simulate_latency().await;
        let next = lock(&self.script).evaluations.pop_front();
        next.unwrap_or_else(|| Err(unscripted("evaluate")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::ParticipantId;

    fn session() -> ParticipantSession {
        ParticipantSession::new(SessionId::new("s").unwrap(), ParticipantId::new("p").unwrap())
    }

    #[tokio::test]
    async fn scripted_outcomes_are_consumed_in_order() {
        let gateway = MockFlowGateway::new()
            .with_current_step(CurrentStepOutcome::NoFlow)
            .with_current_step(CurrentStepOutcome::Completed);

        assert_eq!(gateway.current_step(&session()).await, Ok(CurrentStepOutcome::NoFlow));
        assert_eq!(gateway.current_step(&session()).await, Ok(CurrentStepOutcome::Completed));
        assert!(matches!(
            gateway.current_step(&session()).await,
            Err(GatewayError::Unavailable(_))
        ));
        assert_eq!(gateway.call_count(), 3);
    }

    #[tokio::test]
    async fn advance_calls_are_recorded() {
        let gateway = MockFlowGateway::new().with_advance(AdvanceOutcome::Completed);
        gateway
            .advance(&session(), AdvanceRequest::new("c1", None))
            .await
            .unwrap();
        assert_eq!(gateway.advance_calls(), vec![AdvanceRequest::new("c1", None)]);
    }

    #[tokio::test]
    async fn configure_defaults_to_success() {
        let gateway = MockFlowGateway::new();
        let configuration = crate::domain::flow::ChatStep::new("chat")
            .chat_configuration(&Default::default());
        assert!(gateway
            .configure_chat(&session().session_id, &configuration)
            .await
            .is_ok());
        assert!(matches!(gateway.calls()[0], GatewayCall::ConfigureChat(_)));
    }

    #[tokio::test]
    async fn clones_share_script_and_calls() {
        let gateway = MockFlowGateway::new().with_advance_error(GatewayError::Conflict("x".into()));
        let clone = gateway.clone();
        assert!(clone
            .advance(&session(), AdvanceRequest::default())
            .await
            .is_err());
        assert_eq!(gateway.call_count(), 1);
    }
}
