//! Wire shapes of the flow HTTP endpoints.

use serde::{Deserialize, Serialize};

use crate::domain::flow::{Question, Step};
use crate::domain::response::{EvaluationScore, ResponsePayload};
use crate::ports::{AdvanceOutcome, CurrentStepOutcome, GatewayError};

/// `GET /api/sessions/{id}/flow/current` response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CurrentStepResponse {
    #[serde(default)]
    pub has_flow: bool,
    #[serde(default)]
    pub already_completed: bool,
    #[serde(default)]
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_step: Option<Step>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_step_index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_steps: Option<usize>,
}

impl TryFrom<CurrentStepResponse> for CurrentStepOutcome {
    type Error = GatewayError;

    fn try_from(response: CurrentStepResponse) -> Result<Self, Self::Error> {
        // A completed participant may be reported with or without has_flow.
        if response.already_completed {
            return Ok(CurrentStepOutcome::AlreadyCompleted);
        }
        if !response.has_flow {
            return Ok(CurrentStepOutcome::NoFlow);
        }
        if response.completed {
            return Ok(CurrentStepOutcome::Completed);
        }
        let step = response
            .current_step
            .ok_or_else(|| GatewayError::Parse("missing current_step".to_string()))?;
        let current_step_index = response.current_step_index.unwrap_or(0);
        let total_steps = response
            .total_steps
            .unwrap_or(current_step_index + 1)
            .max(current_step_index + 1);
        Ok(CurrentStepOutcome::Active {
            step,
            current_step_index,
            total_steps,
        })
    }
}

/// `POST /api/sessions/{id}/flow/advance` body.
#[derive(Debug, Serialize)]
pub struct AdvanceBody<'a> {
    pub client_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step_id: Option<&'a str>,
    pub response: Option<&'a ResponsePayload>,
}

/// `POST /api/sessions/{id}/flow/advance` response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdvanceResponse {
    #[serde(default)]
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_step: Option<Step>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_step_index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_steps: Option<usize>,
}

impl TryFrom<AdvanceResponse> for AdvanceOutcome {
    type Error = GatewayError;

    fn try_from(response: AdvanceResponse) -> Result<Self, Self::Error> {
        if response.completed {
            return Ok(AdvanceOutcome::Completed);
        }
        match (response.next_step, response.current_step_index) {
            (Some(next_step), Some(current_step_index)) => Ok(AdvanceOutcome::Next {
                next_step,
                current_step_index,
                total_steps: response.total_steps,
            }),
            (None, _) => Err(GatewayError::Parse("missing next_step".to_string())),
            (_, None) => Err(GatewayError::Parse("missing current_step_index".to_string())),
        }
    }
}

/// `POST /api/sessions/{id}/flow/evaluate` body.
#[derive(Debug, Serialize)]
pub struct EvaluateBody<'a> {
    pub client_id: &'a str,
    pub step_id: &'a str,
    pub evaluation_model: &'a str,
    pub context_prompt: &'a str,
    pub questions: &'a [Question],
}

/// `POST /api/sessions/{id}/flow/evaluate` response.
#[derive(Debug, Clone, Deserialize)]
pub struct EvaluateResponse {
    #[serde(default)]
    pub scores: Vec<EvaluationScore>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn current(value: serde_json::Value) -> Result<CurrentStepOutcome, GatewayError> {
        serde_json::from_value::<CurrentStepResponse>(value)
            .unwrap()
            .try_into()
    }

    #[test]
    fn no_flow_response() {
        assert_eq!(current(json!({"has_flow": false})), Ok(CurrentStepOutcome::NoFlow));
    }

    #[test]
    fn already_completed_takes_precedence() {
        assert_eq!(
            current(json!({"has_flow": true, "already_completed": true})),
            Ok(CurrentStepOutcome::AlreadyCompleted)
        );
        assert_eq!(
            current(json!({"already_completed": true})),
            Ok(CurrentStepOutcome::AlreadyCompleted)
        );
    }

    #[test]
    fn completed_response() {
        assert_eq!(
            current(json!({"has_flow": true, "completed": true})),
            Ok(CurrentStepOutcome::Completed)
        );
    }

    #[test]
    fn active_response_carries_step_and_progress() {
        let outcome = current(json!({
            "has_flow": true,
            "completed": false,
            "current_step": {"step_type": "consent", "step_id": "c1", "content": "ok"},
            "current_step_index": 0,
            "total_steps": 4
        }))
        .unwrap();
        match outcome {
            CurrentStepOutcome::Active {
                step,
                current_step_index,
                total_steps,
            } => {
                assert_eq!(step.step_id(), "c1");
                assert_eq!(current_step_index, 0);
                assert_eq!(total_steps, 4);
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn active_response_without_step_is_a_parse_error() {
        assert!(matches!(
            current(json!({"has_flow": true, "completed": false})),
            Err(GatewayError::Parse(_))
        ));
    }

    #[test]
    fn advance_response_mapping() {
        let done: AdvanceOutcome = serde_json::from_value::<AdvanceResponse>(json!({"completed": true}))
            .unwrap()
            .try_into()
            .unwrap();
        assert_eq!(done, AdvanceOutcome::Completed);

        let next: AdvanceOutcome = serde_json::from_value::<AdvanceResponse>(json!({
            "completed": false,
            "next_step": {"step_type": "debriefing", "step_id": "d1", "content": "bye"},
            "current_step_index": 3
        }))
        .unwrap()
        .try_into()
        .unwrap();
        assert!(matches!(
            next,
            AdvanceOutcome::Next { current_step_index: 3, total_steps: None, .. }
        ));
    }

    #[test]
    fn advance_body_serializes_null_response() {
        let body = AdvanceBody {
            client_id: "p1",
            step_id: Some("b1"),
            response: None,
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({"client_id": "p1", "step_id": "b1", "response": null})
        );
    }
}
