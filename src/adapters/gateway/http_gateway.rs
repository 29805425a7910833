//! HTTP Flow Gateway - FlowGateway over the experiment server's JSON API.
//!
//! # Endpoints
//!
//! - `GET  /api/sessions/{session_id}/flow/current?client_id=...`
//! - `POST /api/sessions/{session_id}/flow/advance`
//! - `POST /api/sessions/{session_id}/chat/configure`
//! - `POST /api/sessions/{session_id}/flow/evaluate`
//!
//! Requests are never retried here. The engine decides what a failure
//! means for the participant.

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;

use super::dto::{
    AdvanceBody, AdvanceResponse, CurrentStepResponse, EvaluateBody, EvaluateResponse,
};
use crate::domain::flow::ChatConfiguration;
use crate::domain::foundation::{ParticipantSession, SessionId};
use crate::domain::response::EvaluationScore;
use crate::ports::{
    AdvanceOutcome, AdvanceRequest, CurrentStepOutcome, EvaluationRequest, FlowGateway,
    GatewayError,
};

/// Configuration for the HTTP gateway.
#[derive(Debug, Clone)]
pub struct HttpGatewayConfig {
    /// Server origin, without trailing slash.
    pub base_url: String,
    pub timeout: Duration,
}

impl HttpGatewayConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

pub struct HttpFlowGateway {
    config: HttpGatewayConfig,
    client: Client,
}

impl HttpFlowGateway {
    pub fn new(config: HttpGatewayConfig) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| GatewayError::Network(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { config, client })
    }

    fn session_url(&self, session_id: &SessionId, path: &str) -> String {
        format!(
            "{}/api/sessions/{}/{}",
            self.config.base_url,
            session_id.as_str(),
            path
        )
    }

    fn transport_error(&self, error: reqwest::Error) -> GatewayError {
        if error.is_timeout() {
            GatewayError::Timeout {
                secs: self.config.timeout.as_secs(),
            }
        } else if error.is_connect() {
            GatewayError::Network(format!("Connection failed: {}", error))
        } else {
            GatewayError::Network(error.to_string())
        }
    }

    /// Maps non-success statuses onto gateway errors.
    async fn handle_response_status(&self, response: Response) -> Result<Response, GatewayError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(status_error(status.as_u16(), body))
    }

    async fn read_json<T: DeserializeOwned>(&self, response: Response) -> Result<T, GatewayError> {
        let response = self.handle_response_status(response).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| GatewayError::Parse(e.to_string()))
    }
}

fn status_error(status: u16, body: String) -> GatewayError {
    match status {
        409 => GatewayError::Conflict(body),
        404 => GatewayError::NotFound(body),
        _ => GatewayError::Status { status, body },
    }
}

#[async_trait]
impl FlowGateway for HttpFlowGateway {
    async fn current_step(
        &self,
        session: &ParticipantSession,
    ) -> Result<CurrentStepOutcome, GatewayError> {
        let response = self
            .client
            .get(self.session_url(&session.session_id, "flow/current"))
            .query(&[("client_id", session.participant_id.as_str())])
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let body: CurrentStepResponse = self.read_json(response).await?;
        body.try_into()
    }

    async fn advance(
        &self,
        session: &ParticipantSession,
        request: AdvanceRequest,
    ) -> Result<AdvanceOutcome, GatewayError> {
        let body = AdvanceBody {
            client_id: session.participant_id.as_str(),
            step_id: request.step_id.as_deref(),
            response: request.response.as_ref(),
        };
        let response = self
            .client
            .post(self.session_url(&session.session_id, "flow/advance"))
            .json(&body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let body: AdvanceResponse = self.read_json(response).await?;
        body.try_into()
    }

    async fn configure_chat(
        &self,
        session_id: &SessionId,
        configuration: &ChatConfiguration,
    ) -> Result<(), GatewayError> {
        let response = self
            .client
            .post(self.session_url(session_id, "chat/configure"))
            .json(configuration)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        self.handle_response_status(response).await?;
        Ok(())
    }

    async fn evaluate(
        &self,
        session: &ParticipantSession,
        request: EvaluationRequest,
    ) -> Result<Vec<EvaluationScore>, GatewayError> {
        let body = EvaluateBody {
            client_id: session.participant_id.as_str(),
            step_id: &request.step_id,
            evaluation_model: &request.evaluation_model,
            context_prompt: &request.context_prompt,
            questions: &request.questions,
        };
        let response = self
            .client
            .post(self.session_url(&session.session_id, "flow/evaluate"))
            .json(&body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let body: EvaluateResponse = self.read_json(response).await?;
        Ok(body.scores)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::ParticipantId;

    fn session() -> ParticipantSession {
        ParticipantSession::new(
            SessionId::new("sess-1").unwrap(),
            ParticipantId::new("client-9").unwrap(),
        )
    }

    #[test]
    fn config_builder_works() {
        let config = HttpGatewayConfig::new("http://localhost:8000/")
            .with_timeout(Duration::from_secs(5));
        assert_eq!(config.base_url, "http://localhost:8000");
        assert_eq!(config.timeout, Duration::from_secs(5));
    }

    #[test]
    fn session_urls_are_scoped_by_session() {
        let gateway = HttpFlowGateway::new(HttpGatewayConfig::new("http://localhost:8000")).unwrap();
        assert_eq!(
            gateway.session_url(&session().session_id, "flow/advance"),
            "http://localhost:8000/api/sessions/sess-1/flow/advance"
        );
    }

    #[test]
    fn status_mapping() {
        assert!(matches!(status_error(409, "stale".into()), GatewayError::Conflict(b) if b == "stale"));
        assert!(matches!(status_error(404, String::new()), GatewayError::NotFound(_)));
        assert!(matches!(
            status_error(500, String::new()),
            GatewayError::Status { status: 500, .. }
        ));
    }

    #[tokio::test]
    async fn unreachable_server_is_a_network_error() {
        let gateway = HttpFlowGateway::new(
            HttpGatewayConfig::new("http://127.0.0.1:9").with_timeout(Duration::from_secs(2)),
        )
        .unwrap();
        let err = gateway.current_step(&session()).await.unwrap_err();
        assert!(
            matches!(err, GatewayError::Network(_) | GatewayError::Timeout { .. }),
            "unexpected error {err:?}"
        );
    }
}
