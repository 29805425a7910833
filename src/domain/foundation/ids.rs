//! Strongly-typed identifier value objects.
//!
//! Session and participant identifiers are issued outside this crate (by the
//! login flow and the session manager), so they wrap opaque strings instead
//! of generated UUIDs.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::ValidationError;

/// Identifier of an experiment session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Creates a SessionId, rejecting blank input.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(ValidationError::empty_field("session_id"));
        }
        Ok(Self(value))
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SessionId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// Identifier of one participant (the `client_id` on the wire).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(String);

impl ParticipantId {
    /// Creates a ParticipantId, rejecting blank input.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(ValidationError::empty_field("participant_id"));
        }
        Ok(Self(value))
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ParticipantId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// The participant identity every gateway call is scoped to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParticipantSession {
    pub session_id: SessionId,
    pub participant_id: ParticipantId,
}

impl ParticipantSession {
    pub fn new(session_id: SessionId, participant_id: ParticipantId) -> Self {
        Self {
            session_id,
            participant_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_id_rejects_blank() {
        assert!(SessionId::new("").is_err());
        assert!(SessionId::new("   ").is_err());
    }

    #[test]
    fn session_id_round_trips_through_display() {
        let id: SessionId = "abc-123".parse().unwrap();
        assert_eq!(id.to_string(), "abc-123");
        assert_eq!(id.as_str(), "abc-123");
    }

    #[test]
    fn participant_id_rejects_blank() {
        let err = ParticipantId::new("").unwrap_err();
        assert_eq!(err, ValidationError::empty_field("participant_id"));
    }

    #[test]
    fn participant_session_serializes_both_ids() {
        let session = ParticipantSession::new(
            SessionId::new("s-1").unwrap(),
            ParticipantId::new("p-1").unwrap(),
        );
        let json = serde_json::to_value(&session).unwrap();
        assert_eq!(json["session_id"], "s-1");
        assert_eq!(json["participant_id"], "p-1");
    }

    #[test]
    fn participant_id_serializes_transparently() {
        let id = ParticipantId::new("p-42").unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"p-42\"");
    }
}
