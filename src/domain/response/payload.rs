use serde::{Deserialize, Serialize};

use super::answer::Answer;
use crate::domain::flow::QuestionType;

fn is_false(value: &bool) -> bool {
    !*value
}

/// One answered question as submitted to the server.
///
/// The `item_*` and `question_index` tags are only present for answers
/// collected inside a survey randomizer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionResponse {
    pub question_id: String,
    pub question_text: String,
    pub question_type: QuestionType,
    pub answer: Option<Answer>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_type: Option<String>,
    /// 1-based position of the item in the shuffled randomizer order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_order: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question_order: Option<Vec<String>>,
    /// 1-based position of the question in `question_order`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question_index: Option<usize>,
}

impl QuestionResponse {
    pub fn new(
        question_id: impl Into<String>,
        question_text: impl Into<String>,
        question_type: QuestionType,
        answer: Option<Answer>,
    ) -> Self {
        Self {
            question_id: question_id.into(),
            question_text: question_text.into(),
            question_type,
            answer,
            item_id: None,
            item_type: None,
            item_order: None,
            question_order: None,
            question_index: None,
        }
    }
}

/// Score returned for one evaluation question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationScore {
    pub question_id: String,
    pub score: i64,
}

/// Body attached to an advance request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResponsePayload {
    Survey {
        survey_responses: Vec<QuestionResponse>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        question_order: Option<Vec<String>>,
    },
    Randomizer {
        randomizer_responses: Vec<QuestionResponse>,
        item_order: Vec<String>,
    },
    AiEvaluation {
        ai_evaluation: Vec<EvaluationScore>,
        #[serde(default, skip_serializing_if = "is_false")]
        ai_evaluation_skipped: bool,
    },
}

impl ResponsePayload {
    /// Wire label used in logs.
    pub fn label(&self) -> &'static str {
        match self {
            ResponsePayload::Survey { .. } => "survey",
            ResponsePayload::Randomizer { .. } => "randomizer",
            ResponsePayload::AiEvaluation { .. } => "ai_evaluation",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn survey_payload_omits_order_when_not_randomized() {
        let payload = ResponsePayload::Survey {
            survey_responses: vec![QuestionResponse::new(
                "q1",
                "Mood",
                QuestionType::Likert,
                Some(Answer::Integer(3)),
            )],
            question_order: None,
        };
        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            json!({"survey_responses":[
                {"question_id":"q1","question_text":"Mood","question_type":"likert","answer":3}
            ]})
        );
    }

    #[test]
    fn unanswered_question_serializes_null() {
        let response = QuestionResponse::new("q2", "Pick", QuestionType::Radio, None);
        assert_eq!(serde_json::to_value(&response).unwrap()["answer"], json!(null));
    }

    #[test]
    fn skipped_evaluation_is_explicit() {
        let payload = ResponsePayload::AiEvaluation {
            ai_evaluation: vec![],
            ai_evaluation_skipped: true,
        };
        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            json!({"ai_evaluation": [], "ai_evaluation_skipped": true})
        );
    }

    #[test]
    fn randomizer_payload_deserializes() {
        let payload: ResponsePayload = serde_json::from_value(json!({
            "randomizer_responses": [],
            "item_order": ["s2", "s1"]
        }))
        .unwrap();
        assert_eq!(payload.label(), "randomizer");
    }
}
