//! API Models
//!
//! Wire types for the HTTP API. They mirror the core `ConversationContext`
//! field for field and carry `utoipa` annotations for the OpenAPI document.

use chrono::NaiveDate;
use goal_coach_core::{
    ConversationContext, ConversationStage, TurnOutcome, extraction::CalendarSchedule,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Deserialize, Serialize, ToSchema, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    #[schema(example = "I want to learn Spanish in one year")]
    pub message: String,
    #[serde(default)]
    #[schema(value_type = String, example = "INITIAL")]
    pub stage: ConversationStage,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(example = "Hold a 15 minute conversation in Spanish")]
    pub extracted_goal: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>, example = "2026-10-19")]
    pub target_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub calendar: Option<CalendarSchedule>,
}

impl ChatRequest {
    /// Splits the request into the user's message and the conversation context.
    pub fn into_parts(self) -> (String, ConversationContext) {
        let context = ConversationContext {
            stage: self.stage,
            extracted_goal: self.extracted_goal,
            target_date: self.target_date,
            calendar: self.calendar,
        };
        (self.message, context)
    }
}

#[derive(Deserialize, Serialize, ToSchema, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub response: String,
    #[schema(value_type = String, example = "GOAL_EXTRACTED")]
    pub stage: ConversationStage,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extracted_goal: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>, example = "2026-10-19")]
    pub target_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub calendar: Option<CalendarSchedule>,
}

impl From<TurnOutcome> for ChatResponse {
    fn from(outcome: TurnOutcome) -> Self {
        let TurnOutcome { response, context } = outcome;
        Self {
            response,
            stage: context.stage,
            extracted_goal: context.extracted_goal,
            target_date: context.target_date,
            calendar: context.calendar,
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq)]
pub struct HealthResponse {
    #[schema(example = "healthy")]
    pub status: String,
    /// Outcome of the upstream LLM round trip, when one was made.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub llm: Option<String>,
}

#[derive(Serialize, Deserialize, ToSchema, Debug)]
pub struct ErrorResponse {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_chat_request_defaults_to_initial() {
        let json = r#"{"message": "I want to learn Spanish in one year"}"#;
        let request: ChatRequest = serde_json::from_str(json).unwrap();

        assert_eq!(request.stage, ConversationStage::Initial);
        assert_eq!(request.extracted_goal, None);
        assert_eq!(request.target_date, None);
    }

    #[test]
    fn test_chat_request_missing_message() {
        let result: Result<ChatRequest, _> = serde_json::from_str(r#"{"stage": "INITIAL"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_chat_request_unknown_stage() {
        let json = r#"{"message": "hi", "stage": "FINISHED"}"#;
        let result: Result<ChatRequest, _> = serde_json::from_str(json);
        assert!(result.is_err());
    }

    #[test]
    fn test_chat_request_into_parts() {
        let json = r#"{
            "message": "about a year",
            "stage": "PLANNING",
            "extractedGoal": "Learn Spanish",
            "targetDate": "2026-01-31"
        }"#;
        let request: ChatRequest = serde_json::from_str(json).unwrap();
        let (message, context) = request.into_parts();

        assert_eq!(message, "about a year");
        assert_eq!(context.stage, ConversationStage::Planning);
        assert_eq!(context.extracted_goal.as_deref(), Some("Learn Spanish"));
        assert_eq!(
            context.target_date,
            NaiveDate::from_ymd_opt(2026, 1, 31)
        );
    }

    #[test]
    fn test_chat_response_serialization() {
        let response = ChatResponse::from(TurnOutcome {
            response: "Great!".to_string(),
            context: ConversationContext {
                stage: ConversationStage::Scheduling,
                extracted_goal: Some("Learn Spanish".to_string()),
                target_date: NaiveDate::from_ymd_opt(2026, 1, 1),
                calendar: None,
            },
        });

        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({
                "response": "Great!",
                "stage": "SCHEDULING",
                "extractedGoal": "Learn Spanish",
                "targetDate": "2026-01-01"
            })
        );
    }

    #[test]
    fn test_response_can_be_sent_back_as_next_request() {
        let response = ChatResponse {
            response: "Shall I build a schedule?".to_string(),
            stage: ConversationStage::Scheduling,
            extracted_goal: Some("Learn Spanish".to_string()),
            target_date: NaiveDate::from_ymd_opt(2026, 1, 1),
            calendar: None,
        };
        let mut next = serde_json::to_value(&response).unwrap();
        next["message"] = json!("yes");

        let request: ChatRequest = serde_json::from_value(next).unwrap();
        assert_eq!(request.stage, response.stage);
        assert_eq!(request.extracted_goal, response.extracted_goal);
        assert_eq!(request.target_date, response.target_date);
    }

    #[test]
    fn test_health_response_omits_missing_llm_status() {
        let health = HealthResponse {
            status: "healthy".to_string(),
            llm: None,
        };
        assert_eq!(
            serde_json::to_string(&health).unwrap(),
            r#"{"status":"healthy"}"#
        );
    }

    #[test]
    fn test_error_response_serialization() {
        let error = ErrorResponse {
            message: "Invalid request body".to_string(),
        };
        assert_eq!(
            serde_json::to_string(&error).unwrap(),
            r#"{"message":"Invalid request body"}"#
        );
    }
}
