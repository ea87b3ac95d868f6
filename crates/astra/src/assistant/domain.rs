use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ValidationError;
use crate::ids::{ApplicationId, OpportunityId};
use crate::inference::ChatMessage;
use crate::opportunities::OpportunityKind;
use crate::validation::{limit_text, require_text, Validate};

pub(crate) const MAX_MESSAGE_CHARS: usize = 4000;
const MAX_HISTORY: usize = 200;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub history: Vec<ChatMessage>,
}

impl Validate for ChatRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        require_text("message", &self.message, MAX_MESSAGE_CHARS)?;
        if self.history.len() > MAX_HISTORY {
            return Err(ValidationError::new(
                "history",
                format!("at most {MAX_HISTORY} turns are accepted"),
            ));
        }
        for (index, turn) in self.history.iter().enumerate() {
            limit_text(&format!("history[{index}].content"), &turn.content, MAX_MESSAGE_CHARS)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatReply {
    pub reply: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IntentRequest {
    pub message: String,
}

impl Validate for IntentRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        require_text("message", &self.message, MAX_MESSAGE_CHARS)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    SearchOpportunities,
    ApplicationStatus,
    JoinQueue,
    LeaveQueue,
    ReadinessCheck,
    General,
}

impl Intent {
    pub const fn label(self) -> &'static str {
        match self {
            Intent::SearchOpportunities => "search_opportunities",
            Intent::ApplicationStatus => "application_status",
            Intent::JoinQueue => "join_queue",
            Intent::LeaveQueue => "leave_queue",
            Intent::ReadinessCheck => "readiness_check",
            Intent::General => "general",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "search_opportunities" => Some(Intent::SearchOpportunities),
            "application_status" => Some(Intent::ApplicationStatus),
            "join_queue" => Some(Intent::JoinQueue),
            "leave_queue" => Some(Intent::LeaveQueue),
            "readiness_check" => Some(Intent::ReadinessCheck),
            "general" => Some(Intent::General),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentAnalysis {
    pub intent: Intent,
    pub confidence: f32,
    pub parameters: Map<String, Value>,
}

/// Action the assistant may run on the caller's behalf; mirrors [`IntentAnalysis`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "action", content = "parameters", rename_all = "snake_case")]
pub enum AssistantAction {
    SearchOpportunities {
        query: String,
        #[serde(default)]
        kind: Option<OpportunityKind>,
    },
    ListApplications,
    JoinQueue {
        application_id: ApplicationId,
    },
    LeaveQueue {
        application_id: ApplicationId,
    },
    ReadinessCheck {
        opportunity_id: OpportunityId,
    },
}

impl AssistantAction {
    pub fn label(&self) -> &'static str {
        match self {
            AssistantAction::SearchOpportunities { .. } => "search_opportunities",
            AssistantAction::ListApplications => "list_applications",
            AssistantAction::JoinQueue { .. } => "join_queue",
            AssistantAction::LeaveQueue { .. } => "leave_queue",
            AssistantAction::ReadinessCheck { .. } => "readiness_check",
        }
    }
}

impl Validate for AssistantAction {
    fn validate(&self) -> Result<(), ValidationError> {
        match self {
            AssistantAction::SearchOpportunities { query, .. } => {
                require_text("parameters.query", query, 200)
            }
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionOutcome {
    pub action: &'static str,
    pub message: String,
    pub data: Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn actions_carry_parameters_next_to_the_tag() {
        let action: AssistantAction = serde_json::from_value(json!({
            "action": "search_opportunities",
            "parameters": { "query": "data", "kind": "internship" }
        }))
        .expect("parses");
        assert_eq!(
            action,
            AssistantAction::SearchOpportunities {
                query: "data".to_string(),
                kind: Some(OpportunityKind::Internship),
            }
        );

        let action: AssistantAction =
            serde_json::from_value(json!({ "action": "list_applications" })).expect("parses");
        assert_eq!(action.label(), "list_applications");
    }

    #[test]
    fn chat_message_length_is_bounded() {
        let request = ChatRequest {
            message: "x".repeat(MAX_MESSAGE_CHARS + 1),
            history: Vec::new(),
        };
        assert!(request.validate().is_err());

        let request = ChatRequest {
            message: "  ".to_string(),
            history: Vec::new(),
        };
        assert!(request.validate().is_err());
    }
}
