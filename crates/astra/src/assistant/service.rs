use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tracing::{debug, info, warn};

use super::domain::{ActionOutcome, AssistantAction, ChatReply, ChatRequest, IntentAnalysis};
use super::intent::{classify_keywords, parse_intent_reply, INTENT_SYSTEM};
use crate::applications::{ApplicationService, ApplicationUpdate};
use crate::error::DomainError;
use crate::identity::{Principal, Role};
use crate::inference::{
    complete_within, ChatMessage, ChatRole, CompletionRequest, InferenceClient,
};
use crate::opportunities::{OpportunityFilter, OpportunityService};
use crate::readiness::{Assessed, ReadinessService};
use crate::store::Store;

/// Turns forwarded to the model alongside the new message.
pub(crate) const HISTORY_WINDOW: usize = 20;
const SEARCH_LIMIT: usize = 10;

/// Chat front end that answers questions and runs actions through the domain services.
pub struct AssistantService<S> {
    applications: Arc<ApplicationService<S>>,
    opportunities: Arc<OpportunityService<S>>,
    readiness: Arc<ReadinessService<S>>,
    inference: Arc<dyn InferenceClient>,
    timeout: Duration,
}

impl<S> AssistantService<S>
where
    S: Store + 'static,
{
    pub fn new(
        applications: Arc<ApplicationService<S>>,
        opportunities: Arc<OpportunityService<S>>,
        readiness: Arc<ReadinessService<S>>,
        inference: Arc<dyn InferenceClient>,
        timeout: Duration,
    ) -> Self {
        Self {
            applications,
            opportunities,
            readiness,
            inference,
            timeout,
        }
    }

    pub async fn chat(
        &self,
        principal: &Principal,
        request: ChatRequest,
    ) -> Result<ChatReply, DomainError> {
        let ChatRequest { message, history } = request;
        let skip = history.len().saturating_sub(HISTORY_WINDOW);
        let mut messages: Vec<ChatMessage> = history.into_iter().skip(skip).collect();
        messages.push(ChatMessage {
            role: ChatRole::User,
            content: message,
        });

        let request = CompletionRequest {
            system: chat_system(principal.role),
            messages,
            temperature: 0.7,
            max_tokens: 600,
            json_reply: false,
        };
        match complete_within(self.inference.as_ref(), request, self.timeout).await {
            Ok(reply) => Ok(ChatReply {
                reply: reply.trim().to_string(),
            }),
            Err(err) => {
                warn!(user_id = %principal.user_id, error = %err, "chat completion failed");
                Err(DomainError::AssistantUnavailable)
            }
        }
    }

    /// Model classification first; the keyword classifier answers when it fails.
    pub async fn analyze_intent(&self, message: &str) -> IntentAnalysis {
        let request = CompletionRequest::json(INTENT_SYSTEM, message);
        match complete_within(self.inference.as_ref(), request, self.timeout).await {
            Ok(reply) => match parse_intent_reply(&reply) {
                Some(analysis) => return analysis,
                None => debug!("intent reply unparsable, using keywords"),
            },
            Err(err) => debug!(error = %err, "intent inference failed, using keywords"),
        }
        classify_keywords(message)
    }

    pub async fn execute_action(
        &self,
        principal: &Principal,
        action: AssistantAction,
    ) -> Result<ActionOutcome, DomainError> {
        let label = action.label();
        let outcome = match action {
            AssistantAction::SearchOpportunities { query, kind } => {
                let filter = OpportunityFilter {
                    kind,
                    q: Some(query),
                    include_closed: false,
                };
                let mut found = self.opportunities.list(&filter).await?;
                let total = found.len();
                found.truncate(SEARCH_LIMIT);
                ActionOutcome {
                    action: label,
                    message: match total {
                        0 => "No open opportunities matched your search.".to_string(),
                        1 => "Found 1 matching opportunity.".to_string(),
                        n => format!("Found {n} matching opportunities."),
                    },
                    data: json!({ "total": total, "opportunities": found }),
                }
            }
            AssistantAction::ListApplications => {
                let applications = self.applications.list_mine(principal).await?;
                ActionOutcome {
                    action: label,
                    message: format!("You have {} application(s).", applications.len()),
                    data: json!({ "applications": applications }),
                }
            }
            AssistantAction::JoinQueue { application_id } => {
                let application = self
                    .applications
                    .update(principal, application_id, ApplicationUpdate::JoinQueue)
                    .await?;
                let position = application.queue_position.unwrap_or_default();
                ActionOutcome {
                    action: label,
                    message: format!("You joined the interview queue at position {position}."),
                    data: json!({ "application": application }),
                }
            }
            AssistantAction::LeaveQueue { application_id } => {
                let application = self
                    .applications
                    .update(principal, application_id, ApplicationUpdate::LeaveQueue)
                    .await?;
                ActionOutcome {
                    action: label,
                    message: "You left the interview queue.".to_string(),
                    data: json!({ "application": application }),
                }
            }
            AssistantAction::ReadinessCheck { opportunity_id } => {
                let assessed = self
                    .readiness
                    .assess_eligibility(principal, opportunity_id)
                    .await?;
                let message = match &assessed {
                    Assessed::Created(assessment) => format!(
                        "Your eligibility score is {}.",
                        assessment.eligibility_score
                    ),
                    Assessed::Existing(assessment) => format!(
                        "Your existing eligibility score is {}.",
                        assessment.eligibility_score
                    ),
                };
                ActionOutcome {
                    action: label,
                    message,
                    data: json!({ "assessment": assessed.into_assessment() }),
                }
            }
        };

        info!(user_id = %principal.user_id, action = label, "assistant action executed");
        Ok(outcome)
    }
}

fn chat_system(role: Role) -> String {
    let audience = match role {
        Role::Individual => {
            "The user is an individual looking for opportunities. Help them find programs, \
             jobs, grants, scholarships, and internships, prepare applications, check their \
             readiness, and manage their place in interview queues."
        }
        Role::Organization => {
            "The user represents an organization. Help them write opportunity listings, \
             design application questions, and review applicants and interview queues."
        }
    };
    format!(
        "You are Astra's assistant. Astra connects individuals with opportunities posted by \
         organizations. {audience} Answer concisely and never invent listings or statuses."
    )
}
