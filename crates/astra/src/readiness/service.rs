use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::{Map, Value};
use tracing::{info, warn};

use super::domain::{ReadinessAssessment, Verdict};
use super::prompts::{
    eligibility_prompt, mock_prompt, parse_eligibility, parse_mock, ELIGIBILITY_FALLBACK_FEEDBACK,
    ELIGIBILITY_FALLBACK_SCORE, ELIGIBILITY_SYSTEM, MOCK_FALLBACK_FEEDBACK, MOCK_FALLBACK_SCORE,
    MOCK_SYSTEM,
};
use crate::error::DomainError;
use crate::identity::{Principal, UserProfile};
use crate::ids::{AssessmentId, OpportunityId};
use crate::inference::{complete_within, CompletionRequest, InferenceClient};
use crate::opportunities::Opportunity;
use crate::store::{Store, StoreError};

/// Outcome of an eligibility request; only `Created` ran inference.
#[derive(Debug, Clone, PartialEq)]
pub enum Assessed {
    Created(ReadinessAssessment),
    Existing(ReadinessAssessment),
}

impl Assessed {
    pub fn assessment(&self) -> &ReadinessAssessment {
        match self {
            Assessed::Created(assessment) | Assessed::Existing(assessment) => assessment,
        }
    }

    pub fn into_assessment(self) -> ReadinessAssessment {
        match self {
            Assessed::Created(assessment) | Assessed::Existing(assessment) => assessment,
        }
    }
}

/// Eligibility scoring and mock-application review; inference failures fall back to fixed scores.
pub struct ReadinessService<S> {
    store: Arc<S>,
    inference: Arc<dyn InferenceClient>,
    timeout: Duration,
}

impl<S> ReadinessService<S>
where
    S: Store + 'static,
{
    pub fn new(store: Arc<S>, inference: Arc<dyn InferenceClient>, timeout: Duration) -> Self {
        Self {
            store,
            inference,
            timeout,
        }
    }

    /// Return the caller's stored assessment for the opportunity, creating it on first request.
    pub async fn assess_eligibility(
        &self,
        principal: &Principal,
        opportunity_id: OpportunityId,
    ) -> Result<Assessed, DomainError> {
        if let Some(existing) = self
            .store
            .fetch_assessment_for(opportunity_id, principal.user_id)
            .await?
        {
            return Ok(Assessed::Existing(existing));
        }

        let opportunity = self
            .store
            .fetch_opportunity(opportunity_id)
            .await?
            .ok_or(DomainError::NotFound("opportunity"))?;
        let applicant = self
            .store
            .fetch_user(principal.user_id)
            .await?
            .ok_or(DomainError::NotFound("user"))?;

        let verdict = self.eligibility_verdict(&opportunity, &applicant).await;
        let assessment =
            ReadinessAssessment::new(opportunity_id, principal.user_id, verdict, Utc::now());

        match self.store.insert_assessment(assessment).await {
            Ok(stored) => {
                info!(
                    assessment_id = %stored.id,
                    opportunity_id = %opportunity_id,
                    score = stored.eligibility_score,
                    "readiness assessment created"
                );
                Ok(Assessed::Created(stored))
            }
            Err(StoreError::Conflict(_)) => {
                let winner = self
                    .store
                    .fetch_assessment_for(opportunity_id, principal.user_id)
                    .await?
                    .ok_or(DomainError::NotFound("assessment"))?;
                Ok(Assessed::Existing(winner))
            }
            Err(other) => Err(other.into()),
        }
    }

    pub async fn evaluate_mock_application(
        &self,
        principal: &Principal,
        assessment_id: AssessmentId,
        data: Map<String, Value>,
    ) -> Result<ReadinessAssessment, DomainError> {
        let mut assessment = self.owned(principal, assessment_id).await?;
        let opportunity = self
            .store
            .fetch_opportunity(assessment.opportunity_id)
            .await?
            .ok_or(DomainError::NotFound("opportunity"))?;
        if assessment.mock_application_completed {
            return Ok(assessment);
        }

        let verdict = self.mock_verdict(&opportunity, &data).await;
        assessment.record_mock(data, verdict, Utc::now());
        self.store.update_assessment(assessment.clone()).await?;
        info!(
            assessment_id = %assessment.id,
            score = ?assessment.mock_application_score,
            "mock application evaluated"
        );
        Ok(assessment)
    }

    pub async fn get(
        &self,
        principal: &Principal,
        id: AssessmentId,
    ) -> Result<ReadinessAssessment, DomainError> {
        self.owned(principal, id).await
    }

    async fn owned(
        &self,
        principal: &Principal,
        id: AssessmentId,
    ) -> Result<ReadinessAssessment, DomainError> {
        let assessment = self
            .store
            .fetch_assessment(id)
            .await?
            .ok_or(DomainError::NotFound("assessment"))?;
        if assessment.applicant_id != principal.user_id {
            return Err(DomainError::Forbidden(
                "only the assessed applicant may access this assessment",
            ));
        }
        Ok(assessment)
    }

    async fn eligibility_verdict(&self, opportunity: &Opportunity, applicant: &UserProfile) -> Verdict {
        let request =
            CompletionRequest::json(ELIGIBILITY_SYSTEM, eligibility_prompt(opportunity, applicant));
        match complete_within(self.inference.as_ref(), request, self.timeout).await {
            Ok(reply) => parse_eligibility(&reply).unwrap_or_else(|| {
                warn!(opportunity_id = %opportunity.id, "unparsable eligibility reply; using fallback score");
                Verdict::fallback(ELIGIBILITY_FALLBACK_SCORE, ELIGIBILITY_FALLBACK_FEEDBACK)
            }),
            Err(err) => {
                warn!(opportunity_id = %opportunity.id, error = %err, "eligibility inference failed; using fallback score");
                Verdict::fallback(ELIGIBILITY_FALLBACK_SCORE, ELIGIBILITY_FALLBACK_FEEDBACK)
            }
        }
    }

    async fn mock_verdict(&self, opportunity: &Opportunity, data: &Map<String, Value>) -> Verdict {
        let request = CompletionRequest::json(MOCK_SYSTEM, mock_prompt(opportunity, data));
        match complete_within(self.inference.as_ref(), request, self.timeout).await {
            Ok(reply) => parse_mock(&reply).unwrap_or_else(|| {
                warn!(opportunity_id = %opportunity.id, "unparsable mock review reply; using fallback score");
                Verdict::fallback(MOCK_FALLBACK_SCORE, MOCK_FALLBACK_FEEDBACK)
            }),
            Err(err) => {
                warn!(opportunity_id = %opportunity.id, error = %err, "mock review inference failed; using fallback score");
                Verdict::fallback(MOCK_FALLBACK_SCORE, MOCK_FALLBACK_FEEDBACK)
            }
        }
    }
}
