use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ValidationError;
use crate::ids::{AssessmentId, OpportunityId, UserId};
use crate::validation::Validate;

const MAX_MOCK_FIELDS: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssessmentStatus {
    EligibilityChecked,
    MockCompleted,
}

impl AssessmentStatus {
    pub const fn label(self) -> &'static str {
        match self {
            AssessmentStatus::EligibilityChecked => "eligibility_checked",
            AssessmentStatus::MockCompleted => "mock_completed",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "eligibility_checked" => Some(AssessmentStatus::EligibilityChecked),
            "mock_completed" => Some(AssessmentStatus::MockCompleted),
            _ => None,
        }
    }
}

/// Scored estimate of one applicant's readiness for one opportunity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadinessAssessment {
    pub id: AssessmentId,
    pub opportunity_id: OpportunityId,
    pub applicant_id: UserId,
    pub status: AssessmentStatus,
    pub eligibility_score: u8,
    pub eligibility_feedback: String,
    pub mock_application_completed: bool,
    pub mock_application_score: Option<u8>,
    pub mock_application_feedback: Option<String>,
    pub mock_application_data: Option<Map<String, Value>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ReadinessAssessment {
    pub fn new(
        opportunity_id: OpportunityId,
        applicant_id: UserId,
        verdict: Verdict,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: AssessmentId::generate(),
            opportunity_id,
            applicant_id,
            status: AssessmentStatus::EligibilityChecked,
            eligibility_score: verdict.score,
            eligibility_feedback: verdict.feedback,
            mock_application_completed: false,
            mock_application_score: None,
            mock_application_feedback: None,
            mock_application_data: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub(crate) fn record_mock(
        &mut self,
        data: Map<String, Value>,
        verdict: Verdict,
        now: DateTime<Utc>,
    ) {
        self.mock_application_data = Some(data);
        self.mock_application_score = Some(verdict.score);
        self.mock_application_feedback = Some(verdict.feedback);
        self.mock_application_completed = true;
        self.status = AssessmentStatus::MockCompleted;
        self.updated_at = now;
    }
}

/// Score and formatted feedback produced by one evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub score: u8,
    pub feedback: String,
    pub fallback: bool,
}

impl Verdict {
    pub fn new(score: i64, feedback: String) -> Self {
        Self {
            score: score.clamp(0, 100) as u8,
            feedback,
            fallback: false,
        }
    }

    pub fn fallback(score: u8, feedback: &str) -> Self {
        Self {
            score,
            feedback: feedback.to_string(),
            fallback: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AssessmentRequest {
    pub opportunity_id: OpportunityId,
}

impl Validate for AssessmentRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MockApplicationRequest {
    pub assessment_id: AssessmentId,
    pub application_data: Map<String, Value>,
}

impl Validate for MockApplicationRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.application_data.is_empty() {
            return Err(ValidationError::new("application_data", "must not be empty"));
        }
        if self.application_data.len() > MAX_MOCK_FIELDS {
            return Err(ValidationError::new(
                "application_data",
                format!("at most {MAX_MOCK_FIELDS} fields are accepted"),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn scores_are_clamped_to_percent_range() {
        assert_eq!(Verdict::new(140, String::new()).score, 100);
        assert_eq!(Verdict::new(-3, String::new()).score, 0);
        assert_eq!(Verdict::new(72, String::new()).score, 72);
    }

    #[test]
    fn mock_data_must_be_a_non_empty_object() {
        let request = |data| {
            serde_json::from_value::<MockApplicationRequest>(json!({
                "assessment_id": AssessmentId::generate(),
                "application_data": data,
            }))
        };
        assert!(request(json!(["motivation"])).is_err());
        assert!(request(json!("motivation")).is_err());
        assert!(request(json!({}))
            .expect("parses")
            .validate()
            .is_err());
        assert!(request(json!({ "motivation": "I mentor first-year students" }))
            .expect("parses")
            .validate()
            .is_ok());

        let crowded: Map<String, Value> = (0..=MAX_MOCK_FIELDS)
            .map(|index| (format!("field{index}"), json!(index)))
            .collect();
        let err = request(Value::Object(crowded))
            .expect("parses")
            .validate()
            .expect_err("too many fields");
        assert_eq!(err.field, "application_data");
    }
}
