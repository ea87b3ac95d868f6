use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Map, Value};

use super::{
    Assessed, AssessmentStatus, ReadinessService, ELIGIBILITY_FALLBACK_SCORE, MOCK_FALLBACK_SCORE,
};
use crate::error::DomainError;
use crate::identity::{Principal, Role, UserProfile};
use crate::ids::{AssessmentId, OpportunityId, UserId};
use crate::inference::{CompletionRequest, InferenceClient, InferenceError};
use crate::opportunities::{Opportunity, OpportunityKind, OpportunityStatus};
use crate::store::{InMemoryStore, OpportunityStore, UserStore};

/// Replies with a fixed script and counts calls.
struct Scripted {
    reply: Result<&'static str, ()>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl Scripted {
    fn replying(reply: &'static str) -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(reply),
            delay: None,
            calls: AtomicUsize::new(0),
        })
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self {
            reply: Err(()),
            delay: None,
            calls: AtomicUsize::new(0),
        })
    }

    fn stalled() -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(r#"{"score": 99, "feedback": "too late"}"#),
            delay: Some(Duration::from_secs(30)),
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InferenceClient for Scripted {
    async fn complete(&self, _request: CompletionRequest) -> Result<String, InferenceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.reply
            .map(str::to_string)
            .map_err(|_| InferenceError::Transport("connection reset".to_string()))
    }
}

struct Fixture {
    service: ReadinessService<InMemoryStore>,
    applicant: Principal,
    opportunity: Opportunity,
}

async fn fixture(inference: Arc<dyn InferenceClient>) -> Fixture {
    let store = Arc::new(InMemoryStore::default());
    let now = Utc::now();

    let mut owner = UserProfile::provision(UserId::generate(), Some("org@example.org".into()), now);
    owner.role = Role::Organization;
    let owner = store.insert_user(owner).await.expect("owner stored");

    let mut applicant =
        UserProfile::provision(UserId::generate(), Some("kofi@example.org".into()), now);
    applicant.details.skills = vec!["Python".to_string(), "Statistics".to_string()];
    let applicant = store.insert_user(applicant).await.expect("applicant stored");

    let opportunity = store
        .insert_opportunity(Opportunity {
            id: OpportunityId::generate(),
            owner_id: owner.id,
            title: "Climate Data Internship".to_string(),
            organization_name: "Greenline".to_string(),
            kind: OpportunityKind::Internship,
            description: "Analyse rainfall records.".to_string(),
            requirements: vec!["Python".to_string()],
            location: None,
            deadline: None,
            status: OpportunityStatus::Open,
            custom_fields: Vec::new(),
            created_at: now,
            updated_at: now,
        })
        .await
        .expect("opportunity stored");

    Fixture {
        service: ReadinessService::new(store, inference, Duration::from_secs(8)),
        applicant: applicant.principal(),
        opportunity,
    }
}

fn mock_data() -> Map<String, Value> {
    match json!({ "motivation": "I want to model drought risk for farmers." }) {
        Value::Object(fields) => fields,
        _ => unreachable!(),
    }
}

#[tokio::test]
async fn second_request_returns_stored_record_without_inference() {
    let inference = Scripted::replying(
        r#"{"score": 82, "feedback": "Good fit.", "improvementSteps": ["Share a notebook"]}"#,
    );
    let fx = fixture(inference.clone()).await;

    let first = fx
        .service
        .assess_eligibility(&fx.applicant, fx.opportunity.id)
        .await
        .expect("assessed");
    let second = fx
        .service
        .assess_eligibility(&fx.applicant, fx.opportunity.id)
        .await
        .expect("assessed again");

    assert!(matches!(first, Assessed::Created(_)));
    assert!(matches!(second, Assessed::Existing(_)));
    assert_eq!(first.assessment(), second.assessment());
    assert_eq!(first.assessment().eligibility_score, 82);
    assert_eq!(
        first.assessment().eligibility_feedback,
        "Good fit.\n\nImprovement steps:\n1. Share a notebook"
    );
    assert_eq!(inference.calls(), 1);
}

#[tokio::test]
async fn failing_inference_falls_back_to_default_score() {
    let fx = fixture(Scripted::failing()).await;

    let assessed = fx
        .service
        .assess_eligibility(&fx.applicant, fx.opportunity.id)
        .await
        .expect("never a hard failure");

    let assessment = assessed.assessment();
    assert_eq!(assessment.eligibility_score, ELIGIBILITY_FALLBACK_SCORE);
    assert_eq!(assessment.status, AssessmentStatus::EligibilityChecked);
    assert!(!assessment.eligibility_feedback.is_empty());
}

#[tokio::test(start_paused = true)]
async fn stalled_inference_times_out_into_fallback() {
    let inference = Scripted::stalled();
    let fx = fixture(inference.clone()).await;

    let assessed = fx
        .service
        .assess_eligibility(&fx.applicant, fx.opportunity.id)
        .await
        .expect("never a hard failure");

    assert_eq!(assessed.assessment().eligibility_score, ELIGIBILITY_FALLBACK_SCORE);
    assert_eq!(inference.calls(), 1);
}

#[tokio::test]
async fn unparsable_reply_falls_back() {
    let fx = fixture(Scripted::replying("You look great!")).await;

    let assessed = fx
        .service
        .assess_eligibility(&fx.applicant, fx.opportunity.id)
        .await
        .expect("never a hard failure");
    assert_eq!(assessed.assessment().eligibility_score, ELIGIBILITY_FALLBACK_SCORE);
}

#[tokio::test]
async fn missing_opportunity_is_not_found() {
    let fx = fixture(Scripted::failing()).await;

    match fx
        .service
        .assess_eligibility(&fx.applicant, OpportunityId::generate())
        .await
    {
        Err(DomainError::NotFound("opportunity")) => {}
        other => panic!("expected not found, got {other:?}"),
    }
}

#[tokio::test]
async fn mock_application_is_evaluated_once() {
    let inference = Scripted::failing();
    let fx = fixture(inference.clone()).await;
    let assessment = fx
        .service
        .assess_eligibility(&fx.applicant, fx.opportunity.id)
        .await
        .expect("assessed")
        .into_assessment();

    let evaluated = fx
        .service
        .evaluate_mock_application(&fx.applicant, assessment.id, mock_data())
        .await
        .expect("evaluated");
    assert!(evaluated.mock_application_completed);
    assert_eq!(evaluated.status, AssessmentStatus::MockCompleted);
    assert_eq!(evaluated.mock_application_score, Some(MOCK_FALLBACK_SCORE));
    assert_eq!(evaluated.mock_application_data, Some(mock_data()));

    let again = fx
        .service
        .evaluate_mock_application(&fx.applicant, assessment.id, mock_data())
        .await
        .expect("returns stored");
    assert_eq!(again, evaluated);
    assert_eq!(inference.calls(), 2);
}

#[tokio::test]
async fn mock_application_checks_ownership_and_existence() {
    let fx = fixture(Scripted::failing()).await;
    let assessment = fx
        .service
        .assess_eligibility(&fx.applicant, fx.opportunity.id)
        .await
        .expect("assessed")
        .into_assessment();

    let stranger = Principal {
        user_id: UserId::generate(),
        email: None,
        role: Role::Individual,
    };
    match fx
        .service
        .evaluate_mock_application(&stranger, assessment.id, mock_data())
        .await
    {
        Err(DomainError::Forbidden(_)) => {}
        other => panic!("expected forbidden, got {other:?}"),
    }

    match fx
        .service
        .evaluate_mock_application(&fx.applicant, AssessmentId::generate(), mock_data())
        .await
    {
        Err(DomainError::NotFound("assessment")) => {}
        other => panic!("expected not found, got {other:?}"),
    }

    match fx.service.get(&stranger, assessment.id).await {
        Err(DomainError::Forbidden(_)) => {}
        other => panic!("expected forbidden, got {other:?}"),
    }
}
