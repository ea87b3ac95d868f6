//! Persistence seams for users, opportunities, applications, and assessments.
//!
//! Every backend must execute [`ApplicationStore::transition_queue`] atomically per
//! opportunity: the interview queue's positions stay contiguous (`1..=N`) no matter how
//! joins, departures, disqualifications, and withdrawals interleave.

mod memory;
mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::applications::{Application, ApplicationPatch, QueueError, QueueTransition};
use crate::identity::UserProfile;
use crate::ids::{ApplicationId, AssessmentId, OpportunityId, UserId};
use crate::opportunities::{Opportunity, OpportunityFilter};
use crate::readiness::ReadinessAssessment;

pub use memory::InMemoryStore;
pub use postgres::PgStore;

/// Error enumeration for storage failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    Conflict(&'static str),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Failure of an atomic queue transition.
#[derive(Debug, thiserror::Error)]
pub enum TransitionError {
    #[error(transparent)]
    Queue(#[from] QueueError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn fetch_user(&self, id: UserId) -> Result<Option<UserProfile>, StoreError>;
    /// Fails with `Conflict` when the id is already provisioned.
    async fn insert_user(&self, user: UserProfile) -> Result<UserProfile, StoreError>;
    async fn update_user(&self, user: UserProfile) -> Result<(), StoreError>;
}

#[async_trait]
pub trait OpportunityStore: Send + Sync {
    async fn insert_opportunity(&self, opportunity: Opportunity)
        -> Result<Opportunity, StoreError>;
    async fn update_opportunity(&self, opportunity: Opportunity) -> Result<(), StoreError>;
    async fn fetch_opportunity(&self, id: OpportunityId)
        -> Result<Option<Opportunity>, StoreError>;
    /// Removes the opportunity together with its applications.
    async fn delete_opportunity(&self, id: OpportunityId) -> Result<(), StoreError>;
    /// Newest first.
    async fn list_opportunities(
        &self,
        filter: &OpportunityFilter,
    ) -> Result<Vec<Opportunity>, StoreError>;
}

#[async_trait]
pub trait ApplicationStore: Send + Sync {
    /// Fails with `Conflict` when the applicant already applied to the opportunity.
    async fn insert_application(&self, application: Application)
        -> Result<Application, StoreError>;
    async fn fetch_application(&self, id: ApplicationId)
        -> Result<Option<Application>, StoreError>;
    async fn fetch_application_for(
        &self,
        opportunity_id: OpportunityId,
        applicant_id: UserId,
    ) -> Result<Option<Application>, StoreError>;
    /// Writes only the columns the patch owns, against the current row, and returns the
    /// result. Queue columns belong to [`ApplicationStore::transition_queue`].
    async fn patch_application(
        &self,
        id: ApplicationId,
        patch: ApplicationPatch,
        now: DateTime<Utc>,
    ) -> Result<Application, StoreError>;
    async fn applications_for_opportunity(
        &self,
        opportunity_id: OpportunityId,
    ) -> Result<Vec<Application>, StoreError>;
    async fn applications_for_applicant(
        &self,
        applicant_id: UserId,
    ) -> Result<Vec<Application>, StoreError>;
    /// Queued applications ordered by position.
    async fn interview_queue(
        &self,
        opportunity_id: OpportunityId,
    ) -> Result<Vec<Application>, StoreError>;
    /// Atomically applies a queue transition and compacts the remaining positions.
    /// Returns the updated application, or `None` once it was withdrawn.
    async fn transition_queue(
        &self,
        id: ApplicationId,
        transition: QueueTransition,
        now: DateTime<Utc>,
    ) -> Result<Option<Application>, TransitionError>;
}

#[async_trait]
pub trait AssessmentStore: Send + Sync {
    /// Fails with `Conflict` when the (opportunity, applicant) pair already has a record.
    async fn insert_assessment(
        &self,
        assessment: ReadinessAssessment,
    ) -> Result<ReadinessAssessment, StoreError>;
    async fn update_assessment(&self, assessment: ReadinessAssessment) -> Result<(), StoreError>;
    async fn fetch_assessment(
        &self,
        id: AssessmentId,
    ) -> Result<Option<ReadinessAssessment>, StoreError>;
    async fn fetch_assessment_for(
        &self,
        opportunity_id: OpportunityId,
        applicant_id: UserId,
    ) -> Result<Option<ReadinessAssessment>, StoreError>;
}

/// Complete storage backend required by the services.
pub trait Store: UserStore + OpportunityStore + ApplicationStore + AssessmentStore {}

impl<T> Store for T where T: UserStore + OpportunityStore + ApplicationStore + AssessmentStore {}
