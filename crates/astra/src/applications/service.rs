use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use super::domain::{
    Application, ApplicationPatch, ApplicationSubmission, ApplicationUpdate, InterviewQueueView,
    Party,
};
use super::queue::QueueTransition;
use crate::error::{DomainError, ValidationError};
use crate::identity::{Principal, Role};
use crate::ids::{ApplicationId, OpportunityId, UserId};
use crate::opportunities::{validate_answers, Opportunity};
use crate::store::{Store, StoreError};

/// Service coordinating applications and the interview queue of each opportunity.
pub struct ApplicationService<S> {
    store: Arc<S>,
}

impl<S> ApplicationService<S>
where
    S: Store + 'static,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub async fn apply(
        &self,
        principal: &Principal,
        opportunity_id: OpportunityId,
        mut submission: ApplicationSubmission,
    ) -> Result<Application, DomainError> {
        if principal.role != Role::Individual {
            return Err(DomainError::Forbidden(
                "only individual accounts apply to opportunities",
            ));
        }

        let opportunity = self.opportunity(opportunity_id).await?;
        if opportunity.is_owned_by(principal.user_id) {
            return Err(DomainError::Forbidden(
                "you cannot apply to your own opportunity",
            ));
        }
        let now = Utc::now();
        if !opportunity.accepts_applications(now.date_naive()) {
            return Err(ValidationError::new(
                "opportunity_id",
                "the opportunity is not accepting applications",
            )
            .into());
        }

        let answers = validate_answers(
            &opportunity.custom_fields,
            std::mem::take(&mut submission.answers),
        )?;
        let application = Application::new(
            opportunity_id,
            principal.user_id,
            submission,
            answers,
            now,
        );

        let stored = match self.store.insert_application(application).await {
            Ok(stored) => stored,
            Err(StoreError::Conflict(_)) => {
                return Err(DomainError::Conflict(
                    "you have already applied to this opportunity",
                ))
            }
            Err(other) => return Err(other.into()),
        };
        info!(
            application_id = %stored.id,
            opportunity_id = %opportunity_id,
            applicant_id = %principal.user_id,
            "application created"
        );
        Ok(stored)
    }

    pub async fn list_mine(&self, principal: &Principal) -> Result<Vec<Application>, DomainError> {
        Ok(self
            .store
            .applications_for_applicant(principal.user_id)
            .await?)
    }

    /// Every application to an opportunity; owner only.
    pub async fn list_for_opportunity(
        &self,
        principal: &Principal,
        opportunity_id: OpportunityId,
    ) -> Result<Vec<Application>, DomainError> {
        let opportunity = self.opportunity(opportunity_id).await?;
        if !opportunity.is_owned_by(principal.user_id) {
            return Err(DomainError::Forbidden(
                "only the owner may list an opportunity's applications",
            ));
        }
        Ok(self
            .store
            .applications_for_opportunity(opportunity_id)
            .await?)
    }

    pub async fn get(
        &self,
        principal: &Principal,
        id: ApplicationId,
    ) -> Result<Application, DomainError> {
        let (application, _) = self.visible(principal.user_id, id).await?;
        Ok(application)
    }

    pub async fn update(
        &self,
        principal: &Principal,
        id: ApplicationId,
        update: ApplicationUpdate,
    ) -> Result<Application, DomainError> {
        let (_, party) = self.visible(principal.user_id, id).await?;
        if update.party() != party {
            return Err(match update.party() {
                Party::Applicant => DomainError::Forbidden("only the applicant may do this"),
                Party::Owner => DomainError::Forbidden("only the opportunity owner may do this"),
            });
        }

        let patch = match update {
            ApplicationUpdate::JoinQueue => {
                return self.transition(id, QueueTransition::Join).await
            }
            ApplicationUpdate::LeaveQueue => {
                return self.transition(id, QueueTransition::Leave).await
            }
            ApplicationUpdate::Disqualify => {
                return self.transition(id, QueueTransition::Disqualify).await
            }
            ApplicationUpdate::UpdateNotes { notes } => ApplicationPatch::Notes(notes),
            ApplicationUpdate::UpdateDocuments { documents } => {
                ApplicationPatch::Documents(documents)
            }
            ApplicationUpdate::Qualify => ApplicationPatch::Qualify,
            ApplicationUpdate::SetStatus { status } => ApplicationPatch::Status(status),
            ApplicationUpdate::SetFeedback { feedback } => ApplicationPatch::Feedback(
                feedback.filter(|text| !text.trim().is_empty()),
            ),
        };
        Ok(self.store.patch_application(id, patch, Utc::now()).await?)
    }

    /// Applicant deletes their application, leaving the queue first when queued.
    pub async fn withdraw(&self, principal: &Principal, id: ApplicationId) -> Result<(), DomainError> {
        let (_, party) = self.visible(principal.user_id, id).await?;
        if party != Party::Applicant {
            return Err(DomainError::Forbidden("only the applicant may withdraw"));
        }

        self.store
            .transition_queue(id, QueueTransition::Withdraw, Utc::now())
            .await?;
        info!(application_id = %id, "application withdrawn");
        Ok(())
    }

    /// Owner sees every entry; an applicant sees only their own entry and the total.
    pub async fn interview_queue(
        &self,
        principal: &Principal,
        opportunity_id: OpportunityId,
    ) -> Result<InterviewQueueView, DomainError> {
        let opportunity = self.opportunity(opportunity_id).await?;
        let queued = self.store.interview_queue(opportunity_id).await?;
        let total = queued.len();

        let entries = if opportunity.is_owned_by(principal.user_id) {
            queued.iter().filter_map(Application::queue_entry).collect()
        } else {
            let own = self
                .store
                .fetch_application_for(opportunity_id, principal.user_id)
                .await?
                .ok_or(DomainError::Forbidden(
                    "only the owner and applicants may view the interview queue",
                ))?;
            queued
                .iter()
                .filter(|application| application.id == own.id)
                .filter_map(Application::queue_entry)
                .collect()
        };

        Ok(InterviewQueueView {
            opportunity_id,
            total,
            entries,
        })
    }

    /// Caller joins the queue of an opportunity they applied to.
    pub async fn join_queue(
        &self,
        principal: &Principal,
        opportunity_id: OpportunityId,
    ) -> Result<Application, DomainError> {
        let application = self.own_application(principal.user_id, opportunity_id).await?;
        self.transition(application.id, QueueTransition::Join).await
    }

    pub async fn leave_queue(
        &self,
        principal: &Principal,
        opportunity_id: OpportunityId,
    ) -> Result<Application, DomainError> {
        let application = self.own_application(principal.user_id, opportunity_id).await?;
        self.transition(application.id, QueueTransition::Leave).await
    }

    /// Owner revokes an applicant's qualification, removing them from the queue.
    pub async fn disqualify(
        &self,
        principal: &Principal,
        opportunity_id: OpportunityId,
        applicant_id: UserId,
    ) -> Result<Application, DomainError> {
        let opportunity = self.opportunity(opportunity_id).await?;
        if !opportunity.is_owned_by(principal.user_id) {
            return Err(DomainError::Forbidden("only the opportunity owner may do this"));
        }
        let application = self
            .store
            .fetch_application_for(opportunity_id, applicant_id)
            .await?
            .ok_or(DomainError::NotFound("application"))?;
        self.transition(application.id, QueueTransition::Disqualify)
            .await
    }

    async fn transition(
        &self,
        id: ApplicationId,
        transition: QueueTransition,
    ) -> Result<Application, DomainError> {
        let application = self
            .store
            .transition_queue(id, transition, Utc::now())
            .await?
            .ok_or(DomainError::NotFound("application"))?;
        info!(
            application_id = %id,
            opportunity_id = %application.opportunity_id,
            transition = transition.label(),
            position = ?application.queue_position,
            "interview queue updated"
        );
        Ok(application)
    }

    async fn opportunity(&self, id: OpportunityId) -> Result<Opportunity, DomainError> {
        self.store
            .fetch_opportunity(id)
            .await?
            .ok_or(DomainError::NotFound("opportunity"))
    }

    async fn own_application(
        &self,
        user: UserId,
        opportunity_id: OpportunityId,
    ) -> Result<Application, DomainError> {
        self.store
            .fetch_application_for(opportunity_id, user)
            .await?
            .ok_or(DomainError::NotFound("application"))
    }

    /// Load an application together with the caller's side of it.
    async fn visible(
        &self,
        user: UserId,
        id: ApplicationId,
    ) -> Result<(Application, Party), DomainError> {
        let application = self
            .store
            .fetch_application(id)
            .await?
            .ok_or(DomainError::NotFound("application"))?;
        if application.is_submitted_by(user) {
            return Ok((application, Party::Applicant));
        }

        let opportunity = self.opportunity(application.opportunity_id).await?;
        if opportunity.is_owned_by(user) {
            Ok((application, Party::Owner))
        } else {
            Err(DomainError::Forbidden(
                "only the applicant and the opportunity owner may access this application",
            ))
        }
    }
}
