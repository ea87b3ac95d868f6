use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{
    ApplicationStore, AssessmentStore, OpportunityStore, StoreError, TransitionError, UserStore,
};
use crate::applications::{
    apply_transition, Application, ApplicationPatch, InterviewQueue, QueueTransition,
};
use crate::identity::UserProfile;
use crate::ids::{ApplicationId, AssessmentId, OpportunityId, UserId};
use crate::opportunities::{Opportunity, OpportunityFilter};
use crate::readiness::ReadinessAssessment;

#[derive(Default)]
struct Tables {
    users: HashMap<UserId, UserProfile>,
    opportunities: HashMap<OpportunityId, Opportunity>,
    applications: HashMap<ApplicationId, Application>,
    assessments: HashMap<AssessmentId, ReadinessAssessment>,
}

impl Tables {
    fn queue_of(&self, opportunity_id: OpportunityId) -> InterviewQueue {
        InterviewQueue::from_members(
            self.applications
                .values()
                .filter(|application| {
                    application.opportunity_id == opportunity_id && application.in_interview_queue
                })
                .filter_map(|application| {
                    application
                        .queue_position
                        .map(|position| (application.id, position))
                }),
        )
    }
}

/// Process-local backend; one lock spans every table so each call is serializable.
#[derive(Default)]
pub struct InMemoryStore {
    tables: Mutex<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, StoreError> {
        self.tables
            .lock()
            .map_err(|_| StoreError::Unavailable("in-memory store lock poisoned".to_string()))
    }
}

fn newest_first<T>(items: &mut [T], key: impl Fn(&T) -> (DateTime<Utc>, uuid::Uuid)) {
    items.sort_by(|left, right| key(right).cmp(&key(left)));
}

#[async_trait]
impl UserStore for InMemoryStore {
    async fn fetch_user(&self, id: UserId) -> Result<Option<UserProfile>, StoreError> {
        Ok(self.lock()?.users.get(&id).cloned())
    }

    async fn insert_user(&self, user: UserProfile) -> Result<UserProfile, StoreError> {
        let mut tables = self.lock()?;
        if tables.users.contains_key(&user.id) {
            return Err(StoreError::Conflict("user already exists"));
        }
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update_user(&self, user: UserProfile) -> Result<(), StoreError> {
        let mut tables = self.lock()?;
        let slot = tables
            .users
            .get_mut(&user.id)
            .ok_or(StoreError::NotFound("user"))?;
        *slot = user;
        Ok(())
    }
}

#[async_trait]
impl OpportunityStore for InMemoryStore {
    async fn insert_opportunity(
        &self,
        opportunity: Opportunity,
    ) -> Result<Opportunity, StoreError> {
        let mut tables = self.lock()?;
        if tables.opportunities.contains_key(&opportunity.id) {
            return Err(StoreError::Conflict("opportunity already exists"));
        }
        tables
            .opportunities
            .insert(opportunity.id, opportunity.clone());
        Ok(opportunity)
    }

    async fn update_opportunity(&self, opportunity: Opportunity) -> Result<(), StoreError> {
        let mut tables = self.lock()?;
        let slot = tables
            .opportunities
            .get_mut(&opportunity.id)
            .ok_or(StoreError::NotFound("opportunity"))?;
        *slot = opportunity;
        Ok(())
    }

    async fn fetch_opportunity(
        &self,
        id: OpportunityId,
    ) -> Result<Option<Opportunity>, StoreError> {
        Ok(self.lock()?.opportunities.get(&id).cloned())
    }

    async fn delete_opportunity(&self, id: OpportunityId) -> Result<(), StoreError> {
        let mut tables = self.lock()?;
        tables
            .opportunities
            .remove(&id)
            .ok_or(StoreError::NotFound("opportunity"))?;
        tables
            .applications
            .retain(|_, application| application.opportunity_id != id);
        Ok(())
    }

    async fn list_opportunities(
        &self,
        filter: &OpportunityFilter,
    ) -> Result<Vec<Opportunity>, StoreError> {
        let tables = self.lock()?;
        let mut listed: Vec<_> = tables
            .opportunities
            .values()
            .filter(|opportunity| opportunity.matches(filter))
            .cloned()
            .collect();
        newest_first(&mut listed, |opportunity| {
            (opportunity.created_at, opportunity.id.as_uuid())
        });
        Ok(listed)
    }
}

#[async_trait]
impl ApplicationStore for InMemoryStore {
    async fn insert_application(
        &self,
        application: Application,
    ) -> Result<Application, StoreError> {
        let mut tables = self.lock()?;
        let duplicate = tables.applications.values().any(|existing| {
            existing.id == application.id
                || (existing.opportunity_id == application.opportunity_id
                    && existing.applicant_id == application.applicant_id)
        });
        if duplicate {
            return Err(StoreError::Conflict("application already exists"));
        }
        tables
            .applications
            .insert(application.id, application.clone());
        Ok(application)
    }

    async fn fetch_application(
        &self,
        id: ApplicationId,
    ) -> Result<Option<Application>, StoreError> {
        Ok(self.lock()?.applications.get(&id).cloned())
    }

    async fn fetch_application_for(
        &self,
        opportunity_id: OpportunityId,
        applicant_id: UserId,
    ) -> Result<Option<Application>, StoreError> {
        Ok(self
            .lock()?
            .applications
            .values()
            .find(|application| {
                application.opportunity_id == opportunity_id
                    && application.applicant_id == applicant_id
            })
            .cloned())
    }

    async fn patch_application(
        &self,
        id: ApplicationId,
        patch: ApplicationPatch,
        now: DateTime<Utc>,
    ) -> Result<Application, StoreError> {
        let mut tables = self.lock()?;
        let application = tables
            .applications
            .get_mut(&id)
            .ok_or(StoreError::NotFound("application"))?;
        patch.apply(application, now);
        Ok(application.clone())
    }

    async fn applications_for_opportunity(
        &self,
        opportunity_id: OpportunityId,
    ) -> Result<Vec<Application>, StoreError> {
        let tables = self.lock()?;
        let mut listed: Vec<_> = tables
            .applications
            .values()
            .filter(|application| application.opportunity_id == opportunity_id)
            .cloned()
            .collect();
        newest_first(&mut listed, |application| {
            (application.created_at, application.id.as_uuid())
        });
        Ok(listed)
    }

    async fn applications_for_applicant(
        &self,
        applicant_id: UserId,
    ) -> Result<Vec<Application>, StoreError> {
        let tables = self.lock()?;
        let mut listed: Vec<_> = tables
            .applications
            .values()
            .filter(|application| application.applicant_id == applicant_id)
            .cloned()
            .collect();
        newest_first(&mut listed, |application| {
            (application.created_at, application.id.as_uuid())
        });
        Ok(listed)
    }

    async fn interview_queue(
        &self,
        opportunity_id: OpportunityId,
    ) -> Result<Vec<Application>, StoreError> {
        let tables = self.lock()?;
        let mut queued: Vec<_> = tables
            .applications
            .values()
            .filter(|application| {
                application.opportunity_id == opportunity_id && application.in_interview_queue
            })
            .cloned()
            .collect();
        queued.sort_by_key(|application| application.queue_position);
        Ok(queued)
    }

    async fn transition_queue(
        &self,
        id: ApplicationId,
        transition: QueueTransition,
        now: DateTime<Utc>,
    ) -> Result<Option<Application>, TransitionError> {
        let mut tables = self.lock()?;
        let mut application = tables
            .applications
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound("application"))?;
        let mut queue = tables.queue_of(application.opportunity_id);

        apply_transition(&mut queue, &mut application, transition, now)?;

        let updated = if transition == QueueTransition::Withdraw {
            tables.applications.remove(&id);
            None
        } else {
            tables.applications.insert(id, application.clone());
            Some(application)
        };

        for (member, position) in queue.positions() {
            if let Some(row) = tables.applications.get_mut(&member) {
                row.queue_position = Some(position);
            }
        }

        Ok(updated)
    }
}

#[async_trait]
impl AssessmentStore for InMemoryStore {
    async fn insert_assessment(
        &self,
        assessment: ReadinessAssessment,
    ) -> Result<ReadinessAssessment, StoreError> {
        let mut tables = self.lock()?;
        let duplicate = tables.assessments.values().any(|existing| {
            existing.id == assessment.id
                || (existing.opportunity_id == assessment.opportunity_id
                    && existing.applicant_id == assessment.applicant_id)
        });
        if duplicate {
            return Err(StoreError::Conflict("assessment already exists"));
        }
        tables.assessments.insert(assessment.id, assessment.clone());
        Ok(assessment)
    }

    async fn update_assessment(&self, assessment: ReadinessAssessment) -> Result<(), StoreError> {
        let mut tables = self.lock()?;
        let slot = tables
            .assessments
            .get_mut(&assessment.id)
            .ok_or(StoreError::NotFound("assessment"))?;
        *slot = assessment;
        Ok(())
    }

    async fn fetch_assessment(
        &self,
        id: AssessmentId,
    ) -> Result<Option<ReadinessAssessment>, StoreError> {
        Ok(self.lock()?.assessments.get(&id).cloned())
    }

    async fn fetch_assessment_for(
        &self,
        opportunity_id: OpportunityId,
        applicant_id: UserId,
    ) -> Result<Option<ReadinessAssessment>, StoreError> {
        Ok(self
            .lock()?
            .assessments
            .values()
            .find(|assessment| {
                assessment.opportunity_id == opportunity_id
                    && assessment.applicant_id == applicant_id
            })
            .cloned())
    }
}
