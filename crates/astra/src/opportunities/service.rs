use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use super::domain::{
    CustomField, NewOpportunity, Opportunity, OpportunityFilter, OpportunityStatus,
    OpportunityUpdate,
};
use crate::error::DomainError;
use crate::identity::Principal;
use crate::ids::{OpportunityId, UserId};
use crate::store::Store;

/// Service owning the opportunity catalogue and its application forms.
pub struct OpportunityService<S> {
    store: Arc<S>,
}

impl<S> OpportunityService<S>
where
    S: Store + 'static,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub async fn list(&self, filter: &OpportunityFilter) -> Result<Vec<Opportunity>, DomainError> {
        Ok(self.store.list_opportunities(filter).await?)
    }

    pub async fn get(&self, id: OpportunityId) -> Result<Opportunity, DomainError> {
        self.store
            .fetch_opportunity(id)
            .await?
            .ok_or(DomainError::NotFound("opportunity"))
    }

    /// Publish a new opportunity; only KYC-submitted organizations may post.
    pub async fn create(
        &self,
        principal: &Principal,
        request: NewOpportunity,
    ) -> Result<Opportunity, DomainError> {
        let poster = self
            .store
            .fetch_user(principal.user_id)
            .await?
            .ok_or(DomainError::NotFound("user"))?;
        if !poster.can_post_opportunities() {
            return Err(DomainError::Forbidden(
                "posting requires an organization account with a KYC submission",
            ));
        }

        let organization_name = request
            .organization_name
            .or_else(|| {
                poster
                    .kyc
                    .submission
                    .as_ref()
                    .map(|kyc| kyc.organization_name.clone())
            })
            .unwrap_or_else(|| poster.full_name.clone());

        let now = Utc::now();
        let opportunity = Opportunity {
            id: OpportunityId::generate(),
            owner_id: poster.id,
            title: request.title.trim().to_string(),
            organization_name: organization_name.trim().to_string(),
            kind: request.kind,
            description: request.description,
            requirements: request.requirements,
            location: request.location.filter(|value| !value.trim().is_empty()),
            deadline: request.deadline,
            status: OpportunityStatus::Open,
            custom_fields: request.custom_fields,
            created_at: now,
            updated_at: now,
        };

        let stored = self.store.insert_opportunity(opportunity).await?;
        info!(opportunity_id = %stored.id, owner_id = %stored.owner_id, "opportunity published");
        Ok(stored)
    }

    pub async fn update(
        &self,
        principal: &Principal,
        id: OpportunityId,
        update: OpportunityUpdate,
    ) -> Result<Opportunity, DomainError> {
        let mut opportunity = self.owned(principal.user_id, id).await?;
        update.apply(&mut opportunity);
        opportunity.updated_at = Utc::now();
        self.store.update_opportunity(opportunity.clone()).await?;
        Ok(opportunity)
    }

    pub async fn delete(&self, principal: &Principal, id: OpportunityId) -> Result<(), DomainError> {
        self.owned(principal.user_id, id).await?;
        self.store.delete_opportunity(id).await?;
        info!(opportunity_id = %id, "opportunity deleted");
        Ok(())
    }

    pub async fn custom_fields(&self, id: OpportunityId) -> Result<Vec<CustomField>, DomainError> {
        Ok(self.get(id).await?.custom_fields)
    }

    pub async fn replace_custom_fields(
        &self,
        principal: &Principal,
        id: OpportunityId,
        fields: Vec<CustomField>,
    ) -> Result<Vec<CustomField>, DomainError> {
        let mut opportunity = self.owned(principal.user_id, id).await?;
        opportunity.custom_fields = fields;
        opportunity.updated_at = Utc::now();
        self.store.update_opportunity(opportunity.clone()).await?;
        Ok(opportunity.custom_fields)
    }

    async fn owned(&self, user: UserId, id: OpportunityId) -> Result<Opportunity, DomainError> {
        let opportunity = self.get(id).await?;
        if !opportunity.is_owned_by(user) {
            return Err(DomainError::Forbidden("only the owner may change this opportunity"));
        }
        Ok(opportunity)
    }
}
