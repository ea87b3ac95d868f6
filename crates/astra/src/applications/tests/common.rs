use std::sync::Arc;

use chrono::{NaiveDate, Utc};

use crate::applications::{
    Application, ApplicationService, ApplicationSubmission, ApplicationUpdate,
};
use crate::identity::{KycStatus, KycSubmission, Principal, Role, UserProfile};
use crate::ids::{OpportunityId, UserId};
use crate::opportunities::{
    CustomField, FieldKind, Opportunity, OpportunityKind, OpportunityStatus,
};
use crate::store::{InMemoryStore, OpportunityStore, UserStore};

pub(super) fn build_service() -> (ApplicationService<InMemoryStore>, Arc<InMemoryStore>) {
    let store = Arc::new(InMemoryStore::default());
    (ApplicationService::new(store.clone()), store)
}

pub(super) async fn individual(store: &InMemoryStore, email: &str) -> Principal {
    let profile = UserProfile::provision(UserId::generate(), Some(email.to_string()), Utc::now());
    store
        .insert_user(profile)
        .await
        .expect("user stored")
        .principal()
}

pub(super) async fn organization(store: &InMemoryStore, email: &str) -> Principal {
    let now = Utc::now();
    let mut profile = UserProfile::provision(UserId::generate(), Some(email.to_string()), now);
    profile.role = Role::Organization;
    profile.kyc.status = KycStatus::Submitted;
    profile.kyc.submitted_at = Some(now);
    profile.kyc.submission = Some(KycSubmission {
        organization_name: "Northwind Fellowship".to_string(),
        registration_number: "NW-5521".to_string(),
        country: "Ghana".to_string(),
        contact_email: email.to_string(),
        website: None,
        documents: Vec::new(),
    });
    store
        .insert_user(profile)
        .await
        .expect("organization stored")
        .principal()
}

pub(super) fn fellowship(owner: &Principal) -> Opportunity {
    let now = Utc::now();
    Opportunity {
        id: OpportunityId::generate(),
        owner_id: owner.user_id,
        title: "Data Fellowship".to_string(),
        organization_name: "Northwind Fellowship".to_string(),
        kind: OpportunityKind::Program,
        description: "Six months of mentored analytics work.".to_string(),
        requirements: vec!["SQL basics".to_string()],
        location: Some("Accra".to_string()),
        deadline: None,
        status: OpportunityStatus::Open,
        custom_fields: vec![CustomField {
            id: "portfolio".to_string(),
            label: "Portfolio link".to_string(),
            kind: FieldKind::Url,
            required: false,
            options: Vec::new(),
        }],
        created_at: now,
        updated_at: now,
    }
}

pub(super) async fn published(store: &InMemoryStore, owner: &Principal) -> Opportunity {
    store
        .insert_opportunity(fellowship(owner))
        .await
        .expect("opportunity stored")
}

pub(super) async fn closed(store: &InMemoryStore, owner: &Principal) -> Opportunity {
    let mut opportunity = fellowship(owner);
    opportunity.deadline = NaiveDate::from_ymd_opt(2020, 1, 31);
    store
        .insert_opportunity(opportunity)
        .await
        .expect("opportunity stored")
}

pub(super) async fn applied(
    service: &ApplicationService<InMemoryStore>,
    applicant: &Principal,
    opportunity: &Opportunity,
) -> Application {
    service
        .apply(applicant, opportunity.id, ApplicationSubmission::default())
        .await
        .expect("application accepted")
}

/// Applies, gets qualified by the owner, and joins the queue.
pub(super) async fn queued(
    service: &ApplicationService<InMemoryStore>,
    owner: &Principal,
    applicant: &Principal,
    opportunity: &Opportunity,
) -> Application {
    let application = applied(service, applicant, opportunity).await;
    service
        .update(owner, application.id, ApplicationUpdate::Qualify)
        .await
        .expect("owner qualifies");
    service
        .update(applicant, application.id, ApplicationUpdate::JoinQueue)
        .await
        .expect("joins queue")
}

pub(super) async fn positions(
    service: &ApplicationService<InMemoryStore>,
    owner: &Principal,
    opportunity: &Opportunity,
) -> Vec<(UserId, u32)> {
    service
        .interview_queue(owner, opportunity.id)
        .await
        .expect("owner views queue")
        .entries
        .into_iter()
        .map(|entry| (entry.applicant_id, entry.position))
        .collect()
}
