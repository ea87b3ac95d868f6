use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::info;

use super::domain::{KycStatus, KycSubmission, Principal, ProfileUpdate, Role, UserProfile};
use super::token::TokenClaims;
use crate::error::DomainError;
use crate::ids::UserId;
use crate::store::{Store, StoreError};

/// Turns verified token claims into the caller's current principal.
#[async_trait]
pub trait PrincipalResolver: Send + Sync {
    async fn resolve(&self, claims: &TokenClaims) -> Result<Principal, DomainError>;
}

/// Service owning user records, role switching, and KYC submissions.
pub struct IdentityService<S> {
    store: Arc<S>,
}

impl<S> IdentityService<S>
where
    S: Store + 'static,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Load the user for a token subject, provisioning an individual account on first use.
    pub async fn resolve_principal(&self, claims: &TokenClaims) -> Result<Principal, DomainError> {
        let id = UserId(claims.sub);
        if let Some(profile) = self.store.fetch_user(id).await? {
            return Ok(profile.principal());
        }

        let profile = UserProfile::provision(id, claims.email.clone(), Utc::now());
        match self.store.insert_user(profile).await {
            Ok(profile) => {
                info!(user_id = %id, "provisioned user account");
                Ok(profile.principal())
            }
            Err(StoreError::Conflict(_)) => {
                let profile = self.store.fetch_user(id).await?.ok_or(DomainError::NotFound("user"))?;
                Ok(profile.principal())
            }
            Err(other) => Err(other.into()),
        }
    }

    pub async fn profile(&self, principal: &Principal) -> Result<UserProfile, DomainError> {
        self.store
            .fetch_user(principal.user_id)
            .await?
            .ok_or(DomainError::NotFound("user"))
    }

    pub async fn update_profile(
        &self,
        principal: &Principal,
        update: ProfileUpdate,
    ) -> Result<UserProfile, DomainError> {
        let mut profile = self.profile(principal).await?;
        update.apply(&mut profile);
        profile.updated_at = Utc::now();
        self.store.update_user(profile.clone()).await?;
        Ok(profile)
    }

    pub async fn switch_role(
        &self,
        principal: &Principal,
        role: Role,
    ) -> Result<UserProfile, DomainError> {
        let mut profile = self.profile(principal).await?;
        if profile.role == role {
            return Ok(profile);
        }

        profile.role = role;
        profile.updated_at = Utc::now();
        self.store.update_user(profile.clone()).await?;
        info!(user_id = %profile.id, role = role.label(), "switched account role");
        Ok(profile)
    }

    pub async fn submit_kyc(
        &self,
        principal: &Principal,
        submission: KycSubmission,
    ) -> Result<UserProfile, DomainError> {
        let mut profile = self.profile(principal).await?;
        if profile.role != Role::Organization {
            return Err(DomainError::Forbidden(
                "only organization accounts submit KYC",
            ));
        }

        let now = Utc::now();
        profile.kyc.status = KycStatus::Submitted;
        profile.kyc.submitted_at = Some(now);
        profile.kyc.submission = Some(submission);
        profile.updated_at = now;
        self.store.update_user(profile.clone()).await?;
        info!(user_id = %profile.id, "kyc submission recorded");
        Ok(profile)
    }
}

#[async_trait]
impl<S> PrincipalResolver for IdentityService<S>
where
    S: Store + 'static,
{
    async fn resolve(&self, claims: &TokenClaims) -> Result<Principal, DomainError> {
        self.resolve_principal(claims).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::DocumentRef;
    use crate::store::InMemoryStore;
    use crate::validation::Validate;
    use uuid::Uuid;

    fn claims(email: &str) -> TokenClaims {
        TokenClaims {
            sub: Uuid::now_v7(),
            email: Some(email.to_string()),
            exp: u64::MAX,
        }
    }

    fn kyc() -> KycSubmission {
        KycSubmission {
            organization_name: "Bright Futures".to_string(),
            registration_number: "RC-1029".to_string(),
            country: "Kenya".to_string(),
            contact_email: "ops@brightfutures.org".to_string(),
            website: None,
            documents: Vec::new(),
        }
    }

    #[tokio::test]
    async fn first_resolution_provisions_an_individual() {
        let service = IdentityService::new(Arc::new(InMemoryStore::default()));
        let claims = claims("grace@example.org");

        let principal = service.resolve_principal(&claims).await.expect("resolves");
        assert_eq!(principal.role, Role::Individual);

        let profile = service.profile(&principal).await.expect("profile stored");
        assert_eq!(profile.full_name, "grace");
        assert_eq!(profile.kyc.status, KycStatus::NotSubmitted);
    }

    #[tokio::test]
    async fn switch_role_persists_and_is_idempotent() {
        let service = IdentityService::new(Arc::new(InMemoryStore::default()));
        let claims = claims("org@example.org");
        let principal = service.resolve_principal(&claims).await.expect("resolves");

        let switched = service
            .switch_role(&principal, Role::Organization)
            .await
            .expect("switches");
        let again = service
            .switch_role(&principal, Role::Organization)
            .await
            .expect("no-op");
        assert_eq!(switched.updated_at, again.updated_at);

        let reloaded = service.resolve_principal(&claims).await.expect("resolves");
        assert_eq!(reloaded.role, Role::Organization);
    }

    #[tokio::test]
    async fn kyc_requires_organization_role() {
        let service = IdentityService::new(Arc::new(InMemoryStore::default()));
        let principal = service
            .resolve_principal(&claims("solo@example.org"))
            .await
            .expect("resolves");

        match service.submit_kyc(&principal, kyc()).await {
            Err(DomainError::Forbidden(_)) => {}
            other => panic!("expected forbidden, got {other:?}"),
        }

        let principal = service
            .switch_role(&principal, Role::Organization)
            .await
            .expect("switches")
            .principal();
        let profile = service.submit_kyc(&principal, kyc()).await.expect("kyc accepted");
        assert!(profile.can_post_opportunities());
    }

    #[tokio::test]
    async fn profile_update_touches_only_provided_fields() {
        let service = IdentityService::new(Arc::new(InMemoryStore::default()));
        let principal = service
            .resolve_principal(&claims("lin@example.org"))
            .await
            .expect("resolves");

        let updated = service
            .update_profile(
                &principal,
                ProfileUpdate {
                    skills: Some(vec![" Rust ".to_string(), "SQL".to_string()]),
                    ..ProfileUpdate::default()
                },
            )
            .await
            .expect("updates");

        assert_eq!(updated.full_name, "lin");
        assert_eq!(updated.details.skills, vec!["Rust", "SQL"]);
    }

    fn rejected_field(submission: KycSubmission) -> String {
        submission.validate().expect_err("kyc rejected").field
    }

    #[test]
    fn kyc_checks_contact_email_and_documents() {
        let registration = DocumentRef {
            name: "Certificate of registration".to_string(),
            url: "https://files.brightfutures.org/cert.pdf".to_string(),
        };
        let submission = KycSubmission {
            documents: vec![registration.clone()],
            ..kyc()
        };
        assert!(submission.validate().is_ok());

        assert_eq!(
            rejected_field(KycSubmission {
                contact_email: "ops.brightfutures.org".to_string(),
                ..kyc()
            }),
            "contact_email"
        );
        assert_eq!(
            rejected_field(KycSubmission {
                documents: vec![
                    registration.clone(),
                    DocumentRef {
                        name: "  ".to_string(),
                        ..registration.clone()
                    },
                ],
                ..kyc()
            }),
            "documents[1].name"
        );
        assert_eq!(
            rejected_field(KycSubmission {
                documents: vec![DocumentRef {
                    url: "files.brightfutures.org/cert.pdf".to_string(),
                    ..registration.clone()
                }],
                ..kyc()
            }),
            "documents[0].url"
        );
    }

    #[tokio::test]
    async fn resubmitting_kyc_replaces_the_previous_submission() {
        let service = IdentityService::new(Arc::new(InMemoryStore::default()));
        let principal = service
            .resolve_principal(&claims("ops@brightfutures.org"))
            .await
            .expect("resolves");
        let principal = service
            .switch_role(&principal, Role::Organization)
            .await
            .expect("switches")
            .principal();

        let first = service.submit_kyc(&principal, kyc()).await.expect("kyc accepted");
        let renamed = KycSubmission {
            organization_name: "Bright Futures Trust".to_string(),
            ..kyc()
        };
        let second = service
            .submit_kyc(&principal, renamed.clone())
            .await
            .expect("resubmission accepted");

        assert_eq!(second.kyc.status, KycStatus::Submitted);
        assert_eq!(second.kyc.submission, Some(renamed));
        assert!(second.kyc.submitted_at >= first.kyc.submitted_at);
        let stored = service.profile(&principal).await.expect("profile stored");
        assert_eq!(stored.kyc.submission, second.kyc.submission);
    }
}
