//! Accounts resolved from the auth provider's bearer tokens, role switching, and KYC.

pub mod domain;
pub mod router;
pub mod service;
pub mod token;

pub use domain::{
    ApplicantDetails, DocumentRef, KycRecord, KycStatus, KycSubmission, Principal,
    ProfileUpdate, Role, SwitchRoleRequest, UserProfile,
};
pub use router::identity_router;
pub use service::{IdentityService, PrincipalResolver};
pub use token::{JwtVerifier, TokenClaims, TokenError, TokenVerifier};
