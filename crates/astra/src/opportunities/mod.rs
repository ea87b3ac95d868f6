//! Opportunities posted by organizations and their custom application forms.

pub mod domain;
pub mod fields;
pub mod router;
pub mod service;

pub use domain::{
    CustomField, CustomFieldsUpdate, FieldKind, NewOpportunity, Opportunity, OpportunityFilter,
    OpportunityKind, OpportunityStatus, OpportunityUpdate,
};
pub use fields::validate_answers;
pub use router::opportunity_router;
pub use service::OpportunityService;
