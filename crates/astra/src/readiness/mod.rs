//! Readiness assessments: eligibility scoring and mock-application review.

pub mod domain;
pub mod prompts;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{
    AssessmentRequest, AssessmentStatus, MockApplicationRequest, ReadinessAssessment, Verdict,
};
pub use prompts::{
    ELIGIBILITY_FALLBACK_FEEDBACK, ELIGIBILITY_FALLBACK_SCORE, MOCK_FALLBACK_FEEDBACK,
    MOCK_FALLBACK_SCORE,
};
pub use router::readiness_router;
pub use service::{Assessed, ReadinessService};
