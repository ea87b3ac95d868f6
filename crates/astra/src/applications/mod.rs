//! Applications to opportunities and the per-opportunity interview queue.
//!
//! Queue membership only changes through [`crate::store::ApplicationStore::transition_queue`],
//! which runs the pure rules in [`queue`] atomically per opportunity.

pub mod domain;
pub mod queue;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{
    Application, ApplicationPatch, ApplicationStatus, ApplicationSubmission, ApplicationUpdate,
    InterviewQueueView, Party, QueueEntryView,
};
pub use queue::{apply_transition, InterviewQueue, QueueError, QueueTransition};
pub use router::application_router;
pub use service::ApplicationService;
